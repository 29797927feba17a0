use clap::Parser;
use reqwest::Url;

use crate::{
    api::{heartbeat::Heartbeat, home_assistant::OtpEntity},
    browser::chromium::Browser,
    cli::{browser::BrowserArgs, home_assistant::HomeAssistantArgs, timings::TimingArgs},
    extract::Extraction,
    fluid::Fluid,
    pipeline::{Pipeline, Report},
    prelude::*,
    summary::Selection,
    timings::Timings,
};

#[derive(Parser)]
pub struct RunArgs {
    /// EDF account email.
    #[clap(long, env = "EDF_USERNAME")]
    username: String,

    /// Home Assistant entity that receives the one-time codes.
    #[clap(
        long = "otp-entity-id",
        env = "EDF_OTP_ENTITY_ID",
        default_value = "sensor.edf_code"
    )]
    otp_entity_id: String,

    #[clap(
        long,
        env = "EDF_FLUIDS",
        value_delimiter = ',',
        num_args = 1..,
        default_value = "electricity",
    )]
    fluids: Vec<Fluid>,

    #[clap(long, env = "EDF_EXTRACTION", default_value = "interception")]
    extraction: Extraction,

    /// Which reading becomes the sensor state.
    #[clap(long, env = "EDF_SELECTION", default_value = "latest")]
    selection: Selection,

    /// Attach the daily series to the sensor attributes, for the charts.
    #[clap(long = "with-series", env = "EDF_WITH_SERIES")]
    with_series: bool,

    #[clap(flatten)]
    home_assistant: HomeAssistantArgs,

    #[clap(flatten)]
    browser: BrowserArgs,

    #[clap(flatten)]
    timings: TimingArgs,

    /// Monitoring URL pinged after every run, and at `<url>/fail` when the run fails.
    #[clap(long = "heartbeat-url", env = "HEARTBEAT_URL")]
    heartbeat_url: Option<Url>,
}

impl RunArgs {
    pub async fn run(self) -> Result {
        self.run_once().await.map(drop)
    }

    /// Execute the pipeline and report its outcome to the heartbeat, if configured.
    #[instrument(skip_all)]
    pub async fn run_once(&self) -> Result<Report> {
        let heartbeat = self.heartbeat_url.clone().map(Heartbeat::try_new).transpose()?;
        let result = self.run_in_browser().await;
        if let Some(heartbeat) = &heartbeat {
            heartbeat.report(&result).await;
        }
        result
    }

    /// Run the pipeline in a fresh browser, which is closed whatever the outcome.
    async fn run_in_browser(&self) -> Result<Report> {
        let home_assistant = self.home_assistant.try_new_client()?;
        let otp_entity = OtpEntity::new(&home_assistant, self.otp_entity_id.clone());
        let timings = Timings::from(&self.timings);

        let browser = Browser::launch(self.browser.config()?, timings.navigation_timeout).await?;
        let result = Pipeline::builder()
            .driver(&browser)
            .otp_source(&otp_entity)
            .sink(&home_assistant)
            .username(&self.username)
            .timings(timings)
            .fluids(self.fluids.iter().copied().collect())
            .extraction(self.extraction)
            .selection(self.selection)
            .with_series(self.with_series)
            .jiggle_pointer(true)
            .build()
            .run()
            .await;
        if let Err(error) = browser.close().await {
            warn!("failed to close the browser: {error:#}");
        }
        result
    }
}
