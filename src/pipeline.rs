//! One complete run: log in, walk through the dashboard, and publish every configured fluid.

use std::fmt::{Display, Formatter};

use bon::Builder;
use enumset::EnumSet;
use itertools::Itertools;

use crate::{
    browser::Driver,
    credentials::OtpSource,
    error::RunError,
    extract::{Extraction, Extractor},
    fluid::Fluid,
    navigator::Navigator,
    prelude::*,
    publisher::{StateSink, publish_all},
    sensor::SensorState,
    session::Session,
    summary::{Selection, Summary},
    timings::Timings,
};

#[derive(Builder)]
pub struct Pipeline<'a, D, O, S> {
    driver: &'a D,
    otp_source: &'a O,
    sink: &'a S,
    username: &'a str,
    timings: Timings,
    fluids: EnumSet<Fluid>,

    #[builder(default)]
    extraction: Extraction,

    #[builder(default)]
    selection: Selection,

    /// Attach the retained readings to the sensor attributes.
    #[builder(default)]
    with_series: bool,

    #[builder(default)]
    jiggle_pointer: bool,
}

#[derive(Debug)]
pub enum Outcome {
    /// Number of the published sensors.
    Published(usize),

    Skipped(Error),
}

#[must_use]
#[derive(Debug, Default)]
pub struct Report(pub Vec<(Fluid, Outcome)>);

impl Report {
    pub fn n_published(&self) -> usize {
        self.0
            .iter()
            .map(|(_, outcome)| match outcome {
                Outcome::Published(n_published) => *n_published,
                Outcome::Skipped(_) => 0,
            })
            .sum()
    }
}

impl Display for Report {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.0.is_empty() {
            return write!(f, "no fluids");
        }
        let outcomes = self.0.iter().format_with(", ", |(fluid, outcome), write| match outcome {
            Outcome::Published(n_published) => {
                write(&format_args!("{fluid}: {n_published} published"))
            }
            Outcome::Skipped(error) => write(&format_args!("{fluid}: skipped ({error:#})")),
        });
        write!(f, "{outcomes}")
    }
}

impl<D: Driver, O: OtpSource, S: StateSink> Pipeline<'_, D, O, S> {
    /// Failures before the dashboard is reached abort the run.
    /// After that, each fluid succeeds or fails on its own.
    #[instrument(skip_all, fields(fluids = ?self.fluids))]
    pub async fn run(&self) -> Result<Report> {
        let page = Session::builder()
            .driver(self.driver)
            .otp_source(self.otp_source)
            .username(self.username)
            .timings(self.timings)
            .jiggle_pointer(self.jiggle_pointer)
            .build()
            .login()
            .await?;
        let mut navigator = Navigator::new(&page, self.timings);
        navigator.reveal_dashboard().await?;
        let extractor = Extractor::new(page.driver(), self.extraction, self.timings);

        let mut report = Report::default();
        for fluid in self.fluids {
            let outcome = match self.process(&extractor, &mut navigator, fluid).await {
                Ok(n_published) => Outcome::Published(n_published),
                Err(error) => {
                    if error.downcast_ref::<RunError>().is_some_and(RunError::is_per_fluid) {
                        warn!(%fluid, "skipped: {error:#}");
                    } else {
                        error!(%fluid, "failed: {error:#}");
                    }
                    Outcome::Skipped(error)
                }
            };
            report.0.push((fluid, outcome));
        }
        info!(n_published = report.n_published(), "done");
        Ok(report)
    }

    async fn process<'a>(
        &self,
        extractor: &Extractor<'a, D>,
        navigator: &mut Navigator<'a, D>,
        fluid: Fluid,
    ) -> Result<usize> {
        let payload = extractor.extract(navigator, fluid).await?;
        let summary = Summary::from_payload(fluid, payload, self.selection)?
            .ok_or(RunError::NoDataForFluid(fluid))?;
        let reading = &summary.representative;
        info!(
            %fluid,
            date = reading.formatted_date(),
            energy = %reading.energy,
            cost = %reading.cost,
            n_readings = summary.series.len(),
            "selected",
        );
        Ok(publish_all(self.sink, SensorState::pair(fluid, &summary, self.with_series)).await)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use serde_json::{Value, json};

    use super::*;
    use crate::{
        browser::scripted::ScriptedDriver,
        credentials::FixedOtp,
        portal::{self, View},
        publisher::recording::RecordingSink,
    };

    const ELECTRICITY_URL: &str =
        "https://equilibre.edf.fr/api/v2/sites/-/consumptions?step=P1D&start=2024-01-01";
    const GAS_URL: &str = "https://equilibre.edf.fr/api/v2/sites/-/gas-consumptions";

    fn portal() -> ScriptedDriver {
        ScriptedDriver::default()
            .with_present([
                portal::EMAIL_FIELD,
                View::Day.selector(),
                View::Month.selector(),
                View::Year.selector(),
                Fluid::Gas.selector(),
            ])
            .with_redirect(portal::EMAIL_FIELD, portal::ENTRY_URL)
    }

    fn electricity_payload() -> Value {
        json!({
            "step": "P1D",
            "consumptions": [
                {
                    "nature": "REAL",
                    "status": "COMPLETE",
                    "period": { "startTime": "2024-01-02T00:00" },
                    "energyMeter": { "total": 10.5 },
                    "cost": { "total": 2.1 },
                },
                {
                    "nature": "REAL",
                    "status": "COMPLETE",
                    "period": { "startTime": "2024-01-03T00:00" },
                    "energyMeter": { "total": 11.25 },
                    "cost": { "total": 2.3 },
                },
                {
                    "nature": "REAL",
                    "status": "INCOMPLETE",
                    "period": { "startTime": "2024-01-04T00:00" },
                    "energyMeter": { "total": 99 },
                    "cost": { "total": 99 },
                },
            ],
        })
    }

    async fn run(driver: &ScriptedDriver, sink: &RecordingSink) -> Result<Report> {
        Pipeline::builder()
            .driver(driver)
            .otp_source(&FixedOtp(None))
            .sink(sink)
            .username("user@example.com")
            .timings(Timings::default())
            .fluids(Fluid::Electricity | Fluid::Gas)
            .build()
            .run()
            .await
    }

    #[tokio::test(start_paused = true)]
    async fn electricity_ok() -> Result {
        let driver = portal().with_response(ELECTRICITY_URL, electricity_payload());
        let sink = RecordingSink::default();
        let report = run(&driver, &sink).await?;

        let published = sink.published.lock().unwrap().clone();
        assert_eq!(published.len(), 2);
        assert_eq!(published[0].entity_id, "sensor.edf_electricity_consumption_kwh");
        assert_eq!(published[0].state, "11.250");
        assert_eq!(published[0].attributes.date, "2024-01-03T00:00:00.000Z");
        assert_eq!(published[1].entity_id, "sensor.edf_electricity_consumption_cost");
        assert_eq!(published[1].state, "2.30");
        assert_eq!(report.n_published(), 2);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn missing_fluid_does_not_stop_the_other() -> Result {
        let driver = portal().with_response(
            GAS_URL,
            json!([{ "day": "2024-01-06", "consumption": { "energy": 4.0 }, "totalCost": 1.5 }]),
        );
        let sink = RecordingSink::default();
        let report = run(&driver, &sink).await?;

        let (Fluid::Electricity, Outcome::Skipped(error)) = &report.0[0] else {
            panic!("electricity should have been skipped");
        };
        assert!(matches!(
            error.downcast_ref::<RunError>(),
            Some(RunError::NoDataForFluid(Fluid::Electricity))
        ));
        assert!(matches!(report.0[1], (Fluid::Gas, Outcome::Published(2))));
        assert_eq!(
            sink.entity_ids(),
            ["sensor.edf_gas_consumption_kwh", "sensor.edf_gas_consumption_cost"]
        );
        assert_eq!(sink.published.lock().unwrap()[0].state, "4.000");
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn publish_failure_is_isolated() -> Result {
        let driver = portal().with_response(ELECTRICITY_URL, electricity_payload());
        let sink = RecordingSink {
            failing: HashSet::from(["sensor.edf_electricity_consumption_kwh".to_owned()]),
            ..Default::default()
        };
        let report = run(&driver, &sink).await?;
        assert_eq!(report.n_published(), 1);
        assert_eq!(sink.entity_ids(), ["sensor.edf_electricity_consumption_cost"]);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn login_failure_publishes_nothing() {
        let driver = ScriptedDriver::default()
            .with_present([portal::EMAIL_FIELD])
            .with_redirect(portal::EMAIL_FIELD, "https://auth.edf.fr/openam/XUI/#login")
            .with_response(ELECTRICITY_URL, electricity_payload());
        let sink = RecordingSink::default();
        let error = run(&driver, &sink).await.unwrap_err();
        assert!(matches!(error.downcast_ref::<RunError>(), Some(RunError::LoginFailed { .. })));
        assert!(sink.entity_ids().is_empty());
    }

    #[test]
    fn report_display_ok() {
        let report = Report(vec![
            (Fluid::Electricity, Outcome::Published(2)),
            (Fluid::Gas, Outcome::Skipped(RunError::NoDataForFluid(Fluid::Gas).into())),
        ]);
        assert_eq!(
            report.to_string(),
            "electricity: 2 published, gas: skipped (no gas data today)",
        );
        assert_eq!(Report::default().to_string(), "no fluids");
    }
}
