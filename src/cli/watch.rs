use chrono::Utc;
use chrono_tz::Tz;
use clap::Parser;
use tokio::time::sleep;

use crate::{cli::RunArgs, prelude::*, schedule::CronSchedule};

#[derive(Parser)]
pub struct WatchArgs {
    /// Five-field cron expression of the run starts, for example `0 6 * * *`.
    ///
    /// A firing that falls during a run is skipped.
    #[clap(long, env = "EDF_CRON")]
    cron: CronSchedule,

    /// Time zone the cron expression is read in.
    #[clap(long = "time-zone", env = "EDF_TIME_ZONE", default_value = "Europe/Paris")]
    time_zone: Tz,

    #[clap(flatten)]
    run: RunArgs,
}

impl WatchArgs {
    /// Run immediately, then on every firing of the schedule.
    pub async fn run(self) -> Result {
        loop {
            match self.run.run_once().await {
                Ok(report) => info!(%report, "the run has finished"),
                Err(error) => error!("the run has failed: {error:#}"),
            }
            let now = Utc::now();
            let next = self
                .cron
                .next_after(now, self.time_zone)
                .context("the schedule never fires again")?;
            info!(next = %next.with_timezone(&self.time_zone), "sleeping until the next run…");
            sleep((next - now).to_std().unwrap_or_default()).await;
        }
    }
}
