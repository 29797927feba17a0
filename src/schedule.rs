//! Cron schedule of the `watch` runs.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use cron::Schedule;

use crate::prelude::*;

/// Five-field cron expression: minute, hour, day of month, month, and day of week.
///
/// Runs fire at the zeroth second of the matching minute.
#[derive(Clone, Debug)]
pub struct CronSchedule(Schedule);

impl FromStr for CronSchedule {
    type Err = Error;

    fn from_str(expression: &str) -> Result<Self> {
        let n_fields = expression.split_whitespace().count();
        ensure!(n_fields == 5, "expected 5 cron fields, got {n_fields} in `{expression}`");
        Schedule::from_str(&format!("0 {expression}"))
            .map(Self)
            .with_context(|| format!("invalid cron expression `{expression}`"))
    }
}

impl CronSchedule {
    /// Next firing strictly after the instant, with the fields read as the zone's wall clock.
    #[must_use]
    pub fn next_after(&self, after: DateTime<Utc>, time_zone: Tz) -> Option<DateTime<Utc>> {
        let next = self.0.after(&after.with_timezone(&time_zone)).next()?;
        Some(next.with_timezone(&Utc))
    }
}
