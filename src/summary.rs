//! Reduce the readings to what gets published.

use chrono::{DateTime, FixedOffset, NaiveTime, SecondsFormat, TimeZone, Utc};
use itertools::Itertools;
use serde_json::Value;

use crate::{
    fluid::Fluid,
    prelude::*,
    quantity::{cost::Cost, energy::KilowattHours},
    reading::{Consumptions, RawGasReading, RawReading},
};

/// Which end of the chronologically sorted readings is published.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, clap::ValueEnum)]
pub enum Selection {
    /// The most recent reading.
    #[default]
    Latest,

    /// The oldest reading.
    Earliest,
}

/// Reading of either fluid, reduced to what we publish.
#[must_use]
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct DailyReading {
    pub start: DateTime<FixedOffset>,
    pub energy: KilowattHours,
    pub cost: Cost,
}

impl DailyReading {
    /// Start of the reading truncated to midnight.
    pub fn date(&self) -> DateTime<FixedOffset> {
        self.start - (self.start.time() - NaiveTime::MIN)
    }

    /// Published form of [`DailyReading::date`], for example `2024-01-03T00:00:00.000Z`.
    #[must_use]
    pub fn formatted_date(&self) -> String {
        self.date().to_rfc3339_opts(SecondsFormat::Millis, true)
    }
}

impl From<RawReading> for DailyReading {
    fn from(reading: RawReading) -> Self {
        Self {
            start: reading.period.start.0,
            energy: reading.energy_meter.total,
            cost: reading.cost.total,
        }
    }
}

impl From<RawGasReading> for DailyReading {
    fn from(reading: RawGasReading) -> Self {
        Self {
            start: Utc.from_utc_datetime(&reading.day.and_time(NaiveTime::MIN)).fixed_offset(),
            energy: reading.consumption.energy,
            cost: reading.total_cost,
        }
    }
}

#[must_use]
#[derive(Clone, Debug)]
pub struct Summary {
    /// The one reading whose values become the sensor states.
    pub representative: DailyReading,

    /// All the retained readings, oldest first.
    pub series: Vec<DailyReading>,
}

impl Summary {
    /// Parse the fluid's raw payload and summarize it, `None` if nothing is left to publish.
    pub fn from_payload(
        fluid: Fluid,
        payload: Value,
        selection: Selection,
    ) -> Result<Option<Self>> {
        let summary = match fluid {
            Fluid::Electricity => Self::from_electricity(
                serde_json::from_value::<Consumptions<RawReading>>(payload)
                    .context("failed to parse the electricity payload")?
                    .into_readings(),
                selection,
            ),
            Fluid::Gas => Self::from_gas(
                serde_json::from_value::<Consumptions<RawGasReading>>(payload)
                    .context("failed to parse the gas payload")?
                    .into_readings(),
                selection,
            ),
        };
        Ok(summary)
    }

    /// Keep the real and complete readings, and select the representative one.
    pub fn from_electricity(readings: Vec<RawReading>, selection: Selection) -> Option<Self> {
        Self::select(
            readings.into_iter().filter(RawReading::is_eligible).map(DailyReading::from),
            selection,
        )
    }

    /// Gas readings are not filtered: the portal does not report their nature.
    pub fn from_gas(readings: Vec<RawGasReading>, selection: Selection) -> Option<Self> {
        Self::select(readings.into_iter().map(DailyReading::from), selection)
    }

    fn select(
        readings: impl IntoIterator<Item = DailyReading>,
        selection: Selection,
    ) -> Option<Self> {
        let series = readings.into_iter().sorted_by_key(|reading| reading.start).collect_vec();
        let representative = match selection {
            Selection::Latest => series.last(),
            Selection::Earliest => series.first(),
        }
        .copied()?;
        Some(Self { representative, series })
    }
}
