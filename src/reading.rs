//! Consumption payloads as the portal serves them.

use std::{
    fmt::{Display, Formatter},
    str::FromStr,
};

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};
use serde::Deserialize;
use serde_with::{DisplayFromStr, PickFirst, VecSkipError, serde_as};

use crate::{
    prelude::*,
    quantity::{cost::Cost, energy::KilowattHours},
};

/// Payload is either the full API response or just its readings.
///
/// Unreadable readings are dropped, the rest of the payload still counts.
#[serde_as]
#[derive(Deserialize)]
#[serde(untagged, bound(deserialize = "R: Deserialize<'de>"))]
pub enum Consumptions<R> {
    Wrapped {
        #[serde_as(as = "VecSkipError<_>")]
        consumptions: Vec<R>,
    },
    Bare(#[serde_as(as = "VecSkipError<_>")] Vec<R>),
}

impl<R> Consumptions<R> {
    pub fn into_readings(self) -> Vec<R> {
        match self {
            Self::Wrapped { consumptions } | Self::Bare(consumptions) => consumptions,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Nature {
    Real,
    Estimated,

    #[serde(other)]
    Other,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    Complete,
    Incomplete,

    #[serde(other)]
    Other,
}

/// Electricity reading.
#[must_use]
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawReading {
    pub nature: Nature,
    pub status: Status,
    pub period: Period,
    pub energy_meter: EnergyMeter,
    pub cost: TotalCost,
}

impl RawReading {
    /// Only real and complete readings are worth publishing.
    #[must_use]
    pub fn is_eligible(&self) -> bool {
        self.nature == Nature::Real && self.status == Status::Complete
    }
}

#[serde_as]
#[derive(Clone, Debug, Deserialize)]
pub struct Period {
    #[serde_as(as = "DisplayFromStr")]
    #[serde(rename = "startTime")]
    pub start: Timestamp,

    #[serde_as(as = "Option<DisplayFromStr>")]
    #[serde(rename = "endTime", default)]
    pub end: Option<Timestamp>,
}

#[serde_as]
#[derive(Clone, Debug, Deserialize)]
pub struct EnergyMeter {
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    pub total: KilowattHours,
}

#[serde_as]
#[derive(Clone, Debug, Deserialize)]
pub struct TotalCost {
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    pub total: Cost,
}

/// Gas reading.
#[must_use]
#[serde_as]
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawGasReading {
    pub day: NaiveDate,
    pub consumption: GasConsumption,

    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    pub total_cost: Cost,
}

#[serde_as]
#[derive(Clone, Debug, Deserialize)]
pub struct GasConsumption {
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    pub energy: KilowattHours,
}

/// Portal timestamp: RFC 3339, or a naive date-time in UTC.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd)]
pub struct Timestamp(pub DateTime<FixedOffset>);

impl FromStr for Timestamp {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if let Ok(timestamp) = DateTime::parse_from_rfc3339(s) {
            return Ok(Self(timestamp));
        }
        ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"]
            .into_iter()
            .find_map(|format| NaiveDateTime::parse_from_str(s, format).ok())
            .map(|timestamp| Self(timestamp.and_utc().fixed_offset()))
            .with_context(|| format!("invalid timestamp `{s}`"))
    }
}

impl Display for Timestamp {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}
