//! Home Assistant sensor states.

use serde::Serialize;

use crate::{
    fluid::Fluid,
    quantity::{cost::Cost, energy::KilowattHours},
    summary::{DailyReading, Summary},
};

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Metric {
    Energy,
    Cost,
}

/// Body of `POST /api/states/<entity_id>`.
#[must_use]
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SensorState {
    #[serde(skip)]
    pub entity_id: String,

    pub state: String,
    pub attributes: Attributes,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Attributes {
    pub unit_of_measurement: &'static str,
    pub friendly_name: String,
    pub icon: &'static str,
    pub device_class: &'static str,
    pub state_class: &'static str,

    /// Day of the reading.
    pub date: String,

    /// Chart-ready history of the retained readings.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub series: Option<Vec<SeriesPoint>>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub date: String,

    #[serde(flatten)]
    pub value: SeriesValue,
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SeriesValue {
    Energy(f64),
    Cost(f64),
}

impl SensorState {
    /// Energy and cost sensors of the fluid, in this order.
    pub fn pair(fluid: Fluid, summary: &Summary, with_series: bool) -> [Self; 2] {
        [Metric::Energy, Metric::Cost].map(|metric| Self::new(fluid, metric, summary, with_series))
    }

    pub fn new(fluid: Fluid, metric: Metric, summary: &Summary, with_series: bool) -> Self {
        let reading = &summary.representative;
        let series = with_series.then(|| {
            summary
                .series
                .iter()
                .map(|reading| SeriesPoint {
                    date: reading.formatted_date(),
                    value: SeriesValue::of(metric, reading),
                })
                .collect()
        });
        let friendly_name = format!("EDF - {} consumption", fluid.label());
        match metric {
            Metric::Energy => Self {
                entity_id: format!("sensor.edf_{fluid}_consumption_kwh"),
                state: reading.energy.fixed(),
                attributes: Attributes {
                    unit_of_measurement: KilowattHours::UNIT,
                    friendly_name,
                    icon: fluid.icon(),
                    device_class: "energy",
                    state_class: "measurement",
                    date: reading.formatted_date(),
                    series,
                },
            },
            Metric::Cost => Self {
                entity_id: format!("sensor.edf_{fluid}_consumption_cost"),
                state: reading.cost.fixed(),
                attributes: Attributes {
                    unit_of_measurement: Cost::UNIT,
                    friendly_name: format!("{friendly_name} cost"),
                    icon: "mdi:currency-eur",
                    device_class: "monetary",
                    state_class: "total_increasing",
                    date: reading.formatted_date(),
                    series,
                },
            },
        }
    }
}

impl SeriesValue {
    fn of(metric: Metric, reading: &DailyReading) -> Self {
        match metric {
            Metric::Energy => Self::Energy(reading.energy.rounded()),
            Metric::Cost => Self::Cost(reading.cost.rounded()),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::DateTime;
    use serde_json::json;

    use super::*;
    use crate::prelude::*;

    fn summary() -> Result<Summary> {
        let first = DailyReading {
            start: DateTime::parse_from_rfc3339("2024-01-02T00:00:00Z")?,
            energy: KilowattHours(10.5),
            cost: Cost(2.1),
        };
        let second = DailyReading {
            start: DateTime::parse_from_rfc3339("2024-01-03T00:00:00Z")?,
            energy: KilowattHours(11.25),
            cost: Cost(2.3),
        };
        Ok(Summary { representative: second, series: vec![first, second] })
    }

    #[test]
    fn electricity_pair_ok() -> Result {
        let [energy, cost] = SensorState::pair(Fluid::Electricity, &summary()?, false);
        assert_eq!(energy.entity_id, "sensor.edf_electricity_consumption_kwh");
        assert_eq!(
            serde_json::to_value(&energy)?,
            json!({
                "state": "11.250",
                "attributes": {
                    "unit_of_measurement": "kWh",
                    "friendly_name": "EDF - Electricity consumption",
                    "icon": "mdi:power",
                    "device_class": "energy",
                    "state_class": "measurement",
                    "date": "2024-01-03T00:00:00.000Z",
                },
            })
        );
        assert_eq!(cost.entity_id, "sensor.edf_electricity_consumption_cost");
        assert_eq!(cost.state, "2.30");
        assert_eq!(cost.attributes.unit_of_measurement, "€");
        assert_eq!(cost.attributes.device_class, "monetary");
        Ok(())
    }

    #[test]
    fn gas_names_ok() -> Result {
        let [energy, cost] = SensorState::pair(Fluid::Gas, &summary()?, false);
        assert_eq!(energy.entity_id, "sensor.edf_gas_consumption_kwh");
        assert_eq!(energy.attributes.icon, "mdi:fire");
        assert_eq!(cost.entity_id, "sensor.edf_gas_consumption_cost");
        Ok(())
    }

    #[test]
    fn series_ok() -> Result {
        let [energy, cost] = SensorState::pair(Fluid::Electricity, &summary()?, true);
        assert_eq!(
            serde_json::to_value(&energy.attributes.series)?,
            json!([
                { "date": "2024-01-02T00:00:00.000Z", "energy": 10.5 },
                { "date": "2024-01-03T00:00:00.000Z", "energy": 11.25 },
            ])
        );
        assert_eq!(
            serde_json::to_value(&cost.attributes.series)?,
            json!([
                { "date": "2024-01-02T00:00:00.000Z", "cost": 2.1 },
                { "date": "2024-01-03T00:00:00.000Z", "cost": 2.3 },
            ])
        );
        assert_eq!(energy.state, "11.250");
        Ok(())
    }
}
