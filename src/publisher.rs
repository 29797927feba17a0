use async_trait::async_trait;

use crate::{error::RunError, prelude::*, sensor::SensorState};

/// External store of the sensor states.
///
/// Publishing overwrites the previous state, so publishing the same state again is harmless.
#[async_trait]
pub trait StateSink: Sync {
    async fn publish(&self, sensor: &SensorState) -> Result;
}

/// Publish the sensors one by one, a failure does not prevent the others from being published.
///
/// Returns the number of the published sensors.
pub async fn publish_all(
    sink: &impl StateSink,
    sensors: impl IntoIterator<Item = SensorState>,
) -> usize {
    let mut n_published = 0;
    for sensor in sensors {
        match sink.publish(&sensor).await {
            Ok(()) => {
                info!(entity_id = sensor.entity_id, state = sensor.state, "published");
                n_published += 1;
            }
            Err(source) => {
                let error = Error::from(RunError::PublishFailed { name: sensor.entity_id, source });
                warn!("{error:#}");
            }
        }
    }
    n_published
}

#[cfg(test)]
pub mod recording {
    use std::{collections::HashSet, sync::Mutex};

    use super::*;

    /// Keeps the published sensors in memory.
    #[derive(Default)]
    pub struct RecordingSink {
        pub published: Mutex<Vec<SensorState>>,
        pub failing: HashSet<String>,
    }

    impl RecordingSink {
        pub fn entity_ids(&self) -> Vec<String> {
            self.published.lock().unwrap().iter().map(|sensor| sensor.entity_id.clone()).collect()
        }
    }

    #[async_trait]
    impl StateSink for RecordingSink {
        async fn publish(&self, sensor: &SensorState) -> Result {
            ensure!(!self.failing.contains(&sensor.entity_id), "internal server error");
            self.published.lock().unwrap().push(sensor.clone());
            Ok(())
        }
    }
}
