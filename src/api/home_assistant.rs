use std::time::Duration;

use async_trait::async_trait;
use reqwest::{
    Client,
    StatusCode,
    Url,
    header::{HeaderMap, HeaderName, HeaderValue},
};
use serde::Deserialize;

use crate::{
    credentials::{Otp, OtpSource},
    prelude::*,
    publisher::StateSink,
    sensor::SensorState,
};

/// Home Assistant REST API.
pub struct Api {
    client: Client,
    base_url: Url,
}

impl Api {
    pub fn try_new(access_token: &str, base_url: Url) -> Result<Self> {
        let headers = HeaderMap::from_iter([(
            HeaderName::from_static("authorization"),
            HeaderValue::from_str(&format!("Bearer {access_token}"))?,
        )]);
        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self { client, base_url })
    }

    fn state_url(&self, entity_id: &str) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| anyhow!("invalid base URL"))?
            .pop_if_empty()
            .push("states")
            .push(entity_id);
        Ok(url)
    }

    /// Fetch the entity state, `None` if the entity does not exist.
    #[instrument(skip_all, fields(entity_id = entity_id))]
    pub async fn get_state(&self, entity_id: &str) -> Result<Option<EntityState>> {
        let response = self
            .client
            .get(self.state_url(entity_id)?)
            .send()
            .await
            .with_context(|| format!("failed to request the state of `{entity_id}`"))?;
        if response.status() == StatusCode::NOT_FOUND {
            warn!("the entity does not exist");
            return Ok(None);
        }
        let state = response
            .error_for_status()?
            .json()
            .await
            .with_context(|| format!("failed to deserialize the state of `{entity_id}`"))?;
        Ok(Some(state))
    }

    /// Create or overwrite the entity state.
    #[instrument(skip_all, fields(entity_id = sensor.entity_id))]
    pub async fn set_state(&self, sensor: &SensorState) -> Result {
        debug!(state = sensor.state, "posting…");
        self.client
            .post(self.state_url(&sensor.entity_id)?)
            .json(sensor)
            .send()
            .await
            .with_context(|| format!("failed to post the state of `{}`", sensor.entity_id))?
            .error_for_status()?;
        Ok(())
    }
}

#[async_trait]
impl StateSink for Api {
    async fn publish(&self, sensor: &SensorState) -> Result {
        self.set_state(sensor).await
    }
}

#[must_use]
#[derive(Deserialize)]
pub struct EntityState {
    pub state: String,
}

/// Entity that receives the one-time codes, for example from an email integration.
pub struct OtpEntity<'a> {
    api: &'a Api,
    entity_id: String,
}

impl<'a> OtpEntity<'a> {
    pub const fn new(api: &'a Api, entity_id: String) -> Self {
        Self { api, entity_id }
    }
}

#[async_trait]
impl OtpSource for OtpEntity<'_> {
    fn id(&self) -> &str {
        &self.entity_id
    }

    async fn get_otp(&self) -> Result<Option<Otp>> {
        let state = self.api.get_state(&self.entity_id).await?;
        Ok(state.and_then(|state| Otp::parse(Some(&state.state))))
    }
}
