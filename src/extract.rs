//! Captures the consumption payload while the navigator walks through the views.

use futures_util::StreamExt;
use serde_json::Value;
use tokio::{join, time::timeout};

use crate::{
    browser::{Driver, ObservedResponse, ResponseStream, poll_until},
    error::RunError,
    fluid::Fluid,
    navigator::Navigator,
    prelude::*,
    timings::Timings,
};

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, clap::ValueEnum)]
pub enum Extraction {
    /// Capture the API responses while the views are being switched.
    #[default]
    Interception,

    /// Read the payload cached by the application in `sessionStorage`.
    Cache,
}

/// Decides whether an observed response carries the fluid's daily consumptions.
pub struct ResponseMatcher {
    url_pattern: &'static str,
    step: Option<&'static str>,
}

impl ResponseMatcher {
    #[must_use]
    pub const fn new(fluid: Fluid) -> Self {
        Self { url_pattern: fluid.api_url_pattern(), step: fluid.api_step() }
    }

    #[must_use]
    pub fn matches(&self, response: &ObservedResponse) -> bool {
        response.url.contains(self.url_pattern)
            && response.is_success()
            && response.is_api_call()
            && self.step.is_none_or(|step| {
                response.body.get("step").and_then(Value::as_str) == Some(step)
            })
    }

    /// Consume the responses until the first match, which wins over any later one.
    pub async fn first_match(&self, mut responses: ResponseStream<'_>) -> Option<Value> {
        while let Some(response) = responses.next().await {
            match response {
                Ok(response) if self.matches(&response) => {
                    info!(url = response.url, "captured");
                    return Some(response.body);
                }
                Ok(response) => {
                    debug!(url = response.url, status = response.status, "skipped");
                }
                Err(error) => {
                    warn!("failed to read the response: {error:#}");
                }
            }
        }
        None
    }
}

pub struct Extractor<'a, D> {
    driver: &'a D,
    extraction: Extraction,
    timings: Timings,
}

impl<'a, D: Driver> Extractor<'a, D> {
    pub const fn new(driver: &'a D, extraction: Extraction, timings: Timings) -> Self {
        Self { driver, extraction, timings }
    }

    /// Cycle through the fluid's views and return its raw consumption payload.
    #[instrument(skip_all, fields(fluid = %fluid, extraction = ?self.extraction))]
    pub async fn extract(&self, navigator: &mut Navigator<'a, D>, fluid: Fluid) -> Result<Value> {
        let payload = match self.extraction {
            Extraction::Interception => self.intercept(navigator, fluid).await?,
            Extraction::Cache => self.read_cache(navigator, fluid).await?,
        };
        payload
            .filter(|payload| !payload.is_null())
            .ok_or_else(|| RunError::NoDataForFluid(fluid).into())
    }

    async fn intercept(
        &self,
        navigator: &mut Navigator<'a, D>,
        fluid: Fluid,
    ) -> Result<Option<Value>> {
        // The listener must be attached before the first click.
        let responses = self.driver.observe_responses(fluid.api_url_pattern()).await?;
        let matcher = ResponseMatcher::new(fluid);
        let limit = self.timings.extraction_timeout;
        let (cycled, captured) =
            join!(navigator.cycle(fluid), timeout(limit, matcher.first_match(responses)));
        cycled?;
        captured.map_err(|_| RunError::ExtractionTimeout { fluid, timeout: limit }.into())
    }

    async fn read_cache(
        &self,
        navigator: &mut Navigator<'a, D>,
        fluid: Fluid,
    ) -> Result<Option<Value>> {
        navigator.cycle(fluid).await?;
        let driver = self.driver;
        let patterns = fluid.cache_key_patterns();
        let is_cached = poll_until(self.timings.extraction_timeout, || async move {
            Ok(driver.read_session_cache(patterns).await?.is_some())
        })
        .await?;
        if !is_cached {
            warn!("nothing in the cache");
            return Ok(None);
        }
        driver.read_session_cache(patterns).await
    }
}
