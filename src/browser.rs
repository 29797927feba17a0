//! Browser automation seam.
//!
//! The session state machine, the view navigator, and the extractor only talk to
//! [`Driver`]. The production implementation is [`chromium::Browser`], tests use a scripted
//! in-memory driver.

pub mod chromium;
#[cfg(test)]
pub mod scripted;

use std::{future::Future, time::Duration};

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use serde_json::Value;
use tokio::time::{Instant, sleep};

use crate::prelude::*;

pub const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Dumps `sessionStorage` as a `{key: value}` object.
const DUMP_SESSION_STORAGE: &str = r"
    (() => {
        const entries = {};
        for (let index = 0; index < window.sessionStorage.length; index++) {
            const key = window.sessionStorage.key(index);
            entries[key] = window.sessionStorage.getItem(key);
        }
        return entries;
    })()
";

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ResourceKind {
    Xhr,
    Fetch,
    Other,
}

/// Network response seen by the page.
#[derive(Clone, Debug)]
pub struct ObservedResponse {
    pub url: String,
    pub status: u16,
    pub resource_kind: ResourceKind,

    /// Parsed JSON body, [`Value::Null`] if the body is not JSON.
    pub body: Value,
}

impl ObservedResponse {
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    #[must_use]
    pub const fn is_api_call(&self) -> bool {
        matches!(self.resource_kind, ResourceKind::Xhr | ResourceKind::Fetch)
    }
}

/// Stream of the responses whose URL matched the observed pattern.
///
/// The underlying listener lives as long as the stream.
pub type ResponseStream<'a> = BoxStream<'a, Result<ObservedResponse>>;

#[async_trait]
pub trait Driver: Sync {
    /// Load the URL and wait until the page has loaded.
    async fn navigate(&self, url: &str) -> Result;

    /// Wait for the pending navigation, if any, to finish.
    async fn wait_for_navigation(&self, timeout: Duration) -> Result;

    async fn is_present(&self, selector: &str) -> Result<bool>;

    /// Click the element and keep it focused for the subsequent keyboard input.
    async fn click(&self, selector: &str) -> Result;

    /// Type into the focused element.
    async fn type_text(&self, text: &str) -> Result;

    /// Press a key on the focused element, for example `Enter`.
    async fn press_key(&self, key: &str) -> Result;

    async fn evaluate(&self, script: &str) -> Result<Value>;

    async fn current_url(&self) -> Result<String>;

    async fn move_pointer(&self, x: f64, y: f64) -> Result;

    /// Start observing the network responses whose URL contains the pattern.
    async fn observe_responses(&self, url_pattern: &str) -> Result<ResponseStream<'_>>;

    /// Poll for the element until it appears or the timeout expires.
    ///
    /// Returns `false` on timeout, it is up to the caller to decide whether that is an error.
    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> Result<bool> {
        poll_until(timeout, move || self.is_present(selector)).await
    }

    /// Find the first `sessionStorage` entry whose key contains all the patterns.
    async fn read_session_cache(&self, patterns: &[&str]) -> Result<Option<Value>> {
        let entries = self.evaluate(DUMP_SESSION_STORAGE).await?;
        let Value::Object(entries) = entries else {
            bail!("`sessionStorage` dump is not an object: {entries}");
        };
        find_cache_entry(&entries, patterns)
    }
}

/// Look up the cache entry by the key patterns and unwrap its nested `value`.
///
/// Keys are visited in lexicographic order, so that the lookup is deterministic.
pub fn find_cache_entry(
    entries: &serde_json::Map<String, Value>,
    patterns: &[&str],
) -> Result<Option<Value>> {
    let Some((key, raw)) = entries
        .iter()
        .filter(|(key, _)| patterns.iter().all(|pattern| key.contains(pattern)))
        .min_by(|(lhs, _), (rhs, _)| lhs.cmp(rhs))
    else {
        return Ok(None);
    };
    debug!(key, "found the cache entry");
    let entry = match raw {
        Value::String(raw) => serde_json::from_str(raw)
            .with_context(|| format!("failed to parse the cache entry `{key}`"))?,
        other => other.clone(),
    };
    let value = match entry {
        Value::Object(mut entry) => entry.remove("value").unwrap_or(Value::Null),
        _ => Value::Null,
    };
    let value = match value {
        Value::String(value) => serde_json::from_str(&value)
            .with_context(|| format!("failed to parse the nested value of `{key}`"))?,
        value => value,
    };
    Ok(Some(value).filter(|value| !value.is_null()))
}

/// Poll the condition until it holds or the timeout expires.
///
/// The condition is always checked at least once.
pub async fn poll_until<F, Fut>(timeout: Duration, mut condition: F) -> Result<bool>
where
    F: FnMut() -> Fut + Send,
    Fut: Future<Output = Result<bool>> + Send,
{
    let deadline = Instant::now() + timeout;
    loop {
        if condition().await? {
            return Ok(true);
        }
        let now = Instant::now();
        if now >= deadline {
            return Ok(false);
        }
        sleep(POLL_INTERVAL.min(deadline - now)).await;
    }
}
