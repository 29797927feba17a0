use std::{
    collections::{HashMap, HashSet},
    sync::Mutex,
    time::Duration,
};

use async_trait::async_trait;
use futures_util::{StreamExt, stream};
use serde_json::Value;
use tokio::time::Instant;

use crate::{
    browser::{Driver, ObservedResponse, ResourceKind, ResponseStream},
    prelude::*,
};

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Action {
    Navigate(String),
    Click(String),
    Type(String),
    Press(String),
}

/// In-memory page that follows a script.
#[derive(Default)]
pub struct ScriptedDriver {
    url: Mutex<String>,
    present: HashSet<String>,

    /// Where the page goes when the selector is clicked.
    redirects: HashMap<String, String>,

    /// Same as `redirects`, but the page only gets there after the delay.
    slow_redirects: HashMap<String, (Duration, String)>,

    pending_redirect: Mutex<Option<(Instant, String)>>,

    responses: Vec<ObservedResponse>,
    session_storage: serde_json::Map<String, Value>,
    actions: Mutex<Vec<Action>>,
}

impl ScriptedDriver {
    #[must_use]
    pub fn with_present<'a>(mut self, selectors: impl IntoIterator<Item = &'a str>) -> Self {
        self.present.extend(selectors.into_iter().map(str::to_owned));
        self
    }

    #[must_use]
    pub fn with_redirect(mut self, selector: &str, url: &str) -> Self {
        self.redirects.insert(selector.to_owned(), url.to_owned());
        self
    }

    #[must_use]
    pub fn with_slow_redirect(mut self, selector: &str, url: &str, delay: Duration) -> Self {
        self.slow_redirects.insert(selector.to_owned(), (delay, url.to_owned()));
        self
    }

    /// Successful XHR response.
    #[must_use]
    pub fn with_response(self, url: &str, body: Value) -> Self {
        self.with_observed(ObservedResponse {
            url: url.to_owned(),
            status: 200,
            resource_kind: ResourceKind::Xhr,
            body,
        })
    }

    #[must_use]
    pub fn with_observed(mut self, response: ObservedResponse) -> Self {
        self.responses.push(response);
        self
    }

    #[must_use]
    pub fn with_session_entry(mut self, key: &str, value: &Value) -> Self {
        let entry = serde_json::json!({ "value": value }).to_string();
        self.session_storage.insert(key.to_owned(), Value::String(entry));
        self
    }

    pub fn actions(&self) -> Vec<Action> {
        self.actions.lock().unwrap().clone()
    }

    pub fn clicks(&self) -> Vec<String> {
        self.actions()
            .into_iter()
            .filter_map(|action| match action {
                Action::Click(selector) => Some(selector),
                _ => None,
            })
            .collect()
    }

    fn record(&self, action: Action) {
        self.actions.lock().unwrap().push(action);
    }
}

#[async_trait]
impl Driver for ScriptedDriver {
    async fn navigate(&self, url: &str) -> Result {
        self.record(Action::Navigate(url.to_owned()));
        url.clone_into(&mut self.url.lock().unwrap());
        Ok(())
    }

    async fn wait_for_navigation(&self, _timeout: Duration) -> Result {
        Ok(())
    }

    async fn is_present(&self, selector: &str) -> Result<bool> {
        Ok(self.present.contains(selector))
    }

    async fn click(&self, selector: &str) -> Result {
        ensure!(self.present.contains(selector), "no element `{selector}`");
        self.record(Action::Click(selector.to_owned()));
        if let Some(url) = self.redirects.get(selector) {
            url.clone_into(&mut self.url.lock().unwrap());
        }
        if let Some((delay, url)) = self.slow_redirects.get(selector) {
            *self.pending_redirect.lock().unwrap() = Some((Instant::now() + *delay, url.clone()));
        }
        Ok(())
    }

    async fn type_text(&self, text: &str) -> Result {
        self.record(Action::Type(text.to_owned()));
        Ok(())
    }

    async fn press_key(&self, key: &str) -> Result {
        self.record(Action::Press(key.to_owned()));
        Ok(())
    }

    async fn evaluate(&self, _script: &str) -> Result<Value> {
        Ok(Value::Object(self.session_storage.clone()))
    }

    async fn current_url(&self) -> Result<String> {
        let mut pending_redirect = self.pending_redirect.lock().unwrap();
        if pending_redirect.as_ref().is_some_and(|(at, _)| *at <= Instant::now())
            && let Some((_, url)) = pending_redirect.take()
        {
            *self.url.lock().unwrap() = url;
        }
        Ok(self.url.lock().unwrap().clone())
    }

    async fn move_pointer(&self, _x: f64, _y: f64) -> Result {
        Ok(())
    }

    async fn observe_responses(&self, url_pattern: &str) -> Result<ResponseStream<'_>> {
        let responses = self
            .responses
            .iter()
            .filter(|response| response.url.contains(url_pattern))
            .cloned()
            .map(Ok)
            .collect::<Vec<_>>();
        Ok(stream::iter(responses).boxed())
    }
}
