//! Chromium over the DevTools protocol.

use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::{
    Element,
    Page,
    browser::BrowserConfig,
    cdp::{
        browser_protocol::network::{EventResponseReceived, GetResponseBodyParams, ResourceType},
        js_protocol::runtime::EventConsoleApiCalled,
    },
    layout::Point,
};
use futures_util::{StreamExt, future::ready};
use itertools::Itertools;
use serde_json::Value;
use tokio::{
    sync::Mutex,
    task::JoinHandle,
    time::{sleep, timeout},
};

use crate::{
    browser::{Driver, ObservedResponse, POLL_INTERVAL, ResourceKind, ResponseStream},
    error::RunError,
    prelude::*,
};

/// The response body is only available once the loading has finished.
const MAX_BODY_ATTEMPTS: usize = 20;

/// Browser process with the single page a run works with.
///
/// Must be released with [`Browser::close`]. If it is dropped instead, `chromiumoxide` still
/// kills the child process.
pub struct Browser {
    inner: chromiumoxide::Browser,
    handler: JoinHandle<()>,
    page: Page,

    /// Forwards the page console into the log.
    console: JoinHandle<()>,

    navigation_timeout: Duration,

    /// Target of the keyboard input.
    focused: Mutex<Option<Element>>,
}

impl Browser {
    #[instrument(skip_all)]
    pub async fn launch(config: BrowserConfig, navigation_timeout: Duration) -> Result<Self> {
        info!("launching…");
        let (inner, mut handler) =
            chromiumoxide::Browser::launch(config).await.context("failed to launch Chromium")?;
        let handler = tokio::spawn(async move {
            while let Some(result) = handler.next().await {
                if let Err(error) = result {
                    debug!("browser handler: {error:#}");
                }
            }
        });
        let (page, console) = match Self::open_page(&inner).await {
            Ok(opened) => opened,
            Err(error) => {
                handler.abort();
                return Err(error);
            }
        };
        Ok(Self { inner, handler, page, console, navigation_timeout, focused: Mutex::new(None) })
    }

    async fn open_page(inner: &chromiumoxide::Browser) -> Result<(Page, JoinHandle<()>)> {
        let page = inner.new_page("about:blank").await.context("failed to open a new page")?;
        let mut events = page
            .event_listener::<EventConsoleApiCalled>()
            .await
            .context("failed to listen to the console")?;
        let console = tokio::spawn(async move {
            while let Some(event) = events.next().await {
                let message = event
                    .args
                    .iter()
                    .map(|arg| render_console_arg(arg.value.as_ref(), arg.description.as_deref()))
                    .join(" ");
                let kind: &str = event.r#type.as_ref();
                debug!(kind, "page console: {message}");
            }
        });
        Ok((page, console))
    }

    /// Release the page and the browser process.
    #[instrument(skip_all)]
    pub async fn close(self) -> Result {
        info!("closing…");
        let Self { mut inner, handler, page, console, focused, .. } = self;
        drop(focused);
        console.abort();
        if let Err(error) = page.close().await {
            debug!("failed to close the page: {error:#}");
        }
        let result = async {
            inner.close().await.context("failed to close the browser")?;
            inner.wait().await.context("failed to wait for the browser process")?;
            Ok::<_, Error>(())
        }
        .await;
        handler.abort();
        result
    }

    async fn find(&self, selector: &str) -> Result<Element> {
        self.page.find_element(selector).await.with_context(|| format!("no element `{selector}`"))
    }
}

#[async_trait]
impl Driver for Browser {
    #[instrument(skip_all, fields(url = url))]
    async fn navigate(&self, url: &str) -> Result {
        timeout(self.navigation_timeout, self.page.goto(url))
            .await
            .map_err(|_| RunError::NavigationTimeout(self.navigation_timeout))?
            .with_context(|| format!("failed to navigate to `{url}`"))?;
        self.wait_for_navigation(self.navigation_timeout).await
    }

    async fn wait_for_navigation(&self, limit: Duration) -> Result {
        timeout(limit, self.page.wait_for_navigation())
            .await
            .map_err(|_| RunError::NavigationTimeout(limit))?
            .context("navigation failed")?;
        Ok(())
    }

    async fn is_present(&self, selector: &str) -> Result<bool> {
        let script =
            format!("document.querySelector({}) !== null", serde_json::to_string(selector)?);
        Ok(self.evaluate(&script).await?.as_bool().unwrap_or(false))
    }

    #[instrument(skip_all, level = Level::DEBUG, fields(selector = selector))]
    async fn click(&self, selector: &str) -> Result {
        let element = self.find(selector).await?;
        element.click().await.with_context(|| format!("failed to click `{selector}`"))?;
        *self.focused.lock().await = Some(element);
        Ok(())
    }

    async fn type_text(&self, text: &str) -> Result {
        let focused = self.focused.lock().await;
        let element = focused.as_ref().context("nothing to type into")?;
        element.type_str(text).await.context("failed to type")?;
        Ok(())
    }

    async fn press_key(&self, key: &str) -> Result {
        let focused = self.focused.lock().await;
        let element = focused.as_ref().context("nothing to press a key on")?;
        element.press_key(key).await.with_context(|| format!("failed to press `{key}`"))?;
        Ok(())
    }

    async fn evaluate(&self, script: &str) -> Result<Value> {
        self.page
            .evaluate(script)
            .await
            .context("failed to evaluate the script")?
            .into_value()
            .context("failed to convert the evaluation result")
    }

    async fn current_url(&self) -> Result<String> {
        Ok(self.page.url().await.context("failed to get the URL")?.unwrap_or_default())
    }

    async fn move_pointer(&self, x: f64, y: f64) -> Result {
        self.page.move_mouse(Point::new(x, y)).await.context("failed to move the pointer")?;
        Ok(())
    }

    async fn observe_responses(&self, url_pattern: &str) -> Result<ResponseStream<'_>> {
        let events = self
            .page
            .event_listener::<EventResponseReceived>()
            .await
            .context("failed to listen to the network responses")?;
        let url_pattern = url_pattern.to_owned();
        let page = self.page.clone();
        let responses = events
            .filter(move |event| ready(event.response.url.contains(&url_pattern)))
            .then(move |event| {
                let page = page.clone();
                async move { read_response(&page, &event).await }
            });
        Ok(responses.boxed())
    }
}

async fn read_response(page: &Page, event: &EventResponseReceived) -> Result<ObservedResponse> {
    let status = u16::try_from(event.response.status).context("invalid status code")?;
    let resource_kind = match event.r#type {
        ResourceType::Xhr => ResourceKind::Xhr,
        ResourceType::Fetch => ResourceKind::Fetch,
        _ => ResourceKind::Other,
    };
    let mut response = ObservedResponse {
        url: event.response.url.clone(),
        status,
        resource_kind,
        body: Value::Null,
    };
    debug!(url = response.url, status, ?resource_kind, "observed");
    if response.is_success() && response.is_api_call() {
        response.body = read_body(page, event).await?;
    }
    Ok(response)
}

async fn read_body(page: &Page, event: &EventResponseReceived) -> Result<Value> {
    let mut n_attempts = 0;
    loop {
        n_attempts += 1;
        match page.execute(GetResponseBodyParams::new(event.request_id.clone())).await {
            Ok(response) => {
                ensure!(!response.result.base64_encoded, "unexpected binary response body");
                return Ok(serde_json::from_str(&response.result.body).unwrap_or(Value::Null));
            }
            Err(error) if n_attempts < MAX_BODY_ATTEMPTS => {
                trace!(n_attempts, "body is not available yet: {error:#}");
                sleep(POLL_INTERVAL).await;
            }
            Err(error) => {
                return Err(error).context("failed to read the response body");
            }
        }
    }
}

/// Strings are shown as is, other values as JSON, and objects by their description.
fn render_console_arg(value: Option<&Value>, description: Option<&str>) -> String {
    match (value, description) {
        (Some(Value::String(text)), _) => text.clone(),
        (Some(value), _) => value.to_string(),
        (None, Some(description)) => description.to_owned(),
        (None, None) => "undefined".to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn render_console_arg_ok() {
        assert_eq!(render_console_arg(Some(&json!("loaded")), None), "loaded");
        assert_eq!(render_console_arg(Some(&json!({"step": "P1D"})), None), r#"{"step":"P1D"}"#);
        assert_eq!(render_console_arg(Some(&json!(42)), Some("42")), "42");
        assert_eq!(render_console_arg(None, Some("HTMLDivElement")), "HTMLDivElement");
        assert_eq!(render_console_arg(None, None), "undefined");
    }
}
