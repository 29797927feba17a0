//! Run monitoring: every run pings the URL, a failed run pings its `/fail` sub-path.

use std::time::Duration;

use reqwest::{Client, Url};

use crate::{pipeline::Report, prelude::*};

pub struct Heartbeat {
    client: Client,
    url: Url,
}

impl Heartbeat {
    pub fn try_new(url: Url) -> Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(3)).build()?;
        Ok(Self { client, url })
    }

    /// Post the run outcome as plain text. Delivery failures are only logged.
    pub async fn report(&self, result: &Result<Report>) {
        if let Err(error) = self.report_fallible(result).await {
            warn!("failed to send the heartbeat: {error:#}");
        }
    }

    async fn report_fallible(&self, result: &Result<Report>) -> Result {
        let (url, body) = match result {
            Ok(report) => (self.url.clone(), report.to_string()),
            Err(error) => (self.fail_url()?, format!("{error:#}")),
        };
        self.ping(url, body).await
    }

    fn fail_url(&self) -> Result<Url> {
        let mut url = self.url.clone();
        url.path_segments_mut()
            .map_err(|()| anyhow!("invalid heartbeat URL"))?
            .pop_if_empty()
            .push("fail");
        Ok(url)
    }

    #[instrument(skip_all, fields(url = %url))]
    async fn ping(&self, url: Url, body: String) -> Result {
        info!("sending a heartbeat…");
        self.client.post(url).body(body).send().await?.error_for_status()?;
        Ok(())
    }
}
