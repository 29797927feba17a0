use clap::Parser;
use reqwest::Url;

use crate::{api::home_assistant, prelude::*};

#[derive(Parser)]
pub struct HomeAssistantArgs {
    /// Home Assistant API access token, the Supervisor provides it to the add-ons.
    #[clap(
        long = "home-assistant-access-token",
        env = "SUPERVISOR_TOKEN",
        hide_env_values = true
    )]
    access_token: String,

    /// Home Assistant API base URL. For example: `http://localhost:8123/api`.
    #[clap(
        long = "home-assistant-api-base-url",
        env = "HOME_ASSISTANT_API_BASE_URL",
        default_value = "http://supervisor/core/api"
    )]
    base_url: Url,
}

impl HomeAssistantArgs {
    pub fn try_new_client(&self) -> Result<home_assistant::Api> {
        home_assistant::Api::try_new(&self.access_token, self.base_url.clone())
    }
}
