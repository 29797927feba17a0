use std::path::PathBuf;

use chromiumoxide::{browser::BrowserConfig, handler::viewport::Viewport};
use clap::Parser;

use crate::{prelude::*, session::VIEWPORT};

#[derive(Parser)]
pub struct BrowserArgs {
    /// Show the browser window.
    #[clap(long = "dev", env = "DEV_MODE")]
    is_dev: bool,

    /// Chromium executable, detected automatically if not set.
    #[clap(long = "chromium-path", env = "CHROMIUM_PATH")]
    chromium_path: Option<PathBuf>,

    /// User agent of a regular desktop Chrome, instead of the headless one.
    #[clap(
        long = "user-agent",
        env = "EDF_USER_AGENT",
        default_value = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36"
    )]
    user_agent: String,
}

impl BrowserArgs {
    pub fn config(&self) -> Result<BrowserConfig> {
        let (width, height) = VIEWPORT;
        let mut builder = BrowserConfig::builder()
            .window_size(width, height)
            .viewport(Viewport { width, height, ..Viewport::default() })
            .no_sandbox()
            .args(self.launch_args());
        if self.is_dev {
            builder = builder.with_head();
        }
        if let Some(path) = &self.chromium_path {
            builder = builder.chrome_executable(path);
        }
        builder.build().map_err(|error| anyhow!("failed to build the browser config: {error}"))
    }

    /// Extra Chromium switches, which also hide the usual automation tells.
    fn launch_args(&self) -> Vec<String> {
        vec![
            "--disable-gpu".to_owned(),
            "--disable-dev-shm-usage".to_owned(),
            "--disable-blink-features=AutomationControlled".to_owned(),
            format!("--user-agent={}", self.user_agent),
        ]
    }
}
