use std::time::Duration;

use bon::Builder;

/// Bounds of every wait of a run.
#[must_use]
#[derive(Copy, Clone, Debug, Builder)]
pub struct Timings {
    /// Page loads and the navigation following a form submission.
    #[builder(default = Duration::from_secs(300))]
    pub navigation_timeout: Duration,

    /// Elements that must appear.
    #[builder(default = Duration::from_secs(30))]
    pub element_timeout: Duration,

    /// The delivery method selection, which only appears when MFA is required.
    #[builder(default = Duration::from_secs(10))]
    pub mfa_timeout: Duration,

    /// Unconditional delay for the one-time code to arrive by email.
    #[builder(default = Duration::from_secs(30))]
    pub otp_delay: Duration,

    /// Unconditional delay after each dashboard view switch.
    #[builder(default = Duration::from_secs(3))]
    pub settle_delay: Duration,

    #[builder(default = Duration::from_secs(60))]
    pub extraction_timeout: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Self::builder().build()
    }
}
