use std::time::Duration;

use crate::fluid::Fluid;

/// Failures the run reacts to by kind.
///
/// These travel inside [`anyhow::Error`] and are recovered with `downcast_ref`.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("navigation did not complete within {0:?}")]
    NavigationTimeout(Duration),

    #[error("element `{selector}` did not appear within {timeout:?}")]
    ElementNotFound { selector: String, timeout: Duration },

    #[error("no one-time code available in `{entity_id}`")]
    OtpUnavailable { entity_id: String },

    #[error("still on the session-expired page after the recovery")]
    SessionExpiredUnrecovered,

    #[error("login failed, the portal went back to `{url}`")]
    LoginFailed { url: String },

    #[error("no {fluid} payload within {timeout:?}")]
    ExtractionTimeout { fluid: Fluid, timeout: Duration },

    #[error("no {0} data today")]
    NoDataForFluid(Fluid),

    #[error("failed to publish `{name}`")]
    PublishFailed {
        name: String,

        #[source]
        source: anyhow::Error,
    },
}

impl RunError {
    /// Whether the error only affects a single fluid and the run may go on.
    #[must_use]
    pub const fn is_per_fluid(&self) -> bool {
        matches!(
            self,
            Self::ExtractionTimeout { .. } | Self::NoDataForFluid(_) | Self::PublishFailed { .. }
        )
    }
}
