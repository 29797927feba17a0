use std::fmt::{Debug, Formatter};

use async_trait::async_trait;

use crate::prelude::*;

/// One-time code from the side channel.
#[derive(Clone, PartialEq, Eq)]
pub struct Otp(String);

impl Otp {
    /// Wrap the raw side-channel value, rejecting the placeholders of an empty state.
    #[must_use]
    pub fn parse(raw: Option<&str>) -> Option<Self> {
        let raw = raw?.trim();
        if raw.is_empty() || raw == "unknown" || raw == "unavailable" {
            None
        } else {
            Some(Self(raw.to_owned()))
        }
    }

    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl Debug for Otp {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Otp(<{} characters>)", self.0.len())
    }
}

/// Side-channel value store polled for the one-time code.
#[async_trait]
pub trait OtpSource: Sync {
    /// Identifier of the value, for the error messages.
    fn id(&self) -> &str;

    /// Fetch the current code, `None` when it is not there.
    async fn get_otp(&self) -> Result<Option<Otp>>;
}

#[cfg(test)]
pub struct FixedOtp(pub Option<&'static str>);

#[cfg(test)]
#[async_trait]
impl OtpSource for FixedOtp {
    fn id(&self) -> &'static str {
        "sensor.edf_code"
    }

    async fn get_otp(&self) -> Result<Option<Otp>> {
        Ok(Otp::parse(self.0))
    }
}
