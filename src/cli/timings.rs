use clap::Parser;

use crate::timings::Timings;

#[derive(Parser)]
pub struct TimingArgs {
    #[clap(long, env = "NAVIGATION_TIMEOUT", default_value = "5min")]
    navigation_timeout: humantime::Duration,

    #[clap(long, env = "ELEMENT_TIMEOUT", default_value = "30s")]
    element_timeout: humantime::Duration,

    /// How long to look for the MFA method selection before assuming there is no MFA.
    #[clap(long, env = "MFA_TIMEOUT", default_value = "10s")]
    mfa_timeout: humantime::Duration,

    /// Time given to the one-time code to arrive.
    #[clap(long, env = "OTP_DELAY", default_value = "30s")]
    otp_delay: humantime::Duration,

    #[clap(long, env = "SETTLE_DELAY", default_value = "3s")]
    settle_delay: humantime::Duration,

    #[clap(long, env = "EXTRACTION_TIMEOUT", default_value = "1min")]
    extraction_timeout: humantime::Duration,
}

impl From<&TimingArgs> for Timings {
    fn from(args: &TimingArgs) -> Self {
        Self::builder()
            .navigation_timeout(args.navigation_timeout.into())
            .element_timeout(args.element_timeout.into())
            .mfa_timeout(args.mfa_timeout.into())
            .otp_delay(args.otp_delay.into())
            .settle_delay(args.settle_delay.into())
            .extraction_timeout(args.extraction_timeout.into())
            .build()
    }
}
