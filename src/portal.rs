//! What we know about the EDF Équilibre web application.

use crate::fluid::Fluid;

pub const ENTRY_URL: &str = "https://equilibre.edf.fr/comprendre";
pub const SESSION_EXPIRED_URL: &str = "https://equilibre.edf.fr/session-expiree";

/// The authentication pages all live on this host.
pub const LOGIN_URL_MARKER: &str = "auth.edf.fr";

pub const COOKIE_CONSENT: &str = r#"button[title="Accepter"]"#;
pub const EMAIL_FIELD: &str = "#email";

/// «Email» option of the one-time code delivery method.
pub const MFA_EMAIL_OPTION: &str = "#callback_0_1";
pub const MFA_METHOD_SUBMIT: &str = "#hotpcust3-next-button";
pub const OTP_FIELD: &str = "#code-seizure__field";
pub const OTP_SUBMIT: &str = "#hotpcust4-next-button";
pub const SESSION_EXPIRED_RECOVERY: &str = "button";

/// Time granularity of the consumption dashboard.
#[derive(Copy, Clone, Debug, Eq, PartialEq, derive_more::Display)]
pub enum View {
    #[display("day")]
    Day,

    #[display("month")]
    Month,

    #[display("year")]
    Year,
}

impl View {
    pub const fn selector(self) -> &'static str {
        match self {
            Self::Day => r#"button[aria-label="Accéder à la vue JOUR"]"#,
            Self::Month => r#"button[aria-label="Accéder à la vue MOIS"]"#,
            Self::Year => r#"button[aria-label="Accéder à la vue ANNEE"]"#,
        }
    }
}

impl Fluid {
    /// Tab that switches the dashboard to the fluid.
    pub const fn selector(self) -> &'static str {
        match self {
            Self::Electricity => r#"button[aria-label="Électricité"]"#,
            Self::Gas => r#"button[aria-label="Gaz"]"#,
        }
    }

    /// The application only computes the daily aggregate once the full cycle is visited.
    pub const fn view_cycle(self) -> &'static [View] {
        match self {
            Self::Electricity | Self::Gas => &[View::Day, View::Month, View::Year, View::Day],
        }
    }

    /// Consumption API endpoint of the fluid.
    pub const fn api_url_pattern(self) -> &'static str {
        match self {
            Self::Electricity => "https://equilibre.edf.fr/api/v2/sites/-/consumptions",
            Self::Gas => "https://equilibre.edf.fr/api/v2/sites/-/gas-consumptions",
        }
    }

    /// Expected `step` of the intercepted payload, if the fluid has one.
    pub const fn api_step(self) -> Option<&'static str> {
        match self {
            Self::Electricity => Some("P1D"),
            Self::Gas => None,
        }
    }

    /// Substrings that must all be present in the `sessionStorage` key.
    pub const fn cache_key_patterns(self) -> &'static [&'static str] {
        match self {
            Self::Electricity => &["consumptions", "ELECTRICITY", "P1D"],
            Self::Gas => &["consumptions", "GAS", "P1D"],
        }
    }
}
