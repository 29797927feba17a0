/// Utility being measured.
#[derive(Debug, Hash, clap::ValueEnum, enumset::EnumSetType, derive_more::Display)]
pub enum Fluid {
    #[display("electricity")]
    Electricity,

    #[display("gas")]
    Gas,
}

impl Fluid {
    /// Human-readable name used in the sensor friendly names.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Electricity => "Electricity",
            Self::Gas => "Gas",
        }
    }

    #[must_use]
    pub const fn icon(self) -> &'static str {
        match self {
            Self::Electricity => "mdi:power",
            Self::Gas => "mdi:fire",
        }
    }
}
