/// Define a fixed-precision quantity.
///
/// Both `Display` and `fixed()` always render exactly `$precision` decimals.
/// Half-way values are rounded away from zero, as `Number.prototype.toFixed` does.
macro_rules! quantity {
    ($name:ident, $unit:literal, $precision:literal) => {
        #[repr(transparent)]
        #[derive(
            ::derive_more::Add,
            ::derive_more::FromStr,
            ::derive_more::Sum,
            ::serde::Deserialize,
            ::serde::Serialize,
            ::std::clone::Clone,
            ::std::marker::Copy,
            ::std::cmp::PartialEq,
        )]
        pub struct $name(pub f64);

        impl $name {
            pub const PRECISION: usize = $precision;

            /// Render the value with the fixed precision and without the unit.
            #[must_use]
            pub fn fixed(self) -> String {
                format!("{:.*}", Self::PRECISION, self.off_tie())
            }

            /// Round the value to the fixed precision, for the chart series.
            ///
            /// Always equal to the parsed [`fixed`](Self::fixed).
            #[must_use]
            pub fn rounded(self) -> f64 {
                self.fixed().parse().unwrap_or(self.0)
            }

            /// Formatting rounds exact ties to even, so nudge them one ULP away from zero.
            ///
            /// Exact decimal ties are precisely the odd multiples of `2^-(precision + 1)`,
            /// and scaling by a power of two is exact.
            fn off_tie(self) -> f64 {
                let scaled = self.0 * 2_f64.powi($precision + 1);
                if scaled.fract() == 0.0 && scaled % 2.0 != 0.0 {
                    if self.0 > 0.0 { self.0.next_up() } else { self.0.next_down() }
                } else {
                    self.0
                }
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, formatter: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                write!(formatter, "{} {}", self.fixed(), $unit)
            }
        }

        impl ::std::fmt::Debug for $name {
            fn fmt(&self, formatter: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                write!(formatter, "{}{}", self.fixed(), $unit)
            }
        }
    };
}
