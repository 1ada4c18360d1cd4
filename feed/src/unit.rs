use serde::{Deserialize, Serialize};

use std::fmt;

/// Integer cents. The feed carries every price and dollar figure as a whole
/// number of cents; conversion to floating-point dollars happens only at the
/// chart boundary, so equality and ordering stay exact on the wire path.
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize,
)]
#[serde(transparent)]
pub struct Cents(pub i64);

impl Cents {
    pub const ZERO: Cents = Cents(0);

    pub fn from_dollars(dollars: f64) -> Self {
        Cents((dollars * 100.0).round() as i64)
    }

    pub fn to_dollars(self) -> f64 {
        self.0 as f64 / 100.0
    }

    pub fn is_positive(self) -> bool {
        self.0 > 0
    }
}

impl fmt::Display for Cents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 < 0 {
            f.write_str("-")?;
        }
        let abs = self.0.unsigned_abs();
        write!(f, "${}.{:02}", abs / 100, abs % 100)
    }
}

/// Compact magnitude display for legend text, e.g. 1_234_567 -> "1.23M".
pub fn format_compact(dollars: f64) -> String {
    let abs = dollars.abs();
    if abs >= 1_000_000.0 {
        format!("{:.2}M", dollars / 1_000_000.0)
    } else if abs >= 1_000.0 {
        format!("{:.1}K", dollars / 1_000.0)
    } else {
        format!("{dollars:.0}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cents_round_trip() {
        assert_eq!(Cents::from_dollars(123.45), Cents(12_345));
        assert_eq!(Cents(12_345).to_dollars(), 123.45);
        assert_eq!(Cents(-50).to_dollars(), -0.5);
    }

    #[test]
    fn cents_display() {
        assert_eq!(Cents(12_345).to_string(), "$123.45");
        assert_eq!(Cents(5).to_string(), "$0.05");
        assert_eq!(Cents(-12_305).to_string(), "-$123.05");
    }

    #[test]
    fn compact_magnitudes() {
        assert_eq!(format_compact(1_234_567.0), "1.23M");
        assert_eq!(format_compact(123_456.0), "123.5K");
        assert_eq!(format_compact(999.0), "999");
        assert_eq!(format_compact(-2_500_000.0), "-2.50M");
    }
}
