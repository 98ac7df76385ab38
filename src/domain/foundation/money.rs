//! Fixed-point money value object.
//!
//! Plan prices and charged amounts are stored as integer cents to avoid
//! floating point drift in comparisons and sums.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::ValidationError;

/// A non-negative monetary amount in cents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    /// Zero amount.
    pub const ZERO: Money = Money(0);

    /// Creates a Money value from cents, rejecting negative amounts.
    pub fn from_cents(cents: i64) -> Result<Self, ValidationError> {
        if cents < 0 {
            return Err(ValidationError::invalid_format(
                "amount",
                format!("amount cannot be negative, got {}", cents),
            ));
        }
        Ok(Self(cents))
    }

    /// Creates a Money value from whole currency units.
    pub fn from_major(units: i64) -> Result<Self, ValidationError> {
        Self::from_cents(units.saturating_mul(100))
    }

    /// Returns the amount in cents.
    pub fn cents(&self) -> i64 {
        self.0
    }

    /// Returns true if the amount is zero.
    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

impl FromStr for Money {
    type Err = ValidationError;

    /// Parses a decimal string such as "50.00" or "50".
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ValidationError::invalid_format("amount", format!("'{}'", s));

        let (whole, frac) = match s.split_once('.') {
            Some((w, f)) => (w, f),
            None => (s, ""),
        };
        if frac.len() > 2 || (!frac.is_empty() && !frac.chars().all(|c| c.is_ascii_digit())) {
            return Err(invalid());
        }

        let units: i64 = whole.parse().map_err(|_| invalid())?;
        let cents: i64 = if frac.is_empty() {
            0
        } else {
            let padded = format!("{:0<2}", frac);
            padded.parse().map_err(|_| invalid())?
        };

        Self::from_cents(units.saturating_mul(100) + cents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn from_cents_accepts_zero() {
        let m = Money::from_cents(0).unwrap();
        assert!(m.is_zero());
    }

    #[test]
    fn from_cents_rejects_negative() {
        assert!(Money::from_cents(-1).is_err());
    }

    #[test]
    fn from_major_converts_to_cents() {
        let m = Money::from_major(50).unwrap();
        assert_eq!(m.cents(), 5000);
    }

    #[test]
    fn displays_with_two_decimal_places() {
        assert_eq!(Money::from_cents(5000).unwrap().to_string(), "50.00");
        assert_eq!(Money::from_cents(5).unwrap().to_string(), "0.05");
        assert_eq!(Money::from_cents(1999).unwrap().to_string(), "19.99");
    }

    #[test]
    fn parses_decimal_string() {
        let m: Money = "50.00".parse().unwrap();
        assert_eq!(m.cents(), 5000);
    }

    #[test]
    fn parses_whole_number_string() {
        let m: Money = "50".parse().unwrap();
        assert_eq!(m.cents(), 5000);
    }

    #[test]
    fn parses_single_fraction_digit() {
        let m: Money = "50.5".parse().unwrap();
        assert_eq!(m.cents(), 5050);
    }

    #[test]
    fn rejects_malformed_strings() {
        assert!("abc".parse::<Money>().is_err());
        assert!("50.123".parse::<Money>().is_err());
        assert!("50.x0".parse::<Money>().is_err());
        assert!("-1".parse::<Money>().is_err());
    }

    #[test]
    fn ordering_compares_cents() {
        let a = Money::from_cents(5000).unwrap();
        let b = Money::from_cents(9900).unwrap();
        assert!(a < b);
    }

    proptest! {
        #[test]
        fn display_parse_roundtrips(cents in 0i64..10_000_000) {
            let m = Money::from_cents(cents).unwrap();
            let parsed: Money = m.to_string().parse().unwrap();
            prop_assert_eq!(parsed, m);
        }
    }
}
