//! Fixed-point money.
//!
//! Amounts are carried as integer minor units (cents) everywhere inside the
//! service. Decimals only appear at the HTTP boundary, where request values
//! are parsed with [`Money::from_decimal`] and responses are rendered as
//! two-digit decimal strings.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Serialize, Serializer};
use std::fmt;

use super::ValidationError;

/// Basis points in one whole (100%).
pub const BPS_DENOMINATOR: i64 = 10_000;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    pub const fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    pub const fn cents(self) -> i64 {
        self.0
    }

    pub fn is_positive(self) -> bool {
        self.0 > 0
    }

    /// Parse a decimal currency amount. More than two fractional digits is
    /// rejected rather than rounded.
    pub fn from_decimal(value: Decimal) -> Result<Self, ValidationError> {
        let normalized = value.normalize();
        if normalized.scale() > 2 {
            return Err(ValidationError::new(format!(
                "amount {value} has more than two decimal places"
            )));
        }

        normalized
            .checked_mul(Decimal::ONE_HUNDRED)
            .and_then(|cents| cents.to_i64())
            .map(Self)
            .ok_or_else(|| ValidationError::new(format!("amount {value} is out of range")))
    }

    pub fn to_decimal(self) -> Decimal {
        Decimal::new(self.0, 2)
    }

    /// `self * bps / 10_000`, rounded down.
    pub fn share_floor(self, bps: u32) -> Money {
        let share = i128::from(self.0) * i128::from(bps) / i128::from(BPS_DENOMINATOR);
        Money(share as i64)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_decimal())
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn parses_whole_and_fractional_amounts() {
        assert_eq!(Money::from_decimal(dec("90")).unwrap().cents(), 9000);
        assert_eq!(Money::from_decimal(dec("12.5")).unwrap().cents(), 1250);
        assert_eq!(Money::from_decimal(dec("0.01")).unwrap().cents(), 1);
        assert_eq!(Money::from_decimal(dec("10.500")).unwrap().cents(), 1050);
    }

    #[test]
    fn rejects_sub_cent_precision() {
        assert!(Money::from_decimal(dec("1.005")).is_err());
    }

    #[test]
    fn rejects_amounts_beyond_the_cent_range() {
        assert!(Money::from_decimal(dec("79228162514264337593543950335")).is_err());
        assert!(Money::from_decimal(dec("792281625142643375935439503.35")).is_err());
        assert!(Money::from_decimal(dec("92233720368547758.08")).is_err());
        assert_eq!(
            Money::from_decimal(dec("92233720368547758.07")).unwrap().cents(),
            i64::MAX
        );
    }

    #[test]
    fn renders_two_decimal_places() {
        assert_eq!(Money::from_cents(9000).to_string(), "90.00");
        assert_eq!(Money::from_cents(7).to_string(), "0.07");
        assert_eq!(
            serde_json::to_value(Money::from_cents(123456)).unwrap(),
            serde_json::json!("1234.56")
        );
    }

    #[test]
    fn share_rounds_down() {
        assert_eq!(Money::from_cents(9000).share_floor(1000).cents(), 900);
        assert_eq!(Money::from_cents(999).share_floor(1000).cents(), 99);
        assert_eq!(Money::from_cents(1).share_floor(1000).cents(), 0);
        assert_eq!(Money::from_cents(12345).share_floor(BPS_DENOMINATOR as u32).cents(), 12345);
    }
}
