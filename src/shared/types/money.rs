//! Fixed-point money helpers
//!
//! Amounts are `Decimal` with two fractional digits in the domain and
//! integer minor units (`i64`) in storage.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

use super::errors::DomainError;

/// Round to 2 decimal places, half-up (midpoint away from zero).
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Convert an amount to integer minor units (× 100, half-up).
pub fn to_minor_units(value: Decimal) -> Result<i64, DomainError> {
    (value * Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .ok_or_else(|| DomainError::Validation(format!("Amount {} is out of range", value)))
}

/// Convert integer minor units back to an amount with 2 fractional digits.
pub fn from_minor_units(minor: i64) -> Decimal {
    Decimal::new(minor, 2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn round_money_is_half_up() {
        assert_eq!(round_money(d("1.005")), d("1.01"));
        assert_eq!(round_money(d("1.004")), d("1.00"));
        assert_eq!(round_money(d("2.675")), d("2.68"));
    }

    #[test]
    fn minor_units_conversion() {
        assert_eq!(to_minor_units(d("150.00")).unwrap(), 15000);
        assert_eq!(to_minor_units(d("0.125")).unwrap(), 13);
        assert_eq!(from_minor_units(15000), d("150.00"));
        assert_eq!(from_minor_units(15000).to_string(), "150.00");
    }
}
