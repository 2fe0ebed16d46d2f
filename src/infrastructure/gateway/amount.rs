use rust_decimal::Decimal;

use crate::domain::{DomainError, DomainResult};
use crate::shared::types::{from_minor_units, to_minor_units};

/// Gateway amounts are integer strings in minor units (`150.00` -> `"15000"`).
pub struct AmountCodec;

impl AmountCodec {
    pub fn encode(amount: Decimal) -> DomainResult<String> {
        to_minor_units(amount).map(|minor| minor.to_string())
    }

    pub fn decode(raw: &str) -> DomainResult<Decimal> {
        raw.trim()
            .parse::<i64>()
            .map(from_minor_units)
            .map_err(|_| DomainError::Validation("Invalid VNPay amount format".to_string()))
    }
}
