//! Field domain entity

use rust_decimal::Decimal;

/// A bookable field with an hourly price
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub id: i64,
    pub name: String,
    /// Hourly price, 2 fractional digits
    pub price_per_hour: Decimal,
    pub description: Option<String>,
}

impl Field {
    pub fn new(id: i64, name: impl Into<String>, price_per_hour: Decimal) -> Self {
        Self {
            id,
            name: name.into(),
            price_per_hour,
            description: None,
        }
    }
}
