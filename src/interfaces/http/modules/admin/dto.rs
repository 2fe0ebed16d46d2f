//! Admin DTOs

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::application::BookingDetail;
use crate::domain::{Field, PaymentMethod, PaymentStatus};
use crate::interfaces::http::modules::bookings::{BookingDto, PaymentDto};

#[derive(Debug, Deserialize)]
pub struct ListBookingsParams {
    /// Case-insensitive substring of the booking code
    pub booking_code: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct FieldDto {
    pub id: i64,
    pub name: String,
    pub price_per_hour: Decimal,
    pub description: Option<String>,
}

impl From<Field> for FieldDto {
    fn from(f: Field) -> Self {
        Self {
            id: f.id,
            name: f.name,
            price_per_hour: f.price_per_hour,
            description: f.description,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BookingDetailDto {
    #[serde(flatten)]
    pub booking: BookingDto,
    pub field: Option<FieldDto>,
    pub payment: Option<PaymentDto>,
}

impl From<BookingDetail> for BookingDetailDto {
    fn from(d: BookingDetail) -> Self {
        Self {
            booking: d.booking.into(),
            field: d.field.map(FieldDto::from),
            payment: d.payment.map(PaymentDto::from),
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdatePaymentStatusRequest {
    pub status: PaymentStatus,
    pub payment_method: Option<PaymentMethod>,
}
