//! Booking DTOs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::application::{BookingWithPayment, PaymentReceipt, PaymentRequest};
use crate::domain::{Booking, Payment, PaymentMethod};

#[derive(Debug, Serialize)]
pub struct BookingDto {
    pub id: i64,
    pub booking_code: String,
    pub field_id: i64,
    pub user_id: i64,
    pub start_time: String,
    pub end_time: String,
    pub price_at_booking: Decimal,
    pub total_amount: Decimal,
    pub status: String,
    pub created_at: String,
    pub cancelled_at: Option<String>,
    pub cancellation_reason: Option<String>,
}

impl From<Booking> for BookingDto {
    fn from(b: Booking) -> Self {
        Self {
            id: b.id,
            booking_code: b.booking_code,
            field_id: b.field_id,
            user_id: b.user_id,
            start_time: b.start_time.to_rfc3339(),
            end_time: b.end_time.to_rfc3339(),
            price_at_booking: b.price_at_booking,
            total_amount: b.total_amount,
            status: b.status.to_string(),
            created_at: b.created_at.to_rfc3339(),
            cancelled_at: b.cancelled_at.map(|d| d.to_rfc3339()),
            cancellation_reason: b.cancellation_reason,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PaymentDto {
    pub id: i64,
    pub booking_id: i64,
    pub amount: Decimal,
    pub status: String,
    pub method: String,
    pub transaction_code: String,
    pub paid_at: Option<String>,
    pub refunded_at: Option<String>,
    pub gateway_response_code: Option<String>,
    /// Only set on the response to a gateway payment attempt
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_url: Option<String>,
}

impl From<Payment> for PaymentDto {
    fn from(p: Payment) -> Self {
        Self {
            id: p.id,
            booking_id: p.booking_id,
            amount: p.amount,
            status: p.status.as_str().to_string(),
            method: p.method.as_str().to_string(),
            transaction_code: p.transaction_code,
            paid_at: p.paid_at.map(|d| d.to_rfc3339()),
            refunded_at: p.refunded_at.map(|d| d.to_rfc3339()),
            gateway_response_code: p.gateway_response_code,
            payment_url: None,
        }
    }
}

impl From<PaymentReceipt> for PaymentDto {
    fn from(receipt: PaymentReceipt) -> Self {
        Self {
            payment_url: receipt.redirect_url,
            ..Self::from(receipt.payment)
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BookingWithPaymentDto {
    #[serde(flatten)]
    pub booking: BookingDto,
    pub payment: Option<PaymentDto>,
}

impl From<BookingWithPayment> for BookingWithPaymentDto {
    fn from(item: BookingWithPayment) -> Self {
        Self {
            booking: item.booking.into(),
            payment: item.payment.map(PaymentDto::from),
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateBookingRequest {
    #[validate(range(min = 1, message = "field_id must be positive"))]
    pub field_id: i64,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct CancelBookingRequest {
    #[validate(length(max = 500, message = "reason must be at most 500 characters"))]
    pub reason: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct PayBookingRequest {
    pub amount: Option<Decimal>,
    pub payment_method: Option<PaymentMethod>,
    #[validate(length(min = 1, max = 64, message = "transaction_code must be 1-64 characters"))]
    pub transaction_code: Option<String>,
}

impl From<PayBookingRequest> for PaymentRequest {
    fn from(req: PayBookingRequest) -> Self {
        Self {
            amount: req.amount,
            method: req.payment_method,
            transaction_code: req.transaction_code,
        }
    }
}
