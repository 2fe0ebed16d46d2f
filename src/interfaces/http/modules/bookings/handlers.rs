//! Booking handlers

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};

use super::dto::{
    BookingDto, BookingWithPaymentDto, CancelBookingRequest, CreateBookingRequest,
    PayBookingRequest, PaymentDto,
};
use crate::application::{BookingService, PaymentService};
use crate::domain::Principal;
use crate::interfaces::http::common::{ApiError, ApiResponse, ApiResult, ClientIp, ValidatedJson};

/// Booking handler state
#[derive(Clone)]
pub struct BookingHandlerState {
    pub bookings: Arc<BookingService>,
    pub payments: Arc<PaymentService>,
}

pub async fn create_booking(
    State(state): State<BookingHandlerState>,
    Extension(principal): Extension<Principal>,
    ValidatedJson(req): ValidatedJson<CreateBookingRequest>,
) -> Result<(StatusCode, Json<ApiResponse<BookingDto>>), ApiError> {
    let booking = state
        .bookings
        .create_booking(&principal, req.field_id, req.start_time, req.end_time)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(BookingDto::from(booking))),
    ))
}

pub async fn my_bookings(
    State(state): State<BookingHandlerState>,
    Extension(principal): Extension<Principal>,
) -> ApiResult<Vec<BookingWithPaymentDto>> {
    let items = state.bookings.list_own(&principal).await?;
    Ok(Json(ApiResponse::success(
        items.into_iter().map(BookingWithPaymentDto::from).collect(),
    )))
}

pub async fn cancel_booking(
    State(state): State<BookingHandlerState>,
    Extension(principal): Extension<Principal>,
    Path(booking_id): Path<i64>,
    body: Option<ValidatedJson<CancelBookingRequest>>,
) -> ApiResult<BookingDto> {
    let req = body.map(|ValidatedJson(req)| req).unwrap_or_default();
    let booking = state
        .bookings
        .cancel_booking(&principal, booking_id, req.reason.as_deref())
        .await?;
    Ok(Json(ApiResponse::success(BookingDto::from(booking))))
}

pub async fn pay_for_booking(
    State(state): State<BookingHandlerState>,
    Extension(principal): Extension<Principal>,
    Path(booking_id): Path<i64>,
    ClientIp(client_ip): ClientIp,
    body: Option<ValidatedJson<PayBookingRequest>>,
) -> ApiResult<PaymentDto> {
    let req = body.map(|ValidatedJson(req)| req).unwrap_or_default();
    let receipt = state
        .payments
        .pay_for_booking(&principal, booking_id, req.into(), &client_ip)
        .await?;
    Ok(Json(ApiResponse::success(PaymentDto::from(receipt))))
}
