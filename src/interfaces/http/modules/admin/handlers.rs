//! Admin booking handlers
//!
//! The route group sits behind the auth middleware; the services enforce
//! the administrator role themselves.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};

use super::dto::{BookingDetailDto, ListBookingsParams, UpdatePaymentStatusRequest};
use crate::application::{BookingService, PaymentService};
use crate::domain::Principal;
use crate::interfaces::http::common::{ApiResponse, ApiResult, PaginatedResponse, ValidatedJson};
use crate::interfaces::http::modules::bookings::{BookingWithPaymentDto, PaymentDto};
use crate::shared::validate_pagination;

/// Admin handler state
#[derive(Clone)]
pub struct AdminHandlerState {
    pub bookings: Arc<BookingService>,
    pub payments: Arc<PaymentService>,
}

pub async fn list_bookings(
    State(state): State<AdminHandlerState>,
    Extension(principal): Extension<Principal>,
    Query(params): Query<ListBookingsParams>,
) -> ApiResult<PaginatedResponse<BookingWithPaymentDto>> {
    let pagination = validate_pagination(params.page, params.limit);
    let page = state
        .bookings
        .admin_list(&principal, params.booking_code.as_deref(), pagination)
        .await?;
    Ok(Json(ApiResponse::success(PaginatedResponse::from(page))))
}

pub async fn get_booking(
    State(state): State<AdminHandlerState>,
    Extension(principal): Extension<Principal>,
    Path(booking_id): Path<i64>,
) -> ApiResult<BookingDetailDto> {
    let detail = state.bookings.admin_detail(&principal, booking_id).await?;
    Ok(Json(ApiResponse::success(BookingDetailDto::from(detail))))
}

pub async fn update_payment_status(
    State(state): State<AdminHandlerState>,
    Extension(principal): Extension<Principal>,
    Path(booking_id): Path<i64>,
    ValidatedJson(req): ValidatedJson<UpdatePaymentStatusRequest>,
) -> ApiResult<PaymentDto> {
    let payment = state
        .payments
        .update_payment_status(&principal, booking_id, req.status, req.payment_method)
        .await?;
    Ok(Json(ApiResponse::success(PaymentDto::from(payment))))
}
