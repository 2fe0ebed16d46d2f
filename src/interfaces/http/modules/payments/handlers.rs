//! Gateway return and server-to-server confirmation handlers

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use tracing::info;
use url::Url;

use super::dto::{user_facing_message, wants_json, FORMAT_PARAM};
use crate::application::PaymentService;
use crate::domain::{DomainError, Payment};
use crate::interfaces::http::common::{ApiError, ApiResponse, ApiResult};
use crate::interfaces::http::modules::bookings::PaymentDto;

/// Payment callback handler state
#[derive(Clone)]
pub struct PaymentHandlerState {
    pub payments: Arc<PaymentService>,
    /// Where the payer's browser is sent after the gateway returns
    pub frontend_callback_url: Option<String>,
}

/// Browser return from the gateway. Redirects to the frontend with the
/// gateway params plus `message`, `bookingId` and `paymentStatus`, or
/// answers with JSON when asked to or when no frontend is configured.
pub async fn vnpay_callback(
    State(state): State<PaymentHandlerState>,
    headers: HeaderMap,
    Query(mut params): Query<BTreeMap<String, String>>,
) -> Result<Response, ApiError> {
    let json = wants_json(&params, &headers);
    params.remove(FORMAT_PARAM);

    let payment = state.payments.handle_gateway_callback(&params).await?;
    let message = user_facing_message(&payment);

    let frontend = state
        .frontend_callback_url
        .as_deref()
        .map(str::trim)
        .filter(|u| !u.is_empty());
    match frontend {
        Some(base) if !json => {
            let location = frontend_redirect(base, &params, &payment, message)?;
            info!(booking_id = payment.booking_id, "Redirecting payer to frontend");
            Ok((StatusCode::FOUND, [(header::LOCATION, location)]).into_response())
        }
        _ => Ok(Json(ApiResponse::with_message(PaymentDto::from(payment), message)).into_response()),
    }
}

/// Server-to-server confirmation with the gateway params as a JSON map.
pub async fn vnpay_confirm(
    State(state): State<PaymentHandlerState>,
    Json(params): Json<BTreeMap<String, String>>,
) -> ApiResult<PaymentDto> {
    let payment = state.payments.handle_gateway_callback(&params).await?;
    let message = user_facing_message(&payment);
    Ok(Json(ApiResponse::with_message(PaymentDto::from(payment), message)))
}

fn frontend_redirect(
    base: &str,
    params: &BTreeMap<String, String>,
    payment: &Payment,
    message: &str,
) -> Result<String, DomainError> {
    let mut url = Url::parse(base).map_err(|e| {
        DomainError::Configuration(format!("Invalid frontend callback URL '{}': {}", base, e))
    })?;
    {
        let mut query = url.query_pairs_mut();
        for (key, value) in params {
            query.append_pair(key, value);
        }
        query.append_pair("message", message);
        query.append_pair("bookingId", &payment.booking_id.to_string());
        query.append_pair("paymentStatus", payment.status.as_str());
    }
    Ok(url.into())
}
