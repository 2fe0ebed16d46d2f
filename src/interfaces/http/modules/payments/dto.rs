//! Gateway callback DTOs

use std::collections::BTreeMap;

use axum::http::{header, HeaderMap};

use crate::domain::{Payment, PaymentStatus};

/// Query key that selects a JSON response instead of the redirect.
/// It is not part of the signed gateway payload.
pub const FORMAT_PARAM: &str = "format";

pub const PAID_MESSAGE: &str = "Thanh toán VNPay thành công.";
pub const UNSETTLED_MESSAGE: &str =
    "Giao dịch VNPay chưa hoàn tất. Vui lòng kiểm tra lại hoặc liên hệ hỗ trợ.";

/// Message shown to the payer after the gateway returns.
pub fn user_facing_message(payment: &Payment) -> &'static str {
    if payment.status == PaymentStatus::Paid {
        PAID_MESSAGE
    } else {
        UNSETTLED_MESSAGE
    }
}

/// JSON when asked for with `format=json` or an `Accept` header naming JSON.
pub fn wants_json(params: &BTreeMap<String, String>, headers: &HeaderMap) -> bool {
    if params
        .get(FORMAT_PARAM)
        .is_some_and(|f| f.eq_ignore_ascii_case("json"))
    {
        return true;
    }
    headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|accept| accept.contains("application/json"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use rust_decimal::Decimal;

    use crate::domain::PaymentMethod;

    #[test]
    fn json_is_selected_by_query_or_accept() {
        let mut params = BTreeMap::new();
        assert!(!wants_json(&params, &HeaderMap::new()));

        params.insert("format".to_string(), "JSON".to_string());
        assert!(wants_json(&params, &HeaderMap::new()));

        let mut headers = HeaderMap::new();
        headers.insert(header::ACCEPT, HeaderValue::from_static("text/html, application/json"));
        assert!(wants_json(&BTreeMap::new(), &headers));
    }

    #[test]
    fn message_depends_on_settlement() {
        let mut payment = Payment::new(1, Decimal::from(100_000), PaymentMethod::Gateway, "TX1");
        assert_eq!(user_facing_message(&payment), UNSETTLED_MESSAGE);
        payment.status = PaymentStatus::Paid;
        assert_eq!(user_facing_message(&payment), PAID_MESSAGE);
    }
}
