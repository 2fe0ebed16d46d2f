//! API router

use std::sync::Arc;

use axum::{
    extract::FromRef,
    middleware,
    routing::{get, patch, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::application::{BookingService, PaymentService};
use crate::interfaces::http::middleware::{auth_middleware, AuthState};
use crate::interfaces::http::modules::admin::{self, AdminHandlerState};
use crate::interfaces::http::modules::bookings::{self, BookingHandlerState};
use crate::interfaces::http::modules::health::{self, HealthState};
use crate::interfaces::http::modules::payments::{self, PaymentHandlerState};

/// Unified state for every route. Axum extracts the specific handler
/// state via `FromRef`.
#[derive(Clone)]
pub struct ApiState {
    pub bookings: Arc<BookingService>,
    pub payments: Arc<PaymentService>,
    pub auth: AuthState,
    pub health: HealthState,
    pub frontend_callback_url: Option<String>,
}

impl FromRef<ApiState> for BookingHandlerState {
    fn from_ref(s: &ApiState) -> Self {
        BookingHandlerState {
            bookings: Arc::clone(&s.bookings),
            payments: Arc::clone(&s.payments),
        }
    }
}

impl FromRef<ApiState> for AdminHandlerState {
    fn from_ref(s: &ApiState) -> Self {
        AdminHandlerState {
            bookings: Arc::clone(&s.bookings),
            payments: Arc::clone(&s.payments),
        }
    }
}

impl FromRef<ApiState> for PaymentHandlerState {
    fn from_ref(s: &ApiState) -> Self {
        PaymentHandlerState {
            payments: Arc::clone(&s.payments),
            frontend_callback_url: s.frontend_callback_url.clone(),
        }
    }
}

impl FromRef<ApiState> for AuthState {
    fn from_ref(s: &ApiState) -> Self {
        s.auth.clone()
    }
}

impl FromRef<ApiState> for HealthState {
    fn from_ref(s: &ApiState) -> Self {
        s.health.clone()
    }
}

/// Create the API router
pub fn create_api_router(state: ApiState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let protected = Router::new()
        .route("/api/v1/bookings", post(bookings::create_booking))
        .route("/api/v1/bookings/me", get(bookings::my_bookings))
        .route("/api/v1/bookings/{id}/cancel", post(bookings::cancel_booking))
        .route("/api/v1/bookings/{id}/payments", post(bookings::pay_for_booking))
        .route("/api/v1/admin/bookings", get(admin::list_bookings))
        .route("/api/v1/admin/bookings/{id}", get(admin::get_booking))
        .route(
            "/api/v1/admin/bookings/{id}/payment-status",
            patch(admin::update_payment_status),
        )
        .layer(middleware::from_fn_with_state(
            state.auth.clone(),
            auth_middleware,
        ));

    // The gateway calls these without a token; the signature is the credential.
    let public = Router::new()
        .route("/health", get(health::health_check))
        .route("/api/v1/payments/vnpay/callback", get(payments::vnpay_callback))
        .route("/api/v1/payments/vnpay/confirm", post(payments::vnpay_confirm));

    Router::new()
        .merge(protected)
        .merge(public)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::time::Instant;

    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use chrono::Duration;
    use rust_decimal::Decimal;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::application::KeyedLocks;
    use crate::domain::Field;
    use crate::infrastructure::crypto::jwt::{create_token, JwtConfig};
    use crate::infrastructure::gateway::{CanonicalSigner, VnPayConfig, VnPayGateway, SECURE_HASH};
    use crate::infrastructure::storage::InMemoryRepositoryProvider;

    const SECRET: &str = "ROUTERSECRET";

    fn app_with_frontend(frontend: Option<&str>) -> (Router, Arc<JwtConfig>) {
        let repos = Arc::new(InMemoryRepositoryProvider::new());
        repos.insert_field(Field::new(1, "Pitch A", Decimal::new(10000, 2)));
        let locks = Arc::new(KeyedLocks::new());
        let gateway = VnPayGateway::new(VnPayConfig {
            tmn_code: "DEMO0001".into(),
            hash_secret: SECRET.into(),
            return_url: "https://fields.test/return".into(),
            ..VnPayConfig::default()
        });
        let jwt = Arc::new(JwtConfig::default());

        let state = ApiState {
            bookings: Arc::new(BookingService::new(repos.clone(), locks.clone(), 10)),
            payments: Arc::new(PaymentService::new(repos, Arc::new(gateway), locks, 10)),
            auth: AuthState {
                jwt_config: jwt.clone(),
            },
            health: HealthState {
                db: None,
                started_at: Arc::new(Instant::now()),
            },
            frontend_callback_url: frontend.map(str::to_string),
        };
        (create_api_router(state), jwt)
    }

    fn app() -> (Router, Arc<JwtConfig>) {
        app_with_frontend(None)
    }

    fn bearer(jwt: &JwtConfig, user_id: i64, role: &str) -> String {
        format!(
            "Bearer {}",
            create_token(user_id, role, Duration::hours(1), jwt).unwrap()
        )
    }

    fn json_request(method: &str, uri: &str, auth: Option<&str>, body: Value) -> Request<Body> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(auth) = auth {
            builder = builder.header(header::AUTHORIZATION, auth);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    fn get_request(uri: &str, auth: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().method("GET").uri(uri);
        if let Some(auth) = auth {
            builder = builder.header(header::AUTHORIZATION, auth);
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
        let resp = app.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    fn booking_body() -> Value {
        json!({
            "field_id": 1,
            "start_time": "2031-06-01T10:00:00Z",
            "end_time": "2031-06-01T11:30:00Z"
        })
    }

    fn signed_query(pairs: &[(&str, &str)]) -> String {
        let mut params: BTreeMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let sig = CanonicalSigner::new(SECRET)
            .sign(&CanonicalSigner::signing_string(&params))
            .unwrap();
        params.insert(SECURE_HASH.to_string(), sig);
        CanonicalSigner::canonical_query(&params)
    }

    async fn book_and_start_gateway_payment(app: &Router, auth: &str) -> (i64, String) {
        let (status, body) = send(app, json_request("POST", "/api/v1/bookings", Some(auth), booking_body())).await;
        assert_eq!(status, StatusCode::CREATED);
        let booking_id = body["data"]["id"].as_i64().unwrap();

        let (status, body) = send(
            app,
            json_request(
                "POST",
                &format!("/api/v1/bookings/{}/payments", booking_id),
                Some(auth),
                json!({"payment_method": "VNPAY"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["status"], "PENDING");
        assert!(body["data"]["payment_url"]
            .as_str()
            .unwrap()
            .contains("vnp_SecureHash="));
        (booking_id, body["data"]["transaction_code"].as_str().unwrap().to_string())
    }

    #[tokio::test]
    async fn health_is_public() {
        let (app, _) = app();
        let (status, body) = send(&app, get_request("/health", None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["database"]["status"], "in_memory");
    }

    #[tokio::test]
    async fn booking_routes_require_a_token() {
        let (app, _) = app();
        let (status, body) = send(&app, get_request("/api/v1/bookings/me", None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["success"], false);

        let (status, _) = send(&app, get_request("/api/v1/bookings/me", Some("Bearer nonsense"))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn create_list_and_conflict() {
        let (app, jwt) = app();
        let auth = bearer(&jwt, 7, "user");

        let (status, body) = send(&app, json_request("POST", "/api/v1/bookings", Some(&auth), booking_body())).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["data"]["status"], "CONFIRMED");
        assert_eq!(body["data"]["total_amount"], "150.00");
        assert!(body["data"]["booking_code"].as_str().unwrap().starts_with("BK"));

        let other = bearer(&jwt, 8, "user");
        let (status, body) = send(&app, json_request("POST", "/api/v1/bookings", Some(&other), booking_body())).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "Field is already booked for the selected time range");

        let (status, body) = send(&app, get_request("/api/v1/bookings/me", Some(&auth))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"].as_array().unwrap().len(), 1);
        assert_eq!(body["data"][0]["payment"], Value::Null);
    }

    #[tokio::test]
    async fn invalid_input_is_rejected() {
        let (app, jwt) = app();
        let auth = bearer(&jwt, 7, "user");

        let body = json!({"field_id": 0, "start_time": "2031-06-01T10:00:00Z", "end_time": "2031-06-01T11:00:00Z"});
        let (status, _) = send(&app, json_request("POST", "/api/v1/bookings", Some(&auth), body)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let body = json!({"field_id": 1, "start_time": "2031-06-01T11:00:00Z", "end_time": "2031-06-01T10:00:00Z"});
        let (status, body) = send(&app, json_request("POST", "/api/v1/bookings", Some(&auth), body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);

        let body = json!({"field_id": 99, "start_time": "2031-06-01T10:00:00Z", "end_time": "2031-06-01T11:00:00Z"});
        let (status, _) = send(&app, json_request("POST", "/api/v1/bookings", Some(&auth), body)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn cash_payment_and_cancel_with_refund() {
        let (app, jwt) = app();
        let auth = bearer(&jwt, 7, "user");
        let (_, body) = send(&app, json_request("POST", "/api/v1/bookings", Some(&auth), booking_body())).await;
        let id = body["data"]["id"].as_i64().unwrap();

        let pay = Request::builder()
            .method("POST")
            .uri(format!("/api/v1/bookings/{}/payments", id))
            .header(header::AUTHORIZATION, &auth)
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(&app, pay).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["status"], "PAID");
        assert_eq!(body["data"]["method"], "COD");
        assert!(body["data"].get("payment_url").is_none());

        let (status, body) = send(
            &app,
            json_request("POST", &format!("/api/v1/bookings/{}/cancel", id), Some(&auth), json!({"reason": " rain "})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["status"], "CANCELLED");
        assert_eq!(body["data"]["cancellation_reason"], "rain");

        let (_, body) = send(&app, get_request("/api/v1/bookings/me", Some(&auth))).await;
        assert_eq!(body["data"][0]["payment"]["status"], "REFUND_PENDING");
    }

    #[tokio::test]
    async fn gateway_callback_settles_payment_as_json() {
        let (app, jwt) = app();
        let auth = bearer(&jwt, 7, "user");
        let (booking_id, code) = book_and_start_gateway_payment(&app, &auth).await;

        let query = signed_query(&[
            ("vnp_TxnRef", code.as_str()),
            ("vnp_Amount", "15000"),
            ("vnp_ResponseCode", "00"),
            ("vnp_TransactionStatus", "00"),
            ("vnp_PayDate", "20310601093000"),
        ]);
        let uri = format!("/api/v1/payments/vnpay/callback?{}&format=json", query);
        let (status, body) = send(&app, get_request(&uri, None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["status"], "PAID");
        assert_eq!(body["data"]["booking_id"], booking_id);
        assert_eq!(body["message"], "Thanh toán VNPay thành công.");
    }

    #[tokio::test]
    async fn gateway_callback_redirects_to_frontend() {
        let (app, jwt) = app_with_frontend(Some("https://shop.example/payment/result"));
        let auth = bearer(&jwt, 7, "user");
        let (booking_id, code) = book_and_start_gateway_payment(&app, &auth).await;

        let query = signed_query(&[
            ("vnp_TxnRef", code.as_str()),
            ("vnp_Amount", "15000"),
            ("vnp_ResponseCode", "24"),
            ("vnp_TransactionStatus", "02"),
        ]);
        let resp = app
            .clone()
            .oneshot(get_request(&format!("/api/v1/payments/vnpay/callback?{}", query), None))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::FOUND);
        let location = resp.headers()[header::LOCATION].to_str().unwrap();
        let url = url::Url::parse(location).unwrap();
        let pairs: BTreeMap<String, String> = url.query_pairs().into_owned().collect();
        assert_eq!(pairs["bookingId"], booking_id.to_string());
        assert_eq!(pairs["paymentStatus"], "PENDING");
        assert_eq!(pairs["vnp_ResponseCode"], "24");
        assert!(pairs["message"].starts_with("Giao dịch VNPay chưa hoàn tất"));
    }

    #[tokio::test]
    async fn tampered_callback_is_rejected() {
        let (app, jwt) = app();
        let auth = bearer(&jwt, 7, "user");
        let (_, code) = book_and_start_gateway_payment(&app, &auth).await;

        let query = signed_query(&[
            ("vnp_TxnRef", code.as_str()),
            ("vnp_Amount", "15000"),
            ("vnp_ResponseCode", "00"),
        ]);
        let tampered = query.replace("vnp_Amount=15000", "vnp_Amount=100");
        let (status, body) = send(
            &app,
            get_request(&format!("/api/v1/payments/vnpay/callback?{}", tampered), None),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid VNPay signature");
    }

    #[tokio::test]
    async fn confirm_accepts_json_params() {
        let (app, jwt) = app();
        let auth = bearer(&jwt, 7, "user");
        let (_, code) = book_and_start_gateway_payment(&app, &auth).await;

        let mut params: BTreeMap<String, String> = [
            ("vnp_TxnRef", code.as_str()),
            ("vnp_Amount", "15000"),
            ("vnp_ResponseCode", "00"),
            ("vnp_TransactionStatus", "00"),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        let sig = CanonicalSigner::new(SECRET)
            .sign(&CanonicalSigner::signing_string(&params))
            .unwrap();
        params.insert(SECURE_HASH.to_string(), sig);

        let (status, body) = send(
            &app,
            json_request("POST", "/api/v1/payments/vnpay/confirm", None, json!(params)),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["status"], "PAID");
    }

    #[tokio::test]
    async fn admin_routes_need_admin_role() {
        let (app, jwt) = app();
        let user = bearer(&jwt, 7, "user");
        let admin = bearer(&jwt, 1, "admin");
        let (_, body) = send(&app, json_request("POST", "/api/v1/bookings", Some(&user), booking_body())).await;
        let id = body["data"]["id"].as_i64().unwrap();
        let code = body["data"]["booking_code"].as_str().unwrap().to_lowercase();

        let (status, _) = send(&app, get_request("/api/v1/admin/bookings", Some(&user))).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        let (status, _) = send(&app, get_request(&format!("/api/v1/admin/bookings/{}", id), Some(&user))).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, body) = send(
            &app,
            get_request(&format!("/api/v1/admin/bookings?booking_code={}&limit=5", code), Some(&admin)),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["total"], 1);
        assert_eq!(body["data"]["limit"], 5);
        assert_eq!(body["data"]["items"][0]["id"], id);

        let (status, body) = send(&app, get_request(&format!("/api/v1/admin/bookings/{}", id), Some(&admin))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["field"]["name"], "Pitch A");

        let (status, body) = send(
            &app,
            json_request(
                "PATCH",
                &format!("/api/v1/admin/bookings/{}/payment-status", id),
                Some(&admin),
                json!({"status": "PAID", "payment_method": "COD"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["status"], "PAID");

        let (status, _) = send(
            &app,
            json_request(
                "PATCH",
                &format!("/api/v1/admin/bookings/{}/payment-status", id),
                Some(&user),
                json!({"status": "REFUNDED"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }
}
