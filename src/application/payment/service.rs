//! Payment service: pay, gateway callback and administrator override
//!
//! Every mutation of a booking's payment runs under that booking's lock,
//! so a callback and an override for the same booking never interleave.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{SubsecRound, Utc};
use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::application::booking::service::require_admin;
use crate::application::codes::{generate_unique_code, TRANSACTION_CODE_PREFIX};
use crate::application::locks::{KeyedLocks, LockKey};
use crate::application::ports::PaymentGateway;
use crate::domain::{
    Booking, BookingStatus, DomainError, DomainResult, Payment, PaymentMethod, PaymentStatus,
    Principal, RepositoryProvider,
};
use crate::shared::types::round_money;
use crate::shared::validations::normalize_text;

const FALLBACK_CLIENT_IP: &str = "127.0.0.1";

/// Caller input for a payment attempt. Unset fields take defaults.
#[derive(Debug, Clone, Default)]
pub struct PaymentRequest {
    pub amount: Option<Decimal>,
    pub method: Option<PaymentMethod>,
    pub transaction_code: Option<String>,
}

/// Stored payment plus the gateway URL for this attempt (never persisted)
#[derive(Debug, Clone)]
pub struct PaymentReceipt {
    pub payment: Payment,
    pub redirect_url: Option<String>,
}

pub struct PaymentService {
    repos: Arc<dyn RepositoryProvider>,
    gateway: Arc<dyn PaymentGateway>,
    locks: Arc<KeyedLocks>,
    code_attempts: u32,
}

impl PaymentService {
    pub fn new(
        repos: Arc<dyn RepositoryProvider>,
        gateway: Arc<dyn PaymentGateway>,
        locks: Arc<KeyedLocks>,
        code_attempts: u32,
    ) -> Self {
        Self {
            repos,
            gateway,
            locks,
            code_attempts: code_attempts.max(1),
        }
    }

    /// Start (or restart) payment of a booking.
    ///
    /// Cash settles at once and confirms the booking. The gateway method
    /// leaves the payment PENDING and returns the redirect URL; the
    /// callback settles it later.
    pub async fn pay_for_booking(
        &self,
        principal: &Principal,
        booking_id: i64,
        request: PaymentRequest,
        client_ip: &str,
    ) -> DomainResult<PaymentReceipt> {
        let _guard = self.locks.lock(LockKey::Booking(booking_id)).await;

        let booking = self.load_booking(booking_id).await?;
        if !principal.can_act_for(booking.user_id) {
            return Err(DomainError::Forbidden(
                "You are not allowed to pay for this booking".to_string(),
            ));
        }
        if booking.is_cancelled() {
            return Err(DomainError::Validation(
                "Cannot pay for a cancelled booking".to_string(),
            ));
        }

        let payments = self.repos.payments();
        let existing = payments.find_by_booking_id(booking_id).await?;
        if existing.as_ref().is_some_and(Payment::is_paid) {
            return Err(DomainError::Conflict(
                "Booking has already been paid".to_string(),
            ));
        }

        let amount = request
            .amount
            .map(round_money)
            .unwrap_or(booking.total_amount);
        if amount != booking.total_amount {
            return Err(DomainError::Validation(
                "Payment amount must match booking total".to_string(),
            ));
        }
        let method = request.method.unwrap_or_default();

        let supplied_code =
            normalize_text(request.transaction_code.as_deref()).map(|c| c.to_uppercase());
        if let Some(code) = &supplied_code {
            if let Some(other) = payments.find_by_transaction_code(code).await? {
                if Some(other.id) != existing.as_ref().map(|p| p.id) {
                    return Err(transaction_code_taken());
                }
            }
        }

        let client_ip = match client_ip.trim() {
            "" => FALLBACK_CLIENT_IP,
            ip => ip,
        };
        let order_info = format!("Thanh toan don dat san {}", booking.booking_code);

        for attempt in 1..=self.code_attempts {
            let code = match &supplied_code {
                Some(code) => code.clone(),
                None => {
                    generate_unique_code(
                        TRANSACTION_CODE_PREFIX,
                        "transaction code",
                        self.code_attempts,
                        |c| async move { payments.exists_by_transaction_code(&c).await },
                    )
                    .await?
                }
            };

            // Build the URL before any write so configuration errors leave no trace.
            let redirect_url = match method {
                PaymentMethod::Gateway => Some(self.gateway.build_redirect_url(
                    amount,
                    &order_info,
                    &code,
                    client_ip,
                )?),
                PaymentMethod::CashOnDelivery => None,
            };

            let mut payment = existing
                .clone()
                .unwrap_or_else(|| Payment::new(booking_id, amount, method, code.clone()));
            payment.begin_attempt(amount, method, code.clone())?;
            match method {
                PaymentMethod::Gateway => payment.attach_gateway(code.clone(), order_info.clone()),
                PaymentMethod::CashOnDelivery => {
                    payment.settle(Utc::now().trunc_subsecs(0))?;
                }
            }

            let confirmation = payment.is_paid().then(|| confirmed(&booking)).flatten();
            match self.repos.save_payment_and_booking(payment, confirmation).await {
                Ok(saved) => {
                    info!(
                        booking_id,
                        payment_id = saved.id,
                        method = method.as_str(),
                        status = saved.status.as_str(),
                        transaction_code = %saved.transaction_code,
                        "Payment attempt recorded"
                    );
                    return Ok(PaymentReceipt {
                        payment: saved,
                        redirect_url,
                    });
                }
                Err(DomainError::Duplicate {
                    field: "transaction_code",
                    ..
                }) if supplied_code.is_none() => {
                    warn!(attempt, booking_id, "Transaction code taken at save, regenerating");
                }
                Err(DomainError::Duplicate {
                    field: "transaction_code",
                    ..
                }) => return Err(transaction_code_taken()),
                Err(e) => return Err(e),
            }
        }

        Err(DomainError::CodeSpaceExhausted(
            "transaction code",
            self.code_attempts,
        ))
    }

    /// Apply an asynchronous gateway result.
    ///
    /// Safe to replay: a repeated success keeps the first paid-at, and
    /// results arriving after a refund started only record the response
    /// code.
    pub async fn handle_gateway_callback(
        &self,
        params: &BTreeMap<String, String>,
    ) -> DomainResult<Payment> {
        if !self.gateway.verify_callback(params) {
            warn!(
                target: "security",
                txn_ref = params.get("vnp_TxnRef").map(String::as_str).unwrap_or(""),
                "Rejected gateway callback with invalid signature"
            );
            return Err(DomainError::Integrity("Invalid VNPay signature".to_string()));
        }

        let callback = self.gateway.parse_callback(params)?;

        let located = self.locate_payment(&callback.txn_ref).await?;
        let _guard = self.locks.lock(LockKey::Booking(located.booking_id)).await;
        // Reload under the lock; the first read only told us which booking to lock.
        let mut payment = self
            .repos
            .payments()
            .find_by_booking_id(located.booking_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Payment", "booking_id", located.booking_id))?;
        // A newer attempt may have replaced the reference while we waited.
        if !payment.matches_reference(&callback.txn_ref) {
            warn!(
                payment_id = payment.id,
                txn_ref = %callback.txn_ref,
                "Gateway callback for a superseded payment attempt"
            );
            return Err(DomainError::not_found(
                "Payment",
                "transaction_ref",
                &callback.txn_ref,
            ));
        }

        if let Some(reported) = callback.amount {
            if reported != payment.amount {
                warn!(
                    target: "security",
                    payment_id = payment.id,
                    expected = %payment.amount,
                    reported = %reported,
                    "Gateway callback amount mismatch"
                );
                return Err(DomainError::Integrity(
                    "Payment amount does not match VNPay callback".to_string(),
                ));
            }
        }

        payment.gateway_response_code = callback.response_code.clone();
        payment.gateway_txn_ref = Some(callback.txn_ref.clone());
        if let Some(order_info) = normalize_text(callback.order_info.as_deref()) {
            payment.gateway_order_info = Some(order_info);
        }

        let booking = self.load_booking(payment.booking_id).await?;
        if callback.success {
            let paid_at = callback
                .paid_at
                .unwrap_or_else(|| Utc::now().trunc_subsecs(0));
            payment.settle(paid_at)?;
            if booking.is_cancelled() {
                // Money for a booking that no longer exists goes back.
                payment.request_refund()?;
            }
        } else {
            payment.decline()?;
        }

        let confirmation = payment.is_paid().then(|| confirmed(&booking)).flatten();
        let saved = self
            .repos
            .save_payment_and_booking(payment, confirmation)
            .await?;

        info!(
            booking_id = saved.booking_id,
            payment_id = saved.id,
            success = callback.success,
            response_code = callback.response_code.as_deref().unwrap_or(""),
            status = saved.status.as_str(),
            "Gateway callback applied"
        );
        Ok(saved)
    }

    /// Administrator override of a booking's payment status.
    pub async fn update_payment_status(
        &self,
        principal: &Principal,
        booking_id: i64,
        target: PaymentStatus,
        method: Option<PaymentMethod>,
    ) -> DomainResult<Payment> {
        require_admin(principal)?;

        let _guard = self.locks.lock(LockKey::Booking(booking_id)).await;
        let booking = self.load_booking(booking_id).await?;
        let payments = self.repos.payments();
        let existing = payments.find_by_booking_id(booking_id).await?;

        let creates_missing = matches!(target, PaymentStatus::Pending | PaymentStatus::Paid);
        if existing.is_none() && !creates_missing {
            return Err(DomainError::Validation(
                "Payment record not found for booking".to_string(),
            ));
        }

        for attempt in 1..=self.code_attempts {
            let mut payment = match &existing {
                Some(p) => p.clone(),
                None => {
                    let code = generate_unique_code(
                        TRANSACTION_CODE_PREFIX,
                        "transaction code",
                        self.code_attempts,
                        |c| async move { payments.exists_by_transaction_code(&c).await },
                    )
                    .await?;
                    Payment::new(
                        booking_id,
                        booking.total_amount,
                        method.unwrap_or_default(),
                        code,
                    )
                }
            };
            // Refund targets keep the method the money arrived by.
            if let Some(method) = method.filter(|_| creates_missing) {
                payment.method = method;
            }
            payment.override_status(target, Utc::now().trunc_subsecs(0))?;

            match payments.save(payment).await {
                Ok(saved) => {
                    info!(
                        booking_id,
                        payment_id = saved.id,
                        status = saved.status.as_str(),
                        admin_id = principal.user_id,
                        "Payment status overridden"
                    );
                    return Ok(saved);
                }
                Err(DomainError::Duplicate {
                    field: "transaction_code",
                    ..
                }) if existing.is_none() => {
                    warn!(attempt, booking_id, "Transaction code taken at save, regenerating");
                }
                Err(e) => return Err(e),
            }
        }

        Err(DomainError::CodeSpaceExhausted(
            "transaction code",
            self.code_attempts,
        ))
    }

    // ── Helpers ────────────────────────────────────────────────

    async fn load_booking(&self, booking_id: i64) -> DomainResult<Booking> {
        self.repos
            .bookings()
            .find_by_id(booking_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Booking", "id", booking_id))
    }

    async fn locate_payment(&self, txn_ref: &str) -> DomainResult<Payment> {
        let payments = self.repos.payments();
        if let Some(p) = payments.find_by_gateway_ref(txn_ref).await? {
            return Ok(p);
        }
        payments
            .find_by_transaction_code(txn_ref)
            .await?
            .ok_or_else(|| DomainError::not_found("Payment", "transaction_ref", txn_ref))
    }

}

/// CONFIRMED copy of a PENDING booking. Other statuses need no write.
fn confirmed(booking: &Booking) -> Option<Booking> {
    (booking.status == BookingStatus::Pending).then(|| {
        let mut booking = booking.clone();
        booking.confirm();
        booking
    })
}

fn transaction_code_taken() -> DomainError {
    DomainError::Conflict("Transaction code already exists".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::booking::BookingService;
    use crate::domain::Field;
    use crate::infrastructure::gateway::{
        CanonicalSigner, VnPayConfig, VnPayGateway, SECURE_HASH,
    };
    use crate::infrastructure::storage::{FailingJointWrites, InMemoryRepositoryProvider};
    use chrono::{DateTime, Duration, TimeZone};
    use std::str::FromStr;

    const SECRET: &str = "CALLBACKSECRET";

    struct Fixture {
        repos: Arc<InMemoryRepositoryProvider>,
        bookings: BookingService,
        payments: PaymentService,
        locks: Arc<KeyedLocks>,
    }

    fn gateway_config() -> VnPayConfig {
        VnPayConfig {
            tmn_code: "DEMO0001".into(),
            hash_secret: SECRET.into(),
            return_url: "https://fields.test/return".into(),
            ..VnPayConfig::default()
        }
    }

    fn fixture_with(config: VnPayConfig) -> Fixture {
        let repos = Arc::new(InMemoryRepositoryProvider::new());
        repos.insert_field(Field::new(1, "Pitch A", Decimal::new(10000, 2)));
        let locks = Arc::new(KeyedLocks::new());
        Fixture {
            bookings: BookingService::new(repos.clone(), locks.clone(), 10),
            payments: PaymentService::new(
                repos.clone(),
                Arc::new(VnPayGateway::new(config)),
                locks.clone(),
                10,
            ),
            repos,
            locks,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(gateway_config())
    }

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2031, 6, 1, 10, 0, 0).unwrap()
    }

    async fn book(f: &Fixture, owner: &Principal) -> Booking {
        f.bookings
            .create_booking(owner, 1, start(), start() + Duration::minutes(90))
            .await
            .unwrap()
    }

    fn gateway_request() -> PaymentRequest {
        PaymentRequest {
            method: Some(PaymentMethod::Gateway),
            ..PaymentRequest::default()
        }
    }

    fn callback(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        let mut params: BTreeMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let sig = CanonicalSigner::new(SECRET)
            .sign(&CanonicalSigner::signing_string(&params))
            .unwrap();
        params.insert(SECURE_HASH.to_string(), sig);
        params
    }

    fn success_callback(txn_ref: &str, amount: &str) -> BTreeMap<String, String> {
        callback(&[
            ("vnp_TxnRef", txn_ref),
            ("vnp_Amount", amount),
            ("vnp_ResponseCode", "00"),
            ("vnp_TransactionStatus", "00"),
            ("vnp_PayDate", "20310601093000"),
        ])
    }

    #[tokio::test]
    async fn cash_payment_settles_immediately() {
        let f = fixture();
        let owner = Principal::user(7);
        let booking = book(&f, &owner).await;

        let receipt = f
            .payments
            .pay_for_booking(&owner, booking.id, PaymentRequest::default(), "")
            .await
            .unwrap();

        assert!(receipt.redirect_url.is_none());
        assert_eq!(receipt.payment.status, PaymentStatus::Paid);
        assert_eq!(receipt.payment.method, PaymentMethod::CashOnDelivery);
        assert_eq!(receipt.payment.amount, Decimal::new(15000, 2));
        assert!(receipt.payment.paid_at.is_some());
        assert!(receipt.payment.transaction_code.starts_with("TX"));

        let err = f
            .payments
            .pay_for_booking(&owner, booking.id, PaymentRequest::default(), "")
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[tokio::test]
    async fn payment_preconditions() {
        let f = fixture();
        let owner = Principal::user(7);
        let booking = book(&f, &owner).await;

        let err = f
            .payments
            .pay_for_booking(&Principal::user(8), booking.id, PaymentRequest::default(), "")
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Forbidden(_)));

        for method in [PaymentMethod::CashOnDelivery, PaymentMethod::Gateway] {
            let request = PaymentRequest {
                amount: Some(Decimal::from_str("149.99").unwrap()),
                method: Some(method),
                transaction_code: None,
            };
            let err = f
                .payments
                .pay_for_booking(&owner, booking.id, request, "")
                .await
                .unwrap_err();
            assert!(matches!(err, DomainError::Validation(_)));
        }

        let err = f
            .payments
            .pay_for_booking(&owner, 999, PaymentRequest::default(), "")
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound { .. }));

        f.bookings.cancel_booking(&owner, booking.id, None).await.unwrap();
        let err = f
            .payments
            .pay_for_booking(&owner, booking.id, PaymentRequest::default(), "")
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[tokio::test]
    async fn supplied_transaction_code_is_uppercased_and_unique() {
        let f = fixture();
        let owner = Principal::user(7);
        let first = book(&f, &owner).await;
        let second = f
            .bookings
            .create_booking(&owner, 1, start() + Duration::hours(3), start() + Duration::hours(4))
            .await
            .unwrap();

        let request = PaymentRequest {
            amount: Some(Decimal::from_str("150").unwrap()),
            method: Some(PaymentMethod::Gateway),
            transaction_code: Some(" tx-custom ".into()),
        };
        let receipt = f
            .payments
            .pay_for_booking(&owner, first.id, request.clone(), "10.1.1.1")
            .await
            .unwrap();
        assert_eq!(receipt.payment.transaction_code, "TX-CUSTOM");

        // the same payment may reuse its own code on retry
        assert!(f
            .payments
            .pay_for_booking(&owner, first.id, request.clone(), "10.1.1.1")
            .await
            .is_ok());

        let err = f
            .payments
            .pay_for_booking(
                &owner,
                second.id,
                PaymentRequest {
                    amount: None,
                    ..request
                },
                "",
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[tokio::test]
    async fn gateway_payment_stays_pending_until_callback() {
        let f = fixture();
        let owner = Principal::user(7);
        let booking = book(&f, &owner).await;

        let receipt = f
            .payments
            .pay_for_booking(&owner, booking.id, gateway_request(), "  ")
            .await
            .unwrap();
        let payment = receipt.payment;
        let url = receipt.redirect_url.unwrap();

        assert_eq!(payment.status, PaymentStatus::Pending);
        assert_eq!(payment.gateway_txn_ref.as_deref(), Some(payment.transaction_code.as_str()));
        assert_eq!(
            payment.gateway_order_info,
            Some(format!("Thanh toan don dat san {}", booking.booking_code))
        );
        assert!(url.contains("vnp_IpAddr=127.0.0.1"));
        assert!(url.contains(&format!("vnp_TxnRef={}", payment.transaction_code)));

        let paid = f
            .payments
            .handle_gateway_callback(&success_callback(&payment.transaction_code, "15000"))
            .await
            .unwrap();
        assert_eq!(paid.status, PaymentStatus::Paid);
        assert_eq!(paid.gateway_response_code.as_deref(), Some("00"));
        let first_paid_at = Utc.with_ymd_and_hms(2031, 6, 1, 2, 30, 0).unwrap();
        assert_eq!(paid.paid_at, Some(first_paid_at));

        // replay is a no-op, even with a later pay date
        let replay = callback(&[
            ("vnp_TxnRef", payment.transaction_code.as_str()),
            ("vnp_Amount", "15000"),
            ("vnp_ResponseCode", "00"),
            ("vnp_TransactionStatus", "00"),
            ("vnp_PayDate", "20310601100000"),
        ]);
        let again = f.payments.handle_gateway_callback(&replay).await.unwrap();
        assert_eq!(again.status, PaymentStatus::Paid);
        assert_eq!(again.paid_at, Some(first_paid_at));

        let stored = f.repos.bookings().find_by_id(booking.id).await.unwrap().unwrap();
        assert_eq!(stored.status, BookingStatus::Confirmed);
    }

    #[tokio::test]
    async fn callback_rejections() {
        let f = fixture();
        let owner = Principal::user(7);
        let booking = book(&f, &owner).await;
        let payment = f
            .payments
            .pay_for_booking(&owner, booking.id, gateway_request(), "")
            .await
            .unwrap()
            .payment;

        let mut tampered = success_callback(&payment.transaction_code, "15000");
        tampered.insert("vnp_Amount".into(), "100".into());
        let err = f.payments.handle_gateway_callback(&tampered).await.unwrap_err();
        assert!(err.is_integrity());

        let err = f
            .payments
            .handle_gateway_callback(&success_callback(&payment.transaction_code, "100"))
            .await
            .unwrap_err();
        assert!(err.is_integrity());

        let err = f
            .payments
            .handle_gateway_callback(&success_callback("TX000000", "15000"))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound { .. }));

        let err = f
            .payments
            .handle_gateway_callback(&callback(&[("vnp_ResponseCode", "00")]))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));

        let stored = f.repos.payments().find_by_booking_id(booking.id).await.unwrap().unwrap();
        assert_eq!(stored.status, PaymentStatus::Pending);
        assert_eq!(stored.gateway_response_code, None);
    }

    #[tokio::test]
    async fn failed_callback_reverts_to_pending_and_records_code() {
        let f = fixture();
        let owner = Principal::user(7);
        let booking = book(&f, &owner).await;
        let payment = f
            .payments
            .pay_for_booking(&owner, booking.id, gateway_request(), "")
            .await
            .unwrap()
            .payment;

        let declined = f
            .payments
            .handle_gateway_callback(&callback(&[
                ("vnp_TxnRef", payment.transaction_code.as_str()),
                ("vnp_ResponseCode", "24"),
                ("vnp_TransactionStatus", "02"),
                ("vnp_OrderInfo", "Khach huy"),
            ]))
            .await
            .unwrap();
        assert_eq!(declined.status, PaymentStatus::Pending);
        assert_eq!(declined.paid_at, None);
        assert_eq!(declined.gateway_response_code.as_deref(), Some("24"));
        assert_eq!(declined.gateway_order_info.as_deref(), Some("Khach huy"));

        // the owner may try again with a fresh code
        let retry = f
            .payments
            .pay_for_booking(&owner, booking.id, gateway_request(), "")
            .await
            .unwrap()
            .payment;
        assert_eq!(retry.id, payment.id);
        assert_eq!(retry.gateway_response_code, None);
    }

    #[tokio::test]
    async fn success_after_cancellation_goes_to_refund_pending() {
        let f = fixture();
        let owner = Principal::user(7);
        let booking = book(&f, &owner).await;
        let payment = f
            .payments
            .pay_for_booking(&owner, booking.id, gateway_request(), "")
            .await
            .unwrap()
            .payment;
        f.bookings.cancel_booking(&owner, booking.id, None).await.unwrap();

        let result = f
            .payments
            .handle_gateway_callback(&success_callback(&payment.transaction_code, "15000"))
            .await
            .unwrap();
        assert_eq!(result.status, PaymentStatus::RefundPending);

        let stored = f.repos.bookings().find_by_id(booking.id).await.unwrap().unwrap();
        assert!(stored.is_cancelled());
    }

    #[tokio::test]
    async fn callback_for_superseded_attempt_is_not_applied() {
        let f = Arc::new(fixture());
        let owner = Principal::user(7);
        let booking = book(&f, &owner).await;
        let old = f
            .payments
            .pay_for_booking(&owner, booking.id, gateway_request(), "")
            .await
            .unwrap()
            .payment;

        let guard = f.locks.lock(LockKey::Booking(booking.id)).await;
        let pending = {
            let f = f.clone();
            let params = success_callback(&old.transaction_code, "15000");
            tokio::spawn(async move { f.payments.handle_gateway_callback(&params).await })
        };
        // let the callback find the old attempt and queue on the lock
        for _ in 0..5 {
            tokio::task::yield_now().await;
        }

        let mut retry = f.repos.payments().find_by_booking_id(booking.id).await.unwrap().unwrap();
        retry
            .begin_attempt(retry.amount, PaymentMethod::Gateway, "TXBBBBBB")
            .unwrap();
        retry.attach_gateway("TXBBBBBB", "retry");
        f.repos.payments().save(retry).await.unwrap();
        drop(guard);

        let err = pending.await.unwrap().unwrap_err();
        assert!(matches!(err, DomainError::NotFound { .. }));

        let stored = f.repos.payments().find_by_booking_id(booking.id).await.unwrap().unwrap();
        assert_eq!(stored.status, PaymentStatus::Pending);
        assert_eq!(stored.transaction_code, "TXBBBBBB");
        assert_eq!(stored.gateway_txn_ref.as_deref(), Some("TXBBBBBB"));
        assert_eq!(stored.gateway_response_code, None);
    }

    #[tokio::test]
    async fn failed_settlement_write_leaves_payment_pending() {
        let f = fixture();
        let owner = Principal::user(7);
        let booking = book(&f, &owner).await;
        let payment = f
            .payments
            .pay_for_booking(&owner, booking.id, gateway_request(), "")
            .await
            .unwrap()
            .payment;

        let failing = PaymentService::new(
            Arc::new(FailingJointWrites(f.repos.clone())),
            Arc::new(VnPayGateway::new(gateway_config())),
            f.locks.clone(),
            10,
        );
        let err = failing
            .handle_gateway_callback(&success_callback(&payment.transaction_code, "15000"))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Storage(_)));

        let err = failing
            .pay_for_booking(&owner, booking.id, PaymentRequest::default(), "")
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Storage(_)));

        let stored = f.repos.payments().find_by_booking_id(booking.id).await.unwrap().unwrap();
        assert_eq!(stored.status, PaymentStatus::Pending);
        assert_eq!(stored.method, PaymentMethod::Gateway);
        assert_eq!(stored.gateway_response_code, None);
    }

    #[tokio::test]
    async fn gateway_misconfiguration_leaves_no_writes() {
        let f = fixture_with(VnPayConfig::default());
        let owner = Principal::user(7);
        let booking = book(&f, &owner).await;

        let err = f
            .payments
            .pay_for_booking(&owner, booking.id, gateway_request(), "")
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Configuration(_)));
        assert!(f.repos.payments().find_by_booking_id(booking.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn admin_override_transitions() {
        let f = fixture();
        let owner = Principal::user(7);
        let admin = Principal::admin(1);
        let booking = book(&f, &owner).await;

        let err = f
            .payments
            .update_payment_status(&owner, booking.id, PaymentStatus::Paid, None)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Forbidden(_)));

        let err = f
            .payments
            .update_payment_status(&admin, booking.id, PaymentStatus::Refunded, None)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));

        let paid = f
            .payments
            .update_payment_status(&admin, booking.id, PaymentStatus::Paid, Some(PaymentMethod::Gateway))
            .await
            .unwrap();
        assert_eq!(paid.status, PaymentStatus::Paid);
        assert_eq!(paid.method, PaymentMethod::Gateway);
        assert_eq!(paid.amount, booking.total_amount);
        let paid_at = paid.paid_at.unwrap();

        let again = f
            .payments
            .update_payment_status(&admin, booking.id, PaymentStatus::Paid, None)
            .await
            .unwrap();
        assert_eq!(again.paid_at, Some(paid_at));
        assert_eq!(again.id, paid.id);

        let refund_pending = f
            .payments
            .update_payment_status(
                &admin,
                booking.id,
                PaymentStatus::RefundPending,
                Some(PaymentMethod::CashOnDelivery),
            )
            .await
            .unwrap();
        assert_eq!(refund_pending.refunded_at, None);
        assert_eq!(refund_pending.method, PaymentMethod::Gateway);

        let refunded = f
            .payments
            .update_payment_status(&admin, booking.id, PaymentStatus::Refunded, None)
            .await
            .unwrap();
        assert!(refunded.refunded_at.is_some());

        let pending = f
            .payments
            .update_payment_status(&admin, booking.id, PaymentStatus::Pending, None)
            .await
            .unwrap();
        assert_eq!(pending.paid_at, None);
        assert_eq!(pending.refunded_at, None);
    }
}
