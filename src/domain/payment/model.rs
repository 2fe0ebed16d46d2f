//! Payment domain entity and its state machine

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::{DomainError, DomainResult};

/// Payment status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Paid,
    RefundPending,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Paid => "PAID",
            Self::RefundPending => "REFUND_PENDING",
            Self::Refunded => "REFUNDED",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(Self::Pending),
            "PAID" => Some(Self::Paid),
            "REFUND_PENDING" => Some(Self::RefundPending),
            "REFUNDED" => Some(Self::Refunded),
            _ => None,
        }
    }

    /// Next status after `event`.
    ///
    /// Gateway events arriving after a refund has started do not move the
    /// payment back; administrator overrides always apply.
    pub fn apply(self, event: PaymentEvent) -> DomainResult<PaymentStatus> {
        use PaymentEvent::*;
        use PaymentStatus::*;

        match (self, event) {
            (_, Override(target)) => Ok(target),

            (Paid, AttemptStarted) => Err(DomainError::Conflict(
                "Booking has already been paid".to_string(),
            )),
            (Pending | RefundPending | Refunded, AttemptStarted) => Ok(Pending),

            (Pending | Paid, Settled) => Ok(Paid),
            (RefundPending | Refunded, Settled) => Ok(self),

            (Pending | Paid, Declined) => Ok(Pending),
            (RefundPending | Refunded, Declined) => Ok(self),

            (Paid, RefundRequested) => Ok(RefundPending),
            (Pending | RefundPending | Refunded, RefundRequested) => Ok(self),
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Inputs that drive the payment state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentEvent {
    /// The owner starts (or restarts) a payment
    AttemptStarted,
    /// Money arrived: cash settlement or a successful gateway callback
    Settled,
    /// The gateway reported a failed or cancelled transaction
    Declined,
    /// The booking was cancelled
    RefundRequested,
    /// Administrator sets the status directly
    Override(PaymentStatus),
}

/// How the booking is paid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaymentMethod {
    /// Cash on delivery, settled immediately
    #[serde(rename = "COD", alias = "CASH_ON_DELIVERY")]
    CashOnDelivery,
    /// Redirect to the VNPay gateway, settled by callback
    #[serde(rename = "VNPAY", alias = "GATEWAY")]
    Gateway,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CashOnDelivery => "COD",
            Self::Gateway => "VNPAY",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "COD" | "CASH_ON_DELIVERY" => Some(Self::CashOnDelivery),
            "VNPAY" | "GATEWAY" => Some(Self::Gateway),
            _ => None,
        }
    }
}

impl Default for PaymentMethod {
    fn default() -> Self {
        Self::CashOnDelivery
    }
}

/// Payment attached to exactly one booking
#[derive(Debug, Clone, PartialEq)]
pub struct Payment {
    /// Store-assigned ID (0 until inserted)
    pub id: i64,
    pub booking_id: i64,
    /// Always equal to the booking total
    pub amount: Decimal,
    pub status: PaymentStatus,
    pub method: PaymentMethod,
    /// Globally unique, upper-case
    pub transaction_code: String,
    pub paid_at: Option<DateTime<Utc>>,
    pub refunded_at: Option<DateTime<Utc>>,
    /// Reference sent to and echoed back by the gateway
    pub gateway_txn_ref: Option<String>,
    pub gateway_order_info: Option<String>,
    pub gateway_response_code: Option<String>,
}

impl Payment {
    pub fn new(
        booking_id: i64,
        amount: Decimal,
        method: PaymentMethod,
        transaction_code: impl Into<String>,
    ) -> Self {
        Self {
            id: 0,
            booking_id,
            amount,
            status: PaymentStatus::Pending,
            method,
            transaction_code: transaction_code.into(),
            paid_at: None,
            refunded_at: None,
            gateway_txn_ref: None,
            gateway_order_info: None,
            gateway_response_code: None,
        }
    }

    pub fn is_paid(&self) -> bool {
        self.status == PaymentStatus::Paid
    }

    /// Reset this row for a fresh payment attempt.
    pub fn begin_attempt(
        &mut self,
        amount: Decimal,
        method: PaymentMethod,
        transaction_code: impl Into<String>,
    ) -> DomainResult<()> {
        self.status = self.status.apply(PaymentEvent::AttemptStarted)?;
        self.amount = amount;
        self.method = method;
        self.transaction_code = transaction_code.into();
        self.paid_at = None;
        self.refunded_at = None;
        self.gateway_txn_ref = None;
        self.gateway_order_info = None;
        self.gateway_response_code = None;
        Ok(())
    }

    /// Remember what was sent to the gateway for callback correlation.
    pub fn attach_gateway(&mut self, txn_ref: impl Into<String>, order_info: impl Into<String>) {
        self.gateway_txn_ref = Some(txn_ref.into());
        self.gateway_order_info = Some(order_info.into());
    }

    /// Whether a gateway reference belongs to the current attempt.
    pub fn matches_reference(&self, txn_ref: &str) -> bool {
        self.gateway_txn_ref.as_deref() == Some(txn_ref) || self.transaction_code == txn_ref
    }

    /// Record settlement. A repeated settlement keeps the first paid-at.
    /// Returns whether the payment is now PAID.
    pub fn settle(&mut self, paid_at: DateTime<Utc>) -> DomainResult<bool> {
        let previous = self.status;
        self.status = previous.apply(PaymentEvent::Settled)?;
        if self.status == PaymentStatus::Paid {
            if previous != PaymentStatus::Paid || self.paid_at.is_none() {
                self.paid_at = Some(paid_at);
            }
            self.refunded_at = None;
        }
        Ok(self.is_paid())
    }

    pub fn decline(&mut self) -> DomainResult<()> {
        self.status = self.status.apply(PaymentEvent::Declined)?;
        if self.status == PaymentStatus::Pending {
            self.paid_at = None;
        }
        Ok(())
    }

    /// Booking cancelled: a PAID payment waits for a manual refund.
    pub fn request_refund(&mut self) -> DomainResult<()> {
        let previous = self.status;
        self.status = previous.apply(PaymentEvent::RefundRequested)?;
        if self.status == PaymentStatus::RefundPending {
            self.refunded_at = None;
        }
        Ok(())
    }

    /// Administrator override. Timestamps set by an earlier override are kept.
    pub fn override_status(&mut self, target: PaymentStatus, now: DateTime<Utc>) -> DomainResult<()> {
        self.status = self.status.apply(PaymentEvent::Override(target))?;
        match target {
            PaymentStatus::Pending => {
                self.paid_at = None;
                self.refunded_at = None;
            }
            PaymentStatus::Paid => {
                self.paid_at.get_or_insert(now);
                self.refunded_at = None;
            }
            PaymentStatus::RefundPending => {
                self.refunded_at = None;
            }
            PaymentStatus::Refunded => {
                self.refunded_at.get_or_insert(now);
            }
        }
        Ok(())
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
    }

    fn sample_payment() -> Payment {
        Payment::new(1, Decimal::new(15000, 2), PaymentMethod::Gateway, "TX123456")
    }

    #[test]
    fn new_payment_is_pending() {
        let p = sample_payment();
        assert_eq!(p.status, PaymentStatus::Pending);
        assert!(p.paid_at.is_none());
        assert!(!p.is_paid());
    }

    #[test]
    fn attempt_on_paid_is_conflict() {
        let mut p = sample_payment();
        p.settle(t0()).unwrap();
        let err = p
            .begin_attempt(p.amount, PaymentMethod::Gateway, "TX999999")
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
        assert_eq!(p.transaction_code, "TX123456");
    }

    #[test]
    fn attempt_clears_previous_gateway_state() {
        let mut p = sample_payment();
        p.attach_gateway("TX123456", "order");
        p.gateway_response_code = Some("24".into());
        p.begin_attempt(p.amount, PaymentMethod::CashOnDelivery, "TX222222").unwrap();
        assert_eq!(p.status, PaymentStatus::Pending);
        assert!(p.gateway_txn_ref.is_none());
        assert!(p.gateway_response_code.is_none());
        assert_eq!(p.method, PaymentMethod::CashOnDelivery);
    }

    #[test]
    fn new_attempt_drops_old_reference() {
        let mut p = sample_payment();
        p.attach_gateway("TX123456", "order");
        assert!(p.matches_reference("TX123456"));

        p.begin_attempt(p.amount, PaymentMethod::Gateway, "TX222222").unwrap();
        p.attach_gateway("TX222222", "order");
        assert!(p.matches_reference("TX222222"));
        assert!(!p.matches_reference("TX123456"));
    }

    #[test]
    fn repeated_settlement_keeps_first_paid_at() {
        let mut p = sample_payment();
        assert!(p.settle(t0()).unwrap());
        assert!(p.settle(t0() + Duration::minutes(5)).unwrap());
        assert_eq!(p.paid_at, Some(t0()));
    }

    #[test]
    fn decline_reverts_to_pending() {
        let mut p = sample_payment();
        p.settle(t0()).unwrap();
        p.decline().unwrap();
        assert_eq!(p.status, PaymentStatus::Pending);
        assert!(p.paid_at.is_none());
    }

    #[test]
    fn refund_requested_only_moves_paid() {
        let mut p = sample_payment();
        p.request_refund().unwrap();
        assert_eq!(p.status, PaymentStatus::Pending);

        p.settle(t0()).unwrap();
        p.request_refund().unwrap();
        assert_eq!(p.status, PaymentStatus::RefundPending);
        assert!(p.refunded_at.is_none());
    }

    #[test]
    fn gateway_events_do_not_undo_refunds() {
        let mut p = sample_payment();
        p.settle(t0()).unwrap();
        p.request_refund().unwrap();
        assert!(!p.settle(t0()).unwrap());
        assert_eq!(p.status, PaymentStatus::RefundPending);
        p.decline().unwrap();
        assert_eq!(p.status, PaymentStatus::RefundPending);
    }

    #[test]
    fn override_paid_is_idempotent_on_paid_at() {
        let mut p = sample_payment();
        p.override_status(PaymentStatus::Paid, t0()).unwrap();
        p.override_status(PaymentStatus::Paid, t0() + Duration::hours(1)).unwrap();
        assert_eq!(p.paid_at, Some(t0()));
    }

    #[test]
    fn override_refunded_sets_refunded_at_once() {
        let mut p = sample_payment();
        p.override_status(PaymentStatus::Refunded, t0()).unwrap();
        p.override_status(PaymentStatus::Refunded, t0() + Duration::hours(1)).unwrap();
        assert_eq!(p.status, PaymentStatus::Refunded);
        assert_eq!(p.refunded_at, Some(t0()));

        p.override_status(PaymentStatus::Pending, t0()).unwrap();
        assert!(p.refunded_at.is_none());
        assert!(p.paid_at.is_none());
    }

    #[test]
    fn every_state_accepts_override() {
        let all = [
            PaymentStatus::Pending,
            PaymentStatus::Paid,
            PaymentStatus::RefundPending,
            PaymentStatus::Refunded,
        ];
        for from in all {
            for to in all {
                assert_eq!(from.apply(PaymentEvent::Override(to)).unwrap(), to);
            }
        }
    }

    #[test]
    fn method_parses_both_spellings() {
        assert_eq!(PaymentMethod::from_str("COD"), Some(PaymentMethod::CashOnDelivery));
        assert_eq!(PaymentMethod::from_str("GATEWAY"), Some(PaymentMethod::Gateway));
        assert_eq!(PaymentMethod::from_str("card"), None);
        let parsed: PaymentMethod = serde_json::from_str("\"VNPAY\"").unwrap();
        assert_eq!(parsed, PaymentMethod::Gateway);
    }

    #[test]
    fn status_roundtrip() {
        for status in &[
            PaymentStatus::Pending,
            PaymentStatus::Paid,
            PaymentStatus::RefundPending,
            PaymentStatus::Refunded,
        ] {
            assert_eq!(PaymentStatus::from_str(status.as_str()), Some(*status));
        }
    }
}
