//! Outbound ports: interfaces to external payment gateways
//!
//! [`PaymentGateway`] decouples the payment service from the concrete
//! redirect/callback protocol. The production implementation is
//! [`VnPayGateway`](crate::infrastructure::gateway::VnPayGateway).

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::domain::DomainResult;

/// Parsed, signature-checked result reported by the gateway
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayCallback {
    /// Reference we sent with the redirect
    pub txn_ref: String,
    /// Amount echoed back, in major units
    pub amount: Option<Decimal>,
    pub response_code: Option<String>,
    pub transaction_status: Option<String>,
    pub order_info: Option<String>,
    /// Settlement time reported by the gateway
    pub paid_at: Option<DateTime<Utc>>,
    pub success: bool,
}

/// Port for building payment redirects and checking their callbacks.
pub trait PaymentGateway: Send + Sync {
    /// Build a signed URL the payer is redirected to.
    ///
    /// Fails with `DomainError::Configuration` when the gateway settings
    /// are incomplete.
    fn build_redirect_url(
        &self,
        amount: Decimal,
        order_info: &str,
        txn_ref: &str,
        client_ip: &str,
    ) -> DomainResult<String>;

    /// Whether the callback parameters carry a valid signature.
    fn verify_callback(&self, params: &BTreeMap<String, String>) -> bool;

    /// Extract the outcome from callback parameters. Does not check the
    /// signature; call [`verify_callback`](Self::verify_callback) first.
    fn parse_callback(&self, params: &BTreeMap<String, String>) -> DomainResult<GatewayCallback>;
}
