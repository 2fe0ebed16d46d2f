//! Payment repository interface

use async_trait::async_trait;

use super::model::Payment;
use crate::domain::DomainResult;

#[async_trait]
pub trait PaymentRepository: Send + Sync {
    /// Insert (id == 0) or update the payment row and return the stored value.
    ///
    /// A transaction code already held by another payment yields
    /// `DomainError::Duplicate`.
    async fn save(&self, payment: Payment) -> DomainResult<Payment>;

    async fn find_by_booking_id(&self, booking_id: i64) -> DomainResult<Option<Payment>>;

    async fn find_by_booking_ids(&self, booking_ids: &[i64]) -> DomainResult<Vec<Payment>>;

    async fn find_by_transaction_code(&self, code: &str) -> DomainResult<Option<Payment>>;

    async fn exists_by_transaction_code(&self, code: &str) -> DomainResult<bool>;

    /// Find by the reference the gateway echoes back in callbacks
    async fn find_by_gateway_ref(&self, gateway_ref: &str) -> DomainResult<Option<Payment>>;
}
