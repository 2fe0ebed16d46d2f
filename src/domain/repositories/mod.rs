//! Repository traits for the domain layer
//!
//! Contains:
//! - `RepositoryProvider` : unified access to all per-aggregate repositories
//! - `DomainResult` : standard result type for domain operations

use async_trait::async_trait;

use super::booking::{Booking, BookingRepository};
use super::field::FieldRepository;
use super::payment::{Payment, PaymentRepository};
use crate::shared::errors::DomainError;

/// Result type for domain operations
pub type DomainResult<T> = Result<T, DomainError>;

/// Provides access to all domain repositories.
///
/// Consumers request only the repository they need:
///
/// ```ignore
/// async fn handle(repos: &dyn RepositoryProvider) {
///     let field = repos.fields().find_by_id(1).await?;
///     let payment = repos.payments().find_by_booking_id(42).await?;
/// }
/// ```
#[async_trait]
pub trait RepositoryProvider: Send + Sync {
    fn fields(&self) -> &dyn FieldRepository;
    fn bookings(&self) -> &dyn BookingRepository;
    fn payments(&self) -> &dyn PaymentRepository;

    /// Save `payment` and, when given, update `booking` as one unit.
    ///
    /// Either both writes land or neither does. Errors are those of
    /// `PaymentRepository::save` and `BookingRepository::update`.
    async fn save_payment_and_booking(
        &self,
        payment: Payment,
        booking: Option<Booking>,
    ) -> DomainResult<Payment>;
}
