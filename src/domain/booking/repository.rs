//! Booking repository interface

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::model::{Booking, BookingStatus};
use crate::domain::DomainResult;
use crate::shared::types::{PaginatedResult, PaginationParams};

#[async_trait]
pub trait BookingRepository: Send + Sync {
    /// Insert a new booking and return it with its assigned ID.
    ///
    /// Implementations must make the overlap check and the insert atomic:
    /// an overlapping active booking on the same field yields
    /// `DomainError::Conflict`, a taken booking code yields
    /// `DomainError::Duplicate`.
    async fn insert(&self, booking: Booking) -> DomainResult<Booking>;

    /// Update an existing booking
    async fn update(&self, booking: Booking) -> DomainResult<()>;

    /// Find booking by ID
    async fn find_by_id(&self, id: i64) -> DomainResult<Option<Booking>>;

    /// Whether any booking already uses this code
    async fn exists_by_code(&self, code: &str) -> DomainResult<bool>;

    /// Whether a booking on `field_id` with one of `statuses` overlaps `[start, end)`
    async fn exists_overlap(
        &self,
        field_id: i64,
        statuses: &[BookingStatus],
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DomainResult<bool>;

    /// All bookings of one user, latest start first
    async fn find_by_user(&self, user_id: i64) -> DomainResult<Vec<Booking>>;

    /// Page through all bookings, newest first, optionally filtered by a
    /// case-insensitive booking code substring
    async fn search(
        &self,
        code_filter: Option<&str>,
        params: PaginationParams,
    ) -> DomainResult<PaginatedResult<Booking>>;
}
