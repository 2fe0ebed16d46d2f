//! Booking service: application-layer orchestration of the schedule
//!
//! Creation and cancellation keep the per-field no-overlap invariant and
//! move the attached payment when a paid booking is cancelled. HTTP
//! handlers stay thin wrappers around these methods.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, SubsecRound, Utc};
use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::application::codes::{generate_unique_code, BOOKING_CODE_PREFIX};
use crate::application::locks::{KeyedLocks, LockKey};
use crate::domain::booking::{calculate_total_amount, ACTIVE_STATUSES};
use crate::domain::{
    Booking, DomainError, DomainResult, Field, Payment, Principal, RepositoryProvider, TimeSlot,
};
use crate::shared::types::{PaginatedResult, PaginationParams};
use crate::shared::validations::normalize_text;

/// A booking together with its payment, if one was ever started
#[derive(Debug, Clone)]
pub struct BookingWithPayment {
    pub booking: Booking,
    pub payment: Option<Payment>,
}

/// Detail projection for a single booking
#[derive(Debug, Clone)]
pub struct BookingDetail {
    pub booking: Booking,
    pub field: Option<Field>,
    pub payment: Option<Payment>,
}

pub struct BookingService {
    repos: Arc<dyn RepositoryProvider>,
    locks: Arc<KeyedLocks>,
    code_attempts: u32,
}

impl BookingService {
    pub fn new(repos: Arc<dyn RepositoryProvider>, locks: Arc<KeyedLocks>, code_attempts: u32) -> Self {
        Self {
            repos,
            locks,
            code_attempts: code_attempts.max(1),
        }
    }

    // ── Commands ───────────────────────────────────────────────

    /// Book `[start, end)` on a field for the requester.
    pub async fn create_booking(
        &self,
        principal: &Principal,
        field_id: i64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DomainResult<Booking> {
        let slot = TimeSlot::new(start.trunc_subsecs(0), end.trunc_subsecs(0))?;

        let field = self
            .repos
            .fields()
            .find_by_id(field_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Field", "id", field_id))?;

        if field.price_per_hour <= Decimal::ZERO {
            return Err(DomainError::Validation(
                "Field price must be greater than zero".to_string(),
            ));
        }
        let total_amount = calculate_total_amount(field.price_per_hour, &slot)?;

        let _guard = self.locks.lock(LockKey::Field(field_id)).await;

        let bookings = self.repos.bookings();
        if bookings
            .exists_overlap(field_id, &ACTIVE_STATUSES, slot.start, slot.end)
            .await?
        {
            return Err(DomainError::Conflict(
                "Field is already booked for the selected time range".to_string(),
            ));
        }

        for attempt in 1..=self.code_attempts {
            let code = generate_unique_code(
                BOOKING_CODE_PREFIX,
                "booking code",
                self.code_attempts,
                |c| async move { bookings.exists_by_code(&c).await },
            )
            .await?;

            let booking = Booking::new(
                field_id,
                principal.user_id,
                slot,
                field.price_per_hour,
                total_amount,
                code,
            );

            match bookings.insert(booking).await {
                Ok(saved) => {
                    info!(
                        booking_id = saved.id,
                        booking_code = %saved.booking_code,
                        field_id,
                        user_id = principal.user_id,
                        total_amount = %saved.total_amount,
                        "Booking created"
                    );
                    return Ok(saved);
                }
                Err(DomainError::Duplicate {
                    field: "booking_code",
                    value,
                    ..
                }) => {
                    warn!(attempt, code = %value, "Booking code taken at insert, regenerating");
                }
                Err(e) => return Err(e),
            }
        }

        Err(DomainError::CodeSpaceExhausted("booking code", self.code_attempts))
    }

    /// Cancel a booking. A PAID payment moves to REFUND_PENDING.
    pub async fn cancel_booking(
        &self,
        principal: &Principal,
        booking_id: i64,
        reason: Option<&str>,
    ) -> DomainResult<Booking> {
        let _guard = self.locks.lock(LockKey::Booking(booking_id)).await;

        let mut booking = self.load(booking_id).await?;
        if !principal.can_act_for(booking.user_id) {
            return Err(DomainError::Forbidden(
                "You are not allowed to cancel this booking".to_string(),
            ));
        }
        if booking.is_cancelled() {
            return Err(DomainError::Validation(
                "Booking has already been cancelled".to_string(),
            ));
        }

        let now = Utc::now().trunc_subsecs(0);
        if !principal.is_admin && booking.has_started(now) {
            return Err(DomainError::Validation(
                "Booking can only be cancelled before it starts".to_string(),
            ));
        }

        booking.cancel(normalize_text(reason), now)?;

        let payment = self.repos.payments().find_by_booking_id(booking_id).await?;
        match payment {
            Some(mut payment) if payment.is_paid() => {
                payment.request_refund()?;
                self.repos
                    .save_payment_and_booking(payment, Some(booking.clone()))
                    .await?;
                info!(booking_id, "Paid booking cancelled, refund pending");
            }
            _ => self.repos.bookings().update(booking.clone()).await?,
        }

        info!(
            booking_id,
            cancelled_by = principal.user_id,
            admin = principal.is_admin,
            "Booking cancelled"
        );
        Ok(booking)
    }

    // ── Queries ────────────────────────────────────────────────

    /// The requester's own bookings, latest start first.
    pub async fn list_own(&self, principal: &Principal) -> DomainResult<Vec<BookingWithPayment>> {
        let bookings = self.repos.bookings().find_by_user(principal.user_id).await?;
        self.join_payments(bookings).await
    }

    /// All bookings, newest first, optionally filtered by code substring.
    pub async fn admin_list(
        &self,
        principal: &Principal,
        code_filter: Option<&str>,
        params: PaginationParams,
    ) -> DomainResult<PaginatedResult<BookingWithPayment>> {
        require_admin(principal)?;

        let filter = normalize_text(code_filter);
        let page = self.repos.bookings().search(filter.as_deref(), params).await?;

        let PaginatedResult {
            items,
            total,
            page,
            limit,
            ..
        } = page;
        let joined = self.join_payments(items).await?;
        Ok(PaginatedResult::new(joined, total, page, limit))
    }

    /// Booking detail for the administrator console.
    pub async fn admin_detail(
        &self,
        principal: &Principal,
        booking_id: i64,
    ) -> DomainResult<BookingDetail> {
        require_admin(principal)?;
        self.booking_detail(principal, booking_id).await
    }

    /// Booking joined with its field and payment. Owners and admins only.
    pub async fn booking_detail(
        &self,
        principal: &Principal,
        booking_id: i64,
    ) -> DomainResult<BookingDetail> {
        let booking = self.load(booking_id).await?;
        if !principal.can_act_for(booking.user_id) {
            return Err(DomainError::Forbidden(
                "You are not allowed to view this booking".to_string(),
            ));
        }

        let field = self.repos.fields().find_by_id(booking.field_id).await?;
        let payment = self.repos.payments().find_by_booking_id(booking_id).await?;
        Ok(BookingDetail {
            booking,
            field,
            payment,
        })
    }

    // ── Helpers ────────────────────────────────────────────────

    async fn load(&self, booking_id: i64) -> DomainResult<Booking> {
        self.repos
            .bookings()
            .find_by_id(booking_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Booking", "id", booking_id))
    }

    async fn join_payments(&self, bookings: Vec<Booking>) -> DomainResult<Vec<BookingWithPayment>> {
        let ids: Vec<i64> = bookings.iter().map(|b| b.id).collect();
        let mut payments: HashMap<i64, Payment> = self
            .repos
            .payments()
            .find_by_booking_ids(&ids)
            .await?
            .into_iter()
            .map(|p| (p.booking_id, p))
            .collect();

        Ok(bookings
            .into_iter()
            .map(|booking| {
                let payment = payments.remove(&booking.id);
                BookingWithPayment { booking, payment }
            })
            .collect())
    }
}

pub(crate) fn require_admin(principal: &Principal) -> DomainResult<()> {
    if principal.is_admin {
        Ok(())
    } else {
        Err(DomainError::Forbidden(
            "Administrator role required".to_string(),
        ))
    }
}
