//! Booking domain entity

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::domain::{DomainError, DomainResult};
use crate::shared::money::round_money;

/// Booking status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BookingStatus {
    /// Awaiting confirmation
    Pending,
    /// Slot is held for the owner
    Confirmed,
    /// Terminal; the slot is free again
    Cancelled,
}

/// Statuses that block a time slot from being booked again.
pub const ACTIVE_STATUSES: [BookingStatus; 2] = [BookingStatus::Pending, BookingStatus::Confirmed];

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Confirmed => "CONFIRMED",
            Self::Cancelled => "CANCELLED",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(Self::Pending),
            "CONFIRMED" => Some(Self::Confirmed),
            "CANCELLED" => Some(Self::Cancelled),
            _ => None,
        }
    }

    pub fn is_active(&self) -> bool {
        ACTIVE_STATUSES.contains(self)
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Half-open interval `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeSlot {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeSlot {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> DomainResult<Self> {
        if start >= end {
            return Err(DomainError::Validation(
                "End time must be after start time".to_string(),
            ));
        }
        Ok(Self { start, end })
    }

    /// Back-to-back slots (one ends exactly when the other starts) do not overlap.
    pub fn overlaps(&self, other: &TimeSlot) -> bool {
        self.start < other.end && other.start < self.end
    }

    pub fn duration_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }
}

/// `price_per_hour × hours`, where hours is `minutes / 60` rounded half-up to
/// 2 places and the product is rounded the same way.
pub fn calculate_total_amount(price_per_hour: Decimal, slot: &TimeSlot) -> DomainResult<Decimal> {
    let minutes = slot.duration_minutes();
    if minutes <= 0 {
        return Err(DomainError::Validation(
            "Duration must be greater than zero".to_string(),
        ));
    }
    let hours = round_money(Decimal::from(minutes) / Decimal::from(60));
    Ok(round_money(price_per_hour * hours))
}

/// Field booking
#[derive(Debug, Clone, PartialEq)]
pub struct Booking {
    /// Store-assigned ID (0 until inserted)
    pub id: i64,
    pub field_id: i64,
    /// Owner
    pub user_id: i64,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// Hourly price copied from the field at creation time
    pub price_at_booking: Decimal,
    pub total_amount: Decimal,
    /// Short human-readable code, unique across bookings
    pub booking_code: String,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancellation_reason: Option<String>,
}

impl Booking {
    pub fn new(
        field_id: i64,
        user_id: i64,
        slot: TimeSlot,
        price_at_booking: Decimal,
        total_amount: Decimal,
        booking_code: impl Into<String>,
    ) -> Self {
        Self {
            id: 0,
            field_id,
            user_id,
            start_time: slot.start,
            end_time: slot.end,
            price_at_booking,
            total_amount,
            booking_code: booking_code.into(),
            status: BookingStatus::Confirmed,
            created_at: Utc::now(),
            cancelled_at: None,
            cancellation_reason: None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.status == BookingStatus::Cancelled
    }

    pub fn has_started(&self, now: DateTime<Utc>) -> bool {
        self.start_time <= now
    }

    pub fn confirm(&mut self) {
        self.status = BookingStatus::Confirmed;
    }

    /// Cancel this booking. Only active bookings can be cancelled.
    pub fn cancel(&mut self, reason: Option<String>, at: DateTime<Utc>) -> DomainResult<()> {
        match self.status {
            BookingStatus::Cancelled => Err(DomainError::Validation(
                "Booking has already been cancelled".to_string(),
            )),
            BookingStatus::Pending | BookingStatus::Confirmed => {
                self.status = BookingStatus::Cancelled;
                self.cancelled_at = Some(at);
                self.cancellation_reason = reason;
                Ok(())
            }
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────
