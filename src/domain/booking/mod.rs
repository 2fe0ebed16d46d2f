//! Booking aggregate
//!
//! Contains the Booking entity, the half-open time slot, and the
//! repository interface.

pub mod model;
pub mod repository;

pub use model::{calculate_total_amount, Booking, BookingStatus, TimeSlot, ACTIVE_STATUSES};
pub use repository::BookingRepository;
