pub mod booking;
pub mod field;
pub mod payment;
pub mod principal;
pub mod repositories;

// Re-export commonly used types
pub use booking::{Booking, BookingRepository, BookingStatus, TimeSlot};
pub use field::{Field, FieldRepository};
pub use payment::{Payment, PaymentEvent, PaymentMethod, PaymentRepository, PaymentStatus};
pub use principal::Principal;
pub use repositories::{DomainResult, RepositoryProvider};

// Re-export DomainError from shared for convenience
pub use crate::shared::errors::DomainError;
