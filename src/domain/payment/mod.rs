//! Payment aggregate
//!
//! One payment per booking, created lazily on the first payment attempt and
//! mutated in place on every later attempt, callback, or override.

pub mod model;
pub mod repository;

pub use model::{Payment, PaymentEvent, PaymentMethod, PaymentStatus};
pub use repository::PaymentRepository;
