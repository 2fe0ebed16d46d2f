//! Database entities module

pub mod booking;
pub mod field;
pub mod payment;

pub use booking::Entity as Booking;
pub use field::Entity as Field;
pub use payment::Entity as Payment;
