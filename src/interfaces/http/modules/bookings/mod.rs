//! Booking module: create, list own, cancel and pay

pub mod dto;
pub mod handlers;

pub use dto::*;
pub use handlers::*;
