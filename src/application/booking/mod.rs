//! Booking scheduling use-cases

pub mod service;

pub use service::{BookingDetail, BookingService, BookingWithPayment};
