//! Payment lifecycle use-cases

pub mod service;

pub use service::{PaymentReceipt, PaymentRequest, PaymentService};
