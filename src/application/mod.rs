pub mod booking;
pub mod codes;
pub mod locks;
pub mod payment;
pub mod ports;

// Re-export key types for convenience
pub use booking::{BookingDetail, BookingService, BookingWithPayment};
pub use locks::{KeyedLocks, LockKey};
pub use payment::{PaymentReceipt, PaymentRequest, PaymentService};
pub use ports::{GatewayCallback, PaymentGateway};
