//! Application ports (hexagonal architecture boundaries)
//!
//! Outbound ports that the services call into live here. Their production
//! implementations sit under `infrastructure`.

pub mod outbound;

pub use outbound::{GatewayCallback, PaymentGateway};
