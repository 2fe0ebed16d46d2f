//! Administrator booking module: listing, detail and payment-status override

pub mod dto;
pub mod handlers;

pub use dto::*;
pub use handlers::*;
