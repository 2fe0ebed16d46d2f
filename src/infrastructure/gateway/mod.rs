//! Payment gateway adapters
//!
//! - [`AmountCodec`]: major units <-> gateway minor-unit strings
//! - [`CanonicalSigner`]: sorted, form-encoded, HMAC-SHA512 signed queries
//! - [`VnPayGateway`]: the `PaymentGateway` port over VNPay

mod amount;
mod signer;
mod vnpay;

pub use amount::AmountCodec;
pub use signer::{CanonicalSigner, SECURE_HASH, SECURE_HASH_TYPE};
pub use vnpay::{VnPayConfig, VnPayGateway};
