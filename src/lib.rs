//! # Field Booking Service
//!
//! Booking and payment backend for sports fields with a VNPay hosted
//! checkout.
//!
//! ## Architecture
//!
//! The project follows Clean Architecture principles:
//!
//! - **domain**: fields, bookings, payments and the payment state machine
//! - **application**: booking scheduler, payment lifecycle, code generation
//!   and per-key locking
//! - **infrastructure**: SeaORM persistence, in-memory store, VNPay signing,
//!   JWT verification
//! - **interfaces**: axum REST API
//! - **shared**: errors, pagination, money helpers, shutdown signal

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod interfaces;
pub mod server;
pub mod shared;

pub use config::{default_config_path, AppConfig};

// Re-export database types for easy access
pub use infrastructure::database::repositories::SeaOrmRepositoryProvider;
pub use infrastructure::{init_database, DatabaseConfig};

pub use interfaces::http::create_api_router;
