//! Infrastructure layer - external concerns

pub mod crypto;
pub mod database;
pub mod gateway;
pub mod storage;

pub use database::{init_database, DatabaseConfig};
pub use gateway::{VnPayConfig, VnPayGateway};
pub use storage::InMemoryRepositoryProvider;
