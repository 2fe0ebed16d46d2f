//! Field aggregate
//!
//! Bookable resources. The catalog is maintained elsewhere; this core only
//! reads it.

pub mod model;
pub mod repository;

pub use model::Field;
pub use repository::FieldRepository;
