//! HTTP REST API interfaces
//!
//! - `middleware`: bearer JWT authentication
//! - `modules`: request handlers and DTOs per resource
//! - `router`: route table and shared state

pub mod common;
pub mod middleware;
pub mod modules;
pub mod router;

pub use router::{create_api_router, ApiState};
