//! API Module
//!
//! HTTP handlers and routing for the cache admin API. The surrounding web
//! application consumes the cache through [`crate::cache::CacheManager`]
//! directly; these endpoints expose the same operations for operators.

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
