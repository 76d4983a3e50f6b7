//! Tiered Cache - request-scoped cache tier over a shared Redis store
//!
//! Provides a two-tier cache manager with key-pattern invalidation and a
//! protected key that bulk operations never delete.

pub mod api;
pub mod cache;
pub mod config;
pub mod connection;
pub mod error;
pub mod models;
pub mod tasks;

pub use api::AppState;
pub use cache::{CacheManager, RequestCache};
pub use config::{Backend, Config};
pub use connection::{ConnectionProvider, MemoryConnection, RedisConnection};
pub use error::{CacheError, CacheResult};
pub use tasks::spawn_cleanup_task;
