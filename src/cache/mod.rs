//! Cache Module
//!
//! Two-tier caching: a per-request memory tier composed in front of the shared
//! distributed store.

mod manager;
pub mod pattern;
mod request;


// Re-export public types
pub use manager::CacheManager;
pub use request::RequestCache;

// == Public Constants ==
/// Key holding the persisted data-protection key ring. Removals, pattern
/// sweeps and clears never delete it.
pub const RESERVED_KEY: &str = "DataProtection-Keys";

/// Cache time in minutes applied when a caller does not pick one
pub const DEFAULT_CACHE_TIME_MINUTES: u64 = 60;
