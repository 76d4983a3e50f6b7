//! Connection Module
//!
//! Shared access to the backing key/value store. One connection is built by
//! the composition root and handed to every cache manager as `Arc<P>`.
//!
//! A connection exposes database handles for single-key commands and one
//! server handle per endpoint for key enumeration. In a clustered store each
//! server only sees its own keys, so sweeps must visit every endpoint.

mod memory;
mod redis;

use std::fmt;
use std::future::Future;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{CacheError, CacheResult};

pub use self::memory::MemoryConnection;
pub use self::redis::RedisConnection;

// == Endpoint ==
/// Network address of one store node, `host:port`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

impl FromStr for Endpoint {
    type Err = CacheError;

    fn from_str(s: &str) -> CacheResult<Self> {
        let (host, port) = s
            .rsplit_once(':')
            .ok_or_else(|| CacheError::InvalidRequest(format!("Endpoint '{}' lacks a port", s)))?;
        if host.is_empty() {
            return Err(CacheError::InvalidRequest(format!(
                "Endpoint '{}' lacks a host",
                s
            )));
        }
        let port = port
            .parse()
            .map_err(|_| CacheError::InvalidRequest(format!("Invalid port in endpoint '{}'", s)))?;
        Ok(Endpoint::new(host, port))
    }
}

// == Traits ==
/// Single-key commands against one logical database.
///
/// Each command is atomic at the store; no client-side locking is added.
pub trait Database: Send + Sync {
    /// Returns the raw payload, `None` when the key does not exist.
    fn get(&self, key: &str) -> impl Future<Output = CacheResult<Option<String>>> + Send;

    /// Writes the payload, replacing any previous value. `None` means no expiry.
    fn set(
        &self,
        key: &str,
        value: &str,
        expiry: Option<Duration>,
    ) -> impl Future<Output = CacheResult<()>> + Send;

    fn exists(&self, key: &str) -> impl Future<Output = CacheResult<bool>> + Send;

    /// Returns true if the key existed.
    fn delete(&self, key: &str) -> impl Future<Output = CacheResult<bool>> + Send;

    fn ping(&self) -> impl Future<Output = CacheResult<()>> + Send;
}

/// Per-node administrative handle.
pub trait Server: Send + Sync {
    fn endpoint(&self) -> &Endpoint;

    /// Enumerates the keys of `database` held by this node that match the
    /// glob `pattern`.
    fn keys(
        &self,
        database: i64,
        pattern: &str,
    ) -> impl Future<Output = CacheResult<Vec<String>>> + Send;

    /// Deletes keys held by this node, as reported by [`keys`](Self::keys);
    /// returns how many existed. Keys owned by other nodes are not touched.
    fn delete_many(
        &self,
        database: i64,
        keys: &[String],
    ) -> impl Future<Output = CacheResult<u64>> + Send;
}

/// Process-wide connection to the backing store.
pub trait ConnectionProvider: Send + Sync + 'static {
    type Database: Database;
    type Server: Server;

    /// Short backend name for logs and health output.
    fn name(&self) -> &'static str;

    fn database(&self, index: i64) -> impl Future<Output = CacheResult<Self::Database>> + Send;

    fn endpoints(&self) -> Vec<Endpoint>;

    /// Fails with `ConnectionError` for an endpoint this connection does not know.
    fn server(&self, endpoint: &Endpoint) -> CacheResult<Self::Server>;
}
