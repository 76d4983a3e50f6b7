//! In-Memory Connection Module
//!
//! Sharded in-process stand-in for a clustered store. Every shard is exposed
//! as its own endpoint and owns a disjoint slice of the key space, so key
//! enumeration behaves like a cluster: one server only reports its own keys.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::sync::RwLock;
use tracing::debug;

use super::{ConnectionProvider, Database, Endpoint, Server};
use crate::cache::pattern::glob_match;
use crate::error::{CacheError, CacheResult};

const MEMORY_HOST: &str = "memory";

// == Stored Entry ==
/// A stored payload with optional absolute expiry.
#[derive(Debug, Clone)]
struct StoredEntry {
    value: String,
    /// Expiration timestamp (Unix milliseconds), None = no expiration
    expires_at: Option<u64>,
}

impl StoredEntry {
    fn new(value: String, expiry: Option<Duration>) -> Self {
        let expires_at = expiry.map(|ttl| {
            let ttl_ms = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX);
            current_timestamp_ms().saturating_add(ttl_ms)
        });
        Self { value, expires_at }
    }

    /// Expired once the current time reaches the expiration time.
    fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expires) => current_timestamp_ms() >= expires,
            None => false,
        }
    }
}

/// Returns current Unix timestamp in milliseconds.
fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or_default()
}

// == Shard ==
/// Key space owned by one endpoint, split by database index.
#[derive(Debug, Default)]
struct Shard {
    databases: HashMap<i64, HashMap<String, StoredEntry>>,
}

impl Shard {
    /// Looks up a live entry, dropping it if it has expired.
    fn get(&mut self, database: i64, key: &str) -> Option<String> {
        let entries = self.databases.get_mut(&database)?;
        if entries.get(key)?.is_expired() {
            entries.remove(key);
            return None;
        }
        entries.get(key).map(|entry| entry.value.clone())
    }

    fn set(&mut self, database: i64, key: &str, entry: StoredEntry) {
        self.databases
            .entry(database)
            .or_default()
            .insert(key.to_string(), entry);
    }

    fn delete(&mut self, database: i64, key: &str) -> bool {
        self.databases
            .get_mut(&database)
            .and_then(|entries| entries.remove(key))
            .is_some_and(|entry| !entry.is_expired())
    }

    fn keys(&self, database: i64, pattern: &str) -> Vec<String> {
        self.databases
            .get(&database)
            .map(|entries| {
                entries
                    .iter()
                    .filter(|(key, entry)| !entry.is_expired() && glob_match(pattern, key))
                    .map(|(key, _)| key.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Removes all expired entries; returns how many were dropped.
    fn cleanup_expired(&mut self) -> usize {
        let mut removed = 0;
        for entries in self.databases.values_mut() {
            let before = entries.len();
            entries.retain(|_, entry| !entry.is_expired());
            removed += before - entries.len();
        }
        removed
    }

    fn len(&self) -> usize {
        self.databases.values().map(HashMap::len).sum()
    }
}

// == Shared State ==
#[derive(Debug)]
struct Inner {
    endpoints: Vec<Endpoint>,
    shards: Vec<RwLock<Shard>>,
    reachable: AtomicBool,
}

impl Inner {
    fn ensure_reachable(&self) -> CacheResult<()> {
        if self.reachable.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(CacheError::ConnectionError(
                "In-memory store is unreachable".to_string(),
            ))
        }
    }

    fn shard_for(&self, key: &str) -> &RwLock<Shard> {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        let index = (hasher.finish() % self.shards.len() as u64) as usize;
        &self.shards[index]
    }
}

// == Memory Connection ==
/// Sharded in-memory connection. Cloning shares the same store.
#[derive(Debug, Clone)]
pub struct MemoryConnection {
    inner: Arc<Inner>,
}

impl MemoryConnection {
    /// Creates a store with `shards` nodes (at least one), exposed as
    /// endpoints `memory:0` .. `memory:<shards-1>`.
    pub fn new(shards: usize) -> Self {
        let shards = shards.max(1);
        let endpoints = (0..shards)
            .map(|n| Endpoint::new(MEMORY_HOST, n as u16))
            .collect();

        Self {
            inner: Arc::new(Inner {
                endpoints,
                shards: (0..shards).map(|_| RwLock::new(Shard::default())).collect(),
                reachable: AtomicBool::new(true),
            }),
        }
    }

    /// Simulates losing or regaining the store. While unreachable every
    /// operation fails with `ConnectionError`.
    pub fn set_reachable(&self, reachable: bool) {
        self.inner.reachable.store(reachable, Ordering::Release);
    }

    /// Purges expired entries from every shard.
    pub async fn cleanup_expired(&self) -> usize {
        let mut removed = 0;
        for shard in &self.inner.shards {
            removed += shard.write().await.cleanup_expired();
        }
        removed
    }

    /// Number of stored entries across all shards and databases, expired
    /// entries not yet purged included.
    pub async fn len(&self) -> usize {
        let mut total = 0;
        for shard in &self.inner.shards {
            total += shard.read().await.len();
        }
        total
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl ConnectionProvider for MemoryConnection {
    type Database = MemoryDatabase;
    type Server = MemoryServer;

    fn name(&self) -> &'static str {
        "memory"
    }

    async fn database(&self, index: i64) -> CacheResult<MemoryDatabase> {
        self.inner.ensure_reachable()?;
        Ok(MemoryDatabase {
            inner: Arc::clone(&self.inner),
            index,
        })
    }

    fn endpoints(&self) -> Vec<Endpoint> {
        self.inner.endpoints.clone()
    }

    fn server(&self, endpoint: &Endpoint) -> CacheResult<MemoryServer> {
        let shard = self
            .inner
            .endpoints
            .iter()
            .position(|e| e == endpoint)
            .ok_or_else(|| {
                CacheError::ConnectionError(format!("Unknown endpoint {}", endpoint))
            })?;

        Ok(MemoryServer {
            inner: Arc::clone(&self.inner),
            shard,
        })
    }
}

// == Database Handle ==
#[derive(Debug, Clone)]
pub struct MemoryDatabase {
    inner: Arc<Inner>,
    index: i64,
}

impl Database for MemoryDatabase {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        self.inner.ensure_reachable()?;
        let value = self.inner.shard_for(key).write().await.get(self.index, key);
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str, expiry: Option<Duration>) -> CacheResult<()> {
        self.inner.ensure_reachable()?;
        let entry = StoredEntry::new(value.to_string(), expiry);
        self.inner
            .shard_for(key)
            .write()
            .await
            .set(self.index, key, entry);
        Ok(())
    }

    async fn exists(&self, key: &str) -> CacheResult<bool> {
        Ok(self.get(key).await?.is_some())
    }

    async fn delete(&self, key: &str) -> CacheResult<bool> {
        self.inner.ensure_reachable()?;
        let existed = self
            .inner
            .shard_for(key)
            .write()
            .await
            .delete(self.index, key);
        Ok(existed)
    }

    async fn ping(&self) -> CacheResult<()> {
        self.inner.ensure_reachable()
    }
}

// == Server Handle ==
#[derive(Debug, Clone)]
pub struct MemoryServer {
    inner: Arc<Inner>,
    shard: usize,
}

impl Server for MemoryServer {
    fn endpoint(&self) -> &Endpoint {
        &self.inner.endpoints[self.shard]
    }

    async fn keys(&self, database: i64, pattern: &str) -> CacheResult<Vec<String>> {
        self.inner.ensure_reachable()?;
        let keys = self.inner.shards[self.shard]
            .read()
            .await
            .keys(database, pattern);
        Ok(keys)
    }

    async fn delete_many(&self, database: i64, keys: &[String]) -> CacheResult<u64> {
        self.inner.ensure_reachable()?;
        let mut shard = self.inner.shards[self.shard].write().await;
        let deleted = keys
            .iter()
            .filter(|key| shard.delete(database, key))
            .count() as u64;
        debug!(
            endpoint = %self.endpoint(),
            requested = keys.len(),
            deleted = deleted,
            "Memory batch DEL"
        );
        Ok(deleted)
    }
}
