//! Per-Request Cache Module
//!
//! In-memory key/value tier scoped to a single request. It holds serialized
//! payloads only for as long as the owning request runs and is dropped with it.

use std::collections::HashMap;

use serde::{de::DeserializeOwned, Serialize};

use crate::cache::pattern::{glob_match, sweep_pattern};
use crate::error::CacheResult;

// == Request Cache ==
/// Request-scoped cache tier.
///
/// Owned by exactly one request, so it needs no synchronization.
#[derive(Debug, Default)]
pub struct RequestCache {
    /// Serialized JSON payloads by key
    entries: HashMap<String, String>,
}

impl RequestCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_set(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    // == Get ==
    /// Returns the cached value, or `T::default()` when absent.
    ///
    /// A stored JSON `null` also yields the default.
    pub fn get<T>(&self, key: &str) -> CacheResult<T>
    where
        T: DeserializeOwned + Default,
    {
        match self.entries.get(key) {
            Some(payload) => decode_or_default(payload),
            None => Ok(T::default()),
        }
    }

    // == Set ==
    /// Stores `value` for the rest of the request.
    ///
    /// `_ttl_minutes` exists for parity with the distributed tier; the whole
    /// tier is discarded when the request ends.
    pub fn set<T>(&mut self, key: &str, value: &T, _ttl_minutes: u64) -> CacheResult<()>
    where
        T: Serialize + ?Sized,
    {
        let payload = serde_json::to_string(value)?;
        self.set_raw(key, payload);
        Ok(())
    }

    /// Stores an already-serialized payload.
    pub fn set_raw(&mut self, key: &str, payload: String) {
        self.entries.insert(key.to_string(), payload);
    }

    pub fn remove(&mut self, key: &str) {
        self.entries.remove(key);
    }

    // == Remove By Pattern ==
    /// Removes every key containing `pattern`, with the same glob rules as the
    /// distributed sweep. Returns the number of keys removed.
    pub fn remove_by_pattern(&mut self, pattern: &str) -> usize {
        let glob = sweep_pattern(pattern);
        let before = self.entries.len();
        self.entries.retain(|key, _| !glob_match(&glob, key));
        before - self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Decodes a JSON payload, mapping `null` to `T::default()`.
fn decode_or_default<T>(payload: &str) -> CacheResult<T>
where
    T: DeserializeOwned + Default,
{
    let value: Option<T> = serde_json::from_str(payload)?;
    Ok(value.unwrap_or_default())
}
