//! Cache Manager Module
//!
//! Two-tier cache: a request-scoped [`RequestCache`] in front of the shared
//! distributed store reached through a [`ConnectionProvider`].
//!
//! # Consistency
//! Single-key operations rely on the store's own atomicity. Sweeps
//! (`remove_by_pattern`, `clear`) enumerate and then delete, endpoint by
//! endpoint, without a transaction: a concurrent `set` may survive a sweep
//! or be deleted by it, and a failure mid-sweep leaves the store partially
//! cleared.

use std::sync::Arc;
use std::time::Duration;

use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, info, warn};

use crate::cache::pattern::sweep_pattern;
use crate::cache::request::RequestCache;
use crate::cache::RESERVED_KEY;
use crate::connection::{ConnectionProvider, Database, Server};
use crate::error::CacheResult;

/// Glob that matches every key.
const ALL_KEYS: &str = "*";

// == Cache Manager ==
/// Request-scoped cache manager over a shared connection.
///
/// Build one per request and drop (or [`dispose`](Self::dispose)) it when the
/// request ends; the connection outlives it.
#[derive(Debug)]
pub struct CacheManager<P: ConnectionProvider> {
    connection: Arc<P>,
    /// Logical database selected for every command
    database: i64,
    /// Never removed by `remove`, `remove_by_pattern` or `clear`
    reserved_key: String,
    request_cache: RequestCache,
}

impl<P: ConnectionProvider> CacheManager<P> {
    pub fn new(connection: Arc<P>, database: i64) -> Self {
        Self {
            connection,
            database,
            reserved_key: RESERVED_KEY.to_string(),
            request_cache: RequestCache::new(),
        }
    }

    /// Overrides the protected key.
    pub fn with_reserved_key(mut self, reserved_key: impl Into<String>) -> Self {
        self.reserved_key = reserved_key.into();
        self
    }

    pub fn request_cache(&self) -> &RequestCache {
        &self.request_cache
    }

    /// Case-insensitive comparison against the protected key.
    pub fn is_reserved(&self, key: &str) -> bool {
        key.eq_ignore_ascii_case(&self.reserved_key)
    }

    // == Get ==
    /// Reads `key`, serving from the request tier when possible.
    ///
    /// A distributed hit is copied into the request tier. Missing keys and
    /// `null` payloads yield `T::default()`.
    pub async fn get<T>(&mut self, key: &str) -> CacheResult<T>
    where
        T: DeserializeOwned + Default,
    {
        if self.request_cache.is_set(key) {
            debug!(key = key, "Cache HIT (request)");
            return self.request_cache.get(key);
        }

        let db = self.connection.database(self.database).await?;
        let Some(payload) = db.get(key).await? else {
            debug!(key = key, "Cache MISS");
            return Ok(T::default());
        };

        let value: Option<T> = serde_json::from_str(&payload)?;
        match value {
            Some(value) => {
                debug!(key = key, "Cache HIT (distributed)");
                self.request_cache.set_raw(key, payload);
                Ok(value)
            }
            None => Ok(T::default()),
        }
    }

    // == Set ==
    /// Writes `data` to the distributed store for `cache_time_minutes`
    /// (0 = no expiry). Values that serialize to `null` are not stored.
    /// Cache times beyond what the store can represent are clamped.
    ///
    /// The request tier is not written; any copy it holds is dropped so the
    /// next `get` re-reads the new value.
    pub async fn set<T>(&mut self, key: &str, data: &T, cache_time_minutes: u64) -> CacheResult<()>
    where
        T: Serialize + ?Sized,
    {
        let payload = serde_json::to_string(data)?;
        if payload == "null" {
            debug!(key = key, "Cache SET skipped for absent value");
            return Ok(());
        }

        let expiry = (cache_time_minutes > 0)
            .then(|| Duration::from_secs(cache_time_minutes.saturating_mul(60)));
        let db = self.connection.database(self.database).await?;
        db.set(key, &payload, expiry).await?;
        self.request_cache.remove(key);

        debug!(key = key, cache_time_minutes = cache_time_minutes, "Cache SET");
        Ok(())
    }

    // == Is Set ==
    pub async fn is_set(&self, key: &str) -> CacheResult<bool> {
        if self.request_cache.is_set(key) {
            return Ok(true);
        }
        let db = self.connection.database(self.database).await?;
        db.exists(key).await
    }

    // == Remove ==
    /// Deletes `key` from both tiers. The reserved key is silently kept.
    pub async fn remove(&mut self, key: &str) -> CacheResult<()> {
        if self.is_reserved(key) {
            warn!(key = key, "Refusing to remove reserved cache key");
            return Ok(());
        }

        let db = self.connection.database(self.database).await?;
        db.delete(key).await?;
        self.request_cache.remove(key);

        debug!(key = key, "Cache DEL");
        Ok(())
    }

    // == Remove By Pattern ==
    /// Deletes every key containing `pattern` (glob `*pattern*`) from both
    /// tiers, except the reserved key. Returns the distributed delete count.
    pub async fn remove_by_pattern(&mut self, pattern: &str) -> CacheResult<u64> {
        self.request_cache.remove_by_pattern(pattern);
        let deleted = self.sweep(&sweep_pattern(pattern)).await?;

        info!(pattern = pattern, deleted = deleted, "Cache pattern DEL");
        Ok(deleted)
    }

    // == Clear ==
    /// Deletes everything in the selected database except the reserved key.
    pub async fn clear(&mut self) -> CacheResult<u64> {
        self.request_cache.clear();
        let deleted = self.sweep(ALL_KEYS).await?;

        info!(database = self.database, deleted = deleted, "Cache cleared");
        Ok(deleted)
    }

    /// Enumerates `glob` on every endpoint and batch-deletes the matches on
    /// the endpoint that reported them, leaving the reserved key in place.
    async fn sweep(&self, glob: &str) -> CacheResult<u64> {
        let mut deleted = 0;

        for endpoint in self.connection.endpoints() {
            let server = self.connection.server(&endpoint)?;
            let keys: Vec<String> = server
                .keys(self.database, glob)
                .await?
                .into_iter()
                .filter(|key| !self.is_reserved(key))
                .collect();

            if keys.is_empty() {
                continue;
            }
            deleted += server.delete_many(self.database, &keys).await?;
            debug!(endpoint = %endpoint, matched = keys.len(), "Swept endpoint");
        }

        Ok(deleted)
    }

    // == Dispose ==
    /// Releases the request tier. The shared connection stays open.
    pub fn dispose(mut self) {
        let held = self.request_cache.len();
        self.request_cache.clear();
        debug!(held = held, "Cache manager disposed");
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::MemoryConnection;
    use crate::error::CacheError;
    use serde::Deserialize;

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    struct BasketItem {
        product_id: u32,
        quantity: u32,
    }

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    struct CustomerBasket {
        buyer_id: String,
        items: Vec<BasketItem>,
    }

    fn sample_basket() -> CustomerBasket {
        CustomerBasket {
            buyer_id: "buyer-1".to_string(),
            items: vec![
                BasketItem {
                    product_id: 7,
                    quantity: 2,
                },
                BasketItem {
                    product_id: 9,
                    quantity: 1,
                },
            ],
        }
    }

    fn setup(shards: usize) -> (Arc<MemoryConnection>, CacheManager<MemoryConnection>) {
        let conn = Arc::new(MemoryConnection::new(shards));
        let manager = CacheManager::new(Arc::clone(&conn), 0);
        (conn, manager)
    }

    async fn seed(conn: &MemoryConnection, keys: &[&str]) {
        let db = conn.database(0).await.unwrap();
        for key in keys {
            db.set(key, "\"seed\"", None).await.unwrap();
        }
    }

    async fn stored_keys(conn: &MemoryConnection) -> Vec<String> {
        let mut keys = Vec::new();
        for endpoint in conn.endpoints() {
            let server = conn.server(&endpoint).unwrap();
            keys.extend(server.keys(0, "*").await.unwrap());
        }
        keys.sort();
        keys
    }

    #[tokio::test]
    async fn test_get_never_written_returns_default() {
        let (_conn, mut manager) = setup(2);

        assert_eq!(manager.get::<u64>("missing").await.unwrap(), 0);
        assert_eq!(
            manager.get::<CustomerBasket>("missing").await.unwrap(),
            CustomerBasket::default()
        );
        assert!(!manager.is_set("missing").await.unwrap());
    }

    #[tokio::test]
    async fn test_set_then_get_round_trips() {
        let (_conn, mut manager) = setup(2);
        let basket = sample_basket();

        manager.set("basket:buyer-1", &basket, 30).await.unwrap();

        assert!(manager.is_set("basket:buyer-1").await.unwrap());
        assert_eq!(
            manager.get::<CustomerBasket>("basket:buyer-1").await.unwrap(),
            basket
        );
    }

    #[tokio::test]
    async fn test_distributed_hit_backfills_request_tier() {
        let (conn, mut manager) = setup(2);
        manager.set("k", &42u32, 10).await.unwrap();
        assert!(!manager.request_cache().is_set("k"));

        assert_eq!(manager.get::<u32>("k").await.unwrap(), 42);
        assert!(manager.request_cache().is_set("k"));

        // Served from the request tier even once the store is gone
        conn.set_reachable(false);
        assert_eq!(manager.get::<u32>("k").await.unwrap(), 42);
        assert!(manager.is_set("k").await.unwrap());
    }

    #[tokio::test]
    async fn test_set_drops_stale_request_copy() {
        let (_conn, mut manager) = setup(1);
        manager.set("k", "old", 10).await.unwrap();
        assert_eq!(manager.get::<String>("k").await.unwrap(), "old");

        manager.set("k", "new", 10).await.unwrap();

        assert_eq!(manager.get::<String>("k").await.unwrap(), "new");
    }

    #[tokio::test]
    async fn test_set_absent_value_is_noop() {
        let (conn, mut manager) = setup(1);
        manager.set("k", &Option::<u32>::None, 10).await.unwrap();

        assert!(!manager.is_set("k").await.unwrap());
        assert!(conn.is_empty().await);
    }

    #[tokio::test]
    async fn test_null_payload_returns_default_without_backfill() {
        let (conn, mut manager) = setup(1);
        conn.database(0)
            .await
            .unwrap()
            .set("nothing", "null", None)
            .await
            .unwrap();

        assert_eq!(manager.get::<String>("nothing").await.unwrap(), "");
        assert!(!manager.request_cache().is_set("nothing"));
    }

    #[tokio::test]
    async fn test_undecodable_payload_is_serialization_error() {
        let (conn, mut manager) = setup(1);
        seed(&conn, &["k"]).await;

        let result = manager.get::<u64>("k").await;
        assert!(matches!(result, Err(CacheError::SerializationError(_))));
    }

    #[tokio::test]
    async fn test_zero_cache_time_stores_without_expiry() {
        let (conn, mut manager) = setup(1);
        manager.set("forever", &1, 0).await.unwrap();

        assert_eq!(conn.cleanup_expired().await, 0);
        assert!(manager.is_set("forever").await.unwrap());
    }

    #[tokio::test]
    async fn test_huge_cache_time_is_clamped() {
        let (conn, mut manager) = setup(2);

        for (key, minutes) in [
            ("max", u64::MAX),
            ("max_div_30", u64::MAX / 30),
            ("millis_overflow", 307_445_734_561_825),
        ] {
            manager.set(key, &1u32, minutes).await.unwrap();
            assert!(manager.is_set(key).await.unwrap());
        }

        assert_eq!(conn.cleanup_expired().await, 0);
        assert_eq!(manager.get::<u32>("max").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_remove_deletes_from_both_tiers() {
        let (conn, mut manager) = setup(2);
        manager.set("k", &1, 10).await.unwrap();
        manager.get::<u32>("k").await.unwrap();

        manager.remove("k").await.unwrap();

        assert!(!manager.request_cache().is_set("k"));
        assert!(!manager.is_set("k").await.unwrap());
        assert!(conn.is_empty().await);
    }

    #[tokio::test]
    async fn test_remove_reserved_key_is_ignored_case_insensitively() {
        let (conn, mut manager) = setup(2);
        seed(&conn, &[RESERVED_KEY]).await;

        manager.remove(RESERVED_KEY).await.unwrap();
        manager
            .remove(&RESERVED_KEY.to_ascii_uppercase())
            .await
            .unwrap();

        assert_eq!(stored_keys(&conn).await, vec![RESERVED_KEY]);
    }

    #[tokio::test]
    async fn test_remove_by_pattern_spares_reserved_key() {
        let (conn, mut manager) = setup(3);
        seed(&conn, &["cart_1", "cart_2", "order_1", RESERVED_KEY]).await;

        let deleted = manager.remove_by_pattern("cart").await.unwrap();

        assert_eq!(deleted, 2);
        let mut expected = vec!["order_1", RESERVED_KEY];
        expected.sort();
        assert_eq!(stored_keys(&conn).await, expected);
    }

    #[tokio::test]
    async fn test_remove_by_pattern_matching_reserved_key() {
        let (conn, mut manager) = setup(3);
        seed(&conn, &["DataProtection-cache", RESERVED_KEY, "other"]).await;

        let deleted = manager.remove_by_pattern("DataProtection").await.unwrap();

        assert_eq!(deleted, 1);
        let mut expected = vec!["other", RESERVED_KEY];
        expected.sort();
        assert_eq!(stored_keys(&conn).await, expected);
    }

    #[tokio::test]
    async fn test_remove_by_pattern_clears_request_tier_matches() {
        let (_conn, mut manager) = setup(2);
        manager.set("cart_1", &1, 10).await.unwrap();
        manager.set("order_1", &2, 10).await.unwrap();
        manager.get::<u32>("cart_1").await.unwrap();
        manager.get::<u32>("order_1").await.unwrap();

        manager.remove_by_pattern("cart").await.unwrap();

        assert!(!manager.request_cache().is_set("cart_1"));
        assert!(manager.request_cache().is_set("order_1"));
        assert_eq!(manager.get::<u32>("cart_1").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_remove_by_pattern_with_many_stars_finishes() {
        let (conn, mut manager) = setup(2);
        let key = "a".repeat(40);
        seed(&conn, &[key.as_str()]).await;

        let deleted = manager
            .remove_by_pattern("a*a*a*a*a*a*a*a*a*a*a*a*b")
            .await
            .unwrap();

        assert_eq!(deleted, 0);
        assert_eq!(stored_keys(&conn).await, vec![key]);
    }

    #[tokio::test]
    async fn test_clear_deletes_on_every_endpoint() {
        let (conn, mut manager) = setup(4);
        let keys: Vec<String> = (0..40).map(|i| format!("order_{}", i)).collect();
        let refs: Vec<&str> = keys.iter().map(String::as_str).collect();
        seed(&conn, &refs).await;

        let deleted = manager.clear().await.unwrap();

        assert_eq!(deleted, 40);
        assert!(conn.is_empty().await);
    }

    #[tokio::test]
    async fn test_clear_leaves_only_reserved_key() {
        let (conn, mut manager) = setup(3);
        seed(&conn, &["a", "b", RESERVED_KEY]).await;
        manager.get::<String>("a").await.unwrap();

        let deleted = manager.clear().await.unwrap();

        assert_eq!(deleted, 2);
        assert!(manager.request_cache().is_empty());
        assert_eq!(stored_keys(&conn).await, vec![RESERVED_KEY]);
    }

    #[tokio::test]
    async fn test_clear_only_touches_selected_database() {
        let conn = Arc::new(MemoryConnection::new(2));
        let mut db0 = CacheManager::new(Arc::clone(&conn), 0);
        let mut db1 = CacheManager::new(Arc::clone(&conn), 1);
        db0.set("k", &0, 10).await.unwrap();
        db1.set("k", &1, 10).await.unwrap();

        db0.clear().await.unwrap();

        assert!(!db0.is_set("k").await.unwrap());
        assert_eq!(db1.get::<u32>("k").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_custom_reserved_key() {
        let conn = Arc::new(MemoryConnection::new(2));
        let mut manager = CacheManager::new(Arc::clone(&conn), 0).with_reserved_key("keyring");
        seed(&conn, &["keyring", RESERVED_KEY]).await;

        manager.clear().await.unwrap();

        assert_eq!(stored_keys(&conn).await, vec!["keyring"]);
    }

    #[tokio::test]
    async fn test_connection_errors_propagate() {
        let (conn, mut manager) = setup(2);
        conn.set_reachable(false);

        assert!(matches!(
            manager.get::<u32>("k").await,
            Err(CacheError::ConnectionError(_))
        ));
        assert!(matches!(
            manager.set("k", &1, 10).await,
            Err(CacheError::ConnectionError(_))
        ));
        assert!(matches!(
            manager.remove("k").await,
            Err(CacheError::ConnectionError(_))
        ));
        assert!(matches!(
            manager.clear().await,
            Err(CacheError::ConnectionError(_))
        ));
    }

    #[tokio::test]
    async fn test_request_scopes_are_isolated() {
        let conn = Arc::new(MemoryConnection::new(2));
        let mut first = CacheManager::new(Arc::clone(&conn), 0);
        let mut second = CacheManager::new(Arc::clone(&conn), 0);

        first.set("shared", "one", 10).await.unwrap();
        assert_eq!(first.get::<String>("shared").await.unwrap(), "one");

        second.set("shared", "two", 10).await.unwrap();
        assert_eq!(second.get::<String>("shared").await.unwrap(), "two");

        // First scope still sees its own request copy
        assert_eq!(first.get::<String>("shared").await.unwrap(), "one");

        // A fresh scope observes the distributed value
        let mut third = CacheManager::new(Arc::clone(&conn), 0);
        assert_eq!(third.get::<String>("shared").await.unwrap(), "two");
    }

    #[tokio::test]
    async fn test_dispose_keeps_connection_usable() {
        let (conn, mut manager) = setup(1);
        manager.set("k", &5, 10).await.unwrap();
        manager.get::<u32>("k").await.unwrap();
        manager.dispose();

        let mut next = CacheManager::new(conn, 0);
        assert_eq!(next.get::<u32>("k").await.unwrap(), 5);
    }
}
