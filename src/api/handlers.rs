//! API Handlers
//!
//! HTTP request handlers for the cache admin endpoints. Every request gets
//! its own [`CacheManager`], so its request tier lives exactly as long as the
//! handler call.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::Value;
use tracing::warn;

use crate::cache::CacheManager;
use crate::config::Config;
use crate::connection::{ConnectionProvider, Database};
use crate::error::{CacheError, CacheResult};
use crate::models::{
    validate_key, DeleteResponse, ExistsResponse, GetResponse, HealthResponse, PatternRequest,
    SetRequest, SetResponse, SweepResponse,
};

/// Application state shared across all handlers.
///
/// Holds the process-wide connection; cache managers are built from it per
/// request.
pub struct AppState<P: ConnectionProvider> {
    pub connection: Arc<P>,
    pub database: i64,
    pub reserved_key: Arc<str>,
    /// Minutes applied when a set request carries no cache time
    pub default_cache_time: u64,
}

impl<P: ConnectionProvider> Clone for AppState<P> {
    fn clone(&self) -> Self {
        Self {
            connection: Arc::clone(&self.connection),
            database: self.database,
            reserved_key: Arc::clone(&self.reserved_key),
            default_cache_time: self.default_cache_time,
        }
    }
}

impl<P: ConnectionProvider> AppState<P> {
    /// Creates a new AppState from configuration around an open connection.
    pub fn new(connection: Arc<P>, config: &Config) -> Self {
        Self {
            connection,
            database: config.database,
            reserved_key: Arc::from(config.reserved_key.as_str()),
            default_cache_time: config.default_cache_time,
        }
    }

    /// Builds the request-scoped cache manager.
    pub fn cache_manager(&self) -> CacheManager<P> {
        CacheManager::new(Arc::clone(&self.connection), self.database)
            .with_reserved_key(self.reserved_key.as_ref())
    }
}

fn reject_invalid_key(key: &str) -> CacheResult<()> {
    match validate_key(key) {
        Some(message) => Err(CacheError::InvalidRequest(message)),
        None => Ok(()),
    }
}

/// Handler for GET /cache/entries/:key
pub async fn get_handler<P: ConnectionProvider>(
    State(state): State<AppState<P>>,
    Path(key): Path<String>,
) -> CacheResult<Json<GetResponse>> {
    reject_invalid_key(&key)?;

    let mut cache = state.cache_manager();
    let value: Value = cache.get(&key).await?;

    Ok(Json(GetResponse::new(key, value)))
}

/// Handler for GET /cache/entries/:key/exists
pub async fn exists_handler<P: ConnectionProvider>(
    State(state): State<AppState<P>>,
    Path(key): Path<String>,
) -> CacheResult<Json<ExistsResponse>> {
    reject_invalid_key(&key)?;

    let cache = state.cache_manager();
    let exists = cache.is_set(&key).await?;

    Ok(Json(ExistsResponse::new(key, exists)))
}

/// Handler for PUT /cache/entries
pub async fn set_handler<P: ConnectionProvider>(
    State(state): State<AppState<P>>,
    Json(req): Json<SetRequest>,
) -> CacheResult<Json<SetResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    let cache_time = req.cache_time.unwrap_or(state.default_cache_time);
    let mut cache = state.cache_manager();
    cache.set(&req.key, &req.value, cache_time).await?;

    Ok(Json(SetResponse::new(req.key)))
}

/// Handler for DELETE /cache/entries/:key
///
/// Succeeds for the reserved key without deleting it.
pub async fn remove_handler<P: ConnectionProvider>(
    State(state): State<AppState<P>>,
    Path(key): Path<String>,
) -> CacheResult<Json<DeleteResponse>> {
    reject_invalid_key(&key)?;

    let mut cache = state.cache_manager();
    cache.remove(&key).await?;

    Ok(Json(DeleteResponse::new(key)))
}

/// Handler for POST /cache/remove-by-pattern
pub async fn remove_by_pattern_handler<P: ConnectionProvider>(
    State(state): State<AppState<P>>,
    Json(req): Json<PatternRequest>,
) -> CacheResult<Json<SweepResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    let mut cache = state.cache_manager();
    let removed = cache.remove_by_pattern(&req.pattern).await?;

    Ok(Json(SweepResponse::pattern(req.pattern, removed)))
}

/// Handler for POST /cache/clear
pub async fn clear_handler<P: ConnectionProvider>(
    State(state): State<AppState<P>>,
) -> CacheResult<Json<SweepResponse>> {
    let mut cache = state.cache_manager();
    let removed = cache.clear().await?;

    Ok(Json(SweepResponse::clear(removed)))
}

/// Handler for GET /health
///
/// Pings the backing store; 503 when it does not answer.
pub async fn health_handler<P: ConnectionProvider>(
    State(state): State<AppState<P>>,
) -> (StatusCode, Json<HealthResponse>) {
    let backend = state.connection.name();
    let ping = match state.connection.database(state.database).await {
        Ok(db) => db.ping().await,
        Err(e) => Err(e),
    };

    match ping {
        Ok(()) => (StatusCode::OK, Json(HealthResponse::healthy(backend))),
        Err(e) => {
            warn!(error = %e, "Health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse::unavailable(backend)),
            )
        }
    }
}
