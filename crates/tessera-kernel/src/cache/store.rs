//! Contract of the cache store used by the caching module.
//!
//! Storage engine and eviction are not part of the core; callers only rely on
//! key-addressed reads/writes and prefix deletion.

use super::key::{CacheKey, KeyPrefix};
use crate::error::GatewayResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How an entry leaves the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    /// Expires passively once the duration has elapsed.
    Ttl(Duration),
    /// Stays until removed eagerly by a matching purge.
    Invalidate,
}

impl KeyKind {
    /// `ttl_secs == 0` means invalidate-only.
    pub fn from_ttl_secs(ttl_secs: u64) -> Self {
        if ttl_secs == 0 {
            KeyKind::Invalidate
        } else {
            KeyKind::Ttl(Duration::from_secs(ttl_secs))
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Connected,
    Disconnected,
}

#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &CacheKey) -> GatewayResult<Option<serde_json::Value>>;

    async fn set(&self, key: CacheKey, value: serde_json::Value, kind: KeyKind) -> GatewayResult<()>;

    /// Remove every key under `prefix` (segment-aware, see
    /// [`KeyPrefix::matches`]).  Returns the number of keys removed.
    async fn delete_prefix(&self, prefix: &KeyPrefix) -> GatewayResult<usize>;

    fn connection_state(&self) -> ConnectionState;
}
