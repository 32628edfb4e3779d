//! Ordered in-memory cache store.

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::BTreeMap;
use tessera_kernel::GatewayResult;
use tessera_kernel::cache::{CacheKey, CacheStore, ConnectionState, KeyKind, KeyPrefix};
use tokio::time::Instant;

struct Entry {
    value: Value,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

/// [`CacheStore`] over a `BTreeMap`, so prefix deletes are range scans.
///
/// TTL entries expire passively: they are dropped when read after expiry or
/// swept by a purge.
#[derive(Default)]
pub struct MemoryCacheStore {
    entries: RwLock<BTreeMap<String, Entry>>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Keys currently stored, in order.
    pub fn keys(&self) -> Vec<String> {
        self.entries.read().keys().cloned().collect()
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, key: &CacheKey) -> GatewayResult<Option<Value>> {
        let now = Instant::now();
        {
            let entries = self.entries.read();
            match entries.get(key.as_str()) {
                None => return Ok(None),
                Some(entry) if !entry.is_expired(now) => return Ok(Some(entry.value.clone())),
                Some(_) => {}
            }
        }

        let mut entries = self.entries.write();
        if entries
            .get(key.as_str())
            .is_some_and(|entry| entry.is_expired(now))
        {
            entries.remove(key.as_str());
        }
        Ok(None)
    }

    async fn set(&self, key: CacheKey, value: Value, kind: KeyKind) -> GatewayResult<()> {
        let expires_at = match kind {
            KeyKind::Ttl(ttl) => Some(Instant::now() + ttl),
            KeyKind::Invalidate => None,
        };
        self.entries
            .write()
            .insert(key.as_str().to_string(), Entry { value, expires_at });
        Ok(())
    }

    async fn delete_prefix(&self, prefix: &KeyPrefix) -> GatewayResult<usize> {
        let mut entries = self.entries.write();
        let doomed: Vec<String> = entries
            .range(prefix.range_start()..)
            .take_while(|(key, _)| key.starts_with(prefix.as_str()))
            .filter(|(key, _)| prefix.matches(key))
            .map(|(key, _)| key.clone())
            .collect();
        for key in &doomed {
            entries.remove(key);
        }
        Ok(doomed.len())
    }

    fn connection_state(&self) -> ConnectionState {
        ConnectionState::Connected
    }
}
