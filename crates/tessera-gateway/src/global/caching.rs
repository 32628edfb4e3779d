//! Caching global module: route result cache and database invalidation rules.

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tessera_kernel::cache::{
    CacheOptions, CacheStore, ConnectionState, KeyKind, route_prefix, route_resource_prefix,
    route_variant_key,
};
use tessera_kernel::{CacheInvalidation, DatabaseCacheRules, DbCacheRule, GatewayResult, IngressRoute};
use tracing::{debug, info, instrument};

/// Cluster-wide caching switch managed through the admin API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheConfig {
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

fn enabled_by_default() -> bool {
    true
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Caching module of one cluster.
///
/// All route keys it writes live under `cluster :: ingress-route`, so a
/// cluster-wide purge never touches another cluster sharing the store.
pub struct Caching {
    cluster_id: String,
    store: Arc<dyn CacheStore>,
    db_rules: DashMap<String, DatabaseCacheRules>,
    config: RwLock<CacheConfig>,
}

impl Caching {
    pub fn new(cluster_id: impl Into<String>, store: Arc<dyn CacheStore>) -> Self {
        Self {
            cluster_id: cluster_id.into(),
            store,
            db_rules: DashMap::new(),
            config: RwLock::new(CacheConfig::default()),
        }
    }

    pub fn cluster_id(&self) -> &str {
        &self.cluster_id
    }

    pub fn store(&self) -> &Arc<dyn CacheStore> {
        &self.store
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.store.connection_state()
    }

    pub fn config(&self) -> CacheConfig {
        self.config.read().clone()
    }

    /// Replace the caching switch.  Turning caching off purges every route
    /// result of the cluster, so nothing stale is served once it is back on.
    pub async fn set_config(&self, config: CacheConfig) -> GatewayResult<()> {
        let was_enabled = std::mem::replace(&mut *self.config.write(), config.clone()).enabled;
        info!(enabled = config.enabled, "cache config updated");
        if was_enabled && !config.enabled {
            self.purge_cluster().await?;
        }
        Ok(())
    }

    /// Cache the resolution result of `route` for the request variant
    /// described by `options`.  Routes without a cache config are skipped and
    /// `false` is returned, as is every route while caching is disabled.
    pub async fn set_route_result(
        &self,
        route: &IngressRoute,
        options: &CacheOptions,
        value: Value,
    ) -> GatewayResult<bool> {
        let Some(cache) = route.cache.as_ref().filter(|_| self.config.read().enabled) else {
            return Ok(false);
        };
        let key = route_variant_key(&self.cluster_id, &route.id, options);
        debug!(key = %key, "caching route result");
        self.store
            .set(key, value, KeyKind::from_ttl_secs(cache.ttl_secs))
            .await?;
        Ok(true)
    }

    pub async fn get_route_result(
        &self,
        route_id: &str,
        options: &CacheOptions,
    ) -> GatewayResult<Option<Value>> {
        if !self.config.read().enabled {
            return Ok(None);
        }
        self.store
            .get(&route_variant_key(&self.cluster_id, route_id, options))
            .await
    }

    /// Database cache rules of a tenant.
    pub fn db_rules(&self, tenant: &str) -> DatabaseCacheRules {
        self.db_rules
            .get(tenant)
            .map(|r| r.value().clone())
            .unwrap_or_default()
    }

    /// Rule for a `db/collection` pair of a tenant, if caching is enabled.
    pub fn db_rule(&self, tenant: &str, db: &str, collection: &str) -> Option<DbCacheRule> {
        let rules = self.db_rules.get(tenant)?;
        rules
            .get(&format!("{db}/{collection}"))
            .filter(|rule| rule.enabled)
            .cloned()
    }
}

#[async_trait]
impl CacheInvalidation for Caching {
    fn add_db_rules(&self, tenant: &str, rules: &DatabaseCacheRules) {
        self.db_rules.insert(tenant.to_string(), rules.clone());
    }

    fn delete_project_rules(&self, tenant: &str) {
        self.db_rules.remove(tenant);
    }

    #[instrument(skip(self), fields(cluster = %self.cluster_id))]
    async fn purge_route(&self, route_id: &str) -> GatewayResult<usize> {
        let removed = self
            .store
            .delete_prefix(&route_prefix(&self.cluster_id, route_id))
            .await?;
        debug!(removed, "route cache purged");
        Ok(removed)
    }

    #[instrument(skip(self), fields(cluster = %self.cluster_id))]
    async fn purge_cluster(&self) -> GatewayResult<usize> {
        let removed = self
            .store
            .delete_prefix(&route_resource_prefix(&self.cluster_id))
            .await?;
        info!(removed, "cluster route cache purged");
        Ok(removed)
    }
}
