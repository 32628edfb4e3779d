//! Contracts of the global modules shared by all tenants.
//!
//! Every tenant-scoped call carries the tenant id; implementations must be
//! safe for concurrent mutation by different tenants.

use crate::error::GatewayResult;
use crate::project::{DatabaseCacheRules, GlobalRoutesConfig, IngressRoute, LetsEncrypt};
use async_trait::async_trait;
use std::sync::Arc;

/// TLS-domain tracker feeding certificate issuance.
pub trait DomainTracker: Send + Sync {
    fn set_project_domains(&self, tenant: &str, config: &LetsEncrypt) -> GatewayResult<()>;

    /// Forget the tenant's domains.  A tenant without domains is not an error.
    fn delete_project_domains(&self, tenant: &str) -> GatewayResult<()>;

    fn project_domains(&self, tenant: &str) -> Vec<String>;
}

/// Ingress route table.
pub trait RouteTable: Send + Sync {
    fn set_project_routes(&self, tenant: &str, routes: &[IngressRoute]) -> GatewayResult<()>;

    fn delete_project_routes(&self, tenant: &str);

    fn set_global_config(&self, tenant: &str, config: &GlobalRoutesConfig);

    fn project_routes(&self, tenant: &str) -> Vec<IngressRoute>;

    fn global_config(&self, tenant: &str) -> GlobalRoutesConfig;
}

/// Invalidation side of the caching module.
#[async_trait]
pub trait CacheInvalidation: Send + Sync {
    fn add_db_rules(&self, tenant: &str, rules: &DatabaseCacheRules);

    fn delete_project_rules(&self, tenant: &str);

    /// Delete every cached variant of one route.  Returns the number of
    /// entries removed.
    async fn purge_route(&self, route_id: &str) -> GatewayResult<usize>;

    /// Delete every cached route result of this cluster.
    async fn purge_cluster(&self) -> GatewayResult<usize>;
}

/// Handles to the global modules, passed to the registry at construction.
#[derive(Clone)]
pub struct GlobalModules {
    letsencrypt: Arc<dyn DomainTracker>,
    routing: Arc<dyn RouteTable>,
    caching: Arc<dyn CacheInvalidation>,
}

impl GlobalModules {
    pub fn new(
        letsencrypt: Arc<dyn DomainTracker>,
        routing: Arc<dyn RouteTable>,
        caching: Arc<dyn CacheInvalidation>,
    ) -> Self {
        Self {
            letsencrypt,
            routing,
            caching,
        }
    }

    pub fn letsencrypt(&self) -> &Arc<dyn DomainTracker> {
        &self.letsencrypt
    }

    pub fn routing(&self) -> &Arc<dyn RouteTable> {
        &self.routing
    }

    pub fn caching(&self) -> &Arc<dyn CacheInvalidation> {
        &self.caching
    }
}
