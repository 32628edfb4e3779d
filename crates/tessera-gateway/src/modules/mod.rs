//! Per-tenant module registry.
//!
//! [`Modules`] maps each tenant id to its live [`Module`].  Reads take the
//! shared lock and never create; creation and deletion take the exclusive
//! lock.
//!
//! ```text
//!  admin push ──► load_module ──NotFound──► new_module ──► Module::apply
//!                     │                         │
//!                     └──────── found ──────────┘
//! ```

mod module;

pub use module::{APPLY_ORDER, ApplyMode, ApplyReport, AuthOutcome, Module};

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tessera_kernel::cache::ResourceKind;
use tessera_kernel::{
    AuthorizationEngine, CacheInvalidation, CallContext, DomainTracker, EngineDeps,
    EngineFactory, GatewayError, GatewayResult, GlobalModules, GlobalRoutesConfig,
    IngressRoute, LetsEncrypt, Managers, Project, ProjectConfig, RequestParams, RouteTable,
    TenantId,
};
use tokio::sync::RwLock;
use tracing::{error, info, instrument, warn};

/// Message surfaced when the admin manager refuses a new project.
pub const UPGRADE_MESSAGE: &str = "upgrade your plan to create new project";

/// Per-tenant reports of a batch initial load.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InitialLoadReport {
    reports: Vec<ApplyReport>,
}

impl InitialLoadReport {
    pub fn reports(&self) -> &[ApplyReport] {
        &self.reports
    }

    /// Reports of tenants with at least one failed facet.
    pub fn failed(&self) -> impl Iterator<Item = &ApplyReport> {
        self.reports.iter().filter(|r| !r.is_clean())
    }

    pub fn is_clean(&self) -> bool {
        self.reports.iter().all(ApplyReport::is_clean)
    }
}

/// Tenant-scoped cache purge.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurgeRequest {
    /// Resource kind; only `ingress-route` is cached.  Defaults to it.
    #[serde(default)]
    pub resource: Option<String>,
    /// Route to purge; every route of the tenant when absent.
    #[serde(default)]
    pub id: Option<String>,
}

impl PurgeRequest {
    pub fn route(id: impl Into<String>) -> Self {
        Self {
            resource: None,
            id: Some(id.into()),
        }
    }

    pub fn all_routes() -> Self {
        Self::default()
    }
}

/// Registry of tenant modules.
pub struct Modules {
    blocks: RwLock<HashMap<TenantId, Arc<Module>>>,
    cluster_id: String,
    node_id: String,
    managers: Managers,
    globals: GlobalModules,
    engines: Arc<dyn EngineFactory>,
}

impl Modules {
    pub fn new(
        cluster_id: impl Into<String>,
        node_id: impl Into<String>,
        managers: Managers,
        globals: GlobalModules,
        engines: Arc<dyn EngineFactory>,
    ) -> Self {
        Self {
            blocks: RwLock::new(HashMap::new()),
            cluster_id: cluster_id.into(),
            node_id: node_id.into(),
            managers,
            globals,
            engines,
        }
    }

    pub fn cluster_id(&self) -> &str {
        &self.cluster_id
    }

    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    pub fn managers(&self) -> &Managers {
        &self.managers
    }

    pub fn letsencrypt(&self) -> &Arc<dyn DomainTracker> {
        self.globals.letsencrypt()
    }

    pub fn routing(&self) -> &Arc<dyn RouteTable> {
        self.globals.routing()
    }

    pub fn caching(&self) -> &Arc<dyn CacheInvalidation> {
        self.globals.caching()
    }

    /// Registered tenant ids, sorted.
    pub async fn tenant_ids(&self) -> Vec<TenantId> {
        let mut ids: Vec<TenantId> = self.blocks.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub async fn len(&self) -> usize {
        self.blocks.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.blocks.read().await.is_empty()
    }

    /// Module of `tenant`.  Never creates.
    pub async fn load_module(&self, tenant: &str) -> GatewayResult<Arc<Module>> {
        self.blocks
            .read()
            .await
            .get(tenant)
            .cloned()
            .ok_or_else(|| GatewayError::NotFound(tenant.to_string()))
    }

    /// Create the module of `config.id`.
    ///
    /// The admin manager judges the request against the registered ids as
    /// seen under the exclusive lock, so concurrent creations of different
    /// tenants never overshoot the plan limit.  If another caller created
    /// the module first, that module is returned and nothing new is built.
    #[instrument(skip(self, config), fields(tenant = %config.id))]
    pub async fn new_module(&self, config: &ProjectConfig) -> GatewayResult<Arc<Module>> {
        let mut blocks = self.blocks.write().await;
        if let Some(existing) = blocks.get(&config.id) {
            return Ok(existing.clone());
        }

        let mut snapshot: Vec<TenantId> = blocks.keys().cloned().collect();
        snapshot.sort();

        if !self.managers.admin().validate_creation(&snapshot, config) {
            warn!(registered = snapshot.len(), "project creation denied");
            return Err(GatewayError::PolicyDenied(UPGRADE_MESSAGE.to_string()));
        }

        let engine = self.engines.create(EngineDeps {
            tenant_id: config.id.clone(),
            cluster_id: self.cluster_id.clone(),
            node_id: self.node_id.clone(),
            managers: self.managers.clone(),
        })?;
        let module = Arc::new(Module::new(
            config.id.clone(),
            engine,
            self.managers.clone(),
            self.globals.clone(),
        ));
        blocks.insert(config.id.clone(), module.clone());

        info!("project module created");
        Ok(module)
    }

    async fn load_or_create(&self, config: &ProjectConfig) -> GatewayResult<Arc<Module>> {
        match self.load_module(&config.id).await {
            Err(err) if err.is_not_found() => self.new_module(config).await,
            other => other,
        }
    }

    /// Bring up every project of the startup configuration.
    ///
    /// A project that cannot be created aborts the call; projects before it
    /// stay applied.  Facet failures are logged and reported, never fatal.
    pub async fn set_initial_config(
        &self,
        ctx: &CallContext,
        projects: &[Project],
    ) -> GatewayResult<InitialLoadReport> {
        let mut load = InitialLoadReport::default();
        for project in projects {
            let module = self.load_or_create(&project.config).await.inspect_err(|err| {
                error!(tenant = %project.id(), error = %err, "unable to create project module");
            })?;
            load.reports.push(module.apply_initial_config(ctx, project).await?);
        }
        info!(
            projects = projects.len(),
            failed = load.failed().count(),
            "initial project config loaded"
        );
        Ok(load)
    }

    /// Single-tenant initial load: best-effort apply, failures aggregated
    /// into one error.
    pub async fn load_or_create_and_configure(
        &self,
        ctx: &CallContext,
        project: &Project,
    ) -> GatewayResult<()> {
        let module = self.load_or_create(&project.config).await?;
        module.apply_initial_config(ctx, project).await?.into_result()
    }

    /// Incremental update of the project settings; creates the module first
    /// if needed.
    pub async fn set_project_config(&self, config: &ProjectConfig) -> GatewayResult<()> {
        self.load_or_create(config).await?.apply_config(config)
    }

    pub async fn set_letsencrypt_config(
        &self,
        tenant: &str,
        config: &LetsEncrypt,
    ) -> GatewayResult<()> {
        self.load_module(tenant).await?.set_letsencrypt_config(config)
    }

    pub async fn set_ingress_route_config(
        &self,
        tenant: &str,
        routes: &[IngressRoute],
    ) -> GatewayResult<()> {
        self.load_module(tenant)
            .await?
            .set_ingress_route_config(routes)
            .await
    }

    pub async fn set_ingress_global_route_config(
        &self,
        tenant: &str,
        config: &GlobalRoutesConfig,
    ) -> GatewayResult<()> {
        self.load_module(tenant)
            .await?
            .set_ingress_global_route_config(config);
        Ok(())
    }

    /// Remove `tenant`.
    ///
    /// Under the exclusive lock: close the engine (if a module exists), drop
    /// the tenant's domains, purge the cached results of its routes, drop
    /// the routes and cache rules (even without a module), then remove the
    /// entry.  The purge runs while the route ids are still owned, so it
    /// never reaches a tenant that claims them afterwards.  Deleting an
    /// unknown tenant is a no-op.
    #[instrument(skip(self))]
    pub async fn delete(&self, tenant: &str) -> GatewayResult<()> {
        let mut blocks = self.blocks.write().await;
        if let Some(module) = blocks.get(tenant) {
            module.close();
        }

        let result = self.globals.letsencrypt().delete_project_domains(tenant);
        if let Err(err) = &result {
            error!(error = %err, "unable to delete letsencrypt domains");
        }

        for route in self.globals.routing().project_routes(tenant) {
            if let Err(err) = self.globals.caching().purge_route(&route.id).await {
                warn!(route = %route.id, error = %err, "unable to purge cache of deleted route");
            }
        }
        self.globals.routing().delete_project_routes(tenant);
        self.globals.caching().delete_project_rules(tenant);

        if blocks.remove(tenant).is_some() {
            info!("project module deleted");
        }
        result
    }

    /// The tenant's authorization engine.
    pub async fn auth(&self, tenant: &str) -> GatewayResult<Arc<dyn AuthorizationEngine>> {
        Ok(self.load_module(tenant).await?.auth().clone())
    }

    pub async fn letsencrypt_domains(&self, tenant: &str) -> GatewayResult<Vec<String>> {
        Ok(self.load_module(tenant).await?.letsencrypt_domains())
    }

    pub async fn ingress_routes(&self, tenant: &str) -> GatewayResult<Vec<IngressRoute>> {
        Ok(self.load_module(tenant).await?.ingress_routes())
    }

    pub async fn global_route_config(&self, tenant: &str) -> GatewayResult<GlobalRoutesConfig> {
        Ok(self.load_module(tenant).await?.global_route_config())
    }

    /// Authorize a request of `params.tenant_id`.
    pub async fn authorize(
        &self,
        ctx: &CallContext,
        params: &RequestParams,
    ) -> GatewayResult<AuthOutcome> {
        let module = self.load_module(&params.tenant_id).await?;
        module.authorize(ctx, params).await
    }

    /// Purge cached route results of `tenant`.  Only routes the tenant owns
    /// are reachable.  Returns the number of entries removed.
    #[instrument(skip(self, request), fields(route = ?request.id))]
    pub async fn purge_cache(&self, tenant: &str, request: &PurgeRequest) -> GatewayResult<usize> {
        let kind = ResourceKind::IngressRoute.as_str();
        if let Some(resource) = request.resource.as_deref().filter(|r| *r != kind) {
            return Err(GatewayError::InvalidRequest(format!(
                "resource ({resource}) is not cached"
            )));
        }

        let routes = self.load_module(tenant).await?.ingress_routes();
        let targets: Vec<&str> = match request.id.as_deref() {
            Some(id) if routes.iter().any(|r| r.id == id) => vec![id],
            Some(id) => {
                return Err(GatewayError::InvalidRequest(format!(
                    "route ({id}) does not belong to project ({tenant})"
                )));
            }
            None => routes.iter().map(|r| r.id.as_str()).collect(),
        };

        let mut removed = 0;
        for route in targets {
            removed += self.globals.caching().purge_route(route).await?;
        }
        info!(removed, "project cache purged");
        Ok(removed)
    }

    /// Purge every cached route result of the cluster.
    pub async fn purge_cluster(&self) -> GatewayResult<usize> {
        self.globals.caching().purge_cluster().await
    }
}
