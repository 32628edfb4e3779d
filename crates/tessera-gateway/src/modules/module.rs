//! Per-tenant module.
//!
//! A [`Module`] owns the tenant's authorization engine and fans every
//! configuration push out to it and to the shared global modules, tagging
//! each call with the tenant id.

use std::fmt;
use std::sync::Arc;
use tessera_kernel::{
    AuthDecision, AuthHookResponse, AuthorizationEngine, CallContext, Facet, FacetFailure,
    GatewayError, GatewayResult, GlobalModules, GlobalRoutesConfig, IngressRoute, LetsEncrypt,
    Managers, Project, ProjectConfig, RequestParams, TenantId,
};
use tracing::{debug, error};

/// Facets of a full configuration push, in the order they are applied.
pub const APPLY_ORDER: [Facet; 5] = [
    Facet::Auth,
    Facet::LetsEncrypt,
    Facet::IngressRoutes,
    Facet::IngressGlobal,
    Facet::CacheRules,
];

/// How a full configuration push treats a failing facet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyMode {
    /// Record the failure and carry on with the remaining facets.  Used for
    /// the initial load, so that a tenant comes up even with one bad facet.
    BestEffort,
    /// Stop at the first failure and return it.
    Strict,
}

/// Facet failures collected by a best-effort apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyReport {
    tenant: TenantId,
    failures: Vec<FacetFailure>,
}

impl ApplyReport {
    fn new(tenant: &str) -> Self {
        Self {
            tenant: tenant.to_string(),
            failures: Vec::new(),
        }
    }

    pub fn tenant(&self) -> &str {
        &self.tenant
    }

    pub fn failures(&self) -> &[FacetFailure] {
        &self.failures
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// `Err(ConfigurationFailures)` when any facet failed.
    pub fn into_result(self) -> GatewayResult<()> {
        if self.failures.is_empty() {
            Ok(())
        } else {
            Err(GatewayError::ConfigurationFailures {
                tenant: self.tenant,
                failures: self.failures,
            })
        }
    }
}

/// Outcome of authorizing one request.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthOutcome {
    /// An integration hijacked the request; its result stands in for the
    /// engine's.
    Integration(AuthHookResponse),
    /// No integration took over; the engine decided.
    Engine(AuthDecision),
}

impl AuthOutcome {
    pub fn is_allowed(&self) -> bool {
        match self {
            AuthOutcome::Integration(_) => true,
            AuthOutcome::Engine(decision) => decision.is_allowed(),
        }
    }
}

pub struct Module {
    tenant_id: TenantId,
    auth: Arc<dyn AuthorizationEngine>,
    managers: Managers,
    globals: GlobalModules,
}

impl fmt::Debug for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Module")
            .field("tenant_id", &self.tenant_id)
            .finish_non_exhaustive()
    }
}

impl Module {
    pub fn new(
        tenant_id: impl Into<TenantId>,
        auth: Arc<dyn AuthorizationEngine>,
        managers: Managers,
        globals: GlobalModules,
    ) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            auth,
            managers,
            globals,
        }
    }

    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    /// The tenant's authorization engine.
    pub fn auth(&self) -> &Arc<dyn AuthorizationEngine> {
        &self.auth
    }

    /// Push every facet of `project`, in [`APPLY_ORDER`].
    ///
    /// In [`ApplyMode::Strict`] the first failure is returned as is.  In
    /// [`ApplyMode::BestEffort`] failures are logged and collected; the call
    /// itself then always succeeds.
    pub async fn apply(
        &self,
        ctx: &CallContext,
        project: &Project,
        mode: ApplyMode,
    ) -> GatewayResult<ApplyReport> {
        let mut report = ApplyReport::new(&self.tenant_id);

        for facet in APPLY_ORDER {
            let Err(err) = self.apply_facet(ctx, project, facet).await else {
                continue;
            };
            if mode == ApplyMode::Strict {
                return Err(err);
            }
            error!(
                tenant = %self.tenant_id,
                request_id = %ctx.request_id,
                facet = %facet,
                error = %err,
                "unable to apply config facet"
            );
            report.failures.push(FacetFailure {
                facet,
                message: facet_message(err),
            });
        }

        debug!(tenant = %self.tenant_id, failed = report.failures.len(), "project config applied");
        Ok(report)
    }

    /// Best-effort push of a full configuration (initial load).
    pub async fn apply_initial_config(
        &self,
        ctx: &CallContext,
        project: &Project,
    ) -> GatewayResult<ApplyReport> {
        self.apply(ctx, project, ApplyMode::BestEffort).await
    }

    /// Incremental update of the project-level settings.
    pub fn apply_config(&self, config: &ProjectConfig) -> GatewayResult<()> {
        self.auth.set_project_config(config)
    }

    pub fn set_letsencrypt_config(&self, config: &LetsEncrypt) -> GatewayResult<()> {
        self.globals
            .letsencrypt()
            .set_project_domains(&self.tenant_id, config)
    }

    /// Replace the tenant's routes.
    ///
    /// Cached results of routes that disappear are purged first, while the
    /// tenant still owns their ids.  Another tenant can only claim an id once
    /// nothing is cached under it.  A failed purge keeps the old routes.
    pub async fn set_ingress_route_config(&self, routes: &[IngressRoute]) -> GatewayResult<()> {
        let routing = self.globals.routing();
        let dropped: Vec<String> = routing
            .project_routes(&self.tenant_id)
            .into_iter()
            .map(|route| route.id)
            .filter(|id| !routes.iter().any(|route| route.id == *id))
            .collect();

        for id in &dropped {
            self.globals.caching().purge_route(id).await.map_err(|err| {
                GatewayError::configuration(
                    &self.tenant_id,
                    Facet::IngressRoutes,
                    format!("unable to purge cache of dropped route ({id}): {err}"),
                )
            })?;
        }
        if !dropped.is_empty() {
            debug!(tenant = %self.tenant_id, dropped = dropped.len(), "dropped routes purged");
        }

        routing.set_project_routes(&self.tenant_id, routes)
    }

    pub fn set_ingress_global_route_config(&self, config: &GlobalRoutesConfig) {
        self.globals
            .routing()
            .set_global_config(&self.tenant_id, config);
    }

    pub fn letsencrypt_domains(&self) -> Vec<String> {
        self.globals.letsencrypt().project_domains(&self.tenant_id)
    }

    pub fn ingress_routes(&self) -> Vec<IngressRoute> {
        self.globals.routing().project_routes(&self.tenant_id)
    }

    pub fn global_route_config(&self) -> GlobalRoutesConfig {
        self.globals.routing().global_config(&self.tenant_id)
    }

    /// Release the engine's state.  Safe on a never-configured engine and
    /// when called repeatedly.
    pub fn close(&self) {
        self.auth.close_config();
    }

    /// Authorize one request: integration hooks first, then the engine.
    ///
    /// A hook that hijacks with an error rejects the request with the hook's
    /// status; one that hijacks cleanly decides it.
    pub async fn authorize(
        &self,
        ctx: &CallContext,
        params: &RequestParams,
    ) -> GatewayResult<AuthOutcome> {
        let hook = self.managers.integration().invoke_hook(ctx, params).await;
        if hook.is_hijacked() {
            if let Some(err) = hook.error() {
                return Err(GatewayError::HookFailure {
                    integration: hook.integration().to_string(),
                    hook: hook.hook().to_string(),
                    status: hook.status(),
                    message: err.to_string(),
                });
            }
            return Ok(AuthOutcome::Integration(hook));
        }

        let decision = self.auth.authorize(ctx, params).await?;
        Ok(AuthOutcome::Engine(decision))
    }

    async fn apply_facet(
        &self,
        ctx: &CallContext,
        project: &Project,
        facet: Facet,
    ) -> GatewayResult<()> {
        match facet {
            Facet::Auth => self.auth.set_config(ctx, project),
            Facet::LetsEncrypt => self.set_letsencrypt_config(&project.letsencrypt),
            Facet::IngressRoutes => {
                self.set_ingress_route_config(&project.ingress_routes)
                    .await
            }
            Facet::IngressGlobal => {
                self.set_ingress_global_route_config(&project.ingress_global);
                Ok(())
            }
            Facet::CacheRules => {
                self.globals
                    .caching()
                    .add_db_rules(&self.tenant_id, &project.database_rules);
                Ok(())
            }
        }
    }
}

fn facet_message(err: GatewayError) -> String {
    match err {
        GatewayError::Configuration { message, .. } => message,
        other => other.to_string(),
    }
}
