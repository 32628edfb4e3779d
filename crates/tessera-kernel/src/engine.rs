//! Per-tenant authorization engine contract.
//!
//! The rule evaluator itself lives outside the core; the registry only needs
//! to construct one engine per tenant, push configuration into it, ask it for
//! decisions and release it on deletion.

use crate::context::{CallContext, RequestParams};
use crate::error::GatewayResult;
use crate::manager::Managers;
use crate::project::{Project, ProjectConfig};
use async_trait::async_trait;
use std::sync::Arc;

/// Decision produced by an engine for one request.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthDecision {
    /// Allowed; `claims` are handed to downstream modules.
    Allow {
        claims: serde_json::Map<String, serde_json::Value>,
    },
    Deny {
        reason: String,
    },
}

impl AuthDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, AuthDecision::Allow { .. })
    }
}

/// Authorization engine owned by exactly one tenant module.
#[async_trait]
pub trait AuthorizationEngine: Send + Sync {
    /// Load the full tenant configuration (initial load).
    fn set_config(&self, ctx: &CallContext, project: &Project) -> GatewayResult<()>;

    /// Replace only the project-level settings (incremental update).
    fn set_project_config(&self, config: &ProjectConfig) -> GatewayResult<()>;

    /// Release internal state.  Must be safe on a never-configured engine
    /// and when called more than once.
    fn close_config(&self);

    /// Evaluate one request.
    async fn authorize(
        &self,
        ctx: &CallContext,
        params: &RequestParams,
    ) -> GatewayResult<AuthDecision>;
}

impl std::fmt::Debug for dyn AuthorizationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("dyn AuthorizationEngine")
    }
}

/// Everything an engine may depend on, passed explicitly at construction.
#[derive(Clone)]
pub struct EngineDeps {
    pub tenant_id: String,
    pub cluster_id: String,
    pub node_id: String,
    pub managers: Managers,
}

/// Builds engines for newly created tenant modules.
///
/// Called while the registry holds its exclusive lock, so implementations
/// must stay local and non-blocking.
pub trait EngineFactory: Send + Sync {
    fn create(&self, deps: EngineDeps) -> GatewayResult<Arc<dyn AuthorizationEngine>>;
}
