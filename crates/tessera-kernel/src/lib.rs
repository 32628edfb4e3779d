//! `tessera-kernel`: contracts of the Tessera multi-tenant gateway core.
//!
//! Nothing in this crate talks to the network or owns tenant state.  It
//! defines the types and traits that the runtime (`tessera-gateway`) wires
//! together:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                 tessera-kernel  (this crate)                     │
//! │  Project / ProjectConfig     RequestParams / CallContext         │
//! │  AuthHookResponse + IntegrationHook / IntegrationProvider        │
//! │  AdminManager / SyncManager  AuthorizationEngine / EngineFactory │
//! │  DomainTracker / RouteTable / CacheInvalidation  (global mods)   │
//! │  cache key namespace + CacheStore                                │
//! └───────────────────────────────┬──────────────────────────────────┘
//!                                 │  depends on
//! ┌───────────────────────────────▼──────────────────────────────────┐
//! │                 tessera-gateway  (runtime crate)                 │
//! │  Modules registry, per-tenant Module, hook chain, HTTP hooks,    │
//! │  in-memory global modules, axum admin server                     │
//! └──────────────────────────────────────────────────────────────────┘
//! ```

pub mod cache;
pub mod context;
pub mod engine;
pub mod error;
pub mod global;
pub mod hook;
pub mod manager;
pub mod project;

#[cfg(feature = "settings")]
pub mod settings;

// ── Flat re-exports ────────────────────────────────────────────────────────

pub use context::{CallContext, RequestParams};
pub use engine::{AuthDecision, AuthorizationEngine, EngineDeps, EngineFactory};
pub use error::{Facet, FacetFailure, GatewayError, GatewayResult};
pub use global::{CacheInvalidation, DomainTracker, GlobalModules, RouteTable};
pub use hook::{
    AuthHookResponse, HookConfig, HookError, HookPayload, IntegrationHook, IntegrationProvider,
};
pub use manager::{AdminManager, Managers, SyncManager};
pub use project::{
    AuthConfig, DatabaseCacheRules, DbCacheRule, GlobalRoutesConfig, HeaderOp, HeaderOpKind,
    IngressRoute, LetsEncrypt, Project, ProjectConfig, RouteCacheConfig, RouteSource, RouteTarget,
    Rule,
};

/// Identifier of a tenant (project).  Opaque to the core; used as the registry
/// key and as the tag on every call into a global module.
pub type TenantId = String;
