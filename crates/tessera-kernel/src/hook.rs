//! Authorization-hook interception protocol.
//!
//! Before a tenant's own [`AuthorizationEngine`](crate::engine::AuthorizationEngine)
//! evaluates a request, every registered integration hook is asked whether it
//! wants to take over ("hijack") the decision.  The first hook that hijacks is
//! authoritative:
//!
//! ```text
//! hook #1 ──not hijacked──► hook #2 ──not hijacked──► … ──► engine
//!    │                         │
//!    └─ hijacked ─► error? ─yes─► reject with hook status (503 if unset)
//!                          └no──► hook result replaces the engine outcome
//! ```
//!
//! The chain short-circuits; results are never merged.

use crate::context::{CallContext, RequestParams};
use crate::error::GatewayResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Status reported for a hijacking hook that failed without declaring one.
pub const DEFAULT_HOOK_STATUS: u16 = 503;

/// Failure reported by, or on behalf of, an integration hook.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum HookError {
    /// The integration answered and reported an error.
    #[error("integration error: {0}")]
    Integration(String),

    /// The hook did not answer before the caller's deadline.
    #[error("hook did not respond before the deadline")]
    DeadlineExceeded,

    /// The hook could not be reached or answered garbage.
    #[error("hook transport error: {0}")]
    Transport(String),
}

/// Integration-supplied result.  The core passes it through untouched; only
/// the transport layer downstream interprets it.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum HookPayload {
    #[default]
    Empty,
    Json(serde_json::Value),
    Raw {
        content_type: String,
        body: Vec<u8>,
    },
}

/// Outcome of asking one integration (or a chain of them) about a request.
///
/// Constructed fresh per request; fields are read-only once returned.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthHookResponse {
    hijacked: bool,
    error: Option<HookError>,
    status: u16,
    result: HookPayload,
    integration: String,
    hook: String,
}

impl AuthHookResponse {
    /// The hook declines; the next hook (or the engine) decides.
    pub fn not_hijacked() -> Self {
        Self::default()
    }

    /// The hook takes over and supplies the result.
    pub fn hijacked(result: HookPayload) -> Self {
        Self {
            hijacked: true,
            result,
            ..Self::default()
        }
    }

    /// The hook takes over and rejects the request.  A `status` of `0` means
    /// "unset" and reads back as [`DEFAULT_HOOK_STATUS`].
    pub fn failed(error: HookError, status: u16) -> Self {
        Self {
            hijacked: true,
            error: Some(error),
            status,
            ..Self::default()
        }
    }

    /// The hook could not take part (e.g. deadline elapsed).  Not a hijack,
    /// but the error is kept for the caller's records.
    pub fn skipped(error: HookError) -> Self {
        Self {
            error: Some(error),
            ..Self::default()
        }
    }

    /// Tag the response with the integration and hook that produced it.
    #[must_use]
    pub fn from_hook(mut self, integration: impl Into<String>, hook: impl Into<String>) -> Self {
        self.integration = integration.into();
        self.hook = hook.into();
        self
    }

    /// Builder: explicit status for a successful hijack.
    #[must_use]
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    /// Whether the integration claims sole authority over this request.
    pub fn is_hijacked(&self) -> bool {
        self.hijacked
    }

    pub fn error(&self) -> Option<&HookError> {
        self.error.as_ref()
    }

    /// Declared status, or `503` when the hook left it unset.
    pub fn status(&self) -> u16 {
        if self.status == 0 {
            DEFAULT_HOOK_STATUS
        } else {
            self.status
        }
    }

    /// Status exactly as the hook declared it; `None` when unset.
    pub fn declared_status(&self) -> Option<u16> {
        (self.status != 0).then_some(self.status)
    }

    pub fn result(&self) -> &HookPayload {
        &self.result
    }

    pub fn into_result(self) -> HookPayload {
        self.result
    }

    pub fn integration(&self) -> &str {
        &self.integration
    }

    pub fn hook(&self) -> &str {
        &self.hook
    }
}

fn default_hook_resource() -> String {
    "*".to_string()
}

/// Registration of one integration hook.  `resource` and `operations` form
/// the trigger condition; a hook whose trigger does not match a request is
/// never contacted for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HookConfig {
    pub id: String,
    /// Name of the integration that owns the hook.
    pub integration: String,
    /// Resource the hook intercepts; `*` intercepts all.
    #[serde(default = "default_hook_resource")]
    pub resource: String,
    /// Operations the hook intercepts; empty intercepts all.
    #[serde(default)]
    pub operations: Vec<String>,
    /// Endpoint invoked with the request parameters.
    pub url: String,
    /// Per-hook timeout in milliseconds; `0` relies on the caller's deadline.
    #[serde(default)]
    pub timeout_ms: u64,
}

impl HookConfig {
    pub fn new(
        id: impl Into<String>,
        integration: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            integration: integration.into(),
            resource: default_hook_resource(),
            operations: Vec::new(),
            url: url.into(),
            timeout_ms: 0,
        }
    }

    pub fn for_resource(mut self, resource: impl Into<String>) -> Self {
        self.resource = resource.into();
        self
    }

    pub fn for_operations(mut self, ops: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.operations = ops.into_iter().map(Into::into).collect();
        self
    }

    /// Whether this hook's trigger covers `params`.
    pub fn matches(&self, params: &RequestParams) -> bool {
        (self.resource == "*" || self.resource == params.resource)
            && (self.operations.is_empty() || self.operations.iter().any(|op| op == &params.op))
    }
}

/// A single hook in the chain.
#[async_trait]
pub trait IntegrationHook: Send + Sync {
    /// Integration that owns this hook (used in logs and responses).
    fn integration(&self) -> &str;

    /// Hook id, unique within the integration.
    fn id(&self) -> &str;

    /// Ask the integration about one request.  Implementations never return
    /// an error: failures are expressed through the response itself.
    async fn invoke(&self, ctx: &CallContext, params: &RequestParams) -> AuthHookResponse;
}

/// Contract of the integration manager consulted by every tenant module.
#[async_trait]
pub trait IntegrationProvider: Send + Sync {
    /// Run the registered hooks for `params` and return the authoritative
    /// response, or [`AuthHookResponse::not_hijacked`] when no hook took over.
    async fn invoke_hook(&self, ctx: &CallContext, params: &RequestParams) -> AuthHookResponse;

    /// Replace the registered hooks.
    fn set_hook_config(&self, hooks: Vec<HookConfig>) -> GatewayResult<()>;
}
