//! Ordered hook dispatch.
//!
//! Hooks run one at a time in registration order.  The first hook that
//! hijacks decides and nothing after it runs.  Each call is bounded by the
//! caller's deadline; a hook that does not answer in time counts as not
//! hijacking and the chain moves on.

use std::sync::Arc;
use tessera_kernel::{AuthHookResponse, CallContext, HookError, IntegrationHook, RequestParams};
use tracing::{debug, warn};

/// Result of running a chain for one request.
#[derive(Debug, Clone, Default)]
pub struct ChainOutcome {
    /// Authoritative response, or a not-hijacked one when no hook took over.
    pub response: AuthHookResponse,
    /// Hooks that declined with an error, e.g. deadline elapsed.
    pub skipped: Vec<AuthHookResponse>,
}

/// Ordered list of integration hooks.
#[derive(Clone, Default)]
pub struct HookChain {
    hooks: Vec<Arc<dyn IntegrationHook>>,
}

impl HookChain {
    pub fn new(hooks: Vec<Arc<dyn IntegrationHook>>) -> Self {
        Self { hooks }
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    /// Run the hooks for `params`.
    pub async fn run(&self, ctx: &CallContext, params: &RequestParams) -> ChainOutcome {
        let mut outcome = ChainOutcome::default();

        for hook in &self.hooks {
            let response = invoke_bounded(hook.as_ref(), ctx, params)
                .await
                .from_hook(hook.integration(), hook.id());

            if response.is_hijacked() {
                debug!(
                    request_id = %ctx.request_id,
                    integration = %response.integration(),
                    hook = %response.hook(),
                    failed = response.error().is_some(),
                    "integration hijacked the request"
                );
                outcome.response = response;
                return outcome;
            }

            if let Some(err) = response.error() {
                warn!(
                    request_id = %ctx.request_id,
                    integration = %response.integration(),
                    hook = %response.hook(),
                    error = %err,
                    "integration hook skipped"
                );
                outcome.skipped.push(response);
            }
        }

        outcome
    }
}

async fn invoke_bounded(
    hook: &dyn IntegrationHook,
    ctx: &CallContext,
    params: &RequestParams,
) -> AuthHookResponse {
    match ctx.remaining() {
        None => hook.invoke(ctx, params).await,
        Some(left) if left.is_zero() => AuthHookResponse::skipped(HookError::DeadlineExceeded),
        Some(left) => tokio::time::timeout(left, hook.invoke(ctx, params))
            .await
            .unwrap_or_else(|_| AuthHookResponse::skipped(HookError::DeadlineExceeded)),
    }
}
