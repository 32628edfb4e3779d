//! Integration manager: registered hooks and their dispatch.

mod chain;
mod http;

pub use chain::{ChainOutcome, HookChain};
pub use http::HttpHook;

use async_trait::async_trait;
use parking_lot::RwLock;
use reqwest::Client;
use std::collections::HashSet;
use std::sync::Arc;
use tessera_kernel::{
    AdminManager, AuthHookResponse, CallContext, GatewayError, GatewayResult, HookConfig,
    IntegrationHook, IntegrationProvider, RequestParams,
};
use tracing::info;

/// [`IntegrationProvider`] holding the active [`HookChain`].
///
/// The chain is swapped atomically: a request in flight keeps running the
/// chain it started with.
pub struct IntegrationManager {
    chain: RwLock<Arc<HookChain>>,
    admin: Arc<dyn AdminManager>,
    client: Client,
}

impl IntegrationManager {
    pub fn new(admin: Arc<dyn AdminManager>) -> Self {
        Self {
            chain: RwLock::new(Arc::new(HookChain::default())),
            admin,
            client: Client::new(),
        }
    }

    /// Replace the chain with already-built hooks.
    pub fn set_hooks(&self, hooks: Vec<Arc<dyn IntegrationHook>>) {
        *self.chain.write() = Arc::new(HookChain::new(hooks));
    }

    /// The chain currently in effect.
    pub fn chain(&self) -> Arc<HookChain> {
        self.chain.read().clone()
    }

    /// Run the active chain, keeping the skipped hooks.
    pub async fn invoke_chain(&self, ctx: &CallContext, params: &RequestParams) -> ChainOutcome {
        let chain = self.chain();
        chain.run(ctx, params).await
    }
}

fn validate_hooks(hooks: &[HookConfig]) -> GatewayResult<()> {
    let mut seen = HashSet::with_capacity(hooks.len());
    for hook in hooks {
        if hook.id.is_empty() || hook.integration.is_empty() {
            return Err(GatewayError::InvalidRequest(
                "hook id and integration must not be empty".to_string(),
            ));
        }
        if !hook.url.starts_with("http://") && !hook.url.starts_with("https://") {
            return Err(GatewayError::InvalidRequest(format!(
                "hook ({}) url ({}) must be http(s)",
                hook.id, hook.url
            )));
        }
        if !seen.insert((hook.integration.as_str(), hook.id.as_str())) {
            return Err(GatewayError::InvalidRequest(format!(
                "duplicate hook ({}) for integration ({})",
                hook.id, hook.integration
            )));
        }
    }
    Ok(())
}

#[async_trait]
impl IntegrationProvider for IntegrationManager {
    async fn invoke_hook(&self, ctx: &CallContext, params: &RequestParams) -> AuthHookResponse {
        self.invoke_chain(ctx, params).await.response
    }

    fn set_hook_config(&self, hooks: Vec<HookConfig>) -> GatewayResult<()> {
        validate_hooks(&hooks)?;
        let count = hooks.len();
        let built: Vec<Arc<dyn IntegrationHook>> = hooks
            .into_iter()
            .map(|config| {
                Arc::new(HttpHook::new(config, self.client.clone(), self.admin.clone()))
                    as Arc<dyn IntegrationHook>
            })
            .collect();
        self.set_hooks(built);
        info!(count, "integration hooks configured");
        Ok(())
    }
}
