//! Integration hook reached over HTTP.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tessera_kernel::{
    AdminManager, AuthHookResponse, CallContext, HookConfig, HookError, HookPayload,
    IntegrationHook, RequestParams,
};
use tracing::{debug, instrument};

/// Reply expected from an integration endpoint.
#[derive(Debug, Default, Deserialize)]
struct HookReply {
    #[serde(default)]
    hijack: bool,
    #[serde(default)]
    status: u16,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    result: Value,
}

impl HookReply {
    fn into_response(self) -> AuthHookResponse {
        if !self.hijack {
            return AuthHookResponse::not_hijacked();
        }
        match self.error.filter(|e| !e.is_empty()) {
            Some(error) => AuthHookResponse::failed(HookError::Integration(error), self.status),
            None => {
                let payload = match self.result {
                    Value::Null => HookPayload::Empty,
                    other => HookPayload::Json(other),
                };
                AuthHookResponse::hijacked(payload).with_status(self.status)
            }
        }
    }
}

/// Posts the request parameters to an integration and maps its reply.
///
/// Requests outside the hook's trigger are answered locally as not hijacked.
/// Transport failures fail closed: the hook hijacks with a `503`.
pub struct HttpHook {
    config: HookConfig,
    client: Client,
    admin: Arc<dyn AdminManager>,
}

impl HttpHook {
    pub fn new(config: HookConfig, client: Client, admin: Arc<dyn AdminManager>) -> Self {
        Self {
            config,
            client,
            admin,
        }
    }

    pub fn config(&self) -> &HookConfig {
        &self.config
    }

    async fn call(&self, params: &RequestParams) -> Result<HookReply, HookError> {
        let token = self
            .admin
            .issue_internal_token()
            .map_err(|e| HookError::Transport(e.to_string()))?;

        let mut req = self.client.post(&self.config.url).bearer_auth(token).json(params);
        if self.config.timeout_ms > 0 {
            req = req.timeout(Duration::from_millis(self.config.timeout_ms));
        }

        let resp = req
            .send()
            .await
            .map_err(|e| HookError::Transport(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(HookError::Transport(format!(
                "integration responded with {status}"
            )));
        }
        resp.json::<HookReply>()
            .await
            .map_err(|e| HookError::Transport(format!("invalid hook reply: {e}")))
    }
}

#[async_trait]
impl IntegrationHook for HttpHook {
    fn integration(&self) -> &str {
        &self.config.integration
    }

    fn id(&self) -> &str {
        &self.config.id
    }

    #[instrument(skip_all, fields(integration = %self.config.integration, hook = %self.config.id))]
    async fn invoke(&self, ctx: &CallContext, params: &RequestParams) -> AuthHookResponse {
        if !self.config.matches(params) {
            return AuthHookResponse::not_hijacked();
        }
        debug!(request_id = %ctx.request_id, url = %self.config.url, "invoking hook");

        match self.call(params).await {
            Ok(reply) => reply.into_response(),
            Err(err) => AuthHookResponse::failed(err, 0),
        }
    }
}
