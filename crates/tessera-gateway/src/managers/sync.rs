//! Outbound HTTP helper of the sync manager.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tessera_kernel::{CallContext, GatewayError, GatewayResult, SyncManager};
use tracing::{debug, instrument};

/// [`SyncManager`] issuing JSON POSTs with `reqwest`.
///
/// Each request is bounded by the caller's deadline, or by the default
/// timeout when the context is unbounded.
pub struct HttpSyncManager {
    client: Client,
    default_timeout: Duration,
}

impl HttpSyncManager {
    pub fn new(default_timeout: Duration) -> Self {
        Self::with_client(Client::new(), default_timeout)
    }

    pub fn with_client(client: Client, default_timeout: Duration) -> Self {
        Self {
            client,
            default_timeout,
        }
    }
}

#[async_trait]
impl SyncManager for HttpSyncManager {
    #[instrument(skip(self, ctx, token, body), fields(request_id = %ctx.request_id))]
    async fn make_http_request(
        &self,
        ctx: &CallContext,
        url: &str,
        token: &str,
        body: &Value,
    ) -> GatewayResult<Value> {
        let timeout = ctx.remaining().unwrap_or(self.default_timeout);
        if timeout.is_zero() {
            return Err(GatewayError::Internal(format!(
                "deadline exceeded before calling {url}"
            )));
        }

        let resp = self
            .client
            .post(url)
            .bearer_auth(token)
            .timeout(timeout)
            .json(body)
            .send()
            .await
            .map_err(|e| GatewayError::Internal(format!("request to {url} failed: {e}")))?;

        let status = resp.status();
        debug!(status = status.as_u16(), "sync request answered");
        if !status.is_success() {
            return Err(GatewayError::Internal(format!(
                "{url} responded with {status}"
            )));
        }

        let bytes = resp
            .bytes()
            .await
            .map_err(|e| GatewayError::Internal(format!("reading reply from {url}: {e}")))?;
        if bytes.is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_slice(&bytes)
            .map_err(|e| GatewayError::Internal(format!("decoding reply from {url}: {e}")))
    }
}
