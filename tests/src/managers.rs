use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tessera_kernel::{
    AdminManager, CallContext, GatewayError, GatewayResult, ProjectConfig, RequestParams,
    SyncManager, TenantId,
};

/// Admin manager with a project limit that records every creation check.
pub struct FakeAdmin {
    limit: usize,
    /// Snapshot handed to each `validate_creation` call.
    pub snapshots: Mutex<Vec<Vec<TenantId>>>,
    checks: AtomicUsize,
    /// Blocking delay inside the policy check, to widen race windows.
    check_delay: Option<Duration>,
}

impl FakeAdmin {
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            snapshots: Mutex::new(Vec::new()),
            checks: AtomicUsize::new(0),
            check_delay: None,
        }
    }

    pub fn with_check_delay(mut self, delay: Duration) -> Self {
        self.check_delay = Some(delay);
        self
    }

    pub fn check_count(&self) -> usize {
        self.checks.load(Ordering::SeqCst)
    }
}

impl AdminManager for FakeAdmin {
    fn validate_creation(&self, current: &[TenantId], requested: &ProjectConfig) -> bool {
        self.checks.fetch_add(1, Ordering::SeqCst);
        self.snapshots.lock().push(current.to_vec());
        if let Some(delay) = self.check_delay {
            std::thread::sleep(delay);
        }
        current.iter().any(|id| *id == requested.id) || current.len() < self.limit
    }

    fn issue_internal_token(&self) -> GatewayResult<String> {
        Ok("internal-token".to_string())
    }

    fn validate_token(
        &self,
        token: &str,
        resource: &str,
        op: &str,
        attributes: &HashMap<String, String>,
    ) -> GatewayResult<RequestParams> {
        if token != "admin" {
            return Err(GatewayError::Unauthorized("bad token".into()));
        }
        let mut params = RequestParams::new(
            attributes.get("project").cloned().unwrap_or_default(),
            resource,
            op,
        );
        params.attributes = attributes.clone();
        Ok(params)
    }
}

/// Sync manager that never leaves the process; replies with `reply`.
#[derive(Default)]
pub struct NoopSync {
    pub reply: Value,
    calls: AtomicUsize,
}

impl NoopSync {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SyncManager for NoopSync {
    async fn make_http_request(
        &self,
        _ctx: &CallContext,
        _url: &str,
        _token: &str,
        _body: &Value,
    ) -> GatewayResult<Value> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.reply.clone())
    }
}
