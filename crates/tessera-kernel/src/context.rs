//! Per-call context and request parameters.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;

/// Deadline-bearing context passed through every configuration and
/// hook-invocation call.
#[derive(Debug, Clone)]
pub struct CallContext {
    /// Correlation id for logs.
    pub request_id: String,
    deadline: Option<Instant>,
}

impl CallContext {
    /// Context without a deadline.
    pub fn new(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            deadline: None,
        }
    }

    /// Context with a freshly generated request id and no deadline.
    pub fn background() -> Self {
        Self::new(uuid::Uuid::new_v4().to_string())
    }

    /// Builder: the call must finish within `timeout` from now.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.deadline = Some(Instant::now() + timeout);
        self
    }

    /// Builder: set an absolute deadline.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left before the deadline; `None` when unbounded.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    pub fn is_expired(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }
}

/// Parameters of one request as seen by the authorization layer.
///
/// This is what hooks receive and what the engine evaluates.  It is
/// serialisable because HTTP hooks forward it verbatim to the integration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestParams {
    #[serde(default)]
    pub request_id: String,
    /// Tenant the request belongs to.
    pub tenant_id: String,
    /// Resource being accessed, e.g. `db-read` or `file-create`.
    pub resource: String,
    /// Operation on the resource, e.g. `read`, `modify`.
    pub op: String,
    #[serde(default)]
    pub attributes: HashMap<String, String>,
    /// Claims extracted from the caller's token.
    #[serde(default)]
    pub claims: serde_json::Map<String, serde_json::Value>,
}

impl RequestParams {
    pub fn new(
        tenant_id: impl Into<String>,
        resource: impl Into<String>,
        op: impl Into<String>,
    ) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            resource: resource.into(),
            op: op.into(),
            ..Self::default()
        }
    }

    pub fn with_request_id(mut self, id: impl Into<String>) -> Self {
        self.request_id = id.into();
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn with_claim(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.claims.insert(key.into(), value);
        self
    }
}
