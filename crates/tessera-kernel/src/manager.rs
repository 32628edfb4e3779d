//! Process-wide manager contracts.
//!
//! Managers are shared by every tenant module.  The registry receives them as
//! a [`Managers`] bundle at construction time and hands clones of the bundle
//! to each module, so modules never reach for ambient globals.

use crate::context::{CallContext, RequestParams};
use crate::error::GatewayResult;
use crate::hook::IntegrationProvider;
use crate::project::ProjectConfig;
use crate::TenantId;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

/// Administrative manager: plan limits and token handling.
pub trait AdminManager: Send + Sync {
    /// Whether a tenant with `requested` config may be created given the
    /// tenants currently registered.
    fn validate_creation(&self, current: &[TenantId], requested: &ProjectConfig) -> bool;

    /// Token the gateway uses when calling integrations and webhooks.
    fn issue_internal_token(&self) -> GatewayResult<String>;

    /// Validate an admin token for `(resource, op)` and extract the request
    /// parameters it grants.
    fn validate_token(
        &self,
        token: &str,
        resource: &str,
        op: &str,
        attributes: &HashMap<String, String>,
    ) -> GatewayResult<RequestParams>;
}

/// Cluster sync manager.  Only its outbound HTTP helper is consumed here.
#[async_trait]
pub trait SyncManager: Send + Sync {
    /// POST `body` to `url` authenticated with `token` and return the JSON
    /// reply.  Non-2xx replies are errors.
    async fn make_http_request(
        &self,
        ctx: &CallContext,
        url: &str,
        token: &str,
        body: &serde_json::Value,
    ) -> GatewayResult<serde_json::Value>;
}

/// Handles to the process-wide managers.
#[derive(Clone)]
pub struct Managers {
    admin: Arc<dyn AdminManager>,
    sync: Arc<dyn SyncManager>,
    integration: Arc<dyn IntegrationProvider>,
}

impl Managers {
    pub fn new(
        admin: Arc<dyn AdminManager>,
        sync: Arc<dyn SyncManager>,
        integration: Arc<dyn IntegrationProvider>,
    ) -> Self {
        Self {
            admin,
            sync,
            integration,
        }
    }

    pub fn admin(&self) -> &Arc<dyn AdminManager> {
        &self.admin
    }

    pub fn sync(&self) -> &Arc<dyn SyncManager> {
        &self.sync
    }

    pub fn integration(&self) -> &Arc<dyn IntegrationProvider> {
        &self.integration
    }
}
