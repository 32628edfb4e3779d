//! Shared-secret admin manager with a project quota.

use std::collections::HashMap;
use tessera_kernel::{AdminManager, GatewayError, GatewayResult, ProjectConfig, RequestParams, TenantId};

/// Attribute carrying the project an admin call targets.
pub const PROJECT_ATTRIBUTE: &str = "project";

/// [`AdminManager`] for single-node deployments.
///
/// Admin calls authenticate with one shared secret.  An empty secret
/// disables admin authentication.
///
/// Integrations and webhooks receive a separate internal token, generated
/// per node unless configured.  It never passes as an admin token.
pub struct StaticAdminManager {
    secret: String,
    internal_token: String,
    max_projects: usize,
}

impl StaticAdminManager {
    pub fn new(secret: impl Into<String>, max_projects: usize) -> Self {
        Self {
            secret: secret.into(),
            internal_token: format!("internal-{}", uuid::Uuid::new_v4()),
            max_projects,
        }
    }

    /// Use a fixed internal token, e.g. one shared by every node of a
    /// cluster.  An empty token keeps the generated one.
    pub fn with_internal_token(mut self, token: impl Into<String>) -> Self {
        let token = token.into();
        if !token.is_empty() {
            self.internal_token = token;
        }
        self
    }

    pub fn auth_enabled(&self) -> bool {
        !self.secret.is_empty()
    }

    pub fn max_projects(&self) -> usize {
        self.max_projects
    }
}

impl AdminManager for StaticAdminManager {
    fn validate_creation(&self, current: &[TenantId], requested: &ProjectConfig) -> bool {
        current.iter().any(|id| *id == requested.id) || current.len() < self.max_projects
    }

    fn issue_internal_token(&self) -> GatewayResult<String> {
        Ok(self.internal_token.clone())
    }

    fn validate_token(
        &self,
        token: &str,
        resource: &str,
        op: &str,
        attributes: &HashMap<String, String>,
    ) -> GatewayResult<RequestParams> {
        if self.auth_enabled() && token != self.secret {
            return Err(GatewayError::Unauthorized(format!(
                "invalid admin token for ({resource}, {op})"
            )));
        }

        let tenant = attributes
            .get(PROJECT_ATTRIBUTE)
            .cloned()
            .unwrap_or_default();
        let mut params = RequestParams::new(tenant, resource, op)
            .with_request_id(uuid::Uuid::new_v4().to_string())
            .with_claim("role", serde_json::Value::from("admin"));
        params.attributes = attributes.clone();
        Ok(params)
    }
}
