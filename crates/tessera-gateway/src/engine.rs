//! Built-in rule engine.
//!
//! Evaluates a tenant's [`AuthConfig`] rules.  Requests with no matching rule
//! are denied.  `webhook` rules delegate the decision to a remote endpoint
//! through the sync manager, authenticated with an internal token.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::sync::Arc;
use tessera_kernel::{
    AuthConfig, AuthDecision, AuthorizationEngine, CallContext, EngineDeps, EngineFactory,
    Facet, GatewayError, GatewayResult, Managers, Project, ProjectConfig, RequestParams, Rule,
};
use tracing::{debug, instrument};

#[derive(Default)]
struct EngineState {
    project: Option<ProjectConfig>,
    auth: AuthConfig,
}

/// [`AuthorizationEngine`] backed by the rule table of one tenant.
pub struct RuleEngine {
    tenant_id: String,
    managers: Managers,
    state: RwLock<EngineState>,
}

impl RuleEngine {
    pub fn new(deps: EngineDeps) -> Self {
        Self {
            tenant_id: deps.tenant_id,
            managers: deps.managers,
            state: RwLock::new(EngineState::default()),
        }
    }

    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    /// Whether any configuration is currently loaded.
    pub fn is_configured(&self) -> bool {
        self.state.read().project.is_some()
    }

    fn check_project(&self, config: &ProjectConfig) -> GatewayResult<()> {
        if config.id != self.tenant_id {
            return Err(GatewayError::configuration(
                &self.tenant_id,
                Facet::Auth,
                format!("config belongs to project ({})", config.id),
            ));
        }
        Ok(())
    }

    async fn call_webhook(
        &self,
        ctx: &CallContext,
        url: &str,
        params: &RequestParams,
    ) -> GatewayResult<AuthDecision> {
        let token = self.managers.admin().issue_internal_token()?;
        let body = serde_json::to_value(params)
            .map_err(|e| GatewayError::Internal(format!("encoding request params: {e}")))?;

        match self.managers.sync().make_http_request(ctx, url, &token, &body).await {
            Ok(reply) => Ok(AuthDecision::Allow {
                claims: match reply {
                    serde_json::Value::Object(claims) => claims,
                    _ => params.claims.clone(),
                },
            }),
            Err(e) => Ok(AuthDecision::Deny {
                reason: format!("webhook denied the request: {e}"),
            }),
        }
    }
}

#[async_trait]
impl AuthorizationEngine for RuleEngine {
    fn set_config(&self, _ctx: &CallContext, project: &Project) -> GatewayResult<()> {
        self.check_project(&project.config)?;
        for (resource, ops) in &project.auth.rules {
            if let Some((op, _)) = ops.iter().find(|(_, rule)| {
                matches!(rule, Rule::Webhook { url } if url.is_empty())
            }) {
                return Err(GatewayError::configuration(
                    &self.tenant_id,
                    Facet::Auth,
                    format!("webhook rule for ({resource}, {op}) has no url"),
                ));
            }
        }

        let mut state = self.state.write();
        state.project = Some(project.config.clone());
        state.auth = project.auth.clone();
        Ok(())
    }

    fn set_project_config(&self, config: &ProjectConfig) -> GatewayResult<()> {
        self.check_project(config)?;
        self.state.write().project = Some(config.clone());
        Ok(())
    }

    fn close_config(&self) {
        *self.state.write() = EngineState::default();
    }

    #[instrument(skip(self, ctx, params), fields(tenant = %self.tenant_id, resource = %params.resource, op = %params.op))]
    async fn authorize(
        &self,
        ctx: &CallContext,
        params: &RequestParams,
    ) -> GatewayResult<AuthDecision> {
        let rule = self
            .state
            .read()
            .auth
            .rule_for(&params.resource, &params.op)
            .cloned();

        let decision = match rule {
            Some(Rule::Allow) => AuthDecision::Allow {
                claims: params.claims.clone(),
            },
            Some(Rule::Deny) => AuthDecision::Deny {
                reason: "denied by rule".to_string(),
            },
            Some(Rule::Webhook { url }) => self.call_webhook(ctx, &url, params).await?,
            None => AuthDecision::Deny {
                reason: format!("no rule for ({}, {})", params.resource, params.op),
            },
        };
        debug!(allowed = decision.is_allowed(), "rule evaluated");
        Ok(decision)
    }
}

/// Builds a [`RuleEngine`] per tenant.
#[derive(Debug, Default, Clone, Copy)]
pub struct RuleEngineFactory;

impl EngineFactory for RuleEngineFactory {
    fn create(&self, deps: EngineDeps) -> GatewayResult<Arc<dyn AuthorizationEngine>> {
        Ok(Arc::new(RuleEngine::new(deps)))
    }
}
