//! Axum admin and authorization server.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`    | `/v1/api/health-check` | Liveness check. |
//! | `POST`   | `/v1/config/projects/{project}` | Load or create a project and apply its full config. |
//! | `DELETE` | `/v1/config/projects/{project}` | Delete a project. |
//! | `GET`    | `/v1/config/projects/{project}/letsencrypt/config` | TLS domains of a project. |
//! | `POST`   | `/v1/config/projects/{project}/letsencrypt/config` | Set TLS domains. |
//! | `GET`    | `/v1/config/projects/{project}/routing/ingress` | Ingress routes of a project. |
//! | `POST`   | `/v1/config/projects/{project}/routing/ingress` | Set ingress routes. |
//! | `GET`    | `/v1/config/projects/{project}/routing/ingress/global` | Global route config of a project. |
//! | `POST`   | `/v1/config/projects/{project}/routing/ingress/global` | Set global route config. |
//! | `GET`    | `/v1/config/caching/config` | Cluster cache switch. |
//! | `POST`   | `/v1/config/caching/config/{id}` | Set the cluster cache switch. |
//! | `POST`   | `/v1/config/integrations/hooks` | Replace integration hooks. |
//! | `DELETE` | `/v1/external/projects/{project}/caching/purge-cache` | Purge a project's route cache. |
//! | `GET`    | `/v1/external/caching/connection-state` | Cache store connection state. |
//! | `POST`   | `/v1/api/{project}/authorize` | Authorize one request (hooks, then engine). |
//!
//! Every `/v1/config`, `/v1/external` and `authorize` call carries the admin
//! token as `Authorization: Bearer <token>`.
//!
//! `authorize` trusts the `claims` in its body as already verified: end-user
//! tokens are validated by the dispatch layer in front of this server, which
//! is the only caller holding the admin token.

use crate::error::{ApiError, ApiResult};
use crate::global::{CacheConfig, Caching};
use crate::integration::IntegrationManager;
use crate::modules::{AuthOutcome, Modules, PurgeRequest};
use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tessera_kernel::{
    AuthDecision, CallContext, GatewayError, GlobalRoutesConfig, HookConfig, HookPayload,
    IngressRoute, IntegrationProvider, LetsEncrypt, Project, RequestParams,
};
use tracing::info;
use uuid::Uuid;

use crate::managers::PROJECT_ATTRIBUTE;

// ─────────────────────────────────────────────────────────────────────────────
// Shared application state
// ─────────────────────────────────────────────────────────────────────────────

/// Shared state injected into every handler.
#[derive(Clone)]
pub struct AppState {
    pub modules: Arc<Modules>,
    pub integrations: Arc<IntegrationManager>,
    pub caching: Arc<Caching>,
    /// Deadline given to each handled request.
    pub request_timeout: Duration,
}

impl AppState {
    fn context(&self) -> CallContext {
        CallContext::new(Uuid::new_v4().to_string()).with_timeout(self.request_timeout)
    }

    /// Validate the admin token for `(resource, op)`.
    fn check_admin(
        &self,
        headers: &HeaderMap,
        resource: &str,
        op: &str,
        project: Option<&str>,
    ) -> ApiResult<RequestParams> {
        let mut attributes = HashMap::new();
        if let Some(project) = project {
            attributes.insert(PROJECT_ATTRIBUTE.to_string(), project.to_string());
        }
        Ok(self.modules.managers().admin().validate_token(
            bearer_token(headers),
            resource,
            op,
            &attributes,
        )?)
    }
}

fn bearer_token(headers: &HeaderMap) -> &str {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.strip_prefix("Bearer ").unwrap_or(v).trim())
        .unwrap_or_default()
}

// ─────────────────────────────────────────────────────────────────────────────
// Server
// ─────────────────────────────────────────────────────────────────────────────

/// Admin server over a [`Modules`] registry.
pub struct TesseraServer {
    port: u16,
    state: AppState,
}

impl TesseraServer {
    pub fn new(port: u16, state: AppState) -> Self {
        Self { port, state }
    }

    /// Build the axum [`Router`].
    pub fn build_app(&self) -> Router {
        router(self.state.clone())
    }

    /// Bind to `0.0.0.0:{port}` and serve until the process exits.
    pub async fn start(self) -> std::io::Result<()> {
        let app = self.build_app();
        let addr = format!("0.0.0.0:{}", self.port);
        info!(addr = %addr, "Tessera gateway starting");
        let listener = tokio::net::TcpListener::bind(&addr).await?;
        axum::serve(listener, app).await
    }
}

/// Routes of the admin surface bound to `state`.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/v1/api/health-check", get(health_handler))
        .route(
            "/v1/config/projects/{project}",
            post(set_project_handler).delete(delete_project_handler),
        )
        .route(
            "/v1/config/projects/{project}/letsencrypt/config",
            get(get_letsencrypt_handler).post(set_letsencrypt_handler),
        )
        .route(
            "/v1/config/projects/{project}/routing/ingress",
            get(get_ingress_routes_handler).post(set_ingress_routes_handler),
        )
        .route(
            "/v1/config/projects/{project}/routing/ingress/global",
            get(get_ingress_global_handler).post(set_ingress_global_handler),
        )
        .route("/v1/config/caching/config", get(get_cache_config_handler))
        .route(
            "/v1/config/caching/config/{id}",
            post(set_cache_config_handler),
        )
        .route("/v1/config/integrations/hooks", post(set_hooks_handler))
        .route(
            "/v1/external/projects/{project}/caching/purge-cache",
            delete(purge_cache_handler),
        )
        .route(
            "/v1/external/caching/connection-state",
            get(connection_state_handler),
        )
        .route("/v1/api/{project}/authorize", post(authorize_handler))
        .with_state(state)
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

async fn health_handler() -> impl IntoResponse {
    Json(json!({ "status": "ok", "service": "tessera-gateway" }))
}

fn ok() -> Json<Value> {
    Json(json!({}))
}

/// `POST /v1/config/projects/{project}`
async fn set_project_handler(
    State(state): State<AppState>,
    Path(project): Path<String>,
    headers: HeaderMap,
    Json(mut body): Json<Project>,
) -> ApiResult<Json<Value>> {
    state.check_admin(&headers, "project", "modify", Some(&project))?;
    if body.config.id.is_empty() {
        body.config.id = project.clone();
    } else if body.config.id != project {
        return Err(GatewayError::InvalidRequest(format!(
            "body is for project ({}) but path names ({project})",
            body.config.id
        ))
        .into());
    }

    state
        .modules
        .load_or_create_and_configure(&state.context(), &body)
        .await?;
    Ok(ok())
}

/// `DELETE /v1/config/projects/{project}`
async fn delete_project_handler(
    State(state): State<AppState>,
    Path(project): Path<String>,
    headers: HeaderMap,
) -> ApiResult<Json<Value>> {
    state.check_admin(&headers, "project", "modify", Some(&project))?;
    state.modules.delete(&project).await?;
    Ok(ok())
}

/// `GET /v1/config/projects/{project}/letsencrypt/config`
async fn get_letsencrypt_handler(
    State(state): State<AppState>,
    Path(project): Path<String>,
    headers: HeaderMap,
) -> ApiResult<Json<Value>> {
    state.check_admin(&headers, "letsencrypt", "read", Some(&project))?;
    let domains = state.modules.letsencrypt_domains(&project).await?;
    Ok(Json(json!({ "result": LetsEncrypt { domains } })))
}

/// `POST /v1/config/projects/{project}/letsencrypt/config`
async fn set_letsencrypt_handler(
    State(state): State<AppState>,
    Path(project): Path<String>,
    headers: HeaderMap,
    Json(body): Json<LetsEncrypt>,
) -> ApiResult<Json<Value>> {
    state.check_admin(&headers, "letsencrypt", "modify", Some(&project))?;
    state.modules.set_letsencrypt_config(&project, &body).await?;
    Ok(ok())
}

/// `GET /v1/config/projects/{project}/routing/ingress`
async fn get_ingress_routes_handler(
    State(state): State<AppState>,
    Path(project): Path<String>,
    headers: HeaderMap,
) -> ApiResult<Json<Value>> {
    state.check_admin(&headers, "ingress-route", "read", Some(&project))?;
    let routes = state.modules.ingress_routes(&project).await?;
    Ok(Json(json!({ "result": routes })))
}

/// `POST /v1/config/projects/{project}/routing/ingress`
async fn set_ingress_routes_handler(
    State(state): State<AppState>,
    Path(project): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Vec<IngressRoute>>,
) -> ApiResult<Json<Value>> {
    state.check_admin(&headers, "ingress-route", "modify", Some(&project))?;
    state.modules.set_ingress_route_config(&project, &body).await?;
    Ok(ok())
}

/// `GET /v1/config/projects/{project}/routing/ingress/global`
async fn get_ingress_global_handler(
    State(state): State<AppState>,
    Path(project): Path<String>,
    headers: HeaderMap,
) -> ApiResult<Json<Value>> {
    state.check_admin(&headers, "ingress-route", "read", Some(&project))?;
    let config = state.modules.global_route_config(&project).await?;
    Ok(Json(json!({ "result": config })))
}

/// `POST /v1/config/projects/{project}/routing/ingress/global`
async fn set_ingress_global_handler(
    State(state): State<AppState>,
    Path(project): Path<String>,
    headers: HeaderMap,
    Json(body): Json<GlobalRoutesConfig>,
) -> ApiResult<Json<Value>> {
    state.check_admin(&headers, "ingress-route", "modify", Some(&project))?;
    state
        .modules
        .set_ingress_global_route_config(&project, &body)
        .await?;
    Ok(ok())
}

/// `GET /v1/config/caching/config`
async fn get_cache_config_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<Value>> {
    state.check_admin(&headers, "cache-config", "read", None)?;
    Ok(Json(json!({ "result": [state.caching.config()] })))
}

/// `POST /v1/config/caching/config/{id}`
///
/// `{id}` names the cluster; a request for another cluster is rejected.
async fn set_cache_config_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<CacheConfig>,
) -> ApiResult<Json<Value>> {
    state.check_admin(&headers, "cache-config", "modify", None)?;
    if id != state.caching.cluster_id() {
        return Err(GatewayError::InvalidRequest(format!(
            "cache config is for cluster ({id}) but this node serves ({})",
            state.caching.cluster_id()
        ))
        .into());
    }
    state.caching.set_config(body).await?;
    Ok(ok())
}

/// `POST /v1/config/integrations/hooks`
async fn set_hooks_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<Vec<HookConfig>>,
) -> ApiResult<Json<Value>> {
    state.check_admin(&headers, "integration", "modify", None)?;
    state.integrations.set_hook_config(body)?;
    Ok(ok())
}

/// `DELETE /v1/external/projects/{project}/caching/purge-cache`
///
/// The body is optional; without one every route of the project is purged.
async fn purge_cache_handler(
    State(state): State<AppState>,
    Path(project): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<Value>> {
    state.check_admin(&headers, "cache-config", "modify", Some(&project))?;
    let request: PurgeRequest = if body.is_empty() {
        PurgeRequest::all_routes()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| GatewayError::InvalidRequest(format!("invalid purge request: {e}")))?
    };

    let removed = state.modules.purge_cache(&project, &request).await?;
    Ok(Json(json!({
        "removed": removed,
        "result": state.caching.connection_state(),
    })))
}

/// `GET /v1/external/caching/connection-state`
async fn connection_state_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<Value>> {
    state.check_admin(&headers, "cache-config", "read", None)?;
    Ok(Json(json!({ "result": state.caching.connection_state() })))
}

/// Body of `POST /v1/api/{project}/authorize`.
#[derive(Debug, Deserialize)]
pub struct AuthorizeRequest {
    pub resource: String,
    pub op: String,
    #[serde(default)]
    pub attributes: HashMap<String, String>,
    #[serde(default)]
    pub claims: Map<String, Value>,
}

/// `POST /v1/api/{project}/authorize`
async fn authorize_handler(
    State(state): State<AppState>,
    Path(project): Path<String>,
    headers: HeaderMap,
    Json(body): Json<AuthorizeRequest>,
) -> Result<Response, ApiError> {
    state.check_admin(&headers, "authorize", "access", Some(&project))?;
    let ctx = state.context();
    let mut params = RequestParams::new(project, body.resource, body.op)
        .with_request_id(ctx.request_id.clone());
    params.attributes = body.attributes;
    params.claims = body.claims;

    let outcome = state.modules.authorize(&ctx, &params).await?;
    Ok(outcome_response(outcome))
}

fn outcome_response(outcome: AuthOutcome) -> Response {
    match outcome {
        AuthOutcome::Integration(hook) => {
            let status = hook
                .declared_status()
                .and_then(|s| StatusCode::from_u16(s).ok())
                .unwrap_or(StatusCode::OK);
            let integration = hook.integration().to_string();
            let hook_id = hook.hook().to_string();
            match hook.into_result() {
                HookPayload::Raw { content_type, body } => {
                    (status, [(header::CONTENT_TYPE, content_type)], body).into_response()
                }
                payload => {
                    let result = match payload {
                        HookPayload::Json(value) => value,
                        _ => Value::Null,
                    };
                    (
                        status,
                        Json(json!({
                            "source": "integration",
                            "integration": integration,
                            "hook": hook_id,
                            "result": result,
                        })),
                    )
                        .into_response()
                }
            }
        }
        AuthOutcome::Engine(AuthDecision::Allow { claims }) => Json(json!({
            "source": "engine",
            "allowed": true,
            "claims": claims,
        }))
        .into_response(),
        AuthOutcome::Engine(AuthDecision::Deny { reason }) => (
            StatusCode::FORBIDDEN,
            Json(json!({ "error": { "code": "ACCESS_DENIED", "message": reason } })),
        )
            .into_response(),
    }
}
