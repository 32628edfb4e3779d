use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tessera_gateway::server::{AppState, router};
use tessera_kernel::cache::CacheOptions;
use tessera_kernel::{AuthHookResponse, HookPayload, IntegrationHook};
use tessera_testing::harness::CLUSTER;
use tessera_testing::{Harness, ScriptedHook};
use tower::ServiceExt;

fn app(h: &Harness) -> Router {
    router(AppState {
        modules: h.modules.clone(),
        integrations: h.integrations.clone(),
        caching: h.caching.clone(),
        request_timeout: Duration::from_secs(5),
    })
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("authorization", "Bearer admin");
    let body = match body {
        Some(v) => {
            builder = builder.header("content-type", "application/json");
            Body::from(v.to_string())
        }
        None => Body::empty(),
    };
    let resp = app
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

fn acme_project() -> Value {
    json!({
        "config": { "id": "acme" },
        "letsencrypt": { "domains": ["acme.io"] },
        "ingress_routes": [
            {
                "id": "r1",
                "source": { "url": "/r1" },
                "targets": [{ "host": "svc.local", "port": 8080 }],
                "cache": { "ttl_secs": 60 }
            },
            {
                "id": "r2",
                "source": { "url": "/r2" },
                "targets": [{ "host": "svc.local", "port": 8081 }]
            }
        ]
    })
}

#[tokio::test]
async fn project_lifecycle_over_http() {
    let h = Harness::new(5);
    let app = app(&h);

    let (status, _) = send(&app, Method::POST, "/v1/config/projects/acme", Some(acme_project())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(h.modules.tenant_ids().await, ["acme"]);
    assert_eq!(h.globals.domains.whitelist(), ["acme.io"]);
    assert_eq!(h.globals.routing.len(), 2);

    let (status, _) = send(
        &app,
        Method::POST,
        "/v1/config/projects/acme/letsencrypt/config",
        Some(json!({ "domains": ["acme.io", "www.acme.io"] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        h.modules.letsencrypt_domains("acme").await.unwrap(),
        ["acme.io", "www.acme.io"]
    );

    let (status, _) = send(&app, Method::DELETE, "/v1/config/projects/acme", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(h.modules.is_empty().await);
    assert!(h.globals.routing.is_empty());
}

#[tokio::test]
async fn facet_update_for_unknown_project_is_404() {
    let h = Harness::new(5);
    let (status, body) = send(
        &app(&h),
        Method::POST,
        "/v1/config/projects/ghost/routing/ingress",
        Some(json!([])),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "PROJECT_NOT_FOUND");
    assert!(h.modules.is_empty().await);
}

#[tokio::test]
async fn refused_creation_is_403_with_upgrade_message() {
    let h = Harness::new(0);
    let (status, body) = send(
        &app(&h),
        Method::POST,
        "/v1/config/projects/acme",
        Some(json!({ "config": { "id": "acme" } })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "POLICY_DENIED");
    assert_eq!(
        body["error"]["message"],
        tessera_gateway::modules::UPGRADE_MESSAGE
    );
}

#[tokio::test]
async fn invalid_facets_report_failures() {
    let h = Harness::new(5);
    let (status, body) = send(
        &app(&h),
        Method::POST,
        "/v1/config/projects/acme",
        Some(json!({
            "config": { "id": "acme" },
            "letsencrypt": { "domains": ["https://acme.io"] }
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "CONFIG_NOT_APPLIED");
    assert_eq!(body["error"]["failures"].as_array().unwrap().len(), 1);
    // The module stays registered with whatever did apply.
    assert_eq!(h.modules.tenant_ids().await, ["acme"]);
}

#[tokio::test]
async fn missing_token_is_401() {
    let h = Harness::new(5);
    let resp = app(&h)
        .oneshot(
            Request::builder()
                .method(Method::DELETE)
                .uri("/v1/config/projects/acme")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn purge_endpoint_removes_one_route() {
    let h = Harness::new(5);
    let app = app(&h);
    send(&app, Method::POST, "/v1/config/projects/acme", Some(acme_project())).await;

    let r1 = h
        .modules
        .ingress_routes("acme")
        .await
        .unwrap()
        .into_iter()
        .find(|r| r.id == "r1")
        .unwrap();
    for page in 1..=3 {
        h.caching
            .set_route_result(&r1, &CacheOptions::new().with("page", page), json!(page))
            .await
            .unwrap();
    }

    let (status, body) = send(
        &app,
        Method::DELETE,
        "/v1/external/projects/acme/caching/purge-cache",
        Some(json!({ "resource": "ingress-route", "id": "r1" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["removed"], 3);
    assert_eq!(body["result"], "connected");
    assert!(h.store.is_empty());

    let (status, body) = send(
        &app,
        Method::DELETE,
        "/v1/external/projects/acme/caching/purge-cache",
        Some(json!({ "resource": "ingress-route", "id": "not-mine" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "INVALID_REQUEST");
}

#[tokio::test]
async fn authorize_returns_hijacking_integration_result() {
    let h = Harness::new(5);
    let app = app(&h);
    send(&app, Method::POST, "/v1/config/projects/acme", Some(json!({ "config": { "id": "acme" } }))).await;

    let hook: Arc<dyn IntegrationHook> = Arc::new(
        ScriptedHook::new(
            "quota",
            AuthHookResponse::hijacked(HookPayload::Json(json!({ "rows": 7 }))).with_status(202),
        )
        .with_integration("billing"),
    );
    h.hooks(vec![hook]);

    let (status, body) = send(
        &app,
        Method::POST,
        "/v1/api/acme/authorize",
        Some(json!({ "resource": "db-read", "op": "read" })),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["source"], "integration");
    assert_eq!(body["integration"], "billing");
    assert_eq!(body["hook"], "quota");
    assert_eq!(body["result"], json!({ "rows": 7 }));
    assert_eq!(h.engines.engine("acme").unwrap().authorize_count(), 0);
}

#[tokio::test]
async fn authorize_falls_back_to_engine() {
    let h = Harness::new(5);
    let app = app(&h);
    send(&app, Method::POST, "/v1/config/projects/acme", Some(json!({ "config": { "id": "acme" } }))).await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/v1/api/acme/authorize",
        Some(json!({ "resource": "db-read", "op": "read" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["source"], "engine");
    assert_eq!(body["allowed"], true);
}

#[tokio::test]
async fn project_facets_can_be_read_back() {
    let h = Harness::new(5);
    let app = app(&h);
    send(&app, Method::POST, "/v1/config/projects/acme", Some(acme_project())).await;
    let global = json!({
        "request_headers": [{ "key": "x-tenant", "value": "acme", "op": "set" }],
        "response_headers": []
    });
    let (status, _) = send(
        &app,
        Method::POST,
        "/v1/config/projects/acme/routing/ingress/global",
        Some(global.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, Method::GET, "/v1/config/projects/acme/letsencrypt/config", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"], json!({ "domains": ["acme.io"] }));

    let (status, body) = send(&app, Method::GET, "/v1/config/projects/acme/routing/ingress", None).await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<_> = body["result"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["id"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(ids, ["r1", "r2"]);

    let (status, body) = send(&app, Method::GET, "/v1/config/projects/acme/routing/ingress/global", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"], global);

    let (status, _) = send(&app, Method::GET, "/v1/config/projects/ghost/routing/ingress", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(h.modules.load_module("ghost").await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn disabling_the_cache_over_http_purges_the_cluster() {
    let h = Harness::new(5);
    let app = app(&h);
    send(&app, Method::POST, "/v1/config/projects/acme", Some(acme_project())).await;
    let routes = h.modules.ingress_routes("acme").await.unwrap();
    let route = routes.iter().find(|r| r.id == "r1").unwrap();
    assert!(h
        .caching
        .set_route_result(route, &CacheOptions::new(), json!("cached"))
        .await
        .unwrap());

    let (status, body) = send(&app, Method::GET, "/v1/config/caching/config", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"], json!([{ "enabled": true }]));

    let uri = format!("/v1/config/caching/config/{CLUSTER}");
    let (status, _) = send(&app, Method::POST, &uri, Some(json!({ "enabled": false }))).await;
    assert_eq!(status, StatusCode::OK);
    assert!(h.store.is_empty());

    let (_, body) = send(&app, Method::GET, "/v1/config/caching/config", None).await;
    assert_eq!(body["result"], json!([{ "enabled": false }]));
}

#[tokio::test]
async fn authorize_without_admin_token_never_reaches_hooks_or_engine() {
    let h = Harness::new(5);
    let app = app(&h);
    send(&app, Method::POST, "/v1/config/projects/acme", Some(json!({ "config": { "id": "acme" } }))).await;

    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/v1/api/acme/authorize")
                .header("content-type", "application/json")
                .body(Body::from(
                    json!({ "resource": "db-read", "op": "read", "claims": { "role": "admin" } })
                        .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(h.engines.engine("acme").unwrap().authorize_count(), 0);
}
