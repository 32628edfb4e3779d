use serde_json::json;
use tessera_gateway::modules::PurgeRequest;
use tessera_kernel::cache::{
    CacheOptions, CacheStore, route_prefix, route_resource_prefix, route_variant_key,
};
use tessera_gateway::modules::ApplyMode;
use tessera_kernel::{
    CallContext, IngressRoute, Project, RouteCacheConfig, RouteTarget,
};
use tessera_testing::Harness;
use tessera_testing::harness::CLUSTER;

fn cached_route(id: &str, ttl_secs: u64) -> IngressRoute {
    IngressRoute::new(id, format!("/{id}"))
        .with_target(RouteTarget::new("svc.local", 8080))
        .with_cache(RouteCacheConfig {
            ttl_secs,
            options: vec!["ttl".into()],
        })
}

#[test]
fn equal_options_in_any_order_share_a_key() {
    let a = CacheOptions::new()
        .with("ttl", 60)
        .with("headers", json!({ "b": 2, "a": 1 }));
    let b = CacheOptions::new()
        .with("headers", json!({ "a": 1, "b": 2 }))
        .with("ttl", 60);
    assert_eq!(
        route_variant_key("c", "r1", &a),
        route_variant_key("c", "r1", &b)
    );

    let c = CacheOptions::new().with("ttl", 61);
    assert_ne!(
        route_variant_key("c", "r1", &a),
        route_variant_key("c", "r1", &c)
    );
}

#[test]
fn keys_nest_under_their_prefixes() {
    let samples = [
        ("c1", "r1", CacheOptions::new()),
        ("eu::west", "a:b", CacheOptions::new().with("q", "x::y")),
        ("%3A", "%", CacheOptions::new().with("n", json!([1, 2]))),
    ];
    for (cluster, route, opts) in &samples {
        let key = route_variant_key(cluster, route, opts);
        let route_level = route_prefix(cluster, route);
        let resource_level = route_resource_prefix(cluster);
        assert!(key.as_str().starts_with(route_level.as_str()));
        assert!(route_level.as_str().starts_with(resource_level.as_str()));
        assert!(key.is_under(&route_level));
        assert!(key.is_under(&resource_level));
    }
}

#[tokio::test]
async fn purge_by_route_spares_sibling_routes() -> anyhow::Result<()> {
    let h = Harness::new(5);
    let project = Project::new("acme")
        .with_route(cached_route("r1", 60))
        .with_route(cached_route("r2", 60));
    h.modules
        .load_or_create_and_configure(&CallContext::background(), &project)
        .await?;

    let routes = h.modules.ingress_routes("acme").await?;
    let ttl60 = CacheOptions::new().with("ttl", 60);
    let other = CacheOptions::new().with("ttl", 5);
    for route in &routes {
        for opts in [&ttl60, &other] {
            let stored = h
                .caching
                .set_route_result(route, opts, json!({ "route": route.id }))
                .await?;
            anyhow::ensure!(stored, "route {} has no cache config", route.id);
        }
    }
    assert_eq!(h.store.len(), 4);

    let removed = h
        .modules
        .purge_cache("acme", &PurgeRequest::route("r1"))
        .await?;
    assert_eq!(removed, 2);

    for opts in [&ttl60, &other] {
        assert_eq!(h.caching.get_route_result("r1", opts).await?, None);
        assert_eq!(
            h.caching.get_route_result("r2", opts).await?,
            Some(json!({ "route": "r2" }))
        );
    }
    Ok(())
}

#[tokio::test]
async fn purge_stays_inside_the_tenant() {
    let h = Harness::new(5);
    let ctx = CallContext::background();
    h.modules
        .load_or_create_and_configure(&ctx, &Project::new("acme").with_route(cached_route("r1", 0)))
        .await
        .unwrap();
    h.modules
        .load_or_create_and_configure(&ctx, &Project::new("globex").with_route(cached_route("r10", 0)))
        .await
        .unwrap();

    let opts = CacheOptions::new();
    for route in ["r1", "r10"] {
        h.store
            .set(
                route_variant_key(CLUSTER, route, &opts),
                json!(route),
                tessera_kernel::cache::KeyKind::Invalidate,
            )
            .await
            .unwrap();
    }

    // globex cannot reach acme's route.
    let err = h
        .modules
        .purge_cache("globex", &PurgeRequest::route("r1"))
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), 400);

    // Purging all of acme's routes leaves globex's r10 alone.
    assert_eq!(
        h.modules
            .purge_cache("acme", &PurgeRequest::all_routes())
            .await
            .unwrap(),
        1
    );
    assert_eq!(
        h.caching.get_route_result("r10", &opts).await.unwrap(),
        Some(json!("r10"))
    );
}

#[tokio::test]
async fn deleting_a_project_purges_its_cached_routes() {
    let h = Harness::new(5);
    h.modules
        .load_or_create_and_configure(
            &CallContext::background(),
            &Project::new("acme").with_route(cached_route("r1", 0)),
        )
        .await
        .unwrap();
    let route = h.modules.ingress_routes("acme").await.unwrap().remove(0);
    h.caching
        .set_route_result(&route, &CacheOptions::new(), json!(1))
        .await
        .unwrap();

    h.modules.delete("acme").await.unwrap();
    assert!(h.store.is_empty());
    assert_eq!(h.log.matching("cache.purge"), ["cache.purge:r1"]);
}

#[tokio::test]
async fn purge_cluster_clears_every_route() {
    let h = Harness::new(5);
    h.modules
        .load_or_create_and_configure(
            &CallContext::background(),
            &Project::new("acme")
                .with_route(cached_route("r1", 0))
                .with_route(cached_route("r2", 0)),
        )
        .await
        .unwrap();
    for route in h.modules.ingress_routes("acme").await.unwrap() {
        h.caching
            .set_route_result(&route, &CacheOptions::new(), json!(1))
            .await
            .unwrap();
    }

    assert_eq!(h.modules.purge_cluster().await.unwrap(), 2);
    assert!(h.store.is_empty());
}

#[tokio::test]
async fn dropped_route_cache_does_not_reach_the_next_owner() {
    let h = Harness::new(5);
    let ctx = CallContext::background();
    h.modules
        .load_or_create_and_configure(&ctx, &Project::new("acme").with_route(cached_route("r1", 0)))
        .await
        .unwrap();
    h.caching
        .set_route_result(&cached_route("r1", 0), &CacheOptions::new(), json!("acme-secret"))
        .await
        .unwrap();

    h.log.clear();
    h.modules.set_ingress_route_config("acme", &[]).await.unwrap();
    assert_eq!(h.log.events(), ["cache.purge:r1", "routes.set:acme"]);

    h.modules
        .load_or_create_and_configure(&ctx, &Project::new("globex").with_route(cached_route("r1", 0)))
        .await
        .unwrap();
    assert_eq!(
        h.caching.get_route_result("r1", &CacheOptions::new()).await.unwrap(),
        None
    );
}

#[tokio::test]
async fn reapplying_a_project_purges_only_the_routes_it_drops() {
    let h = Harness::new(5);
    let ctx = CallContext::background();
    let before = Project::new("acme")
        .with_route(cached_route("r1", 0))
        .with_route(cached_route("r2", 0));
    h.modules.load_or_create_and_configure(&ctx, &before).await.unwrap();
    for route in h.modules.ingress_routes("acme").await.unwrap() {
        h.caching
            .set_route_result(&route, &CacheOptions::new(), json!(route.id))
            .await
            .unwrap();
    }

    let after = Project::new("acme").with_route(cached_route("r2", 0));
    h.log.clear();
    h.modules
        .load_module("acme")
        .await
        .unwrap()
        .apply(&ctx, &after, ApplyMode::Strict)
        .await
        .unwrap();

    assert_eq!(h.log.matching("cache.purge"), ["cache.purge:r1"]);
    assert_eq!(
        h.caching.get_route_result("r1", &CacheOptions::new()).await.unwrap(),
        None
    );
    assert_eq!(
        h.caching.get_route_result("r2", &CacheOptions::new()).await.unwrap(),
        Some(json!("r2"))
    );
}

#[tokio::test]
async fn delete_purges_before_the_route_ids_are_released() {
    let h = Harness::new(5);
    let ctx = CallContext::background();
    h.modules
        .load_or_create_and_configure(&ctx, &Project::new("acme").with_route(cached_route("r1", 0)))
        .await
        .unwrap();
    h.caching
        .set_route_result(&cached_route("r1", 0), &CacheOptions::new(), json!("acme"))
        .await
        .unwrap();

    h.modules.delete("acme").await.unwrap();
    let events = h.log.events();
    let purged = events.iter().position(|e| e == "cache.purge:r1").unwrap();
    let released = events.iter().position(|e| e == "routes.delete:acme").unwrap();
    assert!(purged < released);

    // A tenant claiming the id afterwards keeps what it caches.
    h.modules
        .load_or_create_and_configure(&ctx, &Project::new("globex").with_route(cached_route("r1", 0)))
        .await
        .unwrap();
    h.caching
        .set_route_result(&cached_route("r1", 0), &CacheOptions::new(), json!("globex"))
        .await
        .unwrap();
    assert_eq!(
        h.caching.get_route_result("r1", &CacheOptions::new()).await.unwrap(),
        Some(json!("globex"))
    );
}
