use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tessera_gateway::modules::UPGRADE_MESSAGE;
use tessera_kernel::{GatewayError, ProjectConfig};
use tessera_testing::{FakeAdmin, Harness};

#[tokio::test]
async fn lookup_of_unregistered_tenant_is_not_found_and_mutates_nothing() {
    let h = Harness::new(5);

    for tenant in ["acme", "globex", ""] {
        let err = h.modules.load_module(tenant).await.unwrap_err();
        assert_eq!(err, GatewayError::NotFound(tenant.to_string()));
    }
    assert!(h.modules.tenant_ids().await.is_empty());
    assert_eq!(h.engines.created(), 0);
    assert_eq!(h.admin.check_count(), 0);
    assert!(h.log.events().is_empty());
}

#[tokio::test]
async fn getters_never_create() {
    let h = Harness::new(5);
    assert!(h.modules.auth("acme").await.unwrap_err().is_not_found());
    assert!(h.modules.ingress_routes("acme").await.unwrap_err().is_not_found());
    assert!(h.modules.letsencrypt_domains("acme").await.unwrap_err().is_not_found());
    assert!(h.modules.global_route_config("acme").await.unwrap_err().is_not_found());
    assert!(h.modules.is_empty().await);
}

#[tokio::test]
async fn same_instance_until_delete() {
    let h = Harness::new(5);
    let created = h.modules.new_module(&ProjectConfig::new("acme")).await.unwrap();

    for _ in 0..3 {
        let loaded = h.modules.load_module("acme").await.unwrap();
        assert!(Arc::ptr_eq(&created, &loaded));
    }

    h.modules.delete("acme").await.unwrap();
    assert!(h.modules.load_module("acme").await.unwrap_err().is_not_found());

    let recreated = h.modules.new_module(&ProjectConfig::new("acme")).await.unwrap();
    assert!(!Arc::ptr_eq(&created, &recreated));
    assert_eq!(h.engines.created(), 2);
}

#[tokio::test]
async fn delete_is_idempotent() {
    let h = Harness::new(5);
    h.modules.delete("ghost").await.unwrap();
    h.modules.delete("ghost").await.unwrap();

    h.modules.new_module(&ProjectConfig::new("acme")).await.unwrap();
    h.modules.delete("acme").await.unwrap();
    h.modules.delete("acme").await.unwrap();

    let engine = h.engines.engine("acme").unwrap();
    assert_eq!(engine.close_count(), 1);
    assert!(h.modules.is_empty().await);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_creations_build_one_module() {
    let h = Harness::with_admin(FakeAdmin::new(5).with_check_delay(Duration::from_millis(2)));
    let modules = h.modules.clone();

    let attempts: Vec<_> = (0..16)
        .map(|_| {
            let modules = modules.clone();
            tokio::spawn(async move { modules.new_module(&ProjectConfig::new("acme")).await })
        })
        .collect();

    let built: Vec<_> = join_all(attempts)
        .await
        .into_iter()
        .map(|joined| joined.unwrap().unwrap())
        .collect();

    assert_eq!(h.engines.created(), 1);
    assert_eq!(h.log.matching("engine.create"), ["engine.create:acme"]);
    assert!(built.iter().all(|m| Arc::ptr_eq(m, &built[0])));
    assert_eq!(h.modules.tenant_ids().await, ["acme"]);
}

#[tokio::test]
async fn denied_creation_surfaces_upgrade_message() {
    let h = Harness::new(1);
    h.modules.new_module(&ProjectConfig::new("acme")).await.unwrap();

    let err = h
        .modules
        .new_module(&ProjectConfig::new("globex"))
        .await
        .unwrap_err();
    assert_eq!(err, GatewayError::PolicyDenied(UPGRADE_MESSAGE.to_string()));
    assert_eq!(err.to_string(), "upgrade your plan to create new project");
    assert_eq!(h.engines.created(), 1);

    // The policy saw the registered tenants at the time of the request.
    let snapshots = h.admin.snapshots.lock().clone();
    assert_eq!(snapshots, vec![Vec::<String>::new(), vec!["acme".to_string()]]);
}

#[tokio::test]
async fn engine_construction_failure_leaves_no_entry() {
    let h = Harness::new(5);
    h.engines.fail_create_for("acme");

    let err = h.modules.new_module(&ProjectConfig::new("acme")).await.unwrap_err();
    assert_eq!(err.status_code(), 500);
    assert!(h.modules.load_module("acme").await.unwrap_err().is_not_found());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_tenants_never_overshoot_the_limit() {
    let h = Harness::with_admin(FakeAdmin::new(1).with_check_delay(Duration::from_millis(2)));
    let modules = h.modules.clone();

    let attempts: Vec<_> = (0..8)
        .map(|i| {
            let modules = modules.clone();
            let tenant = format!("tenant-{i}");
            tokio::spawn(async move { modules.new_module(&ProjectConfig::new(tenant)).await })
        })
        .collect();

    let results: Vec<_> = join_all(attempts)
        .await
        .into_iter()
        .map(|joined| joined.unwrap())
        .collect();

    let created: Vec<_> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
    assert_eq!(created.len(), 1);
    for err in results.iter().filter_map(|r| r.as_ref().err()) {
        assert_eq!(*err, GatewayError::PolicyDenied(UPGRADE_MESSAGE.to_string()));
    }

    let winner = created[0].tenant_id().to_string();
    assert_eq!(h.modules.tenant_ids().await, [winner.clone()]);
    assert_eq!(h.engines.created(), 1);

    // Each check saw every creation that finished before it.
    let snapshots = h.admin.snapshots.lock().clone();
    assert_eq!(snapshots.len(), 8);
    assert!(snapshots[0].is_empty());
    assert!(snapshots[1..].iter().all(|s| *s == [winner.clone()]));
}
