//! Wiring of a gateway node from its settings.

use crate::engine::RuleEngineFactory;
use crate::global::{Caching, DomainRegistry, MemoryCacheStore, RoutingTable};
use crate::integration::IntegrationManager;
use crate::managers::{HttpSyncManager, StaticAdminManager};
use crate::modules::{InitialLoadReport, Modules};
use crate::server::{AppState, TesseraServer};
use std::sync::Arc;
use std::time::Duration;
use tessera_kernel::settings::GatewaySettings;
use tessera_kernel::{CallContext, GatewayResult, GlobalModules, IntegrationProvider, Managers};

/// Every long-lived component of one node.
pub struct Gateway {
    pub modules: Arc<Modules>,
    pub integrations: Arc<IntegrationManager>,
    pub caching: Arc<Caching>,
    pub routing: Arc<RoutingTable>,
    pub domains: Arc<DomainRegistry>,
    settings: GatewaySettings,
}

impl Gateway {
    /// Build the node's managers, global modules and registry, and register
    /// the configured hooks.
    pub fn from_settings(settings: GatewaySettings) -> GatewayResult<Self> {
        let timeout = Duration::from_secs(settings.request_timeout_secs);

        let admin = Arc::new(
            StaticAdminManager::new(settings.admin.secret.clone(), settings.admin.max_projects)
                .with_internal_token(settings.admin.internal_token.clone()),
        );
        let integrations = Arc::new(IntegrationManager::new(admin.clone()));
        integrations.set_hook_config(settings.hooks.clone())?;
        let managers = Managers::new(
            admin,
            Arc::new(HttpSyncManager::new(timeout)),
            integrations.clone(),
        );

        let domains = Arc::new(DomainRegistry::new());
        let routing = Arc::new(RoutingTable::new());
        let caching = Arc::new(Caching::new(
            settings.cluster_id.clone(),
            Arc::new(MemoryCacheStore::new()),
        ));
        let globals = GlobalModules::new(domains.clone(), routing.clone(), caching.clone());

        let modules = Arc::new(Modules::new(
            settings.cluster_id.clone(),
            settings.node_id.clone(),
            managers,
            globals,
            Arc::new(RuleEngineFactory),
        ));

        Ok(Self {
            modules,
            integrations,
            caching,
            routing,
            domains,
            settings,
        })
    }

    pub fn settings(&self) -> &GatewaySettings {
        &self.settings
    }

    /// Apply the projects listed in the settings.
    pub async fn load_initial_projects(&self) -> GatewayResult<InitialLoadReport> {
        self.modules
            .set_initial_config(&CallContext::background(), &self.settings.projects)
            .await
    }

    pub fn app_state(&self) -> AppState {
        AppState {
            modules: self.modules.clone(),
            integrations: self.integrations.clone(),
            caching: self.caching.clone(),
            request_timeout: Duration::from_secs(self.settings.request_timeout_secs),
        }
    }

    pub fn into_server(self) -> TesseraServer {
        TesseraServer::new(self.settings.port, self.app_state())
    }
}
