//! Ingress route table.

use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use tessera_kernel::{
    Facet, GatewayError, GatewayResult, GlobalRoutesConfig, IngressRoute, RouteTable,
};
use tracing::debug;

/// [`RouteTable`] holding every tenant's routes and global header config.
///
/// Route ids are unique across tenants: cache keys are addressed by route id,
/// so a shared id would let one tenant's purge reach another's entries.
#[derive(Default)]
pub struct RoutingTable {
    routes: RwLock<HashMap<String, Vec<IngressRoute>>>,
    globals: RwLock<HashMap<String, GlobalRoutesConfig>>,
}

impl RoutingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tenant owning `route_id`, if any.
    pub fn route_owner(&self, route_id: &str) -> Option<String> {
        self.routes
            .read()
            .iter()
            .find(|(_, routes)| routes.iter().any(|r| r.id == route_id))
            .map(|(tenant, _)| tenant.clone())
    }

    /// Number of routes across all tenants.
    pub fn len(&self) -> usize {
        self.routes.read().values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn validate_route(route: &IngressRoute) -> Result<(), String> {
    if route.id.is_empty() {
        return Err("route id must not be empty".to_string());
    }
    if !route.source.url.starts_with('/') {
        return Err(format!(
            "route ({}) url ({}) must begin with '/'",
            route.id, route.source.url
        ));
    }
    if route.targets.is_empty() {
        return Err(format!("route ({}) has no targets", route.id));
    }
    if let Some(target) = route.targets.iter().find(|t| t.host.is_empty() || t.port == 0) {
        return Err(format!(
            "route ({}) has an invalid target ({}:{})",
            route.id, target.host, target.port
        ));
    }
    Ok(())
}

impl RouteTable for RoutingTable {
    fn set_project_routes(&self, tenant: &str, routes: &[IngressRoute]) -> GatewayResult<()> {
        let invalid = |msg: String| GatewayError::configuration(tenant, Facet::IngressRoutes, msg);

        let mut ids = HashSet::with_capacity(routes.len());
        for route in routes {
            validate_route(route).map_err(invalid)?;
            if !ids.insert(route.id.as_str()) {
                return Err(invalid(format!("duplicate route id ({})", route.id)));
            }
        }

        let mut table = self.routes.write();
        for (owner, owned) in table.iter().filter(|(owner, _)| owner.as_str() != tenant) {
            if let Some(clash) = owned.iter().find(|r| ids.contains(r.id.as_str())) {
                return Err(invalid(format!(
                    "route id ({}) is already used by project ({owner})",
                    clash.id
                )));
            }
        }

        debug!(tenant = %tenant, count = routes.len(), "ingress routes set");
        table.insert(tenant.to_string(), routes.to_vec());
        Ok(())
    }

    fn delete_project_routes(&self, tenant: &str) {
        self.routes.write().remove(tenant);
        self.globals.write().remove(tenant);
    }

    fn set_global_config(&self, tenant: &str, config: &GlobalRoutesConfig) {
        self.globals
            .write()
            .insert(tenant.to_string(), config.clone());
    }

    fn project_routes(&self, tenant: &str) -> Vec<IngressRoute> {
        self.routes.read().get(tenant).cloned().unwrap_or_default()
    }

    fn global_config(&self, tenant: &str) -> GlobalRoutesConfig {
        self.globals.read().get(tenant).cloned().unwrap_or_default()
    }
}
