//! TLS-domain whitelist shared by all tenants.

use parking_lot::RwLock;
use std::collections::HashMap;
use tessera_kernel::{DomainTracker, Facet, GatewayError, GatewayResult, LetsEncrypt};
use tracing::debug;

/// [`DomainTracker`] keeping each tenant's domains behind one lock.
///
/// A domain belongs to at most one tenant; claiming a domain another tenant
/// already holds is rejected. The ownership check and the insert run under
/// the same write guard, so two tenants never both claim a domain.
#[derive(Default)]
pub struct DomainRegistry {
    domains: RwLock<HashMap<String, Vec<String>>>,
}

impl DomainRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every whitelisted domain across tenants, sorted.
    pub fn whitelist(&self) -> Vec<String> {
        let mut all: Vec<String> = self.domains.read().values().flatten().cloned().collect();
        all.sort();
        all.dedup();
        all
    }

    /// Tenant holding `domain`, if any.
    pub fn owner_of(&self, domain: &str) -> Option<String> {
        owner_in(&self.domains.read(), domain)
    }
}

fn owner_in(domains: &HashMap<String, Vec<String>>, domain: &str) -> Option<String> {
    domains
        .iter()
        .find(|(_, held)| held.iter().any(|d| d == domain))
        .map(|(tenant, _)| tenant.clone())
}

fn validate_domain(domain: &str) -> Result<String, String> {
    let domain = domain.trim().to_ascii_lowercase();
    if domain.is_empty() {
        return Err("empty domain".to_string());
    }
    if domain.contains("://") || domain.contains('/') {
        return Err(format!("domain ({domain}) must not contain a scheme or path"));
    }
    if domain.chars().any(char::is_whitespace) || domain.starts_with('.') || domain.ends_with('.')
    {
        return Err(format!("domain ({domain}) is malformed"));
    }
    Ok(domain)
}

impl DomainTracker for DomainRegistry {
    fn set_project_domains(&self, tenant: &str, config: &LetsEncrypt) -> GatewayResult<()> {
        let mut domains = Vec::with_capacity(config.domains.len());
        for raw in &config.domains {
            let domain = validate_domain(raw)
                .map_err(|msg| GatewayError::configuration(tenant, Facet::LetsEncrypt, msg))?;
            if !domains.contains(&domain) {
                domains.push(domain);
            }
        }

        let mut held = self.domains.write();
        for domain in &domains {
            if let Some(owner) = owner_in(&held, domain).filter(|owner| owner != tenant) {
                return Err(GatewayError::configuration(
                    tenant,
                    Facet::LetsEncrypt,
                    format!("domain ({domain}) is already used by project ({owner})"),
                ));
            }
        }

        debug!(tenant = %tenant, count = domains.len(), "letsencrypt domains set");
        held.insert(tenant.to_string(), domains);
        Ok(())
    }

    fn delete_project_domains(&self, tenant: &str) -> GatewayResult<()> {
        if self.domains.write().remove(tenant).is_some() {
            debug!(tenant = %tenant, "letsencrypt domains removed");
        }
        Ok(())
    }

    fn project_domains(&self, tenant: &str) -> Vec<String> {
        self.domains.read().get(tenant).cloned().unwrap_or_default()
    }
}
