//! Tenant configuration as pushed by the control plane.
//!
//! A [`Project`] bundles every facet of one tenant's configuration.  The
//! registry hands the whole bundle to the tenant's module on initial load and
//! individual facets on incremental updates.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

fn default_context_time() -> u64 {
    10
}

/// Project-level settings consumed by the authorization engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Tenant id; the registry key.
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// Secrets used to validate end-user tokens.
    #[serde(default)]
    pub secrets: Vec<String>,
    /// Default per-request deadline in seconds.
    #[serde(default = "default_context_time")]
    pub context_time_secs: u64,
}

impl ProjectConfig {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            secrets: Vec::new(),
            context_time_secs: default_context_time(),
        }
    }
}

/// Decision rule attached to one `(resource, op)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "lowercase")]
pub enum Rule {
    Allow,
    Deny,
    /// Delegate the decision to a remote endpoint; a successful reply allows.
    Webhook { url: String },
}

/// Authorization rules: `resource -> op -> rule`.  The op `*` matches any
/// operation on the resource.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub rules: BTreeMap<String, BTreeMap<String, Rule>>,
}

impl AuthConfig {
    pub fn with_rule(mut self, resource: impl Into<String>, op: impl Into<String>, rule: Rule) -> Self {
        self.rules
            .entry(resource.into())
            .or_default()
            .insert(op.into(), rule);
        self
    }

    /// Rule for `(resource, op)`, falling back to the resource wildcard.
    pub fn rule_for(&self, resource: &str, op: &str) -> Option<&Rule> {
        let ops = self.rules.get(resource)?;
        ops.get(op).or_else(|| ops.get("*"))
    }
}

/// TLS-domain whitelist for certificate issuance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LetsEncrypt {
    #[serde(default)]
    pub domains: Vec<String>,
}

impl LetsEncrypt {
    pub fn new(domains: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            domains: domains.into_iter().map(Into::into).collect(),
        }
    }
}

/// Incoming side of an ingress route.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteSource {
    /// Hosts the route answers for; empty means any host.
    #[serde(default)]
    pub hosts: Vec<String>,
    /// Accepted methods; empty means any method.
    #[serde(default)]
    pub methods: Vec<String>,
    /// Path prefix, must begin with `/`.
    pub url: String,
}

/// Upstream the route forwards to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteTarget {
    pub host: String,
    pub port: u16,
    #[serde(default = "default_scheme")]
    pub scheme: String,
    #[serde(default = "default_weight")]
    pub weight: u32,
}

fn default_scheme() -> String {
    "http".to_string()
}

fn default_weight() -> u32 {
    100
}

impl RouteTarget {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            scheme: default_scheme(),
            weight: default_weight(),
        }
    }
}

/// Caching of a route's resolution result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteCacheConfig {
    /// Seconds before an entry expires; `0` keeps the entry until purged.
    #[serde(default)]
    pub ttl_secs: u64,
    /// Request fields that distinguish cached variants of the route.
    #[serde(default)]
    pub options: Vec<String>,
}

/// A tenant-owned ingress route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngressRoute {
    pub id: String,
    pub source: RouteSource,
    #[serde(default)]
    pub targets: Vec<RouteTarget>,
    #[serde(default)]
    pub cache: Option<RouteCacheConfig>,
}

impl IngressRoute {
    pub fn new(id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            source: RouteSource {
                url: url.into(),
                ..RouteSource::default()
            },
            targets: Vec::new(),
            cache: None,
        }
    }

    pub fn with_target(mut self, target: RouteTarget) -> Self {
        self.targets.push(target);
        self
    }

    pub fn with_cache(mut self, cache: RouteCacheConfig) -> Self {
        self.cache = Some(cache);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeaderOpKind {
    Set,
    Add,
    Delete,
}

/// A header manipulation applied to requests or responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderOp {
    pub key: String,
    #[serde(default)]
    pub value: String,
    pub op: HeaderOpKind,
}

/// Header operations applied to every route of a tenant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalRoutesConfig {
    #[serde(default)]
    pub request_headers: Vec<HeaderOp>,
    #[serde(default)]
    pub response_headers: Vec<HeaderOp>,
}

/// Cache rule for one `db/collection` pair.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DbCacheRule {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub ttl_secs: u64,
    /// Purge cached reads eagerly when the collection is written.
    #[serde(default)]
    pub invalidate_on_write: bool,
}

/// Database cache rules keyed by `db/collection`.
pub type DatabaseCacheRules = BTreeMap<String, DbCacheRule>;

/// Complete configuration of one tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub config: ProjectConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub letsencrypt: LetsEncrypt,
    #[serde(default)]
    pub ingress_routes: Vec<IngressRoute>,
    #[serde(default)]
    pub ingress_global: GlobalRoutesConfig,
    #[serde(default)]
    pub database_rules: DatabaseCacheRules,
}

impl Project {
    /// Empty configuration for tenant `id`.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            config: ProjectConfig::new(id),
            auth: AuthConfig::default(),
            letsencrypt: LetsEncrypt::default(),
            ingress_routes: Vec::new(),
            ingress_global: GlobalRoutesConfig::default(),
            database_rules: DatabaseCacheRules::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.config.id
    }

    pub fn with_auth(mut self, auth: AuthConfig) -> Self {
        self.auth = auth;
        self
    }

    pub fn with_domains(mut self, letsencrypt: LetsEncrypt) -> Self {
        self.letsencrypt = letsencrypt;
        self
    }

    pub fn with_route(mut self, route: IngressRoute) -> Self {
        self.ingress_routes.push(route);
        self
    }

    pub fn with_db_rule(mut self, key: impl Into<String>, rule: DbCacheRule) -> Self {
        self.database_rules.insert(key.into(), rule);
        self
    }
}
