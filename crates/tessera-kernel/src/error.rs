//! Error taxonomy of the gateway core.
//!
//! [`GatewayError`] is shared by every contract in this crate so that the
//! registry can surface collaborator failures verbatim.  The variants map
//! one-to-one onto the caller-visible classes:
//!
//! | Variant | Recoverable? | Status |
//! |---------|--------------|--------|
//! | `NotFound` | yes, callers usually create then retry | 404 |
//! | `PolicyDenied` | no, terminal for the creation attempt | 403 |
//! | `Configuration` / `ConfigurationFailures` | per apply mode | 400 |
//! | `InvalidRequest` | no | 400 |
//! | `HookFailure` | no, the integration owns the outcome | hook status |
//! | `Unauthorized` | no | 401 |
//! | `Internal` | no | 500 |

use std::fmt;
use thiserror::Error;

/// One facet of a tenant's configuration, used to tag apply failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Facet {
    /// Authorization rules and project settings of the engine.
    Auth,
    /// TLS-domain whitelist held by the domain tracker.
    LetsEncrypt,
    /// Ingress routes held by the route table.
    IngressRoutes,
    /// Route-independent header operations held by the route table.
    IngressGlobal,
    /// Database cache invalidation rules held by the caching module.
    CacheRules,
}

impl Facet {
    pub fn as_str(&self) -> &'static str {
        match self {
            Facet::Auth => "auth",
            Facet::LetsEncrypt => "letsencrypt",
            Facet::IngressRoutes => "ingress-routes",
            Facet::IngressGlobal => "ingress-global",
            Facet::CacheRules => "cache-rules",
        }
    }
}

impl fmt::Display for Facet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single facet that failed during a best-effort apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FacetFailure {
    pub facet: Facet,
    pub message: String,
}

impl fmt::Display for FacetFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.facet, self.message)
    }
}

/// Error type for every registry, module and collaborator operation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum GatewayError {
    /// The tenant has no active module.
    #[error("project ({0}) not found in server state")]
    NotFound(String),

    /// The administrative manager refused to create the tenant.
    #[error("{0}")]
    PolicyDenied(String),

    /// A collaborator rejected one facet of a tenant's configuration.
    #[error("project ({tenant}): invalid {facet} config: {message}")]
    Configuration {
        tenant: String,
        facet: Facet,
        message: String,
    },

    /// One or more facets failed during a best-effort apply.
    #[error("project ({tenant}): {} config facet(s) failed to apply", .failures.len())]
    ConfigurationFailures {
        tenant: String,
        failures: Vec<FacetFailure>,
    },

    /// An integration hijacked the request and reported an error.
    #[error("integration ({integration}) hook ({hook}) rejected the request: {message}")]
    HookFailure {
        integration: String,
        hook: String,
        status: u16,
        message: String,
    },

    /// Malformed input that is not tied to one tenant facet.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Missing or invalid credentials.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("{0}")]
    Internal(String),
}

impl GatewayError {
    /// Shorthand for a [`GatewayError::Configuration`].
    pub fn configuration(
        tenant: impl Into<String>,
        facet: Facet,
        message: impl Into<String>,
    ) -> Self {
        GatewayError::Configuration {
            tenant: tenant.into(),
            facet,
            message: message.into(),
        }
    }

    /// HTTP status a transport layer should answer with.
    pub fn status_code(&self) -> u16 {
        match self {
            GatewayError::NotFound(_) => 404,
            GatewayError::PolicyDenied(_) => 403,
            GatewayError::Configuration { .. }
            | GatewayError::ConfigurationFailures { .. }
            | GatewayError::InvalidRequest(_) => 400,
            GatewayError::HookFailure { status, .. } => *status,
            GatewayError::Unauthorized(_) => 401,
            GatewayError::Internal(_) => 500,
        }
    }

    /// `true` for the create-then-retry signal.
    pub fn is_not_found(&self) -> bool {
        matches!(self, GatewayError::NotFound(_))
    }
}

/// Convenience alias used across the workspace.
pub type GatewayResult<T> = Result<T, GatewayError>;
