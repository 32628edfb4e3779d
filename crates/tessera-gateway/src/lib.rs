//! `tessera-gateway`: runtime of the Tessera multi-tenant gateway core.
//!
//! Concrete implementations of the contracts in `tessera-kernel`:
//!
//! | Kernel contract | Implementation |
//! |-----------------|----------------|
//! | [`AuthorizationEngine`] / [`EngineFactory`] | [`engine::RuleEngine`] / [`engine::RuleEngineFactory`] |
//! | [`IntegrationProvider`] / [`IntegrationHook`] | [`integration::IntegrationManager`] / [`integration::HttpHook`] |
//! | [`AdminManager`] / [`SyncManager`] | [`managers::StaticAdminManager`] / [`managers::HttpSyncManager`] |
//! | [`DomainTracker`] / [`RouteTable`] / [`CacheInvalidation`] | [`global::DomainRegistry`] / [`global::RoutingTable`] / [`global::Caching`] |
//! | [`CacheStore`](tessera_kernel::cache::CacheStore) | [`global::MemoryCacheStore`] |
//!
//! [`modules::Modules`] is the per-tenant registry; [`server::TesseraServer`]
//! exposes it over axum.  [`bootstrap::Gateway`] wires a node from its
//! settings.
//!
//! [`AuthorizationEngine`]: tessera_kernel::AuthorizationEngine
//! [`EngineFactory`]: tessera_kernel::EngineFactory
//! [`IntegrationProvider`]: tessera_kernel::IntegrationProvider
//! [`IntegrationHook`]: tessera_kernel::IntegrationHook
//! [`AdminManager`]: tessera_kernel::AdminManager
//! [`SyncManager`]: tessera_kernel::SyncManager
//! [`DomainTracker`]: tessera_kernel::DomainTracker
//! [`RouteTable`]: tessera_kernel::RouteTable
//! [`CacheInvalidation`]: tessera_kernel::CacheInvalidation

pub mod bootstrap;
pub mod engine;
pub mod error;
pub mod global;
pub mod integration;
pub mod managers;
pub mod modules;
pub mod server;

// Re-export the kernel for convenience.
pub use tessera_kernel as kernel;
