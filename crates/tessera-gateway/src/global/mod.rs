//! In-memory implementations of the global modules.
//!
//! | Kernel contract | Implementation |
//! |-----------------|----------------|
//! | [`DomainTracker`](tessera_kernel::DomainTracker) | [`DomainRegistry`] |
//! | [`RouteTable`](tessera_kernel::RouteTable) | [`RoutingTable`] |
//! | [`CacheInvalidation`](tessera_kernel::CacheInvalidation) | [`Caching`] over a [`MemoryCacheStore`] |

mod caching;
mod letsencrypt;
mod memory_store;
mod routing;

pub use caching::{CacheConfig, Caching};
pub use letsencrypt::DomainRegistry;
pub use memory_store::MemoryCacheStore;
pub use routing::RoutingTable;
