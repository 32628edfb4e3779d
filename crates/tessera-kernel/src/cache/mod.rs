//! Cache key namespace and cache store contract.
//!
//! Keys are hierarchical (`cluster :: resource :: route :: variant`) so that
//! purges are single prefix matches.  See [`key`] for the escaping rules that
//! keep levels unambiguous.

pub mod key;
pub mod store;

pub use key::{
    CacheKey, CacheOptions, KeyPrefix, ResourceKind, SEPARATOR, escape_segment,
    route_prefix, route_resource_prefix, route_variant_key,
};
pub use store::{CacheStore, ConnectionState, KeyKind};
