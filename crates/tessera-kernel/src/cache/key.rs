//! Deterministic, collision-free cache key derivation.
//!
//! ```text
//! route_resource_prefix(c)     = c :: ingress-route
//! route_prefix(c, r)           = c :: ingress-route :: r
//! route_variant_key(c, r, o)   = c :: ingress-route :: r :: canonical(o)
//! ```
//!
//! Every segment is escaped (`%` → `%25`, `:` → `%3A`) before joining, so the
//! separator never occurs inside a segment.  Prefix matching through
//! [`KeyPrefix::matches`] is segment-aware: route `r1` does not cover `r10`.

use serde_json::Value;
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;

/// Separator between key segments.
pub const SEPARATOR: &str = "::";

/// Kind of cached resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ResourceKind {
    /// Result of resolving an ingress route.
    IngressRoute,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::IngressRoute => "ingress-route",
        }
    }
}

/// Escape one segment so it cannot contain [`SEPARATOR`].
pub fn escape_segment(raw: &str) -> Cow<'_, str> {
    if !raw.contains(['%', ':']) {
        return Cow::Borrowed(raw);
    }
    let mut out = String::with_capacity(raw.len() + 8);
    for ch in raw.chars() {
        match ch {
            '%' => out.push_str("%25"),
            ':' => out.push_str("%3A"),
            other => out.push(other),
        }
    }
    Cow::Owned(out)
}

/// A complete cache key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this key lies under `prefix` (segment-aware).
    pub fn is_under(&self, prefix: &KeyPrefix) -> bool {
        prefix.matches(&self.0)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A key prefix addressing one level of the hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyPrefix(String);

impl KeyPrefix {
    fn root(segment: &str) -> Self {
        Self(escape_segment(segment).into_owned())
    }

    fn child(&self, segment: &str) -> Self {
        Self(format!("{}{SEPARATOR}{}", self.0, escape_segment(segment)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `true` when `key` equals this prefix or continues it with a
    /// separator.  A raw `starts_with` would let `…::r1` cover `…::r10`.
    pub fn matches(&self, key: &str) -> bool {
        match key.strip_prefix(self.0.as_str()) {
            Some(rest) => rest.is_empty() || rest.starts_with(SEPARATOR),
            None => false,
        }
    }

    /// Lower bound of the ordered key range covered by this prefix.
    pub fn range_start(&self) -> String {
        self.0.clone()
    }
}

impl fmt::Display for KeyPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Cache-relevant options of a request, keyed by option name.
///
/// Stored ordered so that insertion order never affects the key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CacheOptions(BTreeMap<String, Value>);

impl CacheOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: add an option.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Canonical serialization: a JSON object with keys sorted at every
    /// nesting level, independent of how the values were built.
    pub fn fingerprint(&self) -> String {
        let mut out = String::new();
        out.push('{');
        for (i, (name, value)) in self.0.iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            write_json_string(name, &mut out);
            out.push(':');
            write_canonical(value, &mut out);
        }
        out.push('}');
        out
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for CacheOptions {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

fn write_json_string(s: &str, out: &mut String) {
    // Serializing a &str cannot fail.
    out.push_str(&serde_json::to_string(s).unwrap_or_default());
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let sorted: BTreeMap<&String, &Value> = map.iter().collect();
            out.push('{');
            for (i, (k, v)) in sorted.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_json_string(k, out);
                out.push(':');
                write_canonical(v, out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, v) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(v, out);
            }
            out.push(']');
        }
        Value::String(s) => write_json_string(s, out),
        scalar => out.push_str(&scalar.to_string()),
    }
}

/// `cluster :: ingress-route`
pub fn route_resource_prefix(cluster_id: &str) -> KeyPrefix {
    KeyPrefix::root(cluster_id).child(ResourceKind::IngressRoute.as_str())
}

/// `cluster :: ingress-route :: route`
pub fn route_prefix(cluster_id: &str, route_id: &str) -> KeyPrefix {
    route_resource_prefix(cluster_id).child(route_id)
}

/// `cluster :: ingress-route :: route :: canonical(options)`
pub fn route_variant_key(cluster_id: &str, route_id: &str, options: &CacheOptions) -> CacheKey {
    CacheKey(route_prefix(cluster_id, route_id).child(&options.fingerprint()).0)
}
