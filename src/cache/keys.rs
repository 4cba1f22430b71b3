//! Cache key fingerprints.
//!
//! A key is `prefix:hex(sha256(canonical(operation, positional, keyword)))`.
//! Keyword arguments are sorted by name and JSON objects are written with
//! sorted members, so the digest depends only on the values passed and never
//! on insertion order or on `serde_json` map features enabled elsewhere.

use serde_json::Value;
use sha2::{Digest, Sha256};

/// Derive the cache key for one logical call.
///
/// `namespace` is used verbatim as the key prefix. Only caller-meaningful
/// arguments belong in `positional`/`keyword`; resolver context never does.
pub fn fingerprint(
    namespace: &str,
    operation: &str,
    positional: &[Value],
    keyword: &[(String, Value)],
) -> String {
    let mut sorted: Vec<&(String, Value)> = keyword.iter().collect();
    sorted.sort_by(|left, right| left.0.cmp(&right.0));

    let mut canonical = String::new();
    canonical.push('[');
    write_canonical(&Value::String(operation.to_string()), &mut canonical);
    canonical.push_str(",[");
    for (index, value) in positional.iter().enumerate() {
        if index > 0 {
            canonical.push(',');
        }
        write_canonical(value, &mut canonical);
    }
    canonical.push_str("],[");
    for (index, (name, value)) in sorted.into_iter().enumerate() {
        if index > 0 {
            canonical.push(',');
        }
        canonical.push('[');
        write_canonical(&Value::String(name.clone()), &mut canonical);
        canonical.push(',');
        write_canonical(value, &mut canonical);
        canonical.push(']');
    }
    canonical.push_str("]]");

    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    format!("{namespace}:{}", hex::encode(hasher.finalize()))
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut members: Vec<(&String, &Value)> = map.iter().collect();
            members.sort_by(|left, right| left.0.cmp(right.0));
            out.push('{');
            for (index, (name, inner)) in members.into_iter().enumerate() {
                if index > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(name.clone()).to_string());
                out.push(':');
                write_canonical(inner, out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (index, inner) in items.iter().enumerate() {
                if index > 0 {
                    out.push(',');
                }
                write_canonical(inner, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

/// Caller-meaningful arguments of a cached call.
///
/// `entity_id` is not hashed separately; it is copied into the readable part
/// of the key so id-scoped invalidation patterns can find single-entity
/// entries.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallArgs {
    positional: Vec<Value>,
    keyword: Vec<(String, Value)>,
    entity_id: Option<String>,
}

impl CallArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn positional(mut self, value: impl Into<Value>) -> Self {
        self.positional.push(value.into());
        self
    }

    /// Add a keyword argument; a repeated name replaces the earlier value.
    pub fn keyword(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        let name = name.into();
        let value = value.into();
        match self.keyword.iter_mut().find(|entry| entry.0 == name) {
            Some(slot) => slot.1 = value,
            None => self.keyword.push((name, value)),
        }
        self
    }

    /// Positional id of a single-entity lookup.
    pub fn entity(mut self, id: i64) -> Self {
        self.positional.push(Value::from(id));
        self.entity_id = Some(id.to_string());
        self
    }

    pub fn positional_args(&self) -> &[Value] {
        &self.positional
    }

    pub fn keyword_args(&self) -> &[(String, Value)] {
        &self.keyword
    }

    pub fn entity_id(&self) -> Option<&str> {
        self.entity_id.as_deref()
    }

    /// Full key for these arguments under `{namespace}:{key_prefix}`.
    pub fn cache_key(&self, namespace: &str, key_prefix: &str, operation: &str) -> String {
        let scope = match self.entity_id.as_deref() {
            Some(id) => format!("{namespace}:{key_prefix}:{id}"),
            None => format!("{namespace}:{key_prefix}"),
        };
        fingerprint(&scope, operation, &self.positional, &self.keyword)
    }
}

/// Typed argument sets that describe themselves for fingerprinting.
pub trait CacheArgs {
    fn call_args(&self) -> CallArgs;
}

impl CacheArgs for CallArgs {
    fn call_args(&self) -> CallArgs {
        self.clone()
    }
}

impl CacheArgs for () {
    fn call_args(&self) -> CallArgs {
        CallArgs::new()
    }
}

/// Argument set of a lookup by numeric id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ById(pub i64);

impl CacheArgs for ById {
    fn call_args(&self) -> CallArgs {
        CallArgs::new().entity(self.0)
    }
}
