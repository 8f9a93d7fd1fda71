//! Cache key generation.

use crate::types::{HttpMethod, ProxyRequest};
use crate::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

const DELIMITER: char = ':';

/// Fingerprint of a logical request: `METHOD:endpoint:body:params`.
///
/// Kept human-readable (not hashed) so that endpoint invalidation can work
/// with plain prefixes such as `GET:/admin/users`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }
    pub fn as_str(&self) -> &str {
        &self.0
    }
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CacheKey {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}
impl From<String> for CacheKey {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// Derives [`CacheKey`]s.
///
/// Object keys in the body and query parameters are sorted before
/// serializing, so requests that differ only in key insertion order share
/// a cache entry.
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheKeyGenerator;

impl CacheKeyGenerator {
    pub fn new() -> Self {
        Self
    }

    pub fn generate(
        &self,
        method: HttpMethod,
        endpoint: &str,
        body: Option<&Value>,
        query_params: Option<&BTreeMap<String, String>>,
    ) -> CacheKey {
        let body = match body {
            None | Some(Value::Null) => "{}".to_string(),
            Some(v) => canonical_json(v),
        };
        let params = match query_params {
            None => "{}".to_string(),
            Some(p) => canonical_json(&serde_json::json!(p)),
        };
        CacheKey(format!(
            "{}{d}{}{d}{}{d}{}",
            method.as_str(),
            endpoint,
            body,
            params,
            d = DELIMITER
        ))
    }

    pub fn generate_for(&self, request: &ProxyRequest) -> Result<CacheKey> {
        Ok(self.generate(
            request.http_method()?,
            &request.endpoint,
            request.body.as_ref(),
            request.query_params.as_ref(),
        ))
    }

    /// Prefix shared by every key for `method` on endpoints starting with `endpoint_prefix`.
    pub fn prefix(&self, method: HttpMethod, endpoint_prefix: &str) -> String {
        format!("{}{}{}", method.as_str(), DELIMITER, endpoint_prefix)
    }
}

/// Compact JSON with object keys in sorted order at every depth.
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            out.push('{');
            for (i, (k, v)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                // Serializing a &String cannot fail.
                out.push_str(&serde_json::to_string(k).unwrap_or_default());
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
        scalar => out.push_str(&scalar.to_string()),
    }
}
