//! Response envelope returned for every proxied call.

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const STATUS_TEXT_OK: &str = "OK";
pub const STATUS_TEXT_CACHED: &str = "OK (Cached)";

/// `{status, statusText, data}` wrapper around an upstream (or cached) response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyEnvelope {
    pub status: u16,
    pub status_text: String,
    /// Parsed upstream body; `Null` when the body was empty or not JSON.
    pub data: Value,
}

impl ProxyEnvelope {
    pub fn new(status: u16, status_text: impl Into<String>, data: Value) -> Self {
        Self {
            status,
            status_text: status_text.into(),
            data,
        }
    }

    pub fn ok(data: Value) -> Self {
        Self::new(200, STATUS_TEXT_OK, data)
    }

    pub fn cached(data: Value) -> Self {
        Self::new(200, STATUS_TEXT_CACHED, data)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_cached(&self) -> bool {
        self.status_text == STATUS_TEXT_CACHED
    }
}

/// Body returned when the proxy itself fails.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_envelope_serializes_camel_case() {
        let env = ProxyEnvelope::cached(json!({"users": []}));
        let v = serde_json::to_value(&env).unwrap();
        assert_eq!(
            v,
            json!({"status": 200, "statusText": "OK (Cached)", "data": {"users": []}})
        );
        assert!(env.is_cached());
    }

    #[test]
    fn test_success_range() {
        assert!(ProxyEnvelope::new(204, "No Content", Value::Null).is_success());
        assert!(!ProxyEnvelope::new(302, "Found", Value::Null).is_success());
        assert!(!ProxyEnvelope::new(404, "Not Found", Value::Null).is_success());
    }
}
