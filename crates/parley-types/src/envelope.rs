use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Deserializer, Serialize};
use tracing::error;

use crate::api::ErrorBody;

pub const ALLOW_ORIGIN: &str = "*";
pub const ALLOW_HEADERS: &str = "Content-Type, X-Auth-Token";
/// Pre-flight cache lifetime in seconds (24 hours).
pub const PREFLIGHT_MAX_AGE: &str = "86400";

/// Header carrying the session token. Matched case-insensitively.
pub const AUTH_TOKEN_HEADER: &str = "x-auth-token";

/// Inbound request as handed over by the transport layer.
///
/// The logical resource lives in the `path` query parameter, not in the URL.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiRequest {
    pub http_method: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub query_string_parameters: HashMap<String, String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub headers: HashMap<String, String>,
    #[serde(default)]
    pub body: Option<String>,
}

/// Transports send `null` rather than `{}` when a request has no query string
/// or no headers.
fn null_as_empty<'de, D>(deserializer: D) -> Result<HashMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<HashMap<String, String>>::deserialize(deserializer)?.unwrap_or_default())
}

impl ApiRequest {
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            http_method: method.into(),
            ..Self::default()
        }
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query_string_parameters.insert(key.into(), value.into());
        self
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn method(&self) -> String {
        self.http_method.to_ascii_uppercase()
    }

    pub fn query(&self, name: &str) -> Option<&str> {
        self.query_string_parameters.get(name).map(String::as_str)
    }

    /// Logical resource name, empty when the caller sent none.
    pub fn logical_path(&self) -> &str {
        self.query("path").unwrap_or_default()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn auth_token(&self) -> Option<&str> {
        self.header(AUTH_TOKEN_HEADER)
            .map(str::trim)
            .filter(|token| !token.is_empty())
    }
}

/// Outbound response handed back to the transport layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse {
    pub status_code: u16,
    pub headers: BTreeMap<String, String>,
    pub body: String,
    pub is_base64_encoded: bool,
}

impl ApiResponse {
    /// Cross-origin pre-flight answer: no body, no authentication.
    pub fn preflight(allowed_methods: &str) -> Self {
        let headers = BTreeMap::from([
            ("Access-Control-Allow-Origin".to_string(), ALLOW_ORIGIN.to_string()),
            ("Access-Control-Allow-Methods".to_string(), allowed_methods.to_string()),
            ("Access-Control-Allow-Headers".to_string(), ALLOW_HEADERS.to_string()),
            ("Access-Control-Max-Age".to_string(), PREFLIGHT_MAX_AGE.to_string()),
        ]);

        Self {
            status_code: 200,
            headers,
            body: String::new(),
            is_base64_encoded: false,
        }
    }

    pub fn json<T: Serialize>(status_code: u16, value: &T) -> Self {
        match serde_json::to_string(value) {
            Ok(body) => Self::raw_json(status_code, body),
            Err(e) => {
                error!("Failed to serialize response body: {}", e);
                Self::error(500, "Internal server error")
            }
        }
    }

    pub fn error(status_code: u16, message: &str) -> Self {
        let body = ErrorBody {
            error: message.to_string(),
        };
        match serde_json::to_string(&body) {
            Ok(body) => Self::raw_json(status_code, body),
            Err(e) => {
                error!("Failed to serialize error body: {}", e);
                Self::raw_json(500, r#"{"error":"Internal server error"}"#.to_string())
            }
        }
    }

    fn raw_json(status_code: u16, body: String) -> Self {
        let headers = BTreeMap::from([
            ("Content-Type".to_string(), "application/json".to_string()),
            ("Access-Control-Allow-Origin".to_string(), ALLOW_ORIGIN.to_string()),
        ]);

        Self {
            status_code,
            headers,
            body,
            is_base64_encoded: false,
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}
