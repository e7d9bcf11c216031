//! Request/response bodies exchanged with the analysis backend
//!
//! Response types are deliberately loose (`Option<Value>` per field): the
//! backend omits fields freely, and each field is interpreted independently by
//! the client so one malformed field never blocks another.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ========================================
// Authentication
// ========================================

/// Login form body
#[derive(Clone, Deserialize, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginRequest")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Login response: `{token}` on success, `{error}` otherwise
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

// ========================================
// Upload
// ========================================

/// Raw upload response, one loosely-typed slot per known field
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct UploadResponseBody {
    #[serde(default)]
    pub analysis: Option<Value>,
    #[serde(default)]
    pub total_clauses: Option<Value>,
    #[serde(default)]
    pub notifications: Option<Value>,
    #[serde(default)]
    pub missing_clauses: Option<Value>,
    #[serde(default)]
    pub amended_contract: Option<Value>,
    #[serde(default)]
    pub amended_available: Option<Value>,
    #[serde(default)]
    pub modified_contract_download: Option<Value>,
    #[serde(default)]
    pub modified_contract_filename: Option<Value>,
}

// ========================================
// Notifications
// ========================================

/// Body of `/notifications/latest`; `notifications` is `Null` when absent
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct NotificationsEnvelope {
    #[serde(default)]
    pub notifications: Value,
}

/// Body of `/notifications/dismiss`; the timestamp is posted back verbatim
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DismissRequest {
    pub timestamp: Value,
}

/// Dismiss acknowledgement; `removed` is false when the entry was already gone
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DismissResponse {
    #[serde(default)]
    pub removed: Option<bool>,
}

/// Decode a response body that must be a JSON object
///
/// Derived struct decoding also accepts a sequence and fills fields by
/// position, so anything other than an object is rejected up front.
pub fn decode_object<T: DeserializeOwned>(value: Value) -> Option<T> {
    match value {
        Value::Object(map) => serde_json::from_value(Value::Object(map)).ok(),
        _ => None,
    }
}

// ========================================
// Error bodies
// ========================================

/// Extract a structured `error` field from an error response body
///
/// A string is returned as-is; any other non-null value as its JSON text.
pub fn error_field(body: &Value) -> Option<String> {
    match body.get("error")? {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
