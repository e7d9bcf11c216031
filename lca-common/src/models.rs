//! Domain models for analysis results and notifications
//!
//! The backend's records are partially structured JSON. These types keep the
//! raw value and expose typed accessors, so nothing is lost when a record has
//! an unexpected shape.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Bucket name used when a field path cannot be resolved
pub const UNKNOWN_BUCKET: &str = "Unknown";

/// Field path of the clause-type classification
pub const CLAUSE_TYPE_PATH: &str = "phase1.predicted_clause_type";

/// Field path of the risk level
pub const RISK_LEVEL_PATH: &str = "phase3.risk_level";

/// JSON truthiness: `null`, `false`, `0`, `""` are false, everything else true
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0 && !f.is_nan()).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Text form of a JSON value: strings verbatim, everything else as JSON
pub fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

// ========================================
// Clause
// ========================================

/// One classified unit of a contract
///
/// Nested phase records (`phase1`, `phase3`, ...) may be absent at any level.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct Clause(Value);

impl Clause {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// Resolve a dot-delimited path, descending through objects only
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        path.split('.').try_fold(&self.0, |current, segment| match current {
            Value::Object(map) => map.get(segment),
            _ => None,
        })
    }

    /// Clause text, when the backend included it
    pub fn text(&self) -> Option<&str> {
        self.0.get("clause").and_then(Value::as_str)
    }

    pub fn predicted_type(&self) -> Option<&str> {
        self.get_path(CLAUSE_TYPE_PATH).and_then(Value::as_str)
    }

    pub fn risk_level(&self) -> Option<&str> {
        self.get_path(RISK_LEVEL_PATH).and_then(Value::as_str)
    }
}

impl From<Value> for Clause {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

// ========================================
// MissingClause
// ========================================

/// A required clause the backend could not find
///
/// Three shapes occur in practice and all must render:
/// `{label, reason}`, `[label, reason]`, or any other value.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(from = "Value", into = "Value")]
pub enum MissingClause {
    Labeled(Map<String, Value>),
    Pair(Vec<Value>),
    Opaque(Value),
}

impl MissingClause {
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(map) => Self::Labeled(map),
            Value::Array(items) => Self::Pair(items),
            other => Self::Opaque(other),
        }
    }

    /// Label, if the entry carries one
    pub fn label(&self) -> Option<String> {
        match self {
            Self::Labeled(map) => truthy_text(map.get("label")).or_else(|| truthy_text(map.get("0"))),
            Self::Pair(items) => truthy_text(items.first()),
            Self::Opaque(_) => None,
        }
    }

    /// Render as one display line; `index` is the entry's position in the list
    pub fn render(&self, index: usize) -> String {
        match self {
            Self::Labeled(map) => {
                let label = self
                    .label()
                    .unwrap_or_else(|| format!("Clause {}", index + 1));
                let reason = truthy_text(map.get("reason"))
                    .or_else(|| truthy_text(map.get("1")))
                    .unwrap_or_else(|| Value::Object(map.clone()).to_string());
                format!("{}: {}", label, reason)
            }
            Self::Pair(items) => {
                let label = self
                    .label()
                    .unwrap_or_else(|| format!("Clause {}", index + 1));
                let reason = truthy_text(items.get(1))
                    .unwrap_or_else(|| Value::Array(items.clone()).to_string());
                format!("{}: {}", label, reason)
            }
            Self::Opaque(value) => value_text(value),
        }
    }
}

fn truthy_text(value: Option<&Value>) -> Option<String> {
    value.filter(|v| is_truthy(v)).map(value_text)
}

impl From<Value> for MissingClause {
    fn from(value: Value) -> Self {
        Self::from_value(value)
    }
}

impl From<MissingClause> for Value {
    fn from(clause: MissingClause) -> Self {
        match clause {
            MissingClause::Labeled(map) => Value::Object(map),
            MissingClause::Pair(items) => Value::Array(items),
            MissingClause::Opaque(value) => value,
        }
    }
}

// ========================================
// Notification
// ========================================

/// A server-side notification as held by the client
///
/// `timestamp` is the notification's identity and is posted back verbatim
/// on dismissal. The full record is kept for display fallbacks.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(from = "Value", into = "Value")]
pub struct Notification {
    message: Option<String>,
    timestamp: Value,
    raw: Value,
}

impl Notification {
    /// Lenient decode: never fails, whatever the element looks like
    pub fn from_value(raw: Value) -> Self {
        let message = raw
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string);
        let timestamp = raw.get("timestamp").cloned().unwrap_or(Value::Null);
        Self {
            message,
            timestamp,
            raw,
        }
    }

    /// Convenience constructor for a well-formed record
    pub fn new(message: impl Into<String>, timestamp: impl Into<String>) -> Self {
        let mut map = Map::new();
        map.insert("message".to_string(), Value::String(message.into()));
        map.insert("timestamp".to_string(), Value::String(timestamp.into()));
        Self::from_value(Value::Object(map))
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Identity of the notification (raw `timestamp`, `Null` when absent)
    pub fn timestamp(&self) -> &Value {
        &self.timestamp
    }

    pub fn as_value(&self) -> &Value {
        &self.raw
    }

    /// Message text, falling back to the record's JSON
    pub fn display_text(&self) -> String {
        match self.message.as_deref() {
            Some(m) if !m.is_empty() => m.to_string(),
            _ => self.raw.to_string(),
        }
    }

    /// Parsed timestamp, when it is an ISO-8601 string
    ///
    /// Offset-less timestamps are taken as UTC.
    pub fn issued_at(&self) -> Option<DateTime<Utc>> {
        let text = self.timestamp.as_str()?;
        if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
            return Some(dt.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .map(|naive| Utc.from_utc_datetime(&naive))
    }
}

impl From<Value> for Notification {
    fn from(value: Value) -> Self {
        Self::from_value(value)
    }
}

impl From<Notification> for Value {
    fn from(notification: Notification) -> Self {
        notification.raw
    }
}

// ========================================
// ChartBucket
// ========================================

/// A named count derived by grouping records on a field path
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ChartBucket {
    pub name: String,
    pub value: u64,
}

impl ChartBucket {
    pub fn new(name: impl Into<String>, value: u64) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};
    use serde_json::json;

    #[test]
    fn test_truthiness() {
        assert!(!is_truthy(&Value::Null));
        assert!(!is_truthy(&json!(false)));
        assert!(!is_truthy(&json!(0)));
        assert!(!is_truthy(&json!("")));
        assert!(is_truthy(&json!(true)));
        assert!(is_truthy(&json!(2)));
        assert!(is_truthy(&json!("amended text")));
        assert!(is_truthy(&json!([])));
        assert!(is_truthy(&json!({})));
    }

    #[test]
    fn test_clause_path_lookup() {
        let clause = Clause::new(json!({
            "clause": "The parties agree...",
            "phase1": {"predicted_clause_type": "Indemnity", "confidence": 0.91},
            "phase3": {"risk_level": "High"}
        }));
        assert_eq!(clause.text(), Some("The parties agree..."));
        assert_eq!(clause.predicted_type(), Some("Indemnity"));
        assert_eq!(clause.risk_level(), Some("High"));
        assert_eq!(clause.get_path("phase1.confidence"), Some(&json!(0.91)));
        assert_eq!(clause.get_path("phase2.anything"), None);
        assert_eq!(clause.get_path("clause.length"), None);
    }

    #[test]
    fn test_missing_clause_shapes_render() {
        let entries: Vec<MissingClause> = serde_json::from_value(json!([
            {"label": "Indemnity", "reason": "absent"},
            ["Termination", "not found"],
            "Confidentiality"
        ]))
        .unwrap();

        let lines: Vec<String> = entries
            .iter()
            .enumerate()
            .map(|(i, m)| m.render(i))
            .collect();

        assert_eq!(
            lines,
            vec![
                "Indemnity: absent".to_string(),
                "Termination: not found".to_string(),
                "Confidentiality".to_string(),
            ]
        );
    }

    #[test]
    fn test_missing_clause_fallbacks() {
        let unlabeled = MissingClause::from_value(json!({"severity": 2}));
        assert_eq!(unlabeled.render(4), "Clause 5: {\"severity\":2}");

        let short_pair = MissingClause::from_value(json!(["Warranty"]));
        assert_eq!(short_pair.render(0), "Warranty: [\"Warranty\"]");

        assert_eq!(MissingClause::from_value(json!(42)).render(0), "42");
        assert_eq!(MissingClause::from_value(Value::Null).render(0), "null");
    }

    #[test]
    fn test_notification_lenient_decode() {
        let n = Notification::from_value(json!({
            "message": "Missing clauses detected",
            "timestamp": "2025-01-05T10:20:30.123456",
            "type": "missing_clauses"
        }));
        assert_eq!(n.message(), Some("Missing clauses detected"));
        assert_eq!(n.timestamp(), &json!("2025-01-05T10:20:30.123456"));
        assert_eq!(n.display_text(), "Missing clauses detected");

        let odd = Notification::from_value(json!(17));
        assert_eq!(odd.message(), None);
        assert_eq!(odd.timestamp(), &Value::Null);
        assert_eq!(odd.display_text(), "17");
    }

    #[test]
    fn test_notification_issued_at() {
        let naive = Notification::new("m", "2025-01-05T10:20:30.5");
        let at = naive.issued_at().unwrap();
        assert_eq!((at.year(), at.month(), at.day()), (2025, 1, 5));
        assert_eq!((at.hour(), at.minute(), at.second()), (10, 20, 30));

        let offset = Notification::new("m", "2025-01-05T12:00:00+02:00");
        assert_eq!(offset.issued_at().unwrap().hour(), 10);

        assert!(Notification::new("m", "yesterday").issued_at().is_none());
    }

    #[test]
    fn test_notification_serializes_raw_record() {
        let raw = json!({"message": "hi", "timestamp": "t1", "recipient": "a@b.c"});
        let n: Notification = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(serde_json::to_value(&n).unwrap(), raw);
    }
}
