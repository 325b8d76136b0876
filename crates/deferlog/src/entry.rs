//! Buffered log entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::level::Severity;

/// One buffered log call.
///
/// Entries are immutable once captured. `scopes` lists the scope states that
/// were active at capture time, outermost first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Severity of the call.
    pub level: Severity,
    /// Message template, unformatted.
    pub message: String,
    /// Arguments for the message template.
    #[serde(default)]
    pub args: Vec<Value>,
    /// Active scope states, outermost first.
    #[serde(default)]
    pub scopes: Vec<Value>,
    /// When the call was made.
    pub captured_at: DateTime<Utc>,
}

impl LogEntry {
    /// Capture an entry now.
    #[must_use]
    pub fn new(
        level: Severity,
        message: impl Into<String>,
        args: Vec<Value>,
        scopes: Vec<Value>,
    ) -> Self {
        Self {
            level,
            message: message.into(),
            args,
            scopes,
            captured_at: Utc::now(),
        }
    }

    /// Whether the entry was captured inside at least one scope.
    #[must_use]
    pub fn has_scopes(&self) -> bool {
        !self.scopes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_entry_creation() {
        let before = Utc::now();
        let entry = LogEntry::new(
            Severity::Warning,
            "slow request {Elapsed}",
            vec![json!(1200)],
            vec![json!("request=42")],
        );

        assert_eq!(entry.level, Severity::Warning);
        assert_eq!(entry.message, "slow request {Elapsed}");
        assert_eq!(entry.args, vec![json!(1200)]);
        assert!(entry.has_scopes());
        assert!(entry.captured_at >= before);
    }

    #[test]
    fn test_serialization() {
        let entry = LogEntry::new(Severity::Error, "boom", Vec::new(), Vec::new());

        let json = serde_json::to_string(&entry).unwrap();
        assert!(json.contains("\"level\":\"error\""));
        assert!(json.contains("\"message\":\"boom\""));

        let parsed: LogEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, entry);
        assert!(!parsed.has_scopes());
    }
}
