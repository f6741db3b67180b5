//! Error reports annotated with the flag state of the current scope.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::scope::{self, Scope};
use crate::types::flags::{FlagEntry, FlagsContext};
use crate::FlagResult;

/// Report severity.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Level {
    /// A failure.
    Error,
    /// Something unexpected that did not fail.
    Warning,
    /// Informational.
    Info,
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Level::Error => write!(f, "error"),
            Level::Warning => write!(f, "warning"),
            Level::Info => write!(f, "info"),
        }
    }
}

/// Contexts attached to a report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contexts {
    /// Flag evaluations active when the report was built, oldest first.
    pub flags: FlagsContext,
}

/// A captured report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    /// Unique report ID.
    pub event_id: String,

    /// When the report was built.
    pub timestamp: DateTime<Utc>,

    /// Severity.
    pub level: Level,

    /// Error text or plain message.
    pub message: String,

    /// Tags copied from the scope.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,

    /// Attached contexts.
    pub contexts: Contexts,
}

impl Report {
    /// Builds a report from a scope's flags and tags.
    pub fn from_scope(scope: &Scope, level: Level, message: impl Into<String>) -> Self {
        let report = Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            level,
            message: message.into(),
            tags: scope.tags().clone(),
            contexts: Contexts {
                flags: scope.flags_context(),
            },
        };

        tracing::debug!(
            event_id = %report.event_id,
            level = %report.level,
            flags = report.contexts.flags.len(),
            "Report captured"
        );
        report
    }

    /// Flag evaluations in the report, oldest first.
    pub fn flags(&self) -> &[FlagEntry] {
        &self.contexts.flags.values
    }

    /// Value of the tag `key`, if the scope had it set.
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }

    /// Pretty-printed JSON rendering.
    pub fn to_json(&self) -> FlagResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Builds an error report for `error` from the current scope.
pub fn capture_error(error: &dyn std::error::Error) -> Report {
    scope::with_current(|scope| Report::from_scope(scope, Level::Error, error.to_string()))
}

/// Builds a report with a plain message from the current scope.
pub fn capture_message(message: impl Into<String>, level: Level) -> Report {
    scope::with_current(|scope| Report::from_scope(scope, level, message))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FlagError;
    use serde_json::json;

    #[test]
    fn test_report_embeds_flags_in_order() {
        let scope = Scope::new(10).unwrap();
        scope.record_evaluation("hello", false);
        scope.record_evaluation("world", true);
        scope.record_evaluation("other", false);

        let report = Report::from_scope(&scope, Level::Error, "something wrong!");
        let value = serde_json::to_value(&report).unwrap();

        assert_eq!(
            value["contexts"]["flags"],
            json!({
                "values": [
                    {"flag": "hello", "result": false},
                    {"flag": "world", "result": true},
                    {"flag": "other", "result": false},
                ]
            })
        );
        assert_eq!(value["level"], json!("error"));
    }

    #[test]
    fn test_report_is_a_snapshot() {
        let scope = Scope::new(10).unwrap();
        scope.record_evaluation("a", true);

        let report = Report::from_scope(&scope, Level::Info, "first");
        scope.record_evaluation("b", true);

        assert_eq!(report.flags(), &[FlagEntry::new("a", true)]);
    }

    #[test]
    fn test_report_tags() {
        let mut scope = Scope::new(10).unwrap();
        scope.set_tag("task_id", "7");

        let report = Report::from_scope(&scope, Level::Warning, "careful");
        assert_eq!(report.tag("task_id"), Some("7"));
        assert_eq!(report.tag("missing"), None);
    }

    #[test]
    fn test_capture_error_uses_current_scope() {
        scope::with_isolation_scope(|| {
            scope::record_evaluation("checkout_v2", true);

            let report = capture_error(&FlagError::other("payment failed"));
            assert_eq!(report.level, Level::Error);
            assert_eq!(report.message, "payment failed");
            assert_eq!(report.flags(), &[FlagEntry::new("checkout_v2", true)]);
        });
    }

    #[test]
    fn test_capture_inside_isolated_task() {
        let report = tokio_test::block_on(scope::isolated(async {
            scope::record_evaluation("async_flag", false);
            capture_message("from a task", Level::Warning)
        }));

        assert_eq!(report.flags(), &[FlagEntry::new("async_flag", false)]);
        assert!(!scope::build_flags_context()
            .values
            .contains(&FlagEntry::new("async_flag", false)));
    }

    #[test]
    fn test_event_ids_are_unique() {
        let a = capture_message("a", Level::Info);
        let b = capture_message("b", Level::Info);
        assert_ne!(a.event_id, b.event_id);
    }

    #[test]
    fn test_to_json_skips_empty_tags() {
        let report = Report::from_scope(&Scope::new(1).unwrap(), Level::Info, "hi");
        let json = report.to_json().unwrap();
        assert!(!json.contains("\"tags\""));
        assert!(json.contains("\"flags\""));
    }
}
