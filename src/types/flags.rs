//! Flag evaluation records as they appear in reports.

use serde::{Deserialize, Serialize};

/// One recorded flag evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FlagEntry {
    /// Flag name.
    pub flag: String,

    /// Last observed evaluation result.
    pub result: bool,
}

impl FlagEntry {
    /// Creates a new entry.
    pub fn new(flag: impl Into<String>, result: bool) -> Self {
        Self {
            flag: flag.into(),
            result,
        }
    }
}

impl From<(&str, bool)> for FlagEntry {
    fn from((flag, result): (&str, bool)) -> Self {
        Self::new(flag, result)
    }
}

/// The `flags` context embedded in a report.
///
/// `values` is ordered oldest first, most recently set last.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlagsContext {
    /// Flag evaluations, oldest first.
    pub values: Vec<FlagEntry>,
}

impl FlagsContext {
    /// Wraps entries that are already ordered oldest first.
    pub fn new(values: Vec<FlagEntry>) -> Self {
        Self { values }
    }

    /// Whether no flags were recorded.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Number of flag entries.
    pub fn len(&self) -> usize {
        self.values.len()
    }
}
