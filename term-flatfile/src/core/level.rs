//! Validation severity levels.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The severity of a failed validation rule.
///
/// Only [`Severity::Error`] issues flip the overall result of a run to failed;
/// warnings are reported but never fail a record set.
///
/// # Examples
///
/// ```rust
/// use term_flatfile::core::Severity;
///
/// assert!(Severity::Error > Severity::Warning);
/// assert_eq!(Severity::Warning.to_string(), "WARNING");
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    /// Reported, but the run still passes
    Warning = 1,
    /// Fails the run
    #[default]
    Error = 2,
}

impl Severity {
    /// Returns the string representation of the severity.
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
        }
    }

    /// Returns true if this severity fails a run.
    pub fn is_error(&self) -> bool {
        matches!(self, Severity::Error)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
