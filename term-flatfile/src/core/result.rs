//! Validation issue and report types.

use super::{Field, Severity};
use serde::{Deserialize, Serialize};

/// A failed rule recorded against a field.
///
/// Issues are built by validators without a record line; the line is stamped
/// by the error collector once the whole record set has been validated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationIssue {
    /// Name of the field the rule belongs to
    pub field_name: String,
    /// Severity taken from the failing rule
    pub severity: Severity,
    /// Kind of the rule, e.g. `REGEX` or `DATATYPE`
    pub validation_type: String,
    /// A description of the issue
    pub message: String,
    /// 1-based line of the record, assigned by the collector
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_line: Option<usize>,
}

impl ValidationIssue {
    /// Builds an issue for `field`.
    pub fn new(
        field: &Field,
        severity: Severity,
        validation_type: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            field_name: field.name().to_string(),
            severity,
            validation_type: validation_type.into(),
            message: message.into(),
            record_line: None,
        }
    }
}

/// Every issue of a run plus its overall verdict.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    /// Issues in (record position, field order, append order)
    pub issues: Vec<ValidationIssue>,
    /// True if at least one issue has [`Severity::Error`]
    pub has_error: bool,
}

impl ValidationReport {
    /// Returns true if the run passed.
    pub fn is_success(&self) -> bool {
        !self.has_error
    }

    /// Returns true if there are any warning issues.
    pub fn has_warnings(&self) -> bool {
        self.issues
            .iter()
            .any(|issue| issue.severity == Severity::Warning)
    }

    /// Gets all issues of a specific severity.
    pub fn issues_by_severity(&self, severity: Severity) -> Vec<&ValidationIssue> {
        self.issues
            .iter()
            .filter(|issue| issue.severity == severity)
            .collect()
    }

    /// Gets all issues stamped with the given record line.
    pub fn issues_for_line(&self, record_line: usize) -> Vec<&ValidationIssue> {
        self.issues
            .iter()
            .filter(|issue| issue.record_line == Some(record_line))
            .collect()
    }
}
