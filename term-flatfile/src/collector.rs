//! Collection of field issues into the run's report.

use crate::core::{RecordSet, ValidationReport};
use tracing::{debug, info};

/// Stamps and gathers every issue of the record set.
///
/// Records are visited by ascending position, fields in declared order and
/// issues in the order they were appended. Each issue gets
/// `record_line = position + 1`. The run fails iff at least one issue has
/// ERROR severity. The result is stored on the record set and also returned.
///
/// ```rust
/// use std::sync::Arc;
/// use term_flatfile::collector::collect_errors;
/// use term_flatfile::core::{DataType, Field, FieldConfig, Record, RecordSet, Severity, ValidationIssue};
///
/// let config = Arc::new(FieldConfig::new("code", DataType::Any));
/// let mut field = Field::new(config, Some("X".to_string()));
/// let issue = ValidationIssue::new(&field, Severity::Warning, "EQUALS", "unexpected code");
/// field.add_error(issue);
///
/// let mut set = RecordSet::from_records([Record::new(1, vec![field])]);
/// let report = collect_errors(&mut set);
///
/// assert!(report.is_success());
/// assert_eq!(report.issues[0].record_line, Some(1));
/// ```
pub fn collect_errors(record_set: &mut RecordSet) -> ValidationReport {
    let mut issues = Vec::new();

    for (position, record) in record_set.records_mut() {
        let line = position + 1;
        for field in record.fields_mut() {
            for issue in field.errors_mut() {
                issue.record_line = Some(line);
                issues.push(issue.clone());
            }
        }
        debug!(record.line = line, "Collected record issues");
    }

    let has_error = issues.iter().any(|issue| issue.severity.is_error());
    info!(
        records = record_set.len(),
        issues = issues.len(),
        has_error,
        "Collected validation issues"
    );

    record_set.set_collected(issues.clone(), has_error);
    ValidationReport { issues, has_error }
}
