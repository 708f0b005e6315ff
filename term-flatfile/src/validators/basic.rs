//! Structural checks applied to every field.

use crate::core::{Alignment, DataType, Field, Severity, ValidationIssue};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

static NUMERIC_REGEX: Lazy<Regex> = Lazy::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"^[+-]?(\d+\.?\d*|\.\d+)$").expect("Hard-coded regex pattern should be valid")
});

/// Validation kind label of data type issues.
pub const DATATYPE: &str = "DATATYPE";
/// Validation kind label of alignment issues.
pub const ALIGNMENT: &str = "ALIGNMENT";
/// Validation kind label of length issues.
pub const LENGTH: &str = "LENGTH";

/// Checks declared data type, alignment and length of a field.
///
/// Runs once per field regardless of the field's rules. A data type mismatch
/// flags the field so map functions skip it.
#[derive(Debug, Default, Clone, Copy)]
pub struct BasicValidator;

impl BasicValidator {
    pub fn new() -> Self {
        Self
    }

    /// Validates one field, appending ERROR issues on mismatch.
    pub fn validate_field(&self, field: &mut Field) {
        let config = std::sync::Arc::clone(field.config());
        let value = field.value().map(str::to_string);

        if let Some(message) = data_type_mismatch(config.data_type, value.as_deref()) {
            debug!(
                field.name = %field.name(),
                data_type = %config.data_type,
                "Data type mismatch"
            );
            let issue = ValidationIssue::new(field, Severity::Error, DATATYPE, message);
            field.add_error(issue);
            field.mark_data_type_error();
        }

        let Some(value) = value else {
            return;
        };

        if let Some(alignment) = config.alignment {
            if let Some(message) = alignment_mismatch(alignment, &value) {
                let issue = ValidationIssue::new(field, Severity::Error, ALIGNMENT, message);
                field.add_error(issue);
            }
        }

        if let Some(expected) = config.length {
            let actual = value.chars().count();
            if actual != expected {
                let issue = ValidationIssue::new(
                    field,
                    Severity::Error,
                    LENGTH,
                    format!("expected length {expected} but found {actual}"),
                );
                field.add_error(issue);
            }
        }
    }
}

fn data_type_mismatch(data_type: DataType, value: Option<&str>) -> Option<String> {
    let conforms = match (data_type, value) {
        (DataType::Any, _) => true,
        (DataType::Blank, None) => true,
        (DataType::Blank, Some(v)) => v.trim().is_empty(),
        (DataType::Numeric, Some(v)) => NUMERIC_REGEX.is_match(v.trim()),
        (DataType::Alphanumeric, Some(v)) => {
            v.chars().all(|c| c.is_ascii_alphanumeric() || c == ' ')
        }
        (DataType::Numeric | DataType::Alphanumeric, None) => false,
    };

    if conforms {
        None
    } else {
        Some(format!(
            "value '{}' is not {}",
            value.unwrap_or_default(),
            data_type.as_str().to_lowercase()
        ))
    }
}

fn alignment_mismatch(alignment: Alignment, value: &str) -> Option<String> {
    if value.trim().is_empty() {
        return None;
    }
    match alignment {
        Alignment::Left if value.starts_with(char::is_whitespace) => {
            Some(format!("value '{value}' is not left aligned"))
        }
        Alignment::Right if value.ends_with(char::is_whitespace) => {
            Some(format!("value '{value}' is not right aligned"))
        }
        _ => None,
    }
}
