//! DATE rule strategy.

use super::{FieldValidator, RuleFailure};
use crate::core::{Field, ValidationConfig, ValidationType};
use crate::prelude::*;
use chrono::{NaiveDate, NaiveDateTime};

/// Checks that the trimmed value parses with the `format` parameter.
///
/// The format uses chrono's strftime syntax (`%Y%m%d`, `%m/%d/%Y %H:%M`).
/// A value that does not parse is also flagged as a data type error, which
/// keeps it out of every map function.
#[derive(Debug, Default, Clone, Copy)]
pub struct DateValidator;

impl FieldValidator for DateValidator {
    fn name(&self) -> &'static str {
        "date"
    }

    fn handles(&self) -> &'static [ValidationType] {
        &[ValidationType::Date]
    }

    fn check(&self, field: &Field, rule: &ValidationConfig) -> Result<Option<RuleFailure>> {
        let format = rule.required_str_param("format")?;
        let value = field.value_or_empty().trim();

        let parsed = NaiveDate::parse_from_str(value, format).is_ok()
            || NaiveDateTime::parse_from_str(value, format).is_ok();

        if parsed {
            Ok(None)
        } else {
            Ok(Some(RuleFailure::data_type(format!(
                "value '{value}' is not a valid date for format '{format}'"
            ))))
        }
    }
}
