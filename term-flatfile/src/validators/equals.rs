//! EQUALS rule strategy.

use super::{FieldValidator, RuleFailure};
use crate::core::{Field, ValidationConfig, ValidationType};
use crate::prelude::*;

/// Checks that the trimmed value equals the `value` parameter.
#[derive(Debug, Default, Clone, Copy)]
pub struct EqualsValidator;

impl FieldValidator for EqualsValidator {
    fn name(&self) -> &'static str {
        "equals"
    }

    fn handles(&self) -> &'static [ValidationType] {
        &[ValidationType::Equals]
    }

    fn check(&self, field: &Field, rule: &ValidationConfig) -> Result<Option<RuleFailure>> {
        let expected = rule.required_str_param("value")?;
        let value = field.value_or_empty().trim();

        if value == expected {
            Ok(None)
        } else {
            Ok(Some(RuleFailure::new(format!(
                "value '{value}' is not equal to '{expected}'"
            ))))
        }
    }
}
