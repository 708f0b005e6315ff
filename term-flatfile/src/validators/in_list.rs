//! IN rule strategy.

use super::{FieldValidator, RuleFailure};
use crate::core::{Field, ValidationConfig, ValidationType};
use crate::prelude::*;
use serde_json::Value;

/// Checks that the trimmed value is one of the `values` parameter.
///
/// The list may be given as a JSON array (bare or under `values`) or as a
/// single string delimited by `|` or `,`.
#[derive(Debug, Default, Clone, Copy)]
pub struct InListValidator;

impl InListValidator {
    fn allowed(rule: &ValidationConfig) -> Result<Vec<String>> {
        let list = match &rule.params {
            Value::Object(map) => map.get("values"),
            other => Some(other),
        };

        match list {
            Some(Value::Array(items)) => Ok(items
                .iter()
                .map(|item| match item {
                    Value::String(s) => s.trim().to_string(),
                    other => other.to_string(),
                })
                .collect()),
            Some(Value::String(s)) => Ok(s
                .split(['|', ','])
                .map(|item| item.trim().to_string())
                .collect()),
            _ => Err(TermError::configuration(
                "IN validation requires a 'values' list parameter",
            )),
        }
    }
}

impl FieldValidator for InListValidator {
    fn name(&self) -> &'static str {
        "in_list"
    }

    fn handles(&self) -> &'static [ValidationType] {
        &[ValidationType::In]
    }

    fn check(&self, field: &Field, rule: &ValidationConfig) -> Result<Option<RuleFailure>> {
        let allowed = Self::allowed(rule)?;
        let value = field.value_or_empty().trim();

        if allowed.iter().any(|item| item == value) {
            Ok(None)
        } else {
            Ok(Some(RuleFailure::new(format!(
                "value '{value}' is not one of [{}]",
                allowed.join("|")
            ))))
        }
    }
}
