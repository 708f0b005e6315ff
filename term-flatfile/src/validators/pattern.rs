//! REGEX rule strategy.

use super::{FieldValidator, RuleFailure};
use crate::core::{Field, ValidationConfig, ValidationType};
use crate::prelude::*;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::sync::RwLock;

/// Cache for compiled regex patterns to avoid recompiling per record
static REGEX_CACHE: Lazy<RwLock<HashMap<String, Regex>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

/// Compiles `pattern` once per process and hands out cheap clones.
pub(crate) fn cached_regex(pattern: &str) -> Result<Regex> {
    {
        let cache = REGEX_CACHE.read().map_err(|_| {
            TermError::Internal("Failed to acquire read lock on regex cache".to_string())
        })?;
        if let Some(regex) = cache.get(pattern) {
            return Ok(regex.clone());
        }
    }

    let regex = Regex::new(pattern).map_err(|e| {
        TermError::configuration(format!("invalid regex pattern '{pattern}': {e}"))
    })?;

    let mut cache = REGEX_CACHE.write().map_err(|_| {
        TermError::Internal("Failed to acquire write lock on regex cache".to_string())
    })?;
    cache.insert(pattern.to_string(), regex.clone());
    Ok(regex)
}

/// Checks that the trimmed value matches the whole `regex` parameter.
#[derive(Debug, Default, Clone, Copy)]
pub struct RegexValidator;

impl FieldValidator for RegexValidator {
    fn name(&self) -> &'static str {
        "regex"
    }

    fn handles(&self) -> &'static [ValidationType] {
        &[ValidationType::Regex]
    }

    fn check(&self, field: &Field, rule: &ValidationConfig) -> Result<Option<RuleFailure>> {
        let pattern = rule.required_str_param("regex")?;
        let regex = cached_regex(&format!("^(?:{pattern})$"))?;
        let value = field.value_or_empty().trim();

        if regex.is_match(value) {
            Ok(None)
        } else {
            Ok(Some(RuleFailure::new(format!(
                "value '{value}' does not match pattern '{pattern}'"
            ))))
        }
    }
}
