//! The ordered rule-dispatch chain.

use super::{
    DateValidator, EqualsValidator, FieldValidator, InListValidator, LookupBackend,
    LookupValidator, RegexValidator,
};
use crate::core::Field;
use crate::log_rule;
use crate::logging::{truncate_field, LogConfig};
use crate::prelude::*;
use std::sync::Arc;

/// A fixed, ordered list of rule strategies.
///
/// The standard order is REGEX, EQUALS, IN, DATE, then SQL/API/DB lookups.
/// The order is the same for every field; each strategy decides on its own
/// whether it recognizes any of the field's declared rules.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use serde_json::json;
/// use term_flatfile::core::{DataType, Field, FieldConfig, Severity, ValidationConfig, ValidationType};
/// use term_flatfile::validators::ValidationChain;
///
/// let config = FieldConfig::new("zip", DataType::Numeric)
///     .with_validation(ValidationConfig::new(ValidationType::Regex, Severity::Error, json!("\\d{5}")))
///     .with_validation(ValidationConfig::new(ValidationType::In, Severity::Warning, json!(["90210"])));
/// let mut field = Field::new(Arc::new(config), Some("10001".to_string()));
///
/// let evaluated = ValidationChain::default().validate(&mut field).unwrap();
/// assert_eq!(evaluated, 2);
/// assert_eq!(field.errors().len(), 1);
/// assert_eq!(field.errors()[0].severity, Severity::Warning);
/// ```
#[derive(Debug)]
pub struct ValidationChain {
    validators: Vec<Box<dyn FieldValidator>>,
    log_config: LogConfig,
}

impl ValidationChain {
    /// Builds the standard chain; `lookup` serves SQL, API and DB rules.
    pub fn new(lookup: Option<Arc<dyn LookupBackend>>) -> Self {
        Self::from_validators(vec![
            Box::new(RegexValidator),
            Box::new(EqualsValidator),
            Box::new(InListValidator),
            Box::new(DateValidator),
            Box::new(LookupValidator::new(lookup)),
        ])
    }

    /// Builds a chain from custom strategies, kept in the given order.
    pub fn from_validators(validators: Vec<Box<dyn FieldValidator>>) -> Self {
        Self {
            validators,
            log_config: LogConfig::default(),
        }
    }

    pub fn with_log_config(mut self, log_config: LogConfig) -> Self {
        self.log_config = log_config;
        self
    }

    pub fn validators(&self) -> &[Box<dyn FieldValidator>] {
        &self.validators
    }

    /// Runs every recognizing strategy over the field.
    ///
    /// Issues are appended to the field in chain order. Returns the number of
    /// rules evaluated; a field without rules is skipped and returns 0.
    ///
    /// # Errors
    ///
    /// Returns the first configuration or lookup fault raised by a strategy.
    pub fn validate(&self, field: &mut Field) -> Result<usize> {
        let config = Arc::clone(field.config());
        if config.validations.is_empty() {
            return Ok(0);
        }

        let mut evaluated = 0;
        for validator in &self.validators {
            if !config.declares_any(validator.handles()) {
                continue;
            }

            let outcome = validator.validate(field)?;
            log_rule!(
                self.log_config,
                field.name = %field.name(),
                field.value = %truncate_field(field.value_or_empty(), self.log_config.max_field_length),
                validator = validator.name(),
                rules = outcome.handled,
                failures = outcome.issues.len(),
                "Validator applied"
            );

            evaluated += outcome.handled;
            if outcome.data_type_error {
                field.mark_data_type_error();
            }
            for issue in outcome.issues {
                field.add_error(issue);
            }
        }

        Ok(evaluated)
    }
}

impl Default for ValidationChain {
    fn default() -> Self {
        Self::new(None)
    }
}
