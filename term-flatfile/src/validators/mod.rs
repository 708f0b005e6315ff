//! Field validators.
//!
//! Two kinds of validation run over every record:
//!
//! - The [`BasicValidator`] checks each field's declared data type, alignment
//!   and length. It is always applied and never forwards anywhere.
//! - The [`ValidationChain`] runs the declarative rules of a field. It is a
//!   fixed, ordered list of [`FieldValidator`] strategies (regex, equals,
//!   in-list, date, lookup); each strategy is invoked when its capability
//!   tags intersect the kinds declared on the field, so a field with several
//!   rules is checked by every strategy that recognizes one of them.
//!
//! A failed rule becomes a [`ValidationIssue`] on the field. Only broken
//! configuration and lookup backend faults are returned as errors.
//!
//! ## Writing a strategy
//!
//! ```rust
//! use term_flatfile::core::{Field, ValidationConfig, ValidationType};
//! use term_flatfile::prelude::*;
//! use term_flatfile::validators::{FieldValidator, RuleFailure};
//!
//! #[derive(Debug)]
//! struct NotEmpty;
//!
//! impl FieldValidator for NotEmpty {
//!     fn name(&self) -> &'static str {
//!         "not_empty"
//!     }
//!
//!     fn handles(&self) -> &'static [ValidationType] {
//!         &[ValidationType::Equals]
//!     }
//!
//!     fn check(&self, field: &Field, _rule: &ValidationConfig) -> Result<Option<RuleFailure>> {
//!         Ok(field
//!             .value_or_empty()
//!             .trim()
//!             .is_empty()
//!             .then(|| RuleFailure::new("value is empty")))
//!     }
//! }
//! ```

mod basic;
mod chain;
mod date;
mod equals;
mod in_list;
mod lookup;
mod pattern;

pub use basic::BasicValidator;
pub use chain::ValidationChain;
pub use date::DateValidator;
pub use equals::EqualsValidator;
pub use in_list::InListValidator;
pub use lookup::{LookupBackend, LookupValidator};
pub use pattern::RegexValidator;

pub(crate) use pattern::cached_regex;

use crate::core::{Field, ValidationConfig, ValidationIssue, ValidationType};
use crate::prelude::*;
use std::fmt::Debug;

/// Why a single rule failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleFailure {
    /// Message used when the rule has no custom error message
    pub message: String,
    /// Whether the failure means the value does not fit its data type
    pub data_type_error: bool,
}

impl RuleFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            data_type_error: false,
        }
    }

    /// Creates a failure that also flags the field with a data type error.
    pub fn data_type(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            data_type_error: true,
        }
    }
}

/// What one strategy did to one field.
#[derive(Debug, Default)]
pub struct ValidatorOutcome {
    /// Number of rules this strategy evaluated
    pub handled: usize,
    /// Issues for the rules that failed
    pub issues: Vec<ValidationIssue>,
    /// Whether any failure flagged a data type error
    pub data_type_error: bool,
}

/// A rule strategy of the validation chain.
pub trait FieldValidator: Debug + Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &'static str;

    /// Rule kinds this strategy recognizes.
    fn handles(&self) -> &'static [ValidationType];

    /// Checks one rule against the field.
    ///
    /// Returns `Ok(None)` when the rule passes and `Ok(Some(_))` when it fails.
    fn check(&self, field: &Field, rule: &ValidationConfig) -> Result<Option<RuleFailure>>;

    /// Checks every rule of the field that this strategy recognizes.
    fn validate(&self, field: &Field) -> Result<ValidatorOutcome> {
        let mut outcome = ValidatorOutcome::default();

        for rule in field
            .config()
            .validations
            .iter()
            .filter(|rule| self.handles().contains(&rule.validation_type))
        {
            outcome.handled += 1;
            if let Some(failure) = self.check(field, rule)? {
                let message = rule.error_message.clone().unwrap_or(failure.message);
                outcome.issues.push(ValidationIssue::new(
                    field,
                    rule.severity,
                    rule.validation_type.as_str(),
                    message,
                ));
                outcome.data_type_error |= failure.data_type_error;
            }
        }

        Ok(outcome)
    }
}
