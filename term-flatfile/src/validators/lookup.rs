//! SQL / API / DB rule strategy.
//!
//! The lookup itself belongs to the host: a database query, an HTTP call or a
//! reference table. The strategy only hands the rule parameters and the value
//! to a [`LookupBackend`] and records a failed verdict as an issue.

use super::{FieldValidator, RuleFailure};
use crate::core::{Field, ValidationConfig, ValidationType};
use crate::prelude::*;
use std::fmt::Debug;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Resolves external lookups for SQL, API and DB rules.
///
/// Implementations may block. A backend that cannot reach its source returns
/// [`TermError::LookupFailed`], which aborts the run.
pub trait LookupBackend: Debug + Send + Sync {
    /// Returns whether `value` passes the lookup described by `params`.
    fn lookup(&self, kind: ValidationType, params: &serde_json::Value, value: &str)
        -> Result<bool>;
}

/// Delegates SQL, API and DB rules to a [`LookupBackend`].
#[derive(Debug, Clone, Default)]
pub struct LookupValidator {
    backend: Option<Arc<dyn LookupBackend>>,
}

impl LookupValidator {
    pub fn new(backend: Option<Arc<dyn LookupBackend>>) -> Self {
        Self { backend }
    }
}

impl FieldValidator for LookupValidator {
    fn name(&self) -> &'static str {
        "lookup"
    }

    fn handles(&self) -> &'static [ValidationType] {
        &[ValidationType::Sql, ValidationType::Api, ValidationType::Db]
    }

    #[instrument(skip(self, field, rule), fields(field.name = %field.name(), kind = %rule.validation_type))]
    fn check(&self, field: &Field, rule: &ValidationConfig) -> Result<Option<RuleFailure>> {
        let backend = self.backend.as_ref().ok_or_else(|| {
            TermError::configuration(format!(
                "{} validation on field '{}' requires a lookup backend",
                rule.validation_type,
                field.name()
            ))
        })?;

        let value = field.value_or_empty().trim();
        let found = backend.lookup(rule.validation_type, &rule.params, value)?;
        debug!(found, "Lookup completed");

        if found {
            Ok(None)
        } else {
            Ok(Some(RuleFailure::new(format!(
                "value '{value}' failed {} lookup",
                rule.validation_type
            ))))
        }
    }
}
