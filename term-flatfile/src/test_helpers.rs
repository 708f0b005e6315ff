//! Test helpers shared by the unit tests of validators and the executor.

use crate::core::{DataType, Field, FieldConfig, Severity, ValidationConfig, ValidationType};
use crate::prelude::*;
use crate::validators::LookupBackend;
use std::collections::HashSet;
use std::sync::Arc;

/// Builds a field named `field` carrying one ERROR rule per `(kind, params)`.
pub fn field_with_rules(
    value: Option<&str>,
    rules: Vec<(ValidationType, serde_json::Value)>,
) -> Field {
    let config = rules.into_iter().fold(
        FieldConfig::new("field", DataType::Any),
        |config, (kind, params)| {
            config.with_validation(ValidationConfig::new(kind, Severity::Error, params))
        },
    );
    Field::new(Arc::new(config), value.map(str::to_string))
}

/// A lookup backend answering from a fixed set of known values.
#[derive(Debug, Default)]
pub struct StaticLookup {
    known: HashSet<String>,
    reachable: bool,
}

impl StaticLookup {
    pub fn new<'a>(known: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            known: known.into_iter().map(str::to_string).collect(),
            reachable: true,
        }
    }

    /// A backend whose every lookup fails.
    pub fn unreachable() -> Self {
        Self::default()
    }
}

impl LookupBackend for StaticLookup {
    fn lookup(
        &self,
        kind: ValidationType,
        _params: &serde_json::Value,
        value: &str,
    ) -> Result<bool> {
        if !self.reachable {
            return Err(TermError::lookup_failed(kind.as_str(), "backend unreachable"));
        }
        Ok(self.known.contains(value))
    }
}
