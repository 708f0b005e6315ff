//! Records, fields and the record set of a validation run.

use super::{FieldConfig, RecordConfig, ValidationIssue};
use crate::aggregate::AggregateStore;
use crate::prelude::*;
use std::collections::BTreeMap;
use std::sync::Arc;

/// One named value of a record plus its validation outcome.
#[derive(Debug, Clone)]
pub struct Field {
    value: Option<String>,
    config: Arc<FieldConfig>,
    errors: Vec<ValidationIssue>,
    data_type_error: bool,
}

impl Field {
    pub fn new(config: Arc<FieldConfig>, value: Option<String>) -> Self {
        Self {
            value,
            config,
            errors: Vec::new(),
            data_type_error: false,
        }
    }

    /// Returns the field name declared by the configuration.
    pub fn name(&self) -> &str {
        &self.config.field_name
    }

    /// Returns the raw value, `None` when the source had no value at all.
    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    /// Returns the raw value, or the empty string when absent.
    pub fn value_or_empty(&self) -> &str {
        self.value.as_deref().unwrap_or_default()
    }

    pub fn config(&self) -> &Arc<FieldConfig> {
        &self.config
    }

    pub fn errors(&self) -> &[ValidationIssue] {
        &self.errors
    }

    pub(crate) fn errors_mut(&mut self) -> &mut Vec<ValidationIssue> {
        &mut self.errors
    }

    pub fn add_error(&mut self, issue: ValidationIssue) {
        self.errors.push(issue);
    }

    /// Returns true if a validator found the value incompatible with its type.
    pub fn is_data_type_error(&self) -> bool {
        self.data_type_error
    }

    pub fn mark_data_type_error(&mut self) {
        self.data_type_error = true;
    }
}

/// One row of structured data.
#[derive(Debug, Clone)]
pub struct Record {
    record_number: usize,
    fields: Vec<Field>,
}

impl Record {
    pub fn new(record_number: usize, fields: Vec<Field>) -> Self {
        Self {
            record_number,
            fields,
        }
    }

    /// Pairs raw values with the field layout of `config`, in declared order.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the number of values differs from the
    /// number of declared fields.
    pub fn from_values(
        config: &RecordConfig,
        record_number: usize,
        values: Vec<Option<String>>,
    ) -> Result<Self> {
        if values.len() != config.fields.len() {
            return Err(TermError::configuration(format!(
                "record {record_number} has {} values but {} fields are declared",
                values.len(),
                config.fields.len()
            )));
        }

        let fields = config
            .fields
            .iter()
            .zip(values)
            .map(|(field_config, value)| Field::new(Arc::clone(field_config), value))
            .collect();

        Ok(Self::new(record_number, fields))
    }

    pub fn record_number(&self) -> usize {
        self.record_number
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn fields_mut(&mut self) -> &mut [Field] {
        &mut self.fields
    }

    /// Returns the first field with the given name.
    pub fn get(&self, field_name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name() == field_name)
    }
}

/// Records of one run keyed by their 0-based position.
///
/// The set also carries the run-wide aggregate store and, once the error
/// collector has run, the collected issues and the overall verdict.
#[derive(Debug, Default)]
pub struct RecordSet {
    records: BTreeMap<usize, Record>,
    map_values: AggregateStore,
    errors: Vec<ValidationIssue>,
    has_error: bool,
}

impl RecordSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a set with positions `0..records.len()`.
    pub fn from_records(records: impl IntoIterator<Item = Record>) -> Self {
        let mut set = Self::new();
        for record in records {
            set.push(record);
        }
        set
    }

    /// Builds a set from raw rows laid out by `config`.
    ///
    /// Record numbers start at 1 and follow the row order.
    pub fn from_rows<I>(config: &RecordConfig, rows: I) -> Result<Self>
    where
        I: IntoIterator<Item = Vec<Option<String>>>,
    {
        let mut set = Self::new();
        for (position, values) in rows.into_iter().enumerate() {
            let record = Record::from_values(config, position + 1, values)
                .with_context(|| format!("Failed to load row at position {position}"))?;
            set.push(record);
        }
        Ok(set)
    }

    /// Appends a record at the next position and returns that position.
    pub fn push(&mut self, record: Record) -> usize {
        let position = self.records.len();
        self.records.insert(position, record);
        position
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, position: usize) -> Option<&Record> {
        self.records.get(&position)
    }

    /// Iterates records in ascending position order.
    pub fn records(&self) -> impl Iterator<Item = (usize, &Record)> {
        self.records.iter().map(|(position, record)| (*position, record))
    }

    pub fn records_mut(&mut self) -> impl Iterator<Item = (usize, &mut Record)> {
        self.records
            .iter_mut()
            .map(|(position, record)| (*position, record))
    }

    pub fn map_values(&self) -> &AggregateStore {
        &self.map_values
    }

    pub fn map_values_mut(&mut self) -> &mut AggregateStore {
        &mut self.map_values
    }

    /// Splits the set into its records and its aggregate store.
    pub(crate) fn records_and_store_mut(
        &mut self,
    ) -> (&mut BTreeMap<usize, Record>, &mut AggregateStore) {
        (&mut self.records, &mut self.map_values)
    }

    /// Issues gathered by the last error collection.
    pub fn errors(&self) -> &[ValidationIssue] {
        &self.errors
    }

    pub fn has_error(&self) -> bool {
        self.has_error
    }

    pub(crate) fn set_collected(&mut self, errors: Vec<ValidationIssue>, has_error: bool) {
        self.errors = errors;
        self.has_error = has_error;
    }
}
