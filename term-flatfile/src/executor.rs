//! Orchestration of a whole validation run.

use crate::aggregate::{AggregateStore, MapPlan};
use crate::collector::collect_errors;
use crate::context::{
    move_dup_values_from_context, restore_values_to_context, EvaluationContext,
};
use crate::core::{Record, RecordConfig, RecordSet, ValidationReport};
use crate::logging::LogConfig;
use crate::prelude::*;
use crate::validators::{BasicValidator, FieldValidator, LookupBackend, ValidationChain};
use crate::{log_context_op, perf_debug};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, instrument};

/// Runs basic checks, declarative rules and map functions over a record set.
///
/// For every record, in ascending position, each field goes through the
/// [`BasicValidator`] and the [`ValidationChain`]; the record's map-function
/// directives run right after, so conditions of later records see the
/// aggregates of earlier ones. Once every record is done the issues are
/// collected into a [`ValidationReport`].
///
/// # Examples
///
/// ```rust
/// use serde_json::json;
/// use term_flatfile::core::*;
/// use term_flatfile::prelude::*;
///
/// let config = RecordConfig::new("payment")
///     .field(FieldConfig::new("amount", DataType::Numeric))
///     .field(
///         FieldConfig::new("currency", DataType::Alphanumeric).with_validation(
///             ValidationConfig::new(ValidationType::In, Severity::Error, json!(["USD", "EUR"])),
///         ),
///     )
///     .map_function(MapFunctionConfig::new("amount", MapFunction::Aggregate, "total"));
///
/// let mut records = RecordSet::from_rows(
///     &config,
///     vec![
///         vec![Some("100".to_string()), Some("USD".to_string())],
///         vec![Some("25.5".to_string()), Some("GBP".to_string())],
///     ],
/// )
/// .unwrap();
///
/// let mut ctx = InMemoryContext::new();
/// let report = RecordValidator::new().run(&mut ctx, &config, &mut records).unwrap();
///
/// assert!(!report.is_success());
/// assert_eq!(report.issues[0].record_line, Some(2));
/// assert_eq!(records.map_values().get("total").unwrap().to_string(), "125.5");
/// ```
#[derive(Debug)]
pub struct RecordValidator {
    basic: BasicValidator,
    chain: ValidationChain,
    log_config: LogConfig,
}

impl RecordValidator {
    /// Creates a validator with the standard chain and no lookup backend.
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> RecordValidatorBuilder {
        RecordValidatorBuilder::new()
    }

    pub fn chain(&self) -> &ValidationChain {
        &self.chain
    }

    pub fn log_config(&self) -> &LogConfig {
        &self.log_config
    }

    /// Validates every field of one record. Returns the number of declarative
    /// rules evaluated.
    pub fn validate_record(&self, record: &mut Record) -> Result<usize> {
        let mut evaluated = 0;
        for field in record.fields_mut() {
            self.basic.validate_field(field);
            evaluated += self.chain.validate(field)?;
        }

        perf_debug!(
            self.log_config,
            record.number = record.record_number(),
            rules = evaluated,
            "Record validated"
        );
        Ok(evaluated)
    }

    /// Validates every record without running map functions.
    pub fn validate_fields(&self, record_set: &mut RecordSet) -> Result<usize> {
        let mut evaluated = 0;
        for (_, record) in record_set.records_mut() {
            evaluated += self.validate_record(record)?;
        }
        Ok(evaluated)
    }

    /// Runs the whole pipeline over `record_set`.
    ///
    /// The aggregates accumulate into the set's store, so running a second
    /// set requires a fresh [`RecordSet`].
    ///
    /// # Errors
    ///
    /// Aborts on the first configuration, condition, lookup, numeric parse or
    /// aggregate conflict fault. Failed rules are never errors; they are
    /// reported as issues.
    #[instrument(skip(self, ctx, config, record_set), fields(
        record_type = ?config.name,
        records = record_set.len(),
        map_functions = config.map_functions.len()
    ))]
    pub fn run<C>(
        &self,
        ctx: &mut C,
        config: &RecordConfig,
        record_set: &mut RecordSet,
    ) -> Result<ValidationReport>
    where
        C: EvaluationContext + ?Sized,
    {
        info!(
            record_type = ?config.name,
            records = record_set.len(),
            "Starting record validation"
        );
        let start_time = Instant::now();
        let plan = MapPlan::compile(config)?;

        let mut evaluated = 0;
        let (records, store) = record_set.records_and_store_mut();
        for record in records.values_mut() {
            evaluated += self.validate_record(record)?;
            plan.collect(ctx, record, store)?;
        }

        self.log_map_values(record_set.map_values());
        let report = collect_errors(record_set);

        info!(
            record_type = ?config.name,
            rules.evaluated = evaluated,
            issues = report.issues.len(),
            duration_ms = start_time.elapsed().as_millis() as u64,
            result = %if report.has_error { "failed" } else { "passed" },
            "Record validation completed"
        );
        Ok(report)
    }

    /// Runs the pipeline inside a context that an enclosing run is using.
    ///
    /// Context entries under the directive target and source names are
    /// snapshotted before the run and written back afterwards, also when the
    /// run fails.
    pub fn run_nested<C>(
        &self,
        ctx: &mut C,
        config: &RecordConfig,
        record_set: &mut RecordSet,
    ) -> Result<ValidationReport>
    where
        C: EvaluationContext + ?Sized,
    {
        let dup = move_dup_values_from_context(&*ctx, [config]);
        log_context_op!(
            self.log_config,
            snapshotted = dup.len(),
            "Snapshotted context values for nested run"
        );

        let result = self.run(ctx, config, record_set);
        restore_values_to_context(ctx, &dup);
        result
    }

    /// Logs the final value of every aggregate.
    pub fn log_map_values(&self, store: &AggregateStore) {
        for (name, acc) in store.iter() {
            log_context_op!(
                self.log_config,
                map.to = %name,
                map.function = %acc.kind(),
                map.value = %acc.value(),
                map.updates = acc.counter(),
                "Final aggregate value"
            );
        }
    }
}

impl Default for RecordValidator {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for [`RecordValidator`].
///
/// ```rust
/// use std::sync::Arc;
/// use term_flatfile::core::ValidationType;
/// use term_flatfile::prelude::*;
/// use term_flatfile::validators::LookupBackend;
///
/// #[derive(Debug)]
/// struct KnownCustomers;
///
/// impl LookupBackend for KnownCustomers {
///     fn lookup(&self, _kind: ValidationType, _params: &serde_json::Value, value: &str) -> Result<bool> {
///         Ok(value.starts_with("C-"))
///     }
/// }
///
/// let validator = RecordValidator::builder()
///     .lookup_backend(Arc::new(KnownCustomers))
///     .log_config(LogConfig::production())
///     .build();
/// assert_eq!(validator.chain().validators().len(), 5);
/// ```
#[derive(Debug, Default)]
pub struct RecordValidatorBuilder {
    lookup: Option<Arc<dyn LookupBackend>>,
    validators: Option<Vec<Box<dyn FieldValidator>>>,
    log_config: LogConfig,
}

impl RecordValidatorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the backend answering SQL, API and DB rules.
    pub fn lookup_backend(mut self, backend: Arc<dyn LookupBackend>) -> Self {
        self.lookup = Some(backend);
        self
    }

    /// Replaces the standard chain with custom strategies, in the given order.
    ///
    /// The lookup backend is ignored when custom strategies are set.
    pub fn with_validators(mut self, validators: Vec<Box<dyn FieldValidator>>) -> Self {
        self.validators = Some(validators);
        self
    }

    pub fn log_config(mut self, log_config: LogConfig) -> Self {
        self.log_config = log_config;
        self
    }

    pub fn build(self) -> RecordValidator {
        let chain = match self.validators {
            Some(validators) => ValidationChain::from_validators(validators),
            None => ValidationChain::new(self.lookup),
        };

        RecordValidator {
            basic: BasicValidator::new(),
            chain: chain.with_log_config(self.log_config.clone()),
            log_config: self.log_config,
        }
    }
}
