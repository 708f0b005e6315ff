//! Feeding record fields into named aggregates.

use super::{is_within_range, AggregateStore};
use crate::context::{
    clean_values_from_context, update_values_to_context, EvaluationContext, FilterList,
};
use crate::core::{Field, MapFunction, MapFunctionConfig, Record, RecordConfig};
use crate::prelude::*;
use bigdecimal::BigDecimal;
use tracing::{debug, instrument};

/// The map-function directives of one record type with their conditions
/// parsed once.
///
/// A run compiles the plan before its first record so a malformed condition
/// aborts the run up front, and each record only evaluates the parsed filters.
#[derive(Debug, Clone)]
pub struct MapPlan<'a> {
    config: &'a RecordConfig,
    conditions: Vec<Option<FilterList>>,
}

impl<'a> MapPlan<'a> {
    /// Parses every directive condition of `config`.
    ///
    /// # Errors
    ///
    /// Returns [`TermError::InvalidCondition`] for the first malformed
    /// condition.
    pub fn compile(config: &'a RecordConfig) -> Result<Self> {
        let conditions = config
            .map_functions
            .iter()
            .map(|directive| {
                directive
                    .condition
                    .as_deref()
                    .map(FilterList::parse)
                    .transpose()
            })
            .collect::<Result<Vec<_>>>()?;
        debug!(
            record_type = ?config.name,
            directives = config.map_functions.len(),
            conditions = conditions.iter().flatten().count(),
            "Compiled map functions"
        );
        Ok(Self { config, conditions })
    }

    pub fn config(&self) -> &RecordConfig {
        self.config
    }

    pub fn is_empty(&self) -> bool {
        self.config.map_functions.is_empty()
    }

    /// Applies every directive of the plan to `record`.
    ///
    /// Aggregate and field values are staged into `ctx` first so conditions
    /// can read them; the field entries are removed again before returning,
    /// whether the directives succeed or not. A record type without
    /// directives leaves both the store and the context untouched.
    ///
    /// For each directive the source field is located in the record:
    ///
    /// - a field flagged with a data type error is skipped, leaving the
    ///   aggregate unchanged;
    /// - a field whose condition does not hold against the staged context is
    ///   skipped;
    /// - otherwise the function is applied. COUNT ignores the value; the
    ///   other functions parse `sign + value` as a decimal.
    ///
    /// # Errors
    ///
    /// Returns [`TermError::Configuration`] for an unknown source or sign
    /// field, [`TermError::NumericParse`] for a value that is not a decimal
    /// (or whose exponent exceeds [`MAX_EXPONENT`](super::MAX_EXPONENT)) and
    /// [`TermError::AggregateConflict`] when two functions share a target
    /// name.
    #[instrument(skip_all, fields(record.number = record.record_number()))]
    pub fn collect<C>(
        &self,
        ctx: &mut C,
        record: &Record,
        store: &mut AggregateStore,
    ) -> Result<()>
    where
        C: EvaluationContext + ?Sized,
    {
        if self.is_empty() {
            return Ok(());
        }

        update_values_to_context(ctx, self.config, record, store);
        let result = self.apply_directives(ctx, record, store);
        clean_values_from_context(ctx, record);
        result
    }

    fn apply_directives<C>(
        &self,
        ctx: &mut C,
        record: &Record,
        store: &mut AggregateStore,
    ) -> Result<()>
    where
        C: EvaluationContext + ?Sized,
    {
        for (directive, filters) in self.config.map_functions.iter().zip(&self.conditions) {
            let sign = sign_of(directive, record)?;

            let field = record.get(&directive.field_name).ok_or_else(|| {
                TermError::configuration(format!(
                    "{} on unknown field '{}'",
                    directive.function, directive.field_name
                ))
            })?;

            if field.is_data_type_error() {
                ctx.log_current_step(&format!(
                    "skip {} of field '{}' because of data type error",
                    directive.function,
                    field.name()
                ));
                continue;
            }

            if let Some(filters) = filters {
                if !filters.is_matched(&*ctx, &directive.map_to)? {
                    ctx.log_current_step(&format!(
                        "skip {} of record {} because condition '{}' is not matched",
                        directive.function,
                        record.record_number(),
                        filters.condition()
                    ));
                    continue;
                }
            }

            let value = match directive.function {
                MapFunction::Count => None,
                _ => Some(parse_value(field, sign)?),
            };
            store.apply(directive.function, &directive.map_to, value)?;

            debug!(
                map.function = %directive.function,
                map.to = %directive.map_to,
                field.name = %field.name(),
                value = ?store.get(&directive.map_to).map(ToString::to_string),
                "Map function applied"
            );
        }

        Ok(())
    }
}

/// Applies every map-function directive of `config` to `record`.
///
/// Compiles a [`MapPlan`] for this one record; runs over many records compile
/// the plan once and call [`MapPlan::collect`] instead.
///
/// # Errors
///
/// Returns [`TermError::InvalidCondition`] for a malformed condition, plus
/// every error of [`MapPlan::collect`].
pub fn collect_map_values<C>(
    ctx: &mut C,
    config: &RecordConfig,
    record: &Record,
    store: &mut AggregateStore,
) -> Result<()>
where
    C: EvaluationContext + ?Sized,
{
    MapPlan::compile(config)?.collect(ctx, record, store)
}

fn sign_of<'a>(directive: &MapFunctionConfig, record: &'a Record) -> Result<&'a str> {
    match &directive.sign_field {
        None => Ok(""),
        Some(name) => record
            .get(name)
            .map(|field| field.value_or_empty().trim())
            .ok_or_else(|| {
                TermError::configuration(format!(
                    "sign field '{name}' of {} on '{}' is not a field of the record",
                    directive.function, directive.field_name
                ))
            }),
    }
}

fn parse_value(field: &Field, sign: &str) -> Result<BigDecimal> {
    let text = format!("{sign}{}", field.value_or_empty().trim());
    let digits = text.strip_prefix('+').unwrap_or(&text);

    let value: BigDecimal = digits.parse().map_err(|_| TermError::NumericParse {
        field: field.name().to_string(),
        value: text.clone(),
    })?;
    if !is_within_range(&value) {
        return Err(TermError::NumericParse {
            field: field.name().to_string(),
            value: text,
        });
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::InMemoryContext;
    use crate::core::{DataType, FieldConfig};
    use std::str::FromStr;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    fn layout() -> RecordConfig {
        RecordConfig::new("detail")
            .field(FieldConfig::new("sign", DataType::Any))
            .field(FieldConfig::new("amount", DataType::Numeric))
            .field(FieldConfig::new("state", DataType::Any))
    }

    fn record(config: &RecordConfig, number: usize, values: [&str; 3]) -> Record {
        Record::from_values(
            config,
            number,
            values.iter().map(|v| Some(v.to_string())).collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_all_functions_over_records() {
        let config = layout()
            .map_function(MapFunctionConfig::new("amount", MapFunction::Aggregate, "total"))
            .map_function(MapFunctionConfig::new("amount", MapFunction::Min, "low"))
            .map_function(MapFunctionConfig::new("amount", MapFunction::Max, "high"))
            .map_function(MapFunctionConfig::new("amount", MapFunction::Average, "avg"))
            .map_function(MapFunctionConfig::new("state", MapFunction::Count, "rows"));
        let mut ctx = InMemoryContext::new();
        let mut store = AggregateStore::new();

        for (n, amount) in ["10", "0030", "-5"].into_iter().enumerate() {
            let rec = record(&config, n + 1, ["", amount, "CA"]);
            collect_map_values(&mut ctx, &config, &rec, &mut store).unwrap();
        }

        assert_eq!(store.get("total"), Some(&dec("35")));
        assert_eq!(store.get("low"), Some(&dec("-5")));
        assert_eq!(store.get("high"), Some(&dec("30")));
        assert_eq!(store.get("rows"), Some(&dec("3")));
        assert_eq!(
            store.get("avg"),
            Some(&dec("11.6666666666666666666666667"))
        );
    }

    #[test]
    fn test_sign_field_is_prepended() {
        let config = layout().map_function(
            MapFunctionConfig::new("amount", MapFunction::Aggregate, "total")
                .with_sign_field("sign"),
        );
        let mut ctx = InMemoryContext::new();
        let mut store = AggregateStore::new();

        for (sign, amount) in [(" - ", "12.50"), ("+", "2"), ("", "1")] {
            let rec = record(&config, 1, [sign, amount, "CA"]);
            collect_map_values(&mut ctx, &config, &rec, &mut store).unwrap();
        }

        assert_eq!(store.get("total"), Some(&dec("-9.5")));
    }

    #[test]
    fn test_condition_filters_records() {
        let config = layout().map_function(
            MapFunctionConfig::new("amount", MapFunction::Aggregate, "ca_total")
                .with_condition("${state} = CA & ${ca_total} < 100"),
        );
        let mut ctx = InMemoryContext::new();
        let mut store = AggregateStore::new();

        for (n, (amount, state)) in [("60", "CA"), ("5", "NV"), ("50", "CA"), ("7", "CA")]
            .into_iter()
            .enumerate()
        {
            let rec = record(&config, n + 1, ["", amount, state]);
            collect_map_values(&mut ctx, &config, &rec, &mut store).unwrap();
        }

        // the fourth record is skipped because the running total reached 110
        assert_eq!(store.get("ca_total"), Some(&dec("110")));
        assert!(ctx
            .steps()
            .iter()
            .any(|s| s.contains("record 2") && s.contains("not matched")));
        assert!(ctx.steps().iter().any(|s| s.contains("record 4")));
    }

    #[test]
    fn test_data_type_error_skips_directive() {
        let config = layout()
            .map_function(MapFunctionConfig::new("amount", MapFunction::Aggregate, "total"))
            .map_function(MapFunctionConfig::new("amount", MapFunction::Count, "rows"));
        let mut ctx = InMemoryContext::new();
        let mut store = AggregateStore::new();
        store.aggregate("total", dec("5")).unwrap();

        let mut rec = record(&config, 1, ["", "12x", "CA"]);
        rec.fields_mut()[1].mark_data_type_error();
        collect_map_values(&mut ctx, &config, &rec, &mut store).unwrap();

        assert_eq!(store.get("total"), Some(&dec("5")));
        assert!(!store.contains("rows"));
        assert_eq!(ctx.steps().len(), 2);
        assert!(ctx.steps()[0].contains("data type error"));
    }

    #[test]
    fn test_count_does_not_parse() {
        let config =
            layout().map_function(MapFunctionConfig::new("state", MapFunction::Count, "rows"));
        let mut ctx = InMemoryContext::new();
        let mut store = AggregateStore::new();

        let rec = record(&config, 1, ["", "1", "not a number"]);
        collect_map_values(&mut ctx, &config, &rec, &mut store).unwrap();
        assert_eq!(store.get("rows"), Some(&dec("1")));
    }

    #[test]
    fn test_context_is_clean_after_success() {
        let config = layout()
            .map_function(MapFunctionConfig::new("amount", MapFunction::Aggregate, "total"));
        let mut ctx = InMemoryContext::new();
        let mut store = AggregateStore::new();

        let rec = record(&config, 1, ["-", "4", "CA"]);
        collect_map_values(&mut ctx, &config, &rec, &mut store).unwrap();

        for name in ["sign", "amount", "state"] {
            assert!(!ctx.has_data(name), "{name} left in context");
        }
        // the aggregate staged before evaluation is not a field entry
        assert!(ctx.has_data("total"));
    }

    #[test]
    fn test_context_is_clean_after_fault() {
        let config = layout()
            .map_function(MapFunctionConfig::new("amount", MapFunction::Aggregate, "total"));
        let mut ctx = InMemoryContext::new();
        let mut store = AggregateStore::new();

        let rec = record(&config, 1, ["", "abc", "CA"]);
        let err = collect_map_values(&mut ctx, &config, &rec, &mut store).unwrap_err();

        assert!(matches!(err, TermError::NumericParse { ref value, .. } if value == "abc"));
        for name in ["sign", "amount", "state"] {
            assert!(!ctx.has_data(name));
        }
    }

    #[test]
    fn test_unknown_fields_are_configuration_errors() {
        let mut ctx = InMemoryContext::new();
        let mut store = AggregateStore::new();

        let config = layout()
            .map_function(MapFunctionConfig::new("missing", MapFunction::Aggregate, "total"));
        let rec = record(&config, 1, ["", "1", "CA"]);
        assert!(matches!(
            collect_map_values(&mut ctx, &config, &rec, &mut store),
            Err(TermError::Configuration(_))
        ));

        let config = layout().map_function(
            MapFunctionConfig::new("amount", MapFunction::Aggregate, "total")
                .with_sign_field("nope"),
        );
        let rec = record(&config, 1, ["", "1", "CA"]);
        assert!(matches!(
            collect_map_values(&mut ctx, &config, &rec, &mut store),
            Err(TermError::Configuration(_))
        ));
        assert!(!ctx.has_data("amount"));
    }

    #[test]
    fn test_no_directives_leaves_context_untouched() {
        let config = layout();
        let mut ctx = InMemoryContext::new();
        ctx.set_data("amount", "outer".into());
        let mut store = AggregateStore::new();

        let rec = record(&config, 1, ["", "1", "CA"]);
        collect_map_values(&mut ctx, &config, &rec, &mut store).unwrap();

        assert!(store.is_empty());
        assert_eq!(ctx.len(), 1);
        assert!(ctx.has_data("amount"));
    }

    #[test]
    fn test_huge_exponent_is_a_parse_fault() {
        let config = layout()
            .map_function(MapFunctionConfig::new("state", MapFunction::Average, "avg"));
        let mut ctx = InMemoryContext::new();
        let mut store = AggregateStore::new();

        let rec = record(&config, 1, ["", "1", "1E4294967271"]);
        let err = collect_map_values(&mut ctx, &config, &rec, &mut store).unwrap_err();

        assert!(matches!(
            err,
            TermError::NumericParse { ref field, ref value }
                if field == "state" && value == "1E4294967271"
        ));
        assert!(!store.contains("avg"));
        assert!(!ctx.has_data("state"));
    }

    #[test]
    fn test_plan_is_compiled_once_for_many_records() {
        let config = layout().map_function(
            MapFunctionConfig::new("amount", MapFunction::Aggregate, "ca_total")
                .with_condition("${state} = CA"),
        );
        let plan = MapPlan::compile(&config).unwrap();
        let mut ctx = InMemoryContext::new();
        let mut store = AggregateStore::new();

        for (n, state) in ["CA", "NV", "CA"].into_iter().enumerate() {
            let rec = record(&config, n + 1, ["", "5", state]);
            plan.collect(&mut ctx, &rec, &mut store).unwrap();
        }

        assert_eq!(store.get("ca_total"), Some(&dec("10")));
        assert!(!plan.is_empty());
    }

    #[test]
    fn test_malformed_condition_fails_before_staging() {
        let config = layout().map_function(
            MapFunctionConfig::new("amount", MapFunction::Aggregate, "total")
                .with_condition("${state} ~~ CA"),
        );
        assert!(matches!(
            MapPlan::compile(&config),
            Err(TermError::InvalidCondition { .. })
        ));

        let mut ctx = InMemoryContext::new();
        let mut store = AggregateStore::new();
        let rec = record(&config, 1, ["", "5", "CA"]);
        assert!(collect_map_values(&mut ctx, &config, &rec, &mut store).is_err());
        assert!(ctx.is_empty());
        assert!(store.is_empty());
    }
}
