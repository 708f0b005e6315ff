//! Staging of record and aggregate values into the evaluation context.
//!
//! Before map-function conditions are evaluated, the current aggregate values
//! and the record's field values are written into the context; afterwards the
//! field entries are removed again. Field and aggregate names may collide with
//! entries owned by an enclosing invocation, so a caller nesting one run inside
//! another snapshots those keys with [`move_dup_values_from_context`] and puts
//! them back with [`restore_values_to_context`].

use super::{ContextValue, EvaluationContext};
use crate::aggregate::AggregateStore;
use crate::core::{Record, RecordConfig};
use std::collections::BTreeMap;
use tracing::debug;

/// Context entries set aside by [`move_dup_values_from_context`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DupValues {
    values: BTreeMap<String, ContextValue>,
}

impl DupValues {
    pub fn get(&self, key: &str) -> Option<&ContextValue> {
        self.values.get(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Normalizes a numeric-looking value for condition evaluation.
///
/// A leading `+` is dropped, leading zeroes are stripped, a leading `.` gets a
/// `0` back and a leading `-` is preserved. Values that end up blank return
/// `None`.
///
/// ```rust
/// use term_flatfile::context::truncate_leading_zeroes;
///
/// assert_eq!(truncate_leading_zeroes("007").as_deref(), Some("7"));
/// assert_eq!(truncate_leading_zeroes("-007").as_deref(), Some("-7"));
/// assert_eq!(truncate_leading_zeroes("00.5").as_deref(), Some("0.5"));
/// assert_eq!(truncate_leading_zeroes("+5").as_deref(), Some("5"));
/// assert_eq!(truncate_leading_zeroes("000"), None);
/// ```
pub fn truncate_leading_zeroes(text: &str) -> Option<String> {
    let negative = text.starts_with('-');
    let text = text.strip_prefix('+').unwrap_or(text);
    let text = text.strip_prefix('-').unwrap_or(text);
    let text = text.trim_start_matches('0');

    if text.trim().is_empty() {
        return None;
    }

    let mut normalized = String::with_capacity(text.len() + 2);
    if negative {
        normalized.push('-');
    }
    if text.starts_with('.') {
        normalized.push('0');
    }
    normalized.push_str(text);
    Some(normalized)
}

/// Writes aggregate values and the record's field values into the context.
///
/// Aggregates never written yet are staged as 0. Fields whose value is
/// absent, or blank after normalization, are removed from the context instead.
/// Does nothing for a record type without map-function directives.
pub fn update_values_to_context<C>(
    ctx: &mut C,
    config: &RecordConfig,
    record: &Record,
    store: &AggregateStore,
) where
    C: EvaluationContext + ?Sized,
{
    if config.map_functions.is_empty() {
        return;
    }

    for directive in &config.map_functions {
        ctx.set_data(
            &directive.map_to,
            ContextValue::Number(store.value_or_zero(&directive.map_to)),
        );
    }

    for field in record.fields() {
        match field.value().and_then(truncate_leading_zeroes) {
            Some(value) => ctx.set_data(field.name(), ContextValue::Text(value)),
            None => {
                ctx.remove_data(field.name());
            }
        }
    }

    debug!(
        record.number = record.record_number(),
        fields = record.fields().len(),
        aggregates = config.map_functions.len(),
        "Staged record values into context"
    );
}

/// Removes every field name of `record` from the context.
pub fn clean_values_from_context<C>(ctx: &mut C, record: &Record)
where
    C: EvaluationContext + ?Sized,
{
    for field in record.fields() {
        ctx.remove_data(field.name());
    }
}

/// Copies the existing context entries that `configs` would overwrite.
///
/// For every directive, the entries under its `mapTo` name and its source
/// field name are captured. The context itself is left untouched.
pub fn move_dup_values_from_context<'a, C, I>(ctx: &C, configs: I) -> DupValues
where
    C: EvaluationContext + ?Sized,
    I: IntoIterator<Item = &'a RecordConfig>,
{
    let mut dup = DupValues::default();

    for directive in configs.into_iter().flat_map(|c| c.map_functions.iter()) {
        for key in [&directive.map_to, &directive.field_name] {
            if let Some(value) = ctx.get_object_data(key) {
                dup.values.insert(key.clone(), value.clone());
            }
        }
    }

    dup
}

/// Writes every snapshotted entry back into the context.
pub fn restore_values_to_context<C>(ctx: &mut C, dup: &DupValues)
where
    C: EvaluationContext + ?Sized,
{
    for (key, value) in &dup.values {
        ctx.set_data(key, value.clone());
        ctx.log_current_step(&format!(
            "var '{key}' is restored to context with value '{value}'"
        ));
    }
}
