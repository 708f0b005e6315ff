//! Shared key-value evaluation context.
//!
//! Map-function conditions are evaluated against a context holding the
//! current record's field values and the latest aggregate values. The host
//! owns the context; this crate reaches it only through the
//! [`EvaluationContext`] trait, which [`InMemoryContext`] implements for
//! standalone use and tests.
//!
//! A context is plain mutable state with no locking. Every call takes it by
//! `&mut`, so one context cannot be shared by concurrent runs; give each run
//! its own instance, or go through the snapshot/restore functions in
//! [`stager`] when one run nests inside another.

pub mod filter;
pub mod stager;

pub use filter::FilterList;
pub use stager::{
    clean_values_from_context, move_dup_values_from_context, restore_values_to_context,
    truncate_leading_zeroes, update_values_to_context, DupValues,
};

use bigdecimal::BigDecimal;
use std::collections::HashMap;
use std::fmt;
use tracing::info;

/// A value stored in the evaluation context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContextValue {
    Text(String),
    Number(BigDecimal),
}

impl ContextValue {
    /// Returns the value as a decimal, parsing text if needed.
    pub fn as_decimal(&self) -> Option<BigDecimal> {
        match self {
            ContextValue::Number(n) => Some(n.clone()),
            ContextValue::Text(s) => s.trim().parse().ok(),
        }
    }
}

impl fmt::Display for ContextValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContextValue::Text(s) => f.write_str(s),
            ContextValue::Number(n) => write!(f, "{n}"),
        }
    }
}

impl From<&str> for ContextValue {
    fn from(value: &str) -> Self {
        ContextValue::Text(value.to_string())
    }
}

impl From<String> for ContextValue {
    fn from(value: String) -> Self {
        ContextValue::Text(value)
    }
}

impl From<BigDecimal> for ContextValue {
    fn from(value: BigDecimal) -> Self {
        ContextValue::Number(value)
    }
}

/// The host's variable store and step log.
pub trait EvaluationContext {
    /// Writes `value` under `key`, replacing any previous value.
    fn set_data(&mut self, key: &str, value: ContextValue);

    /// Reads the value stored under `key`.
    fn get_object_data(&self, key: &str) -> Option<&ContextValue>;

    fn has_data(&self, key: &str) -> bool {
        self.get_object_data(key).is_some()
    }

    /// Removes `key`, returning the value it held.
    fn remove_data(&mut self, key: &str) -> Option<ContextValue>;

    /// Records an advisory step message. Never affects control flow.
    fn log_current_step(&mut self, message: &str) {
        info!(step = %message, "Context step");
    }
}

/// A `HashMap`-backed context that also keeps every logged step.
#[derive(Debug, Clone, Default)]
pub struct InMemoryContext {
    data: HashMap<String, ContextValue>,
    steps: Vec<String>,
}

impl InMemoryContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Steps logged so far, oldest first.
    pub fn steps(&self) -> &[String] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl EvaluationContext for InMemoryContext {
    fn set_data(&mut self, key: &str, value: ContextValue) {
        self.data.insert(key.to_string(), value);
    }

    fn get_object_data(&self, key: &str) -> Option<&ContextValue> {
        self.data.get(key)
    }

    fn remove_data(&mut self, key: &str) -> Option<ContextValue> {
        self.data.remove(key)
    }

    fn log_current_step(&mut self, message: &str) {
        info!(step = %message, "Context step");
        self.steps.push(message.to_string());
    }
}
