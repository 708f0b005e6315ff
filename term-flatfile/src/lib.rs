//! # term-flatfile
//!
//! Per-record field validation and running aggregation for structured
//! flat-file records.
//!
//! A [`RecordConfig`](core::RecordConfig) declares the fields of a record type,
//! the rules each field must satisfy and the map-function directives that
//! feed field values into named, run-wide aggregates. The
//! [`RecordValidator`](executor::RecordValidator) walks a
//! [`RecordSet`](core::RecordSet) record by record:
//!
//! 1. every field gets its data type, alignment and length checked;
//! 2. the field's declarative rules (REGEX, EQUALS, IN, DATE, SQL/API/DB) run
//!    through the validation chain;
//! 3. the record's map functions (AVERAGE, AGGREGATE, MIN, MAX, COUNT) update
//!    the aggregates, honoring conditions that can read both the record and
//!    the aggregates so far;
//! 4. once all records are done, every issue is stamped with its record line
//!    and the run passes unless an ERROR-severity issue exists.
//!
//! Failed rules are data ([`ValidationIssue`](core::ValidationIssue)); only
//! broken configuration and backend faults surface as
//! [`TermError`](error::TermError).
//!
//! ## Quick Start
//!
//! ```rust
//! use serde_json::json;
//! use term_flatfile::core::{RecordConfig, RecordSet, Severity};
//! use term_flatfile::prelude::*;
//!
//! let config: RecordConfig = serde_json::from_value(json!({
//!     "name": "invoice",
//!     "fields": [
//!         {"fieldName": "number", "dataType": "a/n", "length": 6,
//!          "validations": [{"type": "REGEX", "params": {"regex": "INV\\d{3}"}}]},
//!         {"fieldName": "state", "dataType": "*"},
//!         {"fieldName": "amount", "dataType": "n"}
//!     ],
//!     "mapFunctions": [
//!         {"fieldName": "amount", "function": "AVERAGE", "mapTo": "avgAmount"},
//!         {"fieldName": "amount", "function": "AGGREGATE", "mapTo": "caTotal",
//!          "condition": "${state} = CA"}
//!     ]
//! }))
//! .unwrap();
//!
//! let rows = [("INV001", "CA", "100"), ("INV002", "NV", "50"), ("X", "CA", "0")];
//! let mut records = RecordSet::from_rows(
//!     &config,
//!     rows.iter()
//!         .map(|(n, s, a)| vec![Some(n.to_string()), Some(s.to_string()), Some(a.to_string())]),
//! )
//! .unwrap();
//!
//! let mut ctx = InMemoryContext::new();
//! let report = RecordValidator::new()
//!     .run(&mut ctx, &config, &mut records)
//!     .unwrap();
//!
//! // "X" fails both its length and its pattern on line 3
//! assert!(!report.is_success());
//! assert_eq!(report.issues_for_line(3).len(), 2);
//! assert!(report.issues.iter().all(|i| i.severity == Severity::Error));
//!
//! assert_eq!(records.map_values().get("caTotal").unwrap().to_string(), "100");
//! assert_eq!(records.map_values().get("avgAmount").unwrap().round(2).to_string(), "50.00");
//! ```
//!
//! ## Modules
//!
//! - [`core`]: configuration, record and report types
//! - [`validators`]: the basic validator and the rule chain
//! - [`aggregate`]: exact-decimal aggregates and map-function directives
//! - [`context`]: the evaluation context, staging and filter conditions
//! - [`collector`]: issue stamping and the pass/fail verdict
//! - [`executor`]: the [`RecordValidator`](executor::RecordValidator) that ties
//!   them together
//! - [`logging`]: log configuration and subscriber setup

pub mod aggregate;
pub mod collector;
pub mod context;
pub mod core;
pub mod error;
pub mod executor;
pub mod logging;
pub mod prelude;
pub mod validators;

#[cfg(test)]
mod test_helpers;
