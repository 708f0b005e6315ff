//! Core data model of the flat-file validation pipeline.
//!
//! ## Overview
//!
//! - **[`RecordConfig`]** / **[`FieldConfig`]**: declarative layout of a record
//!   type, its per-field rules and its map-function directives
//! - **[`RecordSet`]** / **[`Record`]** / **[`Field`]**: the data of one run
//! - **[`ValidationIssue`]**: a failed rule, recorded as data on its field
//! - **[`ValidationReport`]**: all issues of a run and the pass/fail verdict
//!
//! ## Architecture
//!
//! ```text
//! RecordSet
//!     ├── 0 → Record
//!     │   ├── Field ── Arc<FieldConfig> ── [ValidationConfig]
//!     │   └── Field ── Arc<FieldConfig>
//!     ├── 1 → Record
//!     └── AggregateStore (whole run)
//! ```

mod config;
mod level;
mod record;
mod result;

pub use config::{
    Alignment, DataType, FieldConfig, MapFunction, MapFunctionConfig, RecordConfig,
    ValidationConfig, ValidationType,
};
pub use level::Severity;
pub use record::{Field, Record, RecordSet};
pub use result::{ValidationIssue, ValidationReport};
