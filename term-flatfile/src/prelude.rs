//! Prelude for commonly used types and traits in term-flatfile.

pub use crate::context::{EvaluationContext, InMemoryContext};
pub use crate::error::{ErrorContext, Result, TermError};
pub use crate::executor::RecordValidator;
pub use crate::logging::LogConfig;
