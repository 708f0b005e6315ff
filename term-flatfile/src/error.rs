//! Error types for the term-flatfile validation pipeline.
//!
//! Failed business rules are never errors here: they are recorded as
//! [`ValidationIssue`](crate::core::ValidationIssue) values on the field. The
//! `TermError` enum only covers faults that abort a run, such as broken
//! configuration, unreachable lookup backends or values that cannot be parsed
//! as the decimal a map function requires.

use thiserror::Error;

/// The main error type for term-flatfile.
#[derive(Error, Debug)]
pub enum TermError {
    /// Configuration that cannot be executed (unknown field, bad rule parameters).
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A filter condition that could not be parsed or evaluated.
    #[error("Invalid condition '{condition}': {message}")]
    InvalidCondition {
        /// The condition as written in the configuration
        condition: String,
        /// Detailed error message
        message: String,
    },

    /// A value that must be numeric for an aggregate could not be parsed.
    #[error("Field '{field}' value '{value}' is not a valid decimal number")]
    NumericParse {
        /// Name of the source field
        field: String,
        /// The value, after sign concatenation
        value: String,
    },

    /// Two map functions of different kinds target the same aggregate name.
    #[error("Aggregate '{name}' already holds a {existing} value, cannot apply {requested}")]
    AggregateConflict {
        name: String,
        existing: String,
        requested: String,
    },

    /// An external lookup (SQL, API, DB) could not produce a verdict.
    #[error("Lookup failed for {kind} validation: {message}")]
    LookupFailed {
        /// Validation kind of the failing rule
        kind: String,
        /// Detailed error message
        message: String,
        /// Optional underlying error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Error from serialization/deserialization operations.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic internal error for unexpected conditions.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A type alias for `Result<T, TermError>`.
///
/// # Examples
///
/// ```rust
/// use term_flatfile::error::Result;
///
/// fn stage_record() -> Result<()> {
///     Ok(())
/// }
/// # stage_record().unwrap();
/// ```
pub type Result<T> = std::result::Result<T, TermError>;

impl TermError {
    /// Creates a new configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Creates a new invalid condition error.
    pub fn invalid_condition(condition: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidCondition {
            condition: condition.into(),
            message: message.into(),
        }
    }

    /// Creates a new lookup failure without an underlying cause.
    pub fn lookup_failed(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self::LookupFailed {
            kind: kind.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new lookup failure wrapping the backend's error.
    pub fn lookup_failed_with_source(
        kind: impl Into<String>,
        message: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        Self::LookupFailed {
            kind: kind.into(),
            message: message.into(),
            source: Some(source),
        }
    }
}

/// Extension trait for adding context to errors.
pub trait ErrorContext<T> {
    /// Adds context to an error.
    fn context(self, msg: &str) -> Result<T>;

    /// Adds context with a lazy message.
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: Into<TermError>,
{
    fn context(self, msg: &str) -> Result<T> {
        self.with_context(|| msg.to_string())
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| {
            let msg = f();
            match e.into() {
                TermError::Configuration(inner) => {
                    TermError::Configuration(format!("{msg}: {inner}"))
                }
                TermError::Internal(inner) => TermError::Internal(format!("{msg}: {inner}")),
                other => TermError::Internal(format!("{msg}: {other}")),
            }
        })
    }
}
