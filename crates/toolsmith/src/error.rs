//! Error types for compiling, invoking and storing function modules.

use toolsmith_core::BoxError;

/// Source text could not be loaded as a module or failed export validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unable to parse module: {reason}")]
pub struct CompileError {
    /// Underlying cause.
    reason: String,
}

impl CompileError {
    /// Creates a new instance with the underlying cause.
    #[inline]
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    /// Returns the underlying cause without the common prefix.
    #[inline]
    pub fn reason(&self) -> &str {
        &self.reason
    }
}

/// Failure while calling the default export of a compiled module.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvokeError {
    /// The arguments could not be converted to a script value.
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),
    /// The function threw or its promise was rejected.
    #[error("Function execution failed: {0}")]
    ExecutionFailed(String),
    /// The returned promise never settled.
    #[error("Function did not settle")]
    Unsettled,
    /// The result could not be converted to JSON.
    #[error("Invalid result: {0}")]
    InvalidResult(String),
}

/// Errors raised by a record store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// I/O failure in the underlying storage.
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A stored record could not be serialized or deserialized.
    #[error("Json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The id can not be used as a storage key.
    #[error("Invalid record id: `{0}`")]
    InvalidId(String),

    /// Any other datastore failure.
    #[error("Datastore error: {0}")]
    Datastore(#[from] BoxError),
}

/// Umbrella error of the crate.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// See [`CompileError`].
    #[error(transparent)]
    Compile(#[from] CompileError),

    /// See [`InvokeError`].
    #[error(transparent)]
    Invoke(#[from] InvokeError),

    /// See [`StoreError`].
    #[error(transparent)]
    Store(#[from] StoreError),

    /// No function is stored under the id.
    #[error("Function `{0}` not found")]
    NotFound(String),

    /// A transfer document carries a malformed date.
    #[error("Invalid date `{date}`: {source}")]
    InvalidDate {
        /// The rejected date text.
        date: String,
        /// Parse failure.
        source: chrono::ParseError,
    },

    /// A transfer document is not valid JSON.
    #[error("Json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type of the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::{CompileError, Error, StoreError};

    #[test]
    fn it_prefixes_compile_errors() {
        let err = CompileError::new("missing `name` export");
        assert_eq!(err.reason(), "missing `name` export");
        assert_eq!(
            err.to_string(),
            "Unable to parse module: missing `name` export"
        );

        let message = err.to_string();
        assert_eq!(Error::from(err).to_string(), message);
    }

    #[test]
    fn it_keeps_store_errors_visible() {
        let err = Error::from(StoreError::InvalidId("../etc".to_owned()));
        assert_eq!(err.to_string(), "Invalid record id: `../etc`");
    }
}
