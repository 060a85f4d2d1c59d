//! A message-plus-source error for configuration and tracing setup.

use crate::SharedString;
use std::{error, fmt};

/// An error with a message and an optional underlying cause.
///
/// Displaying it renders the whole chain as `message: cause: ...` and records
/// the failure with `tracing`.
#[derive(Debug)]
pub struct Error {
    message: SharedString,
    source: Option<Box<Error>>,
}

impl Error {
    /// Creates a new instance with the message.
    #[inline]
    pub fn new(message: impl Into<SharedString>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Returns a new instance with the message, keeping `self` as the cause.
    #[inline]
    pub fn wrap(self, message: impl Into<SharedString>) -> Self {
        Self {
            message: message.into(),
            source: Some(Box::new(self)),
        }
    }

    /// Returns the message.
    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the underlying cause.
    #[inline]
    pub fn source(&self) -> Option<&Error> {
        self.source.as_deref()
    }
}

impl<E: error::Error + 'static> From<E> for Error {
    fn from(err: E) -> Self {
        let source = err.source().map(|cause| Box::new(Self::new(cause.to_string())));
        Self {
            message: err.to_string().into(),
            source,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = &self.message;
        match &self.source {
            Some(source) => {
                tracing::error!(source = %source.message, "{message}");
                write!(f, "{message}: {source}")
            }
            None => {
                tracing::error!("{message}");
                f.write_str(message)
            }
        }
    }
}
