#![doc = include_str!("../README.md")]
#![forbid(unsafe_code)]

pub mod error;
pub mod extension;
pub mod state;
pub mod trace;

#[doc(no_inline)]
pub use serde_json::json;

/// A JSON value.
pub type JsonValue = serde_json::Value;

/// An allocation-optimized string.
pub type SharedString = std::borrow::Cow<'static, str>;

/// An owned dynamically typed error.
pub type BoxError = Box<dyn std::error::Error + Sync + Send + 'static>;
