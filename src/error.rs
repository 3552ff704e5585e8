//! Error types for decoration wiring.
//!
//! These errors only surface while a class is being registered, while a method
//! is looked up by name, or while configuration is loaded. Errors raised inside a
//! decorated call are the method's own `Signature::Error` and never pass through
//! this type.

use thiserror::Error;

/// Decoration wiring errors.
///
/// # Examples
///
/// ```rust
/// use decorations::DecorationError;
///
/// let missing = DecorationError::NotFound { class: "app::Greeter", method: "greet" };
/// assert_eq!(missing.to_string(), "Method not found: app::Greeter::greet");
///
/// let retry = DecorationError::InvalidRetry("tries must be greater than zero");
/// println!("Error: {}", retry);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecorationError {
    /// No method with this name was defined on the class
    #[error("Method not found: {class}::{method}")]
    NotFound {
        class: &'static str,
        method: &'static str,
    },
    /// The method exists but was defined with another signature
    #[error("Signature mismatch for {class}::{method}: requested {expected}")]
    SignatureMismatch {
        class: &'static str,
        method: &'static str,
        expected: &'static str,
    },
    /// A method name can only be defined once per class
    #[error("Method already defined: {class}::{method}")]
    AlreadyDefined {
        class: &'static str,
        method: &'static str,
    },
    /// Strict mode rejects hook-style decorators that register no hooks
    #[error("Decorator {decorator} on {class}::{method} registers no hooks")]
    EmptyDecorator {
        class: &'static str,
        method: &'static str,
        decorator: &'static str,
    },
    /// Retry options out of range
    #[error("Invalid retry options: {0}")]
    InvalidRetry(&'static str),
    /// A configuration value could not be parsed
    #[error("Invalid configuration value for {key}: {value:?}")]
    Config { key: String, value: String },
    /// Table export failed
    #[error("Export failed: {0}")]
    Export(String),
}

/// Result type for decoration wiring.
///
/// ```rust
/// use decorations::{DecorationError, DecorationResult};
///
/// fn lookup(found: bool) -> DecorationResult<&'static str> {
///     if found {
///         Ok("greet")
///     } else {
///         Err(DecorationError::NotFound { class: "Greeter", method: "greet" })
///     }
/// }
///
/// assert!(lookup(true).is_ok());
/// assert!(lookup(false).is_err());
/// ```
pub type DecorationResult<T> = Result<T, DecorationError>;
