//! Error types.
//!
//! Validation failures are not errors: they end up as reasons on a control.
//! The types here describe markup authoring bugs ([`ConfigError`]) and
//! misuse of the programmatic API ([`Error`]).

use formdom::{DomError, NodeId};
use thiserror::Error;

/// A trigger attribute holds a value its validator cannot use.
///
/// Returned from `Control::check()` / `Form::check()` instead of a validity,
/// because the markup is broken rather than the user's input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The attribute value could not be parsed.
    #[error("{label} has an invalid {what}: `{attribute}=\"{value}\"`")]
    InvalidValue {
        /// Display name of the control.
        label: String,
        /// What the value was supposed to be (e.g. "maximum length").
        what: &'static str,
        /// Attribute that carried the value.
        attribute: String,
        /// The offending value.
        value: String,
    },

    /// The attribute named a preset that is not registered.
    #[error("unknown preset `{0}`")]
    UnknownPreset(String),

    /// The attribute holds a regular expression that does not compile.
    #[error("{label} has an invalid pattern `{pattern}`: {message}")]
    InvalidPattern {
        /// Display name of the control.
        label: String,
        /// The pattern source.
        pattern: String,
        /// Compiler message.
        message: String,
    },

    /// Raised by a custom validator.
    #[error("{0}")]
    Custom(String),
}

impl ConfigError {
    /// Creates a custom configuration error.
    pub fn custom(message: impl Into<String>) -> Self {
        Self::Custom(message.into())
    }
}

/// Errors from constructing or wiring controls and forms.
#[derive(Debug, Error)]
pub enum Error {
    /// The node is not an input, textarea or select.
    #[error("node {0} is not a form control")]
    NotAControl(NodeId),

    /// The node is not a form element.
    #[error("node {0} is not a form")]
    NotAForm(NodeId),

    /// Controls and forms spawn their event drivers on the current Tokio runtime.
    #[error("no Tokio runtime is running")]
    NoRuntime,

    /// A document operation failed.
    #[error(transparent)]
    Dom(#[from] DomError),

    /// A markup configuration error.
    #[error(transparent)]
    Config(#[from] ConfigError),
}
