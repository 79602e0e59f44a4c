//! Error types for the site contract

use thiserror::Error;

/// Result type alias using the contract Error
pub type Result<T> = std::result::Result<T, Error>;

/// Contract error types
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Unknown route '{name}': {detail}")]
    UnknownRoute { name: String, detail: String },

    #[error("Unknown element '{0}' (not in the element contract)")]
    UnknownElement(String),

    #[error("Unsupported locale: {0}")]
    UnsupportedLocale(String),

    #[error("Unknown role: {0}")]
    UnknownRole(String),
}
