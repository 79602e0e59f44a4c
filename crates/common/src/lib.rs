//! AI Project 101 Common Library
//!
//! The contract the course site and its verification engine agree on:
//! supported locales and roles, the `/{locale}/...` route table, and the
//! registry of addressable element identifiers.

pub mod contract;
pub mod error;
pub mod locale;
pub mod paths;

pub use contract::Tid;
pub use error::{Error, Result};
pub use locale::{Locale, Role};
pub use paths::{locale_of, resolve, ResourceKind, Route};

/// Contract version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
