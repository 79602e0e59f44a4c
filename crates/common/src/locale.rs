//! Supported locales and user roles

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::Error;

/// A locale the site is published in.
///
/// Every locale is also the first path segment of every route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    Th,
    En,
}

impl Locale {
    /// All supported locales, in suite order
    pub const ALL: [Locale; 2] = [Locale::Th, Locale::En];

    pub fn as_str(&self) -> &'static str {
        match self {
            Locale::Th => "th",
            Locale::En => "en",
        }
    }

    /// The locale the language switcher leads to
    pub fn other(&self) -> Locale {
        match self {
            Locale::Th => Locale::En,
            Locale::En => Locale::Th,
        }
    }
}

impl std::fmt::Display for Locale {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Locale {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "th" => Ok(Locale::Th),
            "en" => Ok(Locale::En),
            other => Err(Error::UnsupportedLocale(other.to_string())),
        }
    }
}

/// Who is using the site during a case
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Guest,
    Student,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Guest => "guest",
            Role::Student => "student",
            Role::Admin => "admin",
        }
    }

    /// Whether a session for this role has to sign in
    pub fn requires_login(&self) -> bool {
        !matches!(self, Role::Guest)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "guest" => Ok(Role::Guest),
            "student" => Ok(Role::Student),
            "admin" => Ok(Role::Admin),
            other => Err(Error::UnknownRole(other.to_string())),
        }
    }
}
