//! Error types for E2E verification

use thiserror::Error;

/// A link the crawler could not confirm as healthy
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct BrokenLink {
    pub url: String,
    /// HTTP status, if a response came back at all
    pub status: Option<u16>,
    pub reason: String,
}

impl std::fmt::Display for BrokenLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.status {
            Some(status) => write!(f, "{} ({})", self.url, status),
            None => write!(f, "{} ({})", self.url, self.reason),
        }
    }
}

#[derive(Error, Debug)]
pub enum E2eError {
    #[error("Navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("Element '{element}' not found on {url}")]
    MissingElement { element: String, url: String },

    #[error("Assertion failed: {condition}")]
    AssertionFailed { condition: String },

    #[error("Cannot discover {kind} URL (tried: {}). Add data-testid {hint}.", .attempted.join(", "))]
    DiscoveryExhausted {
        kind: String,
        attempted: Vec<String>,
        hint: String,
    },

    #[error("Login failed: {0}")]
    Login(String),

    #[error("Post-login check failed for {role}: expected {expected}, got {actual}")]
    LoginAssertion {
        role: String,
        expected: String,
        actual: String,
    },

    #[error("Possible missing i18n key found in body: \"{token}\" on {url}")]
    LeakDetected { token: String, url: String },

    #[error("{} broken link(s): {}", .links.len(), .links.iter().map(|l| l.to_string()).collect::<Vec<_>>().join(", "))]
    BrokenLinks { links: Vec<BrokenLink> },

    #[error("Page error: {0}")]
    UncaughtPageError(String),

    #[error("Console error: {0}")]
    ConsoleError(String),

    #[error("Invalid case {id}: {reason}")]
    InvalidCase { id: String, reason: String },

    #[error("Timeout waiting for: {0}")]
    Timeout(String),

    #[error("Cancelled")]
    Cancelled,

    #[error("Playwright not found. Install with: npm i -D playwright && npx playwright install")]
    PlaywrightNotFound,

    #[error("Browser bridge error: {0}")]
    Bridge(String),

    #[error("Server failed to start: {0}")]
    ServerStartup(String),

    #[error("Server health check failed after {0} attempts")]
    ServerHealthCheck(usize),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Contract(#[from] aip101_common::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl E2eError {
    /// Stable taxonomy label used in reports
    pub fn kind(&self) -> &'static str {
        match self {
            E2eError::Navigation { .. } => "NavigationError",
            E2eError::MissingElement { .. } => "MissingElementError",
            E2eError::AssertionFailed { .. } => "AssertionFailure",
            E2eError::DiscoveryExhausted { .. } => "DiscoveryExhaustedError",
            E2eError::Login(_) => "LoginError",
            E2eError::LoginAssertion { .. } => "LoginAssertionError",
            E2eError::LeakDetected { .. } => "LeakDetected",
            E2eError::BrokenLinks { .. } => "BrokenLinkError",
            E2eError::UncaughtPageError(_) => "UncaughtPageError",
            E2eError::ConsoleError(_) => "ConsoleError",
            E2eError::InvalidCase { .. } => "InvalidCaseError",
            E2eError::Timeout(_) => "TimeoutError",
            E2eError::Cancelled => "Cancelled",
            E2eError::PlaywrightNotFound | E2eError::Bridge(_) => "BrowserError",
            E2eError::ServerStartup(_) | E2eError::ServerHealthCheck(_) => "ServerError",
            E2eError::Config(_) => "ConfigError",
            E2eError::Contract(aip101_common::Error::UnknownRoute { .. }) => "UnknownRouteError",
            E2eError::Contract(_) => "ContractError",
            E2eError::Io(_) => "IoError",
            E2eError::Json(_) | E2eError::Yaml(_) | E2eError::Toml(_) => "ParseError",
            E2eError::Http(_) => "HttpError",
        }
    }
}

pub type E2eResult<T> = Result<T, E2eError>;
