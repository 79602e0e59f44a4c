//! Suite configuration
//!
//! Loaded from TOML, then overridden from the command line. Role
//! credentials never live in the file; they come from the environment.

use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use aip101_common::{Locale, Role};

use crate::error::{E2eError, E2eResult};
use crate::leak::DEFAULT_LEAK_TOKENS;
use crate::playwright::PlaywrightConfig;
use crate::server::AppServerConfig;

pub const ENV_BASE_URL: &str = "E2E_BASE_URL";
pub const ENV_PAYMENT_MODE: &str = "E2E_PAYMENT_MODE";
pub const ENV_USER_EMAIL: &str = "E2E_USER_EMAIL";
pub const ENV_USER_PASSWORD: &str = "E2E_USER_PASSWORD";
pub const ENV_ADMIN_EMAIL: &str = "E2E_ADMIN_EMAIL";
pub const ENV_ADMIN_PASSWORD: &str = "E2E_ADMIN_PASSWORD";

/// Suite configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SuiteConfig {
    /// Site root; may carry a path prefix (`https://host/AI-Project/`)
    pub base_url: String,

    /// Locales to run, in order
    pub locales: Vec<Locale>,

    /// Maximum number of combinations running at once
    pub concurrency: usize,

    /// Upper bound for any single blocking step
    pub step_timeout_ms: u64,

    /// Console error substrings that do not fail a case
    pub console_allow: Vec<String>,

    /// Tokens that indicate a translation leak
    pub leak_tokens: Vec<String>,

    /// Run payment cases against the mocked provider
    pub payment_mock: bool,

    /// Extra YAML case descriptors
    pub cases_dir: Option<PathBuf>,

    /// Output directory for results
    pub output_dir: PathBuf,

    pub filter: CaseFilter,

    pub browser: PlaywrightConfig,

    /// Application server to spawn before the suite, if any
    pub server: Option<AppServerConfig>,

    #[serde(skip)]
    pub credentials: Credentials,
}

impl Default for SuiteConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:3000".to_string(),
            locales: Locale::ALL.to_vec(),
            concurrency: 4,
            step_timeout_ms: 15_000,
            console_allow: Vec::new(),
            leak_tokens: DEFAULT_LEAK_TOKENS.iter().map(|t| t.to_string()).collect(),
            payment_mock: false,
            cases_dir: None,
            output_dir: PathBuf::from("test-results"),
            filter: CaseFilter::default(),
            browser: PlaywrightConfig::default(),
            server: None,
            credentials: Credentials::default(),
        }
    }
}

impl SuiteConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> E2eResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: SuiteConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> E2eResult<()> {
        if self.locales.is_empty() {
            return Err(E2eError::Config("at least one locale is required".into()));
        }
        if self.concurrency == 0 {
            return Err(E2eError::Config("concurrency must be at least 1".into()));
        }
        let base = parse_base(&self.base_url)?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(E2eError::Config(format!(
                "base_url must be an http(s) URL, got '{}'",
                self.base_url
            )));
        }
        Ok(())
    }

    pub fn step_timeout(&self) -> Duration {
        Duration::from_millis(self.step_timeout_ms)
    }

    /// Absolute URL of a site path
    pub fn url_for(&self, path: &str) -> E2eResult<String> {
        join_url(&self.base_url, path)
    }

    /// Path prefix the site is mounted under (empty at the root)
    pub fn base_path(&self) -> String {
        base_path_of(&self.base_url)
    }
}

fn parse_base(base_url: &str) -> E2eResult<Url> {
    Url::parse(base_url).map_err(|e| E2eError::Config(format!("invalid base_url '{}': {}", base_url, e)))
}

/// Path component of a base URL without its trailing slash
pub fn base_path_of(base_url: &str) -> String {
    match Url::parse(base_url) {
        Ok(url) => url.path().trim_end_matches('/').to_string(),
        Err(_) => String::new(),
    }
}

/// Resolve a site path against a base URL, keeping the base's path prefix
pub fn join_url(base: &str, path: &str) -> E2eResult<String> {
    let mut base_url = parse_base(base)?;
    if !base_url.path().ends_with('/') {
        let prefixed = format!("{}/", base_url.path());
        base_url.set_path(&prefixed);
    }
    let joined = base_url
        .join(path.trim_start_matches('/'))
        .map_err(|e| E2eError::Config(format!("cannot join '{}' onto '{}': {}", path, base, e)))?;
    Ok(joined.to_string())
}

/// Whether the payment provider is mocked, from `E2E_PAYMENT_MODE`
pub fn payment_mock_from_env() -> bool {
    std::env::var(ENV_PAYMENT_MODE)
        .map(|v| v.trim().eq_ignore_ascii_case("mock"))
        .unwrap_or(false)
}

/// Which cases to run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CaseFilter {
    pub tag: Option<String>,
    pub id_prefix: Option<String>,
    pub quality_only: bool,
}

/// Sign-in identity for a role
#[derive(Clone, PartialEq, Eq)]
pub struct Identity {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Identity")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Role credentials, supplied out of band
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub student: Option<Identity>,
    pub admin: Option<Identity>,
}

impl Credentials {
    /// Read `E2E_USER_*` and `E2E_ADMIN_*` from the environment
    pub fn from_env() -> Self {
        let pair = |email: &str, password: &str| {
            match (std::env::var(email), std::env::var(password)) {
                (Ok(email), Ok(password)) if !email.is_empty() && !password.is_empty() => {
                    Some(Identity { email, password })
                }
                _ => None,
            }
        };
        Self {
            student: pair(ENV_USER_EMAIL, ENV_USER_PASSWORD),
            admin: pair(ENV_ADMIN_EMAIL, ENV_ADMIN_PASSWORD),
        }
    }

    pub fn for_role(&self, role: Role) -> Option<&Identity> {
        match role {
            Role::Guest => None,
            Role::Student => self.student.as_ref(),
            Role::Admin => self.admin.as_ref(),
        }
    }

    /// Environment variables that configure a role, for error messages
    pub fn env_names(role: Role) -> &'static str {
        match role {
            Role::Guest => "",
            Role::Student => "E2E_USER_EMAIL / E2E_USER_PASSWORD",
            Role::Admin => "E2E_ADMIN_EMAIL / E2E_ADMIN_PASSWORD",
        }
    }
}
