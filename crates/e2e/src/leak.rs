//! Translation-leak detection on rendered text

use tracing::debug;

use crate::error::{E2eError, E2eResult};

/// Markers that only show up when localization failed
pub const DEFAULT_LEAK_TOKENS: &[&str] = &[
    "__MISSING__",
    "MISSING_TRANSLATION",
    "missing translation",
    "undefined",
    "{{",
];

/// Scans visible text for a fixed token set
#[derive(Debug, Clone)]
pub struct LeakDetector {
    tokens: Vec<String>,
}

impl LeakDetector {
    pub fn new<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tokens: tokens.into_iter().map(Into::into).filter(|t: &String| !t.is_empty()).collect(),
        }
    }

    /// First token (in configured order) found in `text`
    pub fn find<'a>(&'a self, text: &str) -> Option<&'a str> {
        self.tokens
            .iter()
            .find(|token| text.contains(token.as_str()))
            .map(String::as_str)
    }

    /// Fail with `LeakDetected` naming the offending token
    pub fn check(&self, text: &str, url: &str) -> E2eResult<()> {
        match self.find(text) {
            Some(token) => Err(E2eError::LeakDetected {
                token: token.to_string(),
                url: url.to_string(),
            }),
            None => {
                debug!("No translation leak on {}", url);
                Ok(())
            }
        }
    }
}

impl Default for LeakDetector {
    fn default() -> Self {
        Self::new(DEFAULT_LEAK_TOKENS.iter().copied())
    }
}
