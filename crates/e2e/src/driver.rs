//! Browser driver abstraction
//!
//! A [`PageDriver`] is one isolated browser context with one page. Elements
//! are addressed by their contract attribute value; the driver never sees
//! symbolic names. Every call is a suspension point that completes when the
//! browser reports back.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::E2eResult;

/// Something the page reported on its own while a step was running
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PageEvent {
    /// An uncaught exception in page script
    PageError { message: String },
    /// A console message at error level
    ConsoleError { text: String },
}

#[async_trait]
pub trait PageDriver: Send {
    /// Load `url` as a full navigation. Returns the main response status,
    /// or `None` when the navigation produced no response (same-document).
    async fn goto(&mut self, url: &str) -> E2eResult<Option<u16>>;

    /// Click the first element carrying `testid`. Returns `false` when no
    /// such element appeared within the driver's action timeout.
    async fn click(&mut self, testid: &str) -> E2eResult<bool>;

    /// Fill the input carrying `testid`. Returns `false` when absent.
    async fn fill(&mut self, testid: &str, value: &str) -> E2eResult<bool>;

    /// Number of elements currently carrying `testid`, without waiting
    async fn count(&mut self, testid: &str) -> E2eResult<usize>;

    /// Whether an element carrying `testid` becomes visible within `wait`
    async fn is_visible(&mut self, testid: &str, wait: Duration) -> E2eResult<bool>;

    /// Attribute `name` of the first element carrying `testid`
    async fn attribute(&mut self, testid: &str, name: &str) -> E2eResult<Option<String>>;

    async fn current_url(&mut self) -> E2eResult<String>;

    /// Wait until the current URL contains `needle`. Returns `false` on timeout.
    async fn wait_for_url(&mut self, needle: &str, wait: Duration) -> E2eResult<bool>;

    /// Rendered, visible text of the page body
    async fn visible_text(&mut self) -> E2eResult<String>;

    /// Resolved `href` of every anchor on the page, in document order
    async fn anchor_hrefs(&mut self) -> E2eResult<Vec<String>>;

    /// Lightweight GET sharing the session's cookies; returns the status
    async fn link_status(&mut self, url: &str) -> E2eResult<u16>;

    /// Events observed since the last drain
    fn drain_events(&mut self) -> Vec<PageEvent>;

    /// Release the browser context
    async fn close(&mut self) -> E2eResult<()>;
}

/// Creates fresh, isolated drivers. Shared by all worker lanes.
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn launch(&self) -> E2eResult<Box<dyn PageDriver>>;
}
