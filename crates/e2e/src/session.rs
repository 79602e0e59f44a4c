//! Session fixture: isolated browser sessions for a (role, locale) pair
//!
//! Every session carries two standing guards for its whole lifetime: an
//! uncaught page error fails the owning case, and so does any console error
//! that is not allow-listed. Guards are evaluated after every driver call,
//! whatever step is running.

use futures::future::BoxFuture;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use aip101_common::{Locale, Role, Route, Tid};

use crate::config::{base_path_of, join_url, Credentials, SuiteConfig};
use crate::driver::{BrowserLauncher, PageDriver, PageEvent};
use crate::error::{E2eError, E2eResult};
use crate::leak::LeakDetector;

/// What every session of a suite needs to know
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub base_url: String,
    pub step_timeout: Duration,
    pub console_allow: Vec<String>,
    pub credentials: Credentials,
    pub leak: LeakDetector,
}

impl SessionSettings {
    pub fn from_config(config: &SuiteConfig) -> Self {
        Self {
            base_url: config.base_url.clone(),
            step_timeout: config.step_timeout(),
            console_allow: config.console_allow.clone(),
            credentials: config.credentials.clone(),
            leak: LeakDetector::new(config.leak_tokens.iter().cloned()),
        }
    }
}

/// One browser context bound to a (role, locale) pair
pub struct Session {
    driver: Box<dyn PageDriver>,
    settings: Arc<SessionSettings>,
    locale: Locale,
    signed_in_as: Option<Role>,
    last_url: String,
    closed: bool,
}

impl Session {
    fn new(driver: Box<dyn PageDriver>, settings: Arc<SessionSettings>, locale: Locale) -> Self {
        Self {
            driver,
            settings,
            locale,
            signed_in_as: None,
            last_url: String::from("about:blank"),
            closed: false,
        }
    }

    pub fn locale(&self) -> Locale {
        self.locale
    }

    /// Role this session signed in as, `None` for anonymous sessions
    pub fn signed_in_as(&self) -> Option<Role> {
        self.signed_in_as
    }

    /// Last URL the session observed
    pub fn last_url(&self) -> &str {
        &self.last_url
    }

    pub fn step_timeout(&self) -> Duration {
        self.settings.step_timeout
    }

    /// Path prefix the site is mounted under
    pub fn base_path(&self) -> String {
        base_path_of(&self.settings.base_url)
    }

    /// Absolute URL for a site path; absolute URLs pass through
    pub fn url_for(&self, path_or_url: &str) -> E2eResult<String> {
        if path_or_url.starts_with("http://") || path_or_url.starts_with("https://") {
            Ok(path_or_url.to_string())
        } else {
            join_url(&self.settings.base_url, path_or_url)
        }
    }

    /// Promote page errors and disallowed console errors to failures
    pub fn check_guards(&mut self) -> E2eResult<()> {
        for event in self.driver.drain_events() {
            match event {
                PageEvent::PageError { message } => {
                    return Err(E2eError::UncaughtPageError(message));
                }
                PageEvent::ConsoleError { text } => {
                    if self.settings.console_allow.iter().any(|allow| text.contains(allow.as_str())) {
                        debug!("Allow-listed console error: {}", text);
                        continue;
                    }
                    return Err(E2eError::ConsoleError(text));
                }
            }
        }
        Ok(())
    }

    /// Navigate and require a non-error response
    pub async fn goto_ok(&mut self, path_or_url: &str) -> E2eResult<()> {
        let url = self.url_for(path_or_url)?;
        let limit = self.settings.step_timeout;
        debug!("goto {}", url);

        let status = match timeout(limit, self.driver.goto(&url)).await {
            Ok(result) => result.map_err(|e| E2eError::Navigation {
                url: url.clone(),
                reason: e.to_string(),
            })?,
            Err(_) => {
                return Err(E2eError::Navigation {
                    url,
                    reason: format!("timed out after {} ms", limit.as_millis()),
                })
            }
        };
        self.last_url = url.clone();
        self.check_guards()?;

        if let Some(status) = status {
            if status >= 400 {
                return Err(E2eError::Navigation {
                    url,
                    reason: format!("HTTP not OK: {}", status),
                });
            }
        }
        Ok(())
    }

    pub async fn click(&mut self, tid: Tid) -> E2eResult<()> {
        let limit = self.settings.step_timeout;
        let found = match timeout(limit, self.driver.click(tid.attr())).await {
            Ok(found) => found?,
            Err(_) => false,
        };
        self.check_guards()?;
        if !found {
            return Err(self.missing(tid));
        }
        Ok(())
    }

    pub async fn fill(&mut self, tid: Tid, value: &str) -> E2eResult<()> {
        let limit = self.settings.step_timeout;
        let found = match timeout(limit, self.driver.fill(tid.attr(), value)).await {
            Ok(found) => found?,
            Err(_) => false,
        };
        self.check_guards()?;
        if !found {
            return Err(self.missing(tid));
        }
        Ok(())
    }

    /// Number of elements carrying `tid` right now
    pub async fn count(&mut self, tid: Tid) -> E2eResult<usize> {
        let limit = self.settings.step_timeout;
        let n = match timeout(limit, self.driver.count(tid.attr())).await {
            Ok(n) => n?,
            Err(_) => return Err(E2eError::Timeout(format!("count {}", tid))),
        };
        self.check_guards()?;
        Ok(n)
    }

    pub async fn is_visible(&mut self, tid: Tid) -> E2eResult<bool> {
        let wait = self.settings.step_timeout;
        let limit = wait + Duration::from_millis(500);
        let visible = match timeout(limit, self.driver.is_visible(tid.attr(), wait)).await {
            Ok(visible) => visible?,
            Err(_) => false,
        };
        self.check_guards()?;
        Ok(visible)
    }

    pub async fn attribute(&mut self, tid: Tid, name: &str) -> E2eResult<Option<String>> {
        let limit = self.settings.step_timeout;
        let value = match timeout(limit, self.driver.attribute(tid.attr(), name)).await {
            Ok(value) => value?,
            Err(_) => return Err(E2eError::Timeout(format!("attribute {} of {}", name, tid))),
        };
        self.check_guards()?;
        Ok(value)
    }

    pub async fn current_url(&mut self) -> E2eResult<String> {
        let limit = self.settings.step_timeout;
        let url = match timeout(limit, self.driver.current_url()).await {
            Ok(url) => url?,
            Err(_) => return Err(E2eError::Timeout("current url".to_string())),
        };
        self.last_url = url.clone();
        self.check_guards()?;
        Ok(url)
    }

    /// Wait until the URL contains `needle`
    pub async fn wait_for_url(&mut self, needle: &str) -> E2eResult<bool> {
        let wait = self.settings.step_timeout;
        let limit = wait + Duration::from_millis(500);
        let matched = match timeout(limit, self.driver.wait_for_url(needle, wait)).await {
            Ok(matched) => matched?,
            Err(_) => false,
        };
        self.check_guards()?;
        self.current_url().await?;
        Ok(matched)
    }

    pub async fn visible_text(&mut self) -> E2eResult<String> {
        let limit = self.settings.step_timeout;
        let text = match timeout(limit, self.driver.visible_text()).await {
            Ok(text) => text?,
            Err(_) => return Err(E2eError::Timeout("page text".to_string())),
        };
        self.check_guards()?;
        Ok(text)
    }

    pub async fn anchor_hrefs(&mut self) -> E2eResult<Vec<String>> {
        let limit = self.settings.step_timeout;
        let hrefs = match timeout(limit, self.driver.anchor_hrefs()).await {
            Ok(hrefs) => hrefs?,
            Err(_) => return Err(E2eError::Timeout("anchor list".to_string())),
        };
        self.check_guards()?;
        Ok(hrefs)
    }

    pub async fn link_status(&mut self, url: &str) -> E2eResult<u16> {
        let limit = self.settings.step_timeout;
        let status = match timeout(limit, self.driver.link_status(url)).await {
            Ok(status) => status?,
            Err(_) => return Err(E2eError::Timeout(format!("request {}", url))),
        };
        self.check_guards()?;
        Ok(status)
    }

    /// Scan the rendered text for translation leaks
    pub async fn scan_for_leaks(&mut self) -> E2eResult<()> {
        let text = self.visible_text().await?;
        let url = self.current_url().await?;
        self.settings.leak.check(&text, &url)
    }

    /// Navigate, require a non-error response, then scan for leaks
    pub async fn goto_checked(&mut self, path_or_url: &str) -> E2eResult<()> {
        self.goto_ok(path_or_url).await?;
        self.scan_for_leaks().await
    }

    /// Release the browser context. Safe to call more than once.
    pub async fn close(&mut self) -> E2eResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.driver.close().await
    }

    fn missing(&self, tid: Tid) -> E2eError {
        E2eError::MissingElement {
            element: tid.name().to_string(),
            url: self.last_url.clone(),
        }
    }

    /// Sign in through the sign-in form and verify where it lands
    async fn login(&mut self, role: Role, credentials: &Credentials) -> E2eResult<()> {
        let identity = credentials.for_role(role).cloned().ok_or_else(|| {
            E2eError::Login(format!(
                "Missing {} for role {}",
                Credentials::env_names(role),
                role
            ))
        })?;
        let locale = self.locale;

        self.goto_checked(&Route::SignIn.path(locale)).await?;
        if role == Role::Student && !self.is_visible(Tid::AuthRoot).await? {
            return Err(E2eError::LoginAssertion {
                role: role.to_string(),
                expected: format!("{} visible", Tid::AuthRoot),
                actual: format!("not visible on {}", self.last_url),
            });
        }

        self.fill(Tid::AuthEmail, &identity.email).await?;
        self.fill(Tid::AuthPassword, &identity.password).await?;
        self.click(Tid::AuthSubmit).await?;

        let landing = Route::Dashboard.path(locale);
        if !self.wait_for_url(&landing).await? {
            return Err(E2eError::LoginAssertion {
                role: role.to_string(),
                expected: format!("URL containing {}", landing),
                actual: self.last_url.clone(),
            });
        }
        if role == Role::Student && !self.is_visible(Tid::DashboardRoot).await? {
            return Err(E2eError::LoginAssertion {
                role: role.to_string(),
                expected: format!("{} visible", Tid::DashboardRoot),
                actual: format!("not visible on {}", self.last_url),
            });
        }
        self.scan_for_leaks().await?;

        self.signed_in_as = Some(role);
        info!("Signed in as {} ({})", role, locale);
        Ok(())
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if !self.closed {
            // the driver releases its browser context when dropped
            warn!("Session for {} dropped without close; releasing browser context", self.locale);
        }
    }
}

/// Produces ready-to-use sessions
#[derive(Clone)]
pub struct SessionFixture {
    launcher: Arc<dyn BrowserLauncher>,
    settings: Arc<SessionSettings>,
}

impl SessionFixture {
    pub fn new(launcher: Arc<dyn BrowserLauncher>, settings: SessionSettings) -> Self {
        Self {
            launcher,
            settings: Arc::new(settings),
        }
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    /// Open a session with no identity, parked on the locale home page
    pub async fn open_anonymous(&self, locale: Locale) -> E2eResult<Session> {
        let driver = self.launcher.launch().await?;
        let mut session = Session::new(driver, self.settings.clone(), locale);
        if let Err(e) = session.goto_checked(&Route::Home.path(locale)).await {
            let _ = session.close().await;
            return Err(e);
        }
        Ok(session)
    }

    /// Open a session for `role`; guests are anonymous, everyone else signs in
    pub async fn open_as_role(&self, role: Role, locale: Locale) -> E2eResult<Session> {
        if !role.requires_login() {
            return self.open_anonymous(locale).await;
        }
        let driver = self.launcher.launch().await?;
        let mut session = Session::new(driver, self.settings.clone(), locale);
        match session.login(role, &self.settings.credentials).await {
            Ok(()) => Ok(session),
            Err(e) => {
                let _ = session.close().await;
                Err(e)
            }
        }
    }

    /// Scoped acquisition: open a session, run `body`, and close the
    /// session on every exit path. Dropping the returned future mid-flight
    /// drops the session, which releases its browser context.
    pub async fn with_session<T, F>(&self, role: Role, locale: Locale, sign_in: bool, body: F) -> E2eResult<T>
    where
        F: for<'s> FnOnce(&'s mut Session) -> BoxFuture<'s, E2eResult<T>>,
    {
        let mut session = if sign_in {
            self.open_as_role(role, locale).await?
        } else {
            self.open_anonymous(locale).await?
        };
        let result = body(&mut session).await;
        if let Err(e) = session.close().await {
            warn!("Failed to close session: {}", e);
        }
        result
    }
}
