//! In-memory simulated site
//!
//! Implements the browser driver contract over a table of pages so the
//! engine can be exercised without a browser or a running application.
//! Every navigation and link request is recorded in a shared traffic log,
//! and the site counts open browser contexts so teardown can be verified.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use aip101_common::{locale_of, Locale, Role, Route, Tid};

use crate::driver::{BrowserLauncher, PageDriver, PageEvent};
use crate::error::{E2eError, E2eResult};

/// What clicking an element does
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickEffect {
    /// Follow a site path
    Navigate(String),
    /// Attach a deferred element to the current page
    Reveal(String),
    /// Check the filled email/password against the site accounts
    SubmitLogin,
    /// Forget the identity and go to the locale home
    Logout,
    /// Throw from page script
    PageError(String),
}

/// An element carrying a test id
#[derive(Debug, Clone)]
pub struct SimElement {
    pub testid: String,
    pub visible: bool,
    /// Not in the DOM until some click reveals it
    pub deferred: bool,
    pub attrs: HashMap<String, String>,
    pub on_click: Option<ClickEffect>,
}

impl SimElement {
    fn new(testid: &str) -> Self {
        Self {
            testid: testid.to_string(),
            visible: true,
            deferred: false,
            attrs: HashMap::new(),
            on_click: None,
        }
    }
}

/// One page of the simulated site
#[derive(Debug, Clone)]
pub struct SimPage {
    pub status: u16,
    pub text: String,
    pub elements: Vec<SimElement>,
    /// Raw `href` values of plain anchors, in document order
    pub anchors: Vec<String>,
    /// Anonymous visitors are sent to the locale's sign-in page
    pub requires_login: bool,
    pub page_errors: Vec<String>,
    pub console_errors: Vec<String>,
    /// Raised after the page settles; observed on the next text or link read
    pub late_events: Vec<PageEvent>,
}

impl Default for SimPage {
    fn default() -> Self {
        Self {
            status: 200,
            text: String::new(),
            elements: Vec::new(),
            anchors: Vec::new(),
            requires_login: false,
            page_errors: Vec::new(),
            console_errors: Vec::new(),
            late_events: Vec::new(),
        }
    }
}

impl SimPage {
    pub fn new() -> Self {
        Self::default()
    }

    /// A page whose landmark is `root`
    pub fn rooted(root: Tid) -> Self {
        Self::new().element(root)
    }

    /// The sign-in form
    pub fn sign_in() -> Self {
        Self::rooted(Tid::AuthRoot)
            .element(Tid::AuthEmail)
            .element(Tid::AuthPassword)
            .clicks(Tid::AuthSubmit, ClickEffect::SubmitLogin)
    }

    pub fn status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    pub fn text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }

    pub fn element(mut self, tid: Tid) -> Self {
        self.elements.push(SimElement::new(tid.attr()));
        self
    }

    /// Present in the DOM but not visible
    pub fn hidden(mut self, tid: Tid) -> Self {
        let mut element = SimElement::new(tid.attr());
        element.visible = false;
        self.elements.push(element);
        self
    }

    /// Attached once another element reveals it
    pub fn deferred(mut self, tid: Tid) -> Self {
        let mut element = SimElement::new(tid.attr());
        element.deferred = true;
        self.elements.push(element);
        self
    }

    pub fn clicks(mut self, tid: Tid, effect: ClickEffect) -> Self {
        let mut element = SimElement::new(tid.attr());
        element.on_click = Some(effect);
        self.elements.push(element);
        self
    }

    /// An element that is also an anchor to `href`
    pub fn link(mut self, tid: Tid, href: &str) -> Self {
        let mut element = SimElement::new(tid.attr());
        element.attrs.insert("href".into(), href.to_string());
        element.on_click = Some(ClickEffect::Navigate(href.to_string()));
        self.elements.push(element);
        self.anchors.push(href.to_string());
        self
    }

    /// Clicking `trigger` reveals `target`
    pub fn reveals(self, trigger: Tid, target: Tid) -> Self {
        self.clicks(trigger, ClickEffect::Reveal(target.attr().to_string()))
            .deferred(target)
    }

    pub fn attr(mut self, tid: Tid, name: &str, value: &str) -> Self {
        match self.elements.iter_mut().find(|e| e.testid == tid.attr()) {
            Some(element) => {
                element.attrs.insert(name.to_string(), value.to_string());
            }
            None => {
                let mut element = SimElement::new(tid.attr());
                element.attrs.insert(name.to_string(), value.to_string());
                self.elements.push(element);
            }
        }
        self
    }

    pub fn anchor(mut self, href: &str) -> Self {
        self.anchors.push(href.to_string());
        self
    }

    pub fn requires_login(mut self) -> Self {
        self.requires_login = true;
        self
    }

    pub fn page_error(mut self, message: &str) -> Self {
        self.page_errors.push(message.to_string());
        self
    }

    pub fn console_error(mut self, text: &str) -> Self {
        self.console_errors.push(text.to_string());
        self
    }

    /// A script error thrown from a timer after load
    pub fn late_page_error(mut self, message: &str) -> Self {
        self.late_events.push(PageEvent::PageError { message: message.to_string() });
        self
    }

    pub fn late_console_error(mut self, text: &str) -> Self {
        self.late_events.push(PageEvent::ConsoleError { text: text.to_string() });
        self
    }
}

/// Kind of recorded request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hit {
    Navigation,
    LinkCheck,
}

/// One recorded request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrafficEntry {
    pub session: usize,
    pub hit: Hit,
    /// Path without query
    pub path: String,
}

struct SiteState {
    origin: String,
    pages: HashMap<String, SimPage>,
    accounts: Vec<(String, String, Role)>,
    latency: Duration,
    traffic: Mutex<Vec<TrafficEntry>>,
    launched: AtomicUsize,
    open: AtomicUsize,
}

/// Builder for a [`SimSite`]
pub struct SimSiteBuilder {
    origin: String,
    pages: HashMap<String, SimPage>,
    accounts: Vec<(String, String, Role)>,
    latency: Duration,
}

impl SimSiteBuilder {
    pub fn page(mut self, path: &str, page: SimPage) -> Self {
        self.pages.insert(path.to_string(), page);
        self
    }

    /// Same page under both locale prefixes
    pub fn page_in_all_locales(mut self, route: Route, page: SimPage) -> Self {
        for locale in Locale::ALL {
            self.pages.insert(route.path(locale), page.clone());
        }
        self
    }

    pub fn account(mut self, email: &str, password: &str, role: Role) -> Self {
        self.accounts.push((email.to_string(), password.to_string(), role));
        self
    }

    /// Delay applied to every navigation
    pub fn latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn build(self) -> SimSite {
        SimSite {
            state: Arc::new(SiteState {
                origin: self.origin.trim_end_matches('/').to_string(),
                pages: self.pages,
                accounts: self.accounts,
                latency: self.latency,
                traffic: Mutex::new(Vec::new()),
                launched: AtomicUsize::new(0),
                open: AtomicUsize::new(0),
            }),
        }
    }
}

/// Shared handle to the simulated site; also the launcher for its sessions
#[derive(Clone)]
pub struct SimSite {
    state: Arc<SiteState>,
}

impl SimSite {
    pub fn builder(origin: &str) -> SimSiteBuilder {
        SimSiteBuilder {
            origin: origin.to_string(),
            pages: HashMap::new(),
            accounts: Vec::new(),
            latency: Duration::ZERO,
        }
    }

    pub fn origin(&self) -> &str {
        &self.state.origin
    }

    pub fn traffic(&self) -> Vec<TrafficEntry> {
        self.state.traffic.lock().clone()
    }

    /// Number of requests of `hit` kind that reached `path`
    pub fn hits(&self, hit: Hit, path: &str) -> usize {
        self.state
            .traffic
            .lock()
            .iter()
            .filter(|t| t.hit == hit && t.path == path)
            .count()
    }

    pub fn clear_traffic(&self) {
        self.state.traffic.lock().clear();
    }

    /// Browser contexts launched so far
    pub fn launched(&self) -> usize {
        self.state.launched.load(Ordering::SeqCst)
    }

    /// Browser contexts not yet released
    pub fn open_sessions(&self) -> usize {
        self.state.open.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BrowserLauncher for SimSite {
    async fn launch(&self) -> E2eResult<Box<dyn PageDriver>> {
        let id = self.state.launched.fetch_add(1, Ordering::SeqCst);
        self.state.open.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(SimDriver {
            site: self.state.clone(),
            id,
            path: String::new(),
            query: None,
            identity: None,
            fields: HashMap::new(),
            revealed: HashSet::new(),
            events: Vec::new(),
            pending: Vec::new(),
            released: false,
        }))
    }
}

/// One simulated browser context
pub struct SimDriver {
    site: Arc<SiteState>,
    id: usize,
    path: String,
    query: Option<String>,
    identity: Option<Role>,
    fields: HashMap<String, String>,
    revealed: HashSet<String>,
    events: Vec<PageEvent>,
    /// Late events of the current page not yet observed
    pending: Vec<PageEvent>,
    released: bool,
}

impl SimDriver {
    fn site_path<'a>(&self, url: &'a str) -> &'a str {
        url.strip_prefix(self.site.origin.as_str()).unwrap_or(url)
    }

    fn record(&self, hit: Hit, path: &str) {
        self.site.traffic.lock().push(TrafficEntry {
            session: self.id,
            hit,
            path: path.to_string(),
        });
    }

    fn page(&self) -> Option<&SimPage> {
        self.site.pages.get(&self.path)
    }

    /// Elements currently attached to the DOM
    fn attached(&self, testid: &str) -> Vec<&SimElement> {
        match self.page() {
            Some(page) => page
                .elements
                .iter()
                .filter(|e| e.testid == testid && (!e.deferred || self.revealed.contains(testid)))
                .collect(),
            None => Vec::new(),
        }
    }

    /// Load a site path (with optional query), following the login redirect
    fn load(&mut self, target: &str) -> u16 {
        let (path, query) = match target.split_once('?') {
            Some((path, query)) => (path.to_string(), Some(query.to_string())),
            None => (target.to_string(), None),
        };
        self.record(Hit::Navigation, &path);
        self.revealed.clear();
        self.fields.clear();
        self.pending.clear();

        let needs_login = self.site.pages.get(&path).map(|p| p.requires_login).unwrap_or(false);
        if needs_login && self.identity.is_none() {
            let locale = locale_of(&path).unwrap_or(Locale::Th);
            let sign_in = Route::SignIn.path(locale);
            self.record(Hit::Navigation, &sign_in);
            self.path = sign_in;
            self.query = None;
        } else {
            self.path = path;
            self.query = query;
        }

        match self.site.pages.get(&self.path) {
            Some(page) => {
                for message in &page.page_errors {
                    self.events.push(PageEvent::PageError { message: message.clone() });
                }
                for text in &page.console_errors {
                    self.events.push(PageEvent::ConsoleError { text: text.clone() });
                }
                self.pending = page.late_events.clone();
                page.status
            }
            None => 404,
        }
    }

    fn current(&self) -> String {
        match &self.query {
            Some(query) => format!("{}{}?{}", self.site.origin, self.path, query),
            None => format!("{}{}", self.site.origin, self.path),
        }
    }

    fn settle(&mut self) {
        self.events.append(&mut self.pending);
    }

    fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.site.open.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

#[async_trait]
impl PageDriver for SimDriver {
    async fn goto(&mut self, url: &str) -> E2eResult<Option<u16>> {
        if self.released {
            return Err(E2eError::Bridge("browser context already closed".into()));
        }
        if !self.site.latency.is_zero() {
            tokio::time::sleep(self.site.latency).await;
        }
        let path = self.site_path(url).to_string();
        Ok(Some(self.load(&path)))
    }

    async fn click(&mut self, testid: &str) -> E2eResult<bool> {
        let effect = match self.attached(testid).into_iter().find(|e| e.visible) {
            Some(element) => element.on_click.clone(),
            None => return Ok(false),
        };
        match effect {
            Some(ClickEffect::Navigate(href)) => {
                let path = self.site_path(&href).to_string();
                self.load(&path);
            }
            Some(ClickEffect::Reveal(target)) => {
                self.revealed.insert(target);
            }
            Some(ClickEffect::SubmitLogin) => {
                let email = self.fields.get(Tid::AuthEmail.attr()).cloned().unwrap_or_default();
                let password = self.fields.get(Tid::AuthPassword.attr()).cloned().unwrap_or_default();
                let role = self
                    .site
                    .accounts
                    .iter()
                    .find(|(e, p, _)| *e == email && *p == password)
                    .map(|(_, _, role)| *role);
                if let Some(role) = role {
                    self.identity = Some(role);
                    let locale = locale_of(&self.path).unwrap_or(Locale::Th);
                    self.load(&Route::Dashboard.path(locale));
                }
            }
            Some(ClickEffect::Logout) => {
                self.identity = None;
                let locale = locale_of(&self.path).unwrap_or(Locale::Th);
                self.load(&Route::Home.path(locale));
            }
            Some(ClickEffect::PageError(message)) => {
                self.events.push(PageEvent::PageError { message });
            }
            None => {}
        }
        Ok(true)
    }

    async fn fill(&mut self, testid: &str, value: &str) -> E2eResult<bool> {
        if self.attached(testid).is_empty() {
            return Ok(false);
        }
        self.fields.insert(testid.to_string(), value.to_string());
        Ok(true)
    }

    async fn count(&mut self, testid: &str) -> E2eResult<usize> {
        Ok(self.attached(testid).len())
    }

    async fn is_visible(&mut self, testid: &str, _wait: Duration) -> E2eResult<bool> {
        Ok(self.attached(testid).iter().any(|e| e.visible))
    }

    async fn attribute(&mut self, testid: &str, name: &str) -> E2eResult<Option<String>> {
        Ok(self
            .attached(testid)
            .first()
            .and_then(|e| e.attrs.get(name).cloned()))
    }

    async fn current_url(&mut self) -> E2eResult<String> {
        Ok(self.current())
    }

    async fn wait_for_url(&mut self, needle: &str, _wait: Duration) -> E2eResult<bool> {
        Ok(self.current().contains(needle))
    }

    async fn visible_text(&mut self) -> E2eResult<String> {
        self.settle();
        Ok(self.page().map(|p| p.text.clone()).unwrap_or_default())
    }

    async fn anchor_hrefs(&mut self) -> E2eResult<Vec<String>> {
        self.settle();
        Ok(self.page().map(|p| p.anchors.clone()).unwrap_or_default())
    }

    async fn link_status(&mut self, url: &str) -> E2eResult<u16> {
        let target = self.site_path(url);
        let path = target.split_once('?').map(|(p, _)| p).unwrap_or(target).to_string();
        self.record(Hit::LinkCheck, &path);
        self.settle();
        Ok(self.site.pages.get(&path).map(|p| p.status).unwrap_or(404))
    }

    fn drain_events(&mut self) -> Vec<PageEvent> {
        std::mem::take(&mut self.events)
    }

    async fn close(&mut self) -> E2eResult<()> {
        self.release();
        Ok(())
    }
}

impl Drop for SimDriver {
    fn drop(&mut self) {
        self.release();
    }
}
