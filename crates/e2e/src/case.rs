//! Declarative case descriptors
//!
//! A case names one page, an optional single interaction, and the
//! post-conditions that must hold afterwards, for every locale it lists.
//! Descriptors are built once (in code or from YAML) and only read after.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::path::Path;

use aip101_common::paths::locale_path;
use aip101_common::{Locale, ResourceKind, Role, Route, Tid};

use crate::error::{E2eError, E2eResult};

/// Where a case starts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PageTarget {
    /// A route from the route table
    Route {
        route: Route,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        query: Option<String>,
    },

    /// A locale-relative path outside the route table
    Path {
        path: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        query: Option<String>,
    },

    /// A resource whose URL is discovered at run time
    Dynamic { dynamic: ResourceKind },
}

impl PageTarget {
    /// Locale-specific path, or `None` when the target has to be discovered
    pub fn resolve(&self, locale: Locale) -> Option<String> {
        let with_query = |path: String, query: &Option<String>| match query {
            Some(q) => format!("{}?{}", path, q.trim_start_matches('?')),
            None => path,
        };
        match self {
            PageTarget::Route { route, query } => Some(with_query(route.path(locale), query)),
            PageTarget::Path { path, query } => Some(with_query(locale_path(locale, path), query)),
            PageTarget::Dynamic { .. } => None,
        }
    }

    pub fn dynamic_kind(&self) -> Option<ResourceKind> {
        match self {
            PageTarget::Dynamic { dynamic } => Some(*dynamic),
            _ => None,
        }
    }
}

impl From<Route> for PageTarget {
    fn from(route: Route) -> Self {
        PageTarget::Route { route, query: None }
    }
}

impl std::fmt::Display for PageTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PageTarget::Route { route, query: Some(q) } => write!(f, "{}?{}", route, q),
            PageTarget::Route { route, query: None } => write!(f, "{}", route),
            PageTarget::Path { path, .. } => write!(f, "/{{locale}}/{}", path),
            PageTarget::Dynamic { dynamic } => write!(f, "<discovered {}>", dynamic),
        }
    }
}

/// The single interaction a case performs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Action {
    Click { target: Tid },
}

/// Input that has to happen before the action (form filling, opening a panel)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PrepareStep {
    Fill { target: Tid, value: String },
    Click { target: Tid },
}

impl PrepareStep {
    pub fn target(&self) -> Tid {
        match self {
            PrepareStep::Fill { target, .. } | PrepareStep::Click { target } => *target,
        }
    }
}

/// What the current URL has to contain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UrlExpectation {
    /// The route's path for the case locale
    Route(Route),
    /// The route-shape prefix of a resource class
    Resource(ResourceKind),
    /// The home path of the other locale (language switch)
    OtherLocaleHome,
    /// A fixed substring
    Literal(String),
}

impl UrlExpectation {
    pub fn resolve(&self, locale: Locale) -> String {
        match self {
            UrlExpectation::Route(route) => route.path(locale),
            UrlExpectation::Resource(kind) => kind.shape_prefix(locale),
            UrlExpectation::OtherLocaleHome => Route::Home.path(locale.other()),
            UrlExpectation::Literal(s) => s.clone(),
        }
    }
}

/// An attribute the target element has to carry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeExpectation {
    pub target: Tid,
    pub name: String,
    /// Required value; when absent the attribute only has to be present and non-empty
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub equals: Option<String>,
}

/// Post-conditions of a case. Absent conditions hold vacuously.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expect {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_contains: Option<UrlExpectation>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visible: Option<Tid>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute: Option<AttributeExpectation>,
}

impl Expect {
    pub fn is_checkable(&self) -> bool {
        self.url_contains.is_some() || self.visible.is_some() || self.attribute.is_some()
    }
}

/// How the session for a case is opened
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SessionMode {
    /// Sign in as the case role (guests stay anonymous)
    #[default]
    AsRole,
    /// Never sign in, whatever the role
    Anonymous,
}

fn default_locales() -> BTreeSet<Locale> {
    Locale::ALL.into_iter().collect()
}

/// A declarative scenario
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseDescriptor {
    /// Unique id within a suite
    pub id: String,

    /// Human-readable title
    #[serde(default)]
    pub title: String,

    #[serde(default = "default_locales")]
    pub locales: BTreeSet<Locale>,

    #[serde(default)]
    pub role: Role,

    #[serde(default)]
    pub session: SessionMode,

    pub page: PageTarget,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub prepare: Vec<PrepareStep>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<Action>,

    pub expect: Expect,

    /// Crawl the page's links after navigation
    #[serde(default)]
    pub quality: bool,

    /// Only runs when the payment provider is mocked
    #[serde(default)]
    pub requires_payment_mock: bool,

    #[serde(default)]
    pub tags: Vec<String>,
}

impl CaseDescriptor {
    /// Start a case for every supported locale
    pub fn new(id: &str, role: Role, page: impl Into<PageTarget>) -> Self {
        Self {
            id: id.to_string(),
            title: String::new(),
            locales: default_locales(),
            role,
            session: SessionMode::AsRole,
            page: page.into(),
            prepare: Vec::new(),
            action: None,
            expect: Expect::default(),
            quality: false,
            requires_payment_mock: false,
            tags: Vec::new(),
        }
    }

    pub fn titled(mut self, title: &str) -> Self {
        self.title = title.to_string();
        self
    }

    pub fn click(mut self, target: Tid) -> Self {
        self.action = Some(Action::Click { target });
        self
    }

    pub fn fill(mut self, target: Tid, value: &str) -> Self {
        self.prepare.push(PrepareStep::Fill { target, value: value.to_string() });
        self
    }

    pub fn prepare_click(mut self, target: Tid) -> Self {
        self.prepare.push(PrepareStep::Click { target });
        self
    }

    pub fn expect_url(mut self, url: UrlExpectation) -> Self {
        self.expect.url_contains = Some(url);
        self
    }

    pub fn expect_route(self, route: Route) -> Self {
        self.expect_url(UrlExpectation::Route(route))
    }

    pub fn expect_visible(mut self, target: Tid) -> Self {
        self.expect.visible = Some(target);
        self
    }

    pub fn expect_attribute(mut self, target: Tid, name: &str, equals: Option<&str>) -> Self {
        self.expect.attribute = Some(AttributeExpectation {
            target,
            name: name.to_string(),
            equals: equals.map(String::from),
        });
        self
    }

    pub fn anonymous(mut self) -> Self {
        self.session = SessionMode::Anonymous;
        self
    }

    pub fn quality(mut self) -> Self {
        self.quality = true;
        self
    }

    pub fn payment_mock_only(mut self) -> Self {
        self.requires_payment_mock = true;
        self
    }

    pub fn tagged(mut self, tag: &str) -> Self {
        self.tags.push(tag.to_string());
        self
    }

    pub fn only_locales(mut self, locales: &[Locale]) -> Self {
        self.locales = locales.iter().copied().collect();
        self
    }

    /// Whether the session for this case signs in
    pub fn logs_in(&self) -> bool {
        self.session == SessionMode::AsRole && self.role.requires_login()
    }

    /// Check the descriptor's own invariants
    pub fn validate(&self) -> E2eResult<()> {
        let invalid = |reason: &str| E2eError::InvalidCase {
            id: self.id.clone(),
            reason: reason.to_string(),
        };

        if self.id.trim().is_empty() {
            return Err(invalid("id must not be empty"));
        }
        if self.locales.is_empty() {
            return Err(invalid("locales must not be empty"));
        }
        if !self.expect.is_checkable() {
            return Err(invalid("expect must specify at least one condition"));
        }
        if self.page.dynamic_kind().is_some() && !self.logs_in() {
            return Err(invalid("dynamic resources are only discoverable from a signed-in session"));
        }
        if let PageTarget::Path { path, .. } = &self.page {
            if path.contains("://") {
                return Err(invalid("path targets are locale-relative, not absolute URLs"));
            }
        }
        Ok(())
    }

    /// Parse one case, or a list of cases, from YAML
    pub fn from_yaml(yaml: &str) -> E2eResult<Vec<Self>> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum OneOrMany {
            Many(Vec<CaseDescriptor>),
            One(Box<CaseDescriptor>),
        }

        let cases = match serde_yaml::from_str::<OneOrMany>(yaml)? {
            OneOrMany::Many(cases) => cases,
            OneOrMany::One(case) => vec![*case],
        };
        for case in &cases {
            case.validate()?;
        }
        Ok(cases)
    }

    /// Parse cases from a YAML file
    pub fn from_file(path: &Path) -> E2eResult<Vec<Self>> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Load all cases from a directory of YAML files
    pub fn load_all(dir: &Path) -> E2eResult<Vec<Self>> {
        let mut files: Vec<_> = walkdir::WalkDir::new(dir)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| {
                e.path()
                    .extension()
                    .map(|ext| ext == "yaml" || ext == "yml")
                    .unwrap_or(false)
            })
            .map(|e| e.into_path())
            .collect();
        files.sort();

        let mut cases = Vec::new();
        for file in files {
            cases.extend(Self::from_file(&file)?);
        }
        Ok(cases)
    }

    /// Filter cases by tag
    pub fn filter_by_tag<'a>(cases: &'a [Self], tag: &str) -> Vec<&'a Self> {
        cases.iter().filter(|c| c.tags.iter().any(|t| t == tag)).collect()
    }
}

/// Validate every case and the uniqueness of their ids
pub fn validate_suite(cases: &[CaseDescriptor]) -> E2eResult<()> {
    let mut seen = HashSet::new();
    for case in cases {
        case.validate()?;
        if !seen.insert(case.id.as_str()) {
            return Err(E2eError::InvalidCase {
                id: case.id.clone(),
                reason: "duplicate id in suite".to_string(),
            });
        }
    }
    Ok(())
}
