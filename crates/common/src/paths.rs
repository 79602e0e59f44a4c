//! Route table: (locale, logical route) -> concrete path
//!
//! Every path the site serves starts with `/{locale}`. Resolution is a pure
//! function of its inputs, and the locale can always be read back from the
//! first path segment with [`locale_of`].

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::locale::Locale;

/// A logical route of the site.
///
/// Routes with a resource identifier carry it as a slug. The logical string
/// form is the route name, optionally followed by `/` and the slug
/// (`pricing`, `lesson/intro-to-python`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Route {
    Home,
    Curriculum,
    Tracks,
    Pricing,
    Checkout,
    ThankYou,
    Blog,
    About,
    Contact,
    SignIn,
    Dashboard,
    Course,
    Lesson(String),
    Workshop(String),
    Quiz(String),
    Capstone,
    Certificates,
    Profile,
    Admin,
    AdminSubmissions,
    AdminLessons,
    AdminAnnouncements,
}

/// Names of every known logical route, with the number of parameters each takes
pub const ROUTE_NAMES: &[(&str, usize)] = &[
    ("home", 0),
    ("curriculum", 0),
    ("tracks", 0),
    ("pricing", 0),
    ("checkout", 0),
    ("thank-you", 0),
    ("blog", 0),
    ("about", 0),
    ("contact", 0),
    ("sign-in", 0),
    ("dashboard", 0),
    ("course", 0),
    ("lesson", 1),
    ("workshop", 1),
    ("quiz", 1),
    ("capstone", 0),
    ("certificates", 0),
    ("profile", 0),
    ("admin", 0),
    ("admin-submissions", 0),
    ("admin-lessons", 0),
    ("admin-announcements", 0),
];

impl Route {
    /// Logical route name
    pub fn name(&self) -> &'static str {
        match self {
            Route::Home => "home",
            Route::Curriculum => "curriculum",
            Route::Tracks => "tracks",
            Route::Pricing => "pricing",
            Route::Checkout => "checkout",
            Route::ThankYou => "thank-you",
            Route::Blog => "blog",
            Route::About => "about",
            Route::Contact => "contact",
            Route::SignIn => "sign-in",
            Route::Dashboard => "dashboard",
            Route::Course => "course",
            Route::Lesson(_) => "lesson",
            Route::Workshop(_) => "workshop",
            Route::Quiz(_) => "quiz",
            Route::Capstone => "capstone",
            Route::Certificates => "certificates",
            Route::Profile => "profile",
            Route::Admin => "admin",
            Route::AdminSubmissions => "admin-submissions",
            Route::AdminLessons => "admin-lessons",
            Route::AdminAnnouncements => "admin-announcements",
        }
    }

    /// Build a route from its logical name and parameters.
    ///
    /// Unknown names and wrong parameter counts are caller errors; nothing is
    /// ever substituted.
    pub fn from_name(name: &str, params: &[&str]) -> Result<Route> {
        let arity = ROUTE_NAMES
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, arity)| *arity)
            .ok_or_else(|| Error::UnknownRoute {
                name: name.to_string(),
                detail: "no such logical route".to_string(),
            })?;

        if params.len() != arity {
            return Err(Error::UnknownRoute {
                name: name.to_string(),
                detail: format!("expected {} parameter(s), got {}", arity, params.len()),
            });
        }

        let slug = || -> Result<String> {
            let slug = params[0];
            if slug.is_empty() || slug.contains(['/', '?', '#']) {
                return Err(Error::UnknownRoute {
                    name: name.to_string(),
                    detail: format!("invalid resource identifier '{}'", slug),
                });
            }
            Ok(slug.to_string())
        };

        let route = match name {
            "home" => Route::Home,
            "curriculum" => Route::Curriculum,
            "tracks" => Route::Tracks,
            "pricing" => Route::Pricing,
            "checkout" => Route::Checkout,
            "thank-you" => Route::ThankYou,
            "blog" => Route::Blog,
            "about" => Route::About,
            "contact" => Route::Contact,
            "sign-in" => Route::SignIn,
            "dashboard" => Route::Dashboard,
            "course" => Route::Course,
            "lesson" => Route::Lesson(slug()?),
            "workshop" => Route::Workshop(slug()?),
            "quiz" => Route::Quiz(slug()?),
            "capstone" => Route::Capstone,
            "certificates" => Route::Certificates,
            "profile" => Route::Profile,
            "admin" => Route::Admin,
            "admin-submissions" => Route::AdminSubmissions,
            "admin-lessons" => Route::AdminLessons,
            _ => Route::AdminAnnouncements,
        };
        Ok(route)
    }

    /// Concrete path of this route for a locale
    pub fn path(&self, locale: Locale) -> String {
        let loc = locale.as_str();
        match self {
            Route::Home => format!("/{}", loc),
            Route::Curriculum => format!("/{}/curriculum", loc),
            Route::Tracks => format!("/{}/tracks", loc),
            Route::Pricing => format!("/{}/pricing", loc),
            Route::Checkout => format!("/{}/checkout", loc),
            Route::ThankYou => format!("/{}/thank-you", loc),
            Route::Blog => format!("/{}/blog", loc),
            Route::About => format!("/{}/about", loc),
            Route::Contact => format!("/{}/contact", loc),
            Route::SignIn => format!("/{}/auth/sign-in", loc),
            Route::Dashboard => format!("/{}/app/dashboard", loc),
            Route::Course => format!("/{}/app/course", loc),
            Route::Lesson(id) => format!("{}{}", ResourceKind::Lesson.shape_prefix(locale), id),
            Route::Workshop(id) => format!("{}{}", ResourceKind::Workshop.shape_prefix(locale), id),
            Route::Quiz(id) => format!("{}{}", ResourceKind::Quiz.shape_prefix(locale), id),
            Route::Capstone => format!("/{}/app/capstone", loc),
            Route::Certificates => format!("/{}/app/certificates", loc),
            Route::Profile => format!("/{}/app/profile", loc),
            Route::Admin => format!("/{}/app/admin", loc),
            Route::AdminSubmissions => format!("/{}/app/admin/submissions", loc),
            Route::AdminLessons => format!("/{}/app/admin/lessons", loc),
            Route::AdminAnnouncements => format!("/{}/app/admin/announcements", loc),
        }
    }
}

impl std::fmt::Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Route::Lesson(id) | Route::Workshop(id) | Route::Quiz(id) => {
                write!(f, "{}/{}", self.name(), id)
            }
            _ => f.write_str(self.name()),
        }
    }
}

impl FromStr for Route {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut parts = s.trim().splitn(2, '/');
        let name = parts.next().unwrap_or_default();
        let params: Vec<&str> = parts.collect();
        Route::from_name(name, &params)
    }
}

impl TryFrom<String> for Route {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Route> for String {
    fn from(route: Route) -> Self {
        route.to_string()
    }
}

/// Resolve a logical route by name for a locale.
pub fn resolve(locale: Locale, name: &str, params: &[&str]) -> Result<String> {
    Ok(Route::from_name(name, params)?.path(locale))
}

/// A locale-relative raw path (`/{locale}/<rest>`), used for pages outside
/// the route table such as not-found checks.
pub fn locale_path(locale: Locale, rest: &str) -> String {
    let rest = rest.trim_start_matches('/');
    if rest.is_empty() {
        format!("/{}", locale)
    } else {
        format!("/{}/{}", locale, rest)
    }
}

/// Resource classes whose identifiers are only known at run time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Lesson,
    Workshop,
    Quiz,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Lesson => "lesson",
            ResourceKind::Workshop => "workshop",
            ResourceKind::Quiz => "quiz",
        }
    }

    /// Path prefix every URL of this resource class starts with
    pub fn shape_prefix(&self, locale: Locale) -> String {
        format!("/{}/app/{}/", locale, self.as_str())
    }

    /// Whether `path` has this resource's route shape: the prefix followed
    /// by a non-empty identifier segment.
    pub fn matches_shape(&self, locale: Locale, path: &str) -> bool {
        let prefix = self.shape_prefix(locale);
        match path.strip_prefix(prefix.as_str()) {
            Some(rest) => {
                let id = rest.split(['/', '?', '#']).next().unwrap_or_default();
                !id.is_empty()
            }
            None => false,
        }
    }

    pub fn route(&self, id: &str) -> Route {
        match self {
            ResourceKind::Lesson => Route::Lesson(id.to_string()),
            ResourceKind::Workshop => Route::Workshop(id.to_string()),
            ResourceKind::Quiz => Route::Quiz(id.to_string()),
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Read the locale back from a path (or absolute URL) produced by the route table.
pub fn locale_of(path_or_url: &str) -> Option<Locale> {
    let path = match path_or_url.find("://") {
        Some(idx) => {
            let after_scheme = &path_or_url[idx + 3..];
            match after_scheme.find('/') {
                Some(slash) => &after_scheme[slash..],
                None => return None,
            }
        }
        None => path_or_url,
    };

    let first = path
        .trim_start_matches('/')
        .split(['/', '?', '#'])
        .next()
        .unwrap_or_default();

    Locale::ALL.into_iter().find(|loc| loc.as_str() == first)
}
