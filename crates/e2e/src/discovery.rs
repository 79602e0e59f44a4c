//! Dynamic resource discovery
//!
//! Lesson, workshop and quiz identifiers depend on the signed-in student's
//! progress, so their URLs are found by following UI affordances instead of
//! being built from strings. Each resource class has an ordered fallback
//! chain; the first strategy whose affordance is present wins and later
//! strategies are never attempted. When every strategy is unavailable the
//! discovery fails and names what it tried. A URL is never guessed.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use aip101_common::{Locale, ResourceKind, Route, Tid};

use crate::error::{E2eError, E2eResult};
use crate::session::Session;

/// A resolved resource URL, valid for one case execution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveredResource {
    pub kind: ResourceKind,
    pub url: String,
    /// Label of the strategy that produced the URL
    pub via: String,
}

/// Page a strategy starts from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    Route(Route),
    /// The lesson the dashboard currently points at
    CurrentLesson,
}

/// One step of a fallback chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Strategy {
    pub label: &'static str,
    pub entry: Entry,
    /// Page root that has to render before the affordance is looked up
    pub landmark: Tid,
    pub affordance: Tid,
}

/// The ordered fallback chain for a resource class
pub fn fallback_chain(kind: ResourceKind) -> Vec<Strategy> {
    match kind {
        ResourceKind::Lesson => vec![Strategy {
            label: "dashboard continue",
            entry: Entry::Route(Route::Dashboard),
            landmark: Tid::DashboardRoot,
            affordance: Tid::DashboardContinue,
        }],
        ResourceKind::Workshop => vec![
            Strategy {
                label: "lesson link",
                entry: Entry::CurrentLesson,
                landmark: Tid::LessonRoot,
                affordance: Tid::LessonToWorkshop,
            },
            Strategy {
                label: "course overview card",
                entry: Entry::Route(Route::Course),
                landmark: Tid::CourseRoot,
                affordance: Tid::WorkshopCard0,
            },
        ],
        ResourceKind::Quiz => vec![
            Strategy {
                label: "lesson link",
                entry: Entry::CurrentLesson,
                landmark: Tid::LessonRoot,
                affordance: Tid::LessonToQuiz,
            },
            Strategy {
                label: "course overview card",
                entry: Entry::Route(Route::Course),
                landmark: Tid::CourseRoot,
                affordance: Tid::QuizCard0,
            },
        ],
    }
}

/// Whether an absolute URL has the route shape of `kind` for `locale`
pub fn url_has_shape(kind: ResourceKind, locale: Locale, url: &str) -> bool {
    let prefix = kind.shape_prefix(locale);
    match url.find(prefix.as_str()) {
        Some(idx) => kind.matches_shape(locale, &url[idx..]),
        None => false,
    }
}

/// Resolve a concrete URL for `kind` through its fallback chain
pub async fn discover(session: &mut Session, kind: ResourceKind) -> E2eResult<DiscoveredResource> {
    let lesson = match kind {
        ResourceKind::Lesson => None,
        _ => {
            let chain = fallback_chain(ResourceKind::Lesson);
            Some(run_chain(session, ResourceKind::Lesson, &chain, None).await?)
        }
    };
    run_chain(session, kind, &fallback_chain(kind), lesson.as_ref()).await
}

/// Run an ordered chain; first available affordance wins
pub async fn run_chain(
    session: &mut Session,
    kind: ResourceKind,
    chain: &[Strategy],
    lesson: Option<&DiscoveredResource>,
) -> E2eResult<DiscoveredResource> {
    let locale = session.locale();
    let mut attempted = Vec::with_capacity(chain.len());

    for strategy in chain {
        let entry = match &strategy.entry {
            Entry::Route(route) => route.path(locale),
            Entry::CurrentLesson => match lesson {
                Some(lesson) => lesson.url.clone(),
                None => {
                    return Err(E2eError::Config(format!(
                        "strategy '{}' needs a lesson URL",
                        strategy.label
                    )))
                }
            },
        };

        debug!("Discovering {} via {} from {}", kind, strategy.label, entry);
        session.goto_checked(&entry).await?;

        if !session.is_visible(strategy.landmark).await? {
            attempted.push(format!("{} ({} did not render on {})", strategy.label, strategy.landmark, entry));
            continue;
        }
        if session.count(strategy.affordance).await? == 0 {
            attempted.push(format!("{} ({} absent on {})", strategy.label, strategy.affordance, entry));
            continue;
        }

        session.click(strategy.affordance).await?;

        let prefix = kind.shape_prefix(locale);
        let landed = session.wait_for_url(&prefix).await?;
        let url = session.last_url().to_string();
        if !landed || !url_has_shape(kind, locale, &url) {
            return Err(E2eError::AssertionFailed {
                condition: format!(
                    "{} via {} must land on {}<id>, got {}",
                    kind, strategy.label, prefix, url
                ),
            });
        }

        session.scan_for_leaks().await?;

        info!("Discovered {} {} via {}", kind, url, strategy.label);
        return Ok(DiscoveredResource {
            kind,
            url,
            via: strategy.label.to_string(),
        });
    }

    let hint = chain
        .iter()
        .map(|s| s.affordance.attr())
        .collect::<Vec<_>>()
        .join(" or ");
    let hint = match chain.len() {
        1 => format!("{} on the {} page", hint, chain[0].landmark),
        _ => format!("{} to the lesson page or the course overview", hint),
    };

    Err(E2eError::DiscoveryExhausted {
        kind: kind.to_string(),
        attempted,
        hint,
    })
}
