//! Case executor
//!
//! Runs one case against one locale inside one session:
//!
//! ```text
//! Pending ──navigate──▶ Navigated ──click──▶ Acted ──expect──▶ Asserted ──▶ Passed
//!    │                     │                   │                  │
//!    └─────────────────────┴───────────────────┴──────────────────┴──────▶ Failed
//! ```
//!
//! The leak scan runs on every navigation and once more before `Passed`;
//! quality cases crawl the page's links right after `Navigated`. The first
//! error ends the case and is reported with the step it came from.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use aip101_common::Locale;

use crate::case::{Action, CaseDescriptor, Expect, PrepareStep};
use crate::crawler::{self, CrawlResult};
use crate::discovery::{discover, DiscoveredResource};
use crate::error::{E2eError, E2eResult};
use crate::session::{Session, SessionFixture};

/// Executor state of a single case
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseState {
    #[default]
    Pending,
    Navigated,
    Acted,
    Asserted,
    Passed,
    Failed,
}

impl std::fmt::Display for CaseState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            CaseState::Pending => "pending",
            CaseState::Navigated => "navigated",
            CaseState::Acted => "acted",
            CaseState::Asserted => "asserted",
            CaseState::Passed => "passed",
            CaseState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Where in a case an error happened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    /// Opening the session, including login
    Setup,
    Discover,
    Navigate,
    LeakScan,
    Crawl,
    Prepare,
    Act,
    Assert,
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Step::Setup => "setup",
            Step::Discover => "discover",
            Step::Navigate => "navigate",
            Step::LeakScan => "leak-scan",
            Step::Crawl => "crawl",
            Step::Prepare => "prepare",
            Step::Act => "act",
            Step::Assert => "assert",
        };
        f.write_str(s)
    }
}

/// The single named reason a case did not pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Failure {
    pub step: Step,
    /// Taxonomy label of the error
    pub kind: String,
    pub message: String,
    /// Last state reached before the failure
    pub reached: CaseState,
}

impl Failure {
    pub fn new(step: Step, reached: CaseState, error: &E2eError) -> Self {
        Self {
            step,
            kind: error.kind().to_string(),
            message: error.to_string(),
            reached,
        }
    }
}

impl std::fmt::Display for Failure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {} at {}: {}", self.kind, self.step, self.reached, self.message)
    }
}

/// What a passing case leaves behind
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Execution {
    pub state: CaseState,
    /// URL the case navigated to
    pub page_url: String,
    pub final_url: String,
    pub discovered: Option<DiscoveredResource>,
    pub crawl: Option<CrawlResult>,
}

impl Execution {
    fn advance(&mut self, next: CaseState) {
        debug!("{:?} -> {:?}", self.state, next);
        self.state = next;
    }

    fn fail(&self, step: Step) -> impl FnOnce(E2eError) -> Failure {
        let reached = self.state;
        move |e| Failure::new(step, reached, &e)
    }
}

/// Open a session for the case and run it for `locale`. The session is
/// closed on every exit path; a setup error (e.g. login) is the failure.
pub async fn run_case(
    fixture: &SessionFixture,
    case: Arc<CaseDescriptor>,
    locale: Locale,
) -> Result<Execution, Failure> {
    let role = case.role;
    let sign_in = case.logs_in();
    let outcome = fixture
        .with_session(role, locale, sign_in, move |session| {
            Box::pin(async move { Ok(execute(session, &case).await) })
        })
        .await;

    match outcome {
        Ok(result) => result,
        Err(e) => Err(Failure::new(Step::Setup, CaseState::Pending, &e)),
    }
}

/// Drive an already-open session through the case
pub async fn execute(session: &mut Session, case: &CaseDescriptor) -> Result<Execution, Failure> {
    let locale = session.locale();
    let mut run = Execution::default();

    let page = match case.page.dynamic_kind() {
        Some(kind) => {
            let found = discover(session, kind).await.map_err(run.fail(Step::Discover))?;
            let url = found.url.clone();
            run.discovered = Some(found);
            url
        }
        None => case.page.resolve(locale).ok_or_else(|| {
            let e = E2eError::InvalidCase {
                id: case.id.clone(),
                reason: format!("page {} does not resolve for {}", case.page, locale),
            };
            Failure::new(Step::Navigate, CaseState::Pending, &e)
        })?,
    };

    session.goto_ok(&page).await.map_err(run.fail(Step::Navigate))?;
    run.page_url = session.last_url().to_string();
    run.advance(CaseState::Navigated);

    session.scan_for_leaks().await.map_err(run.fail(Step::LeakScan))?;

    if case.quality {
        let crawl = match crawler::crawl(session).await.and_then(CrawlResult::into_result) {
            Ok(crawl) => crawl,
            Err(e) => return Err(run.fail(Step::Crawl)(e)),
        };
        session.check_guards().map_err(run.fail(Step::Crawl))?;
        run.crawl = Some(crawl);
    }

    for step in &case.prepare {
        let result = match step {
            PrepareStep::Fill { target, value } => session.fill(*target, value).await,
            PrepareStep::Click { target } => session.click(*target).await,
        };
        result.map_err(run.fail(Step::Prepare))?;
    }

    if let Some(Action::Click { target }) = &case.action {
        session.click(*target).await.map_err(run.fail(Step::Act))?;
        run.advance(CaseState::Acted);
    }

    check_expectations(session, &case.expect).await.map_err(run.fail(Step::Assert))?;
    run.advance(CaseState::Asserted);

    if case.action.is_some() || !case.prepare.is_empty() {
        session.scan_for_leaks().await.map_err(run.fail(Step::LeakScan))?;
    }

    // events that arrived during the last reads
    session.check_guards().map_err(run.fail(Step::Assert))?;

    run.final_url = session.last_url().to_string();
    run.advance(CaseState::Passed);
    Ok(run)
}

/// Evaluate every present condition in order; the first one that does not
/// hold is named in the error.
pub async fn check_expectations(session: &mut Session, expect: &Expect) -> E2eResult<()> {
    let locale = session.locale();

    if let Some(url) = &expect.url_contains {
        let needle = url.resolve(locale);
        if !session.wait_for_url(&needle).await? {
            return Err(E2eError::AssertionFailed {
                condition: format!("url contains \"{}\" (was {})", needle, session.last_url()),
            });
        }
    }

    if let Some(tid) = expect.visible {
        if !session.is_visible(tid).await? {
            return Err(E2eError::AssertionFailed {
                condition: format!("{} visible on {}", tid, session.last_url()),
            });
        }
    }

    if let Some(attr) = &expect.attribute {
        let value = session.attribute(attr.target, &attr.name).await?;
        let holds = match (&value, &attr.equals) {
            (Some(actual), Some(expected)) => actual == expected,
            (Some(actual), None) => !actual.is_empty(),
            (None, _) => false,
        };
        if !holds {
            let wanted = match &attr.equals {
                Some(expected) => format!("{}=\"{}\"", attr.name, expected),
                None => format!("non-empty {}", attr.name),
            };
            return Err(E2eError::AssertionFailed {
                condition: format!(
                    "{} has {} (found {})",
                    attr.target,
                    wanted,
                    value.as_deref().map(|v| format!("\"{}\"", v)).unwrap_or_else(|| "nothing".into())
                ),
            });
        }
    }

    Ok(())
}
