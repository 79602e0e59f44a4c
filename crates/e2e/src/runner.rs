//! Suite runner: the (case × locale) matrix across worker lanes

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, info_span, Instrument};
use uuid::Uuid;

use aip101_common::{Locale, Role};

use crate::case::{validate_suite, CaseDescriptor};
use crate::config::{CaseFilter, SuiteConfig, ENV_PAYMENT_MODE};
use crate::error::E2eResult;
use crate::executor::{self, Failure};
use crate::session::SessionFixture;

/// One cell of the suite matrix
#[derive(Debug, Clone)]
pub struct Combination {
    pub case: Arc<CaseDescriptor>,
    pub locale: Locale,
}

/// Every (case, locale) pair where the case supports the locale, case-major
pub fn matrix<'a>(
    cases: &'a [Arc<CaseDescriptor>],
    locales: &'a [Locale],
) -> impl Iterator<Item = Combination> + 'a {
    cases.iter().flat_map(move |case| {
        locales
            .iter()
            .filter(move |locale| case.locales.contains(*locale))
            .map(move |locale| Combination {
                case: case.clone(),
                locale: *locale,
            })
    })
}

/// Apply a filter to a case list, keeping order
pub fn select_cases(cases: Vec<CaseDescriptor>, filter: &CaseFilter) -> Vec<CaseDescriptor> {
    cases
        .into_iter()
        .filter(|c| filter.tag.as_ref().map_or(true, |tag| c.tags.iter().any(|t| t == tag)))
        .filter(|c| filter.id_prefix.as_ref().map_or(true, |p| c.id.starts_with(p.as_str())))
        .filter(|c| !filter.quality_only || c.quality)
        .collect()
}

/// Result of one combination
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Passed,
    Failed(Failure),
    Skipped { reason: String },
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CombinationResult {
    pub case_id: String,
    pub title: String,
    pub locale: Locale,
    pub role: Role,
    pub outcome: Outcome,
    pub duration_ms: u64,
    /// Concrete URL found for dynamic pages
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discovered: Option<String>,
    pub links_checked: usize,
}

impl CombinationResult {
    fn new(combo: &Combination, outcome: Outcome) -> Self {
        Self {
            case_id: combo.case.id.clone(),
            title: combo.case.title.clone(),
            locale: combo.locale,
            role: combo.case.role,
            outcome,
            duration_ms: 0,
            discovered: None,
            links_checked: 0,
        }
    }
}

/// Result of a suite run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub base_url: String,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub cancelled: usize,
    pub duration_ms: u64,
    pub results: Vec<CombinationResult>,
}

impl SuiteReport {
    /// Result for a case id and locale
    pub fn get(&self, case_id: &str, locale: Locale) -> Option<&CombinationResult> {
        self.results
            .iter()
            .find(|r| r.case_id == case_id && r.locale == locale)
    }

    /// No failures and nothing cancelled
    pub fn success(&self) -> bool {
        self.failed == 0 && self.cancelled == 0
    }

    /// Write the report as `test-results.json` under `output_dir`
    pub fn write_results(&self, output_dir: &Path) -> E2eResult<PathBuf> {
        std::fs::create_dir_all(output_dir)?;

        let path = output_dir.join("test-results.json");
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, json)?;

        info!("Results written to: {}", path.display());
        Ok(path)
    }
}

/// Runs every combination of a suite in isolated sessions
pub struct SuiteRunner {
    fixture: SessionFixture,
    concurrency: usize,
    payment_mock: bool,
    cancel: CancellationToken,
}

impl SuiteRunner {
    pub fn new(fixture: SessionFixture, config: &SuiteConfig) -> Self {
        Self {
            fixture,
            concurrency: config.concurrency.max(1),
            payment_mock: config.payment_mock,
            cancel: CancellationToken::new(),
        }
    }

    /// Token that aborts the suite; in-flight sessions are torn down
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Run the full matrix of `cases` × `locales`
    pub async fn run(&self, cases: Vec<CaseDescriptor>, locales: &[Locale]) -> E2eResult<SuiteReport> {
        validate_suite(&cases)?;

        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let start = Instant::now();

        let cases: Vec<Arc<CaseDescriptor>> = cases.into_iter().map(Arc::new).collect();
        let combos: Vec<Combination> = matrix(&cases, locales).collect();
        info!(
            "Running {} combination(s) of {} case(s) with {} lane(s) [run {}]",
            combos.len(),
            cases.len(),
            self.concurrency,
            run_id
        );

        let mut results: Vec<(usize, CombinationResult)> = stream::iter(combos.into_iter().enumerate())
            .map(|(idx, combo)| async move { (idx, self.run_combination(combo).await) })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;
        results.sort_by_key(|(idx, _)| *idx);
        let results: Vec<CombinationResult> = results.into_iter().map(|(_, r)| r).collect();

        let count = |f: fn(&Outcome) -> bool| results.iter().filter(|r| f(&r.outcome)).count();
        let passed = count(|o| matches!(o, Outcome::Passed));
        let failed = count(|o| matches!(o, Outcome::Failed(_)));
        let skipped = count(|o| matches!(o, Outcome::Skipped { .. }));
        let cancelled = count(|o| matches!(o, Outcome::Cancelled));
        let duration_ms = start.elapsed().as_millis() as u64;

        info!(
            "Suite results: {} passed, {} failed, {} skipped, {} cancelled ({} ms)",
            passed, failed, skipped, cancelled, duration_ms
        );

        Ok(SuiteReport {
            run_id,
            started_at,
            base_url: self.fixture.settings().base_url.clone(),
            total: results.len(),
            passed,
            failed,
            skipped,
            cancelled,
            duration_ms,
            results,
        })
    }

    /// Run one combination in its own session
    pub async fn run_combination(&self, combo: Combination) -> CombinationResult {
        let span = info_span!(
            "combination",
            case = %combo.case.id,
            locale = %combo.locale,
            role = %combo.case.role
        );

        async move {
            if combo.case.requires_payment_mock && !self.payment_mock {
                let reason = format!("{} is not 'mock'", ENV_PAYMENT_MODE);
                info!("- {} ({}) skipped: {}", combo.case.id, combo.locale, reason);
                return CombinationResult::new(&combo, Outcome::Skipped { reason });
            }
            if self.cancel.is_cancelled() {
                return CombinationResult::new(&combo, Outcome::Cancelled);
            }

            let start = Instant::now();
            let result = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => None,
                result = executor::run_case(&self.fixture, combo.case.clone(), combo.locale) => Some(result),
            };

            let mut record = match result {
                None => {
                    info!("- {} ({}) cancelled", combo.case.id, combo.locale);
                    CombinationResult::new(&combo, Outcome::Cancelled)
                }
                Some(Ok(execution)) => {
                    info!("✓ {} ({})", combo.case.id, combo.locale);
                    let mut record = CombinationResult::new(&combo, Outcome::Passed);
                    record.discovered = execution.discovered.map(|d| d.url);
                    record.links_checked = execution.crawl.map(|c| c.checked.len()).unwrap_or(0);
                    record
                }
                Some(Err(failure)) => {
                    error!("✗ {} ({}) - {}", combo.case.id, combo.locale, failure);
                    CombinationResult::new(&combo, Outcome::Failed(failure))
                }
            };
            record.duration_ms = start.elapsed().as_millis() as u64;
            record
        }
        .instrument(span)
        .await
    }
}
