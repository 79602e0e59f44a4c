//! Engine tests against the in-memory site
//!
//! Exercises sessions, discovery, guards, crawling and the suite runner
//! end to end without a browser.

use std::sync::Arc;
use std::time::Duration;

use aip101_common::{Locale, ResourceKind, Role, Route, Tid};
use aip101_e2e::case::{CaseDescriptor, PageTarget, UrlExpectation};
use aip101_e2e::config::{Credentials, Identity, SuiteConfig};
use aip101_e2e::crawler;
use aip101_e2e::executor::{run_case, CaseState, Step};
use aip101_e2e::leak::LeakDetector;
use aip101_e2e::runner::{Outcome, SuiteRunner};
use aip101_e2e::session::{SessionFixture, SessionSettings};
use aip101_e2e::sim::{Hit, SimPage, SimSite, SimSiteBuilder};
use tempfile::TempDir;

const ORIGIN: &str = "http://sim.test";
const STUDENT_EMAIL: &str = "student@aip101.test";
const ADMIN_EMAIL: &str = "admin@aip101.test";
const PASSWORD: &str = "correct-horse";

/// Public pages, sign-in and a dashboard pointing at lesson `l1`, in both locales
fn platform() -> SimSiteBuilder {
    let mut builder = SimSite::builder(ORIGIN)
        .account(STUDENT_EMAIL, PASSWORD, Role::Student)
        .account(ADMIN_EMAIL, PASSWORD, Role::Admin);

    for locale in Locale::ALL {
        builder = builder
            .page(
                &Route::Home.path(locale),
                SimPage::rooted(Tid::HomeRoot)
                    .link(Tid::NavLogin, &Route::SignIn.path(locale))
                    .anchor(&Route::Pricing.path(locale))
                    .text("AI Project 101"),
            )
            .page(&Route::SignIn.path(locale), SimPage::sign_in())
            .page(
                &Route::Dashboard.path(locale),
                SimPage::rooted(Tid::DashboardRoot)
                    .link(Tid::DashboardContinue, &Route::Lesson("l1".into()).path(locale))
                    .requires_login(),
            )
            .page(&Route::Pricing.path(locale), SimPage::rooted(Tid::PricingRoot))
            .page(&Route::About.path(locale), SimPage::rooted(Tid::AboutRoot))
            .page(
                &Route::Course.path(locale),
                SimPage::rooted(Tid::CourseRoot).requires_login(),
            )
            .page(
                &Route::Lesson("l1".into()).path(locale),
                SimPage::rooted(Tid::LessonRoot).requires_login(),
            )
            .page(
                &Route::Workshop("w1".into()).path(locale),
                SimPage::rooted(Tid::WorkshopRoot).requires_login(),
            );
    }
    builder
}

fn credentials() -> Credentials {
    let identity = |email: &str| Identity {
        email: email.to_string(),
        password: PASSWORD.to_string(),
    };
    Credentials {
        student: Some(identity(STUDENT_EMAIL)),
        admin: Some(identity(ADMIN_EMAIL)),
    }
}

fn settings(credentials: Credentials) -> SessionSettings {
    SessionSettings {
        base_url: ORIGIN.to_string(),
        step_timeout: Duration::from_secs(5),
        console_allow: Vec::new(),
        credentials,
        leak: LeakDetector::default(),
    }
}

fn fixture(site: &SimSite) -> SessionFixture {
    SessionFixture::new(Arc::new(site.clone()), settings(credentials()))
}

fn suite_config(concurrency: usize) -> SuiteConfig {
    SuiteConfig {
        base_url: ORIGIN.to_string(),
        concurrency,
        ..Default::default()
    }
}

fn quiz_case() -> CaseDescriptor {
    CaseDescriptor::new(
        "LMS-011",
        Role::Student,
        PageTarget::Dynamic {
            dynamic: ResourceKind::Quiz,
        },
    )
    .expect_url(UrlExpectation::Resource(ResourceKind::Quiz))
    .expect_visible(Tid::QuizRoot)
}

fn workshop_case() -> CaseDescriptor {
    CaseDescriptor::new(
        "LMS-006",
        Role::Student,
        PageTarget::Dynamic {
            dynamic: ResourceKind::Workshop,
        },
    )
    .expect_visible(Tid::WorkshopRoot)
}

/// Guest on /en clicks the login link and lands on the sign-in form
#[tokio::test]
async fn test_guest_reaches_sign_in_from_nav() {
    let site = platform().build();
    let case = CaseDescriptor::new("AUTH-001", Role::Guest, Route::Home)
        .click(Tid::NavLogin)
        .expect_route(Route::SignIn)
        .expect_visible(Tid::AuthRoot);

    let run = run_case(&fixture(&site), Arc::new(case), Locale::En).await.unwrap();

    assert_eq!(run.state, CaseState::Passed);
    assert_eq!(run.page_url, "http://sim.test/en");
    assert_eq!(run.final_url, "http://sim.test/en/auth/sign-in");
    assert_eq!(site.open_sessions(), 0);
}

/// An anonymous student session on the Thai dashboard is sent to sign-in
#[tokio::test]
async fn test_anonymous_dashboard_redirects_to_sign_in() {
    let site = platform().build();
    let case = CaseDescriptor::new("AUTH-004", Role::Student, Route::Dashboard)
        .anonymous()
        .expect_route(Route::SignIn)
        .expect_visible(Tid::AuthRoot);

    // no credentials needed for an anonymous session
    let fixture = SessionFixture::new(Arc::new(site.clone()), settings(Credentials::default()));
    let run = run_case(&fixture, Arc::new(case), Locale::Th).await.unwrap();

    assert_eq!(run.final_url, "http://sim.test/th/auth/sign-in");
    assert_eq!(site.hits(Hit::Navigation, "/th/app/dashboard"), 1);
}

/// Student login lands on the dashboard in the session locale
#[tokio::test]
async fn test_student_login_lands_on_dashboard() {
    let site = platform().build();
    let case = CaseDescriptor::new("LMS-001", Role::Student, Route::Dashboard)
        .expect_visible(Tid::DashboardRoot)
        .expect_route(Route::Dashboard);

    let run = run_case(&fixture(&site), Arc::new(case), Locale::Th).await.unwrap();

    assert_eq!(run.page_url, "http://sim.test/th/app/dashboard");
    assert_eq!(site.hits(Hit::Navigation, "/th/auth/sign-in"), 1);
}

/// The lesson link wins; the course overview is never visited
#[tokio::test]
async fn test_workshop_discovery_short_circuits_on_lesson_link() {
    let site = platform()
        .page(
            "/en/app/lesson/l1",
            SimPage::rooted(Tid::LessonRoot).link(Tid::LessonToWorkshop, "/en/app/workshop/w1"),
        )
        .page(
            "/en/app/course",
            SimPage::rooted(Tid::CourseRoot).link(Tid::WorkshopCard0, "/en/app/workshop/w1"),
        )
        .build();

    let run = run_case(&fixture(&site), Arc::new(workshop_case()), Locale::En)
        .await
        .unwrap();

    let found = run.discovered.unwrap();
    assert_eq!(found.url, "http://sim.test/en/app/workshop/w1");
    assert_eq!(found.via, "lesson link");
    assert_eq!(site.hits(Hit::Navigation, "/en/app/course"), 0);
}

/// Without a lesson link the course overview card is used
#[tokio::test]
async fn test_workshop_discovery_falls_back_to_course_card() {
    let site = platform()
        .page(
            "/en/app/course",
            SimPage::rooted(Tid::CourseRoot).link(Tid::WorkshopCard0, "/en/app/workshop/w1"),
        )
        .build();

    let run = run_case(&fixture(&site), Arc::new(workshop_case()), Locale::En)
        .await
        .unwrap();

    let found = run.discovered.unwrap();
    assert_eq!(found.via, "course overview card");
    assert_eq!(run.final_url, "http://sim.test/en/app/workshop/w1");
    assert_eq!(site.hits(Hit::Navigation, "/en/app/course"), 1);
}

/// No affordance anywhere: discovery fails and names every strategy
#[tokio::test]
async fn test_discovery_exhausted_names_strategies() {
    let site = platform().build();

    let failure = run_case(&fixture(&site), Arc::new(workshop_case()), Locale::En)
        .await
        .unwrap_err();

    assert_eq!(failure.step, Step::Discover);
    assert_eq!(failure.kind, "DiscoveryExhaustedError");
    assert!(failure.message.contains("lesson link"));
    assert!(failure.message.contains("course overview card"));
    assert!(failure.message.contains("lesson-to-workshop"));
    assert_eq!(site.hits(Hit::Navigation, "/en/app/workshop/w1"), 0);
    assert_eq!(site.open_sessions(), 0);
}

/// A leaked translation key fails the case after navigation
#[tokio::test]
async fn test_translation_leak_is_detected() {
    let site = platform()
        .page("/en/about", SimPage::rooted(Tid::AboutRoot).text("About __MISSING__.about.title"))
        .build();
    let case = CaseDescriptor::new("PUB-006", Role::Guest, Route::About).expect_visible(Tid::AboutRoot);

    let failure = run_case(&fixture(&site), Arc::new(case), Locale::En)
        .await
        .unwrap_err();

    assert_eq!(failure.step, Step::LeakScan);
    assert_eq!(failure.kind, "LeakDetected");
    assert_eq!(failure.reached, CaseState::Navigated);
    assert!(failure.message.contains("__MISSING__"));
}

/// Every same-origin link is requested; one broken link fails the case
#[tokio::test]
async fn test_crawl_checks_every_link() {
    let site = platform()
        .page(
            "/en/about",
            SimPage::rooted(Tid::AboutRoot)
                .anchor("/en/pricing")
                .anchor("/en/pricing#plans")
                .anchor("/en/gone")
                .anchor("#top")
                .anchor("mailto:hello@aip101.test")
                .anchor("https://github.com/aip101"),
        )
        .build();
    let case = CaseDescriptor::new("QA-001-about", Role::Guest, Route::About)
        .quality()
        .expect_visible(Tid::AboutRoot);

    let failure = run_case(&fixture(&site), Arc::new(case), Locale::En)
        .await
        .unwrap_err();

    assert_eq!(failure.step, Step::Crawl);
    assert_eq!(failure.kind, "BrokenLinkError");
    assert!(failure.message.contains("http://sim.test/en/gone (404)"));
    assert_eq!(site.hits(Hit::LinkCheck, "/en/pricing"), 1);
    assert_eq!(site.hits(Hit::LinkCheck, "/en/gone"), 1);
}

/// A healthy page reports the number of links it checked
#[tokio::test]
async fn test_crawl_passes_on_healthy_page() {
    let site = platform().build();
    let case = CaseDescriptor::new("QA-001-home", Role::Guest, Route::Home)
        .quality()
        .expect_visible(Tid::HomeRoot);

    let run = run_case(&fixture(&site), Arc::new(case), Locale::Th).await.unwrap();

    let crawl = run.crawl.unwrap();
    assert_eq!(crawl.checked.len(), 2);
    assert!(crawl.checked.iter().all(|c| c.ok));
    assert!(crawl.cross_locale.is_empty());
}

/// An uncaught page error fails the step that observed it
#[tokio::test]
async fn test_page_error_fails_the_case() {
    let site = platform()
        .page("/en/about", SimPage::rooted(Tid::AboutRoot).page_error("TypeError: x is undefined"))
        .build();
    let case = CaseDescriptor::new("PUB-006", Role::Guest, Route::About).expect_visible(Tid::AboutRoot);

    let failure = run_case(&fixture(&site), Arc::new(case), Locale::En)
        .await
        .unwrap_err();

    assert_eq!(failure.step, Step::Navigate);
    assert_eq!(failure.kind, "UncaughtPageError");
    assert_eq!(site.open_sessions(), 0);
}

/// Console errors fail unless allow-listed
#[tokio::test]
async fn test_console_error_allow_list() {
    let site = platform()
        .page(
            "/en/about",
            SimPage::rooted(Tid::AboutRoot).console_error("Failed to load resource: favicon.ico"),
        )
        .build();
    let case = Arc::new(
        CaseDescriptor::new("PUB-006", Role::Guest, Route::About).expect_visible(Tid::AboutRoot),
    );

    let strict = fixture(&site);
    let failure = run_case(&strict, case.clone(), Locale::En).await.unwrap_err();
    assert_eq!(failure.kind, "ConsoleError");

    let mut lenient = settings(credentials());
    lenient.console_allow = vec!["favicon.ico".to_string()];
    let lenient = SessionFixture::new(Arc::new(site.clone()), lenient);
    assert!(run_case(&lenient, case, Locale::En).await.is_ok());
}

/// A role without credentials fails at setup and names the variables to set
#[tokio::test]
async fn test_missing_credentials_fail_setup() {
    let site = platform().build();
    let fixture = SessionFixture::new(Arc::new(site.clone()), settings(Credentials::default()));
    let case = CaseDescriptor::new("LMS-001", Role::Student, Route::Dashboard)
        .expect_visible(Tid::DashboardRoot);

    let failure = run_case(&fixture, Arc::new(case), Locale::En).await.unwrap_err();

    assert_eq!(failure.step, Step::Setup);
    assert_eq!(failure.kind, "LoginError");
    assert_eq!(failure.reached, CaseState::Pending);
    assert!(failure.message.contains("E2E_USER_EMAIL"));
    assert_eq!(site.open_sessions(), 0);
}

/// Wrong password never reaches the dashboard
#[tokio::test]
async fn test_rejected_login_is_a_setup_failure() {
    let site = platform().build();
    let mut creds = credentials();
    creds.student = Some(Identity {
        email: STUDENT_EMAIL.to_string(),
        password: "wrong".to_string(),
    });
    let fixture = SessionFixture::new(Arc::new(site.clone()), settings(creds));
    let case = CaseDescriptor::new("LMS-001", Role::Student, Route::Dashboard)
        .expect_visible(Tid::DashboardRoot);

    let failure = run_case(&fixture, Arc::new(case), Locale::En).await.unwrap_err();

    assert_eq!(failure.step, Step::Setup);
    assert_eq!(failure.kind, "LoginAssertionError");
}

/// A guest session opened after an admin session carries no identity
#[tokio::test]
async fn test_sessions_do_not_share_identity() {
    let site = platform().build();
    let fixture = fixture(&site);

    let mut admin = fixture.open_as_role(Role::Admin, Locale::En).await.unwrap();
    assert_eq!(admin.signed_in_as(), Some(Role::Admin));
    admin.close().await.unwrap();

    let mut guest = fixture.open_anonymous(Locale::En).await.unwrap();
    assert_eq!(guest.signed_in_as(), None);
    guest.goto_ok(&Route::Dashboard.path(Locale::En)).await.unwrap();
    assert!(guest.last_url().ends_with("/en/app/dashboard"));
    assert_eq!(guest.current_url().await.unwrap(), "http://sim.test/en/auth/sign-in");
    guest.close().await.unwrap();

    assert_eq!(site.launched(), 2);
    assert_eq!(site.open_sessions(), 0);
}

/// Payment cases are skipped unless the provider is mocked
#[tokio::test]
async fn test_payment_case_skipped_without_mock() {
    let site = platform().build();
    let runner = SuiteRunner::new(fixture(&site), &suite_config(2));
    let case = CaseDescriptor::new("PAY-004", Role::Student, Route::Checkout)
        .payment_mock_only()
        .click(Tid::CheckoutPayNow)
        .expect_visible(Tid::PurchaseSuccess);

    let report = runner.run(vec![case], &Locale::ALL).await.unwrap();

    assert_eq!(report.total, 2);
    assert_eq!(report.skipped, 2);
    assert!(report.success());
    match &report.get("PAY-004", Locale::Th).unwrap().outcome {
        Outcome::Skipped { reason } => assert_eq!(reason, "E2E_PAYMENT_MODE is not 'mock'"),
        other => panic!("expected skip, got {:?}", other),
    }
    assert_eq!(site.launched(), 0);
}

/// Mixed suite across both locales; every session is released
#[tokio::test]
async fn test_suite_report_and_teardown() {
    let site = platform()
        .page("/th/about", SimPage::rooted(Tid::AboutRoot).text("{{about.title}}"))
        .build();
    let runner = SuiteRunner::new(fixture(&site), &suite_config(3));
    let cases = vec![
        CaseDescriptor::new("PUB-001", Role::Guest, Route::Home).expect_visible(Tid::HomeRoot),
        CaseDescriptor::new("PUB-006", Role::Guest, Route::About).expect_visible(Tid::AboutRoot),
        CaseDescriptor::new("LMS-001", Role::Student, Route::Dashboard)
            .expect_visible(Tid::DashboardRoot),
    ];

    let report = runner.run(cases, &Locale::ALL).await.unwrap();

    assert_eq!(report.total, 6);
    assert_eq!(report.passed, 5);
    assert_eq!(report.failed, 1);
    assert!(!report.success());
    let ids: Vec<_> = report.results.iter().map(|r| (r.case_id.as_str(), r.locale)).collect();
    assert_eq!(ids[0], ("PUB-001", Locale::Th));
    assert_eq!(ids[5], ("LMS-001", Locale::En));
    match &report.get("PUB-006", Locale::Th).unwrap().outcome {
        Outcome::Failed(failure) => assert_eq!(failure.kind, "LeakDetected"),
        other => panic!("expected failure, got {:?}", other),
    }
    assert_eq!(site.launched(), 6);
    assert_eq!(site.open_sessions(), 0);

    let dir = TempDir::new().unwrap();
    let path = report.write_results(dir.path()).unwrap();
    let json: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
    assert_eq!(json["total"], 6);
    assert_eq!(json["results"][0]["outcome"]["status"], "passed");
    assert_eq!(json["results"][2]["case_id"], "PUB-006");
    assert_eq!(json["results"][2]["outcome"]["status"], "failed");
    assert_eq!(json["results"][2]["outcome"]["step"], "leak_scan");
}

/// Duplicate ids are rejected before any session opens
#[tokio::test]
async fn test_duplicate_case_ids_rejected() {
    let site = platform().build();
    let runner = SuiteRunner::new(fixture(&site), &suite_config(1));
    let case = CaseDescriptor::new("PUB-001", Role::Guest, Route::Home).expect_visible(Tid::HomeRoot);

    let result = runner.run(vec![case.clone(), case], &Locale::ALL).await;

    assert!(result.is_err());
    assert_eq!(site.launched(), 0);
}

/// Cancelling mid-navigation tears down the in-flight session
#[tokio::test]
async fn test_cancel_releases_in_flight_session() {
    let site = platform().latency(Duration::from_millis(300)).build();
    let runner = SuiteRunner::new(fixture(&site), &suite_config(1));
    let cases = vec![
        CaseDescriptor::new("PUB-001", Role::Guest, Route::Home).expect_visible(Tid::HomeRoot),
        CaseDescriptor::new("PUB-006", Role::Guest, Route::About).expect_visible(Tid::AboutRoot),
    ];

    let cancel = runner.cancellation_token();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        cancel.cancel();
    });

    let report = runner.run(cases, &[Locale::En]).await.unwrap();

    assert_eq!(report.cancelled, 2);
    assert!(!report.success());
    assert_eq!(site.launched(), 1);
    assert_eq!(site.open_sessions(), 0);
}

/// Quiz discovery uses the same fallback shape as workshops
#[tokio::test]
async fn test_quiz_discovery_falls_back_to_course_card() {
    let site = platform()
        .page(
            "/th/app/course",
            SimPage::rooted(Tid::CourseRoot).link(Tid::QuizCard0, "/th/app/quiz/q1"),
        )
        .page("/th/app/quiz/q1", SimPage::rooted(Tid::QuizRoot))
        .build();

    let run = run_case(&fixture(&site), Arc::new(quiz_case()), Locale::Th).await.unwrap();

    let found = run.discovered.unwrap();
    assert_eq!(found.kind, ResourceKind::Quiz);
    assert_eq!(found.via, "course overview card");
    assert_eq!(found.url, "http://sim.test/th/app/quiz/q1");
}

/// A lesson quiz link wins over the course card
#[tokio::test]
async fn test_quiz_discovery_short_circuits_on_lesson_link() {
    let site = platform()
        .page(
            "/en/app/lesson/l1",
            SimPage::rooted(Tid::LessonRoot).link(Tid::LessonToQuiz, "/en/app/quiz/q1"),
        )
        .page(
            "/en/app/course",
            SimPage::rooted(Tid::CourseRoot).link(Tid::QuizCard0, "/en/app/quiz/q2"),
        )
        .page("/en/app/quiz/q1", SimPage::rooted(Tid::QuizRoot))
        .build();

    let run = run_case(&fixture(&site), Arc::new(quiz_case()), Locale::En).await.unwrap();

    assert_eq!(run.discovered.unwrap().via, "lesson link");
    assert_eq!(site.hits(Hit::Navigation, "/en/app/course"), 0);
    assert_eq!(site.hits(Hit::Navigation, "/en/app/quiz/q2"), 0);
}

/// Without a dashboard continue link there is no lesson and no fallback
#[tokio::test]
async fn test_lesson_discovery_has_no_fallback() {
    let site = platform()
        .page(
            "/en/app/dashboard",
            SimPage::rooted(Tid::DashboardRoot).requires_login(),
        )
        .page(
            "/en/app/course",
            SimPage::rooted(Tid::CourseRoot).link(Tid::WorkshopCard0, "/en/app/workshop/w1"),
        )
        .build();

    let failure = run_case(&fixture(&site), Arc::new(workshop_case()), Locale::En)
        .await
        .unwrap_err();

    assert_eq!(failure.step, Step::Discover);
    assert_eq!(failure.kind, "DiscoveryExhaustedError");
    assert!(failure.message.contains("dashboard continue"));
    assert!(failure.message.contains("dash-continue"));
    assert_eq!(site.hits(Hit::Navigation, "/en/app/lesson/l1"), 0);
    assert_eq!(site.hits(Hit::Navigation, "/en/app/course"), 0);
}

/// A leak on the post-login dashboard fails the session setup
#[tokio::test]
async fn test_leak_on_login_landing_fails_setup() {
    let site = platform()
        .page(
            "/en/app/dashboard",
            SimPage::rooted(Tid::DashboardRoot)
                .link(Tid::DashboardContinue, "/en/app/lesson/l1")
                .text("Welcome __MISSING__.dashboard.title")
                .requires_login(),
        )
        .build();

    let failure = run_case(&fixture(&site), Arc::new(workshop_case()), Locale::En)
        .await
        .unwrap_err();

    assert_eq!(failure.step, Step::Setup);
    assert_eq!(failure.kind, "LeakDetected");
    assert!(failure.message.contains("__MISSING__"));
    assert_eq!(site.open_sessions(), 0);
}

/// Pages visited only while discovering are scanned too
#[tokio::test]
async fn test_leak_on_discovery_page_fails_discover() {
    let site = platform()
        .page(
            "/en/app/course",
            SimPage::rooted(Tid::CourseRoot)
                .link(Tid::WorkshopCard0, "/en/app/workshop/w1")
                .text("{{course.name}}"),
        )
        .build();

    let failure = run_case(&fixture(&site), Arc::new(workshop_case()), Locale::En)
        .await
        .unwrap_err();

    assert_eq!(failure.step, Step::Discover);
    assert_eq!(failure.kind, "LeakDetected");
    assert!(failure.message.contains("{{"));
    assert!(failure.message.contains("/en/app/course"));
    assert_eq!(site.hits(Hit::Navigation, "/en/app/workshop/w1"), 0);
}

/// Errors raised after load are caught by the next read, not lost at close
#[tokio::test]
async fn test_late_page_error_is_not_swallowed() {
    let site = platform()
        .page(
            "/en/about",
            SimPage::rooted(Tid::AboutRoot).late_page_error("ReferenceError: t is not defined"),
        )
        .build();
    let case = CaseDescriptor::new("PUB-006", Role::Guest, Route::About).expect_visible(Tid::AboutRoot);

    let failure = run_case(&fixture(&site), Arc::new(case), Locale::En)
        .await
        .unwrap_err();

    assert_eq!(failure.kind, "UncaughtPageError");
    assert!(failure.message.contains("ReferenceError"));
    assert_eq!(site.open_sessions(), 0);
}

/// Late console errors respect the allow-list
#[tokio::test]
async fn test_late_console_error_allow_list() {
    let site = platform()
        .page(
            "/en/about",
            SimPage::rooted(Tid::AboutRoot)
                .anchor("/en/pricing")
                .late_console_error("Failed to load resource: favicon.ico"),
        )
        .build();
    let case = Arc::new(
        CaseDescriptor::new("QA-001-about", Role::Guest, Route::About)
            .quality()
            .expect_visible(Tid::AboutRoot),
    );

    let failure = run_case(&fixture(&site), case.clone(), Locale::En).await.unwrap_err();
    assert_eq!(failure.kind, "ConsoleError");

    let mut lenient = settings(credentials());
    lenient.console_allow = vec!["favicon.ico".to_string()];
    let lenient = SessionFixture::new(Arc::new(site.clone()), lenient);
    let run = run_case(&lenient, case, Locale::En).await.unwrap();
    assert_eq!(run.crawl.unwrap().checked.len(), 1);
}

/// Clicking an element that is not on the page is a named failure
#[tokio::test]
async fn test_missing_action_target() {
    let site = platform().build();
    let case = CaseDescriptor::new("PUB-005", Role::Guest, Route::Home)
        .click(Tid::NavBlog)
        .expect_route(Route::Blog);

    let failure = run_case(&fixture(&site), Arc::new(case), Locale::En)
        .await
        .unwrap_err();

    assert_eq!(failure.step, Step::Act);
    assert_eq!(failure.kind, "MissingElementError");
    assert_eq!(failure.reached, CaseState::Navigated);
    assert!(failure.message.contains("nav-blog"));
}

/// A page answering with an error status fails navigation
#[tokio::test]
async fn test_error_status_is_navigation_error() {
    let site = platform()
        .page("/en/pricing", SimPage::rooted(Tid::PricingRoot).status(500))
        .build();
    let case = CaseDescriptor::new("PAY-001", Role::Guest, Route::Pricing)
        .expect_visible(Tid::PricingRoot);

    let failure = run_case(&fixture(&site), Arc::new(case), Locale::En)
        .await
        .unwrap_err();

    assert_eq!(failure.step, Step::Navigate);
    assert_eq!(failure.kind, "NavigationError");
    assert_eq!(failure.reached, CaseState::Pending);
    assert!(failure.message.contains("HTTP not OK: 500"));
}

fn contact_page() -> SimPage {
    SimPage::rooted(Tid::ContactRoot)
        .element(Tid::ContactName)
        .element(Tid::ContactEmail)
        .reveals(Tid::ContactSubmit, Tid::ContactSuccess)
}

fn contact_case() -> CaseDescriptor {
    CaseDescriptor::new("CNT-001", Role::Guest, Route::Contact)
        .fill(Tid::ContactName, "Somchai")
        .fill(Tid::ContactEmail, "somchai@aip101.test")
        .fill(Tid::ContactMessage, "When does the next cohort start?")
        .click(Tid::ContactSubmit)
        .expect_visible(Tid::ContactSuccess)
}

/// Preparation steps run before the action; the action reveals the result
#[tokio::test]
async fn test_prepare_steps_then_action() {
    let site = platform()
        .page("/en/contact", contact_page().element(Tid::ContactMessage))
        .build();

    let run = run_case(&fixture(&site), Arc::new(contact_case()), Locale::En)
        .await
        .unwrap();

    assert_eq!(run.state, CaseState::Passed);
    assert_eq!(run.final_url, "http://sim.test/en/contact");
}

/// A missing preparation target fails the prepare step
#[tokio::test]
async fn test_missing_prepare_target() {
    let site = platform().page("/en/contact", contact_page()).build();

    let failure = run_case(&fixture(&site), Arc::new(contact_case()), Locale::En)
        .await
        .unwrap_err();

    assert_eq!(failure.step, Step::Prepare);
    assert_eq!(failure.kind, "MissingElementError");
    assert!(failure.message.contains("contact-message"));
}

/// Attribute expectations compare the exact value
#[tokio::test]
async fn test_attribute_expectation() {
    let case = Arc::new(
        CaseDescriptor::new("LMS-003", Role::Student, Route::Lesson("l1".into()))
            .expect_attribute(Tid::LessonOpenColab, "target", Some("_blank")),
    );

    let good = platform()
        .page(
            "/en/app/lesson/l1",
            SimPage::rooted(Tid::LessonRoot).attr(Tid::LessonOpenColab, "target", "_blank"),
        )
        .build();
    assert!(run_case(&fixture(&good), case.clone(), Locale::En).await.is_ok());

    let bad = platform()
        .page(
            "/en/app/lesson/l1",
            SimPage::rooted(Tid::LessonRoot).attr(Tid::LessonOpenColab, "target", "_self"),
        )
        .build();
    let failure = run_case(&fixture(&bad), case, Locale::En).await.unwrap_err();
    assert_eq!(failure.step, Step::Assert);
    assert_eq!(failure.kind, "AssertionFailure");
    assert!(failure.message.contains("target=\"_blank\""));
    assert!(failure.message.contains("found \"_self\""));
}

/// N links with one broken: exactly that one is reported, the rest pass
#[tokio::test]
async fn test_crawl_reports_only_the_broken_link() {
    let site = platform()
        .page(
            "/en/about",
            SimPage::rooted(Tid::AboutRoot)
                .anchor("/en")
                .anchor("/en/pricing")
                .anchor("/en/auth/sign-in")
                .anchor("/th/about")
                .anchor("/en/gone"),
        )
        .build();
    let fixture = fixture(&site);

    let mut session = fixture.open_anonymous(Locale::En).await.unwrap();
    session.goto_ok("/en/about").await.unwrap();
    let result = crawler::crawl(&mut session).await.unwrap();
    session.close().await.unwrap();

    assert_eq!(result.checked.len(), 5);
    assert_eq!(result.checked.iter().filter(|c| c.ok).count(), 4);
    let broken = result.broken();
    assert_eq!(broken.len(), 1);
    assert_eq!(broken[0].url, "http://sim.test/en/gone");
    assert_eq!(broken[0].status, Some(404));
    assert_eq!(result.cross_locale, vec!["http://sim.test/th/about".to_string()]);

    let err = result.into_result().unwrap_err();
    assert!(err.to_string().starts_with("1 broken link(s)"));
    assert_eq!(site.open_sessions(), 0);
}

/// A page error during a crawl fails the crawl instead of becoming a broken link
#[tokio::test]
async fn test_crawl_surfaces_late_page_error() {
    let site = platform()
        .page(
            "/en/about",
            SimPage::rooted(Tid::AboutRoot)
                .anchor("/en/pricing")
                .late_page_error("TypeError: cannot read properties of undefined"),
        )
        .build();
    let fixture = fixture(&site);

    let mut session = fixture.open_anonymous(Locale::En).await.unwrap();
    session.goto_ok("/en/about").await.unwrap();
    let err = crawler::crawl(&mut session).await.unwrap_err();
    session.close().await.unwrap();

    assert_eq!(err.kind(), "UncaughtPageError");
    assert!(err.to_string().contains("TypeError"));
    assert_eq!(site.open_sessions(), 0);
}
