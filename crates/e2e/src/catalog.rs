//! Built-in case catalog for the AI Project 101 site

use aip101_common::{ResourceKind, Role, Route, Tid};

use crate::case::{CaseDescriptor, PageTarget, UrlExpectation};

fn guest(id: &str, route: Route) -> CaseDescriptor {
    CaseDescriptor::new(id, Role::Guest, route)
}

fn student(id: &str, page: impl Into<PageTarget>) -> CaseDescriptor {
    CaseDescriptor::new(id, Role::Student, page)
}

fn admin(id: &str, route: Route) -> CaseDescriptor {
    CaseDescriptor::new(id, Role::Admin, route)
}

fn dynamic(kind: ResourceKind) -> PageTarget {
    PageTarget::Dynamic { dynamic: kind }
}

pub fn public_cases() -> Vec<CaseDescriptor> {
    let nav = [
        ("PUB-001", Tid::NavCurriculum, Route::Curriculum, Tid::CurriculumRoot),
        ("PUB-002", Tid::NavTracks, Route::Tracks, Tid::TracksRoot),
        ("PUB-003", Tid::NavPricing, Route::Pricing, Tid::PricingRoot),
        ("PUB-004", Tid::NavBlog, Route::Blog, Tid::BlogRoot),
        ("PUB-005", Tid::NavAbout, Route::About, Tid::AboutRoot),
        ("PUB-006", Tid::NavContact, Route::Contact, Tid::ContactRoot),
    ];

    let mut cases = vec![guest("PUB-000", Route::Home)
        .titled("home renders")
        .expect_visible(Tid::HomeRoot)];

    for (id, link, route, root) in nav {
        cases.push(
            guest(id, Route::Home)
                .titled(&format!("nav to {}", route))
                .click(link)
                .expect_route(route)
                .expect_visible(root),
        );
    }

    cases.extend([
        guest("I18N-001", Route::Home)
            .titled("language switch")
            .click(Tid::NavLangSwitch)
            .expect_url(UrlExpectation::OtherLocaleHome)
            .expect_visible(Tid::I18nReady)
            .tagged("i18n"),
        guest("PUB-007", Route::Home)
            .titled("hero cta to curriculum")
            .click(Tid::HeroCtaCurriculum)
            .expect_route(Route::Curriculum)
            .expect_visible(Tid::CurriculumRoot),
        guest("PUB-008", Route::Home)
            .titled("hero cta to pricing")
            .click(Tid::HeroCtaEnroll)
            .expect_route(Route::Pricing),
        guest("PUB-009", Route::Home)
            .titled("open demo")
            .click(Tid::HomeDemoOpen)
            .expect_visible(Tid::HomeRoot),
    ]);

    cases.into_iter().map(|c| c.tagged("public")).collect()
}

pub fn curriculum_cases() -> Vec<CaseDescriptor> {
    let weeks = [("CUR-001", Tid::RoadmapWeek1), ("CUR-002", Tid::RoadmapWeek12)];
    weeks
        .into_iter()
        .map(|(id, week)| {
            guest(id, Route::Curriculum)
                .titled(&format!("open {}", week))
                .click(week)
                .expect_visible(Tid::WeekDetail)
                .tagged("public")
                .tagged("curriculum")
        })
        .collect()
}

pub fn track_cases() -> Vec<CaseDescriptor> {
    let tracks = [
        ("TRK-001", Tid::TrackChatbot),
        ("TRK-002", Tid::TrackVision),
        ("TRK-003", Tid::TrackAnalytics),
        ("TRK-004", Tid::TrackIot),
    ];
    let mut cases: Vec<_> = tracks
        .into_iter()
        .map(|(id, track)| {
            guest(id, Route::Tracks)
                .titled(&format!("open {}", track))
                .click(track)
                .expect_visible(Tid::TrackDetailRoot)
        })
        .collect();
    cases.push(
        guest("TRK-005", Route::Tracks)
            .titled("track cta to pricing")
            .click(Tid::TrackCtaEnroll)
            .expect_route(Route::Pricing),
    );
    cases.into_iter().map(|c| c.tagged("public").tagged("tracks")).collect()
}

pub fn blog_cases() -> Vec<CaseDescriptor> {
    vec![
        guest("BLOG-001", Route::Blog)
            .titled("open first post")
            .click(Tid::BlogCard0)
            .expect_visible(Tid::BlogDetailRoot),
        guest("BLOG-002", Route::Blog)
            .titled("breadcrumb back to blog")
            .prepare_click(Tid::BlogCard0)
            .click(Tid::BreadcrumbBlog)
            .expect_route(Route::Blog)
            .expect_visible(Tid::BlogRoot),
    ]
    .into_iter()
    .map(|c| c.tagged("public").tagged("blog"))
    .collect()
}

pub fn contact_cases() -> Vec<CaseDescriptor> {
    vec![
        guest("CNT-001", Route::Contact)
            .titled("valid contact form")
            .fill(Tid::ContactName, "Test User")
            .fill(Tid::ContactEmail, "test@example.com")
            .fill(Tid::ContactMessage, "Hello, I want to know more about AI Project 101.")
            .click(Tid::ContactSubmit)
            .expect_visible(Tid::ContactSuccess),
        guest("CNT-002", Route::Contact)
            .titled("empty contact form shows error")
            .click(Tid::ContactSubmit)
            .expect_visible(Tid::FormError),
    ]
    .into_iter()
    .map(|c| c.tagged("public").tagged("contact"))
    .collect()
}

pub fn pricing_cases() -> Vec<CaseDescriptor> {
    vec![
        guest("PAY-001", Route::Pricing)
            .titled("select standard plan")
            .click(Tid::PlanStandard)
            .expect_visible(Tid::PlanSelected),
        guest("PAY-002", Route::Pricing)
            .titled("select pro plan")
            .click(Tid::PlanPro)
            .expect_visible(Tid::PlanSelected),
        guest("PAY-003", Route::Pricing)
            .titled("pricing to checkout")
            .click(Tid::PricingCtaCheckout)
            .expect_route(Route::Checkout)
            .expect_visible(Tid::CheckoutRoot),
        guest("PAY-004", Route::Checkout)
            .titled("mock checkout succeeds")
            .click(Tid::CheckoutPayNow)
            .expect_route(Route::ThankYou)
            .expect_visible(Tid::PurchaseSuccess)
            .payment_mock_only(),
        CaseDescriptor::new(
            "PAY-005",
            Role::Guest,
            PageTarget::Route {
                route: Route::Checkout,
                query: Some("forceFail=1".into()),
            },
        )
        .titled("mock checkout fails")
        .click(Tid::CheckoutPayNow)
        .expect_visible(Tid::PurchaseFailed)
        .payment_mock_only(),
    ]
    .into_iter()
    .map(|c| c.tagged("payment"))
    .collect()
}

pub fn auth_cases() -> Vec<CaseDescriptor> {
    vec![
        guest("AUTH-001", Route::Home)
            .titled("nav to sign-in")
            .click(Tid::NavLogin)
            .expect_route(Route::SignIn)
            .expect_visible(Tid::AuthRoot),
        student("AUTH-002", Route::Dashboard)
            .titled("student login lands on dashboard")
            .expect_route(Route::Dashboard)
            .expect_visible(Tid::DashboardRoot),
        guest("AUTH-003", Route::SignIn)
            .titled("invalid login shows error")
            .fill(Tid::AuthEmail, "wrong@example.com")
            .fill(Tid::AuthPassword, "wrongpass")
            .click(Tid::AuthSubmit)
            .expect_visible(Tid::AuthError),
        student("AUTH-004", Route::Dashboard)
            .titled("dashboard redirects anonymous visitors")
            .anonymous()
            .expect_route(Route::SignIn)
            .expect_visible(Tid::AuthRoot),
        student("AUTH-005", Route::Admin)
            .titled("students cannot open admin")
            .expect_visible(Tid::ForbiddenRoot),
        student("AUTH-006", Route::Dashboard)
            .titled("logout")
            .click(Tid::AuthLogout)
            .expect_route(Route::Home),
    ]
    .into_iter()
    .map(|c| c.tagged("auth"))
    .collect()
}

pub fn lms_cases() -> Vec<CaseDescriptor> {
    let lesson = || dynamic(ResourceKind::Lesson);
    let workshop = || dynamic(ResourceKind::Workshop);
    let quiz = || dynamic(ResourceKind::Quiz);

    vec![
        student("LMS-001", Route::Dashboard)
            .titled("dashboard continue opens a lesson")
            .click(Tid::DashboardContinue)
            .expect_url(UrlExpectation::Resource(ResourceKind::Lesson)),
        student("LMS-002", Route::Course)
            .titled("track picker")
            .click(Tid::CourseTrackPicker)
            .expect_visible(Tid::TrackSelectedBadge),
        student("LMS-003", lesson())
            .titled("colab link opens in a new tab")
            .expect_visible(Tid::LessonOpenColab)
            .expect_attribute(Tid::LessonOpenColab, "target", Some("_blank")),
        student("LMS-004", lesson())
            .titled("copy code shows toast")
            .click(Tid::LessonCopyCode)
            .expect_visible(Tid::ToastCopied),
        student("LMS-005", lesson())
            .titled("mark lesson complete")
            .click(Tid::LessonMarkComplete)
            .expect_visible(Tid::LessonCompleteBadge),
        student("LMS-006", lesson())
            .titled("previous lesson")
            .click(Tid::LessonPrev)
            .expect_url(UrlExpectation::Resource(ResourceKind::Lesson)),
        student("LMS-007", lesson())
            .titled("next lesson")
            .click(Tid::LessonNext)
            .expect_url(UrlExpectation::Resource(ResourceKind::Lesson)),
        student("LMS-008", workshop())
            .titled("workshop submit")
            .fill(Tid::WorkshopGithubLink, "https://github.com/example/repo")
            .click(Tid::WorkshopSubmit)
            .expect_visible(Tid::SubmissionStatusSubmitted),
        student("LMS-009", workshop())
            .titled("empty workshop submit shows error")
            .click(Tid::WorkshopSubmit)
            .expect_visible(Tid::FormError),
        student("LMS-010", quiz())
            .titled("quiz start")
            .click(Tid::QuizStart)
            .expect_visible(Tid::QuizQuestion1),
        student("LMS-011", quiz())
            .titled("quiz submit shows score")
            .prepare_click(Tid::QuizStart)
            .click(Tid::QuizSubmit)
            .expect_visible(Tid::QuizScore),
        student("LMS-012", Route::Capstone)
            .titled("capstone submit")
            .fill(Tid::CapstoneDemoLink, "https://example.com/demo")
            .click(Tid::CapstoneSubmit)
            .expect_visible(Tid::CapstoneStatusSubmitted),
        student("LMS-013", Route::Certificates)
            .titled("certificate download")
            .click(Tid::CertificateDownload)
            .expect_visible(Tid::CertificatesRoot),
        student("LMS-014", Route::Profile)
            .titled("profile save")
            .click(Tid::ProfileSave)
            .expect_visible(Tid::ProfileSaved),
    ]
    .into_iter()
    .map(|c| c.tagged("lms"))
    .collect()
}

pub fn admin_cases() -> Vec<CaseDescriptor> {
    vec![
        admin("ADM-001", Route::Admin)
            .titled("open submissions queue")
            .click(Tid::AdminSubmissionsButton)
            .expect_route(Route::AdminSubmissions)
            .expect_visible(Tid::AdminSubmissionsRoot),
        admin("ADM-002", Route::AdminSubmissions)
            .titled("grade submission")
            .click(Tid::AdminGrade)
            .expect_visible(Tid::GradeSaved),
        admin("ADM-003", Route::AdminLessons)
            .titled("publish lesson")
            .click(Tid::AdminPublish)
            .expect_visible(Tid::PublishSuccess),
        admin("ADM-004", Route::AdminAnnouncements)
            .titled("send announcement")
            .fill(Tid::AdminAnnounceMessage, "New content released!")
            .click(Tid::AdminAnnounceSend)
            .expect_visible(Tid::AnnounceSent),
    ]
    .into_iter()
    .map(|c| c.tagged("admin"))
    .collect()
}

/// Pages whose links are crawled on every run
pub const QUALITY_PAGES: &[(Route, Tid)] = &[
    (Route::Home, Tid::HomeRoot),
    (Route::Curriculum, Tid::CurriculumRoot),
    (Route::Tracks, Tid::TracksRoot),
    (Route::Pricing, Tid::PricingRoot),
    (Route::Blog, Tid::BlogRoot),
    (Route::About, Tid::AboutRoot),
    (Route::Contact, Tid::ContactRoot),
];

pub fn quality_cases() -> Vec<CaseDescriptor> {
    let mut cases: Vec<_> = QUALITY_PAGES
        .iter()
        .map(|(route, root)| {
            guest(&format!("QA-001-{}", route.name()), route.clone())
                .titled(&format!("links on {}", route))
                .quality()
                .expect_visible(*root)
        })
        .collect();

    cases.extend([
        student("QA-001b-dashboard", Route::Dashboard)
            .titled("links on dashboard")
            .quality()
            .expect_visible(Tid::DashboardRoot),
        student("QA-001b-course", Route::Course)
            .titled("links on course")
            .quality()
            .expect_visible(Tid::CourseRoot),
        CaseDescriptor::new(
            "QA-003",
            Role::Guest,
            PageTarget::Path {
                path: "this-page-should-not-exist".into(),
                query: None,
            },
        )
        .titled("not-found page")
        .expect_visible(Tid::NotFoundRoot),
        guest("QA-004", Route::Home)
            .titled("no missing i18n keys on home")
            .expect_visible(Tid::HomeRoot)
            .tagged("i18n"),
    ]);

    cases.into_iter().map(|c| c.tagged("quality")).collect()
}

/// Every built-in case, in catalog order
pub fn all_cases() -> Vec<CaseDescriptor> {
    let mut cases = Vec::new();
    cases.extend(public_cases());
    cases.extend(curriculum_cases());
    cases.extend(track_cases());
    cases.extend(blog_cases());
    cases.extend(contact_cases());
    cases.extend(pricing_cases());
    cases.extend(auth_cases());
    cases.extend(lms_cases());
    cases.extend(admin_cases());
    cases.extend(quality_cases());
    cases
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::case::validate_suite;

    #[test]
    fn test_catalog_is_valid() {
        let cases = all_cases();
        validate_suite(&cases).unwrap();
        assert!(cases.len() > 50);
    }

    #[test]
    fn test_payment_cases_are_gated() {
        let gated: Vec<_> = all_cases()
            .into_iter()
            .filter(|c| c.requires_payment_mock)
            .map(|c| c.id)
            .collect();
        assert_eq!(gated, vec!["PAY-004", "PAY-005"]);
    }

    #[test]
    fn test_guest_redirect_case_never_logs_in() {
        let case = all_cases().into_iter().find(|c| c.id == "AUTH-004").unwrap();
        assert_eq!(case.role, Role::Student);
        assert!(!case.logs_in());
    }

    #[test]
    fn test_quality_cases_cover_public_pages() {
        let crawled = all_cases().into_iter().filter(|c| c.quality).count();
        assert_eq!(crawled, QUALITY_PAGES.len() + 2);
    }
}
