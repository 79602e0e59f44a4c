//! Element contract registry
//!
//! Every interactive or landmark element the verification engine touches is
//! addressed by an opaque attribute value (rendered as `data-testid` by the
//! site). Each entry has a symbolic name used by case descriptors and a
//! canonical attribute value used in the markup. Both columns are globally
//! unique.
//!
//! Renaming an attribute value here without changing the markup breaks
//! discovery and assertions silently, so the table is the compatibility
//! surface between the two sides and is versioned with [`CONTRACT_VERSION`].

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::{Error, Result};

/// Version of the element contract table
pub const CONTRACT_VERSION: u32 = 2;

macro_rules! element_contract {
    ($( $variant:ident => $name:literal : $attr:literal, )*) => {
        /// A registered element of the site
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub enum Tid {
            $( $variant, )*
        }

        impl Tid {
            /// Every registered element, in table order
            pub const ALL: &'static [Tid] = &[ $( Tid::$variant, )* ];

            /// Symbolic name used by case descriptors
            pub fn name(&self) -> &'static str {
                match self {
                    $( Tid::$variant => $name, )*
                }
            }

            /// Canonical attribute value rendered by the site
            pub fn attr(&self) -> &'static str {
                match self {
                    $( Tid::$variant => $attr, )*
                }
            }

            /// Look an entry up by symbolic name
            pub fn from_name(name: &str) -> Result<Tid> {
                match name {
                    $( $name => Ok(Tid::$variant), )*
                    other => Err(Error::UnknownElement(other.to_string())),
                }
            }

            /// Look an entry up by attribute value
            pub fn from_attr(attr: &str) -> Option<Tid> {
                match attr {
                    $( $attr => Some(Tid::$variant), )*
                    _ => None,
                }
            }
        }
    };
}

element_contract! {
    // Page roots
    HomeRoot => "home-root": "home-root",
    CurriculumRoot => "curriculum-root": "curriculum-root",
    TracksRoot => "tracks-root": "tracks-root",
    PricingRoot => "pricing-root": "pricing-root",
    CheckoutRoot => "checkout-root": "checkout-root",
    BlogRoot => "blog-root": "blog-root",
    BlogDetailRoot => "blog-detail-root": "blog-detail-root",
    AboutRoot => "about-root": "about-root",
    ContactRoot => "contact-root": "contact-root",
    AuthRoot => "auth-root": "auth-root",
    DashboardRoot => "dashboard-root": "dashboard-root",
    CourseRoot => "course-root": "course-root",
    LessonRoot => "lesson-root": "lesson-root",
    WorkshopRoot => "workshop-root": "workshop-root",
    QuizRoot => "quiz-root": "quiz-root",
    CapstoneRoot => "capstone-root": "capstone-root",
    CertificatesRoot => "certificates-root": "certificates-root",
    ProfileRoot => "profile-root": "profile-root",
    ForbiddenRoot => "forbidden-root": "forbidden-root",
    NotFoundRoot => "not-found-root": "notfound-root",
    I18nReady => "i18n-ready": "i18n-ready",

    // Navbar
    NavHome => "nav-home": "nav-home",
    NavCurriculum => "nav-curriculum": "nav-curriculum",
    NavTracks => "nav-tracks": "nav-tracks",
    NavPricing => "nav-pricing": "nav-pricing",
    NavBlog => "nav-blog": "nav-blog",
    NavAbout => "nav-about": "nav-about",
    NavContact => "nav-contact": "nav-contact",
    NavLogin => "nav-login": "nav-login",
    NavDashboard => "nav-dashboard": "nav-dashboard",
    NavLangSwitch => "nav-lang-switch": "nav-lang-switch",

    // Home
    HeroCtaEnroll => "hero-cta-enroll": "hero-cta-enroll",
    HeroCtaCurriculum => "hero-cta-curriculum": "hero-cta-curriculum",
    HomeDemoOpen => "home-demo-open": "home-demo-open",

    // Curriculum
    RoadmapWeek1 => "roadmap-week-1": "roadmap-week-1",
    RoadmapWeek12 => "roadmap-week-12": "roadmap-week-12",
    WeekDetail => "week-detail": "week-detail",

    // Tracks
    TrackChatbot => "track-chatbot": "track-chatbot",
    TrackVision => "track-vision": "track-vision",
    TrackAnalytics => "track-analytics": "track-analytics",
    TrackIot => "track-iot": "track-iot",
    TrackDetailRoot => "track-detail-root": "track-detail-root",
    TrackCtaEnroll => "track-cta-enroll": "track-cta-enroll",

    // Blog
    BlogCard0 => "blog-card-0": "blog-card-0",
    BreadcrumbBlog => "breadcrumb-blog": "breadcrumb-blog",

    // Contact form
    ContactName => "contact-name": "contact-name",
    ContactEmail => "contact-email": "contact-email",
    ContactMessage => "contact-message": "contact-message",
    ContactSubmit => "contact-submit": "contact-submit",
    ContactSuccess => "contact-success": "contact-success",
    FormError => "form-error": "form-error",

    // Pricing and checkout
    PlanStandard => "plan-standard": "pricing-plan-standard",
    PlanPro => "plan-pro": "pricing-plan-pro",
    PlanSelected => "plan-selected": "plan-selected",
    PricingCtaCheckout => "pricing-cta-checkout": "pricing-cta-checkout",
    CheckoutPayNow => "checkout-pay-now": "checkout-pay-now",
    PurchaseSuccess => "purchase-success": "purchase-success",
    PurchaseFailed => "purchase-failed": "purchase-failed",

    // Auth
    AuthEmail => "auth-email": "auth-email",
    AuthPassword => "auth-password": "auth-password",
    AuthSubmit => "auth-submit": "auth-submit",
    AuthError => "auth-error": "auth-error",
    AuthLogout => "auth-logout": "auth-logout",

    // Dashboard
    DashboardContinue => "dashboard-continue": "dash-continue",
    AnnouncementItem0 => "announcement-item-0": "announcement-item-0",

    // Course
    CourseTrackPicker => "course-track-picker": "course-track-picker",
    TrackSelectedBadge => "track-selected-badge": "track-selected-badge",
    WorkshopCard0 => "workshop-card-0": "workshop-card-0",
    QuizCard0 => "quiz-card-0": "quiz-card-0",

    // Lesson
    LessonOpenColab => "lesson-open-colab": "lesson-open-colab",
    LessonCopyCode => "lesson-copy-code": "lesson-copy-code",
    ToastCopied => "toast-copied": "toast-copied",
    LessonMarkComplete => "lesson-mark-complete": "lesson-mark-complete",
    LessonCompleteBadge => "lesson-complete-badge": "lesson-complete-badge",
    LessonPrev => "lesson-prev": "lesson-prev",
    LessonNext => "lesson-next": "lesson-next",
    LessonToWorkshop => "lesson-to-workshop": "lesson-to-workshop",
    LessonToQuiz => "lesson-to-quiz": "lesson-to-quiz",

    // Workshop
    WorkshopSubmit => "workshop-submit": "workshop-submit",
    WorkshopGithubLink => "workshop-github-link": "workshop-github-link",
    SubmissionStatusSubmitted => "submission-status-submitted": "submission-status-submitted",

    // Quiz
    QuizStart => "quiz-start": "quiz-start",
    QuizQuestion1 => "quiz-question-1": "quiz-question-1",
    QuizSubmit => "quiz-submit": "quiz-submit",
    QuizScore => "quiz-score": "quiz-score",
    QuizExplanations => "quiz-explanations": "quiz-explanations",

    // Capstone
    CapstoneDemoLink => "capstone-demo-link": "capstone-demo-link",
    CapstoneSubmit => "capstone-submit": "capstone-submit",
    CapstoneStatusSubmitted => "capstone-status-submitted": "capstone-status-submitted",

    // Certificates
    CertificateDownload => "certificate-download": "certificate-download",

    // Profile
    ProfileSave => "profile-save": "profile-save",
    ProfileSaved => "profile-saved": "profile-saved",

    // Admin
    AdminSubmissionsButton => "admin-submissions-button": "admin-submissions",
    AdminSubmissionsRoot => "admin-submissions-root": "admin-submissions-root",
    AdminGrade => "admin-grade": "admin-grade",
    GradeSaved => "grade-saved": "grade-saved",
    AdminPublish => "admin-publish": "admin-publish",
    PublishSuccess => "publish-success": "publish-success",
    AdminAnnounceMessage => "admin-announce-message": "admin-announce-message",
    AdminAnnounceSend => "admin-announce-send": "admin-announce-send",
    AnnounceSent => "announce-sent": "announce-sent",
}

impl std::fmt::Display for Tid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Tid {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Tid::from_name(s.trim())
    }
}

impl TryFrom<String> for Tid {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Tid> for String {
    fn from(tid: Tid) -> Self {
        tid.name().to_string()
    }
}
