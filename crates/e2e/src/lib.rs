//! AI Project 101 E2E verification engine
//!
//! This crate drives a real browser through the bilingual (th/en) learning
//! platform and checks it against declarative case descriptors:
//! - Resolves every locale-aware URL through the shared route table
//! - Addresses elements only through the element contract registry
//! - Discovers progress-dependent lesson/workshop/quiz URLs via UI affordances
//! - Guards every session against page errors, console errors and
//!   translation leaks, and crawls same-origin links on quality pages
//! - Runs the (case × locale) matrix in isolated sessions across worker lanes
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   E2E Suite Runner (Rust)                   │
//! ├─────────────────────────────────────────────────────────────┤
//! │  SuiteRunner                                                │
//! │    ├── matrix(cases, locales) -> [Combination]              │
//! │    ├── run_combination(c) -> CombinationResult              │
//! │    │     └── executor::run_case(fixture, case, locale)      │
//! │    │           ├── SessionFixture::with_session(role, loc)  │
//! │    │           ├── discovery::discover(kind)   (dynamic)    │
//! │    │           ├── Session::goto_ok / click / fill          │
//! │    │           ├── crawler::crawl              (quality)    │
//! │    │           └── LeakDetector::check                      │
//! │    └── SuiteReport -> test-results.json                     │
//! ├─────────────────────────────────────────────────────────────┤
//! │  PageDriver (trait)                                         │
//! │    ├── PlaywrightDriver  node bridge, JSON lines            │
//! │    └── SimDriver         in-memory site (test-support)      │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod case;
pub mod catalog;
pub mod config;
pub mod crawler;
pub mod discovery;
pub mod driver;
pub mod error;
pub mod executor;
pub mod leak;
pub mod playwright;
pub mod runner;
pub mod server;
pub mod session;
#[cfg(feature = "test-support")]
pub mod sim;

pub use case::{CaseDescriptor, PageTarget, UrlExpectation};
pub use config::SuiteConfig;
pub use error::{E2eError, E2eResult};
pub use runner::{SuiteReport, SuiteRunner};
pub use session::{Session, SessionFixture, SessionSettings};
