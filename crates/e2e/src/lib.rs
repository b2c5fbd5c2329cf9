//! Mindfulnes E2E Login Scenarios
//!
//! This crate drives a real browser through the login flow of the hosted
//! Mindfulnes web application:
//! - Describes each check as a declarative YAML scenario
//! - Runs every scenario in its own WebDriver session, closed on every path
//! - Waits on page conditions with a bounded polling combinator
//! - Captures one screenshot per scenario and writes JSON results
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  Scenario Runner (Rust)                     │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ScenarioRunner<L: SessionLauncher>                         │
//! │    ├── SessionFixture::run(body) -> launch / body / close   │
//! │    ├── ScenarioExecutor::execute(session, scenario)         │
//! │    ├── ArtifactStore::save_screenshot(file, png)            │
//! │    └── write_results(SuiteResult) -> test-results.json      │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Scenario (YAML)                                            │
//! │    ├── name, description, tags                              │
//! │    ├── setup: [visit | execute | clear_storage]             │
//! │    ├── url, ready?                                          │
//! │    ├── inputs: [{ locator, value }]                         │
//! │    ├── action?: locator                                     │
//! │    ├── expect: url_contains | text_contains | element_present│
//! │    └── capture: always | on_success | never                 │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod artifact;
pub mod config;
pub mod driver;
pub mod error;
pub mod executor;
pub mod fixture;
pub mod runner;
pub mod scenario;
pub mod session;
pub mod suite;
pub mod wait;
pub mod webdriver;

pub use config::RunnerConfig;
pub use error::{E2eError, E2eResult, FailureKind};
pub use runner::{ScenarioResult, ScenarioRunner, SuiteResult};
pub use scenario::{Expectation, Locator, Scenario};
pub use session::{BrowserSession, SessionLauncher};
pub use webdriver::WebDriverLauncher;
