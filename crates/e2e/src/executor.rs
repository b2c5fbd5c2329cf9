//! Scenario body execution
//!
//! Runs one [`Scenario`] against a session in the fixed order
//! setup, navigate, ready, fill, act, wait, assert. Every step is timed and
//! recorded; the first failing step ends the body.

use std::future::Future;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{E2eError, E2eResult};
use crate::scenario::{Expectation, Scenario, SetupStep, CLEAR_STORAGE_SCRIPT};
use crate::session::BrowserSession;
use crate::wait::{wait_until, wait_until_true, WaitConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Setup,
    Navigate,
    Ready,
    Fill,
    Act,
    Wait,
    Assert,
    Capture,
}

/// Result of executing one step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepResult {
    pub phase: Phase,
    pub step_name: String,
    pub success: bool,
    pub duration_ms: u64,
    pub error: Option<String>,
}

/// Time `fut`, append its [`StepResult`] and pass its result through
pub async fn record<T, Fut>(steps: &mut Vec<StepResult>, phase: Phase, step_name: String, fut: Fut) -> E2eResult<T>
where
    Fut: Future<Output = E2eResult<T>>,
{
    debug!("Executing step: {}", step_name);
    let start = Instant::now();
    let result = fut.await;

    steps.push(StepResult {
        phase,
        step_name,
        success: result.is_ok(),
        duration_ms: start.elapsed().as_millis() as u64,
        error: result.as_ref().err().map(|e| e.to_string()),
    });

    result
}

/// Fail with a descriptive comparison unless `actual` contains `expected`
pub fn ensure_contains(subject: &str, expected: &str, actual: &str) -> E2eResult<()> {
    if actual.contains(expected) {
        Ok(())
    } else {
        Err(E2eError::AssertionFailed {
            subject: subject.to_string(),
            expected: expected.to_string(),
            actual: actual.to_string(),
        })
    }
}

/// Drives scenario bodies against one deployment
#[derive(Debug, Clone)]
pub struct ScenarioExecutor {
    base_url: String,
    wait: WaitConfig,
}

impl ScenarioExecutor {
    pub fn new(base_url: impl Into<String>, wait: WaitConfig) -> Self {
        Self {
            base_url: base_url.into(),
            wait,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for a scenario path
    pub fn resolve_url(&self, url: &str) -> String {
        if url.starts_with("http://") || url.starts_with("https://") {
            return url.to_string();
        }
        let base = self.base_url.trim_end_matches('/');
        if url.starts_with('/') {
            format!("{}{}", base, url)
        } else {
            format!("{}/{}", base, url)
        }
    }

    /// Wait budget for a scenario, honouring its own `timeout_ms`
    pub fn wait_config(&self, scenario: &Scenario) -> WaitConfig {
        match scenario.timeout_ms {
            Some(ms) => self.wait.with_timeout_ms(ms),
            None => self.wait,
        }
    }

    /// Run the scenario body up to and including its assertion
    pub async fn execute(
        &self,
        session: &dyn BrowserSession,
        scenario: &Scenario,
        steps: &mut Vec<StepResult>,
    ) -> E2eResult<()> {
        let wait = self.wait_config(scenario);

        for step in &scenario.setup {
            match step {
                SetupStep::Visit { url } => {
                    let url = self.resolve_url(url);
                    record(steps, Phase::Setup, format!("visit:{}", url), session.goto(&url)).await?;
                }
                SetupStep::Execute { script } => {
                    record(steps, Phase::Setup, "execute".to_string(), session.execute(script)).await?;
                }
                SetupStep::ClearStorage => {
                    record(
                        steps,
                        Phase::Setup,
                        "clear_storage".to_string(),
                        session.execute(CLEAR_STORAGE_SCRIPT),
                    )
                    .await?;
                }
            }
        }

        let url = self.resolve_url(&scenario.url);
        record(steps, Phase::Navigate, format!("navigate:{}", url), session.goto(&url)).await?;

        if let Some(ready) = &scenario.ready {
            let what = format!("{} to be present", ready);
            record(
                steps,
                Phase::Ready,
                format!("ready:{}", ready),
                wait_until_true(&wait, &what, || session.is_present(ready)),
            )
            .await?;
        }

        for input in &scenario.inputs {
            record(
                steps,
                Phase::Fill,
                format!("fill:{}", input.locator),
                session.send_keys(&input.locator, &input.value),
            )
            .await?;
        }

        if let Some(action) = &scenario.action {
            record(steps, Phase::Act, format!("click:{}", action), session.click(action)).await?;
        }

        self.check_expectation(session, &scenario.expect, &wait, steps).await
    }

    async fn check_expectation(
        &self,
        session: &dyn BrowserSession,
        expect: &Expectation,
        wait: &WaitConfig,
        steps: &mut Vec<StepResult>,
    ) -> E2eResult<()> {
        let what = expect.describe();

        match expect {
            Expectation::UrlContains { value } => {
                record(
                    steps,
                    Phase::Wait,
                    format!("wait:{}", what),
                    wait_until(wait, &what, || async move {
                        let url = session.current_url().await?;
                        Ok(url.contains(value.as_str()).then_some(()))
                    }),
                )
                .await?;

                record(steps, Phase::Assert, format!("assert:url contains {}", value), async {
                    let url = session.current_url().await?;
                    ensure_contains("current url", value, &url)
                })
                .await
            }
            Expectation::TextContains { locator, value } => {
                record(
                    steps,
                    Phase::Wait,
                    format!("wait:{}", what),
                    wait_until_true(wait, &what, || session.is_present(locator)),
                )
                .await?;

                record(steps, Phase::Assert, format!("assert:text of {} contains {}", locator, value), async {
                    let text = session.text(locator).await?;
                    ensure_contains(&format!("text of {}", locator), value, &text)
                })
                .await
            }
            Expectation::ElementPresent { locator } => {
                record(
                    steps,
                    Phase::Wait,
                    format!("wait:{}", what),
                    wait_until_true(wait, &what, || session.is_present(locator)),
                )
                .await?;

                record(steps, Phase::Assert, format!("assert:{} present", locator), async {
                    if session.is_present(locator).await? {
                        Ok(())
                    } else {
                        Err(E2eError::ElementNotFound(locator.to_string()))
                    }
                })
                .await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn executor() -> ScenarioExecutor {
        ScenarioExecutor::new("https://app.example.com/", WaitConfig::default())
    }

    #[test_case("/login", "https://app.example.com/login" ; "absolute path")]
    #[test_case("home", "https://app.example.com/home" ; "relative path")]
    #[test_case("/", "https://app.example.com/" ; "root")]
    #[test_case("http://other.test/x", "http://other.test/x" ; "absolute url")]
    fn test_resolve_url(input: &str, expected: &str) {
        assert_eq!(executor().resolve_url(input), expected);
    }

    #[test]
    fn test_ensure_contains() {
        assert!(ensure_contains("current url", "/questions", "https://app/questions?x=1").is_ok());

        let err = ensure_contains("current url", "/questions", "https://app/login").unwrap_err();
        match err {
            E2eError::AssertionFailed { subject, expected, actual } => {
                assert_eq!(subject, "current url");
                assert_eq!(expected, "/questions");
                assert_eq!(actual, "https://app/login");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_scenario_timeout_overrides_budget() {
        let scenario = Scenario::from_yaml(
            "name: quick\nurl: /login\ntimeout_ms: 250\nexpect: { kind: url_contains, value: /login }\n",
        )
        .unwrap();
        assert_eq!(executor().wait_config(&scenario).timeout_ms, 250);
        assert_eq!(executor().wait_config(&scenario).poll_interval_ms, 500);
    }

    #[tokio::test]
    async fn test_record_keeps_failure_details() {
        let mut steps = Vec::new();
        let result: E2eResult<()> = record(&mut steps, Phase::Act, "click:class=submit-btn".into(), async {
            Err(E2eError::ElementNotFound("class=submit-btn".into()))
        })
        .await;

        assert!(result.is_err());
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].phase, Phase::Act);
        assert!(!steps[0].success);
        assert_eq!(steps[0].error.as_deref(), Some("Element not found: class=submit-btn"));
    }
}
