//! Scenario runner: one scoped session per scenario, screenshots, results

use std::path::PathBuf;
use std::time::Instant;

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::artifact::{ArtifactStore, ScreenshotArtifact};
use crate::config::RunnerConfig;
use crate::error::{E2eError, E2eResult, FailureKind};
use crate::executor::{record, Phase, ScenarioExecutor, StepResult};
use crate::fixture::SessionFixture;
use crate::scenario::Scenario;
use crate::session::SessionLauncher;

/// Result of running a single scenario
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub name: String,
    pub success: bool,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub steps: Vec<StepResult>,
    pub screenshot: Option<ScreenshotArtifact>,
    pub failure: Option<FailureKind>,
    pub error: Option<String>,
}

/// Result of running a set of scenarios
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteResult {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub duration_ms: u64,
    pub results: Vec<ScenarioResult>,
}

/// Everything the body of one scenario produced inside its session
struct ScenarioRun {
    steps: Vec<StepResult>,
    screenshot: Option<ScreenshotArtifact>,
    outcome: E2eResult<()>,
}

/// Runs scenarios, each inside its own browser session
pub struct ScenarioRunner<L> {
    launcher: L,
    executor: ScenarioExecutor,
    artifacts: ArtifactStore,
    output_dir: PathBuf,
    concurrency: usize,
}

impl<L: SessionLauncher> ScenarioRunner<L> {
    pub fn new(launcher: L, config: &RunnerConfig) -> E2eResult<Self> {
        config.validate()?;

        Ok(Self {
            launcher,
            executor: ScenarioExecutor::new(config.base_url.clone(), config.wait),
            artifacts: ArtifactStore::new(&config.artifacts.screenshot_dir)?,
            output_dir: config.output_dir.clone(),
            concurrency: config.concurrency.max(1),
        })
    }

    pub fn launcher(&self) -> &L {
        &self.launcher
    }

    pub fn launcher_mut(&mut self) -> &mut L {
        &mut self.launcher
    }

    pub fn artifacts(&self) -> &ArtifactStore {
        &self.artifacts
    }

    /// Run scenarios carrying `tag`
    pub async fn run_tagged(&self, scenarios: &[Scenario], tag: &str) -> E2eResult<SuiteResult> {
        let filtered: Vec<Scenario> = Scenario::filter_by_tag(scenarios, tag)
            .into_iter()
            .cloned()
            .collect();
        self.run_scenarios(&filtered).await
    }

    /// Run the scenario called `name`
    pub async fn run_named(&self, scenarios: &[Scenario], name: &str) -> E2eResult<ScenarioResult> {
        Scenario::ensure_unique(scenarios)?;
        let scenario = scenarios
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| E2eError::ScenarioParse(format!("Scenario not found: {}", name)))?;

        Ok(self.run_one(scenario).await)
    }

    /// Run a list of scenarios; results keep the input order.
    ///
    /// Fails before opening any session if two scenarios share a name or a
    /// screenshot file.
    pub async fn run_scenarios(&self, scenarios: &[Scenario]) -> E2eResult<SuiteResult> {
        Scenario::ensure_unique(scenarios)?;
        let start = Instant::now();

        info!(
            "Running {} scenario(s) against {} ({} at a time)...",
            scenarios.len(),
            self.executor.base_url(),
            self.concurrency
        );

        let results: Vec<ScenarioResult> = stream::iter(scenarios)
            .map(|scenario| self.run_one(scenario))
            .buffered(self.concurrency)
            .collect()
            .await;

        let passed = results.iter().filter(|r| r.success).count();
        let failed = results.len() - passed;
        let duration_ms = start.elapsed().as_millis() as u64;

        info!("");
        info!("Scenario results: {} passed, {} failed ({} ms)", passed, failed, duration_ms);

        Ok(SuiteResult {
            total: scenarios.len(),
            passed,
            failed,
            duration_ms,
            results,
        })
    }

    /// Run a scenario and fold acquisition failures into a failed result
    async fn run_one(&self, scenario: &Scenario) -> ScenarioResult {
        let started_at = Utc::now();

        let result = match self.run_scenario(scenario).await {
            Ok(result) => result,
            Err(e) => ScenarioResult {
                name: scenario.name.clone(),
                success: false,
                started_at,
                duration_ms: 0,
                steps: vec![],
                screenshot: None,
                failure: Some(e.kind()),
                error: Some(e.to_string()),
            },
        };

        if result.success {
            info!("✓ {} ({} ms)", result.name, result.duration_ms);
        } else {
            error!("✗ {} - {}", result.name, result.error.as_deref().unwrap_or("unknown error"));
        }
        result
    }

    /// Run a single scenario inside a fresh session.
    ///
    /// `Err` means no session could be acquired and nothing ran.
    pub async fn run_scenario(&self, scenario: &Scenario) -> E2eResult<ScenarioResult> {
        let started_at = Utc::now();
        let start = Instant::now();
        debug!("Running scenario: {}", scenario.name);

        let executor = self.executor.clone();
        let artifacts = self.artifacts.clone();
        let owned = scenario.clone();

        let outcome = SessionFixture::new(&self.launcher)
            .run(move |session| {
                Box::pin(async move {
                    let mut steps = Vec::new();
                    let mut outcome = executor.execute(session, &owned, &mut steps).await;

                    let mut screenshot = None;
                    if owned.capture.applies(outcome.is_ok()) {
                        let file = owned.screenshot_file();
                        let captured = record(&mut steps, Phase::Capture, format!("screenshot:{}", file), async {
                            let png = session.screenshot().await?;
                            artifacts.save_screenshot(&file, &png)
                        })
                        .await;

                        // A capture failure only fails a scenario that passed so far.
                        match captured {
                            Ok(artifact) => screenshot = Some(artifact),
                            Err(e) if outcome.is_ok() => outcome = Err(e),
                            Err(e) => warn!("Screenshot for '{}' failed: {}", owned.name, e),
                        }
                    }

                    Ok(ScenarioRun { steps, screenshot, outcome })
                })
            })
            .await?;

        let (steps, screenshot, mut error) = match outcome.body {
            Ok(run) => (run.steps, run.screenshot, run.outcome.err()),
            Err(e) => (vec![], None, Some(e)),
        };

        if let Err(teardown) = outcome.teardown {
            match &error {
                None => error = Some(teardown),
                Some(first) => warn!("'{}' also failed teardown after: {}", scenario.name, first),
            }
        }

        Ok(ScenarioResult {
            name: scenario.name.clone(),
            success: error.is_none(),
            started_at,
            duration_ms: start.elapsed().as_millis() as u64,
            steps,
            screenshot,
            failure: error.as_ref().map(|e| e.kind()),
            error: error.map(|e| e.to_string()),
        })
    }

    /// Write results to `<output_dir>/test-results.json`
    pub fn write_results(&self, results: &SuiteResult) -> E2eResult<PathBuf> {
        std::fs::create_dir_all(&self.output_dir)?;

        let path = self.output_dir.join("test-results.json");
        let json = serde_json::to_string_pretty(results)?;
        std::fs::write(&path, json)?;

        info!("Results written to: {}", path.display());
        Ok(path)
    }
}
