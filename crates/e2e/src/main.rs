//! Login scenario runner
//!
//! Runs the built-in login suite (or a directory of YAML scenarios) against
//! the hosted deployment through WebDriver.
//! Run with: cargo run --package mindfulnes-e2e -- --headless

use std::future::Future;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use mindfulnes_e2e::config::{Browser, RunnerConfig};
use mindfulnes_e2e::suite::{extended_login_suite, login_suite};
use mindfulnes_e2e::{E2eError, E2eResult, Scenario, ScenarioRunner, WebDriverLauncher};

#[derive(Parser, Debug)]
#[command(name = "login-e2e")]
#[command(about = "Browser login scenarios for Mindfulnes")]
#[command(version)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "e2e.toml", env = "E2E_CONFIG")]
    config: PathBuf,

    /// Directory of YAML scenarios instead of the built-in login suite
    #[arg(short, long)]
    scenarios: Option<PathBuf>,

    /// Include the extended built-in scenarios
    #[arg(long)]
    extended: bool,

    /// Run only scenarios with this tag
    #[arg(short, long)]
    tag: Option<String>,

    /// Run only a specific scenario by name
    #[arg(short, long)]
    name: Option<String>,

    /// Deployment under test
    #[arg(long, env = "E2E_BASE_URL")]
    base_url: Option<String>,

    /// Existing WebDriver endpoint (spawns a local driver when omitted)
    #[arg(long, env = "E2E_WEBDRIVER_URL")]
    webdriver_url: Option<String>,

    /// Path to chromedriver/geckodriver
    #[arg(long)]
    driver_binary: Option<PathBuf>,

    /// Browser to use
    #[arg(long, value_enum)]
    browser: Option<Browser>,

    /// Run without a visible window
    #[arg(long)]
    headless: bool,

    /// Wait budget per condition, in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Directory for screenshots
    #[arg(long)]
    screenshots: Option<PathBuf>,

    /// Output directory for results
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Scenarios to run at once
    #[arg(long)]
    concurrency: Option<usize>,

    /// Log as JSON lines
    #[arg(long)]
    json_logs: bool,

    /// List the selected scenarios and exit
    #[arg(long)]
    list: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if args.json_logs {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer())
            .with(filter)
            .init();
    }

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Error: failed to create tokio runtime: {}", e);
            return ExitCode::from(2);
        }
    };

    let outcome = rt.block_on(async_main(args));
    if let Err(e) = &outcome {
        error!("{}", e);
    }
    ExitCode::from(exit_status(&outcome))
}

/// 0 when every scenario passed, 1 on scenario failures, 2 when the run itself failed
fn exit_status(outcome: &E2eResult<bool>) -> u8 {
    match outcome {
        Ok(true) => 0,
        Ok(false) => 1,
        Err(_) => 2,
    }
}

/// File config, then flags and environment on top
fn load_config(args: &Args) -> E2eResult<RunnerConfig> {
    let mut config = RunnerConfig::load(&args.config)?;
    apply_overrides(&mut config, args);
    config.validate()?;
    Ok(config)
}

fn apply_overrides(config: &mut RunnerConfig, args: &Args) {
    if let Some(url) = &args.base_url {
        config.base_url = url.clone();
    }
    if let Some(dir) = &args.scenarios {
        config.scenarios_dir = Some(dir.clone());
    }
    if let Some(url) = &args.webdriver_url {
        config.webdriver.url = Some(url.clone());
    }
    if let Some(binary) = &args.driver_binary {
        config.driver.binary_path = Some(binary.clone());
    }
    if let Some(browser) = args.browser {
        config.webdriver.browser = browser;
    }
    if args.headless {
        config.webdriver.headless = true;
    }
    if let Some(ms) = args.timeout_ms {
        config.wait.timeout_ms = ms;
    }
    if let Some(dir) = &args.screenshots {
        config.artifacts.screenshot_dir = dir.clone();
    }
    if let Some(dir) = &args.output {
        config.output_dir = dir.clone();
    }
    if let Some(n) = args.concurrency {
        config.concurrency = n;
    }
}

/// Scenario directory if configured, else the built-in suite; then `--tag`/`--name`
fn load_scenarios(config: &RunnerConfig, args: &Args) -> E2eResult<Vec<Scenario>> {
    let scenarios = match &config.scenarios_dir {
        Some(dir) => Scenario::load_all(dir)?,
        None if args.extended => extended_login_suite()?,
        None => login_suite()?,
    };
    Ok(select(scenarios, args))
}

fn select(scenarios: Vec<Scenario>, args: &Args) -> Vec<Scenario> {
    scenarios
        .into_iter()
        .filter(|s| args.tag.as_ref().map_or(true, |tag| s.tags.contains(tag)))
        .filter(|s| args.name.as_ref().map_or(true, |name| &s.name == name))
        .collect()
}

async fn async_main(args: Args) -> E2eResult<bool> {
    let config = load_config(&args)?;
    let scenarios = load_scenarios(&config, &args)?;

    if args.list {
        for scenario in &scenarios {
            println!("{}\t{}", scenario.name, scenario.description);
        }
        return Ok(true);
    }

    if scenarios.is_empty() {
        info!("No scenarios selected");
        return Ok(true);
    }

    let launcher = WebDriverLauncher::start(&config.webdriver, &config.driver).await?;
    info!("Using WebDriver at {}", launcher.webdriver_url());

    let mut runner = ScenarioRunner::new(launcher, &config)?;

    let finished = interruptible(runner.run_scenarios(&scenarios), tokio::signal::ctrl_c()).await;
    let outcome = match finished {
        Ok(results) => runner.write_results(&results).map(|_| results.failed == 0),
        Err(E2eError::Interrupted) => {
            warn!("Interrupted, stopping WebDriver");
            Err(E2eError::Interrupted)
        }
        Err(e) => Err(e),
    };

    runner.launcher_mut().shutdown()?;
    outcome
}

/// Run `work` unless `interrupt` completes first
async fn interruptible<T, W, I>(work: W, interrupt: I) -> E2eResult<T>
where
    W: Future<Output = E2eResult<T>>,
    I: Future,
{
    tokio::select! {
        result = work => result,
        _ = interrupt => Err(E2eError::Interrupted),
    }
}
