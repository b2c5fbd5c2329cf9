//! Runner configuration

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{E2eError, E2eResult};
use crate::suite::DEFAULT_BASE_URL;
use crate::wait::WaitConfig;

/// Runner configuration, usually read from `e2e.toml`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Deployment under test
    pub base_url: String,

    /// Scenario directory; the built-in login suite is used when unset
    pub scenarios_dir: Option<PathBuf>,

    /// Directory for `test-results.json`
    pub output_dir: PathBuf,

    /// Scenarios run at once, each in its own session
    pub concurrency: usize,

    pub wait: WaitConfig,

    pub webdriver: WebDriverConfig,

    pub driver: DriverConfig,

    pub artifacts: ArtifactConfig,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            scenarios_dir: None,
            output_dir: PathBuf::from("test-results"),
            concurrency: 1,
            wait: WaitConfig::default(),
            webdriver: WebDriverConfig::default(),
            driver: DriverConfig::default(),
            artifacts: ArtifactConfig::default(),
        }
    }
}

/// Browser family
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Browser {
    #[default]
    Chrome,
    Firefox,
}

impl Browser {
    pub fn as_str(&self) -> &'static str {
        match self {
            Browser::Chrome => "chrome",
            Browser::Firefox => "firefox",
        }
    }

    /// WebDriver binary that serves this browser
    pub fn driver_binary(&self) -> &'static str {
        match self {
            Browser::Chrome => "chromedriver",
            Browser::Firefox => "geckodriver",
        }
    }
}

/// Window state right after the session starts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowMode {
    #[default]
    Maximized,
    Size { width: u32, height: u32 },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebDriverConfig {
    /// Existing WebDriver endpoint; a local driver is spawned when unset
    pub url: Option<String>,

    pub browser: Browser,

    pub headless: bool,

    pub window: WindowMode,

    /// Extra browser arguments
    pub args: Vec<String>,
}

impl Default for WebDriverConfig {
    fn default() -> Self {
        Self {
            url: None,
            browser: Browser::Chrome,
            headless: false,
            window: WindowMode::Maximized,
            args: Vec::new(),
        }
    }
}

/// Local WebDriver process settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    /// Driver binary; derived from the browser when unset
    pub binary_path: Option<PathBuf>,

    /// Port to listen on (None = find free port)
    pub port: Option<u16>,

    pub startup_timeout_ms: u64,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            binary_path: None,
            port: None,
            startup_timeout_ms: 30_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactConfig {
    /// Where screenshots land
    pub screenshot_dir: PathBuf,
}

impl Default for ArtifactConfig {
    fn default() -> Self {
        Self {
            screenshot_dir: PathBuf::from("."),
        }
    }
}

impl RunnerConfig {
    /// Load configuration from file, defaults when the file is missing
    pub fn load(path: &Path) -> E2eResult<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self = toml::from_str(&content)?;
            config.validate()?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> E2eResult<()> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(E2eError::InvalidConfig(format!(
                "base_url must be an http(s) URL, got {:?}",
                self.base_url
            )));
        }
        if self.concurrency == 0 {
            return Err(E2eError::InvalidConfig("concurrency must be at least 1".to_string()));
        }
        if let WindowMode::Size { width, height } = self.webdriver.window {
            if width == 0 || height == 0 {
                return Err(E2eError::InvalidConfig("window size must be non-zero".to_string()));
            }
        }
        Ok(())
    }
}
