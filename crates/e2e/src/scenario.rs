//! Declarative browser scenarios
//!
//! A scenario is one linear login-flow check: optional setup, navigation,
//! text entry, a single action, then one expectation on the resulting page.

use std::collections::HashSet;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{E2eError, E2eResult};

/// How to find an element on the page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Locator {
    /// CSS selector
    Css(String),
    /// Single class name, matched as `.name`
    Class(String),
    /// Element id
    Id(String),
    #[serde(rename = "xpath")]
    XPath(String),
}

impl Locator {
    pub fn css(selector: impl Into<String>) -> Self {
        Locator::Css(selector.into())
    }

    pub fn class(name: impl Into<String>) -> Self {
        Locator::Class(name.into())
    }

    /// CSS form of the locator, `None` for XPath
    pub fn to_css(&self) -> Option<String> {
        match self {
            Locator::Css(selector) => Some(selector.clone()),
            Locator::Class(name) => Some(format!(".{}", name)),
            Locator::Id(id) => Some(format!("#{}", id)),
            Locator::XPath(_) => None,
        }
    }

    fn value(&self) -> &str {
        match self {
            Locator::Css(v) | Locator::Class(v) | Locator::Id(v) | Locator::XPath(v) => v,
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Css(v) => write!(f, "css={}", v),
            Locator::Class(v) => write!(f, "class={}", v),
            Locator::Id(v) => write!(f, "id={}", v),
            Locator::XPath(v) => write!(f, "xpath={}", v),
        }
    }
}

/// Text typed into one element
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Input {
    pub locator: Locator,
    pub value: String,
}

/// Work done before the scenario's own navigation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum SetupStep {
    /// Open a page to establish a browsing context
    Visit { url: String },

    /// Run a script in the page
    Execute { script: String },

    /// Drop everything the page persisted client-side
    ClearStorage,
}

pub const CLEAR_STORAGE_SCRIPT: &str = "window.localStorage.clear(); window.sessionStorage.clear();";

/// What must hold once the action has been performed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Expectation {
    /// The current URL contains `value`
    UrlContains { value: String },

    /// The element appears and its text contains `value`
    TextContains { locator: Locator, value: String },

    /// The element appears
    ElementPresent { locator: Locator },
}

impl Expectation {
    /// Description used in wait timeouts and logs
    pub fn describe(&self) -> String {
        match self {
            Expectation::UrlContains { value } => format!("url to contain {:?}", value),
            Expectation::TextContains { locator, .. } | Expectation::ElementPresent { locator } => {
                format!("{} to be present", locator)
            }
        }
    }
}

/// When the screenshot is taken
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapturePolicy {
    /// After the assert step, whatever the outcome
    #[default]
    Always,
    /// Only when every step passed
    OnSuccess,
    Never,
}

impl CapturePolicy {
    pub fn applies(&self, passed: bool) -> bool {
        match self {
            CapturePolicy::Always => true,
            CapturePolicy::OnSuccess => passed,
            CapturePolicy::Never => false,
        }
    }
}

/// A complete scenario parsed from YAML
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    /// Unique name, also the default screenshot file stem
    pub name: String,

    #[serde(default)]
    pub description: String,

    /// Tags for filtering scenarios
    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(default)]
    pub setup: Vec<SetupStep>,

    /// Page to open, relative to the base URL unless absolute
    pub url: String,

    /// Element to wait for before typing or clicking
    #[serde(default)]
    pub ready: Option<Locator>,

    #[serde(default)]
    pub inputs: Vec<Input>,

    /// Element to click once inputs are filled
    #[serde(default)]
    pub action: Option<Locator>,

    pub expect: Expectation,

    /// Overrides the runner's wait budget for this scenario
    #[serde(default)]
    pub timeout_ms: Option<u64>,

    #[serde(default)]
    pub capture: CapturePolicy,

    /// Screenshot file stem, defaults to `name`
    #[serde(default)]
    pub screenshot: Option<String>,
}

impl Scenario {
    /// Parse a scenario from a YAML string
    pub fn from_yaml(yaml: &str) -> E2eResult<Self> {
        // Locators are written as single-key maps (`{ css: ... }`).
        let scenario: Self =
            serde_yaml::with::singleton_map_recursive::deserialize(serde_yaml::Deserializer::from_str(yaml))?;
        scenario.validate()?;
        Ok(scenario)
    }

    /// Parse a scenario from a YAML file
    pub fn from_file(path: &Path) -> E2eResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
            .map_err(|e| E2eError::ScenarioParse(format!("{}: {}", path.display(), e)))
    }

    /// Load every `.yaml`/`.yml` scenario below `dir`, ordered by path
    pub fn load_all(dir: &Path) -> E2eResult<Vec<Self>> {
        if !dir.is_dir() {
            return Err(E2eError::ScenarioParse(format!(
                "scenario directory not found: {}",
                dir.display()
            )));
        }

        let mut scenarios = Vec::new();

        for entry in walkdir::WalkDir::new(dir)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| {
                e.file_type().is_file()
                    && e.path()
                        .extension()
                        .map(|ext| ext == "yaml" || ext == "yml")
                        .unwrap_or(false)
            })
        {
            scenarios.push(Self::from_file(entry.path())?);
        }

        Self::ensure_unique(&scenarios)?;
        Ok(scenarios)
    }

    /// Reject sets where two scenarios share a name or a screenshot file
    pub fn ensure_unique(scenarios: &[Self]) -> E2eResult<()> {
        let mut names = HashSet::new();
        let mut files = HashSet::new();

        for scenario in scenarios {
            if !names.insert(scenario.name.as_str()) {
                return Err(E2eError::ScenarioParse(format!(
                    "duplicate scenario name: {}",
                    scenario.name
                )));
            }
            let file = scenario.screenshot_file();
            if !files.insert(file.clone()) {
                return Err(E2eError::ScenarioParse(format!(
                    "{}: screenshot {} is already used by another scenario",
                    scenario.name, file
                )));
            }
        }

        Ok(())
    }

    /// Filter scenarios by tag
    pub fn filter_by_tag<'a>(scenarios: &'a [Self], tag: &str) -> Vec<&'a Self> {
        scenarios
            .iter()
            .filter(|s| s.tags.iter().any(|t| t == tag))
            .collect()
    }

    pub fn validate(&self) -> E2eResult<()> {
        let invalid = |reason: String| Err(E2eError::ScenarioParse(format!("{}: {}", self.name, reason)));

        if self.name.trim().is_empty() {
            return Err(E2eError::ScenarioParse("scenario name is empty".to_string()));
        }
        if !is_file_stem(&self.name) {
            return invalid("name must not contain path separators".to_string());
        }
        if let Some(stem) = &self.screenshot {
            if !is_file_stem(stem) {
                return invalid(format!("screenshot name {:?} is not a file name", stem));
            }
        }
        if self.url.trim().is_empty() {
            return invalid("url is empty".to_string());
        }
        for step in &self.setup {
            match step {
                SetupStep::Visit { url } if url.trim().is_empty() => {
                    return invalid("setup visit has an empty url".to_string());
                }
                SetupStep::Execute { script } if script.trim().is_empty() => {
                    return invalid("setup script is empty".to_string());
                }
                _ => {}
            }
        }

        let mut locators: Vec<&Locator> = self.inputs.iter().map(|i| &i.locator).collect();
        locators.extend(self.ready.iter());
        locators.extend(self.action.iter());
        match &self.expect {
            Expectation::UrlContains { value } | Expectation::TextContains { value, .. }
                if value.is_empty() =>
            {
                return invalid("expected value is empty".to_string());
            }
            Expectation::TextContains { locator, .. } | Expectation::ElementPresent { locator } => {
                locators.push(locator);
            }
            Expectation::UrlContains { .. } => {}
        }
        if let Some(empty) = locators.iter().find(|l| l.value().trim().is_empty()) {
            return invalid(format!("empty locator {}", empty));
        }

        Ok(())
    }

    /// File name of the screenshot this scenario produces
    pub fn screenshot_file(&self) -> String {
        format!("{}.png", self.screenshot.as_deref().unwrap_or(&self.name))
    }
}

fn is_file_stem(name: &str) -> bool {
    !name.is_empty() && !name.contains(['/', '\\']) && name != "." && name != ".."
}
