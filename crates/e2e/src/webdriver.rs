//! Real browser sessions over the W3C WebDriver protocol

use async_trait::async_trait;
use fantoccini::elements::Element;
use fantoccini::error::CmdError;
use fantoccini::{Client, ClientBuilder};
use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};

use crate::config::{Browser, DriverConfig, WebDriverConfig, WindowMode};
use crate::driver::DriverHandle;
use crate::error::{E2eError, E2eResult};
use crate::scenario::Locator;
use crate::session::{BrowserSession, SessionLauncher};

/// Window size used for headless runs, where maximizing has no screen to fill
const HEADLESS_WINDOW: (u32, u32) = (1920, 1080);

/// Opens sessions against a WebDriver endpoint, spawning one if needed
pub struct WebDriverLauncher {
    webdriver_url: String,
    capabilities: Map<String, Value>,
    window: WindowMode,
    driver: Option<DriverHandle>,
}

impl WebDriverLauncher {
    /// Use `config.url` if set, otherwise spawn a local driver
    pub async fn start(config: &WebDriverConfig, driver: &DriverConfig) -> E2eResult<Self> {
        match &config.url {
            Some(url) => Ok(Self::connect(url.clone(), config)),
            None => {
                let handle = DriverHandle::spawn(driver, config.browser).await?;
                let mut launcher = Self::connect(handle.url().to_string(), config);
                launcher.driver = Some(handle);
                Ok(launcher)
            }
        }
    }

    /// Use an already running WebDriver endpoint
    pub fn connect(webdriver_url: String, config: &WebDriverConfig) -> Self {
        Self {
            webdriver_url,
            capabilities: capabilities(config),
            window: effective_window(config),
            driver: None,
        }
    }

    pub fn webdriver_url(&self) -> &str {
        &self.webdriver_url
    }

    /// Stop the spawned driver, if any
    pub fn shutdown(&mut self) -> E2eResult<()> {
        if let Some(mut driver) = self.driver.take() {
            driver.stop()?;
        }
        Ok(())
    }
}

/// W3C capabilities for the configured browser
pub fn capabilities(config: &WebDriverConfig) -> Map<String, Value> {
    let mut args = config.args.clone();
    if config.headless {
        match config.browser {
            Browser::Chrome => {
                args.push("--headless=new".to_string());
                let (width, height) = HEADLESS_WINDOW;
                args.push(format!("--window-size={},{}", width, height));
            }
            Browser::Firefox => args.push("-headless".to_string()),
        }
    }

    let options_key = match config.browser {
        Browser::Chrome => "goog:chromeOptions",
        Browser::Firefox => "moz:firefoxOptions",
    };

    let mut caps = Map::new();
    caps.insert("browserName".to_string(), json!(config.browser.as_str()));
    caps.insert(options_key.to_string(), json!({ "args": args }));
    caps
}

fn effective_window(config: &WebDriverConfig) -> WindowMode {
    match (config.window, config.headless) {
        (WindowMode::Maximized, true) => WindowMode::Size {
            width: HEADLESS_WINDOW.0,
            height: HEADLESS_WINDOW.1,
        },
        (window, _) => window,
    }
}

#[async_trait]
impl SessionLauncher for WebDriverLauncher {
    async fn launch(&self) -> E2eResult<Box<dyn BrowserSession>> {
        let mut builder = ClientBuilder::native();
        builder.capabilities(self.capabilities.clone());
        let client = builder
            .connect(&self.webdriver_url)
            .await
            .map_err(|e| E2eError::SessionStart(e.to_string()))?;

        let sized = match self.window {
            WindowMode::Maximized => client.maximize_window().await,
            WindowMode::Size { width, height } => client.set_window_size(width, height).await,
        };
        if let Err(e) = sized {
            if let Err(close_err) = client.clone().close().await {
                warn!("Closing half-started session failed: {}", close_err);
            }
            return Err(E2eError::SessionStart(format!("window setup failed: {}", e)));
        }

        debug!("Browser session opened on {}", self.webdriver_url);
        Ok(Box::new(WebDriverSession { client }))
    }
}

impl Drop for WebDriverLauncher {
    fn drop(&mut self) {
        if self.driver.is_some() {
            info!("Shutting down spawned WebDriver");
        }
        if let Err(e) = self.shutdown() {
            warn!("WebDriver shutdown failed: {}", e);
        }
    }
}

/// One fantoccini client session
pub struct WebDriverSession {
    client: Client,
}

impl WebDriverSession {
    async fn find(&self, locator: &Locator) -> E2eResult<Element> {
        let css = locator.to_css();
        let query = match (&css, locator) {
            (Some(css), _) => fantoccini::Locator::Css(css),
            (None, Locator::XPath(xpath)) => fantoccini::Locator::XPath(xpath),
            (None, other) => return Err(E2eError::ElementNotFound(other.to_string())),
        };

        self.client.find(query).await.map_err(|e| lookup_error(locator, e))
    }
}

/// A miss becomes `ElementNotFound`; anything else is a WebDriver failure
fn lookup_error(locator: &Locator, e: CmdError) -> E2eError {
    if e.is_no_such_element() {
        E2eError::ElementNotFound(locator.to_string())
    } else {
        command_error(e)
    }
}

fn command_error(e: CmdError) -> E2eError {
    E2eError::WebDriver(e.to_string())
}

#[async_trait]
impl BrowserSession for WebDriverSession {
    async fn goto(&self, url: &str) -> E2eResult<()> {
        self.client.goto(url).await.map_err(command_error)
    }

    async fn current_url(&self) -> E2eResult<String> {
        let url = self.client.current_url().await.map_err(command_error)?;
        Ok(url.to_string())
    }

    async fn is_present(&self, locator: &Locator) -> E2eResult<bool> {
        match self.find(locator).await {
            Ok(_) => Ok(true),
            Err(E2eError::ElementNotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn send_keys(&self, locator: &Locator, text: &str) -> E2eResult<()> {
        self.find(locator)
            .await?
            .send_keys(text)
            .await
            .map_err(command_error)
    }

    async fn click(&self, locator: &Locator) -> E2eResult<()> {
        self.find(locator).await?.click().await.map_err(command_error)
    }

    async fn text(&self, locator: &Locator) -> E2eResult<String> {
        self.find(locator).await?.text().await.map_err(command_error)
    }

    async fn execute(&self, script: &str) -> E2eResult<Value> {
        self.client
            .execute(script, vec![])
            .await
            .map_err(|e| E2eError::WebDriver(format!("script failed: {}", e)))
    }

    async fn screenshot(&self) -> E2eResult<Vec<u8>> {
        self.client.screenshot().await.map_err(command_error)
    }

    async fn close(&self) -> E2eResult<()> {
        self.client.clone().close().await.map_err(command_error)
    }
}
