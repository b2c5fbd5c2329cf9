//! Test support for scenario runner integration tests
//!
//! `FakeLauncher` hands out in-process sessions that behave like the
//! Mindfulnes login page: email/password form, `.error` message, a protected
//! `/home` route guarded by a stored token.

#![allow(dead_code)]

use std::io::Cursor;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use image::{DynamicImage, ImageFormat, RgbaImage};
use serde_json::Value;

use mindfulnes_e2e::config::RunnerConfig;
use mindfulnes_e2e::wait::WaitConfig;
use mindfulnes_e2e::{BrowserSession, E2eError, E2eResult, Locator, SessionLauncher};

pub const BASE_URL: &str = "http://mindfulnes.test";

const EMAIL: &str = "input[placeholder='Email']";
const PASSWORD: &str = "input[placeholder='Password']";
const SUBMIT: &str = ".submit-btn";
const ERROR: &str = ".error";

/// Knobs for how the fake application behaves
#[derive(Debug, Clone)]
pub struct AppBehavior {
    pub incorrect_password_message: String,
    /// `current_url` reads before a successful login lands on `/questions`
    pub login_delay_polls: usize,
    pub login_navigates: bool,
    pub password_placeholder: String,
    pub preexisting_token: bool,
    pub fail_launch: bool,
    pub fail_close: bool,
}

impl Default for AppBehavior {
    fn default() -> Self {
        Self {
            incorrect_password_message: "Incorrect Password".to_string(),
            login_delay_polls: 2,
            login_navigates: true,
            password_placeholder: "Password".to_string(),
            preexisting_token: true,
            fail_launch: false,
            fail_close: false,
        }
    }
}

#[derive(Debug, Default)]
pub struct Counters {
    pub launched: AtomicUsize,
    pub closed: AtomicUsize,
    active: AtomicUsize,
    pub max_active: AtomicUsize,
}

impl Counters {
    pub fn launched(&self) -> usize {
        self.launched.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn max_active(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }
}

pub struct FakeLauncher {
    behavior: AppBehavior,
    pub counters: Arc<Counters>,
}

impl FakeLauncher {
    pub fn new(behavior: AppBehavior) -> Self {
        Self {
            behavior,
            counters: Arc::new(Counters::default()),
        }
    }
}

#[async_trait]
impl SessionLauncher for FakeLauncher {
    async fn launch(&self) -> E2eResult<Box<dyn BrowserSession>> {
        if self.behavior.fail_launch {
            return Err(E2eError::SessionStart("connection refused".to_string()));
        }

        self.counters.launched.fetch_add(1, Ordering::SeqCst);
        let active = self.counters.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.counters.max_active.fetch_max(active, Ordering::SeqCst);

        Ok(Box::new(FakeSession {
            behavior: self.behavior.clone(),
            counters: self.counters.clone(),
            page: Mutex::new(Page {
                path: "about:blank".to_string(),
                token: self.behavior.preexisting_token.then(|| "stale-token".to_string()),
                ..Page::default()
            }),
        }))
    }
}

#[derive(Debug, Default)]
struct Page {
    path: String,
    token: Option<String>,
    email: String,
    password: String,
    error: Option<String>,
    pending: Option<(String, usize)>,
    closed: bool,
}

pub struct FakeSession {
    behavior: AppBehavior,
    counters: Arc<Counters>,
    page: Mutex<Page>,
}

impl FakeSession {
    fn password_selector(&self) -> String {
        format!("input[placeholder='{}']", self.behavior.password_placeholder)
    }

    fn visible(&self, page: &Page, locator: &Locator) -> bool {
        let Some(css) = locator.to_css() else {
            return false;
        };
        if page.path != "/login" {
            return false;
        }
        css == EMAIL || css == SUBMIT || css == self.password_selector() || (css == ERROR && page.error.is_some())
    }

    fn require(&self, page: &Page, locator: &Locator) -> E2eResult<String> {
        if page.closed {
            return Err(E2eError::WebDriver("invalid session id".to_string()));
        }
        if self.visible(page, locator) {
            Ok(locator.to_css().unwrap_or_default())
        } else {
            Err(E2eError::ElementNotFound(locator.to_string()))
        }
    }

    fn submit(&self, page: &mut Page) {
        // The inputs are `required`: an empty field blocks submission.
        if page.email.is_empty() || page.password.is_empty() {
            return;
        }

        match (page.email.as_str(), page.password.as_str()) {
            ("admin@admin", "admin") => {
                page.token = Some("fresh-token".to_string());
                if self.behavior.login_navigates {
                    page.pending = Some(("/questions".to_string(), self.behavior.login_delay_polls));
                }
            }
            ("admin@admin", _) | ("user@fer.hr", _) => {
                page.error = Some(self.behavior.incorrect_password_message.clone());
            }
            _ => page.error = Some("Email does not exist".to_string()),
        }
    }
}

#[async_trait]
impl BrowserSession for FakeSession {
    async fn goto(&self, url: &str) -> E2eResult<()> {
        let mut page = self.page.lock().unwrap();
        let path = url.strip_prefix(BASE_URL).unwrap_or(url);
        let path = if path.is_empty() { "/" } else { path };

        page.path = match path {
            "/home" | "/questions" if page.token.is_none() => "/login".to_string(),
            other => other.to_string(),
        };
        page.email.clear();
        page.password.clear();
        page.error = None;
        page.pending = None;
        Ok(())
    }

    async fn current_url(&self) -> E2eResult<String> {
        let mut page = self.page.lock().unwrap();
        if let Some((target, remaining)) = page.pending.take() {
            if remaining == 0 {
                page.path = target;
            } else {
                page.pending = Some((target, remaining - 1));
            }
        }
        Ok(format!("{}{}", BASE_URL, page.path))
    }

    async fn is_present(&self, locator: &Locator) -> E2eResult<bool> {
        let page = self.page.lock().unwrap();
        Ok(self.visible(&page, locator))
    }

    async fn send_keys(&self, locator: &Locator, text: &str) -> E2eResult<()> {
        let mut page = self.page.lock().unwrap();
        let css = self.require(&page, locator)?;
        if css == EMAIL {
            page.email.push_str(text);
        } else if css == self.password_selector() {
            page.password.push_str(text);
        }
        Ok(())
    }

    async fn click(&self, locator: &Locator) -> E2eResult<()> {
        let mut page = self.page.lock().unwrap();
        let css = self.require(&page, locator)?;
        if css == SUBMIT {
            self.submit(&mut page);
        }
        Ok(())
    }

    async fn text(&self, locator: &Locator) -> E2eResult<String> {
        let page = self.page.lock().unwrap();
        let css = self.require(&page, locator)?;
        Ok(match css.as_str() {
            ERROR => page.error.clone().unwrap_or_default(),
            SUBMIT => "Login".to_string(),
            _ => String::new(),
        })
    }

    async fn execute(&self, script: &str) -> E2eResult<Value> {
        let mut page = self.page.lock().unwrap();
        if script.contains("localStorage.clear()") {
            page.token = None;
        }
        Ok(Value::Null)
    }

    async fn screenshot(&self) -> E2eResult<Vec<u8>> {
        Ok(png(16, 9))
    }

    async fn close(&self) -> E2eResult<()> {
        self.page.lock().unwrap().closed = true;
        self.counters.closed.fetch_add(1, Ordering::SeqCst);
        self.counters.active.fetch_sub(1, Ordering::SeqCst);
        if self.behavior.fail_close {
            return Err(E2eError::WebDriver("session already deleted".to_string()));
        }
        Ok(())
    }
}

pub fn png(width: u32, height: u32) -> Vec<u8> {
    let mut bytes = Vec::new();
    DynamicImage::ImageRgba8(RgbaImage::new(width, height))
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .expect("encode png");
    bytes
}

/// Runner config pointed at the fake app, writing into `dir`
pub fn config(dir: &Path) -> RunnerConfig {
    let mut config = RunnerConfig {
        base_url: BASE_URL.to_string(),
        output_dir: dir.join("results"),
        wait: WaitConfig::new(1_000, 10),
        ..Default::default()
    };
    config.artifacts.screenshot_dir = dir.join("screenshots");
    config
}
