//! Browser session seam
//!
//! Scenarios only talk to the browser through [`BrowserSession`]. The real
//! implementation lives in [`crate::webdriver`]; tests provide in-process
//! fakes.

use async_trait::async_trait;

use crate::error::E2eResult;
use crate::scenario::Locator;

/// One live browser instance, owned by a single scenario
#[async_trait]
pub trait BrowserSession: Send + Sync {
    async fn goto(&self, url: &str) -> E2eResult<()>;

    async fn current_url(&self) -> E2eResult<String>;

    /// Whether at least one element matches, without failing on a miss
    async fn is_present(&self, locator: &Locator) -> E2eResult<bool>;

    /// Type into the element; fails with `ElementNotFound` on a miss
    async fn send_keys(&self, locator: &Locator, text: &str) -> E2eResult<()>;

    /// Click the element; fails with `ElementNotFound` on a miss
    async fn click(&self, locator: &Locator) -> E2eResult<()>;

    /// Rendered text of the element; fails with `ElementNotFound` on a miss
    async fn text(&self, locator: &Locator) -> E2eResult<String>;

    async fn execute(&self, script: &str) -> E2eResult<serde_json::Value>;

    /// PNG of the current viewport
    async fn screenshot(&self) -> E2eResult<Vec<u8>>;

    /// End the session. Called exactly once by the fixture.
    async fn close(&self) -> E2eResult<()>;
}

/// Produces fresh, maximized sessions
#[async_trait]
pub trait SessionLauncher: Send + Sync {
    async fn launch(&self) -> E2eResult<Box<dyn BrowserSession>>;
}
