//! WebDriver process management - spawning and status checking chromedriver/geckodriver

use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use serde::Deserialize;
use tracing::{info, warn};

use crate::config::{Browser, DriverConfig};
use crate::error::{E2eError, E2eResult};
use crate::wait::{wait_until_true, WaitConfig};

/// Handle to a running WebDriver process
pub struct DriverHandle {
    child: Child,
    url: String,
    port: u16,
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    value: StatusValue,
}

#[derive(Debug, Deserialize)]
struct StatusValue {
    #[serde(default)]
    ready: bool,
    #[serde(default)]
    message: String,
}

impl DriverHandle {
    /// Spawn the driver for `browser` and wait until it accepts sessions
    pub async fn spawn(config: &DriverConfig, browser: Browser) -> E2eResult<Self> {
        let port = match config.port {
            Some(port) => port,
            None => find_free_port()?,
        };
        let url = format!("http://127.0.0.1:{}", port);
        let binary = config
            .binary_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(browser.driver_binary()));

        info!("Spawning {} on port {}", binary.display(), port);

        let child = Command::new(&binary)
            .arg(format!("--port={}", port))
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| E2eError::DriverStartup(format!("Failed to spawn {}: {}", binary.display(), e)))?;

        let handle = DriverHandle { child, url, port };

        handle
            .wait_for_ready(Duration::from_millis(config.startup_timeout_ms))
            .await?;

        info!("WebDriver is ready at {}", handle.url);
        Ok(handle)
    }

    /// Poll `GET /status` until the driver reports ready
    async fn wait_for_ready(&self, timeout: Duration) -> E2eResult<()> {
        let status_url = format!("{}/status", self.url);
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(2))
            .build()?;
        let wait = WaitConfig::new(timeout.as_millis() as u64, 100);
        let attempts = AtomicUsize::new(0);

        let result = wait_until_true(&wait, "webdriver status ready", || {
            let n = attempts.fetch_add(1, Ordering::SeqCst) + 1;
            let request = client.get(&status_url).send();
            async move {
                match request.await {
                    Ok(resp) if resp.status().is_success() => match resp.json::<StatusResponse>().await {
                        Ok(status) if status.value.ready => Ok(true),
                        Ok(status) => {
                            warn!("WebDriver not ready yet: {}", status.value.message);
                            Ok(false)
                        }
                        Err(e) => {
                            warn!("Unreadable status response: {}", e);
                            Ok(false)
                        }
                    },
                    Ok(resp) => {
                        warn!("Status check returned {}", resp.status());
                        Ok(false)
                    }
                    Err(e) => {
                        if n == 1 {
                            info!("Waiting for WebDriver to start...");
                        }
                        // Connection refused is expected while the driver is starting
                        if !e.is_connect() {
                            warn!("Status check error: {}", e);
                        }
                        Ok(false)
                    }
                }
            }
        })
        .await;

        match result {
            Err(E2eError::Timeout { .. }) => Err(E2eError::DriverHealthCheck(attempts.load(Ordering::SeqCst))),
            other => other,
        }
    }

    /// WebDriver endpoint URL
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Stop the driver
    pub fn stop(&mut self) -> E2eResult<()> {
        if let Ok(Some(_)) = self.child.try_wait() {
            return Ok(());
        }

        info!("Stopping WebDriver (pid: {})", self.child.id());

        #[cfg(unix)]
        {
            use nix::sys::signal::{kill, Signal};
            use nix::unistd::Pid;

            let pid = Pid::from_raw(self.child.id() as i32);
            if kill(pid, Signal::SIGTERM).is_ok() {
                std::thread::sleep(Duration::from_millis(200));
            }
        }

        if let Ok(None) = self.child.try_wait() {
            self.child.kill()?;
        }
        self.child.wait()?;

        Ok(())
    }
}

impl Drop for DriverHandle {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            warn!("Failed to stop WebDriver: {}", e);
        }
    }
}

/// Find a free port to use
fn find_free_port() -> E2eResult<u16> {
    use std::net::TcpListener;

    let listener = TcpListener::bind("127.0.0.1:0")?;
    Ok(listener.local_addr()?.port())
}
