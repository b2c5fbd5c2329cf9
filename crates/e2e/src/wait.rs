//! Bounded polling waits
//!
//! Every wait in a scenario goes through [`wait_until`]: the probe is polled
//! until it yields a value or the time budget is spent. A probe error ends the
//! wait immediately. A probe that blocks is cut off at the remaining budget, so
//! a wait always returns.

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::{sleep, timeout, Instant};
use tracing::debug;

use crate::error::{E2eError, E2eResult};

/// Default wait budget (10 seconds)
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;

/// Default polling interval (500ms)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitConfig {
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl WaitConfig {
    pub fn new(timeout_ms: u64, poll_interval_ms: u64) -> Self {
        Self { timeout_ms, poll_interval_ms }
    }

    pub fn with_timeout_ms(self, timeout_ms: u64) -> Self {
        Self { timeout_ms, ..self }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        // A zero interval would spin without yielding to the timer.
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

/// Poll `probe` until it returns `Some`, failing with [`E2eError::Timeout`]
/// once `config.timeout()` has elapsed.
pub async fn wait_until<T, F, Fut>(config: &WaitConfig, what: &str, mut probe: F) -> E2eResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = E2eResult<Option<T>>>,
{
    let budget = config.timeout();
    let start = Instant::now();
    let mut attempts = 0usize;

    loop {
        attempts += 1;
        let remaining = budget.saturating_sub(start.elapsed());

        let polled = if attempts == 1 {
            // The first probe always runs, even with a zero budget.
            timeout(budget.max(config.poll_interval()), probe()).await
        } else {
            timeout(remaining, probe()).await
        };

        match polled {
            Ok(Ok(Some(value))) => {
                debug!(what, attempts, elapsed_ms = start.elapsed().as_millis() as u64, "condition met");
                return Ok(value);
            }
            Ok(Ok(None)) => {}
            Ok(Err(e)) => return Err(e),
            Err(_) => break,
        }

        let remaining = budget.saturating_sub(start.elapsed());
        if remaining.is_zero() {
            break;
        }
        sleep(config.poll_interval().min(remaining)).await;
    }

    debug!(what, attempts, "condition not met before timeout");
    Err(E2eError::Timeout {
        what: what.to_string(),
        timeout: budget,
    })
}

/// [`wait_until`] for probes that answer yes or no.
pub async fn wait_until_true<F, Fut>(config: &WaitConfig, what: &str, mut probe: F) -> E2eResult<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = E2eResult<bool>>,
{
    wait_until(config, what, || {
        let fut = probe();
        async move { fut.await.map(|met| met.then_some(())) }
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn config() -> WaitConfig {
        WaitConfig::new(1_000, 100)
    }

    #[tokio::test(start_paused = true)]
    async fn test_returns_first_value_without_sleeping() {
        let start = Instant::now();
        let value = wait_until(&config(), "ready", || async { Ok(Some(42)) })
            .await
            .unwrap();
        assert_eq!(value, 42);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_polls_until_condition_holds() {
        let calls = AtomicUsize::new(0);
        let start = Instant::now();

        let seen = wait_until(&config(), "third poll", || {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            async move { Ok((n >= 3).then_some(n)) }
        })
        .await
        .unwrap();

        assert_eq!(seen, 3);
        assert_eq!(start.elapsed(), Duration::from_millis(200));
    }

    #[tokio::test(start_paused = true)]
    async fn test_times_out_when_condition_never_holds() {
        let calls = AtomicUsize::new(0);
        let start = Instant::now();

        let err = wait_until_true(&config(), "url to contain \"/login\"", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok(false) }
        })
        .await
        .unwrap_err();

        assert!(matches!(err, E2eError::Timeout { ref what, .. } if what == "url to contain \"/login\""));
        assert_eq!(start.elapsed(), Duration::from_millis(1_000));
        assert_eq!(calls.load(Ordering::SeqCst), 11);
    }

    #[tokio::test(start_paused = true)]
    async fn test_probe_error_is_not_retried() {
        let calls = AtomicUsize::new(0);

        let err = wait_until::<(), _, _>(&config(), "element", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(E2eError::WebDriver("session deleted".into())) }
        })
        .await
        .unwrap_err();

        assert!(matches!(err, E2eError::WebDriver(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_blocking_probe_cannot_outlive_budget() {
        let start = Instant::now();

        let err = wait_until_true(&config(), "hung probe", || async {
            sleep(Duration::from_secs(3_600)).await;
            Ok(true)
        })
        .await
        .unwrap_err();

        assert!(matches!(err, E2eError::Timeout { .. }));
        assert_eq!(start.elapsed(), Duration::from_millis(1_000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_budget_still_probes_once() {
        let zero = WaitConfig::new(0, 100);
        assert!(wait_until_true(&zero, "present", || async { Ok(true) }).await.is_ok());
        assert!(wait_until_true(&zero, "absent", || async { Ok(false) }).await.is_err());
    }

    #[test]
    fn test_wait_config_defaults() {
        let config = WaitConfig::default();
        assert_eq!(config.timeout(), Duration::from_secs(10));
        assert_eq!(config.poll_interval(), Duration::from_millis(500));
        assert_eq!(config.with_timeout_ms(250).timeout(), Duration::from_millis(250));
    }
}
