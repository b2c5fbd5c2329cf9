//! Scoped browser session

use std::any::Any;
use std::panic::AssertUnwindSafe;

use futures::future::BoxFuture;
use futures::FutureExt;
use tracing::{debug, error};

use crate::error::{E2eError, E2eResult};
use crate::session::{BrowserSession, SessionLauncher};

/// Result of a body run inside a session
#[derive(Debug)]
pub struct FixtureOutcome<T> {
    pub body: E2eResult<T>,
    pub teardown: E2eResult<()>,
}

/// Acquires a session for one body and always releases it afterwards
pub struct SessionFixture<'a, L: ?Sized> {
    launcher: &'a L,
}

impl<'a, L: SessionLauncher + ?Sized> SessionFixture<'a, L> {
    pub fn new(launcher: &'a L) -> Self {
        Self { launcher }
    }

    /// Run `body` with a fresh session.
    ///
    /// Returns `Err` only when no session could be acquired; in that case the
    /// body never ran. Otherwise the session is closed whether the body
    /// succeeded, failed or panicked, and both results are returned.
    pub async fn run<T, F>(&self, body: F) -> E2eResult<FixtureOutcome<T>>
    where
        F: for<'s> FnOnce(&'s dyn BrowserSession) -> BoxFuture<'s, E2eResult<T>>,
    {
        let session = self.launcher.launch().await?;
        debug!("Session acquired");

        let body = match AssertUnwindSafe(body(session.as_ref())).catch_unwind().await {
            Ok(result) => result,
            Err(payload) => Err(E2eError::Panicked(panic_message(payload.as_ref()))),
        };

        let teardown = session
            .close()
            .await
            .map_err(|e| E2eError::Teardown(e.to_string()));
        match &teardown {
            Ok(()) => debug!("Session released"),
            Err(e) => error!("{}", e),
        }

        Ok(FixtureOutcome { body, teardown })
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
