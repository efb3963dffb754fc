//! Browser session lifecycle.
//!
//! A [`Session`] owns one driver for a whole run. It is cheap to clone and
//! every clone refers to the same browser; release happens once no matter
//! how many clones call [`Session::release`].

use futures::FutureExt;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::driver::BrowserDriver;
use crate::result::{SondaError, SondaResult};

struct Inner {
    driver: Arc<dyn BrowserDriver>,
    released: AtomicBool,
}

impl Drop for Inner {
    fn drop(&mut self) {
        if !self.released.load(Ordering::SeqCst) {
            tracing::warn!("browser session dropped without being released");
        }
    }
}

/// Handle to the run's browser
#[derive(Clone)]
pub struct Session {
    inner: Arc<Inner>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("released", &self.is_released())
            .finish()
    }
}

impl Session {
    /// Wrap an already connected driver
    #[must_use]
    pub fn new(driver: Arc<dyn BrowserDriver>) -> Self {
        Self {
            inner: Arc::new(Inner {
                driver,
                released: AtomicBool::new(false),
            }),
        }
    }

    /// Acquire a session from a launcher.
    ///
    /// Any launcher error is reported as [`SondaError::SessionAcquisition`].
    pub async fn acquire<F, Fut>(launch: F) -> SondaResult<Self>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = SondaResult<Arc<dyn BrowserDriver>>>,
    {
        match launch().await {
            Ok(driver) => {
                tracing::info!("browser session acquired");
                Ok(Self::new(driver))
            }
            Err(e @ SondaError::SessionAcquisition { .. }) => Err(e),
            Err(e) => Err(SondaError::SessionAcquisition {
                message: e.to_string(),
            }),
        }
    }

    /// The driver, unless the session was released
    ///
    /// # Errors
    ///
    /// Returns [`SondaError::SessionReleased`] after release.
    pub fn driver(&self) -> SondaResult<&dyn BrowserDriver> {
        if self.is_released() {
            return Err(SondaError::SessionReleased);
        }
        Ok(self.inner.driver.as_ref())
    }

    /// Whether release has happened
    #[must_use]
    pub fn is_released(&self) -> bool {
        self.inner.released.load(Ordering::SeqCst)
    }

    /// Quit the browser. Only the first call has an effect.
    ///
    /// Quit errors are logged; the session counts as released regardless.
    pub async fn release(&self) {
        if self.inner.released.swap(true, Ordering::SeqCst) {
            return;
        }
        match self.inner.driver.quit().await {
            Ok(()) => tracing::info!("browser session released"),
            Err(e) => tracing::warn!(error = %e, "browser did not quit cleanly"),
        }
    }

    /// Run `body` with the session and release it afterwards.
    ///
    /// Release happens after success, after an error and after a panic; a
    /// panic is resumed once the browser is gone.
    pub async fn scoped<T, F, Fut>(session: Self, body: F) -> SondaResult<T>
    where
        F: FnOnce(Self) -> Fut,
        Fut: Future<Output = SondaResult<T>>,
    {
        let outcome = AssertUnwindSafe(body(session.clone())).catch_unwind().await;
        session.release().await;
        match outcome {
            Ok(result) => result,
            Err(panic) => std::panic::resume_unwind(panic),
        }
    }
}
