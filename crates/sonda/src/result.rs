//! Result and error types for Sonda.

use thiserror::Error;

/// Result type for Sonda operations
pub type SondaResult<T> = Result<T, SondaError>;

/// Errors that can occur in Sonda
#[derive(Debug, Error)]
pub enum SondaError {
    /// No candidate selector matched, even after the fallback wait
    #[error("Element not found for any of [{selectors}] after {waited_ms}ms")]
    ElementNotFound {
        /// Rendered candidate list
        selectors: String,
        /// Time spent in the fallback wait
        waited_ms: u64,
    },

    /// A wait ran out of time without its condition becoming true
    #[error("Timed out after {ms}ms waiting for {waited_for}")]
    WaitTimeout {
        /// Timeout in milliseconds
        ms: u64,
        /// Description of the awaited condition
        waited_for: String,
    },

    /// Script evaluation failed in the page
    #[error("Script evaluation failed: {message}")]
    ScriptEvaluation {
        /// Error message
        message: String,
    },

    /// Browser could not be started or connected to
    #[error("Failed to acquire browser session: {message}")]
    SessionAcquisition {
        /// Error message
        message: String,
    },

    /// Operation on a session that has already been released
    #[error("Browser session already released")]
    SessionReleased,

    /// Debug artifact could not be written
    #[error("Failed to write artifact {path}: {message}")]
    ArtifactWrite {
        /// Target path
        path: String,
        /// Error message
        message: String,
    },

    /// Navigation error
    #[error("Navigation to {url} failed: {message}")]
    Navigation {
        /// URL that failed
        url: String,
        /// Error message
        message: String,
    },

    /// Any other driver-level failure (click, typing, window switching)
    #[error("Driver error: {message}")]
    Driver {
        /// Error message
        message: String,
    },

    /// Assertion failed
    #[error("Assertion failed: {message}")]
    AssertionFailed {
        /// Error message
        message: String,
    },

    /// Every strategy of a fallback chain failed
    #[error("All strategies failed: {attempted}")]
    StrategiesExhausted {
        /// Names of the strategies tried, in order
        attempted: String,
    },

    /// Test lifecycle moved between states it may not move between
    #[error("Illegal test state transition {from} -> {to}")]
    InvalidTransition {
        /// Current state
        from: String,
        /// Requested state
        to: String,
    },

    /// Scenario file could not be understood
    #[error("Scenario error in {source_name}: {message}")]
    ScenarioParse {
        /// File or scenario name
        source_name: String,
        /// Error message
        message: String,
    },

    /// Invalid configuration value
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}

impl SondaError {
    /// Create a script evaluation error
    #[must_use]
    pub fn script(message: impl Into<String>) -> Self {
        Self::ScriptEvaluation {
            message: message.into(),
        }
    }

    /// Create a driver error
    #[must_use]
    pub fn driver(message: impl Into<String>) -> Self {
        Self::Driver {
            message: message.into(),
        }
    }

    /// Create an assertion failure
    #[must_use]
    pub fn assertion(message: impl Into<String>) -> Self {
        Self::AssertionFailed {
            message: message.into(),
        }
    }

    /// Errors that polling absorbs and retries until its timeout.
    ///
    /// A detached element or a script that throws because the SPA has not
    /// rendered yet are both "not yet true".
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::ScriptEvaluation { .. } | Self::ElementNotFound { .. } | Self::Driver { .. }
        )
    }

    /// Errors that must abort the whole run instead of failing one test
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::SessionAcquisition { .. } | Self::SessionReleased)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(SondaError::script("el is null").is_transient());
        assert!(SondaError::driver("stale node").is_transient());
        assert!(!SondaError::assertion("bad").is_transient());
        assert!(!SondaError::WaitTimeout {
            ms: 10,
            waited_for: "x".into()
        }
        .is_transient());
    }

    #[test]
    fn test_fatal_classification() {
        let err = SondaError::SessionAcquisition {
            message: "no chromium".into(),
        };
        assert!(err.is_fatal());
        assert!(!err.is_transient());
        assert!(!SondaError::assertion("x").is_fatal());
    }

    #[test]
    fn test_display_messages() {
        let err = SondaError::ElementNotFound {
            selectors: "css(#name)".into(),
            waited_ms: 500,
        };
        assert_eq!(
            err.to_string(),
            "Element not found for any of [css(#name)] after 500ms"
        );

        let err = SondaError::WaitTimeout {
            ms: 30_000,
            waited_for: "document ready".into(),
        };
        assert!(err.to_string().contains("30000ms"));
        assert!(err.to_string().contains("document ready"));
    }

    #[test]
    fn test_io_error_from() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: SondaError = io_err.into();
        assert!(err.to_string().starts_with("I/O error"));
    }
}
