//! Condition polling.
//!
//! A [`Waiter`] evaluates a predicate immediately and then every poll
//! interval until it holds or the timeout elapses. Timing out is an ordinary
//! outcome reported through [`WaitResult`]; callers that want an error use
//! [`WaitResult::into_result`].
//!
//! Time is read from `tokio::time`, so tests can run on a paused clock.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

use crate::driver::BrowserDriver;
use crate::locator::{js_string, Selector};
use crate::result::{SondaError, SondaResult};

/// Default timeout for wait operations (30 seconds)
pub const DEFAULT_WAIT_TIMEOUT_MS: u64 = 30_000;

/// Default polling interval (500ms)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 500;

/// Options for wait operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaitOptions {
    /// Timeout in milliseconds
    pub timeout_ms: u64,
    /// Polling interval in milliseconds
    pub poll_interval_ms: u64,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_WAIT_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl WaitOptions {
    /// Create new wait options with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set timeout in milliseconds
    #[must_use]
    pub const fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Set polling interval in milliseconds
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval_ms: u64) -> Self {
        self.poll_interval_ms = poll_interval_ms;
        self
    }

    /// Get timeout as Duration
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Get poll interval as Duration, never zero
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

/// Page-state predicate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    /// At least one element matches
    Present(Selector),
    /// At least one matching element is displayed
    Visible(Selector),
    /// Script body returns a truthy value
    Script(String),
    /// Current URL contains the string
    UrlContains(String),
    /// URL fragment equals the string (including the leading `#`)
    HashEquals(String),
    /// `document.readyState` is `complete`
    DocumentReady,
    /// Document title contains the string
    TitleContains(String),
}

impl Condition {
    /// Script condition
    #[must_use]
    pub fn script(body: impl Into<String>) -> Self {
        Self::Script(body.into())
    }

    /// Condition that `selector` matches an element whose text contains `text`
    #[must_use]
    pub fn text_in(selector: &Selector, text: &str) -> Self {
        Self::Script(format!(
            "return {}.some(el => (el.textContent || '').includes({}));",
            selector.to_collect_query(),
            js_string(text)
        ))
    }

    /// Evaluate once against the current page
    ///
    /// # Errors
    ///
    /// Propagates driver errors; the waiter treats them as "not yet".
    pub async fn evaluate(&self, driver: &dyn BrowserDriver) -> SondaResult<bool> {
        match self {
            Self::Present(selector) => Ok(!driver.find_elements(selector).await?.is_empty()),
            Self::Visible(selector) => Ok(driver
                .find_elements(selector)
                .await?
                .iter()
                .any(|el| el.displayed)),
            Self::Script(body) => Ok(is_truthy(&driver.execute_script(body, Vec::new()).await?)),
            Self::UrlContains(needle) => Ok(driver.current_url().await?.contains(needle.as_str())),
            Self::HashEquals(hash) => {
                let url = driver.current_url().await?;
                Ok(fragment(&url) == hash.as_str())
            }
            Self::DocumentReady => {
                let state = driver
                    .execute_script("return document.readyState;", Vec::new())
                    .await?;
                Ok(state.as_str() == Some("complete"))
            }
            Self::TitleContains(needle) => {
                let title = driver
                    .execute_script("return document.title;", Vec::new())
                    .await?;
                Ok(title.as_str().is_some_and(|t| t.contains(needle.as_str())))
            }
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Present(s) => write!(f, "presence of {s}"),
            Self::Visible(s) => write!(f, "visibility of {s}"),
            Self::Script(js) => write!(f, "script `{js}`"),
            Self::UrlContains(s) => write!(f, "url containing '{s}'"),
            Self::HashEquals(s) => write!(f, "location hash '{s}'"),
            Self::DocumentReady => write!(f, "document ready"),
            Self::TitleContains(s) => write!(f, "title containing '{s}'"),
        }
    }
}

/// Fragment of a URL including `#`, or the empty string
pub(crate) fn fragment(url: &str) -> &str {
    url.find('#').map_or("", |i| &url[i..])
}

/// JavaScript truthiness of a script result
#[must_use]
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Result of a wait operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitResult {
    /// Whether the wait was successful
    pub success: bool,
    /// Time spent waiting
    pub elapsed: Duration,
    /// Description of what was waited for
    pub waited_for: String,
    /// Index of the condition that held, for any-of waits
    pub matched: Option<usize>,
    /// Timeout the wait ran under
    pub timeout: Duration,
}

impl WaitResult {
    /// Create a successful wait result
    #[must_use]
    pub fn success(elapsed: Duration, waited_for: impl Into<String>) -> Self {
        Self {
            success: true,
            elapsed,
            waited_for: waited_for.into(),
            matched: None,
            timeout: Duration::ZERO,
        }
    }

    /// Create a timeout wait result
    #[must_use]
    pub fn timeout(elapsed: Duration, waited_for: impl Into<String>) -> Self {
        Self {
            success: false,
            elapsed,
            waited_for: waited_for.into(),
            matched: None,
            timeout: elapsed,
        }
    }

    #[must_use]
    const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Convert a failed wait into [`SondaError::WaitTimeout`]
    ///
    /// # Errors
    ///
    /// Returns an error if the wait did not succeed.
    pub fn into_result(self) -> SondaResult<Self> {
        if self.success {
            Ok(self)
        } else {
            Err(SondaError::WaitTimeout {
                ms: self.timeout.as_millis() as u64,
                waited_for: self.waited_for,
            })
        }
    }
}

/// Waiter for page conditions
#[derive(Debug, Clone, Default)]
pub struct Waiter {
    options: WaitOptions,
}

impl Waiter {
    /// Create a new waiter with default options
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with custom options
    #[must_use]
    pub const fn with_options(options: WaitOptions) -> Self {
        Self { options }
    }

    /// Options in use
    #[must_use]
    pub const fn options(&self) -> &WaitOptions {
        &self.options
    }

    /// Poll `attempt` until it yields a value or the timeout elapses.
    ///
    /// The attempt runs once immediately. Errors count as "not yet".
    /// A failed result is only returned once the full timeout has passed.
    pub async fn poll_for<T, F, Fut>(
        &self,
        description: impl Into<String>,
        mut attempt: F,
    ) -> (WaitResult, Option<T>)
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = SondaResult<Option<T>>>,
    {
        let description = description.into();
        let timeout = self.options.timeout();
        let poll = self.options.poll_interval();
        let start = Instant::now();
        let deadline = start + timeout;
        let mut attempts: u32 = 0;

        loop {
            attempts += 1;
            match attempt().await {
                Ok(Some(value)) => {
                    tracing::debug!(waited_for = %description, attempts, "wait satisfied");
                    return (
                        WaitResult::success(start.elapsed(), description).with_timeout(timeout),
                        Some(value),
                    );
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::debug!(waited_for = %description, error = %e, "poll attempt failed");
                }
            }

            let now = Instant::now();
            if now >= deadline {
                tracing::debug!(waited_for = %description, attempts, "wait timed out");
                return (
                    WaitResult::timeout(now - start, description).with_timeout(timeout),
                    None,
                );
            }
            tokio::time::sleep(poll.min(deadline - now)).await;
        }
    }

    /// Poll a boolean predicate
    pub async fn poll<F, Fut>(&self, description: impl Into<String>, mut predicate: F) -> WaitResult
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = SondaResult<bool>>,
    {
        self.poll_for(description, || {
            let check = predicate();
            async move { check.await.map(|ok| ok.then_some(())) }
        })
        .await
        .0
    }

    /// Wait for a single condition
    pub async fn until(&self, driver: &dyn BrowserDriver, condition: &Condition) -> WaitResult {
        self.poll(condition.to_string(), || condition.evaluate(driver))
            .await
    }

    /// Wait until any of the conditions holds.
    ///
    /// Conditions are checked in order on each attempt; the first that holds
    /// is reported in [`WaitResult::matched`].
    pub async fn until_any(&self, driver: &dyn BrowserDriver, conditions: &[Condition]) -> WaitResult {
        let description = conditions
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" or ");

        let (mut result, matched) = self
            .poll_for(description, || async move {
                let mut last_err = None;
                for (i, condition) in conditions.iter().enumerate() {
                    match condition.evaluate(driver).await {
                        Ok(true) => return Ok(Some(i)),
                        Ok(false) => {}
                        Err(e) => last_err = Some(e),
                    }
                }
                last_err.map_or(Ok(None), Err)
            })
            .await;
        result.matched = matched;
        result
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::driver::{ElementHandle, MockDriver};
    use serde_json::json;

    fn waiter(timeout_ms: u64, poll_ms: u64) -> Waiter {
        Waiter::with_options(
            WaitOptions::new()
                .with_timeout(timeout_ms)
                .with_poll_interval(poll_ms),
        )
    }

    mod options_tests {
        use super::*;

        #[test]
        fn test_defaults() {
            let opts = WaitOptions::default();
            assert_eq!(opts.timeout_ms, 30_000);
            assert_eq!(opts.poll_interval_ms, 500);
        }

        #[test]
        fn test_zero_poll_interval_clamped() {
            let opts = WaitOptions::new().with_poll_interval(0);
            assert_eq!(opts.poll_interval(), Duration::from_millis(1));
        }

        #[test]
        fn test_partial_yaml() {
            let opts: WaitOptions = serde_yaml_ng::from_str("timeout_ms: 5000").unwrap();
            assert_eq!(opts.timeout_ms, 5_000);
            assert_eq!(opts.poll_interval_ms, DEFAULT_POLL_INTERVAL_MS);
        }
    }

    mod poll_tests {
        use super::*;

        #[tokio::test(start_paused = true)]
        async fn test_immediate_success_has_no_delay() {
            let result = waiter(1_000, 100).poll("true", || async { Ok(true) }).await;
            assert!(result.success);
            assert_eq!(result.elapsed, Duration::ZERO);
        }

        #[tokio::test(start_paused = true)]
        async fn test_success_after_condition_becomes_true() {
            let start = Instant::now();
            let result = waiter(10_000, 500)
                .poll("late", || async move {
                    Ok(start.elapsed() >= Duration::from_millis(1_200))
                })
                .await;
            assert!(result.success);
            assert!(result.elapsed >= Duration::from_millis(1_200));
            assert!(result.elapsed < Duration::from_millis(1_700));
        }

        #[tokio::test(start_paused = true)]
        async fn test_never_true_fails_at_timeout_not_before() {
            let result = waiter(2_000, 300).poll("never", || async { Ok(false) }).await;
            assert!(!result.success);
            assert!(result.elapsed >= Duration::from_millis(2_000));
            assert!(result.elapsed < Duration::from_millis(2_300));
        }

        #[tokio::test(start_paused = true)]
        async fn test_errors_are_not_yet_true() {
            let mut calls = 0;
            let result = waiter(5_000, 100)
                .poll("flaky", || {
                    calls += 1;
                    let n = calls;
                    async move {
                        if n < 3 {
                            Err(SondaError::script("root is null"))
                        } else {
                            Ok(true)
                        }
                    }
                })
                .await;
            assert!(result.success);
            assert_eq!(calls, 3);
        }

        #[tokio::test(start_paused = true)]
        async fn test_into_result_maps_timeout() {
            let err = waiter(700, 100)
                .poll("never", || async { Ok(false) })
                .await
                .into_result()
                .unwrap_err();
            match err {
                SondaError::WaitTimeout { ms, waited_for } => {
                    assert_eq!(ms, 700);
                    assert_eq!(waited_for, "never");
                }
                other => panic!("unexpected: {other}"),
            }
        }
    }

    mod condition_tests {
        use super::*;

        #[test]
        fn test_truthiness() {
            assert!(!is_truthy(&Value::Null));
            assert!(!is_truthy(&json!(false)));
            assert!(!is_truthy(&json!(0)));
            assert!(!is_truthy(&json!("")));
            assert!(is_truthy(&json!(11)));
            assert!(is_truthy(&json!("complete")));
            assert!(is_truthy(&json!([])));
        }

        #[test]
        fn test_fragment() {
            assert_eq!(fragment("https://site.test/#contact"), "#contact");
            assert_eq!(fragment("https://site.test/"), "");
        }

        #[tokio::test(start_paused = true)]
        async fn test_hash_and_url_conditions() {
            let driver = MockDriver::new();
            driver.navigate_sync("https://site.test/admin/dashboard#contact");
            assert!(Condition::HashEquals("#contact".into())
                .evaluate(&driver)
                .await
                .unwrap());
            assert!(Condition::UrlContains("/dashboard".into())
                .evaluate(&driver)
                .await
                .unwrap());
        }

        #[tokio::test(start_paused = true)]
        async fn test_visible_requires_displayed_element() {
            let driver = MockDriver::new();
            driver.add_element(
                Selector::css("#hidden"),
                ElementHandle::new("h", "div").with_displayed(false),
            );
            assert!(Condition::Present(Selector::css("#hidden"))
                .evaluate(&driver)
                .await
                .unwrap());
            assert!(!Condition::Visible(Selector::css("#hidden"))
                .evaluate(&driver)
                .await
                .unwrap());
        }

        #[tokio::test(start_paused = true)]
        async fn test_document_ready_and_title() {
            let driver = MockDriver::new();
            driver.on_script("return document.readyState;", json!("complete"));
            driver.on_script("return document.title;", json!("Example Domain"));
            assert!(Condition::DocumentReady.evaluate(&driver).await.unwrap());
            assert!(Condition::TitleContains("Example".into())
                .evaluate(&driver)
                .await
                .unwrap());
        }

        #[test]
        fn test_text_in_renders_script() {
            let cond = Condition::text_in(&Selector::css("p"), "I\u{2019}ll");
            match cond {
                Condition::Script(js) => {
                    assert!(js.starts_with("return "));
                    assert!(js.contains('\u{2019}'));
                }
                other => panic!("unexpected: {other}"),
            }
        }

        #[test]
        fn test_yaml_condition_forms() {
            let c: Condition = serde_yaml_ng::from_str("url_contains: /dashboard").unwrap();
            assert_eq!(c, Condition::UrlContains("/dashboard".into()));
            let c: Condition = serde_yaml_ng::from_str("document_ready").unwrap();
            assert_eq!(c, Condition::DocumentReady);
            let c: Condition = serde_yaml_ng::from_str("visible:\n  css: '#email'").unwrap();
            assert_eq!(c, Condition::Visible(Selector::css("#email")));
        }
    }

    mod waiter_tests {
        use super::*;

        #[tokio::test(start_paused = true)]
        async fn test_until_element_appears() {
            let driver = MockDriver::new();
            driver.add_element_after(
                Selector::css("#name"),
                ElementHandle::new("name", "input"),
                Duration::from_secs(2),
            );
            let result = waiter(10_000, 500)
                .until(&driver, &Condition::Present(Selector::css("#name")))
                .await;
            assert!(result.success);
            assert!(result.elapsed >= Duration::from_secs(2));
            assert!(result.elapsed < Duration::from_millis(2_600));
        }

        #[tokio::test(start_paused = true)]
        async fn test_until_any_straight_quote_matches() {
            let driver = MockDriver::new();
            let curly = Condition::script("return document.body.innerText.includes('I\u{2019}ll');");
            let straight = Condition::script("return document.body.innerText.includes(\"I'll\");");
            driver.on_script_after(
                "return document.body.innerText.includes(\"I'll\");",
                json!(true),
                Duration::from_secs(1),
            );

            let result = waiter(5_000, 250)
                .until_any(&driver, &[curly, straight])
                .await;
            assert!(result.success);
            assert_eq!(result.matched, Some(1));
            assert!(result.waited_for.contains(" or "));
        }

        #[tokio::test(start_paused = true)]
        async fn test_until_any_none_true_times_out() {
            let driver = MockDriver::new();
            let result = waiter(1_000, 250)
                .until_any(
                    &driver,
                    &[
                        Condition::HashEquals("#contact".into()),
                        Condition::Visible(Selector::css("h2")),
                    ],
                )
                .await;
            assert!(!result.success);
            assert_eq!(result.matched, None);
            assert!(result.elapsed >= Duration::from_secs(1));
        }

        #[tokio::test(start_paused = true)]
        async fn test_script_errors_keep_polling() {
            let driver = MockDriver::new();
            driver.on_script_error_until(
                "return document.querySelector('#root').innerText.length > 10;",
                json!(true),
                Duration::from_millis(800),
            );
            let result = waiter(5_000, 200)
                .until(
                    &driver,
                    &Condition::script("return document.querySelector('#root').innerText.length > 10;"),
                )
                .await;
            assert!(result.success);
            assert!(result.elapsed >= Duration::from_millis(800));
        }
    }
}
