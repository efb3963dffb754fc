//! Suite lifecycle: one session, many scenarios.
//!
//! ```text
//! before_all ──► acquire session ──► navigate base_url ──► readiness wait
//!     │ SessionAcquisition: abort, nothing captured
//!     ▼
//! for each scenario:  NotStarted ─► Running ─► Passed | Failed | Skipped
//!                                                 │
//!                                   Failed ──► after_each_on_failure (capture)
//!     ▼
//! after_all ──► mirror artifacts ──► release session (always)
//! ```

use futures::FutureExt;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::Instrument;

use crate::artifact::{ArtifactCapturer, ArtifactConfig, DebugArtifact};
use crate::driver::BrowserDriver;
use crate::reporter::{Attachments, Reporter, TestResultEntry};
use crate::result::{SondaError, SondaResult};
use crate::session::Session;
use crate::wait::{Condition, WaitOptions, Waiter};

/// Default per-scenario timeout (5 minutes)
pub const DEFAULT_SCENARIO_TIMEOUT_MS: u64 = 300_000;

/// Lifecycle state of one test
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestState {
    /// Not yet run
    NotStarted,
    /// Body executing
    Running,
    /// Finished successfully
    Passed,
    /// Finished with an error
    Failed,
    /// Not executed
    Skipped,
}

impl TestState {
    /// Whether the state is final
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Passed | Self::Failed | Self::Skipped)
    }

    /// Move to `next` if the lifecycle allows it
    ///
    /// # Errors
    ///
    /// Returns [`SondaError::InvalidTransition`] otherwise.
    pub fn transition(self, next: Self) -> SondaResult<Self> {
        let allowed = matches!(
            (self, next),
            (Self::NotStarted, Self::Running | Self::Skipped)
                | (Self::Running, Self::Passed | Self::Failed | Self::Skipped)
        );
        if allowed {
            Ok(next)
        } else {
            Err(SondaError::InvalidTransition {
                from: self.to_string(),
                to: next.to_string(),
            })
        }
    }
}

impl fmt::Display for TestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NotStarted => "not-started",
            Self::Running => "running",
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        };
        f.write_str(name)
    }
}

/// Everything a scenario body may use
#[derive(Debug)]
pub struct TestContext {
    session: Session,
    name: String,
    base_url: Option<String>,
    wait: WaitOptions,
    span: tracing::Span,
}

impl TestContext {
    /// Create a context for one scenario
    #[must_use]
    pub fn new(session: Session, name: impl Into<String>) -> Self {
        let name = name.into();
        let span = tracing::info_span!("scenario", name = %name);
        Self {
            session,
            name,
            base_url: None,
            wait: WaitOptions::default(),
            span,
        }
    }

    /// Set base URL for relative paths
    #[must_use]
    pub fn with_base_url(mut self, base_url: Option<String>) -> Self {
        self.base_url = base_url;
        self
    }

    /// Set default wait options
    #[must_use]
    pub fn with_wait(mut self, wait: WaitOptions) -> Self {
        self.wait = wait;
        self
    }

    /// The live driver
    ///
    /// # Errors
    ///
    /// Fails if the session was released.
    pub fn driver(&self) -> SondaResult<&dyn BrowserDriver> {
        self.session.driver()
    }

    /// The session
    #[must_use]
    pub const fn session(&self) -> &Session {
        &self.session
    }

    /// Scenario name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Logging span of the scenario
    #[must_use]
    pub const fn span(&self) -> &tracing::Span {
        &self.span
    }

    /// Default wait options
    #[must_use]
    pub const fn wait_options(&self) -> &WaitOptions {
        &self.wait
    }

    /// Waiter with the default options
    #[must_use]
    pub fn waiter(&self) -> Waiter {
        Waiter::with_options(self.wait.clone())
    }

    /// Resolve a possibly relative URL against the base URL
    ///
    /// # Errors
    ///
    /// Fails for a relative URL when no base URL is set.
    pub fn url(&self, target: &str) -> SondaResult<String> {
        resolve_url(self.base_url.as_deref(), target)
    }
}

/// Join `target` onto `base` unless it is already absolute
///
/// # Errors
///
/// Fails for a relative target without a base.
pub fn resolve_url(base: Option<&str>, target: &str) -> SondaResult<String> {
    let absolute = ["http://", "https://", "about:", "file://", "data:"]
        .iter()
        .any(|scheme| target.starts_with(scheme));
    if absolute {
        return Ok(target.to_string());
    }
    let base = base.ok_or_else(|| SondaError::Config {
        message: format!("relative url '{target}' needs a base url"),
    })?;
    if target.starts_with('#') || target.starts_with('?') {
        return Ok(format!("{base}{target}"));
    }
    Ok(format!(
        "{}/{}",
        base.trim_end_matches('/'),
        target.trim_start_matches('/')
    ))
}

/// Future returned by a scenario body
pub type ScenarioFuture<'a> = Pin<Box<dyn Future<Output = SondaResult<()>> + 'a>>;

type ScenarioBody = Arc<dyn for<'a> Fn(&'a TestContext) -> ScenarioFuture<'a> + Send + Sync>;

/// A named test run against the shared session
#[derive(Clone)]
pub struct Scenario {
    /// Scenario name
    pub name: String,
    /// Free-form description
    pub description: Option<String>,
    /// Tags for filtering
    pub tags: Vec<String>,
    /// Skip with this reason
    pub skip: Option<String>,
    /// Timeout override
    pub timeout: Option<Duration>,
    /// Base URL used when the suite sets none
    pub base_url: Option<String>,
    body: ScenarioBody,
}

impl fmt::Debug for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scenario")
            .field("name", &self.name)
            .field("tags", &self.tags)
            .field("skip", &self.skip)
            .field("timeout", &self.timeout)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl Scenario {
    /// Create a scenario from an async body
    ///
    /// ```ignore
    /// let s = Scenario::new("title", |ctx| Box::pin(async move {
    ///     ctx.driver()?.navigate(&ctx.url("/")?).await
    /// }));
    /// ```
    pub fn new<F>(name: impl Into<String>, body: F) -> Self
    where
        F: for<'a> Fn(&'a TestContext) -> ScenarioFuture<'a> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            description: None,
            tags: Vec::new(),
            skip: None,
            timeout: None,
            base_url: None,
            body: Arc::new(body),
        }
    }

    /// Set description
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Add a tag
    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Mark as skipped
    #[must_use]
    pub fn skipped(mut self, reason: impl Into<String>) -> Self {
        self.skip = Some(reason.into());
        self
    }

    /// Set timeout
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the fallback base URL
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Whether the scenario passes a name filter and a tag filter
    #[must_use]
    pub fn matches(&self, name_filter: Option<&str>, tags: &[String]) -> bool {
        let name_ok = name_filter.map_or(true, |f| self.name.contains(f));
        let tags_ok = tags.is_empty() || tags.iter().any(|t| self.tags.contains(t));
        name_ok && tags_ok
    }
}

/// Suite-wide settings
#[derive(Debug, Clone)]
pub struct SuiteConfig {
    /// Suite name for reports
    pub name: String,
    /// Base URL for relative navigation, opened in `before_all`
    pub base_url: Option<String>,
    /// Conditions that must all hold after the initial navigation
    pub readiness: Vec<Condition>,
    /// Default wait options for scenarios and readiness
    pub wait: WaitOptions,
    /// Stop after the first failure
    pub fail_fast: bool,
    /// Default per-scenario timeout
    pub scenario_timeout: Duration,
    /// Name substring filter
    pub filter: Option<String>,
    /// Tag filter (any of)
    pub tags: Vec<String>,
    /// Artifact directories
    pub artifacts: ArtifactConfig,
}

impl Default for SuiteConfig {
    fn default() -> Self {
        Self {
            name: "Sonda Suite".to_string(),
            base_url: None,
            readiness: vec![Condition::DocumentReady],
            wait: WaitOptions::default(),
            fail_fast: false,
            scenario_timeout: Duration::from_millis(DEFAULT_SCENARIO_TIMEOUT_MS),
            filter: None,
            tags: Vec::new(),
            artifacts: ArtifactConfig::default(),
        }
    }
}

impl SuiteConfig {
    /// Readiness used by single-page applications mounted on `#root`
    #[must_use]
    pub fn spa_readiness() -> Vec<Condition> {
        vec![
            Condition::DocumentReady,
            Condition::script(
                "const root = document.querySelector('#root'); \
                 return !!root && root.innerText.trim().length > 10;",
            ),
        ]
    }
}

/// Runs scenarios against one shared session
#[derive(Debug)]
pub struct SuiteRunner {
    config: SuiteConfig,
    capturer: ArtifactCapturer,
    reporter: Reporter,
    session: Option<Session>,
}

impl SuiteRunner {
    /// Create a runner
    #[must_use]
    pub fn new(config: SuiteConfig) -> Self {
        let reporter = if config.fail_fast {
            Reporter::fail_fast()
        } else {
            Reporter::new()
        }
        .with_name(config.name.clone());
        Self {
            capturer: ArtifactCapturer::new(config.artifacts.clone()),
            config,
            reporter,
            session: None,
        }
    }

    /// Configuration
    #[must_use]
    pub const fn config(&self) -> &SuiteConfig {
        &self.config
    }

    /// Results so far
    #[must_use]
    pub const fn reporter(&self) -> &Reporter {
        &self.reporter
    }

    /// Acquire the session and wait for the base page to be ready.
    ///
    /// # Errors
    ///
    /// [`SondaError::SessionAcquisition`] if the browser cannot be started;
    /// navigation or readiness errors after releasing the session.
    pub async fn before_all<F, Fut>(&mut self, launch: F) -> SondaResult<()>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = SondaResult<Arc<dyn BrowserDriver>>>,
    {
        self.reporter.start();
        let session = Session::acquire(launch).await?;
        self.session = Some(session.clone());

        let Some(base_url) = self.config.base_url.clone() else {
            return Ok(());
        };
        if let Err(e) = self.open_base(&session, &base_url).await {
            tracing::error!(error = %e, url = %base_url, "suite setup failed");
            self.after_all().await;
            return Err(e);
        }
        Ok(())
    }

    async fn open_base(&self, session: &Session, base_url: &str) -> SondaResult<()> {
        let driver = session.driver()?;
        driver.navigate(base_url).await?;
        let waiter = Waiter::with_options(self.config.wait.clone());
        for condition in &self.config.readiness {
            waiter.until(driver, condition).await.into_result()?;
        }
        tracing::info!(url = base_url, "base page ready");
        Ok(())
    }

    /// Capture debug artifacts for a failed test
    pub async fn after_each_on_failure(&self, test_name: &str) -> Option<DebugArtifact> {
        let session = self.session.as_ref()?;
        let driver = match session.driver() {
            Ok(driver) => driver,
            Err(e) => {
                tracing::warn!(test = test_name, error = %e, "no session for debug capture");
                return None;
            }
        };
        self.capturer.capture_on_failure(test_name, driver).await
    }

    /// Mirror artifacts and release the session
    pub async fn after_all(&mut self) {
        let mirrored = self.capturer.mirror_all();
        if mirrored > 0 {
            tracing::info!(files = mirrored, "debug artifacts mirrored");
        }
        if let Some(session) = self.session.take() {
            session.release().await;
        }
    }

    /// Run one scenario and record its result.
    ///
    /// Returns `false` when fail-fast mode asks to stop.
    pub async fn run_scenario(&mut self, scenario: &Scenario) -> bool {
        let mut state = TestState::NotStarted;

        if let Some(reason) = &scenario.skip {
            state = advance(state, TestState::Skipped);
            tracing::info!(test = %scenario.name, %state, reason = %reason, "scenario skipped");
            return self.record(
                TestResultEntry::skipped(&scenario.name, reason).with_tags(scenario.tags.clone()),
            );
        }

        let Some(session) = self.session.clone() else {
            let entry = TestResultEntry::failed(
                &scenario.name,
                Duration::ZERO,
                SondaError::SessionReleased.to_string(),
            );
            return self.record(entry);
        };

        state = advance(state, TestState::Running);
        tracing::info!(test = %scenario.name, %state, "scenario started");
        let started = Instant::now();
        let started_ms = chrono::Utc::now().timestamp_millis();
        let outcome = self.execute(scenario, session).await;
        let elapsed = started.elapsed();

        let entry = match outcome {
            Ok(()) => {
                state = advance(state, TestState::Passed);
                TestResultEntry::passed(&scenario.name, elapsed)
            }
            Err(e) => {
                state = advance(state, TestState::Failed);
                tracing::error!(test = %scenario.name, error = %e, "scenario failed");
                let attachments = match self.after_each_on_failure(&scenario.name).await {
                    Some(artifact) => Attachments::from(&artifact),
                    None => Attachments::from(self.capturer.latest_for(&scenario.name, started_ms)),
                };
                TestResultEntry::failed(&scenario.name, elapsed, e.to_string()).with_attachments(attachments)
            }
        };
        tracing::info!(test = %scenario.name, %state, elapsed_ms = elapsed.as_millis() as u64, "scenario finished");
        self.record(entry.with_tags(scenario.tags.clone()))
    }

    async fn execute(&self, scenario: &Scenario, session: Session) -> SondaResult<()> {
        let base_url = self
            .config
            .base_url
            .clone()
            .or_else(|| scenario.base_url.clone());
        let ctx = TestContext::new(session, &scenario.name)
            .with_base_url(base_url)
            .with_wait(self.config.wait.clone());
        let limit = scenario.timeout.unwrap_or(self.config.scenario_timeout);
        let span = ctx.span().clone();
        let body = (scenario.body)(&ctx);

        let guarded = AssertUnwindSafe(tokio::time::timeout(limit, body))
            .catch_unwind()
            .instrument(span)
            .await;
        match guarded {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(SondaError::WaitTimeout {
                ms: limit.as_millis() as u64,
                waited_for: format!("scenario '{}' to finish", scenario.name),
            }),
            Err(panic) => Err(SondaError::AssertionFailed {
                message: format!("scenario panicked: {}", panic_message(panic.as_ref())),
            }),
        }
    }

    fn record(&mut self, entry: TestResultEntry) -> bool {
        self.reporter.record(entry).is_ok()
    }

    /// Run the whole suite and hand back the reporter.
    ///
    /// Scenarios not matching the filters are left out. With fail-fast the
    /// scenarios after the first failure are reported as skipped. The
    /// session is released on every path.
    ///
    /// # Errors
    ///
    /// Only setup errors from [`SuiteRunner::before_all`].
    pub async fn run<F, Fut>(self, launch: F, scenarios: &[Scenario]) -> SondaResult<Reporter>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = SondaResult<Arc<dyn BrowserDriver>>>,
    {
        self.run_observed(launch, scenarios, |_| {}).await
    }

    /// Like [`SuiteRunner::run`], calling `observe` with each recorded result
    ///
    /// # Errors
    ///
    /// Only setup errors from [`SuiteRunner::before_all`].
    pub async fn run_observed<F, Fut, O>(
        mut self,
        launch: F,
        scenarios: &[Scenario],
        mut observe: O,
    ) -> SondaResult<Reporter>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = SondaResult<Arc<dyn BrowserDriver>>>,
        O: FnMut(&TestResultEntry),
    {
        let selected: Vec<&Scenario> = scenarios
            .iter()
            .filter(|s| s.matches(self.config.filter.as_deref(), &self.config.tags))
            .collect();
        tracing::info!(suite = %self.config.name, scenarios = selected.len(), "suite starting");

        self.before_all(launch).await?;

        let outcome = AssertUnwindSafe(async {
            let mut remaining = selected.iter();
            for scenario in remaining.by_ref() {
                let go_on = self.run_scenario(scenario).await;
                if let Some(entry) = self.reporter.results().last() {
                    observe(entry);
                }
                if !go_on {
                    break;
                }
            }
            for scenario in remaining {
                let entry = TestResultEntry::skipped(
                    &scenario.name,
                    "fail-fast: an earlier scenario failed",
                )
                .with_tags(scenario.tags.clone());
                observe(&entry);
                let _ = self.reporter.record(entry);
            }
        })
        .catch_unwind()
        .await;

        self.after_all().await;
        if let Err(panic) = outcome {
            std::panic::resume_unwind(panic);
        }
        tracing::info!(summary = %self.reporter.summary(), "suite finished");
        Ok(self.reporter)
    }
}

fn advance(state: TestState, next: TestState) -> TestState {
    match state.transition(next) {
        Ok(next) => next,
        Err(e) => {
            tracing::warn!(error = %e, "ignoring test state change");
            state
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::driver::{ElementHandle, MockDriver};
    use crate::locator::{LocatorChain, Selector};
    use crate::reporter::TestStatus;
    use serde_json::json;
    use tempfile::TempDir;

    fn config(dir: &TempDir) -> SuiteConfig {
        SuiteConfig {
            base_url: Some("https://site.test".into()),
            readiness: vec![Condition::DocumentReady],
            wait: WaitOptions::new().with_timeout(2_000).with_poll_interval(100),
            artifacts: ArtifactConfig::in_dir(dir.path().join("test-debug"))
                .with_mirror(dir.path().join("mirror")),
            ..SuiteConfig::default()
        }
    }

    fn ready_mock() -> Arc<MockDriver> {
        let mock = Arc::new(MockDriver::new());
        mock.on_script("return document.readyState;", json!("complete"));
        mock.set_page_source(Some("<html>page</html>".into()));
        mock.set_screenshot(Some(vec![0x89, b'P', b'N', b'G']));
        mock
    }

    fn launcher(
        mock: &Arc<MockDriver>,
    ) -> impl FnOnce() -> std::future::Ready<SondaResult<Arc<dyn BrowserDriver>>> {
        let driver: Arc<dyn BrowserDriver> = mock.clone();
        move || std::future::ready(Ok(driver))
    }

    fn passing(name: &str) -> Scenario {
        Scenario::new(name, |ctx| {
            Box::pin(async move {
                ctx.driver()?.navigate(&ctx.url("/ok")?).await?;
                Ok(())
            })
        })
    }

    fn failing(name: &str) -> Scenario {
        Scenario::new(name, |ctx| {
            Box::pin(async move {
                let driver = ctx.driver()?;
                LocatorChain::single(Selector::css("#missing"))
                    .with_fallback(WaitOptions::new().with_timeout(300).with_poll_interval(100))
                    .resolve(driver)
                    .await?;
                Ok(())
            })
        })
    }

    mod state_tests {
        use super::*;

        #[test]
        fn test_legal_transitions() {
            let running = TestState::NotStarted.transition(TestState::Running).unwrap();
            assert_eq!(running.transition(TestState::Failed).unwrap(), TestState::Failed);
            assert!(TestState::NotStarted
                .transition(TestState::Skipped)
                .unwrap()
                .is_terminal());
        }

        #[test]
        fn test_illegal_transitions_rejected() {
            assert!(TestState::NotStarted.transition(TestState::Passed).is_err());
            assert!(TestState::Passed.transition(TestState::Running).is_err());
            let err = TestState::Failed.transition(TestState::Passed).unwrap_err();
            assert_eq!(err.to_string(), "Illegal test state transition failed -> passed");
        }
    }

    mod url_tests {
        use super::*;

        #[test]
        fn test_resolve_url() {
            let base = Some("https://site.test/");
            assert_eq!(resolve_url(base, "/admin").unwrap(), "https://site.test/admin");
            assert_eq!(resolve_url(base, "admin").unwrap(), "https://site.test/admin");
            assert_eq!(
                resolve_url(Some("https://site.test"), "#contact").unwrap(),
                "https://site.test#contact"
            );
            assert_eq!(
                resolve_url(None, "https://example.com").unwrap(),
                "https://example.com"
            );
            assert!(resolve_url(None, "/admin").is_err());
        }
    }

    mod scenario_tests {
        use super::*;

        #[test]
        fn test_matches_filters() {
            let s = passing("contact form submits").with_tag("smoke");
            assert!(s.matches(None, &[]));
            assert!(s.matches(Some("contact"), &[]));
            assert!(!s.matches(Some("admin"), &[]));
            assert!(s.matches(None, &["smoke".to_string()]));
            assert!(!s.matches(None, &["slow".to_string()]));
        }
    }

    mod runner_tests {
        use super::*;

        #[tokio::test(start_paused = true)]
        async fn test_pass_fail_skip_release_once() {
            let dir = TempDir::new().unwrap();
            let mock = ready_mock();
            let scenarios = vec![
                passing("loads"),
                failing("finds missing"),
                passing("admin").skipped("no credentials"),
            ];

            let reporter = SuiteRunner::new(config(&dir))
                .run(launcher(&mock), &scenarios)
                .await
                .unwrap();

            assert_eq!(reporter.passed_count(), 1);
            assert_eq!(reporter.failed_count(), 1);
            assert_eq!(reporter.skipped_count(), 1);
            assert_eq!(mock.quit_count(), 1);
            assert!(mock.was_called("navigate:https://site.test/ok"));
        }

        #[tokio::test(start_paused = true)]
        async fn test_failure_captures_and_attaches() {
            let dir = TempDir::new().unwrap();
            let mock = ready_mock();
            let reporter = SuiteRunner::new(config(&dir))
                .run(launcher(&mock), &[failing("finds missing")])
                .await
                .unwrap();

            let entry = &reporter.results()[0];
            assert_eq!(entry.status, TestStatus::Failed);
            assert!(entry.error.as_deref().unwrap().starts_with("Element not found"));
            let png = entry.attachments.screenshot.clone().unwrap();
            assert!(png.starts_with(dir.path().join("test-debug")));
            assert!(png.file_name().unwrap().to_str().unwrap().starts_with("finds_missing-"));
            // mirrored during capture and again at suite end
            assert!(dir.path().join("mirror").join(png.file_name().unwrap()).exists());
        }

        #[tokio::test(start_paused = true)]
        async fn test_failed_capture_does_not_attach_earlier_runs() {
            let dir = TempDir::new().unwrap();
            let primary = dir.path().join("test-debug");
            std::fs::create_dir_all(&primary).unwrap();
            std::fs::write(primary.join("finds_missing-1000.png"), b"last week").unwrap();
            std::fs::write(primary.join("finds_missing-1000.html"), b"last week").unwrap();

            let mock = Arc::new(MockDriver::new());
            mock.on_script("return document.readyState;", json!("complete"));
            let reporter = SuiteRunner::new(config(&dir))
                .run(launcher(&mock), &[failing("finds missing")])
                .await
                .unwrap();

            let entry = &reporter.results()[0];
            assert_eq!(entry.status, TestStatus::Failed);
            assert!(entry.attachments.is_empty());
        }

        #[tokio::test(start_paused = true)]
        async fn test_attachments_are_this_failures_capture() {
            let dir = TempDir::new().unwrap();
            let primary = dir.path().join("test-debug");
            std::fs::create_dir_all(&primary).unwrap();
            // stamped far in the future, newer than anything captured now
            std::fs::write(primary.join("finds_missing-99999999999999.html"), b"stale").unwrap();

            let mock = ready_mock();
            let reporter = SuiteRunner::new(config(&dir))
                .run(launcher(&mock), &[failing("finds missing")])
                .await
                .unwrap();

            let html = reporter.results()[0].attachments.html.clone().unwrap();
            assert_ne!(html, primary.join("finds_missing-99999999999999.html"));
            assert_eq!(std::fs::read_to_string(html).unwrap(), "<html>page</html>");
        }

        #[tokio::test(start_paused = true)]
        async fn test_passing_scenario_captures_nothing() {
            let dir = TempDir::new().unwrap();
            let mock = ready_mock();
            SuiteRunner::new(config(&dir))
                .run(launcher(&mock), &[passing("loads")])
                .await
                .unwrap();
            assert!(!dir.path().join("test-debug").exists());
        }

        #[tokio::test(start_paused = true)]
        async fn test_session_acquisition_failure_aborts_without_capture() {
            let dir = TempDir::new().unwrap();
            let result = SuiteRunner::new(config(&dir))
                .run(
                    || async {
                        Err::<Arc<dyn BrowserDriver>, _>(SondaError::driver("cannot find chromium"))
                    },
                    &[failing("never runs")],
                )
                .await;

            assert!(matches!(result, Err(SondaError::SessionAcquisition { .. })));
            assert!(!dir.path().join("test-debug").exists());
        }

        #[tokio::test(start_paused = true)]
        async fn test_readiness_failure_releases_session() {
            let dir = TempDir::new().unwrap();
            let mock = Arc::new(MockDriver::new());
            let result = SuiteRunner::new(config(&dir))
                .run(launcher(&mock), &[passing("loads")])
                .await;

            assert!(matches!(result, Err(SondaError::WaitTimeout { .. })));
            assert_eq!(mock.quit_count(), 1);
        }

        #[tokio::test(start_paused = true)]
        async fn test_fail_fast_skips_remaining() {
            let dir = TempDir::new().unwrap();
            let mock = ready_mock();
            let mut cfg = config(&dir);
            cfg.fail_fast = true;
            let reporter = SuiteRunner::new(cfg)
                .run(launcher(&mock), &[failing("a"), passing("b"), passing("c")])
                .await
                .unwrap();

            let statuses: Vec<TestStatus> = reporter.results().iter().map(|r| r.status).collect();
            assert_eq!(
                statuses,
                vec![TestStatus::Failed, TestStatus::Skipped, TestStatus::Skipped]
            );
            assert!(!mock.was_called("navigate:https://site.test/ok"));
        }

        #[tokio::test(start_paused = true)]
        async fn test_scenario_timeout() {
            let dir = TempDir::new().unwrap();
            let mock = ready_mock();
            let slow = Scenario::new("slow", |_ctx| {
                Box::pin(async move {
                    tokio::time::sleep(Duration::from_secs(60)).await;
                    Ok(())
                })
            })
            .with_timeout(Duration::from_secs(5));

            let reporter = SuiteRunner::new(config(&dir))
                .run(launcher(&mock), &[slow])
                .await
                .unwrap();
            let error = reporter.results()[0].error.clone().unwrap();
            assert!(error.contains("5000ms"));
            assert!(error.contains("scenario 'slow'"));
        }

        #[tokio::test(start_paused = true)]
        async fn test_panicking_scenario_fails_and_releases() {
            let dir = TempDir::new().unwrap();
            let mock = ready_mock();
            let boom = Scenario::new("boom", |_ctx| {
                Box::pin(async move {
                    let items: Vec<u8> = Vec::new();
                    assert!(!items.is_empty(), "page had no items");
                    Ok(())
                })
            });

            let reporter = SuiteRunner::new(config(&dir))
                .run(launcher(&mock), &[boom, passing("after")])
                .await
                .unwrap();
            assert!(reporter.results()[0]
                .error
                .as_deref()
                .unwrap()
                .contains("page had no items"));
            assert_eq!(reporter.passed_count(), 1);
            assert_eq!(mock.quit_count(), 1);
        }

        #[tokio::test(start_paused = true)]
        async fn test_observer_sees_every_result() {
            let dir = TempDir::new().unwrap();
            let mock = ready_mock();
            let mut cfg = config(&dir);
            cfg.fail_fast = true;
            let mut seen = Vec::new();
            SuiteRunner::new(cfg)
                .run_observed(launcher(&mock), &[passing("a"), failing("b"), passing("c")], |e| {
                    seen.push((e.name.clone(), e.status));
                })
                .await
                .unwrap();
            assert_eq!(
                seen,
                vec![
                    ("a".to_string(), TestStatus::Passed),
                    ("b".to_string(), TestStatus::Failed),
                    ("c".to_string(), TestStatus::Skipped),
                ]
            );
        }

        #[tokio::test(start_paused = true)]
        async fn test_scenario_base_url_applies_without_suite_base() {
            let dir = TempDir::new().unwrap();
            let mock = ready_mock();
            let mut cfg = config(&dir);
            cfg.base_url = None;
            let reporter = SuiteRunner::new(cfg)
                .run(
                    launcher(&mock),
                    &[passing("own base").with_base_url("https://other.test")],
                )
                .await
                .unwrap();
            assert!(reporter.all_passed());
            assert!(mock.was_called("navigate:https://other.test/ok"));
        }

        #[tokio::test(start_paused = true)]
        async fn test_filters_leave_scenarios_out() {
            let dir = TempDir::new().unwrap();
            let mock = ready_mock();
            let mut cfg = config(&dir);
            cfg.tags = vec!["smoke".into()];
            let reporter = SuiteRunner::new(cfg)
                .run(
                    launcher(&mock),
                    &[passing("a").with_tag("smoke"), passing("b")],
                )
                .await
                .unwrap();
            assert_eq!(reporter.total_count(), 1);
        }

        #[tokio::test(start_paused = true)]
        async fn test_context_resolves_late_element() {
            let dir = TempDir::new().unwrap();
            let mock = ready_mock();
            mock.add_element_after(
                Selector::css("#name"),
                ElementHandle::new("name", "input"),
                Duration::from_secs(1),
            );
            let fill = Scenario::new("fill", |ctx| {
                Box::pin(async move {
                    let driver = ctx.driver()?;
                    let el = LocatorChain::single(Selector::css("#name")).resolve(driver).await?;
                    crate::actions::fill(driver, &el, "Jane").await
                })
            });
            let reporter = SuiteRunner::new(config(&dir))
                .run(launcher(&mock), &[fill])
                .await
                .unwrap();
            assert!(reporter.all_passed());
            assert_eq!(mock.value_of("name").as_deref(), Some("Jane"));
        }
    }
}
