//! Declarative scenarios loaded from YAML.
//!
//! ```yaml
//! base_url: https://example.com
//! scenarios:
//!   - name: contact form
//!     tags: [smoke]
//!     steps:
//!       - action: navigate
//!         url: /#contact
//!       - action: fill
//!         locate: [{css: "#name"}, {test_id: name-input}]
//!         text: Jane
//!       - action: click
//!         locate: [{text: Send}]
//!       - action: wait_for
//!         any: [{url_contains: thanks}]
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::actions;
use crate::fallback::StrategyChain;
use crate::harness::{Scenario, TestContext};
use crate::locator::{LocatorChain, Selector};
use crate::result::{SondaError, SondaResult};
use crate::wait::{Condition, WaitOptions, Waiter};

/// A YAML scenario file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioFile {
    /// Base URL for this file's scenarios when the suite sets none
    #[serde(default)]
    pub base_url: Option<String>,
    /// Scenarios in run order
    pub scenarios: Vec<ScenarioSpec>,
}

/// One scenario as written in YAML
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioSpec {
    /// Unique name
    pub name: String,
    /// Free-form description
    #[serde(default)]
    pub description: Option<String>,
    /// Tags for filtering
    #[serde(default)]
    pub tags: Vec<String>,
    /// Skip with this reason
    #[serde(default)]
    pub skip: Option<String>,
    /// Timeout override
    #[serde(default)]
    pub timeout_ms: Option<u64>,
    /// Steps in order
    pub steps: Vec<Step>,
}

/// One scenario step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    /// Open a URL (relative to the base URL unless absolute)
    Navigate { url: String },
    /// Wait for `document.readyState == "complete"`
    WaitReady {
        #[serde(default)]
        timeout_ms: Option<u64>,
    },
    /// Resolve, scroll into view, click via script
    Click {
        locate: Vec<Selector>,
        #[serde(default)]
        timeout_ms: Option<u64>,
    },
    /// Clear and type into an input
    Fill {
        locate: Vec<Selector>,
        text: String,
        #[serde(default)]
        timeout_ms: Option<u64>,
    },
    /// Clear an input
    Clear {
        locate: Vec<Selector>,
        #[serde(default)]
        timeout_ms: Option<u64>,
    },
    /// Wait until any condition holds
    WaitFor {
        any: Vec<Condition>,
        #[serde(default)]
        timeout_ms: Option<u64>,
    },
    /// Fail unless an element resolves
    AssertPresent {
        locate: Vec<Selector>,
        #[serde(default)]
        timeout_ms: Option<u64>,
    },
    /// Fail unless the script returns a truthy value
    AssertScript {
        script: String,
        #[serde(default)]
        message: Option<String>,
    },
    /// Fail unless the URL contains the string
    AssertUrl { contains: String },
    /// Fail unless the attribute has the value
    AssertAttribute {
        locate: Vec<Selector>,
        name: String,
        equals: String,
    },
    /// Fail unless the title contains the string
    AssertTitle { contains: String },
    /// Fail unless the form control passes constraint validation
    AssertValid { css: String },
    /// Fail unless the form control fails constraint validation
    AssertInvalid { css: String },
    /// Resolve and scroll into view
    ScrollIntoView { locate: Vec<Selector> },
    /// Set `location.hash`
    SetHash { hash: String },
    /// Try alternative strategies until one is verified
    Strategies(StrategyChain),
    /// Open a URL in a new window
    OpenWindow {
        url: String,
        #[serde(default)]
        switch: bool,
    },
    /// Focus the window at this position (oldest first)
    SwitchWindow { index: usize },
    /// Close the current window
    CloseWindow,
    /// Pause
    Sleep { ms: u64 },
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Navigate { url } => write!(f, "navigate {url}"),
            Self::WaitReady { .. } => write!(f, "wait ready"),
            Self::Click { locate, .. } => write!(f, "click [{}]", chain_of(locate)),
            Self::Fill { locate, .. } => write!(f, "fill [{}]", chain_of(locate)),
            Self::Clear { locate, .. } => write!(f, "clear [{}]", chain_of(locate)),
            Self::WaitFor { any, .. } => write!(f, "wait for {} condition(s)", any.len()),
            Self::AssertPresent { locate, .. } => write!(f, "assert present [{}]", chain_of(locate)),
            Self::AssertScript { .. } => write!(f, "assert script"),
            Self::AssertUrl { contains } => write!(f, "assert url contains '{contains}'"),
            Self::AssertAttribute { name, equals, .. } => write!(f, "assert {name} == '{equals}'"),
            Self::AssertTitle { contains } => write!(f, "assert title contains '{contains}'"),
            Self::AssertValid { css } => write!(f, "assert {css} valid"),
            Self::AssertInvalid { css } => write!(f, "assert {css} invalid"),
            Self::ScrollIntoView { locate } => write!(f, "scroll to [{}]", chain_of(locate)),
            Self::SetHash { hash } => write!(f, "set hash {hash}"),
            Self::Strategies(chain) => write!(f, "{} strategies", chain.strategies.len()),
            Self::OpenWindow { url, .. } => write!(f, "open window {url}"),
            Self::SwitchWindow { index } => write!(f, "switch to window {index}"),
            Self::CloseWindow => write!(f, "close window"),
            Self::Sleep { ms } => write!(f, "sleep {ms}ms"),
        }
    }
}

fn chain_of(locate: &[Selector]) -> LocatorChain {
    LocatorChain::new(locate.iter().cloned())
}

fn options(ctx: &TestContext, timeout_ms: Option<u64>) -> WaitOptions {
    let base = ctx.wait_options().clone();
    match timeout_ms {
        Some(ms) => base.with_timeout(ms),
        None => base,
    }
}

fn locator(ctx: &TestContext, locate: &[Selector], timeout_ms: Option<u64>) -> LocatorChain {
    chain_of(locate).with_fallback(options(ctx, timeout_ms))
}

async fn check_validity(ctx: &TestContext, css: &str, expect_valid: bool) -> SondaResult<()> {
    if actions::check_validity(ctx.driver()?, css).await? == expect_valid {
        return Ok(());
    }
    let wanted = if expect_valid { "pass" } else { "fail" };
    Err(SondaError::assertion(format!(
        "expected {css} to {wanted} constraint validation"
    )))
}

async fn check(ctx: &TestContext, condition: &Condition, message: Option<&str>) -> SondaResult<()> {
    if condition.evaluate(ctx.driver()?).await? {
        return Ok(());
    }
    Err(SondaError::assertion(
        message.map_or_else(|| format!("expected {condition}"), str::to_string),
    ))
}

impl Step {
    /// Perform the step in a scenario context
    ///
    /// # Errors
    ///
    /// Returns the error of the failing driver call, wait or assertion.
    pub async fn run(&self, ctx: &TestContext) -> SondaResult<()> {
        let driver = ctx.driver()?;
        match self {
            Self::Navigate { url } => driver.navigate(&ctx.url(url)?).await,
            Self::WaitReady { timeout_ms } => Waiter::with_options(options(ctx, *timeout_ms))
                .until(driver, &Condition::DocumentReady)
                .await
                .into_result()
                .map(|_| ()),
            Self::Click { locate, timeout_ms } => {
                actions::click(driver, &locator(ctx, locate, *timeout_ms)).await.map(|_| ())
            }
            Self::Fill {
                locate,
                text,
                timeout_ms,
            } => {
                let element = locator(ctx, locate, *timeout_ms).resolve(driver).await?;
                actions::fill(driver, &element, text).await
            }
            Self::Clear { locate, timeout_ms } => {
                let element = locator(ctx, locate, *timeout_ms).resolve(driver).await?;
                driver.clear(&element).await
            }
            Self::WaitFor { any, timeout_ms } => Waiter::with_options(options(ctx, *timeout_ms))
                .until_any(driver, any)
                .await
                .into_result()
                .map(|_| ()),
            Self::AssertPresent { locate, timeout_ms } => {
                locator(ctx, locate, *timeout_ms).resolve(driver).await.map(|_| ())
            }
            Self::AssertScript { script, message } => {
                check(ctx, &Condition::script(script.clone()), message.as_deref()).await
            }
            Self::AssertUrl { contains } => {
                check(ctx, &Condition::UrlContains(contains.clone()), None).await
            }
            Self::AssertTitle { contains } => {
                check(ctx, &Condition::TitleContains(contains.clone()), None).await
            }
            Self::AssertValid { css } => check_validity(ctx, css, true).await,
            Self::AssertInvalid { css } => check_validity(ctx, css, false).await,
            Self::AssertAttribute {
                locate,
                name,
                equals,
            } => {
                let actual = actions::attribute(driver, &locator(ctx, locate, None), name).await?;
                if actual.as_deref() == Some(equals.as_str()) {
                    Ok(())
                } else {
                    Err(SondaError::assertion(format!(
                        "expected {name}='{equals}', found {actual:?}"
                    )))
                }
            }
            Self::ScrollIntoView { locate } => {
                let element = locator(ctx, locate, None).resolve(driver).await?;
                actions::scroll_into_view(driver, &element).await
            }
            Self::SetHash { hash } => actions::set_location_hash(driver, hash).await,
            Self::Strategies(chain) => {
                let outcome = chain.run(driver).await?;
                tracing::debug!(strategy = %outcome.name, index = outcome.index, "strategy verified");
                Ok(())
            }
            Self::OpenWindow { url, switch } => {
                let handle = driver.open_window(&ctx.url(url)?).await?;
                if *switch {
                    driver.switch_to_window(&handle).await?;
                }
                Ok(())
            }
            Self::SwitchWindow { index } => {
                let handles = driver.window_handles().await?;
                let handle = handles.get(*index).ok_or_else(|| {
                    SondaError::driver(format!(
                        "no window at index {index} ({} open)",
                        handles.len()
                    ))
                })?;
                driver.switch_to_window(handle).await
            }
            Self::CloseWindow => driver.close_window().await,
            Self::Sleep { ms } => {
                tokio::time::sleep(Duration::from_millis(*ms)).await;
                Ok(())
            }
        }
    }

    fn locate(&self) -> Option<&[Selector]> {
        match self {
            Self::Click { locate, .. }
            | Self::Fill { locate, .. }
            | Self::Clear { locate, .. }
            | Self::AssertPresent { locate, .. }
            | Self::AssertAttribute { locate, .. }
            | Self::ScrollIntoView { locate } => Some(locate),
            _ => None,
        }
    }
}

/// Run steps in order, stopping at the first error
///
/// # Errors
///
/// The first failing step's error.
pub async fn run_steps(ctx: &TestContext, steps: &[Step]) -> SondaResult<()> {
    for (index, step) in steps.iter().enumerate() {
        tracing::debug!(test = ctx.name(), step = index + 1, action = %step, "step");
        step.run(ctx).await?;
    }
    Ok(())
}

impl ScenarioSpec {
    /// Turn into a runnable scenario
    #[must_use]
    pub fn into_scenario(self) -> Scenario {
        let steps = Arc::new(self.steps);
        let mut scenario = Scenario::new(self.name, move |ctx| {
            let steps = Arc::clone(&steps);
            Box::pin(async move { run_steps(ctx, &steps).await })
        });
        scenario.description = self.description;
        scenario.tags = self.tags;
        scenario.skip = self.skip;
        scenario.timeout = self.timeout_ms.map(Duration::from_millis);
        scenario
    }
}

impl ScenarioFile {
    /// Parse and validate YAML text
    ///
    /// # Errors
    ///
    /// Returns [`SondaError::ScenarioParse`] for bad YAML or invalid content.
    pub fn from_yaml(source_name: &str, text: &str) -> SondaResult<Self> {
        let file: Self = serde_yaml_ng::from_str(text).map_err(|e| SondaError::ScenarioParse {
            source_name: source_name.to_string(),
            message: e.to_string(),
        })?;
        file.validate().map_err(|message| SondaError::ScenarioParse {
            source_name: source_name.to_string(),
            message,
        })?;
        Ok(file)
    }

    /// Read and parse a file
    ///
    /// # Errors
    ///
    /// I/O errors or [`SondaError::ScenarioParse`].
    pub fn load(path: &Path) -> SondaResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml(&path.display().to_string(), &text)
    }

    fn validate(&self) -> Result<(), String> {
        let mut seen = HashSet::new();
        for spec in &self.scenarios {
            if spec.name.trim().is_empty() {
                return Err("scenario with empty name".to_string());
            }
            if !seen.insert(spec.name.as_str()) {
                return Err(format!("duplicate scenario name '{}'", spec.name));
            }
            if spec.steps.is_empty() && spec.skip.is_none() {
                return Err(format!("scenario '{}' has no steps", spec.name));
            }
            for (index, step) in spec.steps.iter().enumerate() {
                let at = || format!("scenario '{}' step {}", spec.name, index + 1);
                if step.locate().is_some_and(<[Selector]>::is_empty) {
                    return Err(format!("{}: empty locate list", at()));
                }
                match step {
                    Step::WaitFor { any, .. } if any.is_empty() => {
                        return Err(format!("{}: wait_for needs a condition", at()));
                    }
                    Step::Strategies(chain) if chain.strategies.is_empty() => {
                        return Err(format!("{}: no strategies", at()));
                    }
                    _ => {}
                }
            }
        }
        Ok(())
    }

    /// Names of all scenarios
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.scenarios.iter().map(|s| s.name.as_str()).collect()
    }

    /// Runnable scenarios, carrying the file's base URL
    #[must_use]
    pub fn into_scenarios(self) -> Vec<Scenario> {
        let base_url = self.base_url;
        self.scenarios
            .into_iter()
            .map(|spec| {
                let mut scenario = spec.into_scenario();
                scenario.base_url = base_url.clone();
                scenario
            })
            .collect()
    }
}
