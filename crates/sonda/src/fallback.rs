//! Multi-strategy actions.
//!
//! A [`StrategyChain`] tries alternative ways of reaching the same page state
//! ("click the nav link, else force the hash, else scroll to the heading,
//! else scroll to the bottom"). After each attempt the verification
//! conditions are awaited; the first strategy that leads to a verified state
//! wins.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::actions;
use crate::driver::{BrowserDriver, ScriptArg};
use crate::locator::{LocatorChain, Selector};
use crate::result::{SondaError, SondaResult};
use crate::wait::{Condition, WaitOptions, Waiter};

/// Default verification timeout per strategy (5 seconds)
pub const DEFAULT_VERIFY_TIMEOUT_MS: u64 = 5_000;

/// One way of performing an action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Resolve candidates, scroll into view, click via script
    Click(Vec<Selector>),
    /// Set `location.hash`
    SetHash(String),
    /// Resolve candidates and scroll the element into view
    ScrollTo(Vec<Selector>),
    /// Scroll to the bottom of the document
    ScrollToBottom,
    /// Navigate to a URL
    Navigate(String),
    /// Run a script body
    Script(String),
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Click(c) => write!(f, "click [{}]", LocatorChain::new(c.iter().cloned())),
            Self::SetHash(h) => write!(f, "set hash {h}"),
            Self::ScrollTo(c) => write!(f, "scroll to [{}]", LocatorChain::new(c.iter().cloned())),
            Self::ScrollToBottom => write!(f, "scroll to bottom"),
            Self::Navigate(u) => write!(f, "navigate {u}"),
            Self::Script(_) => write!(f, "script"),
        }
    }
}

impl Strategy {
    async fn perform(&self, driver: &dyn BrowserDriver, locate: &WaitOptions) -> SondaResult<()> {
        match self {
            Self::Click(candidates) => {
                let chain = LocatorChain::new(candidates.iter().cloned()).with_fallback(locate.clone());
                actions::click(driver, &chain).await.map(|_| ())
            }
            Self::SetHash(hash) => actions::set_location_hash(driver, hash).await,
            Self::ScrollTo(candidates) => {
                let chain = LocatorChain::new(candidates.iter().cloned()).with_fallback(locate.clone());
                let element = chain.resolve(driver).await?;
                actions::scroll_into_view(driver, &element).await
            }
            Self::ScrollToBottom => actions::scroll_to_bottom(driver).await,
            Self::Navigate(url) => driver.navigate(url).await,
            Self::Script(body) => driver
                .execute_script(body, Vec::<ScriptArg>::new())
                .await
                .map(|_| ()),
        }
    }
}

/// Which strategy of a chain succeeded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrategyOutcome {
    /// Position in the chain
    pub index: usize,
    /// Display name of the strategy
    pub name: String,
}

/// Ordered alternative strategies with shared verification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyChain {
    /// Strategies in priority order
    pub strategies: Vec<Strategy>,
    /// Any of these must hold after a strategy for it to count
    #[serde(default)]
    pub verify: Vec<Condition>,
    /// Verification wait per strategy; also bounds element lookup
    #[serde(default = "default_verify_options")]
    pub options: WaitOptions,
}

fn default_verify_options() -> WaitOptions {
    WaitOptions::new().with_timeout(DEFAULT_VERIFY_TIMEOUT_MS)
}

impl StrategyChain {
    /// Create an empty chain
    #[must_use]
    pub fn new() -> Self {
        Self {
            strategies: Vec::new(),
            verify: Vec::new(),
            options: default_verify_options(),
        }
    }

    /// Append a strategy
    #[must_use]
    pub fn then(mut self, strategy: Strategy) -> Self {
        self.strategies.push(strategy);
        self
    }

    /// Add a verification condition
    #[must_use]
    pub fn verify(mut self, condition: Condition) -> Self {
        self.verify.push(condition);
        self
    }

    /// Set verification options
    #[must_use]
    pub fn with_options(mut self, options: WaitOptions) -> Self {
        self.options = options;
        self
    }

    /// Run strategies until one is verified.
    ///
    /// Without verification conditions the first strategy that completes
    /// without error wins.
    ///
    /// # Errors
    ///
    /// Returns [`SondaError::StrategiesExhausted`] when none succeeded.
    pub async fn run(&self, driver: &dyn BrowserDriver) -> SondaResult<StrategyOutcome> {
        let waiter = Waiter::with_options(self.options.clone());
        let mut attempted = Vec::with_capacity(self.strategies.len());

        for (index, strategy) in self.strategies.iter().enumerate() {
            let name = strategy.to_string();
            attempted.push(name.clone());

            if let Err(e) = strategy.perform(driver, &self.options).await {
                tracing::debug!(strategy = %name, error = %e, "strategy failed");
                continue;
            }

            if self.verify.is_empty() || waiter.until_any(driver, &self.verify).await.success {
                tracing::debug!(strategy = %name, index, "strategy succeeded");
                return Ok(StrategyOutcome { index, name });
            }
            tracing::debug!(strategy = %name, "strategy not verified");
        }

        Err(SondaError::StrategiesExhausted {
            attempted: attempted.join(", "),
        })
    }
}

impl Default for StrategyChain {
    fn default() -> Self {
        Self::new()
    }
}
