//! Selectors and the resilient locator chain.
//!
//! Single-page applications render late and their markup drifts, so a
//! single selector is rarely enough. A [`LocatorChain`] holds an ordered list
//! of candidate [`Selector`]s and resolves to the first element of the first
//! candidate that currently matches.
//!
//! # Resolution
//!
//! ```text
//! candidates:  [ css(a[href*='#contact']) , xpath(//header//button) , ... ]
//!                    │ no match                  │ 2 matches
//!                    ▼                           ▼
//!               try next ──────────────►  return matches[0]
//!
//! nothing matched ──► bounded wait on candidates[0] ──► ElementNotFound
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::driver::{BrowserDriver, ElementHandle};
use crate::result::{SondaError, SondaResult};
use crate::wait::{WaitOptions, Waiter};

/// Default timeout for the fallback wait (10 seconds)
pub const DEFAULT_FALLBACK_TIMEOUT_MS: u64 = 10_000;

/// Render a Rust string as a JavaScript string literal.
pub(crate) fn js_string(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "\"\"".to_string())
}

/// Bounding box of an element in CSS pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// X position
    pub x: f64,
    /// Y position
    pub y: f64,
    /// Width
    pub width: f64,
    /// Height
    pub height: f64,
}

impl BoundingBox {
    /// Create a new bounding box
    #[must_use]
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Whether the box covers any area
    #[must_use]
    pub fn has_area(&self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }
}

/// Selector type for locating elements
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Selector {
    /// CSS selector (e.g., "button.primary")
    Css(String),
    /// XPath selector
    #[serde(alias = "xpath")]
    XPath(String),
    /// Innermost elements whose normalized text contains the string
    Text(String),
    /// Test ID selector (data-testid attribute)
    TestId(String),
}

impl Selector {
    /// Create a CSS selector
    #[must_use]
    pub fn css(selector: impl Into<String>) -> Self {
        Self::Css(selector.into())
    }

    /// Create an XPath selector
    #[must_use]
    pub fn xpath(selector: impl Into<String>) -> Self {
        Self::XPath(selector.into())
    }

    /// Create a text selector
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    /// Create a test ID selector
    #[must_use]
    pub fn test_id(id: impl Into<String>) -> Self {
        Self::TestId(id.into())
    }

    /// Convert to a JavaScript expression yielding the first match or `null`
    #[must_use]
    pub fn to_query(&self) -> String {
        format!("({}[0] || null)", self.to_collect_query())
    }

    /// Convert to a JavaScript expression yielding the match count
    #[must_use]
    pub fn to_count_query(&self) -> String {
        match self {
            Self::Css(s) => format!("document.querySelectorAll({}).length", js_string(s)),
            Self::XPath(s) => format!(
                "document.evaluate({}, document, null, XPathResult.ORDERED_NODE_SNAPSHOT_TYPE, null).snapshotLength",
                js_string(s)
            ),
            Self::Text(_) | Self::TestId(_) => format!("{}.length", self.to_collect_query()),
        }
    }

    /// Convert to a JavaScript expression yielding an `Array` of elements
    #[must_use]
    pub fn to_collect_query(&self) -> String {
        match self {
            Self::Css(s) => format!("Array.from(document.querySelectorAll({}))", js_string(s)),
            Self::XPath(s) => format!(
                "(() => {{ const r = document.evaluate({}, document, null, XPathResult.ORDERED_NODE_SNAPSHOT_TYPE, null); \
                 const out = []; \
                 for (let i = 0; i < r.snapshotLength; i++) {{ const n = r.snapshotItem(i); if (n.nodeType === 1) out.push(n); }} \
                 return out; }})()",
                js_string(s)
            ),
            Self::Text(t) => format!(
                "(() => {{ const norm = s => (s || '').replace(/\\s+/g, ' ').trim(); const t = {}; \
                 return Array.from(document.querySelectorAll('body *')).filter(el => \
                 norm(el.textContent).includes(t) && \
                 !Array.from(el.children).some(c => norm(c.textContent).includes(t))); }})()",
                js_string(t)
            ),
            Self::TestId(id) => format!(
                "Array.from(document.querySelectorAll({}))",
                js_string(&format!("[data-testid=\"{id}\"]"))
            ),
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Css(s) => write!(f, "css({s})"),
            Self::XPath(s) => write!(f, "xpath({s})"),
            Self::Text(s) => write!(f, "text({s})"),
            Self::TestId(s) => write!(f, "test_id({s})"),
        }
    }
}

/// Ordered list of candidate selectors, first match wins.
#[derive(Debug, Clone, PartialEq)]
pub struct LocatorChain {
    candidates: Vec<Selector>,
    fallback: WaitOptions,
}

fn default_fallback_options() -> WaitOptions {
    WaitOptions::new().with_timeout(DEFAULT_FALLBACK_TIMEOUT_MS)
}

impl LocatorChain {
    /// Create a chain from candidates in priority order
    #[must_use]
    pub fn new(candidates: impl IntoIterator<Item = Selector>) -> Self {
        Self {
            candidates: candidates.into_iter().collect(),
            fallback: default_fallback_options(),
        }
    }

    /// Create a chain with a single candidate
    #[must_use]
    pub fn single(selector: Selector) -> Self {
        Self::new([selector])
    }

    /// Append a lower-priority candidate
    #[must_use]
    pub fn or(mut self, selector: Selector) -> Self {
        self.candidates.push(selector);
        self
    }

    /// Set the options of the fallback wait on the first candidate
    #[must_use]
    pub fn with_fallback(mut self, options: WaitOptions) -> Self {
        self.fallback = options;
        self
    }

    /// Set the fallback wait timeout
    #[must_use]
    pub const fn with_fallback_timeout(mut self, timeout: Duration) -> Self {
        self.fallback.timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Candidates in priority order
    #[must_use]
    pub fn candidates(&self) -> &[Selector] {
        &self.candidates
    }

    /// Fallback wait options
    #[must_use]
    pub const fn fallback(&self) -> &WaitOptions {
        &self.fallback
    }

    /// Try every candidate once without waiting.
    ///
    /// A candidate whose query errors is skipped, not fatal.
    pub async fn resolve_now(&self, driver: &dyn BrowserDriver) -> Option<ElementHandle> {
        for selector in &self.candidates {
            match driver.find_elements(selector).await {
                Ok(found) => {
                    if let Some(first) = found.into_iter().next() {
                        tracing::debug!(%selector, element = %first.id, "locator candidate matched");
                        return Some(first);
                    }
                    tracing::debug!(%selector, "locator candidate had no match");
                }
                Err(e) => {
                    tracing::debug!(%selector, error = %e, "locator candidate query failed");
                }
            }
        }
        None
    }

    /// Resolve to the first present element.
    ///
    /// Returns immediately when any candidate matches. Otherwise waits on
    /// the first candidate for the fallback timeout.
    ///
    /// # Errors
    ///
    /// Returns [`SondaError::ElementNotFound`] when the fallback wait expires
    /// or the chain is empty.
    pub async fn resolve(&self, driver: &dyn BrowserDriver) -> SondaResult<ElementHandle> {
        if let Some(element) = self.resolve_now(driver).await {
            return Ok(element);
        }

        let Some(first) = self.candidates.first() else {
            return Err(SondaError::ElementNotFound {
                selectors: String::new(),
                waited_ms: 0,
            });
        };

        tracing::debug!(selector = %first, timeout_ms = self.fallback.timeout_ms, "no candidate matched, waiting on first");
        let waiter = Waiter::with_options(self.fallback.clone());
        let (result, found) = waiter
            .poll_for(format!("presence of {first}"), || async move {
                Ok(driver.find_elements(first).await?.into_iter().next())
            })
            .await;

        match found {
            Some(element) if result.success => Ok(element),
            _ => Err(SondaError::ElementNotFound {
                selectors: self.to_string(),
                waited_ms: result.elapsed.as_millis() as u64,
            }),
        }
    }
}

impl From<Selector> for LocatorChain {
    fn from(selector: Selector) -> Self {
        Self::single(selector)
    }
}

impl fmt::Display for LocatorChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self.candidates.iter().map(ToString::to_string).collect();
        write!(f, "{}", rendered.join(", "))
    }
}
