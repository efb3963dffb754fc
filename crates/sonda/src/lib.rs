//! Sonda: resilient browser end-to-end testing
//!
//! Sonda drives a real browser through pages whose structure shifts between
//! releases. Elements are found through ordered fallback locator chains,
//! page states are awaited by polling conditions, and every failed test
//! leaves a DOM snapshot and a screenshot behind.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                       SONDA Architecture                        │
//! ├─────────────────────────────────────────────────────────────────┤
//! │   ┌────────────┐    ┌────────────┐    ┌────────────┐            │
//! │   │ Scenario   │    │ Suite      │    │ Browser    │            │
//! │   │ (YAML or   │───►│ Runner     │───►│ Driver     │            │
//! │   │  Rust)     │    │            │    │ (chromium) │            │
//! │   └────────────┘    └─────┬──────┘    └────────────┘            │
//! │                           │                                     │
//! │          ┌────────────────┼────────────────┐                    │
//! │          ▼                ▼                ▼                    │
//! │   ┌────────────┐   ┌────────────┐   ┌────────────┐              │
//! │   │ Locator    │   │ Waiter     │   │ Artifact   │              │
//! │   │ Chain      │   │ (polling)  │   │ Capturer   │              │
//! │   └────────────┘   └────────────┘   └────────────┘              │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use sonda::prelude::*;
//!
//! let chain = LocatorChain::single(Selector::css("a[href='#contact']"))
//!     .or(Selector::text("Contact"));
//! let link = chain.resolve(driver).await?;
//! ```

#![warn(missing_docs)]
// Lints are configured in workspace Cargo.toml [workspace.lints.clippy]

/// Interaction helpers built on script execution
pub mod actions;
mod artifact;
#[allow(clippy::missing_errors_doc, clippy::struct_excessive_bools)]
mod browser;
mod driver;
mod fallback;
mod harness;
mod locator;
#[allow(clippy::cast_precision_loss, clippy::missing_errors_doc)]
mod reporter;
mod result;
/// YAML scenario files
pub mod scenario;
mod session;
mod wait;

pub use artifact::{
    sanitize_name, ArtifactCapturer, ArtifactConfig, DebugArtifact, LatestArtifacts,
    DEFAULT_MIRROR_DIR, DEFAULT_PRIMARY_DIR,
};
#[cfg(feature = "browser")]
pub use browser::ChromiumDriver;
pub use browser::{launch, BrowserConfig, PageLoadStrategy, DEFAULT_NAVIGATION_TIMEOUT_MS};
pub use driver::{BrowserDriver, ElementHandle, MockDriver, ScriptArg, WindowHandle};
pub use fallback::{Strategy, StrategyChain, StrategyOutcome, DEFAULT_VERIFY_TIMEOUT_MS};
pub use harness::{
    resolve_url, Scenario, ScenarioFuture, SuiteConfig, SuiteRunner, TestContext, TestState,
    DEFAULT_SCENARIO_TIMEOUT_MS,
};
pub use locator::{BoundingBox, LocatorChain, Selector, DEFAULT_FALLBACK_TIMEOUT_MS};
pub use reporter::{
    Attachments, FailureMode, Reporter, TestResultEntry, TestStatus, HTML_REPORT, JSON_REPORT,
    JUNIT_REPORT,
};
pub use result::{SondaError, SondaResult};
pub use scenario::{ScenarioFile, ScenarioSpec, Step};
pub use session::Session;
pub use wait::{
    is_truthy, Condition, WaitOptions, WaitResult, Waiter, DEFAULT_POLL_INTERVAL_MS,
    DEFAULT_WAIT_TIMEOUT_MS,
};

/// Prelude for convenient imports
pub mod prelude {
    pub use super::actions;
    pub use super::artifact::*;
    pub use super::browser::*;
    pub use super::driver::*;
    pub use super::fallback::*;
    pub use super::harness::*;
    pub use super::locator::*;
    pub use super::reporter::*;
    pub use super::result::*;
    pub use super::scenario::*;
    pub use super::session::*;
    pub use super::wait::*;
}
