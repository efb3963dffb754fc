//! BrowserDriver - abstract browser automation trait
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  BrowserDriver (async trait, &self everywhere)               │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌──────────────────────┐      ┌──────────────────────────┐  │
//! │  │  ChromiumDriver      │      │  MockDriver              │  │
//! │  │  feature = "browser" │      │  scripted in-memory page │  │
//! │  │  CDP / chromiumoxide │      │  for unit tests          │  │
//! │  └──────────────────────┘      └──────────────────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Scripts follow the WebDriver convention: the string is a function body
//! that reads `arguments[i]` and uses `return` to produce a value.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;

use crate::actions::{CLICK_SCRIPT, SCROLL_TO_BOTTOM_SCRIPT, SET_HASH_SCRIPT};
use crate::locator::{BoundingBox, Selector};
use crate::result::{SondaError, SondaResult};

/// Element handle for DOM interactions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementHandle {
    /// Unique identifier for the element within the session
    pub id: String,
    /// Element tag name
    pub tag_name: String,
    /// Element text content
    pub text_content: Option<String>,
    /// Bounding box if rendered
    pub bounding_box: Option<BoundingBox>,
    /// Whether the element is displayed
    #[serde(default = "default_displayed")]
    pub displayed: bool,
}

const fn default_displayed() -> bool {
    true
}

impl ElementHandle {
    /// Create a new element handle
    #[must_use]
    pub fn new(id: impl Into<String>, tag_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            tag_name: tag_name.into(),
            text_content: None,
            bounding_box: None,
            displayed: true,
        }
    }

    /// Set text content
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text_content = Some(text.into());
        self
    }

    /// Set displayed flag
    #[must_use]
    pub const fn with_displayed(mut self, displayed: bool) -> Self {
        self.displayed = displayed;
        self
    }

    /// Set bounding box
    #[must_use]
    pub const fn with_bounding_box(mut self, bounding_box: BoundingBox) -> Self {
        self.bounding_box = Some(bounding_box);
        self
    }
}

/// Argument passed to a script
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptArg {
    /// Plain JSON value
    Value(Value),
    /// Reference to a located element
    Element(ElementHandle),
}

impl From<&ElementHandle> for ScriptArg {
    fn from(element: &ElementHandle) -> Self {
        Self::Element(element.clone())
    }
}

impl From<Value> for ScriptArg {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

impl From<&str> for ScriptArg {
    fn from(value: &str) -> Self {
        Self::Value(Value::String(value.to_string()))
    }
}

/// Opaque browser window/tab identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WindowHandle(pub String);

impl fmt::Display for WindowHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Abstract browser driver.
///
/// All methods take `&self` so one driver can be shared by a session and
/// the components borrowing it.
#[async_trait]
pub trait BrowserDriver: Send + Sync {
    /// Navigate the current window to a URL
    async fn navigate(&self, url: &str) -> SondaResult<()>;

    /// All elements currently matching the selector, in document order
    async fn find_elements(&self, selector: &Selector) -> SondaResult<Vec<ElementHandle>>;

    /// Native click
    async fn click(&self, element: &ElementHandle) -> SondaResult<()>;

    /// Type text into an element
    async fn send_keys(&self, element: &ElementHandle, text: &str) -> SondaResult<()>;

    /// Clear an input's value
    async fn clear(&self, element: &ElementHandle) -> SondaResult<()>;

    /// Attribute (or same-named string property) of an element
    async fn attribute(&self, element: &ElementHandle, name: &str) -> SondaResult<Option<String>>;

    /// Run a script body with arguments and return its result
    async fn execute_script(&self, script: &str, args: Vec<ScriptArg>) -> SondaResult<Value>;

    /// URL of the current window
    async fn current_url(&self) -> SondaResult<String>;

    /// Serialized DOM of the current window
    async fn page_source(&self) -> SondaResult<String>;

    /// PNG screenshot of the current viewport
    async fn screenshot(&self) -> SondaResult<Vec<u8>>;

    /// Open a URL in a new window without switching to it
    async fn open_window(&self, url: &str) -> SondaResult<WindowHandle>;

    /// Handles of all open windows, oldest first
    async fn window_handles(&self) -> SondaResult<Vec<WindowHandle>>;

    /// Make a window current
    async fn switch_to_window(&self, handle: &WindowHandle) -> SondaResult<()>;

    /// Close the current window and focus the oldest remaining one
    async fn close_window(&self) -> SondaResult<()>;

    /// Shut the browser down
    async fn quit(&self) -> SondaResult<()>;
}

// =============================================================================
// MOCK DRIVER
// =============================================================================

#[derive(Debug, Clone)]
struct MockElement {
    selector: Selector,
    handle: ElementHandle,
    appears_after: Option<Duration>,
}

#[derive(Debug, Clone)]
enum BeforeReady {
    Null,
    Error,
}

#[derive(Debug, Clone)]
struct ScriptStub {
    value: Value,
    ready_after: Duration,
    before: BeforeReady,
}

#[derive(Debug, Clone)]
enum ClickEffect {
    Navigate(String),
    Reveal(Selector, ElementHandle),
}

#[derive(Debug, Default)]
struct MockState {
    windows: Vec<(WindowHandle, String)>,
    current: usize,
    next_window: usize,
    elements: Vec<MockElement>,
    failing: Vec<Selector>,
    find_counts: HashMap<Selector, usize>,
    scripts: HashMap<String, ScriptStub>,
    click_effects: HashMap<String, ClickEffect>,
    values: HashMap<String, String>,
    attributes: HashMap<(String, String), String>,
    page_source: Option<String>,
    screenshot: Option<Vec<u8>>,
    history: Vec<String>,
}

impl MockState {
    fn url(&self) -> String {
        self.windows
            .get(self.current)
            .map(|(_, url)| url.clone())
            .unwrap_or_default()
    }

    fn set_url(&mut self, url: &str) {
        if let Some(window) = self.windows.get_mut(self.current) {
            window.1 = url.to_string();
        }
    }

    fn new_window(&mut self, url: &str) -> WindowHandle {
        let handle = WindowHandle(format!("window-{}", self.next_window));
        self.next_window += 1;
        self.windows.push((handle.clone(), url.to_string()));
        handle
    }

    fn apply_click(&mut self, id: &str) {
        match self.click_effects.get(id).cloned() {
            Some(ClickEffect::Navigate(url)) => self.set_url(&url),
            Some(ClickEffect::Reveal(selector, handle)) => self.elements.push(MockElement {
                selector,
                handle,
                appears_after: None,
            }),
            None => {}
        }
    }
}

/// Scripted in-memory page for tests.
///
/// Elements are registered per selector and can be scheduled to appear after
/// a delay. Script results are stubbed by exact script text; unknown scripts
/// return `null`. Clicks (native or script) can trigger navigation.
#[derive(Debug)]
pub struct MockDriver {
    created: Instant,
    state: Mutex<MockState>,
    quit_calls: AtomicUsize,
}

impl Default for MockDriver {
    fn default() -> Self {
        let mut state = MockState::default();
        state.new_window("about:blank");
        Self {
            created: Instant::now(),
            state: Mutex::new(state),
            quit_calls: AtomicUsize::new(0),
        }
    }
}

impl MockDriver {
    /// Create new mock driver on `about:blank`
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn record(&self, call: String) {
        self.state().history.push(call);
    }

    /// Register an element matching `selector`
    pub fn add_element(&self, selector: Selector, element: ElementHandle) {
        self.state().elements.push(MockElement {
            selector,
            handle: element,
            appears_after: None,
        });
    }

    /// Register an element that starts matching after `delay`
    pub fn add_element_after(&self, selector: Selector, element: ElementHandle, delay: Duration) {
        self.state().elements.push(MockElement {
            selector,
            handle: element,
            appears_after: Some(delay),
        });
    }

    /// Make queries for `selector` fail
    pub fn fail_selector(&self, selector: Selector) {
        self.state().failing.push(selector);
    }

    /// Stub a script result
    pub fn on_script(&self, script: impl Into<String>, value: Value) {
        self.on_script_after(script, value, Duration::ZERO);
    }

    /// Stub a script that returns `null` until `delay`, then `value`
    pub fn on_script_after(&self, script: impl Into<String>, value: Value, delay: Duration) {
        self.state().scripts.insert(
            script.into(),
            ScriptStub {
                value,
                ready_after: delay,
                before: BeforeReady::Null,
            },
        );
    }

    /// Stub a script that throws until `delay`, then returns `value`
    pub fn on_script_error_until(&self, script: impl Into<String>, value: Value, delay: Duration) {
        self.state().scripts.insert(
            script.into(),
            ScriptStub {
                value,
                ready_after: delay,
                before: BeforeReady::Error,
            },
        );
    }

    /// Clicking the element navigates the current window
    pub fn on_click_navigate(&self, element_id: impl Into<String>, url: impl Into<String>) {
        self.state()
            .click_effects
            .insert(element_id.into(), ClickEffect::Navigate(url.into()));
    }

    /// Clicking the element makes another element present
    pub fn on_click_reveal(&self, element_id: impl Into<String>, selector: Selector, element: ElementHandle) {
        self.state()
            .click_effects
            .insert(element_id.into(), ClickEffect::Reveal(selector, element));
    }

    /// Set an element attribute
    pub fn set_attribute(&self, element_id: &str, name: &str, value: impl Into<String>) {
        self.state()
            .attributes
            .insert((element_id.to_string(), name.to_string()), value.into());
    }

    /// Set the serialized DOM; `None` makes `page_source` fail
    pub fn set_page_source(&self, html: Option<String>) {
        self.state().page_source = html;
    }

    /// Set screenshot bytes; `None` makes `screenshot` fail
    pub fn set_screenshot(&self, png: Option<Vec<u8>>) {
        self.state().screenshot = png;
    }

    /// Navigate without going through the async trait
    pub fn navigate_sync(&self, url: &str) {
        self.state().set_url(url);
    }

    /// Value typed into an element so far
    #[must_use]
    pub fn value_of(&self, element_id: &str) -> Option<String> {
        self.state().values.get(element_id).cloned()
    }

    /// Number of queries issued for a selector
    #[must_use]
    pub fn find_count(&self, selector: &Selector) -> usize {
        self.state().find_counts.get(selector).copied().unwrap_or(0)
    }

    /// Call history for verification
    #[must_use]
    pub fn history(&self) -> Vec<String> {
        self.state().history.clone()
    }

    /// Check if a call was made
    #[must_use]
    pub fn was_called(&self, prefix: &str) -> bool {
        self.state().history.iter().any(|c| c.starts_with(prefix))
    }

    /// Number of `quit` calls
    #[must_use]
    pub fn quit_count(&self) -> usize {
        self.quit_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BrowserDriver for MockDriver {
    async fn navigate(&self, url: &str) -> SondaResult<()> {
        let mut state = self.state();
        state.history.push(format!("navigate:{url}"));
        state.set_url(url);
        Ok(())
    }

    async fn find_elements(&self, selector: &Selector) -> SondaResult<Vec<ElementHandle>> {
        let elapsed = self.created.elapsed();
        let mut state = self.state();
        *state.find_counts.entry(selector.clone()).or_insert(0) += 1;
        if state.failing.contains(selector) {
            return Err(SondaError::script(format!("invalid selector {selector}")));
        }
        Ok(state
            .elements
            .iter()
            .filter(|e| &e.selector == selector)
            .filter(|e| e.appears_after.map_or(true, |delay| elapsed >= delay))
            .map(|e| e.handle.clone())
            .collect())
    }

    async fn click(&self, element: &ElementHandle) -> SondaResult<()> {
        let mut state = self.state();
        state.history.push(format!("click:{}", element.id));
        state.apply_click(&element.id);
        Ok(())
    }

    async fn send_keys(&self, element: &ElementHandle, text: &str) -> SondaResult<()> {
        let mut state = self.state();
        state.history.push(format!("send_keys:{}:{text}", element.id));
        state
            .values
            .entry(element.id.clone())
            .or_default()
            .push_str(text);
        Ok(())
    }

    async fn clear(&self, element: &ElementHandle) -> SondaResult<()> {
        let mut state = self.state();
        state.history.push(format!("clear:{}", element.id));
        state.values.remove(&element.id);
        Ok(())
    }

    async fn attribute(&self, element: &ElementHandle, name: &str) -> SondaResult<Option<String>> {
        Ok(self
            .state()
            .attributes
            .get(&(element.id.clone(), name.to_string()))
            .cloned())
    }

    async fn execute_script(&self, script: &str, args: Vec<ScriptArg>) -> SondaResult<Value> {
        let elapsed = self.created.elapsed();
        let mut state = self.state();
        state.history.push(format!("execute_script:{script}"));

        match (script, args.first()) {
            (CLICK_SCRIPT, Some(ScriptArg::Element(el))) => {
                state.history.push(format!("js_click:{}", el.id));
                state.apply_click(&el.id);
                return Ok(Value::Null);
            }
            (SET_HASH_SCRIPT, Some(ScriptArg::Value(Value::String(hash)))) => {
                let url = state.url();
                let base = url.split('#').next().unwrap_or_default().to_string();
                let hash = hash.trim_start_matches('#');
                state.set_url(&format!("{base}#{hash}"));
                return Ok(Value::Null);
            }
            (SCROLL_TO_BOTTOM_SCRIPT, _) => return Ok(Value::Null),
            _ => {}
        }

        match state.scripts.get(script) {
            Some(stub) if elapsed >= stub.ready_after => Ok(stub.value.clone()),
            Some(ScriptStub {
                before: BeforeReady::Error,
                ..
            }) => Err(SondaError::script("TypeError: Cannot read properties of null")),
            _ => Ok(Value::Null),
        }
    }

    async fn current_url(&self) -> SondaResult<String> {
        Ok(self.state().url())
    }

    async fn page_source(&self) -> SondaResult<String> {
        self.state()
            .page_source
            .clone()
            .ok_or_else(|| SondaError::driver("No mock page source set"))
    }

    async fn screenshot(&self) -> SondaResult<Vec<u8>> {
        self.state()
            .screenshot
            .clone()
            .ok_or_else(|| SondaError::driver("No mock screenshot set"))
    }

    async fn open_window(&self, url: &str) -> SondaResult<WindowHandle> {
        let mut state = self.state();
        state.history.push(format!("open_window:{url}"));
        Ok(state.new_window(url))
    }

    async fn window_handles(&self) -> SondaResult<Vec<WindowHandle>> {
        Ok(self.state().windows.iter().map(|(h, _)| h.clone()).collect())
    }

    async fn switch_to_window(&self, handle: &WindowHandle) -> SondaResult<()> {
        let mut state = self.state();
        state.history.push(format!("switch_to_window:{handle}"));
        let index = state
            .windows
            .iter()
            .position(|(h, _)| h == handle)
            .ok_or_else(|| SondaError::driver(format!("no such window: {handle}")))?;
        state.current = index;
        Ok(())
    }

    async fn close_window(&self) -> SondaResult<()> {
        let mut state = self.state();
        if state.windows.is_empty() {
            return Err(SondaError::driver("no window to close"));
        }
        let current = state.current;
        let (handle, _) = state.windows.remove(current);
        state.history.push(format!("close_window:{handle}"));
        state.current = 0;
        Ok(())
    }

    async fn quit(&self) -> SondaResult<()> {
        self.quit_calls.fetch_add(1, Ordering::SeqCst);
        self.record("quit".to_string());
        Ok(())
    }
}
