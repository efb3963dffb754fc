//! Browser launch and the CDP-backed driver.
//!
//! With the `browser` feature, [`launch`] starts Chromium through the Chrome
//! `DevTools` Protocol (chromiumoxide) and returns a [`BrowserDriver`].
//! Without it, [`launch`] fails with `SondaError::SessionAcquisition` and
//! tests use [`crate::driver::MockDriver`] instead.
//!
//! Element handles carry CDP remote object ids, so lookups leave the page
//! DOM unchanged.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::driver::BrowserDriver;
use crate::result::{SondaError, SondaResult};

/// Default navigation timeout (30 seconds)
pub const DEFAULT_NAVIGATION_TIMEOUT_MS: u64 = 30_000;

/// When navigation is considered finished
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageLoadStrategy {
    /// Wait for the `load` event
    #[default]
    Normal,
    /// Return once the DOM is interactive, without waiting for subresources
    Eager,
}

/// Browser configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Run in headless mode
    pub headless: bool,
    /// Viewport width
    pub viewport_width: u32,
    /// Viewport height
    pub viewport_height: u32,
    /// Path to chromium binary (None = auto-detect)
    pub chromium_path: Option<String>,
    /// User agent string
    pub user_agent: Option<String>,
    /// Sandbox mode (disable for containers)
    pub sandbox: bool,
    /// Navigation completion rule
    pub page_load_strategy: PageLoadStrategy,
    /// Pass `--start-maximized`
    pub start_maximized: bool,
    /// Extra command line switches
    pub extra_args: Vec<String>,
    /// Navigation timeout in milliseconds
    pub navigation_timeout_ms: u64,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            viewport_width: 1280,
            viewport_height: 800,
            chromium_path: None,
            user_agent: None,
            sandbox: true,
            page_load_strategy: PageLoadStrategy::Eager,
            start_maximized: true,
            extra_args: Vec::new(),
            navigation_timeout_ms: DEFAULT_NAVIGATION_TIMEOUT_MS,
        }
    }
}

impl BrowserConfig {
    /// Set viewport dimensions
    #[must_use]
    pub const fn with_viewport(mut self, width: u32, height: u32) -> Self {
        self.viewport_width = width;
        self.viewport_height = height;
        self
    }

    /// Set headless mode
    #[must_use]
    pub const fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Set chromium path
    #[must_use]
    pub fn with_chromium_path(mut self, path: impl Into<String>) -> Self {
        self.chromium_path = Some(path.into());
        self
    }

    /// Set user agent
    #[must_use]
    pub fn with_user_agent(mut self, ua: impl Into<String>) -> Self {
        self.user_agent = Some(ua.into());
        self
    }

    /// Disable sandbox (for containers/CI)
    #[must_use]
    pub const fn with_no_sandbox(mut self) -> Self {
        self.sandbox = false;
        self
    }

    /// Set page load strategy
    #[must_use]
    pub const fn with_page_load_strategy(mut self, strategy: PageLoadStrategy) -> Self {
        self.page_load_strategy = strategy;
        self
    }

    /// Add a command line switch
    #[must_use]
    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        self.extra_args.push(arg.into());
        self
    }

    /// Navigation timeout as Duration
    #[must_use]
    pub const fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.navigation_timeout_ms)
    }

    /// Command line switches beyond what the launcher sets itself
    #[must_use]
    pub fn chrome_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if self.start_maximized {
            args.push("--start-maximized".to_string());
        }
        args.extend(self.extra_args.iter().cloned());
        args
    }
}

/// Launch a browser and return it as a driver
///
/// # Errors
///
/// Returns `SondaError::SessionAcquisition` if no browser could be started.
#[cfg(feature = "browser")]
pub async fn launch(config: BrowserConfig) -> SondaResult<Arc<dyn BrowserDriver>> {
    let driver = cdp::ChromiumDriver::launch(config).await?;
    Ok(Arc::new(driver))
}

/// Launch a browser and return it as a driver
///
/// # Errors
///
/// Always fails: built without the `browser` feature.
#[cfg(not(feature = "browser"))]
pub async fn launch(config: BrowserConfig) -> SondaResult<Arc<dyn BrowserDriver>> {
    let _ = config;
    Err(SondaError::SessionAcquisition {
        message: "Browser feature not enabled. Enable 'browser' feature for real CDP support."
            .to_string(),
    })
}

#[cfg(feature = "browser")]
pub use cdp::ChromiumDriver;

/// Result of a `Page.navigate` reply.
///
/// Chromium reports DNS and connection failures in `errorText` while the
/// command itself succeeds.
#[cfg_attr(not(feature = "browser"), allow(dead_code))]
fn navigation_outcome(url: &str, error_text: Option<&str>) -> SondaResult<()> {
    match error_text {
        Some(text) if !text.is_empty() => Err(SondaError::Navigation {
            url: url.to_string(),
            message: text.to_string(),
        }),
        _ => Ok(()),
    }
}

// ============================================================================
// Real CDP Implementation (when `browser` feature is enabled)
// ============================================================================

#[cfg(feature = "browser")]
#[allow(clippy::significant_drop_tightening, clippy::missing_errors_doc)]
mod cdp {
    use super::{navigation_outcome, BrowserConfig, PageLoadStrategy};
    use crate::driver::{BrowserDriver, ElementHandle, ScriptArg, WindowHandle};
    use crate::locator::{BoundingBox, Selector};
    use crate::result::{SondaError, SondaResult};
    use async_trait::async_trait;
    use chromiumoxide::browser::{Browser as CdpBrowser, BrowserConfig as CdpConfig};
    use chromiumoxide::cdp::browser_protocol::input::InsertTextParams;
    use chromiumoxide::cdp::browser_protocol::network::SetUserAgentOverrideParams;
    use chromiumoxide::cdp::browser_protocol::page::{
        CaptureScreenshotFormat, CaptureScreenshotParams, NavigateParams,
    };
    use chromiumoxide::cdp::js_protocol::runtime::{
        CallArgument, CallFunctionOnParams, EvaluateParams, ExceptionDetails,
        GetPropertiesParams, ReleaseObjectGroupParams, RemoteObjectId,
    };
    use chromiumoxide::layout::Point;
    use chromiumoxide::page::Page as CdpPage;
    use futures::StreamExt;
    use serde_json::Value;
    use std::fmt;
    use tokio::sync::Mutex;
    use tokio::time::Instant;

    const CLEAR_SCRIPT: &str = "arguments[0].value = ''; \
        arguments[0].dispatchEvent(new Event('input', { bubbles: true })); \
        arguments[0].dispatchEvent(new Event('change', { bubbles: true }));";

    const ATTRIBUTE_SCRIPT: &str = "const el = arguments[0]; const name = arguments[1]; \
        const prop = el[name]; \
        if (typeof prop === 'string') { return prop; } \
        return el.getAttribute(name);";

    /// Remote objects created by element lookups
    const OBJECT_GROUP: &str = "sonda";

    /// Describe every element of the array `this`, read-only
    pub(super) const DESCRIBE_FUNCTION: &str = "function() { \
        return this.map(el => { \
          const r = el.getBoundingClientRect(); \
          const style = window.getComputedStyle(el); \
          const displayed = r.width > 0 && r.height > 0 && style.visibility !== 'hidden' && style.display !== 'none'; \
          return { tag_name: el.tagName.toLowerCase(), \
            text_content: (el.innerText || el.textContent || '').trim(), \
            bounding_box: displayed ? { x: r.x, y: r.y, width: r.width, height: r.height } : null, \
            displayed }; \
        }); }";

    const CENTER_FUNCTION: &str = "function() { \
        this.scrollIntoView({ block: 'center', inline: 'center' }); \
        const r = this.getBoundingClientRect(); \
        return { x: r.x, y: r.y, width: r.width, height: r.height }; }";

    const FOCUS_FUNCTION: &str = "function() { this.focus(); }";

    /// Pair described elements with their remote object ids, in array order
    pub(super) fn attach_ids(
        described: Value,
        mut ids: Vec<(usize, String)>,
    ) -> SondaResult<Vec<ElementHandle>> {
        let Value::Array(items) = described else {
            return Ok(Vec::new());
        };
        if items.len() != ids.len() {
            return Err(SondaError::driver(format!(
                "described {} elements but resolved {}",
                items.len(),
                ids.len()
            )));
        }
        ids.sort_unstable_by_key(|(index, _)| *index);
        items
            .into_iter()
            .zip(ids)
            .map(|(mut item, (_, id))| -> SondaResult<ElementHandle> {
                if let Value::Object(fields) = &mut item {
                    fields.insert("id".to_string(), Value::String(id));
                }
                Ok(serde_json::from_value(item)?)
            })
            .collect()
    }

    /// Script arguments as CDP call arguments; elements go by object id
    pub(super) fn call_arguments(args: &[ScriptArg]) -> Vec<CallArgument> {
        args.iter()
            .map(|arg| match arg {
                ScriptArg::Value(value) => CallArgument::builder().value(value.clone()).build(),
                ScriptArg::Element(el) => CallArgument::builder()
                    .object_id(RemoteObjectId::new(el.id.clone()))
                    .build(),
            })
            .collect()
    }

    fn exception_message(details: &ExceptionDetails) -> String {
        details
            .exception
            .as_ref()
            .and_then(|e| e.description.clone())
            .unwrap_or_else(|| details.text.clone())
    }

    #[derive(Default)]
    struct Windows {
        pages: Vec<(WindowHandle, CdpPage)>,
        current: usize,
        next: usize,
    }

    impl Windows {
        fn push(&mut self, page: CdpPage) -> WindowHandle {
            let handle = WindowHandle(format!("tab-{}", self.next));
            self.next += 1;
            self.pages.push((handle.clone(), page));
            handle
        }
    }

    /// Chromium controlled over CDP
    pub struct ChromiumDriver {
        config: BrowserConfig,
        browser: Mutex<Option<CdpBrowser>>,
        windows: Mutex<Windows>,
        handler: tokio::task::JoinHandle<()>,
    }

    impl fmt::Debug for ChromiumDriver {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.debug_struct("ChromiumDriver")
                .field("config", &self.config)
                .finish()
        }
    }

    impl ChromiumDriver {
        /// Launch Chromium with one blank tab
        pub async fn launch(config: BrowserConfig) -> SondaResult<Self> {
            let acquisition = |message: String| SondaError::SessionAcquisition { message };

            let mut builder = CdpConfig::builder()
                .window_size(config.viewport_width, config.viewport_height)
                .request_timeout(config.navigation_timeout());

            if !config.headless {
                builder = builder.with_head();
            }
            if !config.sandbox {
                builder = builder.no_sandbox();
            }
            if let Some(ref path) = config.chromium_path {
                builder = builder.chrome_executable(path);
            }
            for arg in config.chrome_args() {
                builder = builder.arg(arg);
            }

            let cdp_config = builder.build().map_err(acquisition)?;
            let (browser, mut handler) = CdpBrowser::launch(cdp_config)
                .await
                .map_err(|e| acquisition(e.to_string()))?;

            let handler = tokio::spawn(async move {
                while let Some(event) = handler.next().await {
                    if event.is_err() {
                        break;
                    }
                }
            });

            let page = browser
                .new_page("about:blank")
                .await
                .map_err(|e| acquisition(e.to_string()))?;
            if let Some(ref ua) = config.user_agent {
                page.execute(SetUserAgentOverrideParams::new(ua.clone()))
                    .await
                    .map_err(|e| acquisition(e.to_string()))?;
            }

            let mut windows = Windows::default();
            windows.push(page);
            tracing::info!(headless = config.headless, "chromium launched");

            Ok(Self {
                config,
                browser: Mutex::new(Some(browser)),
                windows: Mutex::new(windows),
                handler,
            })
        }

        async fn page(&self) -> SondaResult<CdpPage> {
            let windows = self.windows.lock().await;
            windows
                .pages
                .get(windows.current)
                .map(|(_, page)| page.clone())
                .ok_or_else(|| SondaError::driver("no open window"))
        }

        async fn evaluate(&self, expression: String) -> SondaResult<Value> {
            let page = self.page().await?;
            let result = page
                .evaluate(expression)
                .await
                .map_err(|e| SondaError::script(e.to_string()))?;
            Ok(result.value().cloned().unwrap_or(Value::Null))
        }

        /// Call `function` with `this` bound to a remote object, result by value
        async fn call_on(
            &self,
            object_id: RemoteObjectId,
            function: &str,
            arguments: Vec<CallArgument>,
        ) -> SondaResult<Value> {
            let page = self.page().await?;
            let params = CallFunctionOnParams::builder()
                .function_declaration(function)
                .object_id(object_id)
                .arguments(arguments)
                .return_by_value(true)
                .await_promise(true)
                .build()
                .map_err(SondaError::script)?;
            let returns = page
                .execute(params)
                .await
                .map_err(|e| SondaError::script(e.to_string()))?
                .result;
            if let Some(details) = &returns.exception_details {
                return Err(SondaError::script(exception_message(details)));
            }
            Ok(returns.result.value.unwrap_or(Value::Null))
        }

        async fn wait_interactive(&self, url: &str) -> SondaResult<()> {
            let deadline = Instant::now() + self.config.navigation_timeout();
            loop {
                let state = self
                    .evaluate("document.readyState".to_string())
                    .await
                    .unwrap_or(Value::Null);
                if matches!(state.as_str(), Some("interactive" | "complete")) {
                    return Ok(());
                }
                if Instant::now() >= deadline {
                    return Err(SondaError::Navigation {
                        url: url.to_string(),
                        message: "document never became interactive".to_string(),
                    });
                }
                tokio::time::sleep(std::time::Duration::from_millis(50)).await;
            }
        }
    }

    #[async_trait]
    impl BrowserDriver for ChromiumDriver {
        async fn navigate(&self, url: &str) -> SondaResult<()> {
            let page = self.page().await?;
            if let Err(e) = page.execute(ReleaseObjectGroupParams::new(OBJECT_GROUP)).await {
                tracing::debug!(error = %e, "element handles not released");
            }
            let nav_err = |message: String| SondaError::Navigation {
                url: url.to_string(),
                message,
            };
            match self.config.page_load_strategy {
                PageLoadStrategy::Normal => {
                    page.goto(url).await.map_err(|e| nav_err(e.to_string()))?;
                }
                PageLoadStrategy::Eager => {
                    let params = NavigateParams::builder()
                        .url(url)
                        .build()
                        .map_err(nav_err)?;
                    let response = page
                        .execute(params)
                        .await
                        .map_err(|e| nav_err(e.to_string()))?;
                    navigation_outcome(url, response.result.error_text.as_deref())?;
                    self.wait_interactive(url).await?;
                }
            }
            tracing::debug!(url, "navigated");
            Ok(())
        }

        async fn find_elements(&self, selector: &Selector) -> SondaResult<Vec<ElementHandle>> {
            let page = self.page().await?;
            let params = EvaluateParams::builder()
                .expression(selector.to_collect_query())
                .object_group(OBJECT_GROUP)
                .return_by_value(false)
                .build()
                .map_err(SondaError::script)?;
            let evaluated = page
                .execute(params)
                .await
                .map_err(|e| SondaError::script(e.to_string()))?
                .result;
            if let Some(details) = &evaluated.exception_details {
                return Err(SondaError::script(exception_message(details)));
            }
            let Some(array_id) = evaluated.result.object_id else {
                return Ok(Vec::new());
            };

            let described = self
                .call_on(array_id.clone(), DESCRIBE_FUNCTION, Vec::new())
                .await?;
            let params = GetPropertiesParams::builder()
                .object_id(array_id)
                .own_properties(true)
                .build()
                .map_err(SondaError::script)?;
            let properties = page
                .execute(params)
                .await
                .map_err(|e| SondaError::script(e.to_string()))?
                .result;
            let ids = properties
                .result
                .into_iter()
                .filter_map(|property| {
                    let index = property.name.parse::<usize>().ok()?;
                    let id = property.value?.object_id?;
                    Some((index, id.inner().clone()))
                })
                .collect();
            attach_ids(described, ids)
        }

        async fn click(&self, element: &ElementHandle) -> SondaResult<()> {
            let value = self
                .call_on(RemoteObjectId::new(element.id.clone()), CENTER_FUNCTION, Vec::new())
                .await?;
            let rect: BoundingBox = serde_json::from_value(value)?;
            if !rect.has_area() {
                return Err(SondaError::driver(format!(
                    "<{}> has no clickable area",
                    element.tag_name
                )));
            }
            let page = self.page().await?;
            page.click(Point {
                x: rect.x + rect.width / 2.0,
                y: rect.y + rect.height / 2.0,
            })
            .await
            .map_err(|e| SondaError::driver(e.to_string()))?;
            Ok(())
        }

        async fn send_keys(&self, element: &ElementHandle, text: &str) -> SondaResult<()> {
            self.click(element).await?;
            self.call_on(RemoteObjectId::new(element.id.clone()), FOCUS_FUNCTION, Vec::new())
                .await?;
            let page = self.page().await?;
            page.execute(InsertTextParams::new(text))
                .await
                .map_err(|e| SondaError::driver(e.to_string()))?;
            Ok(())
        }

        async fn clear(&self, element: &ElementHandle) -> SondaResult<()> {
            self.execute_script(CLEAR_SCRIPT, vec![element.into()])
                .await
                .map(|_| ())
        }

        async fn attribute(&self, element: &ElementHandle, name: &str) -> SondaResult<Option<String>> {
            let value = self
                .execute_script(ATTRIBUTE_SCRIPT, vec![element.into(), name.into()])
                .await?;
            Ok(value.as_str().map(ToString::to_string))
        }

        async fn execute_script(&self, script: &str, args: Vec<ScriptArg>) -> SondaResult<Value> {
            let target = args.iter().find_map(|arg| match arg {
                ScriptArg::Element(el) => Some(el.id.clone()),
                ScriptArg::Value(_) => None,
            });
            let Some(target) = target else {
                let rendered: Vec<String> = args
                    .iter()
                    .filter_map(|arg| match arg {
                        ScriptArg::Value(value) => Some(value.to_string()),
                        ScriptArg::Element(_) => None,
                    })
                    .collect();
                return self
                    .evaluate(format!(
                        "(function() {{ {script} }}).apply(null, [{}])",
                        rendered.join(", ")
                    ))
                    .await;
            };
            self.call_on(
                RemoteObjectId::new(target),
                &format!("function() {{ {script} }}"),
                call_arguments(&args),
            )
            .await
        }

        async fn current_url(&self) -> SondaResult<String> {
            let value = self.evaluate("window.location.href".to_string()).await?;
            Ok(value.as_str().unwrap_or_default().to_string())
        }

        async fn page_source(&self) -> SondaResult<String> {
            let page = self.page().await?;
            page.content()
                .await
                .map_err(|e| SondaError::driver(e.to_string()))
        }

        async fn screenshot(&self) -> SondaResult<Vec<u8>> {
            let page = self.page().await?;
            let params = CaptureScreenshotParams::builder()
                .format(CaptureScreenshotFormat::Png)
                .build();
            let screenshot = page
                .execute(params)
                .await
                .map_err(|e| SondaError::driver(e.to_string()))?;
            use base64::Engine;
            base64::engine::general_purpose::STANDARD
                .decode(&screenshot.data)
                .map_err(|e| SondaError::driver(e.to_string()))
        }

        async fn open_window(&self, url: &str) -> SondaResult<WindowHandle> {
            let page = {
                let browser = self.browser.lock().await;
                let browser = browser.as_ref().ok_or(SondaError::SessionReleased)?;
                browser
                    .new_page(url)
                    .await
                    .map_err(|e| SondaError::Navigation {
                        url: url.to_string(),
                        message: e.to_string(),
                    })?
            };
            Ok(self.windows.lock().await.push(page))
        }

        async fn window_handles(&self) -> SondaResult<Vec<WindowHandle>> {
            let windows = self.windows.lock().await;
            Ok(windows.pages.iter().map(|(h, _)| h.clone()).collect())
        }

        async fn switch_to_window(&self, handle: &WindowHandle) -> SondaResult<()> {
            let page = {
                let mut windows = self.windows.lock().await;
                let index = windows
                    .pages
                    .iter()
                    .position(|(h, _)| h == handle)
                    .ok_or_else(|| SondaError::driver(format!("no such window: {handle}")))?;
                windows.current = index;
                windows.pages[index].1.clone()
            };
            page.bring_to_front()
                .await
                .map_err(|e| SondaError::driver(e.to_string()))?;
            Ok(())
        }

        async fn close_window(&self) -> SondaResult<()> {
            let page = {
                let mut windows = self.windows.lock().await;
                if windows.pages.is_empty() {
                    return Err(SondaError::driver("no window to close"));
                }
                let current = windows.current;
                let (_, page) = windows.pages.remove(current);
                windows.current = 0;
                page
            };
            page.close()
                .await
                .map_err(|e| SondaError::driver(e.to_string()))
        }

        async fn quit(&self) -> SondaResult<()> {
            let browser = self.browser.lock().await.take();
            let Some(mut browser) = browser else {
                return Ok(());
            };
            let closed = browser.close().await.map(|_| ());
            let _ = browser.wait().await;
            self.handler.abort();
            closed.map_err(|e| SondaError::driver(e.to_string()))
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    mod config_tests {
        use super::*;

        #[test]
        fn test_defaults_follow_suite_setup() {
            let config = BrowserConfig::default();
            assert!(config.headless);
            assert_eq!(config.page_load_strategy, PageLoadStrategy::Eager);
            assert_eq!(config.chrome_args(), vec!["--start-maximized".to_string()]);
        }

        #[test]
        fn test_builder() {
            let config = BrowserConfig::default()
                .with_headless(false)
                .with_viewport(1920, 1080)
                .with_chromium_path("/usr/bin/chromium")
                .with_no_sandbox()
                .with_page_load_strategy(PageLoadStrategy::Normal)
                .with_arg("--lang=en-US");
            assert!(!config.headless);
            assert!(!config.sandbox);
            assert_eq!(config.viewport_width, 1920);
            assert_eq!(config.chromium_path.as_deref(), Some("/usr/bin/chromium"));
            assert_eq!(config.chrome_args().last().map(String::as_str), Some("--lang=en-US"));
        }

        #[test]
        fn test_yaml_partial() {
            let config: BrowserConfig =
                serde_yaml_ng::from_str("headless: false\npage_load_strategy: normal").unwrap();
            assert!(!config.headless);
            assert_eq!(config.page_load_strategy, PageLoadStrategy::Normal);
            assert_eq!(config.navigation_timeout(), Duration::from_secs(30));
        }
    }

    mod navigation_tests {
        use super::*;

        #[test]
        fn test_error_text_is_navigation_error() {
            let err = navigation_outcome("https://nowhere.invalid/", Some("net::ERR_NAME_NOT_RESOLVED"))
                .unwrap_err();
            assert!(matches!(
                err,
                SondaError::Navigation { ref url, ref message }
                    if url == "https://nowhere.invalid/" && message == "net::ERR_NAME_NOT_RESOLVED"
            ));
        }

        #[test]
        fn test_no_error_text_is_ok() {
            assert!(navigation_outcome("https://site.test/", None).is_ok());
            assert!(navigation_outcome("https://site.test/", Some("")).is_ok());
        }
    }

    #[cfg(feature = "browser")]
    mod cdp_tests {
        use crate::browser::cdp::{attach_ids, call_arguments, DESCRIBE_FUNCTION};
        use crate::driver::{ElementHandle, ScriptArg};
        use serde_json::json;

        fn handle(id: &str) -> ElementHandle {
            ElementHandle {
                id: id.to_string(),
                tag_name: "input".to_string(),
                text_content: None,
                bounding_box: None,
                displayed: true,
            }
        }

        #[test]
        fn test_lookup_leaves_the_page_untouched() {
            assert!(!DESCRIBE_FUNCTION.contains("setAttribute"));
            assert!(!DESCRIBE_FUNCTION.contains("window.__"));
        }

        #[test]
        fn test_attach_ids_follows_array_index() {
            let described = json!([
                {"tag_name": "a", "text_content": "first", "bounding_box": null, "displayed": false},
                {"tag_name": "button", "text_content": "second", "bounding_box": {"x": 1.0, "y": 2.0, "width": 3.0, "height": 4.0}, "displayed": true}
            ]);
            let ids = vec![(1, "obj-b".to_string()), (0, "obj-a".to_string())];
            let handles = attach_ids(described, ids).unwrap();
            assert_eq!(handles[0].id, "obj-a");
            assert_eq!(handles[0].tag_name, "a");
            assert!(!handles[0].displayed);
            assert_eq!(handles[1].id, "obj-b");
            assert!(handles[1].bounding_box.is_some());
        }

        #[test]
        fn test_attach_ids_count_mismatch() {
            let described = json!([{"tag_name": "a", "text_content": "", "bounding_box": null, "displayed": true}]);
            assert!(attach_ids(described, Vec::new()).is_err());
            assert!(attach_ids(json!(null), Vec::new()).unwrap().is_empty());
        }

        #[test]
        fn test_call_arguments_pass_elements_by_object_id() {
            let args = vec![ScriptArg::Element(handle("obj-7")), ScriptArg::Value(json!("value"))];
            let converted = call_arguments(&args);
            assert_eq!(converted.len(), 2);
            assert_eq!(converted[0].object_id.as_ref().map(|id| id.inner().as_str()), Some("obj-7"));
            assert!(converted[0].value.is_none());
            assert_eq!(converted[1].value, Some(json!("value")));
            assert!(converted[1].object_id.is_none());
        }
    }

    #[cfg(not(feature = "browser"))]
    mod launch_tests {
        use super::*;

        #[tokio::test]
        async fn test_launch_without_feature_is_acquisition_error() {
            let err = launch(BrowserConfig::default()).await.err().unwrap();
            assert!(matches!(err, SondaError::SessionAcquisition { .. }));
        }
    }
}
