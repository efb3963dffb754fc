//! Interaction helpers built on [`BrowserDriver`] scripts.
//!
//! Script clicks bypass overlays and "element not interactable" failures
//! that native clicks hit on animated single-page layouts.

use serde_json::Value;

use crate::driver::{BrowserDriver, ElementHandle, ScriptArg};
use crate::locator::LocatorChain;
use crate::result::{SondaError, SondaResult};
use crate::wait::fragment;

/// Click through the DOM instead of the input pipeline
pub const CLICK_SCRIPT: &str = "arguments[0].click();";

/// Center the element vertically in the viewport
pub const SCROLL_INTO_VIEW_SCRIPT: &str =
    "arguments[0].scrollIntoView({block: 'center', inline: 'nearest'});";

/// Replace the URL fragment
pub const SET_HASH_SCRIPT: &str = "window.location.hash = arguments[0];";

/// Scroll to the end of the document
pub const SCROLL_TO_BOTTOM_SCRIPT: &str = "window.scrollTo(0, document.body.scrollHeight);";

/// HTML5 constraint validation of the first element matching a CSS selector
pub const CHECK_VALIDITY_SCRIPT: &str = "const el = document.querySelector(arguments[0]); \
if (!el) { throw new Error('no element matches ' + arguments[0]); } \
return el.checkValidity();";

/// Click an element via script
pub async fn js_click(driver: &dyn BrowserDriver, element: &ElementHandle) -> SondaResult<()> {
    tracing::debug!(element = %element.id, "script click");
    driver
        .execute_script(CLICK_SCRIPT, vec![element.into()])
        .await
        .map(|_| ())
}

/// Scroll an element to the middle of the viewport
pub async fn scroll_into_view(driver: &dyn BrowserDriver, element: &ElementHandle) -> SondaResult<()> {
    driver
        .execute_script(SCROLL_INTO_VIEW_SCRIPT, vec![element.into()])
        .await
        .map(|_| ())
}

/// Resolve the chain, scroll the element into view and click it via script
pub async fn click(driver: &dyn BrowserDriver, chain: &LocatorChain) -> SondaResult<ElementHandle> {
    let element = chain.resolve(driver).await?;
    scroll_into_view(driver, &element).await?;
    js_click(driver, &element).await?;
    Ok(element)
}

/// Clear an input then type into it
pub async fn fill(driver: &dyn BrowserDriver, element: &ElementHandle, text: &str) -> SondaResult<()> {
    driver.clear(element).await?;
    driver.send_keys(element, text).await
}

/// Current URL fragment including `#`, or the empty string
pub async fn location_hash(driver: &dyn BrowserDriver) -> SondaResult<String> {
    let url = driver.current_url().await?;
    Ok(fragment(&url).to_string())
}

/// Set the URL fragment; a leading `#` is optional
pub async fn set_location_hash(driver: &dyn BrowserDriver, hash: &str) -> SondaResult<()> {
    let hash = if hash.starts_with('#') {
        hash.to_string()
    } else {
        format!("#{hash}")
    };
    driver
        .execute_script(SET_HASH_SCRIPT, vec![ScriptArg::Value(Value::String(hash))])
        .await
        .map(|_| ())
}

/// Scroll to the bottom of the page
pub async fn scroll_to_bottom(driver: &dyn BrowserDriver) -> SondaResult<()> {
    driver
        .execute_script(SCROLL_TO_BOTTOM_SCRIPT, Vec::new())
        .await
        .map(|_| ())
}

/// Whether the form control matching `css` passes constraint validation
///
/// # Errors
///
/// Fails when no element matches or the result is not a boolean.
pub async fn check_validity(driver: &dyn BrowserDriver, css: &str) -> SondaResult<bool> {
    let value = driver
        .execute_script(CHECK_VALIDITY_SCRIPT, vec![css.into()])
        .await?;
    value
        .as_bool()
        .ok_or_else(|| SondaError::script(format!("checkValidity() on {css} returned {value}")))
}

/// Resolve the chain and read an attribute of the element
pub async fn attribute(
    driver: &dyn BrowserDriver,
    chain: &LocatorChain,
    name: &str,
) -> SondaResult<Option<String>> {
    let element = chain.resolve(driver).await?;
    driver.attribute(&element, name).await
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::driver::MockDriver;
    use crate::locator::Selector;
    use serde_json::json;

    #[tokio::test]
    async fn test_js_click_goes_through_script() {
        let driver = MockDriver::new();
        let link = ElementHandle::new("nav-contact", "a");
        js_click(&driver, &link).await.unwrap();
        assert!(driver.was_called("js_click:nav-contact"));
        assert!(!driver.was_called("click:"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_click_scrolls_then_clicks() {
        let driver = MockDriver::new();
        driver.add_element(Selector::css("#send"), ElementHandle::new("send", "button"));
        click(&driver, &LocatorChain::single(Selector::css("#send")))
            .await
            .unwrap();

        let history = driver.history();
        let scroll = history
            .iter()
            .position(|c| c.contains("scrollIntoView"))
            .unwrap();
        let clicked = history.iter().position(|c| c == "js_click:send").unwrap();
        assert!(scroll < clicked);
    }

    #[tokio::test]
    async fn test_fill_replaces_value() {
        let driver = MockDriver::new();
        let email = ElementHandle::new("email", "input");
        driver.send_keys(&email, "old@x.test").await.unwrap();
        fill(&driver, &email, "admin@site.test").await.unwrap();
        assert_eq!(driver.value_of("email").as_deref(), Some("admin@site.test"));
    }

    #[tokio::test]
    async fn test_hash_roundtrip() {
        let driver = MockDriver::new();
        driver.navigate_sync("https://site.test/");
        assert_eq!(location_hash(&driver).await.unwrap(), "");
        set_location_hash(&driver, "contact").await.unwrap();
        assert_eq!(location_hash(&driver).await.unwrap(), "#contact");
        assert_eq!(driver.current_url().await.unwrap(), "https://site.test/#contact");
    }

    #[tokio::test]
    async fn test_check_validity() {
        let driver = MockDriver::new();
        driver.on_script(CHECK_VALIDITY_SCRIPT, json!(false));
        assert!(!check_validity(&driver, "#email").await.unwrap());
    }

    #[tokio::test]
    async fn test_check_validity_non_boolean_is_error() {
        let driver = MockDriver::new();
        let err = check_validity(&driver, "#missing").await.unwrap_err();
        assert!(err.to_string().contains("#missing"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_attribute_of_resolved_element() {
        let driver = MockDriver::new();
        driver.add_element(Selector::css("a.gh"), ElementHandle::new("gh", "a"));
        driver.set_attribute("gh", "href", "https://github.com/someone");
        let href = attribute(&driver, &LocatorChain::single(Selector::css("a.gh")), "href")
            .await
            .unwrap();
        assert_eq!(href.as_deref(), Some("https://github.com/someone"));
    }
}
