use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::page::Page as CrPage;
use chromiumoxide::page::ScreenshotParams;
use serde::de::DeserializeOwned;
use tracing::trace;

use crate::element::Element;
use crate::error::{Error, Result};
use crate::surface::Surface;

/// Represents a form control discovered on the page.
#[derive(Debug, Clone, serde::Deserialize, serde::Serialize)]
pub struct FormField {
    pub tag: String,
    pub r#type: String,
    pub name: String,
    pub id: String,
    pub value: String,
    pub placeholder: String,
    pub label: String,
}

/// Wrapper around a chromiumoxide Page with a simplified, form-oriented API.
pub struct Page {
    inner: CrPage,
    default_timeout: Duration,
}

impl Page {
    pub(crate) fn new(inner: CrPage, default_timeout: Duration) -> Self {
        Self { inner, default_timeout }
    }

    // ── Navigation ──────────────────────────────────────────────────

    /// Navigate to the given URL and wait for the page to load, bounded by
    /// the browser's default timeout.
    pub async fn goto(&self, url: &str) -> Result<()> {
        tokio::time::timeout(self.default_timeout, self.inner.goto(url))
            .await
            .map_err(|_| Error::Timeout(format!("navigation to {url}")))?
            .map_err(|e| Error::NavigationError(e.to_string()))?;
        Ok(())
    }

    /// Get the current page URL.
    pub async fn url(&self) -> Result<String> {
        self.inner
            .url()
            .await
            .map_err(|e| Error::NavigationError(e.to_string()))?
            .ok_or_else(|| Error::NavigationError("No URL found".into()))
    }

    /// Get the current page title.
    pub async fn title(&self) -> Result<String> {
        let result = self
            .inner
            .evaluate("document.title")
            .await
            .map_err(|e| Error::JsError(e.to_string()))?;
        match result.into_value::<String>() {
            Ok(title) => Ok(title),
            Err(_) => Ok(String::new()),
        }
    }

    // ── Observations ────────────────────────────────────────────────

    /// Take a full-page screenshot and save it to a file (PNG format).
    pub async fn screenshot_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let params = ScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .full_page(true)
            .build();
        self.inner
            .save_screenshot(params, path)
            .await
            .map_err(|e| Error::ScreenshotError(e.to_string()))?;
        Ok(())
    }

    /// Get the full HTML content of the page.
    pub async fn html(&self) -> Result<String> {
        self.inner
            .content()
            .await
            .map_err(|e| Error::JsError(e.to_string()))
    }

    /// Get all form controls on the page together with their labels.
    pub async fn get_form_fields(&self) -> Result<Vec<FormField>> {
        let js = r#"
            JSON.stringify(
                Array.from(document.querySelectorAll('input, select, textarea')).map(el => {
                    let label = '';
                    if (el.id) {
                        const labelEl = document.querySelector(`label[for="${el.id}"]`);
                        if (labelEl) label = (labelEl.innerText || '').trim();
                    }
                    if (!label && el.closest('label')) {
                        label = (el.closest('label').innerText || '').trim();
                    }
                    if (!label) label = el.getAttribute('aria-label') || '';
                    return {
                        tag: el.tagName.toLowerCase(),
                        type: el.type || '',
                        name: el.name || '',
                        id: el.id || '',
                        value: el.value || '',
                        placeholder: el.placeholder || '',
                        label: label
                    };
                })
            )
        "#;
        self.evaluate_json(js).await
    }

    /// Get the text of every `<label>` and `<button>` on the page.
    pub async fn labels_and_buttons(&self) -> Result<(Vec<String>, Vec<String>)> {
        let labels = self.texts("//label").await?;
        let buttons = self.texts("//button").await?;
        Ok((labels, buttons))
    }

    /// Evaluate an expression that returns `JSON.stringify(...)` and decode it.
    pub async fn evaluate_json<T: DeserializeOwned>(&self, expression: &str) -> Result<T> {
        let result = self
            .inner
            .evaluate(expression)
            .await
            .map_err(|e| Error::JsError(e.to_string()))?;
        let json_str: String = result
            .into_value()
            .map_err(|e| Error::JsError(e.to_string()))?;
        serde_json::from_str(&json_str).map_err(|e| Error::JsError(e.to_string()))
    }

    /// Evaluate a JavaScript expression without caring about the return value.
    pub async fn evaluate_void(&self, expression: &str) -> Result<()> {
        self.inner
            .evaluate(expression)
            .await
            .map_err(|e| Error::JsError(e.to_string()))?;
        Ok(())
    }

    /// Release the tab.
    pub async fn close(self) -> Result<()> {
        self.inner.close().await?;
        Ok(())
    }
}

/// Wraps an XPath expression in a snapshot query; `body` sees the snapshot as `snap`.
fn xpath_snapshot_js(xpath: &str, body: &str) -> Result<String> {
    let xpath_js = serde_json::to_string(xpath)?;
    Ok(format!(
        r#"
        (() => {{
            const snap = document.evaluate({xpath_js}, document, null,
                XPathResult.ORDERED_NODE_SNAPSHOT_TYPE, null);
            {body}
        }})()
        "#
    ))
}

#[async_trait]
impl Surface for Page {
    type Control = Element;

    async fn find(&self, xpath: &str) -> Result<Option<Element>> {
        match self.inner.find_xpath(xpath).await {
            Ok(el) => Ok(Some(Element::new(el, self.inner.clone()))),
            Err(e) => {
                trace!(%xpath, "no match: {e}");
                Ok(None)
            }
        }
    }

    async fn find_css(&self, selector: &str) -> Result<Option<Element>> {
        match self.inner.find_element(selector).await {
            Ok(el) => Ok(Some(Element::new(el, self.inner.clone()))),
            Err(e) => {
                trace!(%selector, "no match: {e}");
                Ok(None)
            }
        }
    }

    async fn count(&self, xpath: &str) -> Result<usize> {
        let js = xpath_snapshot_js(xpath, "return snap.snapshotLength;")?;
        let result = self
            .inner
            .evaluate(js)
            .await
            .map_err(|e| Error::JsError(e.to_string()))?;
        result
            .into_value::<usize>()
            .map_err(|e| Error::JsError(e.to_string()))
    }

    async fn texts(&self, xpath: &str) -> Result<Vec<String>> {
        let js = xpath_snapshot_js(
            xpath,
            r#"
            const out = [];
            for (let i = 0; i < snap.snapshotLength; i++) {
                const node = snap.snapshotItem(i);
                const text = (node.innerText || node.textContent || '').trim();
                if (text) out.push(text);
            }
            return JSON.stringify(out);
            "#,
        )?;
        self.evaluate_json(&js).await
    }

    async fn body_text(&self) -> Result<String> {
        let result = self
            .inner
            .evaluate("document.body ? document.body.innerText : ''")
            .await
            .map_err(|e| Error::JsError(e.to_string()))?;
        Ok(result.into_value::<String>().unwrap_or_default())
    }

    async fn current_url(&self) -> Result<String> {
        self.url().await
    }

    async fn goto(&self, url: &str) -> Result<()> {
        Page::goto(self, url).await
    }

    async fn run_script(&self, script: &str) -> Result<()> {
        self.evaluate_void(script).await
    }
}
