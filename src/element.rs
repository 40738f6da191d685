use std::path::PathBuf;

use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::dom::SetFileInputFilesParams;
use chromiumoxide::element::Element as CrElement;
use chromiumoxide::page::Page as CrPage;

use crate::error::{Error, Result};
use crate::surface::Control;

const CLEAR_FN: &str = r#"function() {
    if ('value' in this) {
        this.value = '';
        this.dispatchEvent(new Event('input', { bubbles: true }));
        this.dispatchEvent(new Event('change', { bubbles: true }));
    }
}"#;

const VALUE_FN: &str =
    "function() { return this.value === undefined || this.value === null ? '' : String(this.value); }";

const TAG_FN: &str = "function() { return this.tagName.toLowerCase(); }";

const CHECKED_FN: &str =
    "function() { return this.checked === true || this.getAttribute('aria-checked') === 'true'; }";

/// Wrapper around a chromiumoxide Element, providing a simplified API.
pub struct Element {
    inner: CrElement,
    page: CrPage,
}

impl Element {
    pub(crate) fn new(inner: CrElement, page: CrPage) -> Self {
        Self { inner, page }
    }

    async fn call_string(&self, function: &str) -> Result<String> {
        let returns = self.inner.call_js_fn(function, false).await?;
        Ok(returns
            .result
            .value
            .and_then(|v| v.as_str().map(str::to_owned))
            .unwrap_or_default())
    }

    async fn call_bool(&self, function: &str) -> Result<bool> {
        let returns = self.inner.call_js_fn(function, false).await?;
        Ok(returns
            .result
            .value
            .and_then(|v| v.as_bool())
            .unwrap_or(false))
    }
}

#[async_trait]
impl Control for Element {
    /// Click this element (scrolls into view first).
    async fn click(&self) -> Result<()> {
        self.inner.click().await?;
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.inner.call_js_fn(CLEAR_FN, false).await?;
        Ok(())
    }

    /// Type text into this element (wraps type_str).
    async fn type_text(&self, text: &str) -> Result<()> {
        self.inner.type_str(text).await?;
        Ok(())
    }

    /// Press a key on this element (e.g. "Enter", "Escape").
    async fn press_key(&self, key: &str) -> Result<()> {
        self.inner.press_key(key).await?;
        Ok(())
    }

    async fn attribute(&self, name: &str) -> Result<Option<String>> {
        Ok(self.inner.attribute(name).await?)
    }

    async fn value(&self) -> Result<String> {
        self.call_string(VALUE_FN).await
    }

    async fn tag_name(&self) -> Result<String> {
        self.call_string(TAG_FN).await
    }

    async fn is_checked(&self) -> Result<bool> {
        self.call_bool(CHECKED_FN).await
    }

    async fn scroll_into_view(&self) -> Result<()> {
        self.inner.scroll_into_view().await?;
        Ok(())
    }

    async fn select_option_by_label(&self, label: &str) -> Result<bool> {
        let label_js = serde_json::to_string(label)?;
        let function = format!(
            r#"function() {{
                const wanted = {label_js};
                const option = Array.from(this.options || []).find(o => (o.label || o.text || '').trim() === wanted);
                if (!option) return false;
                this.value = option.value;
                this.dispatchEvent(new Event('input', {{ bubbles: true }}));
                this.dispatchEvent(new Event('change', {{ bubbles: true }}));
                return true;
            }}"#
        );
        self.call_bool(&function).await
    }

    async fn set_files(&self, paths: &[PathBuf]) -> Result<()> {
        let files: Vec<String> = paths.iter().map(|p| p.display().to_string()).collect();
        let params = SetFileInputFilesParams::builder()
            .files(files)
            .backend_node_id(self.inner.backend_node_id.clone())
            .build()
            .map_err(Error::JsError)?;
        self.page.execute(params).await?;
        Ok(())
    }
}
