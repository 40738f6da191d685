//! The page-level interface the locator, filler and submission driver are
//! written against. [`crate::Page`] and [`crate::Element`] implement it over
//! Chromium; tests implement it in memory.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;

/// A single DOM control that can be interacted with.
#[async_trait]
pub trait Control: Send + Sync {
    async fn click(&self) -> Result<()>;

    /// Empty the control's value.
    async fn clear(&self) -> Result<()>;

    /// Type text into the control with keyboard events.
    async fn type_text(&self, text: &str) -> Result<()>;

    /// Press a named key ("Enter", "Escape", ...) on the control.
    async fn press_key(&self, key: &str) -> Result<()>;

    async fn attribute(&self, name: &str) -> Result<Option<String>>;

    /// Current `value` property, empty when the control has none.
    async fn value(&self) -> Result<String>;

    /// Lower-case tag name.
    async fn tag_name(&self) -> Result<String>;

    /// Checked state of a native checkbox/radio or an ARIA pseudo-widget.
    async fn is_checked(&self) -> Result<bool>;

    async fn scroll_into_view(&self) -> Result<()>;

    /// Select a native `<select>` option by its exact visible label.
    /// Returns `false` when no option carries that label.
    async fn select_option_by_label(&self, label: &str) -> Result<bool>;

    /// Set the files of an `<input type="file">`.
    async fn set_files(&self, paths: &[PathBuf]) -> Result<()>;
}

/// A rendered page that controls can be found on.
#[async_trait]
pub trait Surface: Send + Sync {
    type Control: Control;

    /// First control matching an XPath expression, if any.
    async fn find(&self, xpath: &str) -> Result<Option<Self::Control>>;

    /// First control matching a CSS selector, if any.
    async fn find_css(&self, selector: &str) -> Result<Option<Self::Control>>;

    /// Number of nodes matching an XPath expression.
    async fn count(&self, xpath: &str) -> Result<usize>;

    /// Trimmed visible text of every node matching an XPath expression.
    async fn texts(&self, xpath: &str) -> Result<Vec<String>>;

    /// Visible text of the whole document.
    async fn body_text(&self) -> Result<String>;

    async fn current_url(&self) -> Result<String>;

    async fn goto(&self, url: &str) -> Result<()>;

    /// Run a script for its side effects.
    async fn run_script(&self, script: &str) -> Result<()>;

    /// Fixed pause to let client-side UI settle.
    async fn pause(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// How many lookups fit in `timeout` at one per `interval`; at least one.
pub(crate) fn poll_rounds(timeout: Duration, interval: Duration) -> usize {
    if interval.is_zero() {
        return 1;
    }
    (timeout.as_nanos() / interval.as_nanos()).max(1) as usize
}

/// Poll until one of `xpaths` matches, trying them in order on every round.
/// Returns the index of the matching expression and its control.
pub async fn poll_find<S: Surface>(
    surface: &S,
    xpaths: &[String],
    timeout: Duration,
    interval: Duration,
) -> Result<Option<(usize, S::Control)>> {
    let rounds = poll_rounds(timeout, interval);

    for round in 0..rounds {
        for (idx, xpath) in xpaths.iter().enumerate() {
            if let Some(control) = surface.find(xpath).await? {
                return Ok(Some((idx, control)));
            }
        }
        if round + 1 < rounds {
            surface.pause(interval).await;
        }
    }
    Ok(None)
}

/// Poll until a CSS selector matches.
pub async fn poll_find_css<S: Surface>(
    surface: &S,
    selector: &str,
    timeout: Duration,
    interval: Duration,
) -> Result<Option<S::Control>> {
    let rounds = poll_rounds(timeout, interval);

    for round in 0..rounds {
        if let Some(control) = surface.find_css(selector).await? {
            return Ok(Some(control));
        }
        if round + 1 < rounds {
            surface.pause(interval).await;
        }
    }
    Ok(None)
}
