//! Submitting a filled form and telling whether it went through.

use std::fmt;

use tracing::{debug, info, warn};

use crate::config::FillSettings;
use crate::error::{Error, Result};
use crate::field::FormConfig;
use crate::locator::{locate, xpath_literal, Query, Role};
use crate::surface::{poll_find, poll_find_css, Control, Surface};

const SUBMIT_TEXTS: &[&str] = &["Submit", "Send"];
const NEXT_TEXTS: &[&str] = &["Next", "Continue"];
const NATIVE_SUBMIT: &[&str] = &["//button[@type='submit']", "//input[@type='submit']"];

/// Body text fragments (lower-case) that indicate a recorded submission.
pub const SUCCESS_PATTERNS: &[&str] = &[
    "thank you",
    "thanks",
    "submitted",
    "response",
    "success",
    "form submitted",
    "thank you for",
];

/// XPaths for a button whose visible text is exactly `text`: Google-style
/// `role=button` divs with nested spans, then native buttons.
pub fn button_xpaths(text: &str) -> [String; 2] {
    let lit = xpath_literal(text.trim());
    [
        format!("//div[@role='button' and .//span[normalize-space()={lit}]]"),
        format!("//button[normalize-space()={lit}]"),
    ]
}

fn text_xpaths(texts: &[&str]) -> Vec<String> {
    texts.iter().flat_map(|t| button_xpaths(t)).collect()
}

fn submit_xpaths() -> Vec<String> {
    let mut xpaths = text_xpaths(SUBMIT_TEXTS);
    xpaths.extend(NATIVE_SUBMIT.iter().map(|x| x.to_string()));
    xpaths
}

/// Click the first button showing one of `texts`, polling up to `timeout`.
/// Returns whether anything was clicked.
pub async fn click_button_by_text<S: Surface>(
    surface: &S,
    texts: &[&str],
    settings: &FillSettings,
    timeout: std::time::Duration,
) -> Result<bool> {
    match poll_find(surface, &text_xpaths(texts), timeout, settings.poll_interval).await? {
        Some((_, button)) => {
            button.click().await?;
            Ok(true)
        }
        None => Ok(false),
    }
}

/// Click submit, paging through Next/Continue up to `max_pages` times.
///
/// The configured `submit_selector` wins over the text heuristics on every
/// page. Fails with [`Error::ElementNotFound`] when nothing clickable is left.
pub async fn submit<S: Surface>(surface: &S, config: &FormConfig, settings: &FillSettings) -> Result<()> {
    let submit = submit_xpaths();
    let next = text_xpaths(NEXT_TEXTS);
    let mut pages = 0;

    loop {
        if let Some(selector) = config.submit_selector.as_deref() {
            if let Some(button) = surface.find_css(selector).await? {
                button.click().await?;
                info!(%selector, "clicked configured submit control");
                return Ok(());
            }
            debug!(%selector, "configured submit control not present");
        }

        let mut xpaths = submit.clone();
        if pages < settings.max_pages {
            xpaths.extend(next.iter().cloned());
        }

        match poll_find(surface, &xpaths, settings.button_timeout, settings.poll_interval).await? {
            Some((idx, button)) if idx < submit.len() => {
                button.click().await?;
                info!(pages, "clicked submit");
                return Ok(());
            }
            Some((_, button)) => {
                button.click().await?;
                pages += 1;
                debug!(pages, "clicked next");
                surface.pause(settings.page_pause).await;
            }
            None => return Err(Error::ElementNotFound("submit control".into())),
        }
    }
}

/// Why success was assumed without a positive signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssumedReason {
    NoInputs,
    NoSubmitControl,
    FieldsCleared,
}

/// What `wait_for_success` concluded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SuccessSignal {
    Selector,
    UrlMatch(String),
    /// The success pattern found in the page text.
    Text(String),
    Assumed(AssumedReason),
    Unknown,
}

impl SuccessSignal {
    pub fn is_confirmed(&self) -> bool {
        !matches!(self, SuccessSignal::Unknown)
    }
}

impl fmt::Display for SuccessSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SuccessSignal::Selector => f.write_str("success selector appeared"),
            SuccessSignal::UrlMatch(url) => write!(f, "url matched ({url})"),
            SuccessSignal::Text(pattern) => write!(f, "page says '{pattern}'"),
            SuccessSignal::Assumed(AssumedReason::NoInputs) => f.write_str("assumed: no inputs left"),
            SuccessSignal::Assumed(AssumedReason::NoSubmitControl) => {
                f.write_str("assumed: submit control gone")
            }
            SuccessSignal::Assumed(AssumedReason::FieldsCleared) => f.write_str("assumed: fields cleared"),
            SuccessSignal::Unknown => f.write_str("unknown"),
        }
    }
}

async fn success_text<S: Surface>(surface: &S) -> Result<Option<String>> {
    let body = surface.body_text().await?.to_lowercase();
    Ok(SUCCESS_PATTERNS
        .iter()
        .find(|p| body.contains(*p))
        .map(|p| p.to_string()))
}

/// Decide whether the submission went through. Never fails on a missing
/// signal; only driver errors are returned.
pub async fn wait_for_success<S: Surface>(
    surface: &S,
    config: &FormConfig,
    settings: &FillSettings,
) -> Result<SuccessSignal> {
    let page = &config.page;

    if let Some(selector) = page.success_selector.as_deref() {
        let found = poll_find_css(surface, selector, settings.success_timeout, settings.poll_interval).await?;
        if found.is_some() {
            return Ok(SuccessSignal::Selector);
        }
        debug!(%selector, "success selector did not appear");
    }

    if let Some(fragment) = page.success_url_contains.as_deref() {
        let url = surface.current_url().await?;
        if url.contains(fragment) {
            return Ok(SuccessSignal::UrlMatch(url));
        }
        debug!(%url, %fragment, "url does not match");
    }

    if let Some(pattern) = success_text(surface).await? {
        return Ok(SuccessSignal::Text(pattern));
    }
    surface.pause(settings.settle_pause).await;
    if let Some(pattern) = success_text(surface).await? {
        return Ok(SuccessSignal::Text(pattern));
    }

    if surface.count("//input[not(@type='hidden')] | //textarea").await? == 0 {
        return Ok(SuccessSignal::Assumed(AssumedReason::NoInputs));
    }
    let submit_left = submit_xpaths().join(" | ");
    if surface.count(&submit_left).await? == 0 {
        return Ok(SuccessSignal::Assumed(AssumedReason::NoSubmitControl));
    }
    if let Some(sentinel) = config.sentinel_field() {
        let query = Query::new(Role::TextEntry, &sentinel.label);
        if let Some(found) = locate(surface, &query).await? {
            if found.control.value().await?.is_empty() {
                return Ok(SuccessSignal::Assumed(AssumedReason::FieldsCleared));
            }
        }
    }

    warn!("could not confirm the submission");
    Ok(SuccessSignal::Unknown)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn button_xpaths_quote_text() {
        let [div, button] = button_xpaths("Send");
        assert_eq!(div, "//div[@role='button' and .//span[normalize-space()='Send']]");
        assert_eq!(button, "//button[normalize-space()='Send']");

        let [div, _] = button_xpaths("Don't stop");
        assert!(div.contains("\"Don't stop\""));
    }

    #[test]
    fn submit_candidates_put_text_before_native() {
        let xpaths = submit_xpaths();
        assert_eq!(xpaths.len(), 6);
        assert!(xpaths[0].contains("'Submit'"));
        assert!(xpaths[2].contains("'Send'"));
        assert_eq!(xpaths[5], "//input[@type='submit']");
    }

    #[test]
    fn only_unknown_is_unconfirmed() {
        assert!(SuccessSignal::Text("thanks".into()).is_confirmed());
        assert!(SuccessSignal::Assumed(AssumedReason::NoInputs).is_confirmed());
        assert!(!SuccessSignal::Unknown.is_confirmed());
    }
}
