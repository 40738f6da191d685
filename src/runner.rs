//! Per-form orchestration: open, wait, fill, submit.

use std::fmt;

use tracing::{debug, info, warn};

use crate::config::FillSettings;
use crate::error::{Error, Result};
use crate::field::{FieldSpec, FormConfig};
use crate::filler::{self, FillOutcome};
use crate::submit::{self, SuccessSignal};
use crate::surface::{poll_find, poll_rounds, Surface};

/// Any of these means the form has rendered.
const READY_XPATHS: &[&str] = &["//form", "//input[@aria-label]", "//textarea[@aria-label]"];

const CONSENT_TEXTS: &[&str] = &["I agree", "Accept all", "Accept All", "Accept"];

/// Forces form controls visible and pushes large overlays out of the way.
/// Some single-page forms keep inputs hidden until an animation finishes.
pub const REVEAL_HIDDEN_JS: &str = r#"
(() => {
    document.querySelectorAll('input, textarea, select, button').forEach(el => {
        el.style.display = 'block';
        el.style.visibility = 'visible';
        el.style.opacity = '1';
        el.style.position = 'relative';
        el.style.zIndex = '9999';
    });
    document.querySelectorAll('div, section').forEach(el => {
        const z = parseInt(window.getComputedStyle(el).zIndex, 10);
        if (z > 1000 && !el.querySelector('input, textarea, select')) {
            el.style.display = 'none';
        }
    });
})()
"#;

/// Wait until the form has rendered.
pub async fn wait_until_ready<S: Surface>(surface: &S, settings: &FillSettings) -> Result<()> {
    let xpaths: Vec<String> = READY_XPATHS.iter().map(|x| x.to_string()).collect();
    match poll_find(surface, &xpaths, settings.ready_timeout, settings.poll_interval).await? {
        Some((idx, _)) => {
            debug!(xpath = READY_XPATHS[idx], "form ready");
            Ok(())
        }
        None => Err(Error::Timeout("form to render".into())),
    }
}

/// Dismiss a cookie/consent dialog if one shows up. Best effort.
pub async fn accept_consent<S: Surface>(surface: &S, settings: &FillSettings) -> Result<bool> {
    let clicked =
        submit::click_button_by_text(surface, CONSENT_TEXTS, settings, settings.consent_timeout).await?;
    if clicked {
        debug!("accepted consent dialog");
    }
    Ok(clicked)
}

/// Wait until no element matches `selector`, e.g. a loading spinner. A
/// spinner that never goes away is logged and otherwise ignored.
pub async fn wait_for_absent<S: Surface>(surface: &S, selector: &str, settings: &FillSettings) -> Result<()> {
    let rounds = poll_rounds(settings.ready_timeout, settings.poll_interval);
    for round in 0..rounds {
        if surface.find_css(selector).await?.is_none() {
            return Ok(());
        }
        if round + 1 < rounds {
            surface.pause(settings.poll_interval).await;
        }
    }
    warn!(%selector, "still present after {:?}, continuing", settings.ready_timeout);
    Ok(())
}

/// Navigate to the form and get it ready for filling.
pub async fn open_form<S: Surface>(surface: &S, config: &FormConfig, settings: &FillSettings) -> Result<()> {
    let url = config
        .url()
        .ok_or_else(|| Error::Config("no form URL configured".into()))?;
    info!(%url, "opening form");
    surface.goto(url).await?;

    if let Some(spinner) = config.page.idle_spinner.as_deref() {
        wait_for_absent(surface, spinner, settings).await?;
    }
    wait_until_ready(surface, settings).await?;
    accept_consent(surface, settings).await?;
    if config.page.reveal_hidden {
        surface.run_script(REVEAL_HIDDEN_JS).await?;
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldStatus {
    Done(FillOutcome),
    /// A field-local error; the rest of the form was still filled.
    Failed(String),
}

/// Result of filling one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldReport {
    pub label: String,
    pub status: FieldStatus,
}

impl FieldReport {
    pub fn is_filled(&self) -> bool {
        matches!(self.status, FieldStatus::Done(FillOutcome::Filled))
    }
}

impl fmt::Display for FieldReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.status {
            FieldStatus::Done(outcome) => write!(f, "{}: {outcome}", self.label),
            FieldStatus::Failed(error) => write!(f, "{}: FAILED ({error})", self.label),
        }
    }
}

/// Fill every field in order. Field-local errors are logged and recorded;
/// anything else aborts.
pub async fn fill_fields<S: Surface>(
    surface: &S,
    fields: &[FieldSpec],
    settings: &FillSettings,
) -> Result<Vec<FieldReport>> {
    let mut reports = Vec::with_capacity(fields.len());
    for field in fields {
        let label = field.display_label();
        let status = match filler::fill(surface, field, settings).await {
            Ok(outcome) => {
                if outcome.is_filled() {
                    info!(field = %label, "{outcome}");
                } else {
                    warn!(field = %label, "{outcome}");
                }
                FieldStatus::Done(outcome)
            }
            Err(e) if e.is_field_local() => {
                warn!(field = %label, "fill failed: {e}");
                FieldStatus::Failed(e.to_string())
            }
            Err(e) => return Err(e),
        };
        reports.push(FieldReport { label, status });
    }
    Ok(reports)
}

/// Everything that happened in one submission.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub fields: Vec<FieldReport>,
    pub signal: SuccessSignal,
}

/// Open, fill and submit, without waiting for the confirmation.
pub async fn fill_and_submit<S: Surface>(
    surface: &S,
    config: &FormConfig,
    settings: &FillSettings,
) -> Result<Vec<FieldReport>> {
    open_form(surface, config, settings).await?;
    let fields = fill_fields(surface, &config.fields, settings).await?;
    submit::submit(surface, config, settings).await?;
    Ok(fields)
}

/// Give a submitted form time to respond, then read the success signal.
pub async fn confirm<S: Surface>(
    surface: &S,
    config: &FormConfig,
    settings: &FillSettings,
) -> Result<SuccessSignal> {
    surface.pause(settings.after_submit_pause).await;
    let signal = submit::wait_for_success(surface, config, settings).await?;
    info!(%signal, "submitted");
    Ok(signal)
}

/// Open, fill, submit and check for success.
pub async fn submit_once<S: Surface>(
    surface: &S,
    config: &FormConfig,
    settings: &FillSettings,
) -> Result<RunReport> {
    let fields = fill_and_submit(surface, config, settings).await?;
    let signal = confirm(surface, config, settings).await?;
    Ok(RunReport { fields, signal })
}

/// Fill without submitting.
pub async fn prefill<S: Surface>(
    surface: &S,
    config: &FormConfig,
    settings: &FillSettings,
) -> Result<Vec<FieldReport>> {
    open_form(surface, config, settings).await?;
    fill_fields(surface, &config.fields, settings).await
}

/// Tally of a bulk run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RowsSummary {
    pub submitted: usize,
    pub missing_submit: usize,
}

/// One submission per row. A row whose form has no submit control is logged
/// and skipped; other errors abort the run.
pub async fn run_rows<S: Surface>(
    surface: &S,
    url: &str,
    rows: &[Vec<FieldSpec>],
    settings: &FillSettings,
) -> Result<RowsSummary> {
    let mut summary = RowsSummary::default();
    for (idx, row) in rows.iter().enumerate() {
        info!(row = idx + 1, total = rows.len(), "submitting row");
        let config = FormConfig::default().with_url(url).with_fields(row.clone());
        match submit_once(surface, &config, settings).await {
            Ok(_) => summary.submitted += 1,
            Err(Error::ElementNotFound(what)) => {
                warn!(row = idx + 1, "no {what} found, moving on");
                summary.missing_submit += 1;
            }
            Err(e) => return Err(e),
        }
    }
    Ok(summary)
}
