//! Per-type value filling.
//!
//! [`fill`] locates the control for a [`FieldSpec`] and drives the
//! interaction its type needs. Absent controls and malformed values are
//! reported as a [`FillOutcome`]; only unsupported types, missing attachment
//! files and driver failures are errors.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use tracing::debug;

use crate::config::FillSettings;
use crate::error::{Error, Result};
use crate::field::{FieldKind, FieldSpec, FieldValue};
use crate::locator::{composite_xpath, locate, xpath_literal, Located, Query, Role};
use crate::surface::{Control, Surface};
use crate::values::{match_option, parse_date, parse_time};

/// Options rendered by ARIA listbox widgets.
const OPTION_XPATH: &str = "//*[@role='option']";

/// What happened to one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FillOutcome {
    Filled,
    NotFound,
    /// No fill was attempted, e.g. a malformed date.
    Skipped(String),
    /// The control exists but has no option with this label.
    OptionMissing(String),
    /// Some items of a multi-valued field were not found.
    Partial { missing: Vec<String> },
}

impl FillOutcome {
    pub fn is_filled(&self) -> bool {
        matches!(self, FillOutcome::Filled)
    }
}

impl fmt::Display for FillOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FillOutcome::Filled => f.write_str("OK"),
            FillOutcome::NotFound => f.write_str("NOT FOUND"),
            FillOutcome::Skipped(reason) => write!(f, "SKIPPED ({reason})"),
            FillOutcome::OptionMissing(option) => write!(f, "NO OPTION '{option}'"),
            FillOutcome::Partial { missing } => write!(f, "PARTIAL (missing: {})", missing.join("; ")),
        }
    }
}

/// Fill one field.
pub async fn fill<S: Surface>(surface: &S, field: &FieldSpec, settings: &FillSettings) -> Result<FillOutcome> {
    let entry_id = field.entry_id.as_deref();
    match &field.kind {
        FieldKind::Text | FieldKind::Paragraph => {
            fill_text(surface, &field.label, entry_id, &field.value.as_text()).await
        }
        FieldKind::Date => fill_date(surface, field).await,
        FieldKind::Time => fill_time(surface, field).await,
        FieldKind::Dropdown => fill_dropdown(surface, field, settings).await,
        FieldKind::Choice => fill_choice(surface, field).await,
        FieldKind::Checkbox => match field.value {
            FieldValue::Flag(checked) => set_checkbox(surface, &field.label, checked).await,
            ref value => fill_checkboxes(surface, &field.label, entry_id, &value.as_list()).await,
        },
        FieldKind::MultiSelect => fill_multi_select(surface, field, settings).await,
        FieldKind::Attachment => fill_attachment(surface, field).await,
        FieldKind::Unsupported(kind) => Err(Error::UnsupportedFieldType {
            label: field.display_label(),
            kind: kind.clone(),
        }),
    }
}

/// Clear a control, ignoring failures, then type into it.
async fn type_into<C: Control>(control: &C, text: &str) -> Result<()> {
    if let Err(e) = control.clear().await {
        debug!("clear failed, typing anyway: {e}");
    }
    control.type_text(text).await
}

async fn fill_text<S: Surface>(
    surface: &S,
    label: &str,
    entry_id: Option<&str>,
    text: &str,
) -> Result<FillOutcome> {
    let query = Query::new(Role::TextEntry, label).entry_id(entry_id);
    match locate(surface, &query).await? {
        Some(found) => {
            type_into(&found.control, text).await?;
            Ok(FillOutcome::Filled)
        }
        None => Ok(FillOutcome::NotFound),
    }
}

/// Fill `entry.<id>_<suffix>` sub-controls; missing ones are reported.
async fn fill_composite<S: Surface>(
    surface: &S,
    entry_id: &str,
    parts: &[(&'static str, &str)],
) -> Result<FillOutcome> {
    let mut missing = Vec::new();
    for (suffix, value) in parts {
        match surface.find(&composite_xpath(entry_id, suffix)).await? {
            Some(control) => type_into(&control, value).await?,
            None => missing.push((*suffix).to_string()),
        }
    }
    Ok(match missing.len() {
        0 => FillOutcome::Filled,
        n if n == parts.len() => FillOutcome::NotFound,
        _ => FillOutcome::Partial { missing },
    })
}

async fn fill_date<S: Surface>(surface: &S, field: &FieldSpec) -> Result<FillOutcome> {
    let raw = field.value.as_text();
    let Some(date) = parse_date(&raw) else {
        return Ok(FillOutcome::Skipped(format!("'{raw}' is not YYYY-MM-DD")));
    };
    match field.entry_id.as_deref() {
        Some(id) => fill_composite(surface, id, &date.parts()).await,
        None => fill_text(surface, &field.label, None, raw.trim()).await,
    }
}

async fn fill_time<S: Surface>(surface: &S, field: &FieldSpec) -> Result<FillOutcome> {
    let raw = field.value.as_text();
    let Some(time) = parse_time(&raw) else {
        return Ok(FillOutcome::Skipped(format!("'{raw}' is not HH:MM")));
    };
    match field.entry_id.as_deref() {
        Some(id) => fill_composite(surface, id, &time.parts()).await,
        None => fill_text(surface, &field.label, None, raw.trim()).await,
    }
}

/// Find the control that opens a select-like widget: a select/listbox/combobox
/// first, then whatever focusable control follows the label.
async fn locate_picker<S: Surface>(surface: &S, field: &FieldSpec) -> Result<Option<Located<S::Control>>> {
    let entry_id = field.entry_id.as_deref();
    let query = Query::new(Role::Select, &field.label).entry_id(entry_id);
    if let Some(found) = locate(surface, &query).await? {
        return Ok(Some(found));
    }
    let query = Query::new(Role::Focusable, &field.label);
    locate(surface, &query).await
}

/// Where an opened widget's options may live, narrowest first: the popup
/// named by `aria-controls`/`aria-owns`, the widget's own subtree, then the
/// whole page.
async fn option_scopes<C: Control>(widget: &Located<C>) -> Result<Vec<String>> {
    let mut scopes = Vec::new();
    for attr in ["aria-controls", "aria-owns"] {
        if let Some(ids) = widget.control.attribute(attr).await? {
            for id in ids.split_whitespace() {
                scopes.push(format!("//*[@id={}]{OPTION_XPATH}", xpath_literal(id)));
            }
        }
    }
    scopes.push(format!("{}{OPTION_XPATH}", widget.xpath));
    scopes.push(OPTION_XPATH.to_string());
    Ok(scopes)
}

/// Pick `wanted` in an opened custom widget. Listbox options are matched
/// case-insensitively (exact, then prefix); widgets without option nodes get
/// the choice typed and confirmed with Enter.
async fn pick_in_widget<S: Surface>(
    surface: &S,
    widget: &Located<S::Control>,
    wanted: &str,
    settings: &FillSettings,
) -> Result<FillOutcome> {
    let control = &widget.control;
    control.click().await?;
    surface.pause(settings.widget_pause).await;

    let mut listed = None;
    for scope in option_scopes(widget).await? {
        let options = surface.texts(&scope).await?;
        if !options.is_empty() {
            listed = Some((scope, options));
            break;
        }
    }
    let Some((scope, options)) = listed else {
        control.press_key("Enter").await?;
        surface.pause(settings.widget_pause).await;
        control.type_text(wanted).await?;
        control.press_key("Enter").await?;
        surface.pause(Duration::from_millis(300)).await;
        return Ok(FillOutcome::Filled);
    };

    let Some(choice) = match_option(&options, wanted) else {
        control.press_key("Escape").await?;
        return Ok(FillOutcome::OptionMissing(wanted.to_string()));
    };
    debug!(%scope, %choice, "picking option");
    let xpath = format!("{scope}[normalize-space()={}]", xpath_literal(choice.trim()));
    match surface.find(&xpath).await? {
        Some(option) => {
            option.click().await?;
            surface.pause(Duration::from_millis(300)).await;
            Ok(FillOutcome::Filled)
        }
        None => Ok(FillOutcome::OptionMissing(wanted.to_string())),
    }
}

async fn fill_dropdown<S: Surface>(
    surface: &S,
    field: &FieldSpec,
    settings: &FillSettings,
) -> Result<FillOutcome> {
    let wanted = field.value.as_text();
    let wanted = wanted.trim();
    if wanted.is_empty() {
        return Ok(FillOutcome::Skipped("no option given".into()));
    }
    let Some(widget) = locate_picker(surface, field).await? else {
        return Ok(FillOutcome::NotFound);
    };

    if widget.control.tag_name().await? == "select" {
        // Native selects match the visible label exactly.
        return Ok(if widget.control.select_option_by_label(wanted).await? {
            FillOutcome::Filled
        } else {
            FillOutcome::OptionMissing(wanted.to_string())
        });
    }
    pick_in_widget(surface, &widget, wanted, settings).await
}

async fn fill_multi_select<S: Surface>(
    surface: &S,
    field: &FieldSpec,
    settings: &FillSettings,
) -> Result<FillOutcome> {
    let choices = field.value.as_list();
    if choices.is_empty() {
        return Ok(FillOutcome::Skipped("no options given".into()));
    }
    let mut missing = Vec::new();
    for choice in &choices {
        // Re-open the widget for every choice; it closes after each pick.
        let Some(widget) = locate_picker(surface, field).await? else {
            return Ok(FillOutcome::NotFound);
        };
        if !pick_in_widget(surface, &widget, choice, settings).await?.is_filled() {
            missing.push(choice.clone());
        }
        widget.control.press_key("Escape").await?;
        surface.pause(Duration::from_millis(200)).await;
    }
    Ok(if missing.is_empty() {
        FillOutcome::Filled
    } else {
        FillOutcome::Partial { missing }
    })
}

async fn fill_choice<S: Surface>(surface: &S, field: &FieldSpec) -> Result<FillOutcome> {
    let option = field.value.as_text();
    let option = option.trim();
    if option.is_empty() {
        return Ok(FillOutcome::Skipped("no option given".into()));
    }
    let query = Query::option(Role::Radio, &field.label, option).entry_id(field.entry_id.as_deref());
    let Some(found) = locate(surface, &query).await? else {
        return Ok(FillOutcome::NotFound);
    };
    ensure_checked(&found.control, true).await?;
    Ok(FillOutcome::Filled)
}

/// Bring a checkbox/radio to the wanted state. Returns whether it clicked.
pub async fn ensure_checked<C: Control>(control: &C, checked: bool) -> Result<bool> {
    if control.is_checked().await? == checked {
        return Ok(false);
    }
    // Scrolling first keeps sticky headers from swallowing the click.
    if let Err(e) = control.scroll_into_view().await {
        debug!("scroll into view failed: {e}");
    }
    control.click().await?;
    Ok(true)
}

async fn fill_checkboxes<S: Surface>(
    surface: &S,
    question: &str,
    entry_id: Option<&str>,
    items: &[String],
) -> Result<FillOutcome> {
    if items.is_empty() {
        return Ok(FillOutcome::Skipped("no options selected".into()));
    }
    let mut missing = Vec::new();
    for item in items {
        let query = Query::option(Role::Checkbox, question, item).entry_id(entry_id);
        match locate(surface, &query).await? {
            Some(found) => {
                ensure_checked(&found.control, true).await?;
            }
            None => missing.push(item.clone()),
        }
    }
    Ok(match missing.len() {
        0 => FillOutcome::Filled,
        n if n == items.len() => FillOutcome::NotFound,
        _ => FillOutcome::Partial { missing },
    })
}

async fn set_checkbox<S: Surface>(surface: &S, label: &str, checked: bool) -> Result<FillOutcome> {
    let query = Query::new(Role::Checkbox, label);
    match locate(surface, &query).await? {
        Some(found) => {
            ensure_checked(&found.control, checked).await?;
            Ok(FillOutcome::Filled)
        }
        None => Ok(FillOutcome::NotFound),
    }
}

/// Resolve an attachment path against the working directory. The file must exist.
pub fn resolve_attachment(raw: &str) -> Result<PathBuf> {
    let path = PathBuf::from(raw.trim());
    let path = if path.is_absolute() {
        path
    } else {
        std::env::current_dir()?.join(path)
    };
    if !path.is_file() {
        return Err(Error::AttachmentMissing(path));
    }
    Ok(path)
}

async fn fill_attachment<S: Surface>(surface: &S, field: &FieldSpec) -> Result<FillOutcome> {
    let path = resolve_attachment(&field.value.as_text())?;
    let query = Query::new(Role::FileInput, &field.label);
    match locate(surface, &query).await? {
        Some(found) => {
            found.control.set_files(&[path]).await?;
            Ok(FillOutcome::Filled)
        }
        None => Ok(FillOutcome::NotFound),
    }
}
