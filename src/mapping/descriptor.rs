use serde::{Deserialize, Serialize};

use super::load_data::descriptors_from_html;
use crate::error::Result;
use crate::field::FieldKind;
use crate::page::Page;

/// Labels longer than this are cut.
pub(crate) const MAX_LABEL_CHARS: usize = 200;

/// One question of a Google Form, as told to the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldDescriptor {
    pub entry_id: String,
    pub question_label: String,
    #[serde(rename = "type")]
    pub kind: FieldKind,
    pub options: Vec<String>,
}

impl FieldDescriptor {
    pub fn new(entry_id: impl Into<String>, label: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            entry_id: entry_id.into(),
            question_label: label.into(),
            kind,
            options: Vec::new(),
        }
    }

    pub fn with_options(mut self, options: Vec<String>) -> Self {
        self.options = options;
        self
    }
}

pub(crate) fn truncate_label(label: &str) -> String {
    label.trim().chars().take(MAX_LABEL_CHARS).collect()
}

/// An `entry.*` control read from the live DOM.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DomEntry {
    pub name: String,
    #[serde(default)]
    pub tag: String,
    #[serde(default, rename = "type")]
    pub input_type: String,
    /// Text of the control's parent element.
    #[serde(default)]
    pub label: String,
    /// `<option>` texts for selects, the `value` for radios and checkboxes.
    #[serde(default)]
    pub options: Vec<String>,
}

const DOM_ENTRIES_JS: &str = r#"
JSON.stringify(
    Array.from(document.querySelectorAll("input[name^='entry.'], textarea[name^='entry.'], select[name^='entry.']"))
        .map(el => ({
            name: el.getAttribute('name') || '',
            tag: el.tagName.toLowerCase(),
            type: (el.getAttribute('type') || '').toLowerCase(),
            label: el.parentElement
                ? (el.parentElement.innerText || el.parentElement.textContent || '').replace(/\s+/g, ' ').trim()
                : '',
            options: el.tagName === 'SELECT'
                ? Array.from(el.options).map(o => (o.text || '').trim()).filter(Boolean)
                : ((el.type === 'radio' || el.type === 'checkbox') && el.value ? [el.value] : [])
        }))
)
"#;

fn split_composite(id: &str) -> (&str, Option<FieldKind>) {
    for (suffix, kind) in [
        ("_year", FieldKind::Date),
        ("_month", FieldKind::Date),
        ("_day", FieldKind::Date),
        ("_hour", FieldKind::Time),
        ("_minute", FieldKind::Time),
    ] {
        if let Some(base) = id.strip_suffix(suffix) {
            return (base, Some(kind));
        }
    }
    (id, None)
}

fn entry_kind(entry: &DomEntry) -> FieldKind {
    match (entry.tag.as_str(), entry.input_type.as_str()) {
        ("textarea", _) => FieldKind::Paragraph,
        ("select", _) => FieldKind::Dropdown,
        (_, "radio") => FieldKind::Choice,
        (_, "checkbox") => FieldKind::Checkbox,
        _ => FieldKind::Text,
    }
}

/// Fold DOM entries into one descriptor per entry id, in first-seen order.
/// Hidden inputs and `_sentinel` artifacts are skipped; date and time
/// sub-controls collapse onto their base id.
pub fn descriptors_from_dom(entries: Vec<DomEntry>) -> Vec<FieldDescriptor> {
    let mut out: Vec<FieldDescriptor> = Vec::new();
    for entry in entries {
        let Some(id) = entry.name.strip_prefix("entry.") else {
            continue;
        };
        if id.is_empty() || id.ends_with("_sentinel") || entry.input_type == "hidden" {
            continue;
        }
        let (id, composite) = split_composite(id);
        let kind = composite.unwrap_or_else(|| entry_kind(&entry));

        match out.iter_mut().find(|d| d.entry_id == id) {
            Some(existing) => {
                for option in entry.options {
                    if !existing.options.contains(&option) {
                        existing.options.push(option);
                    }
                }
            }
            None => out.push(
                FieldDescriptor::new(id, truncate_label(&entry.label), kind).with_options(entry.options),
            ),
        }
    }
    for descriptor in &mut out {
        descriptor.options.sort();
        descriptor.options.dedup();
    }
    out
}

/// Read the current page's questions: live `entry.*` controls first, then
/// the form's embedded load data.
pub async fn descriptors_from_page(page: &Page) -> Result<Vec<FieldDescriptor>> {
    let entries: Vec<DomEntry> = page.evaluate_json(DOM_ENTRIES_JS).await?;
    let descriptors = descriptors_from_dom(entries);
    if !descriptors.is_empty() {
        return Ok(descriptors);
    }
    let html = page.html().await?;
    Ok(descriptors_from_html(&html))
}
