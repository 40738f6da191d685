//! Field and form descriptions loaded from JSON config/data files, CSV rows
//! or a generated mapping.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// The semantic type of a form field.
///
/// Unknown type strings are kept as [`FieldKind::Unsupported`] so that a
/// config with one odd field still loads; filling that field fails on its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FieldKind {
    Text,
    Paragraph,
    Choice,
    Checkbox,
    Dropdown,
    Date,
    Time,
    MultiSelect,
    Attachment,
    Unsupported(String),
}

impl FieldKind {
    pub fn as_str(&self) -> &str {
        match self {
            FieldKind::Text => "text",
            FieldKind::Paragraph => "paragraph",
            FieldKind::Choice => "choice",
            FieldKind::Checkbox => "checkbox",
            FieldKind::Dropdown => "dropdown",
            FieldKind::Date => "date",
            FieldKind::Time => "time",
            FieldKind::MultiSelect => "multi_select",
            FieldKind::Attachment => "attachment",
            FieldKind::Unsupported(other) => other,
        }
    }
}

impl From<String> for FieldKind {
    fn from(raw: String) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "text" | "long_text" | "email" | "url" | "tel" | "number" => FieldKind::Text,
            "paragraph" => FieldKind::Paragraph,
            "choice" | "radio" => FieldKind::Choice,
            "checkbox" | "multi" => FieldKind::Checkbox,
            "dropdown" | "single_select" | "select" => FieldKind::Dropdown,
            "date" => FieldKind::Date,
            "time" => FieldKind::Time,
            "multi_select" | "multi-select" => FieldKind::MultiSelect,
            "attachment" | "file" => FieldKind::Attachment,
            _ => FieldKind::Unsupported(raw),
        }
    }
}

impl From<FieldKind> for String {
    fn from(kind: FieldKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A field value as it appears in config files: text, a list of options,
/// a flag, or a bare JSON number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Flag(bool),
    Number(serde_json::Number),
    Text(String),
    List(Vec<String>),
}

impl Default for FieldValue {
    fn default() -> Self {
        FieldValue::Text(String::new())
    }
}

impl FieldValue {
    /// Render the value as the text that would be typed into a control.
    pub fn as_text(&self) -> String {
        match self {
            FieldValue::Flag(b) => b.to_string(),
            FieldValue::Number(n) => n.to_string(),
            FieldValue::Text(s) => s.clone(),
            FieldValue::List(items) => items.join("; "),
        }
    }

    /// Render the value as a list of trimmed, non-empty items.
    pub fn as_list(&self) -> Vec<String> {
        match self {
            FieldValue::List(items) => items
                .iter()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            other => {
                let text = other.as_text();
                let text = text.trim();
                if text.is_empty() {
                    Vec::new()
                } else {
                    vec![text.to_string()]
                }
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            FieldValue::Text(s) => s.trim().is_empty(),
            FieldValue::List(items) => items.is_empty(),
            _ => false,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

impl From<Vec<String>> for FieldValue {
    fn from(items: Vec<String>) -> Self {
        FieldValue::List(items)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Flag(b)
    }
}

/// One field to fill: its human label, semantic type and value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    #[serde(default, alias = "question_label")]
    pub label: String,
    #[serde(rename = "type")]
    pub kind: FieldKind,
    #[serde(default)]
    pub value: FieldValue,
    #[serde(default, alias = "option_hints", skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    /// Google Forms `entry.<id>` identifier, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry_id: Option<String>,
}

impl FieldSpec {
    pub fn new(label: impl Into<String>, kind: FieldKind, value: impl Into<FieldValue>) -> Self {
        Self {
            label: label.into(),
            kind,
            value: value.into(),
            options: None,
            entry_id: None,
        }
    }

    pub fn with_entry_id(mut self, entry_id: impl Into<String>) -> Self {
        self.entry_id = Some(entry_id.into());
        self
    }

    pub fn with_options(mut self, options: Vec<String>) -> Self {
        self.options = Some(options);
        self
    }

    /// Label used in log lines, falling back to the entry id.
    pub fn display_label(&self) -> String {
        if !self.label.trim().is_empty() {
            self.label.trim().to_string()
        } else if let Some(id) = &self.entry_id {
            format!("entry.{id}")
        } else {
            "<unlabelled>".to_string()
        }
    }
}

/// Page-level settings, matching the `page` block of Airtable-style configs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success_selector: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success_url_contains: Option<String>,
    /// CSS selector of a loading spinner that must disappear before filling.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idle_spinner: Option<String>,
    /// Force hidden form controls visible before filling.
    #[serde(default)]
    pub reveal_hidden: bool,
}

/// Everything needed to fill one form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FormConfig {
    #[serde(default)]
    pub form_url: String,
    #[serde(default)]
    pub fields: Vec<FieldSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submit_selector: Option<String>,
    #[serde(default)]
    pub page: PageSettings,
}

impl FormConfig {
    /// Load a config file. Missing and malformed files are both errors.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {e}", path.display())))?;
        serde_json::from_str(&raw)
            .map_err(|e| Error::Config(format!("invalid JSON in {}: {e}", path.display())))
    }

    /// The form URL: `form_url`, else `page.url`.
    pub fn url(&self) -> Option<&str> {
        let url = self.form_url.trim();
        if !url.is_empty() {
            return Some(url);
        }
        self.page.url.as_deref().map(str::trim).filter(|u| !u.is_empty())
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.form_url = url.into();
        self
    }

    pub fn with_fields(mut self, fields: Vec<FieldSpec>) -> Self {
        self.fields = fields;
        self
    }

    /// First plain text field, used to check whether the form was cleared
    /// after submitting.
    pub fn sentinel_field(&self) -> Option<&FieldSpec> {
        self.fields
            .iter()
            .find(|f| f.kind == FieldKind::Text && !f.label.trim().is_empty())
    }
}

/// Load a data file holding a JSON list of field specs.
pub fn load_field_list(path: impl AsRef<Path>) -> Result<Vec<FieldSpec>> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("cannot read {}: {e}", path.display())))?;
    let value: serde_json::Value = serde_json::from_str(&raw)
        .map_err(|e| Error::Config(format!("invalid JSON in {}: {e}", path.display())))?;
    if !value.is_array() {
        return Err(Error::Config(format!(
            "{} must contain a list of field objects",
            path.display()
        )));
    }
    serde_json::from_value(value).map_err(|e| {
        Error::Config(format!(
            "each field in {} must have 'label', 'type' and 'value': {e}",
            path.display()
        ))
    })
}
