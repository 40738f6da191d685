//! Google Forms embed their question list as `FB_PUBLIC_LOAD_DATA_ = [...]`
//! in a page script. This module pulls it out and reads the questions.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use tracing::warn;

use super::descriptor::{truncate_label, FieldDescriptor};
use crate::field::FieldKind;

static LOAD_DATA_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"FB_PUBLIC_LOAD_DATA_\s*=\s*\[").expect("valid regex"));

/// Slice out the load-data array, brackets included. Brackets inside JSON
/// string literals are ignored.
pub fn find_load_data(html: &str) -> Option<&str> {
    let start = LOAD_DATA_RE.find(html)?.end() - 1;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in html[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '[' => depth += 1,
            ']' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&html[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

fn kind_for_code(code: i64) -> FieldKind {
    match code {
        1 => FieldKind::Paragraph,
        2 => FieldKind::Choice,
        3 => FieldKind::Checkbox,
        4 => FieldKind::Dropdown,
        9 => FieldKind::Date,
        10 => FieldKind::Time,
        _ => FieldKind::Text,
    }
}

fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}

fn question(q: &Value) -> Option<FieldDescriptor> {
    let q = q.as_array().filter(|q| q.len() >= 5)?;
    let label = q[1].as_str().unwrap_or_default();
    let kind = kind_for_code(q[3].as_i64().unwrap_or(0));
    let answer = q[4].get(0)?;
    // Questions without an entry id cannot be addressed.
    let entry_id = id_string(answer.get(0)?)?;

    let mut options = Vec::new();
    if matches!(kind, FieldKind::Choice | FieldKind::Checkbox | FieldKind::Dropdown) {
        if let Some(list) = answer.get(1).and_then(Value::as_array) {
            options = list
                .iter()
                .filter_map(|opt| opt.get(0)?.as_str())
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
            options.sort();
            options.dedup();
        }
    }

    Some(FieldDescriptor::new(entry_id, truncate_label(label), kind).with_options(options))
}

/// Questions from the embedded load data. Empty when the page has none or
/// it does not parse.
pub fn descriptors_from_html(html: &str) -> Vec<FieldDescriptor> {
    let Some(raw) = find_load_data(html) else {
        return Vec::new();
    };
    let data: Value = match serde_json::from_str(raw) {
        Ok(data) => data,
        Err(e) => {
            warn!("failed to parse form load data: {e}");
            return Vec::new();
        }
    };
    data.get(1)
        .and_then(|d| d.get(1))
        .and_then(Value::as_array)
        .map(|questions| questions.iter().filter_map(question).collect())
        .unwrap_or_default()
}
