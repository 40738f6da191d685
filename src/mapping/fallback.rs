//! Rule-based mapping used when the model is unavailable or unusable.

use serde_json::Value;

use super::{FieldDescriptor, Profile};
use crate::field::{FieldKind, FieldSpec, FieldValue};
use crate::values::{is_date, is_time};

/// First non-empty profile value among `keys`, as text.
fn pick(profile: &Profile, keys: &[&str]) -> String {
    keys.iter()
        .filter_map(|k| profile.get(*k))
        .find_map(|v| match v {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        })
        .unwrap_or_default()
}

fn has_any(label: &str, words: &[&str]) -> bool {
    words.iter().any(|w| label.contains(w))
}

fn guess_text(label: &str, profile: &Profile) -> String {
    let l = label.to_lowercase();
    if l.contains("email") {
        pick(profile, &["email", "mail"])
    } else if has_any(&l, &["phone", "mobile"]) {
        pick(profile, &["phone", "phone_number", "mobile"])
    } else if l.contains("first name") {
        pick(profile, &["first_name", "firstname", "given_name", "name_first"])
    } else if has_any(&l, &["last name", "surname"]) {
        pick(profile, &["last_name", "lastname", "family_name", "name_last"])
    } else if l.contains("name") {
        let full = pick(profile, &["name", "full_name"]);
        if !full.is_empty() {
            return full;
        }
        let first = pick(profile, &["first_name", "firstname"]);
        let last = pick(profile, &["last_name", "lastname"]);
        format!("{first} {last}").trim().to_string()
    } else if has_any(&l, &["company", "organization", "organisation"]) {
        pick(profile, &["company", "organization", "organisation", "employer"])
    } else if has_any(&l, &["title", "role", "position"]) {
        pick(profile, &["title", "role", "position", "job_title"])
    } else if l.contains("city") {
        pick(profile, &["city"])
    } else if has_any(&l, &["state", "province"]) {
        pick(profile, &["state", "province"])
    } else if l.contains("country") {
        pick(profile, &["country"])
    } else if has_any(&l, &["zip", "postal"]) {
        pick(profile, &["zip", "postal", "postal_code", "zip_code"])
    } else if l.contains("address") {
        pick(profile, &["address", "street"])
    } else if has_any(&l, &["website", "url"]) {
        pick(profile, &["website", "url"])
    } else if has_any(&l, &["message", "comments", "notes"]) {
        pick(profile, &["message", "notes", "comment"])
    } else {
        String::new()
    }
}

/// Profile selections for checkbox questions, as a list.
fn selections(profile: &Profile) -> Vec<String> {
    let value = ["selections", "options", "answers"]
        .iter()
        .filter_map(|k| profile.get(*k))
        .find(|v| match v {
            Value::Array(a) => !a.is_empty(),
            Value::String(s) => !s.is_empty(),
            _ => false,
        });
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .map(|v| v.as_str().map(str::to_string).unwrap_or_else(|| v.to_string()))
            .collect(),
        Some(Value::String(s)) => vec![s.clone()],
        _ => Vec::new(),
    }
}

/// Guess a value for one field from the profile.
pub fn guess_value(label: &str, kind: &FieldKind, options: &[String], profile: &Profile) -> FieldValue {
    match kind {
        FieldKind::Text | FieldKind::Paragraph => FieldValue::Text(guess_text(label, profile)),
        FieldKind::Date => {
            let v = pick(profile, &["date", "dob", "birthday"]);
            FieldValue::Text(if is_date(&v) { v } else { String::new() })
        }
        FieldKind::Time => {
            let v = pick(profile, &["time"]);
            FieldValue::Text(if is_time(&v) { v } else { String::new() })
        }
        FieldKind::Dropdown | FieldKind::Choice => {
            let hint = pick(profile, &["choice", "selection", "option", "answer", "value"]);
            let chosen = options
                .iter()
                .find(|o| !hint.is_empty() && o.trim().eq_ignore_ascii_case(&hint))
                .or_else(|| options.first())
                .cloned()
                .unwrap_or_default();
            FieldValue::Text(chosen)
        }
        FieldKind::Checkbox => {
            let wanted = selections(profile);
            let kept = options
                .iter()
                .filter(|o| wanted.iter().any(|w| w.trim().eq_ignore_ascii_case(o.trim())))
                .cloned()
                .collect();
            FieldValue::List(kept)
        }
        _ => FieldValue::Text(String::new()),
    }
}

/// One guessed field spec per descriptor.
pub fn fallback_fields(descriptors: &[FieldDescriptor], profile: &Profile) -> Vec<FieldSpec> {
    descriptors
        .iter()
        .map(|d| {
            let value = guess_value(&d.question_label, &d.kind, &d.options, profile);
            let mut field = FieldSpec::new(d.question_label.clone(), d.kind.clone(), value)
                .with_entry_id(d.entry_id.clone());
            if !d.options.is_empty() {
                field = field.with_options(d.options.clone());
            }
            field
        })
        .collect()
}
