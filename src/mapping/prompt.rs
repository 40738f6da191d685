use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use super::{FieldDescriptor, MappingError, Profile};
use crate::field::FieldSpec;

const INSTRUCTION: &str = "\
You are mapping BASIC_INFO onto the fields of a Google Form.
- Give a value for every field in FIELD_SPEC.
- Use BASIC_INFO when it clearly answers the question.
- When it does not, invent a plausible value that fits the field type.
- For 'dropdown' and 'choice', pick exactly one of the listed options.
- For 'checkbox', pick zero or more of the listed options.
- For 'date', use YYYY-MM-DD (e.g. 2025-06-09).
- For 'time', use 24-hour HH:MM (e.g. 09:45).
- Reply with JSON only, in this shape:
{
  \"fields\": [
    {
      \"entry_id\": string,
      \"question_label\": string,
      \"type\": string,
      \"value\": string | [string],
      \"option_hints\": [string] | null
    }
  ]
}
No explanations.
";

static FENCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)```(?:json)?\s*(.*?)```").expect("valid regex"));
static TRAILING_OBJECT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\{.*\}\s*$").expect("valid regex"));

/// Full prompt: instruction, optional guidance, URL, fields and profile.
pub fn build_prompt(
    url: &str,
    descriptors: &[FieldDescriptor],
    profile: &Profile,
    guidance: &str,
) -> Result<String, MappingError> {
    Ok(format!(
        "{INSTRUCTION}\n{guidance}\n\nFORM_URL\n{url}\n\nFIELD_SPEC (JSON)\n{}\n\nBASIC_INFO (JSON)\n{}",
        serde_json::to_string_pretty(descriptors)?,
        serde_json::to_string_pretty(profile)?,
    ))
}

/// Pull a JSON object out of free-form model output: a fenced block first,
/// then an object running to the end of the text, then the widest `{...}`.
pub fn extract_json(text: &str) -> Option<&str> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    if let Some(inner) = FENCE_RE.captures(text).and_then(|c| c.get(1)) {
        let inner = inner.as_str().trim();
        if !inner.is_empty() {
            return Some(inner);
        }
    }
    if let Some(m) = TRAILING_OBJECT_RE.find(text) {
        return Some(m.as_str());
    }
    let first = text.find('{')?;
    let last = text.rfind('}')?;
    (last > first).then(|| &text[first..=last])
}

/// Parse a model answer of the form `{"fields": [...]}`.
pub fn parse_answer(text: &str) -> Result<Vec<FieldSpec>, MappingError> {
    let raw = extract_json(text).ok_or(MappingError::NoJson)?;
    let mut value: Value = serde_json::from_str(raw)?;
    let fields = value
        .get_mut("fields")
        .filter(|f| f.is_array())
        .map(Value::take)
        .ok_or_else(|| MappingError::Schema("no 'fields' list".into()))?;
    Ok(serde_json::from_value(fields)?)
}
