//! Form inspection: list the questions of a Google Form and draft a CSV
//! template for bulk runs.

use std::fmt::Write as _;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::page::Page;

/// Collects one record per `div[role=listitem]`.
const LIST_ITEMS_JS: &str = r#"
JSON.stringify(
    Array.from(document.querySelectorAll("div[role='listitem']")).map(item => {
        const text = el => ((el && (el.innerText || el.textContent)) || '').trim();
        const ariaLabels = role => Array.from(item.querySelectorAll(`div[role='${role}']`))
            .map(el => (el.getAttribute('aria-label') || '').trim())
            .filter(Boolean);
        const heading = text(item.querySelector("div[role='heading'] span"))
            || text(item.querySelector("div[role='heading']"));
        const control = item.querySelector('input, textarea');
        return {
            heading: heading,
            control_label: control ? (control.getAttribute('aria-label') || '').trim() : '',
            radios: ariaLabels('radio'),
            checkboxes: ariaLabels('checkbox'),
            has_textarea: !!item.querySelector('textarea'),
            has_input: !!item.querySelector('input'),
            has_listbox: !!item.querySelector("[role='listbox']")
        };
    })
)
"#;

/// What the page script reports about one question container.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawItem {
    #[serde(default)]
    pub heading: String,
    #[serde(default)]
    pub control_label: String,
    #[serde(default)]
    pub radios: Vec<String>,
    #[serde(default)]
    pub checkboxes: Vec<String>,
    #[serde(default)]
    pub has_textarea: bool,
    #[serde(default)]
    pub has_input: bool,
    #[serde(default)]
    pub has_listbox: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionKind {
    Text,
    Paragraph,
    Choice,
    Multi,
    Unknown,
}

impl QuestionKind {
    fn as_str(self) -> &'static str {
        match self {
            QuestionKind::Text => "text",
            QuestionKind::Paragraph => "paragraph",
            QuestionKind::Choice => "choice",
            QuestionKind::Multi => "multi",
            QuestionKind::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Question {
    pub label: String,
    pub kind: QuestionKind,
    pub options: Vec<String>,
}

/// Classify one container. `index` is 1-based and only names unlabelled
/// questions.
pub fn classify(index: usize, item: RawItem) -> Question {
    let label = [item.heading.trim(), item.control_label.trim()]
        .into_iter()
        .find(|l| !l.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("Question {index}"));

    let (kind, options) = if !item.radios.is_empty() {
        (QuestionKind::Choice, item.radios)
    } else if !item.checkboxes.is_empty() {
        (QuestionKind::Multi, item.checkboxes)
    } else if item.has_textarea {
        (QuestionKind::Paragraph, Vec::new())
    } else if item.has_input {
        (QuestionKind::Text, Vec::new())
    } else if item.has_listbox {
        // Dropdowns are filled like a single choice in CSV runs.
        (QuestionKind::Choice, Vec::new())
    } else {
        (QuestionKind::Unknown, Vec::new())
    };

    Question { label, kind, options }
}

/// Detect the questions on the current page.
pub async fn extract_questions(page: &Page) -> Result<Vec<Question>> {
    let items: Vec<RawItem> = page.evaluate_json(LIST_ITEMS_JS).await?;
    Ok(items
        .into_iter()
        .enumerate()
        .map(|(idx, item)| classify(idx + 1, item))
        .collect())
}

/// Numbered listing, options capped at ten.
pub fn render(questions: &[Question]) -> String {
    let mut out = String::from("Detected Questions:\n\n");
    for (idx, q) in questions.iter().enumerate() {
        let _ = writeln!(out, "{}. [{}] {}", idx + 1, q.kind.as_str(), q.label);
        if !q.options.is_empty() {
            let mut opts = q.options.iter().take(10).cloned().collect::<Vec<_>>().join(", ");
            if q.options.len() > 10 {
                opts.push_str(", ...");
            }
            let _ = writeln!(out, "   Options: {opts}");
        }
    }
    out
}

/// CSV headers and one sample row. Unknown questions are left out.
pub fn csv_template(questions: &[Question]) -> (Vec<String>, Vec<String>) {
    let mut headers: Vec<String> = Vec::new();
    let mut sample: Vec<String> = Vec::new();
    for q in questions {
        match q.kind {
            QuestionKind::Text | QuestionKind::Paragraph => {
                headers.push(q.label.clone());
                sample.push(format!("Sample {}", q.label).chars().take(60).collect());
            }
            QuestionKind::Choice => {
                headers.push(format!("{} (choice)", q.label));
                sample.push(q.options.first().cloned().unwrap_or_default());
            }
            QuestionKind::Multi => {
                headers.push(format!("{} (multi)", q.label));
                sample.push(q.options.iter().take(2).cloned().collect::<Vec<_>>().join("; "));
            }
            QuestionKind::Unknown => {}
        }
    }
    (headers, sample)
}

/// The header line as it would appear in a CSV file.
pub fn header_line(headers: &[String]) -> Result<String> {
    let mut writer = csv::WriterBuilder::new().from_writer(Vec::new());
    writer.write_record(headers)?;
    let bytes = writer
        .into_inner()
        .map_err(|e| crate::error::Error::IoError(e.into_error()))?;
    Ok(String::from_utf8_lossy(&bytes).trim_end().to_string())
}

/// Write the template (header plus sample row).
pub fn write_template(path: impl AsRef<Path>, questions: &[Question]) -> Result<()> {
    let (headers, sample) = csv_template(questions);
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(&headers)?;
    writer.write_record(&sample)?;
    writer.flush()?;
    Ok(())
}

/// Plain listing for forms without question containers.
pub async fn render_generic(page: &Page) -> Result<String> {
    let (labels, buttons) = page.labels_and_buttons().await?;
    let fields = page.get_form_fields().await?;

    let mut out = String::new();
    let _ = writeln!(out, "Found {} labels:", labels.len());
    for (idx, label) in labels.iter().enumerate() {
        let _ = writeln!(out, "{}. '{label}'", idx + 1);
    }
    let _ = writeln!(out, "\nFound {} input fields:", fields.len());
    for (idx, field) in fields.iter().enumerate() {
        let kind = if field.r#type.is_empty() { "text" } else { field.r#type.as_str() };
        let _ = writeln!(
            out,
            "{}. Type: {kind}, Name: '{}', Label: '{}', Placeholder: '{}'",
            idx + 1,
            field.name,
            field.label,
            field.placeholder
        );
    }
    let _ = writeln!(out, "\nFound {} buttons:", buttons.len());
    for (idx, button) in buttons.iter().enumerate() {
        let _ = writeln!(out, "{}. '{button}'", idx + 1);
    }
    Ok(out)
}
