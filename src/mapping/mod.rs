//! Model-assisted mapping of a personal profile onto a Google Form.
//!
//! The form's questions are read into [`FieldDescriptor`]s, sent together
//! with a JSON profile to Gemini, and the answer is parsed into field specs.
//! Every failure along the way falls back to a rule-based guesser, so
//! [`build_field_mapping`] always produces a complete mapping.

mod descriptor;
mod fallback;
mod gemini;
mod load_data;
mod prompt;

use std::path::PathBuf;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::field::{FieldSpec, FormConfig};
use crate::page::Page;

pub use descriptor::{descriptors_from_dom, descriptors_from_page, DomEntry, FieldDescriptor};
pub use fallback::{fallback_fields, guess_value};
pub use gemini::GeminiClient;
pub use load_data::{descriptors_from_html, find_load_data};
pub use prompt::{build_prompt, extract_json, parse_answer};

/// A JSON object of personal details (`first_name`, `email`, ...).
pub type Profile = serde_json::Map<String, serde_json::Value>;

pub const DEFAULT_MODEL: &str = "models/gemini-2.5-flash";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Debug, Error)]
pub enum MappingError {
    #[error("no API key configured (set GEMINI_API_KEY or GOOGLE_API_KEY)")]
    MissingApiKey,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("model returned no text")]
    EmptyResponse,

    #[error("no JSON object in model output")]
    NoJson,

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unexpected schema: {0}")]
    Schema(String),
}

/// Model settings, passed explicitly to every mapping call.
#[derive(Debug, Clone)]
pub struct MappingConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    /// Extra guidance appended to the instruction, if the file exists.
    pub prompt_path: Option<PathBuf>,
}

impl Default for MappingConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            prompt_path: None,
        }
    }
}

impl MappingConfig {
    /// Read `GEMINI_API_KEY` (else `GOOGLE_API_KEY`) and `GEMINI_MODEL`.
    pub fn from_env() -> Self {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());
        Self {
            api_key: var("GEMINI_API_KEY").or_else(|| var("GOOGLE_API_KEY")),
            model: var("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            ..Self::default()
        }
    }

    pub fn with_prompt_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.prompt_path = Some(path.into());
        self
    }

    fn guidance(&self) -> String {
        self.prompt_path
            .as_ref()
            .and_then(|p| std::fs::read_to_string(p).ok())
            .unwrap_or_default()
    }
}

async fn ask_model(
    url: &str,
    descriptors: &[FieldDescriptor],
    profile: &Profile,
    config: &MappingConfig,
) -> std::result::Result<Vec<FieldSpec>, MappingError> {
    let api_key = config.api_key.as_deref().ok_or(MappingError::MissingApiKey)?;
    let client = GeminiClient::new(api_key)?.with_base_url(&config.base_url);
    let prompt = build_prompt(url, descriptors, profile, &config.guidance())?;
    let text = client.generate(&config.model, &prompt).await?;
    parse_answer(&text).inspect_err(|_| {
        let preview: String = text.split_whitespace().collect::<Vec<_>>().join(" ").chars().take(240).collect();
        debug!(%preview, "unusable model output");
    })
}

/// Model fields in descriptor order, with descriptors the model skipped
/// filled in by the guesser. Model fields that match no descriptor are
/// dropped; without descriptors the model answer is taken as is.
pub fn complete_mapping(
    descriptors: &[FieldDescriptor],
    mut answered: Vec<FieldSpec>,
    profile: &Profile,
) -> Vec<FieldSpec> {
    if descriptors.is_empty() {
        return answered;
    }
    let mut fields = Vec::with_capacity(descriptors.len());
    for descriptor in descriptors {
        let pos = answered
            .iter()
            .position(|f| f.entry_id.as_deref() == Some(descriptor.entry_id.as_str()));
        match pos {
            Some(pos) => {
                let mut field = answered.swap_remove(pos);
                if field.label.trim().is_empty() {
                    field.label = descriptor.question_label.clone();
                }
                if field.options.is_none() && !descriptor.options.is_empty() {
                    field.options = Some(descriptor.options.clone());
                }
                fields.push(field);
            }
            None => {
                debug!(entry_id = %descriptor.entry_id, "model skipped field, guessing");
                fields.extend(fallback_fields(std::slice::from_ref(descriptor), profile));
            }
        }
    }
    if !answered.is_empty() {
        let dropped: Vec<String> = answered.iter().map(FieldSpec::display_label).collect();
        debug!(?dropped, "model returned fields the form does not have");
    }
    fields
}

/// Map `profile` onto the form's fields. Never fails: model errors fall back
/// to the rule-based guesser.
pub async fn build_field_mapping(
    url: &str,
    descriptors: &[FieldDescriptor],
    profile: &Profile,
    config: &MappingConfig,
) -> FormConfig {
    let fields = match ask_model(url, descriptors, profile, config).await {
        Ok(answered) => {
            info!(fields = answered.len(), "model mapping received");
            complete_mapping(descriptors, answered, profile)
        }
        Err(MappingError::MissingApiKey) => {
            warn!("no API key set, using heuristic mapping");
            fallback_fields(descriptors, profile)
        }
        Err(e) => {
            warn!("model mapping failed ({e}), using heuristic mapping");
            fallback_fields(descriptors, profile)
        }
    };
    FormConfig::default().with_url(url).with_fields(fields)
}

/// Open `url`, read its questions and map `profile` onto them.
pub async fn map_form(page: &Page, url: &str, profile: &Profile, config: &MappingConfig) -> Result<FormConfig> {
    page.goto(url).await?;
    let descriptors = descriptors_from_page(page).await?;
    info!(questions = descriptors.len(), "form fields extracted");
    Ok(build_field_mapping(url, &descriptors, profile, config).await)
}
