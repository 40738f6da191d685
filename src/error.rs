use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Browser launch failed: {0}")]
    LaunchError(String),

    #[error("Navigation failed: {0}")]
    NavigationError(String),

    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("Timeout waiting for: {0}")]
    Timeout(String),

    #[error("JavaScript error: {0}")]
    JsError(String),

    #[error("Screenshot failed: {0}")]
    ScreenshotError(String),

    #[error("Unsupported field type '{kind}' for field '{label}'")]
    UnsupportedFieldType { label: String, kind: String },

    #[error("Attachment file not found: {}", .0.display())]
    AttachmentMissing(PathBuf),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("CDP error: {0}")]
    CdpError(#[from] chromiumoxide::error::CdpError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
}

impl Error {
    /// Errors that only spoil the field being filled; the run carries on.
    /// A missing attachment is not one of them: the data file is wrong.
    pub fn is_field_local(&self) -> bool {
        matches!(
            self,
            Error::UnsupportedFieldType { .. }
                | Error::ElementNotFound(_)
                | Error::JsError(_)
                | Error::CdpError(_)
        )
    }

    /// Errors that should be recorded as a `timeout` run rather than `error`.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_local_errors() {
        let unsupported = Error::UnsupportedFieldType {
            label: "Color".into(),
            kind: "rating".into(),
        };
        assert!(unsupported.is_field_local());
        assert_eq!(
            unsupported.to_string(),
            "Unsupported field type 'rating' for field 'Color'"
        );

        assert!(!Error::AttachmentMissing(PathBuf::from("/nope/cv.pdf")).is_field_local());
        assert!(Error::ElementNotFound("option".into()).is_field_local());
        assert!(!Error::Timeout("form".into()).is_field_local());
        assert!(!Error::NavigationError("gone".into()).is_field_local());
    }

    #[test]
    fn timeout_classification() {
        assert!(Error::Timeout("x".into()).is_timeout());
        assert!(!Error::NavigationError("net::ERR_NAME_NOT_RESOLVED".into()).is_timeout());
        assert!(!Error::JsError("x".into()).is_timeout());
    }
}
