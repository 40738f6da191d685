//! Append-only CSV log of runs: `timestamp,url,status,error`.

use std::fs::OpenOptions;
use std::path::Path;

use chrono::Local;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Timestamp format used for log rows and screenshot names.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

pub fn timestamp() -> String {
    Local::now().format(TIMESTAMP_FORMAT).to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Success,
    Timeout,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunLogEntry {
    pub timestamp: String,
    pub url: String,
    pub status: RunStatus,
    pub error: String,
}

impl RunLogEntry {
    pub fn new(timestamp: impl Into<String>, url: impl Into<String>, status: RunStatus) -> Self {
        Self {
            timestamp: timestamp.into(),
            url: url.into(),
            status,
            error: String::new(),
        }
    }

    /// A failed run. Only timeouts are logged as `timeout`.
    pub fn failed(timestamp: impl Into<String>, url: impl Into<String>, error: &Error) -> Self {
        let status = if error.is_timeout() { RunStatus::Timeout } else { RunStatus::Error };
        Self::new(timestamp, url, status).with_error(error)
    }

    pub fn with_error(mut self, error: impl ToString) -> Self {
        self.error = error.to_string();
        self
    }
}

/// Append one entry, writing the header first when the file is new or empty.
pub fn append(path: impl AsRef<Path>, entry: &RunLogEntry) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let is_new = std::fs::metadata(path).map(|m| m.len() == 0).unwrap_or(true);
    let file = OpenOptions::new().create(true).append(true).open(path)?;

    let mut writer = csv::WriterBuilder::new().has_headers(is_new).from_writer(file);
    writer.serialize(entry)?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_status() {
        let timed_out = RunLogEntry::failed("t", "u", &Error::Timeout("form to render".into()));
        assert_eq!(timed_out.status, RunStatus::Timeout);
        assert_eq!(timed_out.error, "Timeout waiting for: form to render");

        let unreachable = RunLogEntry::failed("t", "u", &Error::NavigationError("net::ERR_NAME_NOT_RESOLVED".into()));
        assert_eq!(unreachable.status, RunStatus::Error);
        let no_browser = RunLogEntry::failed("t", "u", &Error::LaunchError("no such file".into()));
        assert_eq!(no_browser.status, RunStatus::Error);
    }

    #[test]
    fn header_written_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("runs.csv");

        append(&path, &RunLogEntry::new("2025-06-09_10-00-00", "https://a", RunStatus::Success)).unwrap();
        append(
            &path,
            &RunLogEntry::new("2025-06-09_10-05-00", "https://a", RunStatus::Timeout)
                .with_error("Timeout waiting for: form to render"),
        )
        .unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = written.lines().collect();
        assert_eq!(lines[0], "timestamp,url,status,error");
        assert_eq!(lines[1], "2025-06-09_10-00-00,https://a,success,");
        assert_eq!(
            lines[2],
            "2025-06-09_10-05-00,https://a,timeout,Timeout waiting for: form to render"
        );
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn timestamp_shape() {
        let ts = timestamp();
        assert!(chrono::NaiveDateTime::parse_from_str(&ts, TIMESTAMP_FORMAT).is_ok());
    }
}
