//! Error taxonomy for the install / sign / verify pipelines
//!
//! Every variant is fatal to the current run. `stage()` names the pipeline
//! step that produced it so the top-level report can say where things broke.

use std::path::PathBuf;

/// Errors produced by notation-action
#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    /// Missing or contradictory input
    #[error("{0}")]
    Configuration(String),

    #[error("unsupported platform: {0}")]
    UnsupportedPlatform(String),

    #[error("unsupported architecture: {0}")]
    UnsupportedArchitecture(String),

    /// Version / platform / arch combination absent from the release manifest
    #[error("{0}")]
    NotSupported(String),

    #[error("failed to download {url}: {reason}")]
    Download { url: String, reason: String },

    #[error("checksum of downloaded {subject} {actual} does not match expected checksum {expected}")]
    ChecksumMismatch {
        subject: String,
        expected: String,
        actual: String,
    },

    #[error("downloaded archive does not match expected binary, \"{expected}\" not found")]
    NameMismatch { expected: String },

    #[error("failed to extract {archive}: {reason}")]
    Extraction { archive: PathBuf, reason: String },

    #[error("{0}")]
    VersionIncompatible(String),

    #[error("`{command}` failed ({status}): {stderr}")]
    Subprocess {
        command: String,
        status: String,
        stderr: String,
    },

    #[error("failed to {action} {}: {source}", .path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ActionError {
    /// Pipeline stage this error belongs to
    pub fn stage(&self) -> &'static str {
        match self {
            ActionError::Configuration(_) => "configuration",
            ActionError::UnsupportedPlatform(_)
            | ActionError::UnsupportedArchitecture(_)
            | ActionError::NotSupported(_) => "resolution",
            ActionError::Download { .. } => "download",
            ActionError::ChecksumMismatch { .. } => "checksum",
            ActionError::NameMismatch { .. } | ActionError::Extraction { .. } => "extraction",
            ActionError::Io { .. } => "installation",
            ActionError::VersionIncompatible(_) | ActionError::Subprocess { .. } => "subprocess",
        }
    }

    pub(crate) fn config(msg: impl Into<String>) -> Self {
        ActionError::Configuration(msg.into())
    }

    pub(crate) fn io(action: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ActionError::Io {
            action,
            path: path.into(),
            source,
        }
    }

    pub(crate) fn download(url: impl ToString, reason: impl ToString) -> Self {
        ActionError::Download {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }
}

pub type ActionResult<T> = Result<T, ActionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checksum_mismatch_reports_both_values() {
        let err = ActionError::ChecksumMismatch {
            subject: "Notation CLI".to_string(),
            expected: "aa".repeat(32),
            actual: "bb".repeat(32),
        };
        let msg = err.to_string();
        assert!(msg.contains(&"aa".repeat(32)));
        assert!(msg.contains(&"bb".repeat(32)));
        assert_eq!(err.stage(), "checksum");
    }

    #[test]
    fn io_error_names_path() {
        let err = ActionError::io(
            "create directory",
            "/tmp/plugins",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert_eq!(err.to_string(), "failed to create directory /tmp/plugins: denied");
        assert_eq!(err.stage(), "installation");
    }
}
