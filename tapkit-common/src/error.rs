use std::sync::Arc;

use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum TapkitError {
    /// A filesystem operation failed; `context` names the operation and path.
    #[error("{context}: {source}")]
    Io {
        context: String,
        source: Arc<std::io::Error>,
    },

    #[error("{context}: {source}")]
    Http {
        context: String,
        source: Arc<reqwest::Error>,
    },

    #[error("HTTP {status} from {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("JSON Parsing Error: {0}")]
    Json(#[from] Arc<serde_json::Error>),

    #[error("Semantic Versioning Error: {0}")]
    SemVer(#[from] Arc<semver::Error>),

    #[error("Configuration Error: {0}")]
    Config(String),

    #[error("DownloadError: Failed to download '{0}' from '{1}': {2}")]
    DownloadError(String, String, String),

    #[error("Resource Not Found: {0}")]
    NotFound(String),

    #[error("Installation Error: {0}")]
    InstallError(String),

    #[error("Generic Error: {0}")]
    Generic(String),

    #[error("Validation Error: {0}")]
    ValidationError(String),

    #[error("Checksum Error: {0}")]
    ChecksumError(String),

    #[error("Parsing Error in {0}: {1}")]
    ParseError(&'static str, String),

    #[error("Dependency Error: {0}")]
    DependencyError(String),

    #[error("Failed to execute command: {0}")]
    CommandExecError(String),

    #[error("Test failed: {0}")]
    TestFailed(String),
}

impl TapkitError {
    pub fn io(context: impl Into<String>, err: std::io::Error) -> Self {
        TapkitError::Io {
            context: context.into(),
            source: Arc::new(err),
        }
    }

    pub fn http(context: impl Into<String>, err: reqwest::Error) -> Self {
        TapkitError::Http {
            context: context.into(),
            source: Arc::new(err),
        }
    }
}

impl From<std::io::Error> for TapkitError {
    fn from(err: std::io::Error) -> Self {
        TapkitError::io("I/O error", err)
    }
}

impl From<reqwest::Error> for TapkitError {
    fn from(err: reqwest::Error) -> Self {
        TapkitError::http("HTTP request error", err)
    }
}

impl From<serde_json::Error> for TapkitError {
    fn from(err: serde_json::Error) -> Self {
        TapkitError::Json(Arc::new(err))
    }
}

impl From<semver::Error> for TapkitError {
    fn from(err: semver::Error) -> Self {
        TapkitError::SemVer(Arc::new(err))
    }
}

pub type Result<T> = std::result::Result<T, TapkitError>;
