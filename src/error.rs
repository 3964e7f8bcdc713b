use std::path::PathBuf;
use thiserror::Error;

/// Failure of a single remote translation call.
#[derive(Debug, Error)]
pub enum TranslateError {
    #[error("translation service returned {status}: {body}")]
    Http {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("failed to reach translation service: {0}")]
    Network(#[from] reqwest::Error),

    #[error("malformed translation response: {0}")]
    MalformedResponse(String),

    #[error("translation service returned an empty translation")]
    EmptyTranslation,
}

impl TranslateError {
    /// Rate limiting, server errors and transport failures are worth retrying.
    /// Other client errors and bad payloads are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            TranslateError::Http { status, .. } => {
                *status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
            }
            TranslateError::Network(_) => true,
            TranslateError::MalformedResponse(_) | TranslateError::EmptyTranslation => false,
        }
    }
}

/// Errors reading or writing locale files.
#[derive(Debug, Error)]
pub enum LocaleError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("{path} must contain a JSON object at the top level")]
    NotAnObject { path: PathBuf },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to serialize locale tree: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Errors persisting the translation cache.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("failed to write cache file {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to serialize cache: {0}")]
    Serialize(#[from] serde_json::Error),
}
