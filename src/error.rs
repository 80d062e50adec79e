//! Error types for the archiver library

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while resolving, fetching or storing a model
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// The user input is neither a model page URL nor a bare identifier
    #[error("invalid model URL or ID: {0:?}")]
    InvalidInput(String),

    /// The metadata document lacks a field the archiver depends on
    #[error("metadata is missing required field `{0}`")]
    MissingField(&'static str),

    /// The metadata document has a field of an unexpected shape
    #[error("malformed metadata: {0}")]
    MalformedMetadata(#[source] serde_json::Error),

    #[error("HTTP request to {url} failed")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP {status} from {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("I/O error on {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode JSON")]
    Json(#[from] serde_json::Error),
}

impl ArchiveError {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| ArchiveError::Io { path, source }
    }

    pub(crate) fn http(url: impl Into<String>) -> impl FnOnce(reqwest::Error) -> Self {
        let url = url.into();
        move |source| ArchiveError::Http { url, source }
    }
}

pub type ArchiveResult<T> = Result<T, ArchiveError>;
