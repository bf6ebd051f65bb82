// src/error.rs

use std::path::{Path, PathBuf};
use thiserror::Error;

pub type FetchResult<T> = std::result::Result<T, FetchError>;

/// Everything that can go wrong while pulling one resource from the API or
/// writing it to disk. Callers decide per unit of work whether a variant is
/// fatal; none of them abort a whole batch.
#[derive(Debug, Error)]
pub enum FetchError {
    /// HTTP 429, still failing after the retry budget was spent.
    #[error("rate limited by {url} after {attempts} attempt(s)")]
    RateLimited { url: String, attempts: u32 },

    /// HTTP 404. Expected at the end of a season's rounds.
    #[error("not found: {url}")]
    NotFound { url: String },

    /// Any other HTTP status >= 400.
    #[error("HTTP {status} from {url}")]
    Api { status: u16, url: String },

    /// Connection refused, reset, timed out, ...
    #[error("network error for {url}: {message}")]
    Network { url: String, message: String },

    /// Body was not valid JSON.
    #[error("invalid JSON from {url}: {message}")]
    Parsing { url: String, message: String },

    #[error("i/o error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl FetchError {
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        FetchError::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub fn network(url: &str, err: impl std::fmt::Display) -> Self {
        FetchError::Network {
            url: url.to_string(),
            message: err.to_string(),
        }
    }

    /// Retrying a malformed payload, a missing resource or a local disk
    /// failure gives the same answer again.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            FetchError::RateLimited { .. } | FetchError::Api { .. } | FetchError::Network { .. }
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, FetchError::NotFound { .. })
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::RateLimited { .. } => Some(429),
            FetchError::NotFound { .. } => Some(404),
            FetchError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}
