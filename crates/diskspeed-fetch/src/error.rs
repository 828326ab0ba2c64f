//! Error types for diskspeed-fetch.

use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// User-facing grouping of non-success HTTP statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCategory {
    Unauthorized,
    Forbidden,
    NotFound,
    RateLimited,
    Other,
}

impl StatusCategory {
    pub fn from_status(status: u16) -> Self {
        match status {
            401 => StatusCategory::Unauthorized,
            403 => StatusCategory::Forbidden,
            404 => StatusCategory::NotFound,
            429 => StatusCategory::RateLimited,
            _ => StatusCategory::Other,
        }
    }

    /// Message suitable for showing to the person running the test.
    pub fn message(&self) -> &'static str {
        match self {
            StatusCategory::Unauthorized => "authorization failed, the access token is invalid",
            StatusCategory::Forbidden => "access denied",
            StatusCategory::NotFound => "file not found",
            StatusCategory::RateLimited => "too many requests, try again later",
            StatusCategory::Other => "unexpected HTTP status",
        }
    }
}

impl fmt::Display for StatusCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

#[derive(Debug, Error)]
pub enum Error {
    /// The caller cancelled the measurement. Not a failure.
    #[error("measurement cancelled after {transferred} bytes")]
    Cancelled { transferred: u64 },

    #[error("transfer failed: {0}")]
    TransferFailed(String),

    #[error("{category} (HTTP {status})")]
    HttpStatus {
        status: u16,
        category: StatusCategory,
        body: Option<String>,
    },

    #[error("failed to obtain upload URL (HTTP {status}): {body}")]
    Provisioning { status: u16, body: String },

    #[error("network error: {0}")]
    Network(String),

    #[error("local file not found: {}", .0.display())]
    LocalFileNotFound(PathBuf),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("file I/O error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    pub fn status(status: u16, body: Option<String>) -> Self {
        Error::HttpStatus {
            status,
            category: StatusCategory::from_status(status),
            body,
        }
    }

    pub(crate) fn network<E: std::error::Error>(e: E) -> Self {
        Error::Network(e.to_string())
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
