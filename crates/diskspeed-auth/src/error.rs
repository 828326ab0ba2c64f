use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("authorization code is empty")]
    EmptyCode,

    #[error("token endpoint rejected the code (HTTP {status}): {body}")]
    Exchange { status: u16, body: String },

    #[error("token response did not include an access token")]
    MissingToken,

    #[error("invalid token response: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("network error: {0}")]
    Network(String),

    #[error("token store error: {0}")]
    Store(#[from] io::Error),
}

impl AuthError {
    pub(crate) fn network<E: std::error::Error>(e: E) -> Self {
        AuthError::Network(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AuthError>;
