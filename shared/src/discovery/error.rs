//! Errors surfaced by discovery backends

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("Discovery backend unreachable: {0}")]
    Transport(String),

    #[error("Discovery backend rejected request: HTTP {status} - {body}")]
    Rejected { status: u16, body: String },
}

impl DiscoveryError {
    /// Whether a later attempt can reasonably succeed without operator action.
    pub fn is_retryable(&self) -> bool {
        match self {
            DiscoveryError::Transport(_) => true,
            DiscoveryError::Rejected { status, .. } => *status >= 500 || *status == 429,
        }
    }
}

impl From<reqwest::Error> for DiscoveryError {
    fn from(err: reqwest::Error) -> Self {
        DiscoveryError::Transport(err.to_string())
    }
}

pub type DiscoveryResult<T> = Result<T, DiscoveryError>;
