//! Failure kinds for a single prediction query.

use std::time::Duration;

/// Why one prediction query produced no result.
///
/// Every variant is recoverable: the poller keeps its previous snapshot and
/// tries again on the next cycle.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("unexpected HTTP status {0}")]
    Status(reqwest::StatusCode),

    #[error("response body was empty")]
    EmptyBody,

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("prediction service reported an error: {0}")]
    Upstream(String),

    #[error("invalid request URL: {0}")]
    InvalidUrl(String),
}

impl FetchError {
    /// `true` for failures expected to clear up on their own (network
    /// trouble, timeouts, server-side errors). `false` means the response
    /// itself could not be understood, which usually points at a request or
    /// parsing problem.
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Transport(_) | FetchError::Timeout(_) | FetchError::EmptyBody => true,
            FetchError::Status(status) => status.is_server_error(),
            FetchError::Upstream(_) | FetchError::Malformed(_) | FetchError::InvalidUrl(_) => {
                false
            }
        }
    }
}
