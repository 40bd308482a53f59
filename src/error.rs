//! Error taxonomy shared by the upstream clients and the query layer.

use thiserror::Error;

/// Failure talking to one of the upstream services.
#[derive(Debug, Clone, Error)]
pub enum UpstreamError {
    #[error("upstream timed out")]
    Timeout,
    #[error("upstream unreachable: {0}")]
    Unreachable(String),
    #[error("upstream returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("malformed upstream payload: {0}")]
    MalformedPayload(String),
}

impl From<reqwest::Error> for UpstreamError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            UpstreamError::Timeout
        } else {
            UpstreamError::Unreachable(e.to_string())
        }
    }
}

/// Failure answering a client query.
#[derive(Debug, Clone, Error)]
pub enum QueryError {
    #[error("stop {0} not found")]
    StopNotFound(String),
    #[error(transparent)]
    Upstream(#[from] UpstreamError),
}
