//! Error types for the I/O side of the autopilot.
//!
//! Every tick-level error is logged by the scheduler and swallowed; none of
//! these ever terminate the process.

use autopilot_core::telemetry::NormalizeError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// An authenticated call was attempted before the first time sync.
    #[error("api client is not time-synced")]
    NotSynced,

    /// The remote rejected the call, or the transport failed (`status: None`).
    #[error("request failed (status {status:?}): {body}")]
    RequestFailed { status: Option<u16>, body: String },

    /// Malformed path, query, or body supplied by the caller.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("cannot decode response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        ApiError::RequestFailed {
            status: err.status().map(|s| s.as_u16()),
            body: err.to_string(),
        }
    }
}

/// Reason a rig tick stopped before completing.
#[derive(Debug, thiserror::Error)]
pub enum TickError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    NotManaged(#[from] NormalizeError),
}
