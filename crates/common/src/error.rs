//! Common error types shared across crates.

use thiserror::Error;

/// Error returned by any REST collaborator (Databricks, Power BI, token endpoint).
///
/// Every variant is terminal for the current rotation run; nothing is retried.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request never produced a response (DNS, TLS, connection reset, ...).
    #[error("transport failure: {0}")]
    Transport(String),

    /// The service answered with an unexpected status code.
    #[error("{service} returned status {status}: {body}")]
    Status {
        /// Short name of the remote service, e.g. `"powerbi"`.
        service: &'static str,
        /// HTTP status code received.
        status: u16,
        /// Response body, as text, for diagnostics.
        body: String,
    },

    /// A named resource (workspace, dataset, datasource, ...) does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The response body could not be parsed into the expected shape.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// A service-side quota would be exceeded by the requested operation.
    #[error("limit exceeded: {0}")]
    LimitExceeded(String),
}

impl ApiError {
    /// Returns the HTTP status code carried by this error, if the remote
    /// service produced one.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            ApiError::NotFound(_) => Some(404),
            ApiError::Transport(_) | ApiError::InvalidResponse(_) | ApiError::LimitExceeded(_) => {
                None
            }
        }
    }
}
