//! Small helpers shared by the REST clients.

use std::time::Duration;

use common::ApiError;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;

/// Build the HTTP client shared by all REST collaborators.
pub fn build_client(timeout: Duration) -> Result<Client, ApiError> {
    Client::builder()
        .user_agent(concat!("m2m-rotator/", env!("CARGO_PKG_VERSION")))
        .timeout(timeout)
        .build()
        .map_err(|e| ApiError::Transport(format!("failed to build HTTP client: {e}")))
}

/// Map a send failure to [`ApiError::Transport`].
pub fn transport(service: &'static str, e: reqwest::Error) -> ApiError {
    ApiError::Transport(format!("{service}: {e}"))
}

/// Pass the response through if its status is `expected`, else turn it into
/// [`ApiError::Status`] carrying the body text.
pub async fn expect_status(
    service: &'static str,
    response: Response,
    expected: StatusCode,
) -> Result<Response, ApiError> {
    if response.status() == expected {
        return Ok(response);
    }
    Err(status_error(service, response).await)
}

/// Pass the response through on any 2xx status.
pub async fn expect_success(service: &'static str, response: Response) -> Result<Response, ApiError> {
    if response.status().is_success() {
        return Ok(response);
    }
    Err(status_error(service, response).await)
}

/// Deserialise a JSON body into `T`.
pub async fn read_json<T: DeserializeOwned>(
    service: &'static str,
    response: Response,
) -> Result<T, ApiError> {
    response
        .json::<T>()
        .await
        .map_err(|e| ApiError::InvalidResponse(format!("{service}: {e}")))
}

async fn status_error(service: &'static str, response: Response) -> ApiError {
    let status = response.status().as_u16();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<unreadable body>".to_string());
    ApiError::Status {
        service,
        status,
        body,
    }
}

/// Join a base URL and a relative path with exactly one `/` between them.
pub fn join(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}
