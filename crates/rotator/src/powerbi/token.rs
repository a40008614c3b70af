//! Entra ID client-credentials token acquisition for the Power BI API.

use common::protocol::TokenResponse;
use common::ApiError;
use reqwest::Client;
use tracing::debug;

use crate::http::{self, expect_success, read_json, transport};
use crate::secret::Secret;

const SERVICE: &str = "entra-id";

/// OAuth scope granting access to the Power BI REST API.
pub const POWERBI_SCOPE: &str = "https://analysis.windows.net/powerbi/api/.default";

/// Power BI app registration credentials, read from the secret store.
#[derive(Debug, Clone)]
pub struct AppCredentials {
    pub tenant_id: Secret,
    pub client_id: Secret,
    pub client_secret: Secret,
}

/// Fetch one access token with the client-credentials grant.
///
/// The token is not refreshed; a rotation run is expected to finish well
/// within its lifetime.
pub async fn acquire_token(
    http: &Client,
    login_base: &str,
    creds: &AppCredentials,
) -> Result<Secret, ApiError> {
    let url = http::join(
        login_base,
        &format!("{}/oauth2/v2.0/token", creds.tenant_id.expose()),
    );
    let form = [
        ("client_id", creds.client_id.expose()),
        ("client_secret", creds.client_secret.expose()),
        ("scope", POWERBI_SCOPE),
        ("grant_type", "client_credentials"),
    ];

    let resp = http
        .post(url)
        .form(&form)
        .send()
        .await
        .map_err(|e| transport(SERVICE, e))?;
    let token: TokenResponse = read_json(SERVICE, expect_success(SERVICE, resp).await?).await?;

    debug!(expires_in = ?token.expires_in, "power bi access token acquired");
    Ok(Secret::from(token.access_token))
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use std::time::Duration;

    fn creds() -> AppCredentials {
        AppCredentials {
            tenant_id: Secret::new("tenant-1"),
            client_id: Secret::new("client-1"),
            client_secret: Secret::new("shh"),
        }
    }

    #[tokio::test]
    async fn posts_client_credentials_form() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/tenant-1/oauth2/v2.0/token")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("grant_type".into(), "client_credentials".into()),
                Matcher::UrlEncoded("client_id".into(), "client-1".into()),
                Matcher::UrlEncoded("client_secret".into(), "shh".into()),
                Matcher::UrlEncoded("scope".into(), POWERBI_SCOPE.into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"token_type": "Bearer", "expires_in": 3599, "access_token": "eyJ0"}"#)
            .create_async()
            .await;

        let http = http::build_client(Duration::from_secs(5)).unwrap();
        let token = acquire_token(&http, &server.url(), &creds()).await.unwrap();
        assert_eq!(token.expose(), "eyJ0");
    }

    #[tokio::test]
    async fn rejected_credentials_surface_status() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/tenant-1/oauth2/v2.0/token")
            .with_status(401)
            .with_body(r#"{"error": "invalid_client"}"#)
            .create_async()
            .await;

        let http = http::build_client(Duration::from_secs(5)).unwrap();
        let err = acquire_token(&http, &server.url(), &creds()).await.unwrap_err();
        assert_eq!(err.http_status(), Some(401));
    }
}
