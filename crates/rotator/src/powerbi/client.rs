//! [`PowerBiClient`]: Power BI REST client implementing [`BiControlPlane`].

use async_trait::async_trait;
use common::protocol::{
    Dataset, Datasource, Gateway, GatewayPublicKey, Group, ODataList, RefreshRequest,
    UpdateDatasourceRequest,
};
use common::ApiError;
use reqwest::{Client, RequestBuilder, StatusCode};
use tracing::info;

use super::token::{self, AppCredentials};
use crate::http::{self, expect_status, read_json, transport};
use crate::secret::Secret;
use crate::services::{BiControlPlane, DatasourceRef};

const SERVICE: &str = "powerbi";

/// Client for the `myorg` Power BI REST API, authenticated as an app registration.
pub struct PowerBiClient {
    http: Client,
    base_url: String,
    client_id: String,
    token: Secret,
}

impl PowerBiClient {
    /// Acquire an access token for `creds` and build a client around it.
    pub async fn connect(
        http: Client,
        login_base: &str,
        base_url: impl Into<String>,
        creds: &AppCredentials,
    ) -> Result<Self, ApiError> {
        let token = token::acquire_token(&http, login_base, creds).await?;
        Ok(Self::with_token(
            http,
            base_url,
            creds.client_id.expose(),
            token,
        ))
    }

    /// Build a client around an already acquired token.
    pub fn with_token(
        http: Client,
        base_url: impl Into<String>,
        client_id: impl Into<String>,
        token: Secret,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            client_id: client_id.into(),
            token,
        }
    }

    fn url(&self, path: &str) -> String {
        http::join(&self.base_url, path)
    }

    fn get(&self, path: &str) -> RequestBuilder {
        self.http.get(self.url(path)).bearer_auth(self.token.expose())
    }

    fn post(&self, path: &str) -> RequestBuilder {
        self.http.post(self.url(path)).bearer_auth(self.token.expose())
    }
}

#[async_trait]
impl BiControlPlane for PowerBiClient {
    async fn workspace_id(&self, workspace_name: &str) -> Result<String, ApiError> {
        let filter = format!("name eq '{workspace_name}'");
        let resp = self
            .get("groups")
            .query(&[("$filter", filter.as_str())])
            .send()
            .await
            .map_err(|e| transport(SERVICE, e))?;
        let groups: ODataList<Group> =
            read_json(SERVICE, expect_status(SERVICE, resp, StatusCode::OK).await?).await?;

        groups
            .value
            .into_iter()
            .next()
            .map(|g| g.id)
            .ok_or_else(|| {
                ApiError::NotFound(format!(
                    "workspace {workspace_name} does not exist or service principal {} has no access to it",
                    self.client_id
                ))
            })
    }

    async fn dataset_id(&self, workspace_id: &str, dataset_name: &str) -> Result<String, ApiError> {
        let resp = self
            .get(&format!("groups/{workspace_id}/datasets"))
            .send()
            .await
            .map_err(|e| transport(SERVICE, e))?;
        let datasets: ODataList<Dataset> =
            read_json(SERVICE, expect_status(SERVICE, resp, StatusCode::OK).await?).await?;

        datasets
            .value
            .into_iter()
            .filter(|d| d.name == dataset_name)
            .last()
            .map(|d| d.id)
            .ok_or_else(|| {
                ApiError::NotFound(format!("dataset {dataset_name} in workspace {workspace_id}"))
            })
    }

    async fn take_over_dataset(&self, workspace_id: &str, dataset_id: &str) -> Result<(), ApiError> {
        let resp = self
            .post(&format!(
                "groups/{workspace_id}/datasets/{dataset_id}/Default.TakeOver"
            ))
            .send()
            .await
            .map_err(|e| transport(SERVICE, e))?;
        expect_status(SERVICE, resp, StatusCode::OK).await?;
        info!(
            dataset_id,
            client_id = %self.client_id,
            "dataset ownership taken over by service principal"
        );
        Ok(())
    }

    async fn databricks_datasource(
        &self,
        workspace_id: &str,
        dataset_id: &str,
    ) -> Result<DatasourceRef, ApiError> {
        let resp = self
            .get(&format!(
                "groups/{workspace_id}/datasets/{dataset_id}/datasources"
            ))
            .send()
            .await
            .map_err(|e| transport(SERVICE, e))?;
        let datasources: ODataList<Datasource> =
            read_json(SERVICE, expect_status(SERVICE, resp, StatusCode::OK).await?).await?;

        let found = datasources
            .value
            .into_iter()
            .filter(Datasource::is_databricks)
            .last()
            .ok_or_else(|| {
                ApiError::NotFound(format!("Databricks datasource for dataset {dataset_id}"))
            })?;

        if found.gateway_id.is_empty() || found.datasource_id.is_empty() {
            return Err(ApiError::InvalidResponse(format!(
                "Databricks datasource of dataset {dataset_id} has no gateway or datasource id"
            )));
        }
        Ok(DatasourceRef {
            gateway_id: found.gateway_id,
            datasource_id: found.datasource_id,
        })
    }

    async fn gateway_public_key(&self, gateway_id: &str) -> Result<GatewayPublicKey, ApiError> {
        let resp = self
            .get(&format!("gateways/{gateway_id}"))
            .send()
            .await
            .map_err(|e| transport(SERVICE, e))?;
        let gateway: Gateway =
            read_json(SERVICE, expect_status(SERVICE, resp, StatusCode::OK).await?).await?;
        Ok(gateway.public_key)
    }

    async fn update_datasource_credentials(
        &self,
        datasource: &DatasourceRef,
        request: &UpdateDatasourceRequest,
    ) -> Result<(), ApiError> {
        info!(
            gateway_id = %datasource.gateway_id,
            datasource_id = %datasource.datasource_id,
            "updating datasource credentials"
        );
        let resp = self
            .http
            .patch(self.url(&format!(
                "gateways/{}/datasources/{}",
                datasource.gateway_id, datasource.datasource_id
            )))
            .bearer_auth(self.token.expose())
            .json(request)
            .send()
            .await
            .map_err(|e| transport(SERVICE, e))?;
        expect_status(SERVICE, resp, StatusCode::OK).await?;
        Ok(())
    }

    async fn refresh_dataset(&self, workspace_id: &str, dataset_id: &str) -> Result<(), ApiError> {
        let resp = self
            .post(&format!("groups/{workspace_id}/datasets/{dataset_id}/refreshes"))
            .json(&RefreshRequest::default())
            .send()
            .await
            .map_err(|e| transport(SERVICE, e))?;
        expect_status(SERVICE, resp, StatusCode::ACCEPTED).await?;
        info!(dataset_id, "dataset refresh submitted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::protocol::{
        CredentialDetails, CredentialType, EncryptedConnection, EncryptionAlgorithm, PrivacyLevel,
    };
    use mockito::Matcher;
    use serde_json::json;
    use std::time::Duration;

    fn client(server: &mockito::Server) -> PowerBiClient {
        let http = http::build_client(Duration::from_secs(5)).unwrap();
        PowerBiClient::with_token(http, server.url(), "client-1", Secret::new("tok"))
    }

    #[tokio::test]
    async fn connect_fetches_token_once() {
        let mut server = mockito::Server::new_async().await;
        let token = server
            .mock("POST", "/tenant-1/oauth2/v2.0/token")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"access_token": "fresh"}"#)
            .expect(1)
            .create_async()
            .await;
        let groups = server
            .mock("GET", Matcher::Regex(r"^/groups".into()))
            .match_header("authorization", "Bearer fresh")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"value": [{"id": "ws-1", "name": "Sales"}]}"#)
            .create_async()
            .await;

        let http = http::build_client(Duration::from_secs(5)).unwrap();
        let creds = AppCredentials {
            tenant_id: Secret::new("tenant-1"),
            client_id: Secret::new("client-1"),
            client_secret: Secret::new("shh"),
        };
        let pbi = PowerBiClient::connect(http, &server.url(), server.url(), &creds)
            .await
            .unwrap();
        assert_eq!(pbi.workspace_id("Sales").await.unwrap(), "ws-1");
        token.assert_async().await;
        groups.assert_async().await;
    }

    #[tokio::test]
    async fn workspace_lookup_uses_odata_filter() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", Matcher::Regex(r"^/groups".into()))
            .match_query(Matcher::UrlEncoded("$filter".into(), "name eq 'Sales'".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"value": [{"id": "ws-1", "name": "Sales"}]}"#)
            .create_async()
            .await;

        assert_eq!(client(&server).workspace_id("Sales").await.unwrap(), "ws-1");
    }

    #[tokio::test]
    async fn unknown_workspace_is_not_found() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", Matcher::Regex(r"^/groups".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"value": []}"#)
            .create_async()
            .await;

        let err = client(&server).workspace_id("Nope").await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(ref m) if m.contains("client-1")));
    }

    #[tokio::test]
    async fn workspace_lookup_error_status() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", Matcher::Regex(r"^/groups".into()))
            .with_status(401)
            .with_body("unauthorized")
            .create_async()
            .await;

        let err = client(&server).workspace_id("Sales").await.unwrap_err();
        assert_eq!(err.http_status(), Some(401));
    }

    #[tokio::test]
    async fn dataset_lookup_by_name() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/groups/ws-1/datasets")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({"value": [
                    {"id": "d-0", "name": "Other"},
                    {"id": "d-1", "name": "Revenue"}
                ]})
                .to_string(),
            )
            .create_async()
            .await;

        let pbi = client(&server);
        assert_eq!(pbi.dataset_id("ws-1", "Revenue").await.unwrap(), "d-1");
        assert!(matches!(
            pbi.dataset_id("ws-1", "Missing").await,
            Err(ApiError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn picks_databricks_datasource() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/groups/ws-1/datasets/d-1/datasources")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({"value": [
                    {"connectionDetails": {"server": "sql"}, "datasourceId": "x", "gatewayId": "gx"},
                    {"datasourceType": "Web", "connectionDetails": {"url": "https://x"}},
                    {"connectionDetails": {"kind": "Databricks", "path": "adb"}, "datasourceId": "ds-9", "gatewayId": "gw-9"}
                ]})
                .to_string(),
            )
            .create_async()
            .await;

        let ds = client(&server)
            .databricks_datasource("ws-1", "d-1")
            .await
            .unwrap();
        assert_eq!(
            ds,
            DatasourceRef {
                gateway_id: "gw-9".into(),
                datasource_id: "ds-9".into()
            }
        );
    }

    #[tokio::test]
    async fn databricks_datasource_without_ids_is_invalid() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/groups/ws-1/datasets/d-1/datasources")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"value": [{"connectionDetails": {"kind": "Databricks"}}]}"#)
            .create_async()
            .await;

        assert!(matches!(
            client(&server).databricks_datasource("ws-1", "d-1").await,
            Err(ApiError::InvalidResponse(_))
        ));
    }

    #[tokio::test]
    async fn no_databricks_datasource_is_not_found() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/groups/ws-1/datasets/d-1/datasources")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"value": []}"#)
            .create_async()
            .await;

        assert!(matches!(
            client(&server).databricks_datasource("ws-1", "d-1").await,
            Err(ApiError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn gateway_public_key_is_extracted() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/gateways/gw-9")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"id": "gw-9", "name": "onprem", "type": "Resource",
                    "publicKey": {"exponent": "AQAB", "modulus": "vPf0"}}"#,
            )
            .create_async()
            .await;

        let key = client(&server).gateway_public_key("gw-9").await.unwrap();
        assert_eq!(key.exponent, "AQAB");
        assert_eq!(key.modulus, "vPf0");
    }

    #[tokio::test]
    async fn update_patches_credential_details() {
        let mut server = mockito::Server::new_async().await;
        let m = server
            .mock("PATCH", "/gateways/gw-9/datasources/ds-9")
            .match_header("authorization", "Bearer tok")
            .match_body(Matcher::PartialJson(json!({
                "credentialDetails": {
                    "credentialType": "Basic",
                    "credentials": "ciphertext",
                    "encryptedConnection": "Encrypted",
                    "encryptionAlgorithm": "RSA-OAEP",
                    "privacyLevel": "Private"
                }
            })))
            .with_status(200)
            .create_async()
            .await;

        let request = UpdateDatasourceRequest {
            credential_details: CredentialDetails {
                credential_type: CredentialType::Basic,
                credentials: "ciphertext".into(),
                encrypted_connection: EncryptedConnection::Encrypted,
                encryption_algorithm: EncryptionAlgorithm::RsaOaep,
                privacy_level: PrivacyLevel::Private,
                use_end_user_oauth2_credentials: false,
            },
        };
        let target = DatasourceRef {
            gateway_id: "gw-9".into(),
            datasource_id: "ds-9".into(),
        };
        client(&server)
            .update_datasource_credentials(&target, &request)
            .await
            .unwrap();
        m.assert_async().await;
    }

    #[tokio::test]
    async fn refresh_requires_accepted() {
        let mut server = mockito::Server::new_async().await;
        let _ok = server
            .mock("POST", "/groups/ws-1/datasets/d-1/refreshes")
            .match_body(Matcher::Json(json!({"notifyOption": "NoNotification"})))
            .with_status(202)
            .create_async()
            .await;
        client(&server).refresh_dataset("ws-1", "d-1").await.unwrap();

        let _busy = server
            .mock("POST", "/groups/ws-1/datasets/d-2/refreshes")
            .with_status(200)
            .create_async()
            .await;
        let err = client(&server).refresh_dataset("ws-1", "d-2").await.unwrap_err();
        assert_eq!(err.http_status(), Some(200));
    }

    #[tokio::test]
    async fn take_over_failure_is_status_error() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/groups/ws-1/datasets/d-1/Default.TakeOver")
            .with_status(401)
            .create_async()
            .await;

        let err = client(&server).take_over_dataset("ws-1", "d-1").await.unwrap_err();
        assert_eq!(err.http_status(), Some(401));
    }
}
