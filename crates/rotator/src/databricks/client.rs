//! [`DatabricksClient`]: workspace REST client implementing
//! [`IdentityService`] and [`SecretStore`].

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use common::protocol::{
    CreateSecretRequest, CreateServicePrincipalRequest, CreatedSecret, ListSecretsResponse,
    ScimList, SecretInfo, SecretValue, ServicePrincipal, WarehouseAccessControlRequest,
    WarehousePermissionLevel, WarehousePermissionsRequest,
};
use common::ApiError;
use reqwest::{Client, RequestBuilder};
use tracing::{info, warn};

use crate::http::{self, expect_success, read_json, transport};
use crate::secret::Secret;
use crate::services::{IdentityService, SecretStore};

const SERVICE: &str = "databricks";

const SCIM_SERVICE_PRINCIPALS: &str = "api/2.0/preview/scim/v2/ServicePrincipals";

/// Bearer-token client for one Databricks workspace.
#[derive(Clone)]
pub struct DatabricksClient {
    http: Client,
    host: String,
    token: Secret,
}

impl DatabricksClient {
    /// `host` is the workspace URL, e.g. `https://adb-123.4.azuredatabricks.net`.
    pub fn new(http: Client, host: impl Into<String>, token: Secret) -> Self {
        Self {
            http,
            host: host.into(),
            token,
        }
    }

    fn url(&self, path: &str) -> String {
        http::join(&self.host, path)
    }

    fn get(&self, path: &str) -> RequestBuilder {
        self.http.get(self.url(path)).bearer_auth(self.token.expose())
    }

    fn post(&self, path: &str) -> RequestBuilder {
        self.http.post(self.url(path)).bearer_auth(self.token.expose())
    }

    fn put(&self, path: &str) -> RequestBuilder {
        self.http.put(self.url(path)).bearer_auth(self.token.expose())
    }
}

fn secrets_path(sp_id: &str) -> String {
    format!("api/2.0/accounts/servicePrincipals/{sp_id}/credentials/secrets")
}

#[async_trait]
impl IdentityService for DatabricksClient {
    async fn find_service_principal(
        &self,
        display_name: &str,
    ) -> Result<Option<ServicePrincipal>, ApiError> {
        let filter = format!("displayName eq \"{display_name}\"");
        let resp = self
            .get(SCIM_SERVICE_PRINCIPALS)
            .query(&[("filter", filter.as_str())])
            .send()
            .await
            .map_err(|e| transport(SERVICE, e))?;
        let list: ScimList<ServicePrincipal> = read_json(SERVICE, expect_success(SERVICE, resp).await?).await?;

        if list.resources.len() > 1 {
            warn!(
                display_name,
                matches = list.resources.len(),
                "several service principals share this display name; using the last one"
            );
        }
        Ok(list.resources.into_iter().last())
    }

    async fn create_service_principal(&self, display_name: &str) -> Result<ServicePrincipal, ApiError> {
        let body = CreateServicePrincipalRequest {
            display_name: display_name.to_owned(),
        };
        let resp = self
            .post(SCIM_SERVICE_PRINCIPALS)
            .json(&body)
            .send()
            .await
            .map_err(|e| transport(SERVICE, e))?;
        read_json(SERVICE, expect_success(SERVICE, resp).await?).await
    }

    async fn list_secrets(&self, sp_id: &str) -> Result<Vec<SecretInfo>, ApiError> {
        let resp = self
            .get(&secrets_path(sp_id))
            .send()
            .await
            .map_err(|e| transport(SERVICE, e))?;
        let list: ListSecretsResponse = read_json(SERVICE, expect_success(SERVICE, resp).await?).await?;
        Ok(list.secrets)
    }

    async fn create_secret(&self, sp_id: &str, lifetime_secs: u64) -> Result<CreatedSecret, ApiError> {
        let body = CreateSecretRequest {
            lifetime: format!("{lifetime_secs}s"),
        };
        let resp = self
            .post(&secrets_path(sp_id))
            .json(&body)
            .send()
            .await
            .map_err(|e| transport(SERVICE, e))?;
        let created: CreatedSecret = read_json(SERVICE, expect_success(SERVICE, resp).await?).await?;
        info!(
            sp_id,
            create_time = created.create_time.as_deref().unwrap_or("-"),
            expire_time = created.expire_time.as_deref().unwrap_or("-"),
            status = created.status.as_deref().unwrap_or("-"),
            "service principal secret created"
        );
        Ok(created)
    }

    async fn grant_warehouse_usage(&self, application_id: &str, warehouse_id: &str) -> Result<(), ApiError> {
        let body = WarehousePermissionsRequest {
            access_control_list: vec![WarehouseAccessControlRequest {
                service_principal_name: application_id.to_owned(),
                permission_level: WarehousePermissionLevel::CanUse,
            }],
        };
        let resp = self
            .put(&format!("api/2.0/permissions/warehouses/{warehouse_id}"))
            .json(&body)
            .send()
            .await
            .map_err(|e| transport(SERVICE, e))?;
        expect_success(SERVICE, resp).await?;
        Ok(())
    }
}

#[async_trait]
impl SecretStore for DatabricksClient {
    async fn get_secret(&self, scope: &str, key: &str) -> Result<Secret, ApiError> {
        let resp = self
            .get("api/2.0/secrets/get")
            .query(&[("scope", scope), ("key", key)])
            .send()
            .await
            .map_err(|e| transport(SERVICE, e))?;
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(ApiError::NotFound(format!("secret {scope}/{key}")));
        }
        let value: SecretValue = read_json(SERVICE, expect_success(SERVICE, resp).await?).await?;

        let bytes = STANDARD
            .decode(&value.value)
            .map_err(|e| ApiError::InvalidResponse(format!("secret {scope}/{key} is not base64: {e}")))?;
        let text = String::from_utf8(bytes)
            .map_err(|_| ApiError::InvalidResponse(format!("secret {scope}/{key} is not UTF-8")))?;
        Ok(Secret::from(text))
    }
}
