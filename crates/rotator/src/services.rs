//! Interfaces of the external collaborators the rotation workflow drives.
//!
//! Production implementations live in [`crate::databricks`] and
//! [`crate::powerbi`]; tests substitute `mockall` mocks.

use async_trait::async_trait;
use common::protocol::{CreatedSecret, GatewayPublicKey, SecretInfo, ServicePrincipal, UpdateDatasourceRequest};
use common::ApiError;

#[cfg(test)]
use mockall::automock;

use crate::secret::Secret;

/// Identifies the Databricks datasource of a dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasourceRef {
    pub gateway_id: String,
    pub datasource_id: String,
}

/// Databricks workspace identity operations.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait IdentityService: Send + Sync {
    /// Look up a service principal by exact display name.
    async fn find_service_principal(&self, display_name: &str)
        -> Result<Option<ServicePrincipal>, ApiError>;

    async fn create_service_principal(&self, display_name: &str)
        -> Result<ServicePrincipal, ApiError>;

    /// List the OAuth secrets of the principal with workspace id `sp_id`.
    async fn list_secrets(&self, sp_id: &str) -> Result<Vec<SecretInfo>, ApiError>;

    async fn create_secret(&self, sp_id: &str, lifetime_secs: u64) -> Result<CreatedSecret, ApiError>;

    /// Grant `CAN_USE` on a SQL warehouse to the principal's application id.
    async fn grant_warehouse_usage(&self, application_id: &str, warehouse_id: &str)
        -> Result<(), ApiError>;
}

/// Named secret lookup.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait SecretStore: Send + Sync {
    async fn get_secret(&self, scope: &str, key: &str) -> Result<Secret, ApiError>;
}

/// Power BI control plane operations. Implementations hold their own
/// access token.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait BiControlPlane: Send + Sync {
    async fn workspace_id(&self, workspace_name: &str) -> Result<String, ApiError>;

    async fn dataset_id(&self, workspace_id: &str, dataset_name: &str) -> Result<String, ApiError>;

    /// Transfer dataset ownership to the calling principal.
    async fn take_over_dataset(&self, workspace_id: &str, dataset_id: &str) -> Result<(), ApiError>;

    /// Locate the Databricks datasource bound to a dataset.
    async fn databricks_datasource(&self, workspace_id: &str, dataset_id: &str)
        -> Result<DatasourceRef, ApiError>;

    async fn gateway_public_key(&self, gateway_id: &str) -> Result<GatewayPublicKey, ApiError>;

    async fn update_datasource_credentials(
        &self,
        datasource: &DatasourceRef,
        request: &UpdateDatasourceRequest,
    ) -> Result<(), ApiError>;

    async fn refresh_dataset(&self, workspace_id: &str, dataset_id: &str) -> Result<(), ApiError>;
}
