//! One rotation run: provision a fresh service principal secret in
//! Databricks and rebind the Power BI datasource to it.
//!
//! Every step is fail-fast. Nothing is retried and nothing is persisted
//! between runs.

use common::protocol::{
    BasicCredentials, CredentialDetails, CredentialType, EncryptedConnection, EncryptionAlgorithm,
    GatewayPublicKey, PrivacyLevel, UpdateDatasourceRequest,
};
use common::ApiError;
use thiserror::Error;
use tracing::{info, instrument};

use crate::config::{Config, GatewayType};
use crate::crypto::{self, CryptoError};
use crate::powerbi::AppCredentials;
use crate::secret::Secret;
use crate::services::{BiControlPlane, DatasourceRef, IdentityService, SecretStore};

/// Errors that abort a rotation run.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("credential encryption failed: {0}")]
    Crypto(#[from] CryptoError),

    #[error("failed to serialise credentials: {0}")]
    Serialise(#[from] serde_json::Error),

    #[error("credential encryption task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// The service principal and the secret generated for it in this run.
#[derive(Debug, Clone)]
pub struct ProvisionedPrincipal {
    /// Workspace-local id.
    pub id: String,
    /// OAuth client id; the datasource username.
    pub application_id: String,
    /// Freshly generated OAuth secret; the datasource password.
    pub secret: Secret,
}

/// Identifiers resolved while rebinding the datasource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RebindOutcome {
    pub workspace_id: String,
    pub dataset_id: String,
    pub datasource: DatasourceRef,
    pub refreshed: bool,
}

/// Ensure the service principal exists, mint a new secret for it, and grant
/// it `CAN_USE` on the SQL warehouse.
///
/// # Errors
///
/// Fails with [`ApiError::LimitExceeded`] when the principal already holds
/// `cfg.max_secrets` secrets, or with whatever the identity service returns.
#[instrument(skip_all, fields(service_principal = %cfg.service_principal_name))]
pub async fn provision_principal(
    identity: &dyn IdentityService,
    cfg: &Config,
) -> Result<ProvisionedPrincipal, WorkflowError> {
    let principal = match identity
        .find_service_principal(&cfg.service_principal_name)
        .await?
    {
        Some(sp) => sp,
        None => {
            info!("service principal not found; creating it");
            identity
                .create_service_principal(&cfg.service_principal_name)
                .await?
        }
    };
    info!(
        id = %principal.id,
        application_id = %principal.application_id,
        "service principal resolved"
    );

    let existing = identity.list_secrets(&principal.id).await?;
    if existing.len() >= cfg.max_secrets {
        return Err(ApiError::LimitExceeded(format!(
            "service principal {} already has {} secrets (max {}); delete some to continue",
            principal.id,
            existing.len(),
            cfg.max_secrets
        ))
        .into());
    }
    info!(secrets = existing.len(), "secret count within limit");

    let created = identity
        .create_secret(&principal.id, cfg.secret_lifetime_secs)
        .await?;

    identity
        .grant_warehouse_usage(&principal.application_id, &cfg.warehouse_id)
        .await?;
    info!(warehouse_id = %cfg.warehouse_id, "CAN_USE granted on SQL warehouse");

    Ok(ProvisionedPrincipal {
        id: principal.id,
        application_id: principal.application_id,
        secret: Secret::from(created.secret),
    })
}

/// Read the Power BI app registration from the configured secret scope.
#[instrument(skip_all, fields(scope = %cfg.secret_scope))]
pub async fn load_app_credentials(
    store: &dyn SecretStore,
    cfg: &Config,
) -> Result<AppCredentials, WorkflowError> {
    let client_id = store.get_secret(&cfg.secret_scope, &cfg.client_id_secret).await?;
    let client_secret = store
        .get_secret(&cfg.secret_scope, &cfg.client_secret_secret)
        .await?;
    let tenant_id = store.get_secret(&cfg.secret_scope, &cfg.tenant_id_secret).await?;
    Ok(AppCredentials {
        tenant_id,
        client_id,
        client_secret,
    })
}

/// Build the datasource update for `principal`.
///
/// With a gateway key the credential JSON is encrypted for that gateway and
/// marked `RSA-OAEP`; without one it is embedded as plain JSON.
pub fn build_credential_update(
    principal: &ProvisionedPrincipal,
    gateway_key: Option<&GatewayPublicKey>,
    privacy_level: PrivacyLevel,
) -> Result<UpdateDatasourceRequest, WorkflowError> {
    let plain = BasicCredentials::new(
        principal.application_id.clone(),
        principal.secret.expose(),
    )
    .to_json()?;

    let (credentials, encryption_algorithm) = match gateway_key {
        Some(key) => (
            crypto::encode_for_gateway(key, &plain)?,
            EncryptionAlgorithm::RsaOaep,
        ),
        None => (plain, EncryptionAlgorithm::None),
    };

    Ok(UpdateDatasourceRequest {
        credential_details: CredentialDetails {
            credential_type: CredentialType::Basic,
            credentials,
            encrypted_connection: EncryptedConnection::Encrypted,
            encryption_algorithm,
            privacy_level,
            use_end_user_oauth2_credentials: false,
        },
    })
}

/// Point the dataset's Databricks datasource at `principal`'s new secret.
#[instrument(skip_all, fields(workspace = %cfg.workspace_name, dataset = %cfg.dataset_name))]
pub async fn rebind_datasource(
    bi: &dyn BiControlPlane,
    cfg: &Config,
    principal: &ProvisionedPrincipal,
) -> Result<RebindOutcome, WorkflowError> {
    let workspace_id = bi.workspace_id(&cfg.workspace_name).await?;
    let dataset_id = bi.dataset_id(&workspace_id, &cfg.dataset_name).await?;

    if cfg.gateway_type == GatewayType::NoGateway {
        bi.take_over_dataset(&workspace_id, &dataset_id).await?;
    }

    let datasource = bi.databricks_datasource(&workspace_id, &dataset_id).await?;

    let gateway_key = if cfg.gateway_type.encrypts_credentials() {
        Some(bi.gateway_public_key(&datasource.gateway_id).await?)
    } else {
        None
    };
    // Segment retries sleep on the calling thread; keep them off the runtime workers.
    let owned = principal.clone();
    let privacy_level = cfg.privacy_level;
    let request = tokio::task::spawn_blocking(move || {
        build_credential_update(&owned, gateway_key.as_ref(), privacy_level)
    })
    .await??;
    bi.update_datasource_credentials(&datasource, &request).await?;
    info!("datasource credentials updated");

    if cfg.refresh_dataset {
        bi.refresh_dataset(&workspace_id, &dataset_id).await?;
    }

    Ok(RebindOutcome {
        workspace_id,
        dataset_id,
        datasource,
        refreshed: cfg.refresh_dataset,
    })
}
