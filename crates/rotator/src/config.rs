//! Configuration loading and validation for the rotation job.
//!
//! All values are read from environment variables at startup. The process will
//! exit with a clear error message if any required variable is missing or invalid.

use anyhow::{Context, Result};
use common::protocol::PrivacyLevel;
use serde::Deserialize;

use crate::secret::Secret;

/// How the Power BI dataset reaches Databricks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum GatewayType {
    /// Cloud connection. The service principal takes over the dataset.
    #[serde(alias = "nogateway", alias = "NOGATEWAY")]
    NoGateway,
    /// On-premises data gateway. Credentials are encrypted with its public key.
    #[serde(rename = "Onpremises", alias = "OnPremises", alias = "onpremises")]
    OnPremises,
    /// Virtual network data gateway.
    #[serde(rename = "VNET", alias = "Vnet", alias = "vnet")]
    Vnet,
}

impl GatewayType {
    /// Whether credentials must be encrypted with the gateway public key.
    pub fn encrypts_credentials(self) -> bool {
        matches!(self, GatewayType::OnPremises)
    }
}

/// Validated rotation job configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Display name of the Databricks service principal. **Required.**
    pub service_principal_name: String,

    /// SQL warehouse the principal is granted `CAN_USE` on. **Required.**
    pub warehouse_id: String,

    /// Power BI workspace name. **Required.**
    pub workspace_name: String,

    /// Power BI dataset (semantic model) name. **Required.**
    pub dataset_name: String,

    /// How the dataset connects to Databricks.
    #[serde(default = "default_gateway_type")]
    pub gateway_type: GatewayType,

    /// Lifetime of the generated OAuth secret, in seconds.
    #[serde(default = "default_secret_lifetime")]
    pub secret_lifetime_secs: u64,

    /// Refuse to rotate once the principal holds this many secrets.
    #[serde(default = "default_max_secrets")]
    pub max_secrets: usize,

    /// Trigger a dataset refresh after updating the credentials.
    #[serde(default = "default_refresh_dataset")]
    pub refresh_dataset: bool,

    /// Databricks secret scope holding the Power BI app registration. **Required.**
    pub secret_scope: String,

    /// Key of the Entra ID client id in `secret_scope`. **Required.**
    pub client_id_secret: String,

    /// Key of the Entra ID client secret in `secret_scope`. **Required.**
    pub client_secret_secret: String,

    /// Key of the Entra ID tenant id in `secret_scope`. **Required.**
    pub tenant_id_secret: String,

    /// Databricks workspace URL, e.g. `https://adb-123.4.azuredatabricks.net`. **Required.**
    pub databricks_host: String,

    /// Databricks bearer token used for workspace API calls. **Required.**
    pub databricks_token: Secret,

    /// Power BI REST API base URL.
    #[serde(default = "default_powerbi_api_base")]
    pub powerbi_api_base: String,

    /// Entra ID authority base URL.
    #[serde(default = "default_login_base")]
    pub login_base: String,

    /// Privacy level written into the datasource credentials.
    #[serde(default = "default_privacy_level")]
    pub privacy_level: PrivacyLevel,

    /// Per-request HTTP timeout, in seconds.
    #[serde(default = "default_http_timeout")]
    pub http_timeout_secs: u64,

    /// OTLP endpoint for span export. Spans are only exported when set.
    #[serde(default)]
    pub otel_exporter_otlp_endpoint: Option<String>,

    /// Tracing log level (e.g. `"info"`, `"debug"`).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_gateway_type() -> GatewayType {
    GatewayType::NoGateway
}
fn default_secret_lifetime() -> u64 {
    604_800
}
fn default_max_secrets() -> usize {
    5
}
fn default_refresh_dataset() -> bool {
    true
}
fn default_powerbi_api_base() -> String {
    "https://api.powerbi.com/v1.0/myorg".into()
}
fn default_login_base() -> String {
    "https://login.microsoftonline.com".into()
}
fn default_privacy_level() -> PrivacyLevel {
    PrivacyLevel::Private
}
fn default_http_timeout() -> u64 {
    30
}
fn default_log_level() -> String {
    "info".into()
}

impl Config {
    /// Load and validate configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if any required variable is absent or cannot be parsed.
    pub fn from_env() -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(config::Environment::default())
            .build()
            .context("failed to build configuration from environment")?;

        let c: Config = cfg
            .try_deserialize()
            .context("failed to deserialise configuration")?;

        c.validate()?;
        Ok(c)
    }

    /// Validate all fields, returning a descriptive error on the first failure.
    fn validate(&self) -> Result<()> {
        ensure_non_empty(&self.service_principal_name, "SERVICE_PRINCIPAL_NAME")?;
        ensure_non_empty(&self.warehouse_id, "WAREHOUSE_ID")?;
        ensure_non_empty(&self.workspace_name, "WORKSPACE_NAME")?;
        ensure_non_empty(&self.dataset_name, "DATASET_NAME")?;
        ensure_non_empty(&self.secret_scope, "SECRET_SCOPE")?;
        ensure_non_empty(&self.client_id_secret, "CLIENT_ID_SECRET")?;
        ensure_non_empty(&self.client_secret_secret, "CLIENT_SECRET_SECRET")?;
        ensure_non_empty(&self.tenant_id_secret, "TENANT_ID_SECRET")?;
        ensure_non_empty(&self.databricks_host, "DATABRICKS_HOST")?;
        ensure_non_empty(&self.powerbi_api_base, "POWERBI_API_BASE")?;
        ensure_non_empty(&self.login_base, "LOGIN_BASE")?;

        if self.databricks_token.is_blank() {
            anyhow::bail!("DATABRICKS_TOKEN is required and must not be empty");
        }
        if self.secret_lifetime_secs == 0 {
            anyhow::bail!("SECRET_LIFETIME_SECS must be > 0");
        }
        if self.max_secrets == 0 {
            anyhow::bail!("MAX_SECRETS must be > 0");
        }
        if self.http_timeout_secs == 0 {
            anyhow::bail!("HTTP_TIMEOUT_SECS must be > 0");
        }
        Ok(())
    }
}

fn ensure_non_empty(value: &str, name: &str) -> Result<()> {
    if value.trim().is_empty() {
        anyhow::bail!("{name} is required and must not be empty");
    }
    Ok(())
}
