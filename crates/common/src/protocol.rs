//! Request and response types exchanged with the Power BI and Databricks REST APIs.
//!
//! Field names follow each service's JSON casing: Power BI uses camelCase,
//! the Databricks SCIM API uses camelCase, and the remaining Databricks
//! endpoints use snake_case.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// OAuth token endpoint
// ---------------------------------------------------------------------------

/// Client-credentials token response from the identity provider.
#[derive(Clone, Deserialize)]
pub struct TokenResponse {
    /// Bearer token to send as `Authorization: Bearer <token>`.
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
}

impl fmt::Debug for TokenResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenResponse")
            .field("access_token", &"[REDACTED]")
            .field("token_type", &self.token_type)
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Power BI
// ---------------------------------------------------------------------------

/// OData collection wrapper returned by every Power BI list endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ODataList<T> {
    #[serde(default = "Vec::new")]
    pub value: Vec<T>,
}

/// A Power BI workspace (a "group" in the REST API).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Group {
    pub id: String,
    pub name: String,
}

/// A Power BI dataset (semantic model).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dataset {
    pub id: String,
    pub name: String,
}

/// Connection details of a dataset datasource. Only `kind` is interpreted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConnectionDetails {
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
}

/// A datasource bound to a dataset.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Datasource {
    #[serde(default)]
    pub datasource_type: Option<String>,
    #[serde(default)]
    pub connection_details: ConnectionDetails,
    /// Empty when the service omits it; only checked on the Databricks match.
    #[serde(default)]
    pub datasource_id: String,
    #[serde(default)]
    pub gateway_id: String,
}

impl Datasource {
    /// Datasource kind reported for Databricks connections.
    pub const DATABRICKS_KIND: &'static str = "Databricks";

    /// Returns `true` if this datasource points at Databricks.
    pub fn is_databricks(&self) -> bool {
        self.connection_details.kind.as_deref() == Some(Self::DATABRICKS_KIND)
    }
}

/// Gateway public key as published by the Power BI gateway-info API.
///
/// Both fields are standard Base64 encodings of big-endian integers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayPublicKey {
    pub exponent: String,
    pub modulus: String,
}

/// Response body for `GET gateways/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Gateway {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    pub public_key: GatewayPublicKey,
}

/// Credential type of a datasource credential update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CredentialType {
    Basic,
}

/// Whether the gateway should encrypt the live connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EncryptedConnection {
    Encrypted,
    NotEncrypted,
}

/// Algorithm used to protect the `credentials` field in transit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EncryptionAlgorithm {
    /// Credentials were encrypted with the gateway public key.
    #[serde(rename = "RSA-OAEP")]
    RsaOaep,
    /// Credentials are sent as plain JSON (cloud / VNet gateways).
    None,
}

/// Power BI privacy level assigned to the datasource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PrivacyLevel {
    None,
    Public,
    Organizational,
    Private,
}

/// The `credentialDetails` object of a datasource update.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialDetails {
    pub credential_type: CredentialType,
    /// Either the plain credential JSON or the gateway-encrypted string,
    /// embedded verbatim.
    pub credentials: String,
    pub encrypted_connection: EncryptedConnection,
    pub encryption_algorithm: EncryptionAlgorithm,
    pub privacy_level: PrivacyLevel,
    #[serde(rename = "useEndUserOAuth2Credentials")]
    pub use_end_user_oauth2_credentials: bool,
}

/// Request body for `PATCH gateways/{gw}/datasources/{ds}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDatasourceRequest {
    pub credential_details: CredentialDetails,
}

/// Request body for `POST groups/{ws}/datasets/{ds}/refreshes`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub notify_option: String,
}

impl Default for RefreshRequest {
    fn default() -> Self {
        Self {
            notify_option: "NoNotification".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Basic credential payload
// ---------------------------------------------------------------------------

/// One `{name, value}` entry of a basic credential payload.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialEntry {
    pub name: String,
    pub value: String,
}

/// Username/password pair in the shape Power BI expects inside `credentials`.
///
/// The serialised JSON of this type is the plaintext handed to the gateway
/// credential encryptor.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BasicCredentials {
    pub credential_data: Vec<CredentialEntry>,
}

impl BasicCredentials {
    /// Build the payload for a username/password pair.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            credential_data: vec![
                CredentialEntry {
                    name: "username".into(),
                    value: username.into(),
                },
                CredentialEntry {
                    name: "password".into(),
                    value: password.into(),
                },
            ],
        }
    }

    /// Serialise to the compact JSON string embedded in (or encrypted into)
    /// the datasource update.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

impl fmt::Debug for BasicCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never print credential values.
        let names: Vec<&str> = self.credential_data.iter().map(|e| e.name.as_str()).collect();
        f.debug_struct("BasicCredentials")
            .field("credential_data", &names)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Databricks
// ---------------------------------------------------------------------------

/// A workspace service principal as returned by the SCIM API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServicePrincipal {
    /// Workspace-local numeric id (as a string).
    pub id: String,
    /// OAuth client id (UUID) of the principal.
    pub application_id: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

/// SCIM list response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScimList<T> {
    #[serde(default)]
    pub total_results: Option<u64>,
    #[serde(rename = "Resources", default = "Vec::new")]
    pub resources: Vec<T>,
}

/// Request body for creating a service principal.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateServicePrincipalRequest {
    pub display_name: String,
}

/// Metadata of an existing service principal OAuth secret.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecretInfo {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub create_time: Option<String>,
    #[serde(default)]
    pub expire_time: Option<String>,
}

/// Response body for listing service principal secrets.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListSecretsResponse {
    #[serde(default)]
    pub secrets: Vec<SecretInfo>,
}

/// Request body for creating a service principal secret.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSecretRequest {
    /// Lifetime in protobuf duration notation, e.g. `"604800s"`.
    pub lifetime: String,
}

/// Response body for creating a service principal secret.
///
/// `secret` is only ever returned once, at creation time.
#[derive(Clone, Serialize, Deserialize)]
pub struct CreatedSecret {
    #[serde(default)]
    pub id: Option<String>,
    pub secret: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub create_time: Option<String>,
    #[serde(default)]
    pub expire_time: Option<String>,
}

impl fmt::Debug for CreatedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CreatedSecret")
            .field("id", &self.id)
            .field("secret", &"[REDACTED]")
            .field("status", &self.status)
            .field("create_time", &self.create_time)
            .field("expire_time", &self.expire_time)
            .finish()
    }
}

/// Permission levels that can be granted on a SQL warehouse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WarehousePermissionLevel {
    CanUse,
    CanMonitor,
    CanManage,
}

/// One entry of a warehouse access control list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WarehouseAccessControlRequest {
    pub service_principal_name: String,
    pub permission_level: WarehousePermissionLevel,
}

/// Request body for `PUT /api/2.0/permissions/warehouses/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WarehousePermissionsRequest {
    pub access_control_list: Vec<WarehouseAccessControlRequest>,
}

/// Response body for `GET /api/2.0/secrets/get`. `value` is standard Base64.
#[derive(Clone, Serialize, Deserialize)]
pub struct SecretValue {
    pub key: String,
    pub value: String,
}

impl fmt::Debug for SecretValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretValue")
            .field("key", &self.key)
            .field("value", &"[REDACTED]")
            .finish()
    }
}
