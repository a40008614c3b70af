//! Databricks workspace REST API: service principals, their OAuth secrets,
//! SQL warehouse permissions, and secret scopes.
//!
//! # Module invariants
//!
//! - Generated secrets and secret-scope values are returned as
//!   [`crate::secret::Secret`] or redacting wire types and are never logged.

pub mod client;

pub use client::DatabricksClient;
