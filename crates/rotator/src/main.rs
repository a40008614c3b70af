//! `m2m-rotator`: one-shot job that rotates a Databricks service principal
//! secret into a Power BI datasource.
//!
//! Startup sequence:
//! 1. Load and validate [`Config`] from environment variables.
//! 2. Initialise the telemetry pipeline (tracing + optional OTLP).
//! 3. Build the shared HTTP client and the Databricks client.
//! 4. Provision the service principal and mint a new OAuth secret.
//! 5. Read the Power BI app registration from the secret scope and connect.
//! 6. Rebind the dataset's Databricks datasource to the new secret.
//! 7. Flush telemetry and exit.

mod config;
mod crypto;
mod databricks;
mod http;
mod powerbi;
mod secret;
mod services;
mod telemetry;
mod workflow;

use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{error, info};

use config::Config;
use databricks::DatabricksClient;
use powerbi::PowerBiClient;

#[tokio::main]
async fn main() -> Result<()> {
    // -----------------------------------------------------------------------
    // 1. Configuration
    // -----------------------------------------------------------------------
    let cfg = Config::from_env().map_err(|e| {
        // Telemetry is not yet up; write to stderr directly.
        eprintln!("ERROR: configuration invalid: {e:#}");
        e
    })?;

    // -----------------------------------------------------------------------
    // 2. Telemetry
    // -----------------------------------------------------------------------
    telemetry::init_telemetry(cfg.otel_exporter_otlp_endpoint.as_deref(), &cfg.log_level)?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        gateway_type = ?cfg.gateway_type,
        "m2m-rotator starting"
    );

    let outcome = run(&cfg).await;
    if let Err(e) = &outcome {
        error!(error = format!("{e:#}"), "rotation failed");
    }

    // -----------------------------------------------------------------------
    // 7. Shutdown
    // -----------------------------------------------------------------------
    telemetry::shutdown_telemetry();
    outcome
}

async fn run(cfg: &Config) -> Result<()> {
    // -----------------------------------------------------------------------
    // 3. Clients
    // -----------------------------------------------------------------------
    let http = http::build_client(Duration::from_secs(cfg.http_timeout_secs))?;
    let databricks = DatabricksClient::new(
        http.clone(),
        cfg.databricks_host.clone(),
        cfg.databricks_token.clone(),
    );

    // -----------------------------------------------------------------------
    // 4. Service principal + new secret
    // -----------------------------------------------------------------------
    let principal = workflow::provision_principal(&databricks, cfg)
        .await
        .context("failed to provision service principal secret")?;

    // -----------------------------------------------------------------------
    // 5. Power BI connection
    // -----------------------------------------------------------------------
    let app = workflow::load_app_credentials(&databricks, cfg)
        .await
        .context("failed to read Power BI app credentials")?;
    let powerbi = PowerBiClient::connect(http, &cfg.login_base, cfg.powerbi_api_base.clone(), &app)
        .await
        .context("failed to authenticate to Power BI")?;

    // -----------------------------------------------------------------------
    // 6. Datasource rebind
    // -----------------------------------------------------------------------
    let rebound = workflow::rebind_datasource(&powerbi, cfg, &principal)
        .await
        .context("failed to update datasource credentials")?;

    info!(
        workspace_id = %rebound.workspace_id,
        dataset_id = %rebound.dataset_id,
        gateway_id = %rebound.datasource.gateway_id,
        datasource_id = %rebound.datasource.datasource_id,
        refreshed = rebound.refreshed,
        "rotation complete"
    );
    Ok(())
}
