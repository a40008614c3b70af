//! Power BI REST API: workspace/dataset resolution, gateway keys, datasource
//! credential updates, and refreshes.
//!
//! Authentication is a single client-credentials token fetched at connect
//! time from Entra ID.

pub mod client;
pub mod token;

pub use client::PowerBiClient;
pub use token::AppCredentials;
