//! Structured logging and optional OpenTelemetry span export.
//!
//! # Telemetry invariants
//!
//! - **No secrets, tokens, or key material** may appear in any span attribute
//!   or log field. Secret-bearing types redact themselves in `Debug`.
//! - Log level is configurable via `LOG_LEVEL` (default: `info`), overridden
//!   by `RUST_LOG` when set.

pub mod init;

pub use init::{init_telemetry, shutdown_telemetry};
