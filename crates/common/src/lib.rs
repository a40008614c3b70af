//! Common wire types and errors shared across the credential rotator crates.

pub mod error;
pub mod protocol;

pub use error::ApiError;
