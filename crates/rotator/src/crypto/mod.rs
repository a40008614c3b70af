//! Encryption of datasource credentials for on-premises data gateways.
//!
//! This module is intentionally free of HTTP dependencies. Callers hand it
//! the gateway's Base64 public key and the credential JSON and get back the
//! string that goes into the `credentials` field of a datasource update.
//!
//! # Output format
//!
//! For a 1024-bit gateway key (128-byte modulus):
//!
//! ```text
//! base64( rsa_oaep(seg_0) || rsa_oaep(seg_1) || ... )      segments of 60 bytes
//! ```
//!
//! For every other key size:
//!
//! ```text
//! base64( rsa_oaep(0x00 0x01 || aes_key[32] || mac_key[64]) ) || base64( envelope )
//! ```
//!
//! where `envelope` is the layout documented in [`aead`].

pub mod aead;
pub mod encoder;
pub mod envelope;
pub mod error;
pub mod oaep;
pub mod segmented;

pub use encoder::encode_for_gateway;
pub use error::CryptoError;
