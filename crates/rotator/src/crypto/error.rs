//! Errors produced by the gateway credential encryptor.

use thiserror::Error;

/// Errors produced by the crypto layer.
///
/// Every variant is terminal for the current encode call; no partial output
/// is ever returned alongside an error.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// A required input was missing, empty, or too short.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A public key component was not valid standard Base64.
    #[error("invalid base64 in {field}: {source}")]
    Decoding {
        /// Name of the offending input, e.g. `"modulus"`.
        field: &'static str,
        #[source]
        source: base64::DecodeError,
    },

    /// The underlying RSA, AES, or HMAC operation failed.
    #[error("encryption failed: {0}")]
    Encryption(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_field() {
        let e = CryptoError::InvalidArgument("plaintext must not be empty".into());
        assert!(e.to_string().contains("plaintext"));
    }
}
