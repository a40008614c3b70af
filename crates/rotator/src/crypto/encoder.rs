//! Entry point of the gateway credential encryptor.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use common::protocol::GatewayPublicKey;
use tracing::debug;

use super::{envelope, segmented, CryptoError};

/// Modulus length (bytes) that selects the direct segmented strategy.
pub const DIRECT_MODULUS_LEN: usize = 128;

/// The two encryption strategies, selected once per call by modulus length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Per-segment RSA-OAEP; 1024-bit keys only.
    Segmented,
    /// Ephemeral AES/HMAC keys wrapped with RSA-OAEP.
    Envelope,
}

impl Strategy {
    /// Exactly [`DIRECT_MODULUS_LEN`] bytes selects [`Strategy::Segmented`];
    /// every other length, shorter ones included, selects [`Strategy::Envelope`].
    pub fn for_modulus(modulus: &[u8]) -> Self {
        if modulus.len() == DIRECT_MODULUS_LEN {
            Strategy::Segmented
        } else {
            Strategy::Envelope
        }
    }

    /// Encrypt `plaintext` and return the final credential string.
    pub fn encrypt(
        self,
        plaintext: &[u8],
        modulus: &[u8],
        exponent: &[u8],
    ) -> Result<String, CryptoError> {
        match self {
            Strategy::Segmented => {
                segmented::encrypt(plaintext, modulus, exponent).map(|ct| STANDARD.encode(ct))
            }
            Strategy::Envelope => envelope::encrypt(plaintext, modulus, exponent),
        }
    }
}

/// Encrypt `plaintext` for a gateway whose public key is given as standard
/// Base64 `modulus` and `exponent`.
///
/// # Errors
///
/// - [`CryptoError::InvalidArgument`] if any input is empty.
/// - [`CryptoError::Decoding`] if a key component is not valid Base64.
/// - [`CryptoError::Encryption`] if the selected strategy fails.
pub fn encode(modulus_b64: &str, exponent_b64: &str, plaintext: &[u8]) -> Result<String, CryptoError> {
    if modulus_b64.is_empty() {
        return Err(CryptoError::InvalidArgument("public key modulus is empty".into()));
    }
    if exponent_b64.is_empty() {
        return Err(CryptoError::InvalidArgument("public key exponent is empty".into()));
    }
    if plaintext.is_empty() {
        return Err(CryptoError::InvalidArgument("plaintext is empty".into()));
    }

    let modulus = STANDARD
        .decode(modulus_b64)
        .map_err(|source| CryptoError::Decoding {
            field: "modulus",
            source,
        })?;
    let exponent = STANDARD
        .decode(exponent_b64)
        .map_err(|source| CryptoError::Decoding {
            field: "exponent",
            source,
        })?;

    let strategy = Strategy::for_modulus(&modulus);
    debug!(
        ?strategy,
        modulus_len = modulus.len(),
        plaintext_len = plaintext.len(),
        "encrypting gateway credentials"
    );
    strategy.encrypt(plaintext, &modulus, &exponent)
}

/// [`encode`] for a key fetched from the gateway-info API.
pub fn encode_for_gateway(key: &GatewayPublicKey, plaintext: &str) -> Result<String, CryptoError> {
    encode(&key.modulus, &key.exponent, plaintext.as_bytes())
}
