//! AES-256-CBC + HMAC-SHA256 authenticated encryption of the credential payload.
//!
//! The gateway parses the output positionally, so the field order below is
//! part of the wire contract:
//!
//! ```text
//! offset 0   algorithm choices  2 bytes  (always 0x00 0x00)
//! offset 2   mac               32 bytes  HMAC-SHA256(mac_key, choices || iv || cipher_text)
//! offset 34  iv                16 bytes
//! offset 50  cipher_text        n bytes  AES-256-CBC, PKCS7 padded
//! ```

use aes::cipher::{block_padding::Pkcs7, BlockEncryptMut, KeyIvInit};
use hmac::{Hmac, Mac};
use rand::{rngs::OsRng, RngCore};
use sha2::Sha256;

use super::CryptoError;

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type HmacSha256 = Hmac<Sha256>;

/// Algorithm-choice bytes. Only AES-256-CBC/HMAC-SHA256 is ever selected.
pub const ALGORITHM_CHOICES: [u8; 2] = [0x00, 0x00];

/// Bytes of `encryption_key` consumed by AES-256.
pub const KEY_LEN: usize = 32;

/// Minimum accepted HMAC key length.
pub const MIN_MAC_KEY_LEN: usize = 32;

/// AES block-sized initialisation vector.
pub const IV_LEN: usize = 16;

/// HMAC-SHA256 output length.
pub const MAC_LEN: usize = 32;

pub const MAC_OFFSET: usize = ALGORITHM_CHOICES.len();
pub const IV_OFFSET: usize = MAC_OFFSET + MAC_LEN;
pub const CIPHER_TEXT_OFFSET: usize = IV_OFFSET + IV_LEN;

/// Encrypt and authenticate `message` under a freshly generated IV.
///
/// # Errors
///
/// Returns [`CryptoError::InvalidArgument`] if `encryption_key` is shorter
/// than [`KEY_LEN`], `mac_key` shorter than [`MIN_MAC_KEY_LEN`], or `message`
/// is empty.
pub fn encrypt(
    encryption_key: &[u8],
    mac_key: &[u8],
    message: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    let mut iv = [0u8; IV_LEN];
    OsRng.fill_bytes(&mut iv);
    encrypt_with_iv(encryption_key, mac_key, &iv, message)
}

/// Same as [`encrypt`] with a caller-supplied IV. Deterministic.
pub fn encrypt_with_iv(
    encryption_key: &[u8],
    mac_key: &[u8],
    iv: &[u8; IV_LEN],
    message: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    if encryption_key.len() < KEY_LEN {
        return Err(CryptoError::InvalidArgument(format!(
            "encryption key must be at least {KEY_LEN} bytes, got {}",
            encryption_key.len()
        )));
    }
    if mac_key.len() < MIN_MAC_KEY_LEN {
        return Err(CryptoError::InvalidArgument(format!(
            "mac key must be at least {MIN_MAC_KEY_LEN} bytes, got {}",
            mac_key.len()
        )));
    }
    if message.is_empty() {
        return Err(CryptoError::InvalidArgument("message must not be empty".into()));
    }

    let cipher_text = Aes256CbcEnc::new_from_slices(&encryption_key[..KEY_LEN], iv)
        .map_err(|_| CryptoError::Encryption("AES-256-CBC key/iv rejected".into()))?
        .encrypt_padded_vec_mut::<Pkcs7>(message);

    let mac = compute_mac(mac_key, iv, &cipher_text)?;

    let mut out = Vec::with_capacity(CIPHER_TEXT_OFFSET + cipher_text.len());
    out.extend_from_slice(&ALGORITHM_CHOICES);
    out.extend_from_slice(&mac);
    out.extend_from_slice(iv);
    out.extend_from_slice(&cipher_text);
    Ok(out)
}

fn compute_mac(mac_key: &[u8], iv: &[u8], cipher_text: &[u8]) -> Result<[u8; MAC_LEN], CryptoError> {
    let mut mac = HmacSha256::new_from_slice(mac_key)
        .map_err(|_| CryptoError::Encryption("HMAC key rejected".into()))?;
    mac.update(&ALGORITHM_CHOICES);
    mac.update(iv);
    mac.update(cipher_text);
    let mut tag = [0u8; MAC_LEN];
    tag.copy_from_slice(&mac.finalize().into_bytes());
    Ok(tag)
}
