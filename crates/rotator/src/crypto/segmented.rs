//! Direct segmented RSA-OAEP encryption for 1024-bit gateway keys.
//!
//! The plaintext is cut into [`SEGMENT_LENGTH`]-byte chunks and each chunk is
//! encrypted on its own. The output is the ordered concatenation of the
//! [`ENCRYPTED_LENGTH`]-byte segment ciphertexts.

use std::thread;
use std::time::Duration;

use rsa::RsaPublicKey;
use tracing::warn;

use super::{oaep, CryptoError};

/// Plaintext bytes per RSA block.
pub const SEGMENT_LENGTH: usize = 60;

/// Ciphertext bytes per RSA block (1024-bit modulus).
pub const ENCRYPTED_LENGTH: usize = 128;

/// Attempts per segment before the failure is surfaced.
pub const MAX_ATTEMPTS: u32 = 3;

/// Fixed pause between attempts.
pub const RETRY_DELAY: Duration = Duration::from_millis(50);

/// Number of segments a plaintext of `len` bytes is split into.
pub fn segment_count(len: usize) -> usize {
    len.div_ceil(SEGMENT_LENGTH)
}

/// Encrypt `plaintext` segment by segment under the key `(modulus, exponent)`.
///
/// Returns exactly `segment_count(plaintext.len()) * ENCRYPTED_LENGTH` bytes.
///
/// # Errors
///
/// Returns [`CryptoError::InvalidArgument`] on empty input and
/// [`CryptoError::Encryption`] once a segment has failed [`MAX_ATTEMPTS`] times.
pub fn encrypt(plaintext: &[u8], modulus: &[u8], exponent: &[u8]) -> Result<Vec<u8>, CryptoError> {
    if plaintext.is_empty() {
        return Err(CryptoError::InvalidArgument("plaintext must not be empty".into()));
    }
    let key = oaep::public_key(modulus, exponent)?;

    let mut out = Vec::with_capacity(segment_count(plaintext.len()) * ENCRYPTED_LENGTH);
    for (index, segment) in plaintext.chunks(SEGMENT_LENGTH).enumerate() {
        out.extend_from_slice(&encrypt_segment(&key, index, segment)?);
    }
    Ok(out)
}

fn encrypt_segment(key: &RsaPublicKey, index: usize, segment: &[u8]) -> Result<Vec<u8>, CryptoError> {
    if segment.is_empty() {
        return Err(CryptoError::InvalidArgument(format!("segment {index} is empty")));
    }
    let encrypted = with_retries(index, || oaep::encrypt(key, segment))?;
    if encrypted.len() != ENCRYPTED_LENGTH {
        return Err(CryptoError::Encryption(format!(
            "segment {index} encrypted to {} bytes, expected {ENCRYPTED_LENGTH}",
            encrypted.len()
        )));
    }
    Ok(encrypted)
}

/// Run `op` up to [`MAX_ATTEMPTS`] times, sleeping [`RETRY_DELAY`] between
/// failed attempts. The last error is returned unchanged.
fn with_retries<T>(
    index: usize,
    mut op: impl FnMut() -> Result<T, CryptoError>,
) -> Result<T, CryptoError> {
    let mut attempt = 1;
    loop {
        match op() {
            Ok(v) => return Ok(v),
            Err(e) if attempt < MAX_ATTEMPTS => {
                warn!(segment = index, attempt, error = %e, "segment encryption failed; retrying");
                thread::sleep(RETRY_DELAY);
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
