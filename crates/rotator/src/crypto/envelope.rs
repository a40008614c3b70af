//! Hybrid envelope encryption for gateway keys other than 1024-bit.
//!
//! A fresh AES key and HMAC key are generated per call, the payload is
//! sealed with [`aead::encrypt`], and the key pair is wrapped with a single
//! RSA-OAEP block. The result is two independently Base64-encoded parts
//! joined without a separator.

use std::fmt;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use rand::{rngs::OsRng, RngCore};
use zeroize::Zeroize;

use super::{aead, oaep, CryptoError};

/// AES key length carried in the key block.
pub const ENCRYPTION_KEY_LEN: usize = 32;

/// HMAC key length carried in the key block.
pub const MAC_KEY_LEN: usize = 64;

/// Key-length tags prefixed to the key block: "32-byte key", "64-byte key".
pub const KEY_LENGTH_TAGS: [u8; 2] = [0x00, 0x01];

/// Total length of the RSA-wrapped key block.
pub const KEY_BLOCK_LEN: usize = KEY_LENGTH_TAGS.len() + ENCRYPTION_KEY_LEN + MAC_KEY_LEN;

/// Per-call symmetric key material. Zeroed on drop.
pub struct EphemeralKeys {
    encryption_key: Box<[u8; ENCRYPTION_KEY_LEN]>,
    mac_key: Box<[u8; MAC_KEY_LEN]>,
}

impl EphemeralKeys {
    /// Draw both keys from the OS CSPRNG.
    pub fn generate() -> Self {
        let mut encryption_key = Box::new([0u8; ENCRYPTION_KEY_LEN]);
        let mut mac_key = Box::new([0u8; MAC_KEY_LEN]);
        OsRng.fill_bytes(&mut encryption_key[..]);
        OsRng.fill_bytes(&mut mac_key[..]);
        Self {
            encryption_key,
            mac_key,
        }
    }

    /// `[0x00, 0x01] || encryption_key || mac_key`
    fn key_block(&self) -> Vec<u8> {
        let mut block = Vec::with_capacity(KEY_BLOCK_LEN);
        block.extend_from_slice(&KEY_LENGTH_TAGS);
        block.extend_from_slice(&self.encryption_key[..]);
        block.extend_from_slice(&self.mac_key[..]);
        block
    }
}

impl Zeroize for EphemeralKeys {
    fn zeroize(&mut self) {
        self.encryption_key.zeroize();
        self.mac_key.zeroize();
    }
}

impl Drop for EphemeralKeys {
    fn drop(&mut self) {
        self.zeroize();
    }
}

impl fmt::Debug for EphemeralKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("EphemeralKeys([REDACTED])")
    }
}

/// Encrypt `plaintext` for the gateway key `(modulus, exponent)`.
///
/// Returns `Base64(rsa(key_block)) + Base64(envelope)`.
///
/// # Errors
///
/// Returns [`CryptoError::InvalidArgument`] on empty input and
/// [`CryptoError::Encryption`] if any primitive fails, e.g. when the modulus
/// is too small to carry the 98-byte key block. There is no retry.
pub fn encrypt(plaintext: &[u8], modulus: &[u8], exponent: &[u8]) -> Result<String, CryptoError> {
    if plaintext.is_empty() {
        return Err(CryptoError::InvalidArgument("plaintext must not be empty".into()));
    }
    let key = oaep::public_key(modulus, exponent)?;
    let keys = EphemeralKeys::generate();

    let envelope = aead::encrypt(&keys.encryption_key[..], &keys.mac_key[..], plaintext)?;

    let mut key_block = keys.key_block();
    let wrapped = oaep::encrypt(&key, &key_block);
    key_block.zeroize();
    let wrapped = wrapped?;

    let mut out = STANDARD.encode(&wrapped);
    out.push_str(&STANDARD.encode(&envelope));
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::aead::tests::{open, verify};
    use crate::crypto::test_keys;

    /// Split the two-part output at the Base64 length of a `rsa_len`-byte block.
    fn split(output: &str, rsa_len: usize) -> (Vec<u8>, Vec<u8>) {
        let boundary = rsa_len.div_ceil(3) * 4;
        let (head, tail) = output.split_at(boundary);
        (STANDARD.decode(head).unwrap(), STANDARD.decode(tail).unwrap())
    }

    fn encrypt_with_2048(plaintext: &[u8]) -> String {
        let (n, e) = test_keys::public_parts(test_keys::rsa_2048());
        encrypt(plaintext, &n, &e).unwrap()
    }

    #[test]
    fn key_block_layout() {
        let keys = EphemeralKeys::generate();
        let block = keys.key_block();
        assert_eq!(block.len(), KEY_BLOCK_LEN);
        assert_eq!(KEY_BLOCK_LEN, 98);
        assert_eq!(&block[..2], &[0x00, 0x01]);
        assert_eq!(&block[2..34], &keys.encryption_key[..]);
        assert_eq!(&block[34..], &keys.mac_key[..]);
    }

    #[test]
    fn two_part_output_sizes() {
        for len in [1usize, 15, 16, 100, 500] {
            let plaintext = vec![b'x'; len];
            let out = encrypt_with_2048(&plaintext);
            let (wrapped, envelope) = split(&out, 256);
            assert_eq!(wrapped.len(), 256);
            let padded = (len / 16 + 1) * 16;
            assert_eq!(envelope.len(), 2 + 32 + 16 + padded, "len {len}");
        }
    }

    #[test]
    fn wrapped_key_block_recovers_keys_and_payload() {
        for len in [1usize, 16, 53, 500] {
            let plaintext: Vec<u8> = (0..len).map(|i| b'a' + (i % 26) as u8).collect();
            let out = encrypt_with_2048(&plaintext);
            let (wrapped, envelope) = split(&out, 256);

            let block = test_keys::decrypt(test_keys::rsa_2048(), &wrapped);
            assert_eq!(block.len(), KEY_BLOCK_LEN, "len {len}");
            assert_eq!(&block[..2], &KEY_LENGTH_TAGS, "len {len}");

            let encryption_key = &block[2..34];
            let mac_key = &block[34..];
            assert!(verify(mac_key, &envelope), "len {len}");
            assert_eq!(open(encryption_key, &envelope), plaintext, "len {len}");
        }
    }

    #[test]
    fn keys_are_fresh_per_call() {
        let a = encrypt_with_2048(b"same");
        let b = encrypt_with_2048(b"same");
        let (wa, _) = split(&a, 256);
        let (wb, _) = split(&b, 256);
        let ka = test_keys::decrypt(test_keys::rsa_2048(), &wa);
        let kb = test_keys::decrypt(test_keys::rsa_2048(), &wb);
        assert_ne!(ka, kb);
    }

    #[test]
    fn modulus_too_small_for_key_block_fails() {
        let (n, e) = test_keys::public_parts(test_keys::rsa_1024());
        // 98-byte key block exceeds the 62-byte OAEP capacity of a 1024-bit key.
        assert!(matches!(
            encrypt(b"payload", &n, &e),
            Err(CryptoError::Encryption(_))
        ));
    }

    #[test]
    fn empty_plaintext_rejected() {
        let (n, e) = test_keys::public_parts(test_keys::rsa_2048());
        assert!(matches!(
            encrypt(b"", &n, &e),
            Err(CryptoError::InvalidArgument(_))
        ));
    }

    #[test]
    fn zeroize_clears_both_keys() {
        let mut keys = EphemeralKeys::generate();
        keys.zeroize();
        assert!(keys.encryption_key.iter().all(|&b| b == 0));
        assert!(keys.mac_key.iter().all(|&b| b == 0));
    }

    #[test]
    fn debug_is_redacted() {
        let keys = EphemeralKeys::generate();
        assert_eq!(format!("{keys:?}"), "EphemeralKeys([REDACTED])");
    }
}
