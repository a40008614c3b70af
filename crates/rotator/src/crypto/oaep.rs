//! RSA-OAEP (SHA-256 hash, MGF1-SHA-256) encryption under a raw public key.

use rand::rngs::OsRng;
use rsa::{traits::PublicKeyParts, BigUint, Oaep, RsaPublicKey};
use sha2::Sha256;

use super::CryptoError;

/// Largest accepted modulus. Gateways may publish keys beyond the 4096-bit
/// default ceiling of [`RsaPublicKey::new`].
pub const MAX_MODULUS_BITS: usize = 16384;

/// Build an RSA public key from big-endian modulus and exponent bytes.
///
/// # Errors
///
/// Returns [`CryptoError::InvalidArgument`] if either component is empty and
/// [`CryptoError::Encryption`] if the pair is not a usable RSA key.
pub fn public_key(modulus: &[u8], exponent: &[u8]) -> Result<RsaPublicKey, CryptoError> {
    if modulus.is_empty() {
        return Err(CryptoError::InvalidArgument("modulus must not be empty".into()));
    }
    if exponent.is_empty() {
        return Err(CryptoError::InvalidArgument("exponent must not be empty".into()));
    }
    RsaPublicKey::new_with_max_size(
        BigUint::from_bytes_be(modulus),
        BigUint::from_bytes_be(exponent),
        MAX_MODULUS_BITS,
    )
    .map_err(|e| CryptoError::Encryption(format!("unusable RSA public key: {e}")))
}

/// Encrypt one block with RSA-OAEP-SHA256. The output is always
/// `key.size()` bytes long.
///
/// # Errors
///
/// Returns [`CryptoError::Encryption`] if `message` exceeds the OAEP capacity
/// of `key` or the RSA primitive fails.
pub fn encrypt(key: &RsaPublicKey, message: &[u8]) -> Result<Vec<u8>, CryptoError> {
    key.encrypt(&mut OsRng, Oaep::new::<Sha256>(), message)
        .map_err(|e| {
            CryptoError::Encryption(format!(
                "RSA-OAEP over {} byte modulus failed: {e}",
                key.size()
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::test_keys;

    #[test]
    fn empty_components_rejected() {
        assert!(matches!(
            public_key(&[], &[1, 0, 1]),
            Err(CryptoError::InvalidArgument(_))
        ));
        assert!(matches!(
            public_key(&[0xC3; 128], &[]),
            Err(CryptoError::InvalidArgument(_))
        ));
    }

    #[test]
    fn accepts_moduli_above_4096_bits() {
        let mut n = vec![0xC3u8; 1024];
        n[1023] |= 0x01;
        let key = public_key(&n, &[0x01, 0x00, 0x01]).unwrap();
        assert_eq!(key.size(), 1024);
        assert_eq!(encrypt(&key, &[0xAB; 98]).unwrap().len(), 1024);
    }

    #[test]
    fn rejects_moduli_above_ceiling() {
        let n = vec![0xC3u8; MAX_MODULUS_BITS / 8 + 1];
        assert!(matches!(
            public_key(&n, &[0x01, 0x00, 0x01]),
            Err(CryptoError::Encryption(_))
        ));
    }

    #[test]
    fn output_is_modulus_sized() {
        let (n, e) = test_keys::public_parts(test_keys::rsa_1024());
        let key = public_key(&n, &e).unwrap();
        let ct = encrypt(&key, b"hello").unwrap();
        assert_eq!(ct.len(), 128);
        assert_eq!(test_keys::decrypt(test_keys::rsa_1024(), &ct), b"hello");
    }

    #[test]
    fn oversized_message_fails() {
        let (n, e) = test_keys::public_parts(test_keys::rsa_1024());
        let key = public_key(&n, &e).unwrap();
        // 1024-bit OAEP-SHA256 carries at most 128 - 2*32 - 2 = 62 bytes.
        assert!(matches!(
            encrypt(&key, &[0u8; 63]),
            Err(CryptoError::Encryption(_))
        ));
    }
}
