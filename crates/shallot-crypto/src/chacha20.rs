//! ChaCha20-Poly1305 AEAD encryption (RFC 8439) for layer payloads.
//!
//! Each layer is sealed under its own random [`SymmetricKey`]. The key is
//! used for exactly one [`seal`] call and dropped (and zeroized) afterwards;
//! only its RSA-encrypted text form travels with the layer.
//!
//! ## Text format
//!
//! ```text
//! seal(key, m) = base64( nonce[12] || ChaCha20-Poly1305(key, nonce, m) || tag[16] )
//! ```

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Key, Nonce,
};
use rand::rngs::OsRng;
use rand::RngCore;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::{CryptoError, Result};

/// Nonce size for ChaCha20-Poly1305 (96 bits = 12 bytes).
pub const NONCE_SIZE: usize = 12;

/// Key size for ChaCha20-Poly1305 (256 bits = 32 bytes).
pub const KEY_SIZE: usize = 32;

/// Authentication tag size (128 bits = 16 bytes).
pub const TAG_SIZE: usize = 16;

/// A single-use layer key.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SymmetricKey {
    bytes: [u8; KEY_SIZE],
}

impl SymmetricKey {
    /// Generate a fresh random key.
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_SIZE];
        OsRng.fill_bytes(&mut bytes);
        Self { bytes }
    }

    /// Canonical text form: standard base64 of the raw key (44 characters).
    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.bytes)
    }

    /// Parse the canonical text form.
    pub fn from_base64(encoded: &str) -> Result<Self> {
        let mut decoded = STANDARD
            .decode(encoded)
            .map_err(|e| CryptoError::InvalidEncoding(e.to_string()))?;
        if decoded.len() != KEY_SIZE {
            let actual = decoded.len();
            decoded.zeroize();
            return Err(CryptoError::InvalidKeyLength {
                expected: KEY_SIZE,
                actual,
            });
        }
        let mut bytes = [0u8; KEY_SIZE];
        bytes.copy_from_slice(&decoded);
        decoded.zeroize();
        Ok(Self { bytes })
    }
}

/// Encrypt `plaintext` under `key` with a fresh random nonce.
pub fn seal(key: &SymmetricKey, plaintext: &[u8]) -> Result<String> {
    let cipher = ChaCha20Poly1305::new(Key::from_slice(&key.bytes));

    let mut nonce = [0u8; NONCE_SIZE];
    OsRng.fill_bytes(&mut nonce);

    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce), plaintext)
        .map_err(|_| CryptoError::AeadEncryption)?;

    let mut out = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
    out.extend_from_slice(&nonce);
    out.extend_from_slice(&ciphertext);
    Ok(STANDARD.encode(out))
}

/// Decrypt text produced by [`seal`].
pub fn open(key: &SymmetricKey, sealed: &str) -> Result<Vec<u8>> {
    let data = STANDARD
        .decode(sealed)
        .map_err(|e| CryptoError::InvalidEncoding(e.to_string()))?;
    if data.len() < NONCE_SIZE + TAG_SIZE {
        return Err(CryptoError::InvalidEncoding(format!(
            "sealed payload too short: {} bytes",
            data.len()
        )));
    }

    let (nonce, ciphertext) = data.split_at(NONCE_SIZE);
    let cipher = ChaCha20Poly1305::new(Key::from_slice(&key.bytes));
    cipher
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|_| CryptoError::AeadDecryption)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seal_open_roundtrip() {
        let key = SymmetricKey::generate();
        let sealed = seal(&key, b"0000003005hello").expect("seal");
        let opened = open(&key, &sealed).expect("open");
        assert_eq!(opened, b"0000003005hello");
    }

    #[test]
    fn test_sealed_length() {
        let key = SymmetricKey::generate();
        let sealed = seal(&key, b"").expect("seal");
        let raw = STANDARD.decode(&sealed).expect("base64");
        assert_eq!(raw.len(), NONCE_SIZE + TAG_SIZE);
    }

    #[test]
    fn test_nonce_is_fresh() {
        let key = SymmetricKey::generate();
        let a = seal(&key, b"same").expect("seal");
        let b = seal(&key, b"same").expect("seal");
        assert_ne!(a, b);
    }

    #[test]
    fn test_wrong_key_fails() {
        let k1 = SymmetricKey::generate();
        let k2 = SymmetricKey::generate();
        let sealed = seal(&k1, b"test").expect("seal");
        assert!(matches!(open(&k2, &sealed), Err(CryptoError::AeadDecryption)));
    }

    #[test]
    fn test_tampered_ciphertext_fails() {
        let key = SymmetricKey::generate();
        let sealed = seal(&key, b"test").expect("seal");
        let mut raw = STANDARD.decode(&sealed).expect("base64");
        if let Some(byte) = raw.last_mut() {
            *byte ^= 0xFF;
        }
        let tampered = STANDARD.encode(raw);
        assert!(matches!(open(&key, &tampered), Err(CryptoError::AeadDecryption)));
    }

    #[test]
    fn test_short_input_fails() {
        let key = SymmetricKey::generate();
        assert!(matches!(open(&key, "AAAA"), Err(CryptoError::InvalidEncoding(_))));
        assert!(matches!(open(&key, "%%%"), Err(CryptoError::InvalidEncoding(_))));
    }

    #[test]
    fn test_key_text_form() {
        let key = SymmetricKey::generate();
        let text = key.to_base64();
        assert_eq!(text.len(), 44);

        let parsed = SymmetricKey::from_base64(&text).expect("parse");
        let sealed = seal(&parsed, b"x").expect("seal");
        assert_eq!(open(&key, &sealed).expect("open"), b"x");
    }

    #[test]
    fn test_key_text_wrong_length() {
        let short = STANDARD.encode([0u8; 16]);
        assert!(matches!(
            SymmetricKey::from_base64(&short),
            Err(CryptoError::InvalidKeyLength {
                expected: 32,
                actual: 16
            })
        ));
    }
}
