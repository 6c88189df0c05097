//! # shallot-crypto
//!
//! Cryptographic primitives for the Shallot onion overlay.
//!
//! The suite is fixed: there is no algorithm negotiation, and every node in a
//! network must agree on it because the key-block width is derived from it.
//!
//! ## Modules
//!
//! - [`rsa_oaep`] - RSA-2048 key pairs and OAEP/SHA-256 key-block encryption
//! - [`chacha20`] - ChaCha20-Poly1305 layer payload encryption (RFC 8439)
//!
//! All binary material leaves this crate as standard base64 text so that
//! onion layers can be concatenated as plain strings.

pub mod chacha20;
pub mod rsa_oaep;

pub use chacha20::SymmetricKey;
pub use rsa_oaep::{RsaKeyPair, RsaPublicKey, KEY_BLOCK_LEN};

/// Error types for cryptographic operations.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    /// RSA key pair generation failed.
    #[error("key generation failed: {0}")]
    KeyGeneration(String),

    /// RSA-OAEP encryption of a key block failed.
    #[error("RSA-OAEP encryption failed: {0}")]
    RsaEncryption(String),

    /// RSA-OAEP decryption failed (wrong private key or corrupted block).
    #[error("RSA-OAEP decryption failed")]
    RsaDecryption,

    /// AEAD encryption failed.
    #[error("AEAD encryption failed")]
    AeadEncryption,

    /// AEAD decryption failed (authentication tag mismatch).
    #[error("AEAD decryption failed")]
    AeadDecryption,

    /// Invalid key length.
    #[error("invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    /// Malformed base64 or DER input.
    #[error("invalid encoding: {0}")]
    InvalidEncoding(String),
}

pub type Result<T> = std::result::Result<T, CryptoError>;
