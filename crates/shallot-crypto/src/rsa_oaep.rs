//! RSA-OAEP key blocks.
//!
//! Every onion layer starts with a symmetric key encrypted to the hop's
//! RSA-2048 public key using OAEP with SHA-256. A 2048-bit modulus always
//! yields a 256-byte ciphertext, which is 344 characters of padded base64.
//! That width is what lets a relay split a layer without a length prefix, so
//! changing the key size or padding scheme changes [`KEY_BLOCK_LEN`] for the
//! whole network.
//!
//! Public keys travel as base64 SubjectPublicKeyInfo DER. Private keys never
//! leave the node except through [`RsaKeyPair::export_private_key`], which
//! exists for debugging and tests.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use rand::rngs::OsRng;
use rsa::pkcs8::{DecodePublicKey, EncodePrivateKey, EncodePublicKey};
use rsa::Oaep;
use sha2::Sha256;

use crate::{CryptoError, Result};

/// RSA modulus size in bits.
pub const RSA_KEY_BITS: usize = 2048;

/// Raw RSA-OAEP ciphertext size in bytes for [`RSA_KEY_BITS`].
pub const CIPHERTEXT_SIZE: usize = RSA_KEY_BITS / 8;

/// Width of a base64-encoded key block in characters.
pub const KEY_BLOCK_LEN: usize = 344;

/// An RSA public key used to encrypt key blocks for one relay.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RsaPublicKey {
    inner: rsa::RsaPublicKey,
}

/// A relay's long-lived RSA key pair. The private half stays with the relay.
#[derive(Clone)]
pub struct RsaKeyPair {
    secret: rsa::RsaPrivateKey,
    public: RsaPublicKey,
}

impl RsaKeyPair {
    /// Generate a fresh 2048-bit key pair from the OS RNG.
    pub fn generate() -> Result<Self> {
        let secret = rsa::RsaPrivateKey::new(&mut OsRng, RSA_KEY_BITS)
            .map_err(|e| CryptoError::KeyGeneration(e.to_string()))?;
        let public = RsaPublicKey {
            inner: rsa::RsaPublicKey::from(&secret),
        };
        Ok(Self { secret, public })
    }

    /// The public half of this key pair.
    pub fn public_key(&self) -> &RsaPublicKey {
        &self.public
    }

    /// Export the private key as base64 PKCS#8 DER.
    pub fn export_private_key(&self) -> Result<String> {
        let der = self
            .secret
            .to_pkcs8_der()
            .map_err(|e| CryptoError::InvalidEncoding(e.to_string()))?;
        Ok(STANDARD.encode(der.as_bytes()))
    }
}

impl std::fmt::Debug for RsaKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RsaKeyPair")
            .field("public", &self.public)
            .finish_non_exhaustive()
    }
}

impl RsaPublicKey {
    /// Export as base64 SubjectPublicKeyInfo DER.
    pub fn to_base64(&self) -> Result<String> {
        let der = self
            .inner
            .to_public_key_der()
            .map_err(|e| CryptoError::InvalidEncoding(e.to_string()))?;
        Ok(STANDARD.encode(der.as_bytes()))
    }

    /// Import from base64 SubjectPublicKeyInfo DER.
    pub fn from_base64(encoded: &str) -> Result<Self> {
        let der = STANDARD
            .decode(encoded.trim())
            .map_err(|e| CryptoError::InvalidEncoding(e.to_string()))?;
        let inner = rsa::RsaPublicKey::from_public_key_der(&der)
            .map_err(|e| CryptoError::InvalidEncoding(e.to_string()))?;
        Ok(Self { inner })
    }
}

/// Encrypt `plaintext` to `recipient`, returning a [`KEY_BLOCK_LEN`]-character
/// base64 key block.
///
/// OAEP/SHA-256 with a 2048-bit key accepts at most 190 bytes of plaintext.
pub fn encrypt(recipient: &RsaPublicKey, plaintext: &[u8]) -> Result<String> {
    let ciphertext = recipient
        .inner
        .encrypt(&mut OsRng, Oaep::new::<Sha256>(), plaintext)
        .map_err(|e| CryptoError::RsaEncryption(e.to_string()))?;
    Ok(STANDARD.encode(ciphertext))
}

/// Decrypt a base64 key block with the relay's private key.
pub fn decrypt(keys: &RsaKeyPair, key_block: &str) -> Result<Vec<u8>> {
    let ciphertext = STANDARD
        .decode(key_block)
        .map_err(|e| CryptoError::InvalidEncoding(e.to_string()))?;
    if ciphertext.len() != CIPHERTEXT_SIZE {
        return Err(CryptoError::InvalidKeyLength {
            expected: CIPHERTEXT_SIZE,
            actual: ciphertext.len(),
        });
    }

    keys.secret
        .decrypt(Oaep::new::<Sha256>(), &ciphertext)
        .map_err(|_| CryptoError::RsaDecryption)
}
