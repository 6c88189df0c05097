//! The layered onion wire format.
//!
//! ## Layout
//!
//! ```text
//! layer     = key_block[344] || payload
//! key_block = base64( RSA-OAEP-SHA256(hop_pk, base64(sym_key)) )
//! payload   = base64( nonce || ChaCha20-Poly1305(sym_key, destination[10] || inner) || tag )
//! ```
//!
//! `destination` is the next routing address, zero-padded to 10 decimal
//! digits. `inner` is either the next layer or, at the last hop, the
//! plaintext. Both sub-fields are fixed width, so no length prefix is needed
//! and the text on the wire is the plain concatenation of the two.

use std::fmt;

use shallot_crypto::{chacha20, rsa_oaep, RsaKeyPair, RsaPublicKey, SymmetricKey};

use crate::{OnionError, Result, DESTINATION_WIDTH, KEY_BLOCK_LEN, MAX_DESTINATION};

/// A routing address carried in the destination field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Destination(u64);

impl Destination {
    /// Create a destination, rejecting values wider than the field.
    pub fn new(address: u64) -> Result<Self> {
        if address > MAX_DESTINATION {
            return Err(OnionError::InvalidDestination(address));
        }
        Ok(Self(address))
    }

    /// The numeric routing address.
    pub fn value(self) -> u64 {
        self.0
    }

    /// The address as a TCP port, if it fits.
    pub fn to_port(self) -> Option<u16> {
        u16::try_from(self.0).ok()
    }

    /// Encode as exactly [`DESTINATION_WIDTH`] zero-padded digits.
    pub fn encode(self) -> String {
        format!("{:0width$}", self.0, width = DESTINATION_WIDTH)
    }

    /// Parse an encoded destination field. The field must be exactly
    /// [`DESTINATION_WIDTH`] ASCII digits.
    pub fn parse(field: &str) -> Result<Self> {
        if field.len() != DESTINATION_WIDTH || !field.bytes().all(|b| b.is_ascii_digit()) {
            return Err(OnionError::Decode(format!(
                "destination field {field:?} is not {DESTINATION_WIDTH} digits"
            )));
        }
        field
            .parse::<u64>()
            .map(Self)
            .map_err(|e| OnionError::Decode(format!("destination field {field:?}: {e}")))
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One onion layer split into its fixed-width sub-fields.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Layer {
    key_block: String,
    payload: String,
}

impl Layer {
    /// Split a wire message at the key-block boundary.
    pub fn from_wire(wire: &str) -> Result<Self> {
        if wire.len() < KEY_BLOCK_LEN {
            return Err(OnionError::Decode(format!(
                "layer is {} bytes, shorter than the {KEY_BLOCK_LEN}-byte key block",
                wire.len()
            )));
        }
        if !wire.is_char_boundary(KEY_BLOCK_LEN) {
            return Err(OnionError::Decode(
                "key block boundary splits a character".to_string(),
            ));
        }
        let (key_block, payload) = wire.split_at(KEY_BLOCK_LEN);
        Ok(Self {
            key_block: key_block.to_string(),
            payload: payload.to_string(),
        })
    }

    /// The RSA-encrypted symmetric key.
    pub fn key_block(&self) -> &str {
        &self.key_block
    }

    /// The symmetrically encrypted `destination || inner` block.
    pub fn payload(&self) -> &str {
        &self.payload
    }

    /// Concatenate the sub-fields back into wire text.
    pub fn into_wire(self) -> String {
        let mut wire = self.key_block;
        wire.push_str(&self.payload);
        wire
    }
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key_block)?;
        f.write_str(&self.payload)
    }
}

/// Result of peeling one layer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Peeled {
    /// Where the residual goes next.
    pub destination: Destination,
    /// The next layer, or the plaintext at the last hop.
    pub residual: String,
}

/// Build one layer addressing `content` to `destination`, readable only by
/// the holder of `recipient`'s private key.
///
/// A fresh symmetric key is generated for the layer and dropped on return.
pub fn wrap(content: &str, destination: Destination, recipient: &RsaPublicKey) -> Result<Layer> {
    let mut block = String::with_capacity(DESTINATION_WIDTH + content.len());
    block.push_str(&destination.encode());
    block.push_str(content);

    let key = SymmetricKey::generate();
    let payload = chacha20::seal(&key, block.as_bytes())?;
    let key_block = rsa_oaep::encrypt(recipient, key.to_base64().as_bytes())?;

    if key_block.len() != KEY_BLOCK_LEN {
        return Err(shallot_crypto::CryptoError::InvalidKeyLength {
            expected: KEY_BLOCK_LEN,
            actual: key_block.len(),
        }
        .into());
    }

    Ok(Layer { key_block, payload })
}

/// Peel one layer with the relay's key pair.
pub fn peel(wire: &str, keys: &RsaKeyPair) -> Result<Peeled> {
    let layer = Layer::from_wire(wire)?;

    let key_text = rsa_oaep::decrypt(keys, layer.key_block())?;
    let key_text = std::str::from_utf8(&key_text).map_err(|_| {
        shallot_crypto::CryptoError::InvalidEncoding("symmetric key is not UTF-8".to_string())
    })?;
    let key = SymmetricKey::from_base64(key_text)?;

    let block = chacha20::open(&key, layer.payload())?;
    let block = String::from_utf8(block)
        .map_err(|_| OnionError::Decode("decrypted payload is not UTF-8".to_string()))?;

    let field = block.get(..DESTINATION_WIDTH).ok_or_else(|| {
        OnionError::Decode(format!(
            "decrypted payload is shorter than the {DESTINATION_WIDTH}-char destination"
        ))
    })?;
    let destination = Destination::parse(field)?;
    let residual = block[DESTINATION_WIDTH..].to_string();

    Ok(Peeled {
        destination,
        residual,
    })
}
