//! # shallot-onion
//!
//! Onion construction, peeling and circuit selection for the Shallot overlay.
//!
//! A sender wraps a message once per hop of a randomly chosen 3-node circuit,
//! innermost layer first. Each relay peels exactly one layer, learns only the
//! next routing address, and forwards the residual.
//!
//! - [`layer`] - The layered wire format: `wrap` and `peel`
//! - [`circuit`] - Uniform random circuit selection
//! - [`relay`] - Per-hop decrypt-and-forward
//! - [`originator`] - Circuit selection, wrapping loop and dispatch
//! - [`recipient`] - Final-hop inbox
//! - [`directory`] - Node directory seam and the in-memory store
//! - [`transport`] - Message delivery seam
//!
//! ## Wire Parameters
//!
//! | Parameter | Value |
//! |---|---|
//! | Key block | 344 base64 chars (RSA-2048 OAEP/SHA-256) |
//! | Destination field | 10 decimal digits, zero-padded |
//! | Circuit hops | 3 |

pub mod circuit;
pub mod directory;
pub mod layer;
pub mod originator;
pub mod recipient;
pub mod relay;
pub mod transport;

use shallot_types::NodeId;

pub use shallot_crypto::KEY_BLOCK_LEN;

/// Width of the zero-padded destination field at the head of every payload.
pub const DESTINATION_WIDTH: usize = 10;

/// Largest routing address that fits the destination field.
pub const MAX_DESTINATION: u64 = 9_999_999_999;

/// Number of hops in a circuit.
pub const CIRCUIT_HOPS: usize = 3;

/// Error types for onion routing operations.
#[derive(Debug, thiserror::Error)]
pub enum OnionError {
    /// The layer is malformed: too short, badly split, or its destination
    /// field is not a 10-digit integer.
    #[error("decode error: {0}")]
    Decode(String),

    /// Encryption or decryption failed (wrong key or corrupted ciphertext).
    #[error("crypto failure: {0}")]
    Crypto(#[from] shallot_crypto::CryptoError),

    /// A circuit hop has no entry in the directory snapshot.
    #[error("unknown node: {0}")]
    UnknownNode(NodeId),

    /// Not enough distinct nodes to build a circuit.
    #[error("insufficient nodes: need {need}, have {have}")]
    InsufficientNodes { need: usize, have: usize },

    /// The next hop was unreachable or rejected the message.
    #[error("forwarding failed: {0}")]
    Forwarding(String),

    /// A routing address does not fit the destination field.
    #[error("destination {0} exceeds {DESTINATION_WIDTH} digits")]
    InvalidDestination(u64),

    /// The directory could not be reached or returned a malformed listing.
    #[error("directory unavailable: {0}")]
    Directory(String),
}

/// Convenience result type for onion routing operations.
pub type Result<T> = std::result::Result<T, OnionError>;
