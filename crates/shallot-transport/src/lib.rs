//! # shallot-transport
//!
//! Point-to-point transport between Shallot actors.
//!
//! Every actor (registry, onion router, user) is a JSON-RPC 2.0 service on
//! its own TCP port. Requests and responses are single JSON objects, one per
//! line.
//!
//! - [`rpc`] - Request/response/error envelopes and line framing
//! - [`server`] - Accept loop dispatching to an [`server::RpcHandler`]
//! - [`client`] - Outbound calls, plus the TCP-backed onion
//!   [`Transport`](shallot_onion::transport::Transport) and registry-backed
//!   [`Directory`](shallot_onion::directory::Directory)
//!
//! ## Architecture
//!
//! ```text
//! Originator / Relay
//!     |
//!     v
//! TcpTransport, RegistryClient (client.rs)
//!     |
//!     v
//! RpcRequest line ---- TCP ----> RpcServer (server.rs) -> RpcHandler
//! ```

pub mod client;
pub mod rpc;
pub mod server;

pub use client::{RegistryClient, RpcClient, TcpTransport};
pub use rpc::{RpcError, RpcRequest, RpcResponse};
pub use server::{RpcHandler, RpcServer};

/// Error types for transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// JSON serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The peer broke the line protocol (oversized line, early EOF, bad envelope).
    #[error("protocol violation: {0}")]
    Protocol(String),

    /// The peer answered with a JSON-RPC error.
    #[error("remote error {code}: {message}")]
    Remote { code: i32, message: String },

    /// I/O error (connect, read, write).
    #[error("I/O error: {0}")]
    Io(String),
}

/// Result type alias for transport operations.
pub type Result<T> = std::result::Result<T, TransportError>;

impl From<std::io::Error> for TransportError {
    fn from(e: std::io::Error) -> Self {
        TransportError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for TransportError {
    fn from(e: serde_json::Error) -> Self {
        TransportError::Serialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TransportError::Serialization("test".to_string());
        assert_eq!(err.to_string(), "serialization error: test");

        let err = TransportError::Remote {
            code: -32021,
            message: "CRYPTO_FAILED".to_string(),
        };
        assert_eq!(err.to_string(), "remote error -32021: CRYPTO_FAILED");
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        assert!(matches!(TransportError::from(io), TransportError::Io(_)));
    }
}
