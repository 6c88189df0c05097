//! JSON-RPC 2.0 envelopes and line framing.
//!
//! ## Error codes
//!
//! | Code | Name |
//! |---|---|
//! | -32700 | PARSE_ERROR |
//! | -32600 | INVALID_REQUEST |
//! | -32601 | METHOD_NOT_FOUND |
//! | -32602 | INVALID_PARAMS |
//! | -32603 | INTERNAL_ERROR |
//! | -32020 | DECODE_FAILED |
//! | -32021 | CRYPTO_FAILED |
//! | -32022 | UNKNOWN_NODE |
//! | -32023 | INSUFFICIENT_NODES |
//! | -32024 | FORWARDING_FAILED |
//! | -32025 | DIRECTORY_UNAVAILABLE |
//! | -32026 | INVALID_DESTINATION |

use serde::{Deserialize, Serialize};
use shallot_onion::OnionError;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::{Result, TransportError};

/// JSON-RPC protocol version string.
pub const JSONRPC_VERSION: &str = "2.0";

/// Longest accepted line, in bytes. Bounds memory per connection.
pub const MAX_LINE_LEN: usize = 4 * 1024 * 1024;

/// JSON-RPC request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcRequest {
    /// JSON-RPC version (must be "2.0").
    pub jsonrpc: String,
    /// Request ID.
    pub id: serde_json::Value,
    /// Method name.
    pub method: String,
    /// Parameters.
    #[serde(default)]
    pub params: serde_json::Value,
}

/// JSON-RPC response carrying either a result or an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcResponse {
    /// JSON-RPC version.
    pub jsonrpc: String,
    /// Request ID.
    pub id: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

/// JSON-RPC error object.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct RpcError {
    pub code: i32,
    /// Error name.
    pub message: String,
    /// Optional structured data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl RpcRequest {
    pub fn new(id: u64, method: &str, params: serde_json::Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: serde_json::json!(id),
            method: method.to_string(),
            params,
        }
    }
}

impl RpcResponse {
    /// Create a success response.
    pub fn success(id: serde_json::Value, result: serde_json::Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Create an error response.
    pub fn error(id: serde_json::Value, error: RpcError) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: None,
            error: Some(error),
        }
    }

    /// Convert into the call outcome.
    pub fn into_result(self) -> Result<serde_json::Value> {
        match self.error {
            Some(err) => Err(TransportError::Remote {
                code: err.code,
                message: match err.data.as_ref().and_then(|d| d.get("detail")) {
                    Some(detail) => format!("{}: {}", err.message, detail),
                    None => err.message,
                },
            }),
            None => Ok(self.result.unwrap_or(serde_json::Value::Null)),
        }
    }
}

impl RpcError {
    fn with_detail(code: i32, message: &str, detail: &str) -> Self {
        Self {
            code,
            message: message.to_string(),
            data: Some(serde_json::json!({"detail": detail})),
        }
    }

    /// Parse error (-32700).
    pub fn parse_error() -> Self {
        Self {
            code: -32700,
            message: "PARSE_ERROR".to_string(),
            data: None,
        }
    }

    /// Invalid request (-32600).
    pub fn invalid_request() -> Self {
        Self {
            code: -32600,
            message: "INVALID_REQUEST".to_string(),
            data: None,
        }
    }

    /// Method not found (-32601).
    pub fn method_not_found(method: &str) -> Self {
        Self {
            code: -32601,
            message: "METHOD_NOT_FOUND".to_string(),
            data: Some(serde_json::json!({"method": method})),
        }
    }

    /// Invalid params (-32602).
    pub fn invalid_params(detail: &str) -> Self {
        Self::with_detail(-32602, "INVALID_PARAMS", detail)
    }

    /// Internal error (-32603).
    pub fn internal_error(detail: &str) -> Self {
        Self::with_detail(-32603, "INTERNAL_ERROR", detail)
    }
}

impl From<&OnionError> for RpcError {
    fn from(err: &OnionError) -> Self {
        let detail = err.to_string();
        match err {
            OnionError::Decode(_) => Self::with_detail(-32020, "DECODE_FAILED", &detail),
            OnionError::Crypto(_) => Self::with_detail(-32021, "CRYPTO_FAILED", &detail),
            OnionError::UnknownNode(_) => Self::with_detail(-32022, "UNKNOWN_NODE", &detail),
            OnionError::InsufficientNodes { .. } => {
                Self::with_detail(-32023, "INSUFFICIENT_NODES", &detail)
            }
            OnionError::Forwarding(_) => Self::with_detail(-32024, "FORWARDING_FAILED", &detail),
            OnionError::Directory(_) => {
                Self::with_detail(-32025, "DIRECTORY_UNAVAILABLE", &detail)
            }
            OnionError::InvalidDestination(_) => {
                Self::with_detail(-32026, "INVALID_DESTINATION", &detail)
            }
        }
    }
}

impl From<OnionError> for RpcError {
    fn from(err: OnionError) -> Self {
        Self::from(&err)
    }
}

/// Serialize `value` and write it as one line.
pub async fn write_line<W, T>(writer: &mut W, value: &T) -> Result<()>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let mut json = serde_json::to_string(value)?;
    json.push('\n');
    writer.write_all(json.as_bytes()).await?;
    writer.flush().await?;
    Ok(())
}

/// Read one line. Returns `None` on a clean EOF before any bytes.
pub async fn read_line<R>(reader: &mut R) -> Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = String::new();
    let limit = u64::try_from(MAX_LINE_LEN + 1).unwrap_or(u64::MAX);
    let bytes_read = reader.take(limit).read_line(&mut line).await?;
    if bytes_read == 0 {
        return Ok(None);
    }
    if line.len() > MAX_LINE_LEN {
        return Err(TransportError::Protocol(format!(
            "line exceeds {MAX_LINE_LEN} bytes"
        )));
    }
    if !line.ends_with('\n') {
        return Err(TransportError::Protocol(
            "connection closed mid-line".to_string(),
        ));
    }
    Ok(Some(line))
}
