//! JSON-RPC server over TCP.
//!
//! Listens on a TCP port, accepts connections, and dispatches each request
//! line to an [`RpcHandler`]. Connections are served concurrently; a
//! connection may carry any number of requests.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::BufReader;
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info, warn};

use crate::rpc::{read_line, write_line, RpcError, RpcRequest, RpcResponse, JSONRPC_VERSION};
use crate::Result;

/// Answers JSON-RPC method calls for one actor.
pub trait RpcHandler: Send + Sync + 'static {
    /// Handle `method` with `params`.
    fn handle(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> impl Future<Output = std::result::Result<serde_json::Value, RpcError>> + Send;
}

/// A bound RPC server.
pub struct RpcServer<H> {
    listener: TcpListener,
    handler: Arc<H>,
}

impl<H: RpcHandler> RpcServer<H> {
    /// Bind `addr`. The port is held from this point on, so callers can
    /// rely on the server being reachable once `bind` returns.
    pub async fn bind(addr: SocketAddr, handler: Arc<H>) -> Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self { listener, handler })
    }

    /// The address actually bound.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Run the server, accepting connections until the task is dropped.
    pub async fn run(self) -> Result<()> {
        info!("RPC server listening on {}", self.local_addr()?);

        loop {
            match self.listener.accept().await {
                Ok((stream, peer)) => {
                    let handler = self.handler.clone();
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(handler, stream).await {
                            warn!(%peer, "Connection error: {}", e);
                        }
                    });
                }
                Err(e) => {
                    error!("Accept error: {}", e);
                }
            }
        }
    }
}

/// Handle a single client connection.
async fn handle_connection<H: RpcHandler>(handler: Arc<H>, stream: TcpStream) -> Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);

    while let Some(line) = read_line(&mut reader).await? {
        let response = match serde_json::from_str::<RpcRequest>(&line) {
            Ok(request) => dispatch_request(handler.as_ref(), request).await,
            Err(_) => RpcResponse::error(serde_json::Value::Null, RpcError::parse_error()),
        };
        write_line(&mut writer, &response).await?;
    }

    Ok(())
}

async fn dispatch_request<H: RpcHandler>(handler: &H, request: RpcRequest) -> RpcResponse {
    let id = request.id.clone();
    if request.jsonrpc != JSONRPC_VERSION {
        return RpcResponse::error(id, RpcError::invalid_request());
    }

    debug!("Dispatching RPC method: {}", request.method);

    match handler.handle(&request.method, request.params).await {
        Ok(value) => RpcResponse::success(id, value),
        Err(e) => RpcResponse::error(id, e),
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::{AsyncWriteExt, BufReader};

    use super::*;

    struct Echo;

    impl RpcHandler for Echo {
        async fn handle(
            &self,
            method: &str,
            params: serde_json::Value,
        ) -> std::result::Result<serde_json::Value, RpcError> {
            match method {
                "echo" => Ok(params),
                "status" => Ok(serde_json::json!("live")),
                other => Err(RpcError::method_not_found(other)),
            }
        }
    }

    async fn start() -> SocketAddr {
        let addr: SocketAddr = "127.0.0.1:0".parse().expect("addr");
        let server = RpcServer::bind(addr, Arc::new(Echo)).await.expect("bind");
        let addr = server.local_addr().expect("local addr");
        tokio::spawn(server.run());
        addr
    }

    async fn exchange(addr: SocketAddr, raw: &str) -> RpcResponse {
        let stream = TcpStream::connect(addr).await.expect("connect");
        let (reader, mut writer) = stream.into_split();
        writer.write_all(raw.as_bytes()).await.expect("write");
        let mut reader = BufReader::new(reader);
        let line = read_line(&mut reader).await.expect("read").expect("line");
        serde_json::from_str(&line).expect("response")
    }

    #[tokio::test]
    async fn test_dispatches_to_handler() {
        let addr = start().await;
        let resp = exchange(
            addr,
            "{\"jsonrpc\":\"2.0\",\"id\":3,\"method\":\"echo\",\"params\":{\"a\":1}}\n",
        )
        .await;
        assert_eq!(resp.id, serde_json::json!(3));
        assert_eq!(resp.result, Some(serde_json::json!({"a": 1})));
    }

    #[tokio::test]
    async fn test_unknown_method() {
        let addr = start().await;
        let resp = exchange(addr, "{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"nope\"}\n").await;
        assert_eq!(resp.error.map(|e| e.code), Some(-32601));
    }

    #[tokio::test]
    async fn test_parse_error() {
        let addr = start().await;
        let resp = exchange(addr, "not json\n").await;
        assert_eq!(resp.id, serde_json::Value::Null);
        assert_eq!(resp.error.map(|e| e.code), Some(-32700));
    }

    #[tokio::test]
    async fn test_wrong_version_rejected() {
        let addr = start().await;
        let resp = exchange(addr, "{\"jsonrpc\":\"1.0\",\"id\":1,\"method\":\"status\"}\n").await;
        assert_eq!(resp.error.map(|e| e.code), Some(-32600));
    }
}
