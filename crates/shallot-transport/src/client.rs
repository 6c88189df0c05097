//! Outbound calls.
//!
//! Every call opens a fresh connection, writes one request line, reads one
//! response line and closes. There are no timeouts or retries.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use shallot_onion::directory::Directory;
use shallot_onion::layer::Destination;
use shallot_onion::transport::Transport;
use shallot_onion::OnionError;
use shallot_types::messages::DeliverRequest;
use shallot_types::network::{NodeRecord, NodeRegistry, RegisterNodeRequest};
use shallot_types::NodeId;
use tokio::io::BufReader;
use tokio::net::TcpStream;
use tracing::debug;

use crate::rpc::{read_line, write_line, RpcRequest, RpcResponse};
use crate::{Result, TransportError};

/// JSON-RPC client addressing actors by port on one host.
#[derive(Clone, Debug)]
pub struct RpcClient {
    host: IpAddr,
    next_id: Arc<AtomicU64>,
}

impl Default for RpcClient {
    fn default() -> Self {
        Self::new(IpAddr::V4(Ipv4Addr::LOCALHOST))
    }
}

impl RpcClient {
    pub fn new(host: IpAddr) -> Self {
        Self {
            host,
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Call `method` on the actor listening on `port`.
    pub async fn call(
        &self,
        port: u16,
        method: &str,
        params: serde_json::Value,
    ) -> Result<serde_json::Value> {
        let addr = SocketAddr::new(self.host, port);
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        debug!(%addr, method, id, "RPC call");

        let stream = TcpStream::connect(addr).await?;
        let (reader, mut writer) = stream.into_split();
        write_line(&mut writer, &RpcRequest::new(id, method, params)).await?;

        let mut reader = BufReader::new(reader);
        let line = read_line(&mut reader)
            .await?
            .ok_or_else(|| TransportError::Protocol("connection closed before response".into()))?;
        let response: RpcResponse = serde_json::from_str(&line)?;
        response.into_result()
    }

    /// Call `method` and decode the result into `T`.
    pub async fn call_as<T: DeserializeOwned>(
        &self,
        port: u16,
        method: &str,
        params: serde_json::Value,
    ) -> Result<T> {
        let value = self.call(port, method, params).await?;
        Ok(serde_json::from_value(value)?)
    }
}

/// Delivers onion layers by calling `message` on the destination port.
#[derive(Clone, Debug, Default)]
pub struct TcpTransport {
    client: RpcClient,
}

impl TcpTransport {
    pub fn new(client: RpcClient) -> Self {
        Self { client }
    }
}

impl Transport for TcpTransport {
    async fn deliver(
        &self,
        destination: Destination,
        message: String,
    ) -> shallot_onion::Result<()> {
        let port = destination.to_port().ok_or_else(|| {
            OnionError::Forwarding(format!("{destination} is not a routable port"))
        })?;
        let params = serde_json::to_value(DeliverRequest { message })
            .map_err(|e| OnionError::Forwarding(e.to_string()))?;

        self.client
            .call(port, "message", params)
            .await
            .map_err(|e| OnionError::Forwarding(format!("{destination}: {e}")))?;
        Ok(())
    }
}

/// The registry actor, seen through the [`Directory`] seam.
#[derive(Clone, Debug)]
pub struct RegistryClient {
    client: RpcClient,
    port: u16,
}

impl RegistryClient {
    pub fn new(client: RpcClient, port: u16) -> Self {
        Self { client, port }
    }

    fn directory_error(e: TransportError) -> OnionError {
        OnionError::Directory(e.to_string())
    }
}

impl Directory for RegistryClient {
    async fn register(&self, node_id: NodeId, pub_key: String) -> shallot_onion::Result<()> {
        let params = serde_json::to_value(RegisterNodeRequest { node_id, pub_key })
            .map_err(|e| OnionError::Directory(e.to_string()))?;
        self.client
            .call(self.port, "register_node", params)
            .await
            .map_err(Self::directory_error)?;
        Ok(())
    }

    async fn list_all(&self) -> shallot_onion::Result<Vec<NodeRecord>> {
        let registry: NodeRegistry = self
            .client
            .call_as(self.port, "get_node_registry", serde_json::Value::Null)
            .await
            .map_err(Self::directory_error)?;
        Ok(registry.nodes)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use shallot_onion::directory::MemoryDirectory;

    use super::*;
    use crate::rpc::RpcError;
    use crate::server::{RpcHandler, RpcServer};

    /// Stands in for a router and a registry on one port.
    #[derive(Default)]
    struct Fake {
        messages: Mutex<Vec<String>>,
        directory: MemoryDirectory,
    }

    impl RpcHandler for Fake {
        async fn handle(
            &self,
            method: &str,
            params: serde_json::Value,
        ) -> std::result::Result<serde_json::Value, RpcError> {
            match method {
                "message" => {
                    let req: DeliverRequest = serde_json::from_value(params)
                        .map_err(|e| RpcError::invalid_params(&e.to_string()))?;
                    if req.message == "reject" {
                        return Err(RpcError::from(OnionError::Decode("bad layer".into())));
                    }
                    self.messages.lock().expect("lock").push(req.message);
                    Ok(serde_json::json!("success"))
                }
                "register_node" => {
                    let record: NodeRecord = serde_json::from_value(params)
                        .map_err(|e| RpcError::invalid_params(&e.to_string()))?;
                    self.directory.upsert(record);
                    Ok(serde_json::json!("success"))
                }
                "get_node_registry" => Ok(serde_json::json!(NodeRegistry {
                    nodes: self.directory.all(),
                })),
                other => Err(RpcError::method_not_found(other)),
            }
        }
    }

    async fn start() -> (u16, Arc<Fake>) {
        let fake = Arc::new(Fake::default());
        let addr: SocketAddr = "127.0.0.1:0".parse().expect("addr");
        let server = RpcServer::bind(addr, fake.clone()).await.expect("bind");
        let port = server.local_addr().expect("addr").port();
        tokio::spawn(server.run());
        (port, fake)
    }

    fn dest(port: u16) -> Destination {
        Destination::new(u64::from(port)).expect("destination")
    }

    #[tokio::test]
    async fn test_transport_delivers() {
        let (port, fake) = start().await;
        let transport = TcpTransport::default();

        transport
            .deliver(dest(port), "layer".to_string())
            .await
            .expect("deliver");
        assert_eq!(*fake.messages.lock().expect("lock"), vec!["layer".to_string()]);
    }

    #[tokio::test]
    async fn test_remote_rejection_is_forwarding_error() {
        let (port, _fake) = start().await;
        let result = TcpTransport::default()
            .deliver(dest(port), "reject".to_string())
            .await;
        let err = result.expect_err("rejected");
        assert!(
            matches!(&err, OnionError::Forwarding(msg) if msg.contains("-32020")),
            "{err}"
        );
    }

    #[tokio::test]
    async fn test_unroutable_destination() {
        let destination = Destination::new(70_000).expect("destination");
        let result = TcpTransport::default()
            .deliver(destination, "x".to_string())
            .await;
        assert!(matches!(result, Err(OnionError::Forwarding(_))));
    }

    #[tokio::test]
    async fn test_connection_refused() {
        // Bind then drop to get a port with no listener.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
        let port = listener.local_addr().expect("addr").port();
        drop(listener);

        let result = TcpTransport::default()
            .deliver(dest(port), "x".to_string())
            .await;
        assert!(matches!(result, Err(OnionError::Forwarding(_))));

        let registry = RegistryClient::new(RpcClient::default(), port);
        assert!(matches!(
            registry.list_all().await,
            Err(OnionError::Directory(_))
        ));
    }

    #[tokio::test]
    async fn test_registry_client() {
        let (port, _fake) = start().await;
        let registry = RegistryClient::new(RpcClient::default(), port);

        registry.register(4, "k4".to_string()).await.expect("register");
        registry.register(2, "k2".to_string()).await.expect("register");
        registry.register(4, "k4b".to_string()).await.expect("re-register");

        let nodes = registry.list_all().await.expect("list");
        assert_eq!(
            nodes,
            vec![
                NodeRecord {
                    node_id: 4,
                    pub_key: "k4b".to_string()
                },
                NodeRecord {
                    node_id: 2,
                    pub_key: "k2".to_string()
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_call_as_decodes_result() {
        let (port, _fake) = start().await;
        let client = RpcClient::default();
        let registry: NodeRegistry = client
            .call_as(port, "get_node_registry", serde_json::Value::Null)
            .await
            .expect("call");
        assert!(registry.nodes.is_empty());
    }
}
