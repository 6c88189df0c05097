//! Starting actors.
//!
//! Every launch function binds its port before returning, so a caller may
//! talk to the actor as soon as the handle is in hand.

use std::net::SocketAddr;
use std::sync::Arc;

use shallot_onion::directory::Directory;
use shallot_onion::relay::Relay;
use shallot_transport::{RegistryClient, RpcClient, RpcHandler, RpcServer, TcpTransport};
use shallot_types::{NodeId, UserId};
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::config::DaemonConfig;
use crate::registry::RegistryService;
use crate::router::RouterService;
use crate::user::UserService;

/// A running actor.
#[derive(Debug)]
pub struct ActorHandle {
    name: String,
    addr: SocketAddr,
    task: JoinHandle<()>,
}

impl ActorHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The address the actor is listening on.
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Stop accepting connections.
    pub fn shutdown(self) {
        info!(actor = %self.name, "Shutting down");
        self.task.abort();
    }
}

/// Every actor of a launched network.
#[derive(Debug)]
pub struct NetworkHandle {
    pub registry: ActorHandle,
    pub onion_routers: Vec<ActorHandle>,
    pub users: Vec<ActorHandle>,
}

impl NetworkHandle {
    /// Stop every actor.
    pub fn shutdown(self) {
        for actor in self.users.into_iter().chain(self.onion_routers) {
            actor.shutdown();
        }
        self.registry.shutdown();
    }
}

async fn serve<H: RpcHandler>(
    name: String,
    addr: SocketAddr,
    handler: Arc<H>,
) -> anyhow::Result<ActorHandle> {
    let server = RpcServer::bind(addr, handler).await?;
    let addr = server.local_addr()?;
    info!(actor = %name, %addr, "Actor listening");

    let task_name = name.clone();
    let task = tokio::spawn(async move {
        if let Err(e) = server.run().await {
            error!(actor = %task_name, "RPC server error: {}", e);
        }
    });

    Ok(ActorHandle { name, addr, task })
}

fn registry_client(config: &DaemonConfig) -> RegistryClient {
    RegistryClient::new(RpcClient::new(config.network.host), config.network.registry_port)
}

fn actor_addr(config: &DaemonConfig, port: u64) -> anyhow::Result<SocketAddr> {
    let port = u16::try_from(port).map_err(|_| anyhow::anyhow!("port {port} out of range"))?;
    Ok(SocketAddr::new(config.network.host, port))
}

/// Launch the registry.
pub async fn launch_registry(config: &DaemonConfig) -> anyhow::Result<ActorHandle> {
    let addr = actor_addr(config, u64::from(config.network.registry_port))?;
    serve("registry".to_string(), addr, Arc::new(RegistryService::new())).await
}

/// Launch onion router `node_id` and register it with the registry.
///
/// Registration failure is logged, not returned: the router keeps serving
/// but no originator will pick it.
pub async fn launch_onion_router(
    config: &DaemonConfig,
    node_id: NodeId,
) -> anyhow::Result<ActorHandle> {
    let addr = actor_addr(config, config.port_layout().router_port(node_id))?;

    // RSA key generation is CPU-bound.
    let relay = tokio::task::spawn_blocking(move || Relay::generate(node_id)).await??;
    let pub_key = relay.public_key().to_base64()?;

    let transport = TcpTransport::new(RpcClient::new(config.network.host));
    let handle = serve(
        format!("onion-router-{node_id}"),
        addr,
        Arc::new(RouterService::new(relay, transport)),
    )
    .await?;

    if let Err(e) = registry_client(config).register(node_id, pub_key).await {
        error!(node_id, "Failed to register with registry: {}", e);
    }

    Ok(handle)
}

/// Launch user `user_id`.
pub async fn launch_user(config: &DaemonConfig, user_id: UserId) -> anyhow::Result<ActorHandle> {
    let layout = config.port_layout();
    let addr = actor_addr(config, layout.user_port(user_id))?;
    let service = UserService::new(
        user_id,
        layout,
        registry_client(config),
        TcpTransport::new(RpcClient::new(config.network.host)),
    );
    serve(format!("user-{user_id}"), addr, Arc::new(service)).await
}

/// Launch the registry, then every onion router, then every user.
pub async fn launch_network(config: &DaemonConfig) -> anyhow::Result<NetworkHandle> {
    let registry = launch_registry(config).await?;

    let mut onion_routers = Vec::new();
    for node_id in 0..config.topology.onion_routers {
        onion_routers.push(launch_onion_router(config, node_id).await?);
    }

    let mut users = Vec::new();
    for user_id in 0..config.topology.users {
        users.push(launch_user(config, user_id).await?);
    }

    info!(
        onion_routers = onion_routers.len(),
        users = users.len(),
        "Network launched"
    );
    Ok(NetworkHandle {
        registry,
        onion_routers,
        users,
    })
}

#[cfg(test)]
mod tests {
    use shallot_types::network::NodeRegistry;

    use super::*;

    fn config(registry_port: u16, base: u16) -> DaemonConfig {
        let mut config = DaemonConfig::default();
        config.network.registry_port = registry_port;
        config.network.base_onion_router_port = base;
        config.network.base_user_port = base + 100;
        config
    }

    #[tokio::test]
    async fn test_router_registers_on_launch() {
        let config = config(38080, 34000);
        let registry = launch_registry(&config).await.expect("registry");
        let router = launch_onion_router(&config, 2).await.expect("router");
        assert_eq!(router.local_addr().port(), 34002);
        assert_eq!(router.name(), "onion-router-2");

        let listing: NodeRegistry = RpcClient::default()
            .call_as(38080, "get_node_registry", serde_json::Value::Null)
            .await
            .expect("list");
        assert_eq!(listing.nodes.len(), 1);
        assert_eq!(listing.nodes[0].node_id, 2);

        router.shutdown();
        registry.shutdown();
    }

    #[tokio::test]
    async fn test_router_survives_missing_registry() {
        let config = config(38180, 34100);
        let router = launch_onion_router(&config, 0).await.expect("router");

        let status = RpcClient::default()
            .call(34100, "status", serde_json::Value::Null)
            .await
            .expect("status");
        assert_eq!(status, serde_json::json!("live"));
        router.shutdown();
    }

    #[tokio::test]
    async fn test_port_conflict_is_error() {
        let config = config(38280, 34200);
        let first = launch_registry(&config).await.expect("registry");
        assert!(launch_registry(&config).await.is_err());
        first.shutdown();
    }
}
