//! The registry actor: the node directory served over JSON-RPC.

use serde_json::{json, Value};
use shallot_onion::directory::MemoryDirectory;
use shallot_transport::{RpcError, RpcHandler};
use shallot_types::network::{NodeRegistry, RegisterNodeRequest};
use shallot_types::{LIVE, SUCCESS};
use tracing::info;

use crate::parse_params;

/// Registry service.
#[derive(Debug, Default)]
pub struct RegistryService {
    directory: MemoryDirectory,
}

impl RegistryService {
    pub fn new() -> Self {
        Self::default()
    }

    /// The backing store.
    pub fn directory(&self) -> &MemoryDirectory {
        &self.directory
    }
}

impl RpcHandler for RegistryService {
    async fn handle(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        match method {
            "status" => Ok(json!(LIVE)),
            "register_node" => {
                let record: RegisterNodeRequest = parse_params(params)?;
                info!(node_id = record.node_id, "Node registered");
                self.directory.upsert(record);
                Ok(json!(SUCCESS))
            }
            "get_node_registry" => Ok(json!(NodeRegistry {
                nodes: self.directory.all(),
            })),
            other => Err(RpcError::method_not_found(other)),
        }
    }
}
