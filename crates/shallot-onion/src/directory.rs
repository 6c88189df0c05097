//! The node directory seam.
//!
//! The directory maps node ids to base64 public keys. Relays register at
//! startup; originators fetch a full listing once per send and resolve every
//! hop against that one snapshot. The snapshot is not kept consistent with
//! the live directory, so a node that re-registers with a new key after the
//! snapshot was taken will fail to peel the layers built for it.

use std::collections::HashMap;
use std::future::Future;
use std::sync::RwLock;

use shallot_crypto::RsaPublicKey;
use shallot_types::network::NodeRecord;
use shallot_types::NodeId;
use tracing::debug;

use crate::{OnionError, Result};

/// Network operations against the node directory.
///
/// Implementors provide the actual I/O. This abstraction allows the
/// originator and relays to be tested without real networking.
pub trait Directory {
    /// Register `node_id` with `pub_key`, overwriting any previous key.
    fn register(
        &self,
        node_id: NodeId,
        pub_key: String,
    ) -> impl Future<Output = Result<()>> + Send;

    /// List every registered node.
    fn list_all(&self) -> impl Future<Output = Result<Vec<NodeRecord>>> + Send;
}

/// One consistent listing of the directory.
#[derive(Clone, Debug, Default)]
pub struct DirectorySnapshot {
    node_ids: Vec<NodeId>,
    keys: HashMap<NodeId, String>,
}

impl DirectorySnapshot {
    /// Index a listing. Later records for the same id win.
    pub fn new(records: Vec<NodeRecord>) -> Self {
        let mut node_ids = Vec::with_capacity(records.len());
        let mut keys = HashMap::with_capacity(records.len());
        for record in records {
            if keys.insert(record.node_id, record.pub_key).is_none() {
                node_ids.push(record.node_id);
            }
        }
        Self { node_ids, keys }
    }

    /// Node ids in listing order.
    pub fn node_ids(&self) -> &[NodeId] {
        &self.node_ids
    }

    /// Number of distinct nodes.
    pub fn len(&self) -> usize {
        self.node_ids.len()
    }

    /// Whether the snapshot is empty.
    pub fn is_empty(&self) -> bool {
        self.node_ids.is_empty()
    }

    /// Resolve and parse the public key of `node_id`.
    pub fn public_key(&self, node_id: NodeId) -> Result<RsaPublicKey> {
        let encoded = self
            .keys
            .get(&node_id)
            .ok_or(OnionError::UnknownNode(node_id))?;
        Ok(RsaPublicKey::from_base64(encoded)?)
    }
}

/// In-process directory store. Backs the registry service and tests.
#[derive(Debug, Default)]
pub struct MemoryDirectory {
    nodes: RwLock<Vec<NodeRecord>>,
}

impl MemoryDirectory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a node's record.
    pub fn upsert(&self, record: NodeRecord) {
        let mut nodes = self.nodes.write().unwrap_or_else(|e| e.into_inner());
        if let Some(existing) = nodes.iter_mut().find(|n| n.node_id == record.node_id) {
            debug!(node_id = record.node_id, "Replacing registered key");
            *existing = record;
        } else {
            debug!(node_id = record.node_id, "Registering node");
            nodes.push(record);
        }
    }

    /// All records in registration order.
    pub fn all(&self) -> Vec<NodeRecord> {
        self.nodes.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Number of registered nodes.
    pub fn len(&self) -> usize {
        self.nodes.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Whether no nodes are registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Directory for MemoryDirectory {
    async fn register(&self, node_id: NodeId, pub_key: String) -> Result<()> {
        self.upsert(NodeRecord { node_id, pub_key });
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<NodeRecord>> {
        Ok(self.all())
    }
}
