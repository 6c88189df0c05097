//! Per-hop decrypt-and-forward.
//!
//! A relay holds one RSA key pair and applies the same transition to every
//! message it receives: peel exactly one layer, record what it saw, and hand
//! the residual to the address named in the layer. It has no notion of its
//! position in the circuit.
//!
//! Forwarding is fire-and-forget. The relay's own reply reflects only
//! whether peeling succeeded; the forward runs as a detached task and its
//! failures are logged, never retried.

use std::sync::RwLock;

use shallot_crypto::{RsaKeyPair, RsaPublicKey};
use shallot_types::messages::RelaySnapshot;
use shallot_types::NodeId;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::layer::{self, Peeled};
use crate::transport::Transport;
use crate::Result;

/// An onion router.
pub struct Relay {
    node_id: NodeId,
    keys: RsaKeyPair,
    observed: RwLock<RelaySnapshot>,
}

impl Relay {
    /// Create a relay around an existing key pair.
    pub fn new(node_id: NodeId, keys: RsaKeyPair) -> Self {
        Self {
            node_id,
            keys,
            observed: RwLock::new(RelaySnapshot::default()),
        }
    }

    /// Create a relay with a freshly generated key pair.
    pub fn generate(node_id: NodeId) -> Result<Self> {
        Ok(Self::new(node_id, RsaKeyPair::generate()?))
    }

    /// This relay's node id.
    pub fn node_id(&self) -> NodeId {
        self.node_id
    }

    /// The public key to publish to the directory.
    pub fn public_key(&self) -> &RsaPublicKey {
        self.keys.public_key()
    }

    /// Export the private key (base64 PKCS#8). Debug and test use only.
    pub fn export_private_key(&self) -> Result<String> {
        Ok(self.keys.export_private_key()?)
    }

    /// What this relay last received, decrypted and forwarded to.
    pub fn snapshot(&self) -> RelaySnapshot {
        self.observed
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Peel one layer of `message` and record the observation.
    ///
    /// On failure only the encrypted input is recorded; the last decrypted
    /// content and destination keep their previous values.
    pub fn receive(&self, message: &str) -> Result<Peeled> {
        let result = layer::peel(message, &self.keys);

        let mut observed = self.observed.write().unwrap_or_else(|e| e.into_inner());
        observed.last_received_encrypted_message = Some(message.to_string());
        match &result {
            Ok(peeled) => {
                observed.last_received_decrypted_message = Some(peeled.residual.clone());
                observed.last_message_destination = Some(peeled.destination.value());
                debug!(
                    node_id = self.node_id,
                    destination = %peeled.destination,
                    residual_len = peeled.residual.len(),
                    "Peeled layer"
                );
            }
            Err(e) => {
                warn!(node_id = self.node_id, error = %e, "Failed to peel layer");
            }
        }

        result
    }

    /// Peel `message` and forward the residual through `transport`.
    ///
    /// Returns once peeling is done. The forward runs on a spawned Tokio task
    /// whose handle is returned; dropping it detaches the forward. Must be
    /// called from within a Tokio runtime.
    pub fn handle_message<T>(&self, message: &str, transport: T) -> Result<JoinHandle<Result<()>>>
    where
        T: Transport + Send + Sync + 'static,
    {
        let Peeled {
            destination,
            residual,
        } = self.receive(message)?;

        let node_id = self.node_id;
        Ok(tokio::spawn(async move {
            let result = transport.deliver(destination, residual).await;
            if let Err(e) = &result {
                warn!(node_id, %destination, error = %e, "Forwarding failed");
            }
            result
        }))
    }
}

impl std::fmt::Debug for Relay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Relay")
            .field("node_id", &self.node_id)
            .finish_non_exhaustive()
    }
}
