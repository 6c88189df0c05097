//! Message origination: circuit selection, wrapping and dispatch.
//!
//! ## Send state machine
//!
//! ```text
//! SelectingCircuit -> WrappingLayers(N-1) -> ... -> WrappingLayers(0) -> Dispatching -> Done
//!        \__________________________\_______________________________________\-------> Failed
//! ```
//!
//! The plaintext is wrapped innermost first. The layer for the last hop is
//! addressed to the final destination; every earlier layer is addressed to
//! the routing address of the hop after it. The outermost layer goes to the
//! entry relay. No partial state survives a failed send.

use std::sync::RwLock;

use shallot_types::network::PortLayout;
use shallot_types::NodeId;
use tracing::{debug, info, warn};

use crate::circuit::{select_random_circuit, Circuit};
use crate::directory::{Directory, DirectorySnapshot};
use crate::layer::{wrap, Destination};
use crate::transport::Transport;
use crate::{OnionError, Result, CIRCUIT_HOPS};

/// Where the most recent send is (or ended) in the state machine.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SendState {
    /// No send attempted yet.
    #[default]
    Idle,
    /// Fetching the directory and choosing hops.
    SelectingCircuit,
    /// Building the layer for hop index `hop`.
    WrappingLayers { hop: usize },
    /// Handing the outermost layer to the entry relay.
    Dispatching,
    /// The entry relay acknowledged the message.
    Done,
    /// The send was aborted.
    Failed,
}

/// What an originator last did.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OriginatorSnapshot {
    pub last_sent_message: Option<String>,
    pub last_circuit: Option<Vec<NodeId>>,
    pub last_dispatched_message: Option<String>,
    pub state: SendState,
}

/// Builds onions and dispatches them to entry relays.
#[derive(Debug)]
pub struct Originator {
    layout: PortLayout,
    observed: RwLock<OriginatorSnapshot>,
}

impl Originator {
    /// Create an originator that addresses relays using `layout`.
    pub fn new(layout: PortLayout) -> Self {
        Self {
            layout,
            observed: RwLock::new(OriginatorSnapshot::default()),
        }
    }

    /// What this originator last sent and through which circuit.
    pub fn snapshot(&self) -> OriginatorSnapshot {
        self.observed
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Send `plaintext` to `final_destination` through a fresh random circuit.
    ///
    /// Resolves once the entry relay has acknowledged the outermost layer.
    pub async fn send<D, T>(
        &self,
        plaintext: &str,
        final_destination: Destination,
        directory: &D,
        transport: &T,
    ) -> Result<Circuit>
    where
        D: Directory + Sync,
        T: Transport + Sync,
    {
        self.record(|o| {
            o.last_sent_message = Some(plaintext.to_string());
            o.state = SendState::SelectingCircuit;
        });

        let result = self
            .try_send(plaintext, final_destination, directory, transport)
            .await;

        match &result {
            Ok(circuit) => {
                self.record(|o| o.state = SendState::Done);
                info!(%circuit, %final_destination, "Message dispatched");
            }
            Err(e) => {
                self.record(|o| o.state = SendState::Failed);
                warn!(%final_destination, error = %e, "Send failed");
            }
        }

        result
    }

    async fn try_send<D, T>(
        &self,
        plaintext: &str,
        final_destination: Destination,
        directory: &D,
        transport: &T,
    ) -> Result<Circuit>
    where
        D: Directory + Sync,
        T: Transport + Sync,
    {
        let snapshot = DirectorySnapshot::new(directory.list_all().await?);
        let circuit = select_random_circuit(snapshot.node_ids(), CIRCUIT_HOPS)?;
        self.record(|o| o.last_circuit = Some(circuit.hops().to_vec()));

        let message = self.build_onion(plaintext, final_destination, &circuit, &snapshot)?;

        let entry = circuit.entry().ok_or(OnionError::InsufficientNodes {
            need: CIRCUIT_HOPS,
            have: 0,
        })?;
        let entry_destination = self.router_destination(entry)?;
        self.record(|o| {
            o.last_dispatched_message = Some(message.clone());
            o.state = SendState::Dispatching;
        });

        transport.deliver(entry_destination, message).await?;
        Ok(circuit)
    }

    /// Wrap `plaintext` once per hop of `circuit`, innermost first, resolving
    /// hop keys from `snapshot`. Returns the layer for the entry relay.
    pub fn build_onion(
        &self,
        plaintext: &str,
        final_destination: Destination,
        circuit: &Circuit,
        snapshot: &DirectorySnapshot,
    ) -> Result<String> {
        let mut content = plaintext.to_string();
        let mut destination = final_destination;

        for (hop, &node_id) in circuit.hops().iter().enumerate().rev() {
            self.record(|o| o.state = SendState::WrappingLayers { hop });

            let pub_key = snapshot.public_key(node_id)?;
            content = wrap(&content, destination, &pub_key)?.into_wire();
            debug!(hop, node_id, next = %destination, len = content.len(), "Wrapped layer");

            destination = self.router_destination(node_id)?;
        }

        Ok(content)
    }

    fn router_destination(&self, node_id: NodeId) -> Result<Destination> {
        Destination::new(self.layout.router_port(node_id))
    }

    fn record(&self, update: impl FnOnce(&mut OriginatorSnapshot)) {
        let mut observed = self.observed.write().unwrap_or_else(|e| e.into_inner());
        update(&mut observed);
    }
}
