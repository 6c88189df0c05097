//! Circuit selection.
//!
//! A circuit is an ordered list of distinct relays drawn uniformly at random
//! from the directory's current node set. Selection is a partial
//! Fisher-Yates shuffle: for each of the first `length` positions, swap in a
//! uniformly chosen element from the not-yet-placed tail. Every ordered
//! `length`-subset is equally likely and no ordering depends on node id
//! values. Circuits are never reused; each send selects a fresh one.

use std::collections::HashSet;
use std::fmt;

use rand::Rng;
use shallot_types::NodeId;
use tracing::debug;

use crate::{OnionError, Result};

/// An immutable, ordered path of distinct relays (entry first).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Circuit {
    hops: Vec<NodeId>,
}

impl Circuit {
    /// The hops in path order.
    pub fn hops(&self) -> &[NodeId] {
        &self.hops
    }

    /// The relay the wrapped message is dispatched to.
    pub fn entry(&self) -> Option<NodeId> {
        self.hops.first().copied()
    }

    /// Number of hops.
    pub fn len(&self) -> usize {
        self.hops.len()
    }

    /// Whether the circuit has no hops.
    pub fn is_empty(&self) -> bool {
        self.hops.is_empty()
    }

    /// Consume the circuit, returning the hop list.
    pub fn into_hops(self) -> Vec<NodeId> {
        self.hops
    }
}

impl fmt::Display for Circuit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hops: Vec<String> = self.hops.iter().map(ToString::to_string).collect();
        write!(f, "[{}]", hops.join(" -> "))
    }
}

/// Select `length` distinct nodes from `node_ids` using `rng`.
///
/// Duplicate ids in the input count once.
pub fn select_circuit<R: Rng + ?Sized>(
    node_ids: &[NodeId],
    length: usize,
    rng: &mut R,
) -> Result<Circuit> {
    let mut seen = HashSet::with_capacity(node_ids.len());
    let mut candidates: Vec<NodeId> = node_ids
        .iter()
        .copied()
        .filter(|id| seen.insert(*id))
        .collect();

    if candidates.len() < length {
        return Err(OnionError::InsufficientNodes {
            need: length,
            have: candidates.len(),
        });
    }

    for i in 0..length {
        let j = rng.gen_range(i..candidates.len());
        candidates.swap(i, j);
    }
    candidates.truncate(length);

    debug!(hops = length, candidates = seen.len(), "Selected circuit");

    Ok(Circuit { hops: candidates })
}

/// Select a circuit with the thread-local RNG.
pub fn select_random_circuit(node_ids: &[NodeId], length: usize) -> Result<Circuit> {
    select_circuit(node_ids, length, &mut rand::thread_rng())
}
