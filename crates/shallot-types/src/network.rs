//! Directory records and the routing-address scheme.

use serde::{Deserialize, Serialize};

use crate::{NodeId, UserId, BASE_ONION_ROUTER_PORT, BASE_USER_PORT, REGISTRY_PORT};

/// A directory entry: a node and its base64 SPKI public key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRecord {
    #[serde(rename = "nodeId", alias = "node_id")]
    pub node_id: NodeId,
    #[serde(rename = "pubKey", alias = "pub_key")]
    pub pub_key: String,
}

/// Body of a `register_node` call.
pub type RegisterNodeRequest = NodeRecord;

/// Body returned by `get_node_registry`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRegistry {
    pub nodes: Vec<NodeRecord>,
}

/// Maps node and user identifiers to routing addresses (TCP ports).
///
/// A routing address is what gets written into the 10-digit destination
/// field of a layer, so every participant in a network must share the same
/// layout.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortLayout {
    pub registry_port: u16,
    pub base_onion_router_port: u16,
    pub base_user_port: u16,
}

impl PortLayout {
    /// Routing address of onion router `node_id`.
    pub fn router_port(&self, node_id: NodeId) -> u64 {
        u64::from(self.base_onion_router_port) + u64::from(node_id)
    }

    /// Routing address of user `user_id`.
    pub fn user_port(&self, user_id: UserId) -> u64 {
        u64::from(self.base_user_port) + u64::from(user_id)
    }
}

impl Default for PortLayout {
    fn default() -> Self {
        Self {
            registry_port: REGISTRY_PORT,
            base_onion_router_port: BASE_ONION_ROUTER_PORT,
            base_user_port: BASE_USER_PORT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_layout() {
        let layout = PortLayout::default();
        assert_eq!(layout.router_port(0), 4000);
        assert_eq!(layout.router_port(12), 4012);
        assert_eq!(layout.user_port(5), 3005);
        assert_eq!(layout.registry_port, 8080);
    }

    #[test]
    fn test_ports_do_not_overflow() {
        let layout = PortLayout {
            registry_port: 1,
            base_onion_router_port: u16::MAX,
            base_user_port: u16::MAX,
        };
        assert_eq!(layout.router_port(1), 65_536);
    }

    #[test]
    fn test_node_record_wire_names() {
        let record = NodeRecord {
            node_id: 3,
            pub_key: "AAAA".to_string(),
        };
        let json = serde_json::to_value(&record).expect("serialize");
        assert_eq!(json, serde_json::json!({"nodeId": 3, "pubKey": "AAAA"}));

        let parsed: NodeRecord =
            serde_json::from_value(serde_json::json!({"node_id": 3, "pub_key": "AAAA"}))
                .expect("alias");
        assert_eq!(parsed, record);
    }
}
