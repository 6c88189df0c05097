//! Request bodies and observability snapshots exchanged between actors.

use serde::{Deserialize, Serialize};

use crate::{NodeId, UserId};

/// Body of a `message` call: one onion layer, or plaintext at the recipient.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliverRequest {
    pub message: String,
}

/// Body of a user's `send_message` call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendMessageRequest {
    pub message: String,
    #[serde(rename = "destinationUserId", alias = "destination_user_id")]
    pub destination_user_id: UserId,
}

/// What a relay saw on its most recent `message` call.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelaySnapshot {
    pub last_received_encrypted_message: Option<String>,
    pub last_received_decrypted_message: Option<String>,
    pub last_message_destination: Option<u64>,
}

/// What a user last sent, received and routed through.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSnapshot {
    pub last_received_message: Option<String>,
    pub last_sent_message: Option<String>,
    pub last_circuit: Option<Vec<NodeId>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_message_request_names() {
        let req: SendMessageRequest = serde_json::from_value(serde_json::json!({
            "message": "hello",
            "destinationUserId": 5,
        }))
        .expect("parse");
        assert_eq!(req.destination_user_id, 5);

        let req: SendMessageRequest = serde_json::from_value(serde_json::json!({
            "message": "hello",
            "destination_user_id": 7,
        }))
        .expect("parse alias");
        assert_eq!(req.destination_user_id, 7);
    }

    #[test]
    fn test_snapshot_defaults_are_empty() {
        let snapshot = RelaySnapshot::default();
        assert!(snapshot.last_received_encrypted_message.is_none());
        assert!(snapshot.last_message_destination.is_none());
        assert!(UserSnapshot::default().last_circuit.is_none());
    }
}
