//! The onion router actor.
//!
//! Wraps a [`Relay`] and forwards over TCP. A `message` call is answered as
//! soon as the layer is peeled; the forward to the next hop is detached.

use serde_json::{json, Value};
use shallot_onion::relay::Relay;
use shallot_transport::{RpcError, RpcHandler, TcpTransport};
use shallot_types::messages::DeliverRequest;
use shallot_types::{LIVE, SUCCESS};

use crate::parse_params;

/// Onion router service.
#[derive(Debug)]
pub struct RouterService {
    relay: Relay,
    transport: TcpTransport,
}

impl RouterService {
    pub fn new(relay: Relay, transport: TcpTransport) -> Self {
        Self { relay, transport }
    }

    pub fn relay(&self) -> &Relay {
        &self.relay
    }
}

impl RpcHandler for RouterService {
    async fn handle(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        match method {
            "status" => Ok(json!(LIVE)),
            "message" => {
                let DeliverRequest { message } = parse_params(params)?;
                // The forward task is detached; its failure is logged by the relay.
                let _forward = self.relay.handle_message(&message, self.transport.clone())?;
                Ok(json!(SUCCESS))
            }
            "get_private_key" => {
                let key = self
                    .relay
                    .export_private_key()
                    .map_err(|e| RpcError::internal_error(&e.to_string()))?;
                Ok(json!({ "result": key }))
            }
            "get_last_received_encrypted_message" => Ok(json!({
                "result": self.relay.snapshot().last_received_encrypted_message
            })),
            "get_last_received_decrypted_message" => Ok(json!({
                "result": self.relay.snapshot().last_received_decrypted_message
            })),
            "get_last_message_destination" => Ok(json!({
                "result": self.relay.snapshot().last_message_destination
            })),
            other => Err(RpcError::method_not_found(other)),
        }
    }
}
