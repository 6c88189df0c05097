//! The user actor: originates messages and receives them at the last hop.

use serde_json::{json, Value};
use shallot_onion::layer::Destination;
use shallot_onion::originator::Originator;
use shallot_onion::recipient::Recipient;
use shallot_transport::{RegistryClient, RpcError, RpcHandler, TcpTransport};
use shallot_types::messages::{DeliverRequest, SendMessageRequest, UserSnapshot};
use shallot_types::network::PortLayout;
use shallot_types::{UserId, LIVE, SUCCESS};
use tracing::info;

use crate::parse_params;

/// User service.
#[derive(Debug)]
pub struct UserService {
    user_id: UserId,
    layout: PortLayout,
    originator: Originator,
    recipient: Recipient,
    registry: RegistryClient,
    transport: TcpTransport,
}

impl UserService {
    pub fn new(
        user_id: UserId,
        layout: PortLayout,
        registry: RegistryClient,
        transport: TcpTransport,
    ) -> Self {
        Self {
            user_id,
            layout,
            originator: Originator::new(layout),
            recipient: Recipient::new(),
            registry,
            transport,
        }
    }

    /// What this user last sent, received and routed through.
    pub fn snapshot(&self) -> UserSnapshot {
        let sent = self.originator.snapshot();
        UserSnapshot {
            last_received_message: self.recipient.last_received(),
            last_sent_message: sent.last_sent_message,
            last_circuit: sent.last_circuit,
        }
    }

    async fn send_message(&self, request: SendMessageRequest) -> Result<Value, RpcError> {
        let destination = Destination::new(self.layout.user_port(request.destination_user_id))?;
        let circuit = self
            .originator
            .send(&request.message, destination, &self.registry, &self.transport)
            .await?;
        info!(
            user_id = self.user_id,
            to = request.destination_user_id,
            %circuit,
            "Message sent"
        );
        Ok(json!(SUCCESS))
    }
}

impl RpcHandler for UserService {
    async fn handle(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        match method {
            "status" => Ok(json!(LIVE)),
            "message" => {
                let DeliverRequest { message } = parse_params(params)?;
                self.recipient.deliver(message);
                Ok(json!(SUCCESS))
            }
            "send_message" => self.send_message(parse_params(params)?).await,
            "get_last_received_message" => Ok(json!({
                "result": self.snapshot().last_received_message
            })),
            "get_last_sent_message" => Ok(json!({
                "result": self.snapshot().last_sent_message
            })),
            "get_last_circuit" => Ok(json!({
                "result": self.snapshot().last_circuit
            })),
            other => Err(RpcError::method_not_found(other)),
        }
    }
}
