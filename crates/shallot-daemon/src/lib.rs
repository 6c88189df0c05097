//! # shallot-daemon
//!
//! The three Shallot actors as JSON-RPC services, and the glue that launches
//! a whole network of them on one host.
//!
//! - [`registry`] - Node directory
//! - [`router`] - Onion router (one relay per process port)
//! - [`user`] - Originator and final recipient
//! - [`launch`] - Bind and spawn actors
//! - [`config`] - TOML configuration

pub mod config;
pub mod launch;
pub mod registry;
pub mod router;
pub mod user;

pub use config::DaemonConfig;
pub use launch::{
    launch_network, launch_onion_router, launch_registry, launch_user, ActorHandle, NetworkHandle,
};

use serde::de::DeserializeOwned;
use shallot_transport::RpcError;

/// Decode request params, mapping failures to `INVALID_PARAMS`.
pub(crate) fn parse_params<T: DeserializeOwned>(params: serde_json::Value) -> Result<T, RpcError> {
    serde_json::from_value(params).map_err(|e| RpcError::invalid_params(&e.to_string()))
}
