//! # shallot-types
//!
//! Shared domain types used across the Shallot workspace: node and user
//! identifiers, the routing-address scheme, directory records and the
//! request/response bodies exchanged between actors.

pub mod messages;
pub mod network;

/// Identifier of an onion router, unique per relay and stable for a session.
pub type NodeId = u32;

/// Identifier of a user (originator and final recipient).
pub type UserId = u32;

/// Default registry port.
pub const REGISTRY_PORT: u16 = 8080;

/// Default base port for onion routers (`router n` listens on base + n).
pub const BASE_ONION_ROUTER_PORT: u16 = 4000;

/// Default base port for users (`user u` listens on base + u).
pub const BASE_USER_PORT: u16 = 3000;

/// Reply body for successful one-way calls.
pub const SUCCESS: &str = "success";

/// Reply body for liveness probes.
pub const LIVE: &str = "live";
