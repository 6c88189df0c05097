//! Integration test crate for the Shallot overlay.
//!
//! This crate has no library code; it only contains integration tests
//! that exercise end-to-end flows across multiple workspace crates.
//!
//! - `onion_round_trip` runs relays in-process over an in-memory transport.
//! - `full_loop` launches real actors on loopback TCP ports.
//!
//! Run all integration tests:
//! ```sh
//! cargo test -p shallot-integration-tests
//! ```
