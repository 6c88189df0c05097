//! Final-hop inbox.
//!
//! The recipient sits behind the last relay. What it receives is already
//! plaintext, so it stores it as-is and never peels.

use std::sync::RwLock;

use tracing::info;

/// A user's inbox for delivered plaintext.
#[derive(Debug, Default)]
pub struct Recipient {
    last_received: RwLock<Option<String>>,
}

impl Recipient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept a delivered message.
    pub fn deliver(&self, message: String) {
        info!(len = message.len(), "Message received");
        *self.last_received.write().unwrap_or_else(|e| e.into_inner()) = Some(message);
    }

    /// The most recently delivered message.
    pub fn last_received(&self) -> Option<String> {
        self.last_received
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}
