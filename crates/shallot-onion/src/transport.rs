//! The message delivery seam.
//!
//! Delivery is assumed reliable and point-to-point. There is no retry,
//! backoff or timeout here; a transport that wants them implements them
//! itself.

use std::future::Future;

use crate::layer::Destination;
use crate::Result;

/// Delivers a wire message to a routing address.
pub trait Transport {
    /// Deliver `message` to `destination`, resolving once the receiver has
    /// acknowledged it. Failures are reported as [`crate::OnionError::Forwarding`].
    fn deliver(
        &self,
        destination: Destination,
        message: String,
    ) -> impl Future<Output = Result<()>> + Send;
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::OnionError;

    /// Records deliveries instead of sending them.
    #[derive(Clone, Default)]
    pub struct RecordingTransport {
        pub delivered: Arc<Mutex<Vec<(Destination, String)>>>,
        pub fail: bool,
    }

    impl RecordingTransport {
        pub fn failing() -> Self {
            Self {
                fail: true,
                ..Self::default()
            }
        }

        pub fn deliveries(&self) -> Vec<(Destination, String)> {
            self.delivered.lock().expect("lock").clone()
        }
    }

    impl Transport for RecordingTransport {
        async fn deliver(&self, destination: Destination, message: String) -> Result<()> {
            if self.fail {
                return Err(OnionError::Forwarding(format!("{destination} unreachable")));
            }
            self.delivered
                .lock()
                .expect("lock")
                .push((destination, message));
            Ok(())
        }
    }
}
