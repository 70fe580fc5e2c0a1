//! Shutdown fan-out.
//!
//! One `Shutdown` is created in `main`; the signal listener triggers it and
//! the HTTP server holds a receiver for its graceful drain.

use tokio::sync::broadcast;

/// Broadcasts a single stop request to every subscriber.
#[derive(Debug, Clone)]
pub struct Shutdown {
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    /// A receiver that yields once `trigger` is called. Subscribe before
    /// triggering; late receivers do not see earlier stop requests.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    pub fn trigger(&self) {
        if self.tx.send(()).is_err() {
            tracing::debug!("Shutdown triggered with nothing listening");
        }
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}
