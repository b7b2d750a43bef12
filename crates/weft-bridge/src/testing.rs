//! In-memory transport double for adapter tests.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use weft_protocol::Event;
use weft_transport::{DisconnectSignal, Transport, TransportError};

/// Transport recording every emitted event, with a switchable failure mode.
///
/// Used by unit and integration tests to assert on emission order without a
/// drain task in the way.
#[derive(Default)]
pub struct RecordingTransport {
    events: Mutex<Vec<Event>>,
    failing: AtomicBool,
    signal: DisconnectSignal,
}

impl RecordingTransport {
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Snapshot of the events emitted so far.
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().expect("recording lock").clone()
    }

    /// Wire discriminators of the events emitted so far.
    pub fn kinds(&self) -> Vec<&'static str> {
        self.events().iter().map(Event::kind).collect()
    }

    /// Make every subsequent emit fail with [`TransportError::Closed`].
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::Release);
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn emit(&self, event: Event) -> Result<(), TransportError> {
        if self.failing.load(Ordering::Acquire) {
            return Err(TransportError::Closed);
        }
        self.events.lock().expect("recording lock").push(event);
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        self.signal.cancel();
        Ok(())
    }

    fn is_connected(&self) -> bool {
        !self.failing.load(Ordering::Acquire)
    }

    fn disconnect_signal(&self) -> DisconnectSignal {
        self.signal.clone()
    }
}
