//! Queued, backpressure-aware delivery of protocol events to an injected sink.
//!
//! The transport is the single choke point between the bridging adapters and
//! the outside world: events are queued, normalized (composite chunk events
//! expanded), framed as SSE text or length-prefixed binary, and written by
//! exactly one drain loop per transport instance. A sink write failure is
//! treated as a silent disconnect: logged, never thrown.

mod frame;
mod queued;
mod signal;

pub use frame::FrameCodec;
pub use queued::{frame_stream, ChannelSink, QueuedTransport};
pub use signal::DisconnectSignal;

use async_trait::async_trait;
use bytes::Bytes;
use weft_protocol::Event;

/// Transport-level failure.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("closed")]
    Closed,
    #[error("io: {0}")]
    Io(String),
    #[error("codec: {0}")]
    Codec(String),
}

/// Byte-oriented write target injected into a transport.
///
/// Implementations perform the actual I/O (an HTTP response body channel, a
/// socket, a file). A failed write is interpreted by the caller as a
/// disconnected consumer.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn write(&self, frame: Bytes) -> Result<(), TransportError>;
}

/// Downstream delivery contract for protocol events.
///
/// `emit` enqueues; delivery order matches emission order for a single
/// transport instance regardless of producer burstiness.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Queue one event for delivery.
    async fn emit(&self, event: Event) -> Result<(), TransportError>;

    /// Mark the transport connected. Default: no-op.
    async fn connect(&self) -> Result<(), TransportError> {
        Ok(())
    }

    /// Mark the transport disconnected and fire the disconnect signal.
    /// Events accepted before the call are still attempted.
    async fn disconnect(&self) -> Result<(), TransportError> {
        Ok(())
    }

    /// Whether the consumer side is believed to be attached.
    fn is_connected(&self) -> bool {
        true
    }

    /// Cancellation token observable by the upstream engine, fired when the
    /// consumer detaches.
    fn disconnect_signal(&self) -> DisconnectSignal;
}
