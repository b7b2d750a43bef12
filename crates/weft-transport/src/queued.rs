use crate::{DisconnectSignal, EventSink, FrameCodec, Transport, TransportError};
use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::warn;
use weft_protocol::{expand, Event};

/// Queue depth before `emit` exerts backpressure on producers.
const QUEUE_DEPTH: usize = 64;

/// Queued transport draining to an injected [`EventSink`].
///
/// One drain task per instance consumes the queue in emission order,
/// expands composite chunk events, frames each canonical event with the
/// configured codec, and writes it to the sink. The first failed write ends
/// the drain: the consumer is assumed gone, the disconnect signal fires, and
/// later emits are refused with [`TransportError::Closed`]. Nothing in this
/// path panics or propagates an error to the producer.
pub struct QueuedTransport {
    queue_tx: mpsc::Sender<Event>,
    connected: Arc<AtomicBool>,
    signal: DisconnectSignal,
}

impl QueuedTransport {
    pub fn new(sink: Arc<dyn EventSink>, codec: FrameCodec) -> Self {
        let (queue_tx, queue_rx) = mpsc::channel::<Event>(QUEUE_DEPTH);
        let connected = Arc::new(AtomicBool::new(true));
        let signal = DisconnectSignal::new();

        tokio::spawn(drain(
            queue_rx,
            sink,
            codec,
            connected.clone(),
            signal.clone(),
        ));

        Self {
            queue_tx,
            connected,
            signal,
        }
    }

    /// Convenience constructor with SSE framing.
    pub fn sse(sink: Arc<dyn EventSink>) -> Self {
        Self::new(sink, FrameCodec::Sse)
    }

    /// Convenience constructor with binary framing.
    pub fn binary(sink: Arc<dyn EventSink>) -> Self {
        Self::new(sink, FrameCodec::Binary)
    }
}

/// The single drain loop for one transport instance.
///
/// Runs until the queue closes or a sink write fails. A codec failure skips
/// the offending event; a write failure ends the loop entirely.
async fn drain(
    mut queue_rx: mpsc::Receiver<Event>,
    sink: Arc<dyn EventSink>,
    codec: FrameCodec,
    connected: Arc<AtomicBool>,
    signal: DisconnectSignal,
) {
    while let Some(event) = queue_rx.recv().await {
        for event in expand(event) {
            let frame = match codec.encode(&event) {
                Ok(frame) => frame,
                Err(err) => {
                    warn!(error = %err, kind = event.kind(), "failed to encode protocol event, skipping");
                    continue;
                }
            };
            if let Err(err) = sink.write(frame).await {
                warn!(error = %err, "sink write failed, assuming disconnect");
                connected.store(false, Ordering::Release);
                signal.cancel();
                return;
            }
        }
    }
}

#[async_trait]
impl Transport for QueuedTransport {
    async fn emit(&self, event: Event) -> Result<(), TransportError> {
        if !self.is_connected() {
            return Err(TransportError::Closed);
        }
        // Bounded send: a full queue suspends the producer instead of
        // dropping or reordering events.
        self.queue_tx
            .send(event)
            .await
            .map_err(|_| TransportError::Closed)
    }

    async fn connect(&self) -> Result<(), TransportError> {
        if self.signal.is_cancelled() {
            return Err(TransportError::Closed);
        }
        self.connected.store(true, Ordering::Release);
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        // Already-queued events are still attempted by the drain; only new
        // emissions are refused from here on.
        self.connected.store(false, Ordering::Release);
        self.signal.cancel();
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    fn disconnect_signal(&self) -> DisconnectSignal {
        self.signal.clone()
    }
}

/// [`EventSink`] writing frames into a byte channel, e.g. an HTTP response
/// body feed.
pub struct ChannelSink {
    tx: mpsc::Sender<Bytes>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::Sender<Bytes>) -> Self {
        Self { tx }
    }
}

#[async_trait]
impl EventSink for ChannelSink {
    async fn write(&self, frame: Bytes) -> Result<(), TransportError> {
        self.tx.send(frame).await.map_err(|_| TransportError::Closed)
    }
}

/// Adapt a frame receiver into a `Stream` suitable for a streaming response
/// body.
pub fn frame_stream(rx: mpsc::Receiver<Bytes>) -> impl Stream<Item = Bytes> + Send + 'static {
    futures::stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|frame| (frame, rx))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::Mutex;

    /// Sink recording every write, optionally failing after N frames.
    struct RecordingSink {
        frames: Mutex<Vec<Bytes>>,
        fail_after: Option<usize>,
        attempts: Mutex<usize>,
    }

    impl RecordingSink {
        fn new() -> Self {
            Self {
                frames: Mutex::new(Vec::new()),
                fail_after: None,
                attempts: Mutex::new(0),
            }
        }

        fn failing_after(n: usize) -> Self {
            Self {
                fail_after: Some(n),
                ..Self::new()
            }
        }
    }

    #[async_trait]
    impl EventSink for RecordingSink {
        async fn write(&self, frame: Bytes) -> Result<(), TransportError> {
            let mut attempts = self.attempts.lock().await;
            *attempts += 1;
            if let Some(limit) = self.fail_after {
                if *attempts > limit {
                    return Err(TransportError::Io("broken pipe".into()));
                }
            }
            self.frames.lock().await.push(frame);
            Ok(())
        }
    }

    #[tokio::test]
    async fn emits_frames_in_order() {
        let sink = Arc::new(RecordingSink::new());
        let transport = QueuedTransport::sse(sink.clone());

        for i in 0..5 {
            transport
                .emit(Event::text_message_content("m1", format!("d{i}")))
                .await
                .unwrap();
        }
        tokio::task::yield_now().await;
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;

        let frames = sink.frames.lock().await;
        assert_eq!(frames.len(), 5);
        for (i, frame) in frames.iter().enumerate() {
            let text = std::str::from_utf8(frame).unwrap();
            assert!(text.contains(&format!("d{i}")), "frame {i} out of order");
        }
    }

    #[tokio::test]
    async fn chunk_events_are_expanded_before_framing() {
        let sink = Arc::new(RecordingSink::new());
        let transport = QueuedTransport::sse(sink.clone());

        transport
            .emit(Event::text_message_chunk(
                Some("m1".into()),
                Some(weft_protocol::Role::Assistant),
                Some("hi".into()),
            ))
            .await
            .unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;

        let frames = sink.frames.lock().await;
        let kinds: Vec<String> = frames
            .iter()
            .map(|f| {
                let text = std::str::from_utf8(f).unwrap();
                let json: serde_json::Value =
                    serde_json::from_str(text.trim_start_matches("data: ").trim_end()).unwrap();
                json["type"].as_str().unwrap().to_string()
            })
            .collect();
        assert_eq!(
            kinds,
            vec![
                "TEXT_MESSAGE_START",
                "TEXT_MESSAGE_CONTENT",
                "TEXT_MESSAGE_END"
            ]
        );
    }

    #[tokio::test]
    async fn write_failure_stops_drain_silently_and_fires_signal() {
        let sink = Arc::new(RecordingSink::failing_after(2));
        let transport = QueuedTransport::sse(sink.clone());
        let signal = transport.disconnect_signal();

        for i in 0..5 {
            // emit never panics; later sends may be refused once the drain dies.
            let _ = transport
                .emit(Event::text_message_content("m1", format!("d{i}")))
                .await;
        }
        tokio::time::sleep(std::time::Duration::from_millis(30)).await;

        let frames = sink.frames.lock().await;
        assert_eq!(frames.len(), 2, "no writes after the first failure");
        assert!(signal.is_cancelled());
        assert!(!transport.is_connected());

        let refused = transport.emit(Event::text_message_end("m1")).await;
        assert!(matches!(refused, Err(TransportError::Closed)));
    }

    #[tokio::test]
    async fn disconnect_attempts_already_queued_events_then_refuses_new_ones() {
        let sink = Arc::new(RecordingSink::new());
        let transport = QueuedTransport::sse(sink.clone());

        transport
            .emit(Event::text_message_content("m1", "before"))
            .await
            .unwrap();
        transport.disconnect().await.unwrap();

        let refused = transport
            .emit(Event::text_message_content("m1", "after"))
            .await;
        assert!(matches!(refused, Err(TransportError::Closed)));
        assert!(transport.disconnect_signal().is_cancelled());

        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        let frames = sink.frames.lock().await;
        assert_eq!(frames.len(), 1, "pre-disconnect event is still attempted");
        assert!(std::str::from_utf8(&frames[0]).unwrap().contains("before"));
    }

    #[tokio::test]
    async fn frame_stream_yields_sink_output() {
        use futures::StreamExt;

        let (tx, rx) = mpsc::channel::<Bytes>(4);
        let transport = QueuedTransport::binary(Arc::new(ChannelSink::new(tx)));
        transport.emit(Event::step_finished("step_1")).await.unwrap();
        drop(transport);

        let frames: Vec<Bytes> = frame_stream(rx).collect().await;
        assert_eq!(frames.len(), 1);
        let mut buf = bytes::BytesMut::from(&frames[0][..]);
        let decoded = FrameCodec::decode_binary(&mut buf).unwrap().unwrap();
        assert_eq!(decoded, Event::step_finished("step_1"));
    }
}
