//! Correlation-and-bridging engine between an agent engine's two
//! observation surfaces and the UI-facing protocol stream.
//!
//! The engine exposes two disjoint extension points: state-aware lifecycle
//! hooks that never see tokens, and state-blind streaming callbacks that
//! never see execution state. Neither alone can produce a well-formed
//! protocol stream. [`LifecycleBridge`] and [`StreamBridge`] consume one
//! surface each and agree on message identifiers without communicating, by
//! deriving them deterministically from `(run id, turn index)`; everything
//! else is correlated through a per-adapter [`CorrelationStore`].

mod config;
mod correlate;
mod emission;
mod error;
mod forward;
mod handler;
mod ids;
mod middleware;
pub mod testing;

pub use config::{BridgeConfig, ErrorDetail, SnapshotMode};
pub use correlate::CorrelationStore;
pub use emission::{chunk_spans, ChunkSpans, EmissionPolicy, DEFAULT_MAX_PAYLOAD_BYTES};
pub use error::BridgeError;
pub use handler::StreamBridge;
pub use ids::{deterministic_message_id, fresh_tool_call_id};
pub use middleware::LifecycleBridge;
