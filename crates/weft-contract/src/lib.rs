//! Engine-facing contracts consumed by the bridging layer.
//!
//! The upstream agent engine is an opaque collaborator: it drives a
//! state-aware lifecycle-hook surface ([`LifecycleHooks`]) and a state-blind
//! streaming-callback surface ([`StreamCallbacks`]) for the same logical run.
//! This crate defines the types crossing that boundary and nothing else:
//! no protocol events, no transport, no correlation state.

mod callbacks;
mod hooks;
mod message;
mod state;

pub use callbacks::{
    CallbackMetadata, DeclaredToolCall, InvocationOutput, StreamCallbacks, TokenChunk,
    ToolCallFragment, ToolInvocation,
};
pub use hooks::LifecycleHooks;
pub use message::{gen_message_id, Message, Role, ToolCall, Visibility};
pub use state::{RunFault, RunState, RuntimeContext};
