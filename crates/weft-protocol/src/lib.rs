//! UI-facing streaming protocol: event taxonomy and normalization.
//!
//! Events form a closed tagged union serialized with a `type` discriminator
//! and camelCase wire fields. Producers may emit composite "chunk"
//! convenience events; [`expand`] normalizes those into the canonical
//! start/content/end triples before delivery.

mod events;
mod expand;
mod types;

pub use events::{BaseEvent, Event};
pub use expand::expand;
pub use types::{Message, Role, ToolCall};
