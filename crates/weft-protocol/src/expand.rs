use crate::events::Event;

/// Expand a composite "chunk" convenience event into its canonical form.
///
/// For [`Event::TextMessageChunk`] and [`Event::ToolCallChunk`]:
/// - a start event is synthesized only when the chunk carries identifying
///   data (role for text, name for tool);
/// - a content/args event is synthesized when a delta is present;
/// - an end event is synthesized only when *both* identifying data and a
///   delta were present. A chunk carrying only a delta is a continuation of
///   an already-open lifecycle, not a complete one.
///
/// A missing identifier is replaced with a freshly generated one. Every
/// other variant passes through unchanged, which makes the function
/// idempotent on canonical input.
pub fn expand(event: Event) -> Vec<Event> {
    match event {
        Event::TextMessageChunk {
            message_id,
            role,
            delta,
            base: _,
        } => {
            let message_id = message_id.unwrap_or_else(fresh_message_id);
            let mut out = Vec::new();
            if let Some(role) = role {
                out.push(Event::TextMessageStart {
                    message_id: message_id.clone(),
                    role,
                    base: Default::default(),
                });
            }
            let had_delta = delta.is_some();
            if let Some(delta) = delta {
                out.push(Event::text_message_content(&message_id, delta));
            }
            if role.is_some() && had_delta {
                out.push(Event::text_message_end(&message_id));
            }
            out
        }

        Event::ToolCallChunk {
            tool_call_id,
            tool_call_name,
            parent_message_id,
            delta,
            base: _,
        } => {
            let tool_call_id = tool_call_id.unwrap_or_else(fresh_tool_call_id);
            let mut out = Vec::new();
            let named = tool_call_name.is_some();
            if let Some(name) = tool_call_name {
                out.push(Event::tool_call_start(
                    &tool_call_id,
                    name,
                    parent_message_id,
                ));
            }
            let had_delta = delta.is_some();
            if let Some(delta) = delta {
                out.push(Event::tool_call_args(&tool_call_id, delta));
            }
            if named && had_delta {
                out.push(Event::tool_call_end(&tool_call_id));
            }
            out
        }

        other => vec![other],
    }
}

fn fresh_message_id() -> String {
    format!("msg_{}", uuid::Uuid::new_v4().simple())
}

fn fresh_tool_call_id() -> String {
    format!("call_{}", uuid::Uuid::new_v4().simple())
}
