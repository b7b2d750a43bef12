use crate::message::Message;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Terminal fault recorded on a run by the engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunFault {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl RunFault {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
            details: None,
        }
    }

    #[must_use]
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    #[must_use]
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }
}

/// Full execution state the engine exposes to lifecycle hooks.
///
/// Streaming callbacks never see this type; that asymmetry is the reason
/// the bridging layer exists.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RunState {
    /// Conversation history, in engine representation.
    #[serde(default)]
    pub messages: Vec<Message>,
    /// Arbitrary agent state (application-defined shape).
    #[serde(default)]
    pub data: Value,
    /// Run result, populated by the engine before the final hook.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Terminal fault, populated by the engine when the run failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fault: Option<RunFault>,
}

impl RunState {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_messages(mut self, messages: Vec<Message>) -> Self {
        self.messages = messages;
        self
    }

    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }

    #[must_use]
    pub fn with_result(mut self, result: Value) -> Self {
        self.result = Some(result);
        self
    }

    #[must_use]
    pub fn with_fault(mut self, fault: RunFault) -> Self {
        self.fault = Some(fault);
        self
    }
}

/// Per-invocation key/value context the engine passes alongside run state.
///
/// Well-known keys carry the session and run identifiers; everything else is
/// application-defined and opaque to the bridging layer.
#[derive(Debug, Clone, Default)]
pub struct RuntimeContext {
    values: HashMap<String, Value>,
}

impl RuntimeContext {
    /// Well-known key for the run identifier.
    pub const RUN_ID: &'static str = "run_id";
    /// Well-known key for the thread (session) identifier.
    pub const THREAD_ID: &'static str = "thread_id";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.values.insert(key.into(), value);
    }

    #[must_use]
    pub fn with_value(mut self, key: impl Into<String>, value: Value) -> Self {
        self.insert(key, value);
        self
    }

    #[must_use]
    pub fn with_run_id(self, run_id: impl Into<String>) -> Self {
        self.with_value(Self::RUN_ID, Value::String(run_id.into()))
    }

    #[must_use]
    pub fn with_thread_id(self, thread_id: impl Into<String>) -> Self {
        self.with_value(Self::THREAD_ID, Value::String(thread_id.into()))
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.values.get(key).and_then(Value::as_str)
    }

    /// Run identifier carried by this context, if any.
    pub fn run_id(&self) -> Option<&str> {
        self.get_str(Self::RUN_ID)
    }

    /// Thread identifier carried by this context, if any.
    pub fn thread_id(&self) -> Option<&str> {
        self.get_str(Self::THREAD_ID)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn runtime_context_exposes_well_known_ids() {
        let ctx = RuntimeContext::new()
            .with_run_id("run_1")
            .with_thread_id("thread_1")
            .with_value("tenant", json!("acme"));

        assert_eq!(ctx.run_id(), Some("run_1"));
        assert_eq!(ctx.thread_id(), Some("thread_1"));
        assert_eq!(ctx.get_str("tenant"), Some("acme"));
        assert_eq!(ctx.get_str("missing"), None);
    }

    #[test]
    fn run_state_builder_round_trip() {
        let state = RunState::new()
            .with_data(json!({"counter": 1}))
            .with_fault(RunFault::new("boom").with_code("E_TOOL"));

        assert_eq!(state.data["counter"], 1);
        let fault = state.fault.expect("fault set");
        assert_eq!(fault.code.as_deref(), Some("E_TOOL"));
        assert_eq!(fault.message, "boom");
    }
}
