use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Coordination metadata optionally attached to a callback invocation.
///
/// The engine does not guarantee any of these fields; every consumer must
/// treat them as hints layered over its own fallback resolution.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct CallbackMetadata {
    /// Authoritative run identifier, when the engine propagates one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,
    /// Pre-assigned protocol message identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    /// Pre-assigned protocol tool call identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    /// Human-readable tool name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
}

impl CallbackMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_run_id(mut self, run_id: impl Into<String>) -> Self {
        self.run_id = Some(run_id.into());
        self
    }

    #[must_use]
    pub fn with_message_id(mut self, message_id: impl Into<String>) -> Self {
        self.message_id = Some(message_id.into());
        self
    }

    #[must_use]
    pub fn with_tool_call_id(mut self, tool_call_id: impl Into<String>) -> Self {
        self.tool_call_id = Some(tool_call_id.into());
        self
    }

    #[must_use]
    pub fn with_tool_name(mut self, tool_name: impl Into<String>) -> Self {
        self.tool_name = Some(tool_name.into());
        self
    }
}

/// One streamed tool-call argument fragment.
///
/// Keyed by the tool's own identifier, never the invocation id: fragments
/// for a call can arrive before the tool invocation exists. `args` carries
/// the provider's accumulated argument text so far; providers may resend an
/// unchanged snapshot, which consumers are expected to coalesce.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCallFragment {
    pub tool_call_id: String,
    pub args: String,
}

/// One streamed model output chunk.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct TokenChunk {
    /// Visible text delta.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delta: Option<String>,
    /// Reasoning text delta, for providers that stream thinking tokens.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning_delta: Option<String>,
    /// Partial tool-call argument fragments piggy-backed on this chunk.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_call_fragments: Vec<ToolCallFragment>,
}

impl TokenChunk {
    pub fn text(delta: impl Into<String>) -> Self {
        Self {
            delta: Some(delta.into()),
            ..Self::default()
        }
    }

    pub fn reasoning(delta: impl Into<String>) -> Self {
        Self {
            reasoning_delta: Some(delta.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_fragment(mut self, tool_call_id: impl Into<String>, args: impl Into<String>) -> Self {
        self.tool_call_fragments.push(ToolCallFragment {
            tool_call_id: tool_call_id.into(),
            args: args.into(),
        });
        self
    }
}

/// A tool call declared in an invocation's final aggregated output.
///
/// Non-streaming providers produce these without ever emitting argument
/// fragments, so the id may be absent entirely.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeclaredToolCall {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub arguments: Value,
}

/// Final aggregated output of a model invocation.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct InvocationOutput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<DeclaredToolCall>,
}

impl InvocationOutput {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            tool_calls: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_tool_call(mut self, call: DeclaredToolCall) -> Self {
        self.tool_calls.push(call);
        self
    }
}

/// A tool invocation observed at tool start/end.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ToolInvocation {
    /// Declared tool name, when the engine knows it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Tool input payload as handed to the tool.
    #[serde(default)]
    pub input: Value,
}

impl ToolInvocation {
    pub fn named(name: impl Into<String>, input: Value) -> Self {
        Self {
            name: Some(name.into()),
            input,
        }
    }

    pub fn anonymous(input: Value) -> Self {
        Self { name: None, input }
    }
}

/// State-blind observability-callback surface driven by the engine.
///
/// The engine guarantees invocation-id uniqueness within a process and
/// propagates `parent_invocation_id` for nested invocations, but callbacks
/// for one run interleave arbitrarily with callbacks for others. None of
/// these methods may fail: a consumer that cannot correlate an invocation
/// drops it silently.
#[async_trait]
pub trait StreamCallbacks: Send {
    /// A model sub-invocation began.
    async fn on_invocation_start(
        &mut self,
        invocation_id: &str,
        parent_invocation_id: Option<&str>,
        metadata: Option<&CallbackMetadata>,
    );

    /// A streamed output chunk arrived for an open invocation.
    async fn on_token(
        &mut self,
        chunk: &TokenChunk,
        invocation_id: &str,
        parent_invocation_id: Option<&str>,
        metadata: Option<&CallbackMetadata>,
    );

    /// A model sub-invocation completed with its aggregated output.
    async fn on_invocation_end(
        &mut self,
        output: &InvocationOutput,
        invocation_id: &str,
        parent_invocation_id: Option<&str>,
        metadata: Option<&CallbackMetadata>,
    );

    /// A model sub-invocation failed.
    async fn on_invocation_error(
        &mut self,
        error: &str,
        invocation_id: &str,
        parent_invocation_id: Option<&str>,
        metadata: Option<&CallbackMetadata>,
    );

    /// A tool invocation began.
    async fn on_tool_start(
        &mut self,
        tool: &ToolInvocation,
        invocation_id: &str,
        parent_invocation_id: Option<&str>,
        metadata: Option<&CallbackMetadata>,
    );

    /// A tool invocation completed with its full output.
    async fn on_tool_end(
        &mut self,
        tool: &ToolInvocation,
        output: &str,
        invocation_id: &str,
        parent_invocation_id: Option<&str>,
        metadata: Option<&CallbackMetadata>,
    );

    /// A tool invocation failed.
    async fn on_tool_error(
        &mut self,
        error: &str,
        invocation_id: &str,
        parent_invocation_id: Option<&str>,
        metadata: Option<&CallbackMetadata>,
    );
}
