use crate::config::BridgeConfig;
use crate::correlate::CorrelationStore;
use crate::emission::EmissionPolicy;
use crate::forward::forward;
use crate::ids::{deterministic_message_id, fresh_tool_call_id};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;
use weft_contract::{
    CallbackMetadata, InvocationOutput, StreamCallbacks, TokenChunk, ToolInvocation,
};
use weft_protocol::Event;
use weft_transport::Transport;

/// Sentinel tool name when no resolution tier produced one. The field is
/// always present on TOOL_CALL_START, never omitted.
const UNKNOWN_TOOL: &str = "unknown_tool";

/// A tool call recorded from an invocation's aggregated output, consumed at
/// tool start: the name feeds id/name resolution and the arguments become
/// the TOOL_CALL_ARGS event a never-streamed tool would otherwise lack.
#[derive(Debug, Clone)]
struct DeclaredTool {
    name: String,
    arguments: serde_json::Value,
}

/// State-blind streaming adapter ("handler").
///
/// Consumes token and tool observability callbacks and emits message, tool
/// and reasoning events, correlating engine invocation ids to protocol ids
/// through the [`CorrelationStore`]. All mutable state is keyed by
/// invocation id or authoritative run id, never adapter-wide cursors, so
/// one instance stays correct while callbacks for many runs interleave.
///
/// None of the callbacks can fail: an invocation this adapter never tracked
/// is dropped silently (the engine may invoke callbacks in combinations we
/// cannot fully predict), and transport faults are recovered internally.
pub struct StreamBridge {
    config: BridgeConfig,
    transport: Arc<dyn Transport>,
    store: CorrelationStore,
    /// Per-run model-turn counters, keyed by authoritative run id. Feeds the
    /// deterministic message id derivation shared with the lifecycle
    /// adapter.
    turns: HashMap<String, u64>,
    /// Accumulated streaming argument fragments, keyed by the tool's own id
    /// (fragments can arrive before the tool invocation exists).
    fragments: HashMap<String, String>,
    /// Tool calls declared in aggregated output but never streamed,
    /// keyed by their declared id.
    declared: HashMap<String, DeclaredTool>,
    /// Declared tool calls that carried no id at all; matched at tool start
    /// by name or by recorded arguments.
    anonymous: Vec<DeclaredTool>,
    /// Invocations with an open reasoning stream.
    reasoning_open: HashSet<String>,
}

impl StreamBridge {
    pub fn new(config: BridgeConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            config,
            transport,
            store: CorrelationStore::new(),
            turns: HashMap::new(),
            fragments: HashMap::new(),
            declared: HashMap::new(),
            anonymous: Vec::new(),
            reasoning_open: HashSet::new(),
        }
    }

    /// Clear every correlation table and accumulator. Call before discarding
    /// the adapter, or between runs when one instance serves many; bounds
    /// memory in long-lived server processes.
    pub fn dispose(&mut self) {
        self.store.dispose();
        self.turns.clear();
        self.fragments.clear();
        self.declared.clear();
        self.anonymous.clear();
        self.reasoning_open.clear();
    }

    /// Whether all correlation state has been released. True after every
    /// balanced run; useful for leak assertions.
    pub fn is_drained(&self) -> bool {
        self.store.is_empty()
            && self.fragments.is_empty()
            && self.declared.is_empty()
            && self.anonymous.is_empty()
            && self.reasoning_open.is_empty()
    }

    /// Authoritative run id for an invocation: explicit coordination
    /// metadata, else the parent invocation id, else the invocation's own.
    fn resolve_authoritative(
        &self,
        invocation_id: &str,
        parent_invocation_id: Option<&str>,
        metadata: Option<&CallbackMetadata>,
    ) -> String {
        metadata
            .and_then(|m| m.run_id.clone())
            .or_else(|| parent_invocation_id.map(str::to_string))
            .unwrap_or_else(|| invocation_id.to_string())
    }

    /// Authoritative run id as recorded for this invocation or its parent.
    /// Best-effort: the mapping may have been recorded after the parent
    /// invocation already ended, or not at all.
    fn recorded_authoritative(
        &self,
        invocation_id: &str,
        parent_invocation_id: Option<&str>,
    ) -> Option<String> {
        self.store
            .authoritative_for(invocation_id)
            .or_else(|| parent_invocation_id.and_then(|p| self.store.authoritative_for(p)))
            .map(str::to_string)
            .or_else(|| parent_invocation_id.map(str::to_string))
    }

    fn next_turn(&mut self, authoritative_id: &str) -> u64 {
        let counter = self.turns.entry(authoritative_id.to_string()).or_insert(0);
        let turn = *counter;
        *counter += 1;
        turn
    }

    /// Three-tier tool call id resolution: explicit metadata, id embedded in
    /// the tool input, fuzzy containment match against accumulated argument
    /// fragments; then declared-output lookup by name, else a fresh id.
    fn resolve_tool_call_id(
        &self,
        tool: &ToolInvocation,
        metadata: Option<&CallbackMetadata>,
        name_hint: Option<&str>,
    ) -> String {
        if let Some(id) = metadata.and_then(|m| m.tool_call_id.clone()) {
            return id;
        }
        if let Some(id) = embedded_tool_call_id(tool) {
            return id;
        }
        if let Some(id) = self.fuzzy_fragment_match(tool) {
            return id;
        }
        if let Some(name) = name_hint {
            if let Some((id, _)) = self.declared.iter().find(|(_, d)| d.name == name) {
                return id.clone();
            }
        }
        fresh_tool_call_id()
    }

    /// Match a starting tool against accumulated streaming fragments by
    /// substring containment of the serialized input, in either direction.
    fn fuzzy_fragment_match(&self, tool: &ToolInvocation) -> Option<String> {
        if tool.input.is_null() {
            return None;
        }
        let input = tool.input.to_string();
        let mut candidates: Vec<&String> = self
            .fragments
            .iter()
            .filter(|(_, args)| {
                !args.is_empty() && (input.contains(args.as_str()) || args.contains(&input))
            })
            .map(|(id, _)| id)
            .collect();
        // Deterministic pick when several fragments match.
        candidates.sort();
        candidates.first().map(|id| (*id).clone())
    }

    /// Take the declared-output record for a starting tool, if any: by
    /// resolved id first, else (for id-less declarations) by name or by
    /// matching the recorded arguments against the tool input. Consuming the
    /// record keeps one declaration from naming two tool starts.
    fn take_declared(
        &mut self,
        tool_call_id: &str,
        name_hint: Option<&str>,
        input: &serde_json::Value,
    ) -> Option<DeclaredTool> {
        if let Some(spec) = self.declared.remove(tool_call_id) {
            return Some(spec);
        }
        let index = self.anonymous.iter().position(|spec| {
            name_hint.is_some_and(|name| spec.name == name)
                || (!input.is_null() && spec.arguments == *input)
        })?;
        Some(self.anonymous.remove(index))
    }

    async fn close_reasoning(&mut self, invocation_id: &str, message_id: &str) {
        if self.reasoning_open.remove(invocation_id) {
            forward(&self.transport, Event::reasoning_end(message_id)).await;
        }
    }

    /// Release everything a failing or finished tool invocation owns.
    fn cleanup_tool(&mut self, invocation_id: &str, tool_call_id: Option<&str>) {
        if let Some(id) = tool_call_id {
            self.fragments.remove(id);
            self.declared.remove(id);
        }
        self.store.release_tool_call(invocation_id);
        self.store.release_authoritative(invocation_id);
    }
}

#[async_trait]
impl StreamCallbacks for StreamBridge {
    async fn on_invocation_start(
        &mut self,
        invocation_id: &str,
        parent_invocation_id: Option<&str>,
        metadata: Option<&CallbackMetadata>,
    ) {
        let authoritative =
            self.resolve_authoritative(invocation_id, parent_invocation_id, metadata);
        self.store
            .record_authoritative(invocation_id, &authoritative);

        let turn = self.next_turn(&authoritative);
        let message_id = metadata
            .and_then(|m| m.message_id.clone())
            .unwrap_or_else(|| deterministic_message_id(&authoritative, turn));

        self.store.bind_message(invocation_id, &message_id);
        if authoritative != invocation_id {
            // The run's current message, reachable by authoritative id for
            // parent lookups from tool invocations.
            self.store.bind_message(&authoritative, &message_id);
        }

        forward(&self.transport, Event::text_message_start(message_id)).await;
    }

    async fn on_token(
        &mut self,
        chunk: &TokenChunk,
        invocation_id: &str,
        _parent_invocation_id: Option<&str>,
        _metadata: Option<&CallbackMetadata>,
    ) {
        let Some(message_id) = self.store.message_id(invocation_id).map(str::to_string) else {
            debug!(invocation_id, "token for untracked invocation, dropping");
            return;
        };

        if let Some(delta) = &chunk.delta {
            if !delta.is_empty() {
                forward(
                    &self.transport,
                    Event::text_message_content(&message_id, delta),
                )
                .await;
            }
        }

        if let Some(delta) = &chunk.reasoning_delta {
            if self.reasoning_open.insert(invocation_id.to_string()) {
                forward(&self.transport, Event::reasoning_start(&message_id)).await;
            }
            forward(
                &self.transport,
                Event::reasoning_content(&message_id, delta),
            )
            .await;
        }

        for fragment in &chunk.tool_call_fragments {
            let accumulated = self
                .fragments
                .entry(fragment.tool_call_id.clone())
                .or_default();
            // Coalesce: providers resend unchanged snapshots; only a changed
            // value is worth storing.
            if *accumulated != fragment.args {
                *accumulated = fragment.args.clone();
            }
        }
    }

    async fn on_invocation_end(
        &mut self,
        output: &InvocationOutput,
        invocation_id: &str,
        _parent_invocation_id: Option<&str>,
        _metadata: Option<&CallbackMetadata>,
    ) {
        let Some(message_id) = self.store.message_id(invocation_id).map(str::to_string) else {
            debug!(invocation_id, "end of untracked invocation, dropping");
            return;
        };

        // Tool calls present in the aggregated output that were never seen
        // incrementally (non-streaming providers); remember their declared
        // name and arguments for resolution at tool start.
        for call in &output.tool_calls {
            match &call.id {
                Some(id) => {
                    if !self.fragments.contains_key(id) && !self.declared.contains_key(id) {
                        self.declared.insert(
                            id.clone(),
                            DeclaredTool {
                                name: call.name.clone(),
                                arguments: call.arguments.clone(),
                            },
                        );
                    }
                }
                None => self.anonymous.push(DeclaredTool {
                    name: call.name.clone(),
                    arguments: call.arguments.clone(),
                }),
            }
        }

        self.close_reasoning(invocation_id, &message_id).await;
        forward(&self.transport, Event::text_message_end(&message_id)).await;

        // The invocation's own mapping is released here; the
        // authoritative-keyed binding (when distinct) stays until the next
        // turn overwrites it or the adapter is disposed, so late tool starts
        // can still resolve their parent message.
        self.store.release_message(invocation_id);
        self.store.release_authoritative(invocation_id);
    }

    async fn on_invocation_error(
        &mut self,
        error: &str,
        invocation_id: &str,
        _parent_invocation_id: Option<&str>,
        _metadata: Option<&CallbackMetadata>,
    ) {
        debug!(invocation_id, error, "invocation failed, closing open lifecycles");
        // Close the open message lifecycle before cleanup so the stream
        // never leaks a start without an end; RUN_ERROR itself belongs to
        // the lifecycle adapter.
        if let Some(message_id) = self.store.message_id(invocation_id).map(str::to_string) {
            self.close_reasoning(invocation_id, &message_id).await;
            forward(&self.transport, Event::text_message_end(&message_id)).await;
        }
        self.reasoning_open.remove(invocation_id);
        self.store.release_message(invocation_id);
        self.store.release_authoritative(invocation_id);
    }

    async fn on_tool_start(
        &mut self,
        tool: &ToolInvocation,
        invocation_id: &str,
        parent_invocation_id: Option<&str>,
        metadata: Option<&CallbackMetadata>,
    ) {
        let name_hint = metadata
            .and_then(|m| m.tool_name.as_deref())
            .or(tool.name.as_deref());
        let tool_call_id = self.resolve_tool_call_id(tool, metadata, name_hint);
        let declared = self.take_declared(&tool_call_id, name_hint, &tool.input);
        let tool_name = name_hint
            .map(str::to_string)
            .or_else(|| declared.as_ref().map(|spec| spec.name.clone()))
            .unwrap_or_else(|| UNKNOWN_TOOL.to_string());

        // Parent message resolution goes through the authoritative run id;
        // the mapping may have been recorded after the parent invocation
        // ended, so this works across that gap when it can and degrades to
        // no parent when it cannot.
        let authoritative = self
            .recorded_authoritative(invocation_id, parent_invocation_id)
            .unwrap_or_else(|| invocation_id.to_string());
        let parent_message_id = self.store.message_id(&authoritative).map(str::to_string);

        self.store.bind_tool_call(invocation_id, &tool_call_id);
        self.store
            .record_authoritative(invocation_id, &authoritative);

        forward(
            &self.transport,
            Event::tool_call_start(&tool_call_id, tool_name, parent_message_id),
        )
        .await;

        if let Some(args) = self.fragments.remove(&tool_call_id) {
            if !args.is_empty() {
                forward(&self.transport, Event::tool_call_args(&tool_call_id, args)).await;
            }
        } else if let Some(spec) = &declared {
            // A declared-output tool never streamed fragments; its recorded
            // arguments are the only args the UI will see.
            let args = spec.arguments.to_string();
            if args != "{}" && args != "null" {
                forward(&self.transport, Event::tool_call_args(&tool_call_id, args)).await;
            }
        }
    }

    async fn on_tool_end(
        &mut self,
        _tool: &ToolInvocation,
        output: &str,
        invocation_id: &str,
        _parent_invocation_id: Option<&str>,
        _metadata: Option<&CallbackMetadata>,
    ) {
        let Some(tool_call_id) = self.store.tool_call_id(invocation_id).map(str::to_string) else {
            debug!(invocation_id, "end of untracked tool invocation, dropping");
            return;
        };

        forward(&self.transport, Event::tool_call_end(&tool_call_id)).await;

        if self.config.emit_tool_results {
            // The UI gets the policy-shaped result; the agent loop already
            // received the complete output through the engine.
            let policy =
                EmissionPolicy::new(self.config.max_payload_bytes, self.config.chunk_oversized);
            let message_id = format!("result_{tool_call_id}");
            for event in policy.apply(&message_id, &tool_call_id, output) {
                forward(&self.transport, event).await;
            }
        }

        self.cleanup_tool(invocation_id, Some(&tool_call_id));
    }

    async fn on_tool_error(
        &mut self,
        error: &str,
        invocation_id: &str,
        _parent_invocation_id: Option<&str>,
        _metadata: Option<&CallbackMetadata>,
    ) {
        debug!(invocation_id, error, "tool failed, closing open lifecycle");
        let tool_call_id = self.store.tool_call_id(invocation_id).map(str::to_string);
        if let Some(id) = &tool_call_id {
            // Close the open tool lifecycle; no result event for a failed
            // tool; the run-level error surface belongs to the lifecycle
            // adapter.
            forward(&self.transport, Event::tool_call_end(id)).await;
        }
        self.cleanup_tool(invocation_id, tool_call_id.as_deref());
    }
}

/// Tool call id embedded in the tool's own input payload.
fn embedded_tool_call_id(tool: &ToolInvocation) -> Option<String> {
    let obj = tool.input.as_object()?;
    ["toolCallId", "tool_call_id"]
        .iter()
        .find_map(|key| obj.get(*key))
        .and_then(serde_json::Value::as_str)
        .map(str::to_string)
}
