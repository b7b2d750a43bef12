use crate::config::BridgeConfig;
use crate::error::BridgeError;
use crate::forward::forward;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::warn;
use weft_contract::{gen_message_id, LifecycleHooks, RunState, RuntimeContext, Visibility};
use weft_protocol as protocol;
use weft_protocol::Event;
use weft_transport::Transport;

/// Per-run bookkeeping held between hook invocations.
#[derive(Debug)]
struct RunContext {
    thread_id: String,
    run_id: String,
    /// Monotonic model-turn counter, reset at run start. The streaming
    /// adapter keeps its own copy of this counter and both derive message
    /// ids from it, so it must never be shared across runs.
    turn_index: u64,
    current_step: Option<String>,
    initial_state: Option<Value>,
}

/// State-aware lifecycle adapter ("middleware").
///
/// Consumes the engine's coarse-grained hook invocations and emits run, step
/// and state events. It deliberately does not emit TEXT_MESSAGE_START: the
/// streaming adapter derives the identical deterministic message id
/// independently and owns message start/end, since only it can time those
/// against actual token arrival.
///
/// Every emission is wrapped so a transport failure can never propagate into
/// the agent's execution path; the only error this adapter raises is the
/// fatal missing-run-id configuration error at run start.
pub struct LifecycleBridge {
    config: BridgeConfig,
    transport: Arc<dyn Transport>,
    run: Option<RunContext>,
}

impl LifecycleBridge {
    pub fn new(config: BridgeConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            config,
            transport,
            run: None,
        }
    }

    /// Resolved identifiers by priority: explicit override, then the
    /// per-invocation runtime context.
    fn resolve_run_id(&self, ctx: &RuntimeContext) -> Result<String, BridgeError> {
        self.config
            .run_id
            .clone()
            .or_else(|| ctx.run_id().map(str::to_string))
            .ok_or(BridgeError::MissingRunId)
    }

    fn resolve_thread_id(&self, ctx: &RuntimeContext, run_id: &str) -> String {
        self.config
            .thread_id
            .clone()
            .or_else(|| ctx.thread_id().map(str::to_string))
            .unwrap_or_else(|| run_id.to_string())
    }
}

#[async_trait]
impl LifecycleHooks for LifecycleBridge {
    type Error = BridgeError;

    async fn before_agent(
        &mut self,
        state: &RunState,
        ctx: &RuntimeContext,
    ) -> Result<(), BridgeError> {
        let run_id = self.resolve_run_id(ctx)?;
        let thread_id = self.resolve_thread_id(ctx, &run_id);

        let input = run_input_echo(state);
        forward(
            &self.transport,
            Event::run_started(&thread_id, &run_id, input),
        )
        .await;

        let mut run = RunContext {
            thread_id,
            run_id,
            turn_index: 0,
            current_step: None,
            initial_state: None,
        };

        if self.config.snapshots.includes_initial() {
            let snapshot = stripped_state(state);
            run.initial_state = Some(snapshot.clone());
            forward(&self.transport, Event::state_snapshot(snapshot)).await;
            forward(
                &self.transport,
                Event::messages_snapshot(protocol_messages(state)),
            )
            .await;
        }

        self.run = Some(run);
        Ok(())
    }

    async fn before_model(
        &mut self,
        _state: &RunState,
        _ctx: &RuntimeContext,
    ) -> Result<(), BridgeError> {
        let Some(run) = self.run.as_mut() else {
            warn!("before_model without before_agent, ignoring");
            return Ok(());
        };
        // The deterministic message id for this turn is
        // ids::deterministic_message_id(run_id, turn_index); the streaming
        // adapter computes it from its own per-run counter, so this adapter
        // only has to keep the counter in lockstep.
        run.turn_index += 1;
        let step_name = format!("step_{}", run.turn_index);
        run.current_step = Some(step_name.clone());
        forward(&self.transport, Event::step_started(step_name)).await;
        Ok(())
    }

    async fn after_model(
        &mut self,
        _state: &RunState,
        _ctx: &RuntimeContext,
    ) -> Result<(), BridgeError> {
        let Some(run) = self.run.as_mut() else {
            return Ok(());
        };
        let step_name = run
            .current_step
            .take()
            .unwrap_or_else(|| format!("step_{}", run.turn_index));
        forward(&self.transport, Event::step_finished(step_name)).await;
        Ok(())
    }

    async fn after_agent(
        &mut self,
        state: &RunState,
        _ctx: &RuntimeContext,
    ) -> Result<(), BridgeError> {
        let Some(run) = self.run.take() else {
            warn!("after_agent without before_agent, ignoring");
            return Ok(());
        };

        if self.config.snapshots.includes_final() {
            let snapshot = stripped_state(state);
            if let Some(initial) = &run.initial_state {
                let patch = json_patch::diff(initial, &snapshot);
                if !patch.0.is_empty() {
                    match serde_json::to_value(&patch) {
                        Ok(Value::Array(ops)) => {
                            forward(&self.transport, Event::state_delta(ops)).await;
                        }
                        Ok(_) | Err(_) => {
                            warn!("failed to serialize state diff, skipping STATE_DELTA");
                        }
                    }
                }
            }
            forward(&self.transport, Event::state_snapshot(snapshot)).await;
        }

        match &state.fault {
            Some(fault) => {
                let event = match self.config.error_detail {
                    crate::config::ErrorDetail::None => Event::run_error("run failed", None, None),
                    crate::config::ErrorDetail::Code => {
                        Event::run_error("run failed", fault.code.clone(), None)
                    }
                    crate::config::ErrorDetail::Message => {
                        Event::run_error(&fault.message, fault.code.clone(), None)
                    }
                    crate::config::ErrorDetail::Full => {
                        Event::run_error(&fault.message, fault.code.clone(), fault.details.clone())
                    }
                };
                forward(&self.transport, event).await;
            }
            None => {
                forward(
                    &self.transport,
                    Event::run_finished(&run.thread_id, &run.run_id, state.result.clone()),
                )
                .await;
            }
        }
        Ok(())
    }
}

/// Sanitized echo of the run input: externally visible messages only,
/// mapped to the protocol representation.
fn run_input_echo(state: &RunState) -> Option<Value> {
    let messages = protocol_messages(state);
    if messages.is_empty() {
        None
    } else {
        Some(json!({ "messages": messages }))
    }
}

/// State snapshot with transient conversation history stripped: message
/// history is carried explicitly by MESSAGES_SNAPSHOT, not mirrored through
/// application state.
fn stripped_state(state: &RunState) -> Value {
    let mut data = state.data.clone();
    if let Value::Object(map) = &mut data {
        map.remove("messages");
    }
    data
}

/// Externally visible engine messages in protocol form.
fn protocol_messages(state: &RunState) -> Vec<Value> {
    state
        .messages
        .iter()
        .filter(|m| m.visibility == Visibility::All)
        .filter_map(|m| {
            let mut msg = protocol::Message::new(
                m.id.clone().unwrap_or_else(gen_message_id),
                protocol_role(m.role),
            )
            .with_content(&m.content);
            if let Some(calls) = &m.tool_calls {
                msg = msg.with_tool_calls(
                    calls
                        .iter()
                        .map(|c| protocol::ToolCall {
                            id: c.id.clone(),
                            name: c.name.clone(),
                            arguments: c.arguments.clone(),
                        })
                        .collect(),
                );
            }
            if let Some(tool_call_id) = &m.tool_call_id {
                msg = msg.with_tool_call_id(tool_call_id);
            }
            serde_json::to_value(msg).ok()
        })
        .collect()
}

const fn protocol_role(role: weft_contract::Role) -> protocol::Role {
    match role {
        weft_contract::Role::System => protocol::Role::System,
        weft_contract::Role::User => protocol::Role::User,
        weft_contract::Role::Assistant => protocol::Role::Assistant,
        weft_contract::Role::Tool => protocol::Role::Tool,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ErrorDetail, SnapshotMode};
    use crate::testing::RecordingTransport;
    use serde_json::json;
    use weft_contract::{Message, RunFault};

    fn ctx() -> RuntimeContext {
        RuntimeContext::new().with_run_id("run_1").with_thread_id("thread_1")
    }

    #[tokio::test]
    async fn missing_run_id_is_a_fatal_configuration_error() {
        let transport = RecordingTransport::shared();
        let mut bridge = LifecycleBridge::new(BridgeConfig::default(), transport.clone());

        let err = bridge
            .before_agent(&RunState::new(), &RuntimeContext::new())
            .await
            .expect_err("run start without a run id must fail");
        assert!(matches!(err, BridgeError::MissingRunId));
        assert!(transport.kinds().is_empty(), "nothing may be emitted");
    }

    #[tokio::test]
    async fn run_id_override_wins_over_context() {
        let transport = RecordingTransport::shared();
        let config = BridgeConfig::default().with_run_id("override");
        let mut bridge = LifecycleBridge::new(config, transport.clone());

        bridge.before_agent(&RunState::new(), &ctx()).await.unwrap();
        match &transport.events()[0] {
            Event::RunStarted { run_id, .. } => assert_eq!(run_id, "override"),
            other => panic!("expected RUN_STARTED, got {}", other.kind()),
        }
    }

    #[tokio::test]
    async fn thread_id_falls_back_to_run_id() {
        let transport = RecordingTransport::shared();
        let mut bridge = LifecycleBridge::new(BridgeConfig::default(), transport.clone());
        let ctx = RuntimeContext::new().with_run_id("run_1");

        bridge.before_agent(&RunState::new(), &ctx).await.unwrap();
        match &transport.events()[0] {
            Event::RunStarted { thread_id, .. } => assert_eq!(thread_id, "run_1"),
            other => panic!("expected RUN_STARTED, got {}", other.kind()),
        }
    }

    #[tokio::test]
    async fn steps_are_named_by_turn_and_closed_with_the_captured_name() {
        let transport = RecordingTransport::shared();
        let mut bridge = LifecycleBridge::new(BridgeConfig::default(), transport.clone());
        let state = RunState::new();

        bridge.before_agent(&state, &ctx()).await.unwrap();
        bridge.before_model(&state, &ctx()).await.unwrap();
        bridge.after_model(&state, &ctx()).await.unwrap();
        bridge.before_model(&state, &ctx()).await.unwrap();
        bridge.after_model(&state, &ctx()).await.unwrap();
        bridge.after_agent(&state, &ctx()).await.unwrap();

        let kinds = transport.kinds();
        assert_eq!(
            kinds,
            vec![
                "RUN_STARTED",
                "STEP_STARTED",
                "STEP_FINISHED",
                "STEP_STARTED",
                "STEP_FINISHED",
                "RUN_FINISHED",
            ]
        );
        let step_names: Vec<String> = transport
            .events()
            .iter()
            .filter_map(|ev| match ev {
                Event::StepStarted { step_name, .. } => Some(step_name.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(step_names, vec!["step_1", "step_2"]);
    }

    #[tokio::test]
    async fn initial_snapshot_strips_mirrored_history() {
        let transport = RecordingTransport::shared();
        let config = BridgeConfig::default().with_snapshots(SnapshotMode::Initial);
        let mut bridge = LifecycleBridge::new(config, transport.clone());
        let state = RunState::new()
            .with_messages(vec![Message::user("hi"), Message::internal_system("hint")])
            .with_data(json!({"counter": 1, "messages": ["mirrored"]}));

        bridge.before_agent(&state, &ctx()).await.unwrap();

        let events = transport.events();
        assert_eq!(
            transport.kinds(),
            vec!["RUN_STARTED", "STATE_SNAPSHOT", "MESSAGES_SNAPSHOT"]
        );
        match &events[1] {
            Event::StateSnapshot { snapshot, .. } => {
                assert_eq!(snapshot["counter"], 1);
                assert!(snapshot.get("messages").is_none(), "history must be stripped");
            }
            other => panic!("expected STATE_SNAPSHOT, got {}", other.kind()),
        }
        match &events[2] {
            Event::MessagesSnapshot { messages, .. } => {
                assert_eq!(messages.len(), 1, "internal messages are sanitized away");
                assert_eq!(messages[0]["role"], "user");
            }
            other => panic!("expected MESSAGES_SNAPSHOT, got {}", other.kind()),
        }
    }

    #[tokio::test]
    async fn final_snapshot_emits_structural_delta_against_initial() {
        let transport = RecordingTransport::shared();
        let config = BridgeConfig::default().with_snapshots(SnapshotMode::All);
        let mut bridge = LifecycleBridge::new(config, transport.clone());

        let initial = RunState::new().with_data(json!({"counter": 1}));
        let final_state = RunState::new().with_data(json!({"counter": 2}));

        bridge.before_agent(&initial, &ctx()).await.unwrap();
        bridge.after_agent(&final_state, &ctx()).await.unwrap();

        let kinds = transport.kinds();
        assert_eq!(
            kinds,
            vec![
                "RUN_STARTED",
                "STATE_SNAPSHOT",
                "MESSAGES_SNAPSHOT",
                "STATE_DELTA",
                "STATE_SNAPSHOT",
                "RUN_FINISHED",
            ]
        );
        let delta = transport
            .events()
            .iter()
            .find_map(|ev| match ev {
                Event::StateDelta { delta, .. } => Some(delta.clone()),
                _ => None,
            })
            .expect("delta expected");
        assert_eq!(delta[0]["op"], "replace");
        assert_eq!(delta[0]["path"], "/counter");
        assert_eq!(delta[0]["value"], 2);
    }

    #[tokio::test]
    async fn run_fault_detail_is_gated_by_config() {
        let fault = RunFault::new("tool exploded")
            .with_code("E_TOOL")
            .with_details(json!({"tool": "calc"}));
        let state = RunState::new().with_fault(fault);

        let cases = [
            (ErrorDetail::None, "run failed", None, false),
            (ErrorDetail::Code, "run failed", Some("E_TOOL"), false),
            (ErrorDetail::Message, "tool exploded", Some("E_TOOL"), false),
            (ErrorDetail::Full, "tool exploded", Some("E_TOOL"), true),
        ];
        for (detail, message, code, has_details) in cases {
            let transport = RecordingTransport::shared();
            let config = BridgeConfig::default().with_error_detail(detail);
            let mut bridge = LifecycleBridge::new(config, transport.clone());
            bridge.before_agent(&state, &ctx()).await.unwrap();
            bridge.after_agent(&state, &ctx()).await.unwrap();

            let events = transport.events();
            match events.last().expect("terminal event") {
                Event::RunError {
                    message: m,
                    code: c,
                    details: d,
                    ..
                } => {
                    assert_eq!(m, message);
                    assert_eq!(c.as_deref(), code);
                    assert_eq!(d.is_some(), has_details);
                }
                other => panic!("expected RUN_ERROR, got {}", other.kind()),
            }
        }
    }

    #[tokio::test]
    async fn run_finished_forwards_engine_result() {
        let transport = RecordingTransport::shared();
        let mut bridge = LifecycleBridge::new(BridgeConfig::default(), transport.clone());
        let state = RunState::new().with_result(json!({"answer": 42}));

        bridge.before_agent(&state, &ctx()).await.unwrap();
        bridge.after_agent(&state, &ctx()).await.unwrap();

        match transport.events().last().unwrap() {
            Event::RunFinished { result, .. } => {
                assert_eq!(result.as_ref().unwrap()["answer"], 42);
            }
            other => panic!("expected RUN_FINISHED, got {}", other.kind()),
        }
    }
}
