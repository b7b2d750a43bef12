/// Bridging-layer failure surfaced to the caller.
///
/// Only setup-time configuration problems surface here; every later fault
/// (transport write failures, correlation misses) is recovered internally so
/// a UI-emission fault can never abort agent execution.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// No run identifier could be resolved at run start. Deterministic
    /// message-id coordination is unsound without one, so this is fatal.
    #[error("no run identifier resolved: set an override or provide one in the runtime context")]
    MissingRunId,
}
