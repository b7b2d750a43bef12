use crate::state::{RunState, RuntimeContext};
use async_trait::async_trait;

/// State-aware lifecycle-hook surface driven by the engine.
///
/// Hooks see run/step boundaries and full execution state but never
/// token-level output. For one run the engine invokes
/// `before_agent`, then `before_model`/`after_model` once per model turn,
/// then `after_agent`, always in that order, though invocations for
/// different runs interleave on the same event loop.
///
/// Only setup-time configuration errors may surface through `Self::Error`;
/// a conforming implementation recovers every later fault internally so a
/// UI-emission failure can never abort agent execution.
#[async_trait]
pub trait LifecycleHooks: Send {
    type Error: std::error::Error + Send + Sync + 'static;

    /// The run is about to start.
    async fn before_agent(
        &mut self,
        state: &RunState,
        ctx: &RuntimeContext,
    ) -> Result<(), Self::Error>;

    /// A model invocation is about to start.
    async fn before_model(
        &mut self,
        state: &RunState,
        ctx: &RuntimeContext,
    ) -> Result<(), Self::Error>;

    /// A model invocation completed.
    async fn after_model(
        &mut self,
        state: &RunState,
        ctx: &RuntimeContext,
    ) -> Result<(), Self::Error>;

    /// The run completed (successfully or not).
    async fn after_agent(
        &mut self,
        state: &RunState,
        ctx: &RuntimeContext,
    ) -> Result<(), Self::Error>;
}
