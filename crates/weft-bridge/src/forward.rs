use std::sync::Arc;
use tracing::warn;
use weft_protocol::Event;
use weft_transport::Transport;

/// Emit one event, recovering locally from any transport failure.
///
/// The adapters must keep processing and cleaning correlation state
/// regardless of transport health, so delivery faults end here: logged,
/// never propagated.
pub(crate) async fn forward(transport: &Arc<dyn Transport>, event: Event) {
    if let Err(err) = transport.emit(event).await {
        warn!(error = %err, "dropping protocol event: transport unavailable");
    }
}
