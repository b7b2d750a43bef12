use std::collections::HashMap;

/// Per-adapter correlation tables between engine-internal invocation ids and
/// protocol identifiers.
///
/// Three independent tables: message ids, tool call ids, and authoritative
/// run ids (used when sub-invocations nest beneath a run without carrying
/// the run's identifier directly). Keys are engine-assigned invocation ids,
/// globally unique by engine construction, so one store stays correct under
/// interleaved concurrent runs.
///
/// Callers own the lifecycle: every bind at a "start" event must be paired
/// with a release on the matching end *and* error path; an orphaned entry
/// is a leak and a protocol-sequence defect, not a benign condition.
/// [`CorrelationStore::dispose`] is the terminal backstop before an adapter
/// is discarded or reused across many runs.
#[derive(Debug, Default)]
pub struct CorrelationStore {
    messages: HashMap<String, String>,
    tool_calls: HashMap<String, String>,
    authoritative: HashMap<String, String>,
}

impl CorrelationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind_message(&mut self, internal_id: impl Into<String>, message_id: impl Into<String>) {
        self.messages.insert(internal_id.into(), message_id.into());
    }

    pub fn message_id(&self, internal_id: &str) -> Option<&str> {
        self.messages.get(internal_id).map(String::as_str)
    }

    pub fn release_message(&mut self, internal_id: &str) -> Option<String> {
        self.messages.remove(internal_id)
    }

    pub fn bind_tool_call(
        &mut self,
        internal_id: impl Into<String>,
        tool_call_id: impl Into<String>,
    ) {
        self.tool_calls
            .insert(internal_id.into(), tool_call_id.into());
    }

    pub fn tool_call_id(&self, internal_id: &str) -> Option<&str> {
        self.tool_calls.get(internal_id).map(String::as_str)
    }

    pub fn release_tool_call(&mut self, internal_id: &str) -> Option<String> {
        self.tool_calls.remove(internal_id)
    }

    pub fn record_authoritative(
        &mut self,
        internal_id: impl Into<String>,
        authoritative_run_id: impl Into<String>,
    ) {
        self.authoritative
            .insert(internal_id.into(), authoritative_run_id.into());
    }

    pub fn authoritative_for(&self, internal_id: &str) -> Option<&str> {
        self.authoritative.get(internal_id).map(String::as_str)
    }

    pub fn release_authoritative(&mut self, internal_id: &str) -> Option<String> {
        self.authoritative.remove(internal_id)
    }

    /// Clear every table. Idempotent; safe to call repeatedly.
    pub fn dispose(&mut self) {
        self.messages.clear();
        self.tool_calls.clear();
        self.authoritative.clear();
    }

    /// Whether all tables are empty, the expected state after a fully
    /// balanced run.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty() && self.tool_calls.is_empty() && self.authoritative.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bind_lookup_release_round_trip() {
        let mut store = CorrelationStore::new();
        store.bind_message("inv_1", "msg_a");
        store.bind_tool_call("inv_2", "call_b");
        store.record_authoritative("inv_2", "inv_1");

        assert_eq!(store.message_id("inv_1"), Some("msg_a"));
        assert_eq!(store.tool_call_id("inv_2"), Some("call_b"));
        assert_eq!(store.authoritative_for("inv_2"), Some("inv_1"));

        assert_eq!(store.release_message("inv_1").as_deref(), Some("msg_a"));
        assert_eq!(store.release_tool_call("inv_2").as_deref(), Some("call_b"));
        assert_eq!(
            store.release_authoritative("inv_2").as_deref(),
            Some("inv_1")
        );
        assert!(store.is_empty());
    }

    #[test]
    fn lookups_of_unknown_ids_are_misses_not_errors() {
        let store = CorrelationStore::new();
        assert_eq!(store.message_id("nope"), None);
        assert_eq!(store.tool_call_id("nope"), None);
        assert_eq!(store.authoritative_for("nope"), None);
    }

    #[test]
    fn release_of_unknown_id_is_a_no_op() {
        let mut store = CorrelationStore::new();
        assert_eq!(store.release_message("nope"), None);
        assert!(store.is_empty());
    }

    #[test]
    fn dispose_empties_all_tables_and_is_idempotent() {
        let mut store = CorrelationStore::new();
        store.bind_message("a", "m");
        store.bind_tool_call("b", "c");
        store.record_authoritative("c", "r");

        store.dispose();
        assert!(store.is_empty());
        store.dispose();
        assert!(store.is_empty());
    }

    #[test]
    fn tables_are_independent_per_key() {
        let mut store = CorrelationStore::new();
        store.bind_message("inv_1", "msg_a");
        store.bind_tool_call("inv_1", "call_a");
        store.release_message("inv_1");
        assert_eq!(store.tool_call_id("inv_1"), Some("call_a"));
    }
}
