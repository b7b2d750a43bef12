use crate::emission::DEFAULT_MAX_PAYLOAD_BYTES;

/// Which state snapshots the lifecycle adapter emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SnapshotMode {
    /// No snapshot events.
    #[default]
    None,
    /// Snapshot at run start only.
    Initial,
    /// Snapshot at run end only.
    Final,
    /// Snapshots at both boundaries, plus a structural delta at run end.
    All,
}

impl SnapshotMode {
    pub fn includes_initial(self) -> bool {
        matches!(self, Self::Initial | Self::All)
    }

    pub fn includes_final(self) -> bool {
        matches!(self, Self::Final | Self::All)
    }
}

/// How much of a run fault is exposed in the RUN_ERROR event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorDetail {
    /// A generic failure message only.
    None,
    /// Generic message plus the fault code.
    Code,
    /// Fault message and code.
    #[default]
    Message,
    /// Fault message, code, and structured details.
    Full,
}

/// Configuration shared by both adapters.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Explicit thread identifier override (highest priority).
    pub thread_id: Option<String>,
    /// Explicit run identifier override (highest priority).
    pub run_id: Option<String>,
    /// Whether tool outputs are emitted as TOOL_CALL_RESULT events.
    pub emit_tool_results: bool,
    /// Which state snapshots the lifecycle adapter emits.
    pub snapshots: SnapshotMode,
    /// Payload size limit in encoded bytes for tool results.
    pub max_payload_bytes: usize,
    /// Split oversized results into chunks instead of truncating.
    pub chunk_oversized: bool,
    /// Run-fault detail exposed to the UI.
    pub error_detail: ErrorDetail,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            thread_id: None,
            run_id: None,
            emit_tool_results: true,
            snapshots: SnapshotMode::default(),
            max_payload_bytes: DEFAULT_MAX_PAYLOAD_BYTES,
            chunk_oversized: true,
            error_detail: ErrorDetail::default(),
        }
    }
}

impl BridgeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_thread_id(mut self, thread_id: impl Into<String>) -> Self {
        self.thread_id = Some(thread_id.into());
        self
    }

    #[must_use]
    pub fn with_run_id(mut self, run_id: impl Into<String>) -> Self {
        self.run_id = Some(run_id.into());
        self
    }

    #[must_use]
    pub fn with_tool_results(mut self, emit: bool) -> Self {
        self.emit_tool_results = emit;
        self
    }

    #[must_use]
    pub fn with_snapshots(mut self, mode: SnapshotMode) -> Self {
        self.snapshots = mode;
        self
    }

    #[must_use]
    pub fn with_max_payload_bytes(mut self, max: usize) -> Self {
        self.max_payload_bytes = max;
        self
    }

    #[must_use]
    pub fn with_chunking(mut self, enabled: bool) -> Self {
        self.chunk_oversized = enabled;
        self
    }

    #[must_use]
    pub fn with_error_detail(mut self, detail: ErrorDetail) -> Self {
        self.error_detail = detail;
        self
    }
}
