//! Identifier derivation.
//!
//! The two adapters cannot pass objects to each other, so they agree on a
//! message id by computing it independently: a pure function of
//! `(authoritative run id, turn index)`. The hash must be stable across
//! platforms and releases (the std hasher makes no such promise), so a
//! small FNV-1a is carried here instead of a hashing dependency.

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

fn fnv1a(hash: u64, bytes: &[u8]) -> u64 {
    bytes.iter().fold(hash, |hash, byte| {
        (hash ^ u64::from(*byte)).wrapping_mul(FNV_PRIME)
    })
}

/// Deterministic message id for one model turn of a run.
///
/// Equal for equal `(run_id, turn_index)` pairs regardless of which adapter
/// computes it, on which platform, in which order.
pub fn deterministic_message_id(run_id: &str, turn_index: u64) -> String {
    let hash = fnv1a(FNV_OFFSET, run_id.as_bytes());
    // NUL separator keeps ("r1", 2) distinct from ("r12", ...) style collisions.
    let hash = fnv1a(hash, &[0]);
    let hash = fnv1a(hash, &turn_index.to_be_bytes());
    format!("msg_{hash:016x}")
}

/// Fresh protocol tool-call identifier.
pub fn fresh_tool_call_id() -> String {
    format!("call_{}", uuid::Uuid::new_v4().simple())
}
