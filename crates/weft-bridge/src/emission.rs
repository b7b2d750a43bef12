use weft_protocol::Event;

/// Default payload size limit: 50 KiB of encoded bytes.
pub const DEFAULT_MAX_PAYLOAD_BYTES: usize = 50 * 1024;

/// Bytes reserved at the tail of a truncated payload for the marker text.
const TRUNCATION_RESERVE: usize = 64;

/// Chunk-or-truncate policy for oversized UI-bound payloads.
///
/// Applies to single payloads destined for the UI, in practice tool-call
/// results. The agent itself always receives the complete, untruncated
/// output; this policy never touches data fed back into the agent loop.
///
/// Sizes are measured in encoded UTF-8 bytes, never characters, and every
/// split point lands on a character boundary of that same encoding.
#[derive(Debug, Clone, Copy)]
pub struct EmissionPolicy {
    max_payload_bytes: usize,
    chunk_oversized: bool,
}

impl Default for EmissionPolicy {
    fn default() -> Self {
        Self {
            max_payload_bytes: DEFAULT_MAX_PAYLOAD_BYTES,
            chunk_oversized: true,
        }
    }
}

impl EmissionPolicy {
    pub fn new(max_payload_bytes: usize, chunk_oversized: bool) -> Self {
        Self {
            max_payload_bytes,
            chunk_oversized,
        }
    }

    /// Produce the result event(s) for one tool output.
    ///
    /// - within the limit: one unchanged TOOL_CALL_RESULT;
    /// - oversized, chunking on: one indexed TOOL_CALL_RESULT per piece,
    ///   concatenating to the original content exactly;
    /// - oversized, chunking off: one truncated TOOL_CALL_RESULT whose
    ///   marker states how many bytes were elided.
    pub fn apply(&self, message_id: &str, tool_call_id: &str, content: &str) -> Vec<Event> {
        if content.len() <= self.max_payload_bytes {
            return vec![Event::tool_call_result(message_id, tool_call_id, content)];
        }
        if self.chunk_oversized {
            chunk_spans(content, self.max_payload_bytes)
                .enumerate()
                .map(|(index, piece)| {
                    Event::tool_call_result_chunk(message_id, tool_call_id, piece, index as u64)
                })
                .collect()
        } else {
            vec![Event::tool_call_result(
                message_id,
                tool_call_id,
                truncate_with_marker(content, self.max_payload_bytes),
            )]
        }
    }
}

/// Lazily split `content` into pieces of at most `max_bytes` encoded bytes.
///
/// Prefers a whitespace split inside the back half of the window so words
/// survive chunking; never cuts inside a multi-byte character. Concatenating
/// the pieces in order reproduces `content` byte-for-byte.
pub fn chunk_spans(content: &str, max_bytes: usize) -> ChunkSpans<'_> {
    ChunkSpans {
        rest: content,
        max_bytes: max_bytes.max(1),
    }
}

/// Iterator state for [`chunk_spans`].
#[derive(Debug, Clone)]
pub struct ChunkSpans<'a> {
    rest: &'a str,
    max_bytes: usize,
}

impl<'a> Iterator for ChunkSpans<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        if self.rest.is_empty() {
            return None;
        }
        if self.rest.len() <= self.max_bytes {
            let piece = self.rest;
            self.rest = "";
            return Some(piece);
        }

        // Largest cut within the window that is a character boundary. A
        // byte-count cut without this walk-back can land inside a multi-byte
        // sequence and corrupt the piece.
        let mut cut = self.max_bytes;
        while cut > 0 && !self.rest.is_char_boundary(cut) {
            cut -= 1;
        }
        if cut == 0 {
            // Window smaller than the first character: emit that character
            // whole rather than loop forever.
            cut = self.rest.chars().next().map_or(1, char::len_utf8);
        }

        // Prefer splitting just after a whitespace character, but only when
        // it falls in the back half of the window.
        if let Some(ws) = self.rest[..cut].rfind(char::is_whitespace) {
            let after_ws = ws + self.rest[ws..].chars().next().map_or(1, char::len_utf8);
            if after_ws > cut / 2 {
                cut = after_ws;
            }
        }

        let (piece, rest) = self.rest.split_at(cut);
        self.rest = rest;
        Some(piece)
    }
}

/// Truncate at a character boundary and append a marker naming the elided
/// byte count. Total output stays within `max_bytes`.
fn truncate_with_marker(content: &str, max_bytes: usize) -> String {
    let reserve = TRUNCATION_RESERVE.min(max_bytes);
    let mut keep = max_bytes.saturating_sub(reserve);
    while keep > 0 && !content.is_char_boundary(keep) {
        keep -= 1;
    }
    let elided = content.len() - keep;
    format!("{}\n[truncated: {elided} bytes elided]", &content[..keep])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contents(events: &[Event]) -> Vec<(Option<u64>, String)> {
        events
            .iter()
            .map(|ev| match ev {
                Event::ToolCallResult {
                    content,
                    chunk_index,
                    ..
                } => (*chunk_index, content.clone()),
                other => panic!("expected TOOL_CALL_RESULT, got {}", other.kind()),
            })
            .collect()
    }

    #[test]
    fn small_payload_passes_through_unchanged() {
        let policy = EmissionPolicy::default();
        let events = policy.apply("m1", "call_1", "42");
        let out = contents(&events);
        assert_eq!(out, vec![(None, "42".to_string())]);
    }

    #[test]
    fn oversized_ascii_payload_chunks_and_reassembles() {
        let policy = EmissionPolicy::new(50 * 1024, true);
        let content = "a".repeat(130 * 1024);
        let events = policy.apply("m1", "call_1", &content);

        let out = contents(&events);
        assert_eq!(out.len(), 3, "130 KiB at a 50 KiB limit is 3 chunks");
        for (i, (index, piece)) in out.iter().enumerate() {
            assert_eq!(*index, Some(i as u64));
            assert!(piece.len() <= 50 * 1024);
        }
        let reassembled: String = out.into_iter().map(|(_, piece)| piece).collect();
        assert_eq!(reassembled, content, "concatenation must be byte-identical");
    }

    #[test]
    fn chunk_boundaries_never_split_multi_byte_characters() {
        // 50 three-byte characters at a 10-byte window: a naive byte cut at
        // 10 would land mid-character.
        let content = "\u{2603}".repeat(50);
        assert_eq!(content.len(), 150);

        let pieces: Vec<&str> = chunk_spans(&content, 10).collect();
        for piece in &pieces {
            assert!(piece.len() <= 10);
            assert_eq!(piece.len() % 3, 0, "piece must hold whole characters");
            assert!(std::str::from_utf8(piece.as_bytes()).is_ok());
        }
        let reassembled: String = pieces.concat();
        assert_eq!(reassembled, content);
    }

    #[test]
    fn chunking_prefers_whitespace_in_back_half_of_window() {
        let content = "aaaa bbbb cccc dddd";
        let pieces: Vec<&str> = chunk_spans(content, 8).collect();
        // "aaaa bbbb..." window of 8 contains whitespace at offset 4 (back
        // half starts at 4), so the split lands after it.
        assert_eq!(pieces[0], "aaaa ");
        assert_eq!(pieces.concat(), content);
        for piece in &pieces {
            assert!(piece.len() <= 8);
        }
    }

    #[test]
    fn whitespace_in_front_half_is_ignored() {
        let content = "a bbbbbbbbbbbb";
        let pieces: Vec<&str> = chunk_spans(content, 10).collect();
        // Whitespace sits at offset 1 of a 10-byte window; splitting there
        // would degenerate into tiny chunks, so the full window is taken.
        assert_eq!(pieces[0].len(), 10);
        assert_eq!(pieces.concat(), content);
    }

    #[test]
    fn truncation_stays_within_limit_and_names_elided_bytes() {
        let policy = EmissionPolicy::new(256, false);
        let content = "x".repeat(1000);
        let events = policy.apply("m1", "call_1", &content);

        let out = contents(&events);
        assert_eq!(out.len(), 1);
        let (index, truncated) = &out[0];
        assert_eq!(*index, None);
        assert!(truncated.len() <= 256);
        let elided = 1000 - (256 - 64);
        assert!(
            truncated.ends_with(&format!("[truncated: {elided} bytes elided]")),
            "marker must state the elided byte count, got: {truncated}"
        );
    }

    #[test]
    fn truncation_respects_character_boundaries() {
        let policy = EmissionPolicy::new(100, false);
        // Three-byte characters: the keep boundary (100 - 64 = 36) divides
        // evenly; shift the limit so it does not.
        let policy_odd = EmissionPolicy::new(101, false);
        let content = "\u{2603}".repeat(60);

        for policy in [policy, policy_odd] {
            let events = policy.apply("m1", "call_1", &content);
            let out = contents(&events);
            assert!(out[0].1.is_char_boundary(0));
            // Constructing the String at all proves no split character; also
            // check the kept prefix is whole snowmen.
            let kept: &str = out[0].1.split('\n').next().unwrap();
            assert_eq!(kept.len() % 3, 0);
        }
    }
}
