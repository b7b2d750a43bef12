use crate::TransportError;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use weft_protocol::Event;

/// Wire framing applied to serialized events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FrameCodec {
    /// Server-sent-events text framing: `data: <JSON>\n\n` per event.
    #[default]
    Sse,
    /// Length-prefixed binary framing: 4-byte big-endian unsigned payload
    /// length followed by the payload.
    Binary,
}

impl FrameCodec {
    /// Media type negotiated for the SSE framing.
    pub const SSE_MEDIA_TYPE: &'static str = "text/event-stream";
    /// Media type negotiated for the binary framing.
    pub const BINARY_MEDIA_TYPE: &'static str = "application/vnd.weft.event-stream";

    pub const fn media_type(self) -> &'static str {
        match self {
            Self::Sse => Self::SSE_MEDIA_TYPE,
            Self::Binary => Self::BINARY_MEDIA_TYPE,
        }
    }

    /// Serialize and frame one event.
    pub fn encode(self, event: &Event) -> Result<Bytes, TransportError> {
        let payload = serde_json::to_vec(event).map_err(|e| TransportError::Codec(e.to_string()))?;
        match self {
            Self::Sse => {
                let mut buf = BytesMut::with_capacity(payload.len() + 8);
                buf.extend_from_slice(b"data: ");
                buf.extend_from_slice(&payload);
                buf.extend_from_slice(b"\n\n");
                Ok(buf.freeze())
            }
            Self::Binary => {
                let len = u32::try_from(payload.len())
                    .map_err(|_| TransportError::Codec("event exceeds u32 frame length".into()))?;
                let mut buf = BytesMut::with_capacity(payload.len() + 4);
                buf.put_u32(len);
                buf.extend_from_slice(&payload);
                Ok(buf.freeze())
            }
        }
    }

    /// Decode one binary frame from the front of `buf`, if complete.
    ///
    /// Returns `None` when the buffer does not yet hold a full frame;
    /// consumed bytes are split off the buffer.
    pub fn decode_binary(buf: &mut BytesMut) -> Result<Option<Event>, TransportError> {
        if buf.len() < 4 {
            return Ok(None);
        }
        let len = u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]) as usize;
        if buf.len() < 4 + len {
            return Ok(None);
        }
        buf.advance(4);
        let payload = buf.split_to(len);
        serde_json::from_slice(&payload)
            .map(Some)
            .map_err(|e| TransportError::Codec(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sse_frame_shape() {
        let frame = FrameCodec::Sse
            .encode(&Event::text_message_end("m1"))
            .unwrap();
        let text = std::str::from_utf8(&frame).unwrap();
        assert!(text.starts_with("data: {"));
        assert!(text.ends_with("}\n\n"));
        assert!(text.contains("\"type\":\"TEXT_MESSAGE_END\""));
    }

    #[test]
    fn binary_frame_round_trips_with_big_endian_length() {
        let event = Event::tool_call_args("call_1", "{\"q\":\"x\"}");
        let frame = FrameCodec::Binary.encode(&event).unwrap();

        let payload_len = frame.len() - 4;
        assert_eq!(
            u32::from_be_bytes([frame[0], frame[1], frame[2], frame[3]]) as usize,
            payload_len
        );

        let mut buf = BytesMut::from(&frame[..]);
        let decoded = FrameCodec::decode_binary(&mut buf)
            .unwrap()
            .expect("complete frame must decode");
        assert_eq!(decoded, event);
        assert!(buf.is_empty());
    }

    #[test]
    fn decode_binary_waits_for_complete_frame() {
        let event = Event::step_started("step_1");
        let frame = FrameCodec::Binary.encode(&event).unwrap();

        let mut partial = BytesMut::from(&frame[..frame.len() - 1]);
        assert!(FrameCodec::decode_binary(&mut partial).unwrap().is_none());

        partial.extend_from_slice(&frame[frame.len() - 1..]);
        assert_eq!(
            FrameCodec::decode_binary(&mut partial).unwrap(),
            Some(event)
        );
    }

    #[test]
    fn media_types_are_distinct() {
        assert_eq!(FrameCodec::Sse.media_type(), "text/event-stream");
        assert_eq!(
            FrameCodec::Binary.media_type(),
            "application/vnd.weft.event-stream"
        );
    }
}
