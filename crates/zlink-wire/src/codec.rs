//! The fast framing codec.
//!
//! Wire layout, 12 bytes preceding the payload:
//!
//! ```text
//! offset 0..3  length     BE32, bytes following the length field itself
//!                         (i.e. 8 + payload length)
//! offset 4     version    0x01
//! offset 5     kind       0x00 data | 0x01 connect | 0x02 disconnect
//! offset 6     magic0     0x5A ('Z')
//! offset 7     magic1     0x4C ('L')
//! offset 8..11 routing_id BE32
//! ```
//!
//! `length` counts bytes that follow the length prefix itself, not the
//! total record size; a decoder therefore needs exactly `length` further
//! bytes after the initial 4-byte read before a frame is complete.

use bytes::{Buf, Bytes, BytesMut};
use tracing::debug;

use crate::error::WireError;

pub const VERSION: u8 = 0x01;
pub const MAGIC: [u8; 2] = [0x5A, 0x4C];
/// Bytes following the length field: version + kind + magic0 + magic1 + rid.
const HEADER_AFTER_LENGTH: usize = 8;
/// Total prefix size: the 4-byte length field plus `HEADER_AFTER_LENGTH`.
pub const PREFIX_LEN: usize = 4 + HEADER_AFTER_LENGTH;
/// Sane default when a socket doesn't configure `max_message_size`.
pub const DEFAULT_MAX_MESSAGE_SIZE: u32 = 8 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FrameKind {
    Data = 0x00,
    Connect = 0x01,
    Disconnect = 0x02,
}

impl FrameKind {
    fn from_byte(b: u8) -> Result<Self, WireError> {
        match b {
            0x00 => Ok(FrameKind::Data),
            0x01 => Ok(FrameKind::Connect),
            0x02 => Ok(FrameKind::Disconnect),
            _ => Err(WireError::Protocol("unknown frame kind")),
        }
    }
}

/// A frame decoded off the wire: routing id plus the payload slice, still
/// borrowed from the decoder's shared buffer (zero-copy via `Bytes`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedFrame {
    pub kind: FrameKind,
    pub routing_id: u32,
    pub payload: Bytes,
}

/// Encode one frame into `out`, growing it as needed.
///
/// Writes a scratch header then the payload into one growable buffer,
/// so a caller encoding many frames back to back never reallocates per
/// frame.
///
/// # Panics
/// Panics if `payload.len()` doesn't fit in a `u32` minus the header —
/// callers must enforce `max_message_size` before calling this (the
/// codec itself has no opinion on limits when encoding, only decoding).
pub fn encode_into(out: &mut Vec<u8>, kind: FrameKind, routing_id: u32, payload: &[u8]) {
    let length = u32::try_from(HEADER_AFTER_LENGTH + payload.len())
        .expect("payload too large to encode into a u32 length field");
    out.reserve(PREFIX_LEN + payload.len());
    out.extend_from_slice(&length.to_be_bytes());
    out.push(VERSION);
    out.push(kind as u8);
    out.extend_from_slice(&MAGIC);
    out.extend_from_slice(&routing_id.to_be_bytes());
    out.extend_from_slice(payload);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DecodeState {
    /// Waiting for the 4-byte length prefix.
    Header,
    /// Waiting for `remaining` more bytes of the post-length header + payload.
    Body { length: u32 },
}

/// A pull-parser decoder: a two-state loop (reading the length prefix,
/// then reading the rest of the frame) that survives being fed however
/// many bytes a single non-blocking read happens to return.
///
/// Consumers append newly-read bytes via [`Decoder::decode_from`], which
/// returns every frame that became complete. Partial frames remain
/// buffered across calls; frames always come out in the order their
/// bytes arrived.
pub struct Decoder {
    buf: BytesMut,
    state: DecodeState,
    max_message_size: u32,
}

impl Decoder {
    #[must_use]
    pub fn new(max_message_size: u32) -> Self {
        Self { buf: BytesMut::new(), state: DecodeState::Header, max_message_size }
    }

    #[must_use]
    pub fn max_message_size(&self) -> u32 {
        self.max_message_size
    }

    /// Feed freshly-read bytes and pull out every frame that is now complete.
    ///
    /// On a protocol violation this returns `Err` and the decoder must be
    /// discarded — the caller tears the connection down, it never tries
    /// to resynchronize mid-stream.
    pub fn decode_from(&mut self, bytes: &[u8]) -> Result<Vec<DecodedFrame>, WireError> {
        self.buf.extend_from_slice(bytes);
        let mut out = Vec::new();
        loop {
            match self.state {
                DecodeState::Header => {
                    if self.buf.len() < 4 {
                        break;
                    }
                    let length = u32::from_be_bytes(self.buf[..4].try_into().unwrap());
                    if length < HEADER_AFTER_LENGTH as u32 {
                        return Err(WireError::Protocol("length shorter than the fixed header"));
                    }
                    let max_total = self.max_message_size.saturating_add(HEADER_AFTER_LENGTH as u32);
                    if length > max_total {
                        return Err(WireError::MessageTooLarge { length, max: self.max_message_size });
                    }
                    self.buf.advance(4);
                    self.state = DecodeState::Body { length };
                }
                DecodeState::Body { length } => {
                    let need = length as usize;
                    if self.buf.len() < need {
                        break;
                    }
                    let frame = self.parse_body(need)?;
                    out.push(frame);
                    self.state = DecodeState::Header;
                }
            }
        }
        Ok(out)
    }

    fn parse_body(&mut self, need: usize) -> Result<DecodedFrame, WireError> {
        let body = self.buf.split_to(need).freeze();

        if body[0] != VERSION {
            return Err(WireError::Protocol("unsupported version"));
        }
        let kind = FrameKind::from_byte(body[1])?;
        if body[2] != MAGIC[0] || body[3] != MAGIC[1] {
            return Err(WireError::Protocol("bad magic bytes"));
        }
        let routing_id = u32::from_be_bytes(body[4..8].try_into().unwrap());
        let payload = body.slice(8..);
        if payload.is_empty() {
            debug!(rid = routing_id, ?kind, "rejecting zero-length payload");
            return Err(WireError::Protocol("zero-length payload"));
        }

        Ok(DecodedFrame { kind, routing_id, payload })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(kind: FrameKind, rid: u32, payload: &[u8]) -> DecodedFrame {
        let mut buf = Vec::new();
        encode_into(&mut buf, kind, rid, payload);
        let mut dec = Decoder::new(DEFAULT_MAX_MESSAGE_SIZE);
        let mut frames = dec.decode_from(&buf).unwrap();
        assert_eq!(frames.len(), 1);
        frames.remove(0)
    }

    #[test]
    fn encodes_expected_prefix_length() {
        let mut buf = Vec::new();
        encode_into(&mut buf, FrameKind::Data, 7, b"hi");
        assert_eq!(buf.len(), PREFIX_LEN + 2);
        let length = u32::from_be_bytes(buf[0..4].try_into().unwrap());
        // length counts bytes after the length field: 8 header bytes + payload.
        assert_eq!(length, 10);
    }

    #[test]
    fn round_trip_data_frame() {
        let frame = roundtrip(FrameKind::Data, 42, b"hello world");
        assert_eq!(frame.kind, FrameKind::Data);
        assert_eq!(frame.routing_id, 42);
        assert_eq!(&frame.payload[..], b"hello world");
    }

    #[test]
    fn decoder_buffers_partial_header() {
        let mut buf = Vec::new();
        encode_into(&mut buf, FrameKind::Data, 1, b"abc");
        let mut dec = Decoder::new(DEFAULT_MAX_MESSAGE_SIZE);

        let frames = dec.decode_from(&buf[..2]).unwrap();
        assert!(frames.is_empty());
        let frames = dec.decode_from(&buf[2..]).unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(&frames[0].payload[..], b"abc");
    }

    #[test]
    fn decoder_buffers_partial_payload() {
        let mut buf = Vec::new();
        encode_into(&mut buf, FrameKind::Data, 1, b"abcdef");
        let mut dec = Decoder::new(DEFAULT_MAX_MESSAGE_SIZE);

        let split = PREFIX_LEN + 3;
        let frames = dec.decode_from(&buf[..split]).unwrap();
        assert!(frames.is_empty());
        let frames = dec.decode_from(&buf[split..]).unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(&frames[0].payload[..], b"abcdef");
    }

    #[test]
    fn decoder_parses_multiple_frames_in_one_read() {
        let mut buf = Vec::new();
        encode_into(&mut buf, FrameKind::Data, 1, b"one");
        encode_into(&mut buf, FrameKind::Data, 2, b"two");
        let mut dec = Decoder::new(DEFAULT_MAX_MESSAGE_SIZE);
        let frames = dec.decode_from(&buf).unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].routing_id, 1);
        assert_eq!(frames[1].routing_id, 2);
    }

    #[test]
    fn rejects_oversized_frame() {
        let mut dec = Decoder::new(4);
        let mut buf = Vec::new();
        encode_into(&mut buf, FrameKind::Data, 1, b"12345");
        let err = dec.decode_from(&buf).unwrap_err();
        assert_eq!(err.errno_like(), "EMSGSIZE");
    }

    #[test]
    fn rejects_zero_length_payload() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&(HEADER_AFTER_LENGTH as u32).to_be_bytes());
        buf.push(VERSION);
        buf.push(FrameKind::Data as u8);
        buf.extend_from_slice(&MAGIC);
        buf.extend_from_slice(&1u32.to_be_bytes());
        let mut dec = Decoder::new(DEFAULT_MAX_MESSAGE_SIZE);
        let err = dec.decode_from(&buf).unwrap_err();
        assert_eq!(err.errno_like(), "EPROTO");
    }

    #[test]
    fn rejects_bad_magic() {
        let mut buf = Vec::new();
        encode_into(&mut buf, FrameKind::Data, 1, b"x");
        buf[6] = 0; // corrupt magic0
        let mut dec = Decoder::new(DEFAULT_MAX_MESSAGE_SIZE);
        let err = dec.decode_from(&buf).unwrap_err();
        assert_eq!(err.errno_like(), "EPROTO");
    }

    #[test]
    fn rejects_unknown_kind() {
        let mut buf = Vec::new();
        encode_into(&mut buf, FrameKind::Data, 1, b"x");
        buf[5] = 0x7F;
        let mut dec = Decoder::new(DEFAULT_MAX_MESSAGE_SIZE);
        let err = dec.decode_from(&buf).unwrap_err();
        assert_eq!(err.errno_like(), "EPROTO");
    }

    #[test]
    fn connect_and_disconnect_kinds_round_trip() {
        let frame = roundtrip(FrameKind::Connect, 5, b"\x01");
        assert_eq!(frame.kind, FrameKind::Connect);
        let frame = roundtrip(FrameKind::Disconnect, 5, b"\x00");
        assert_eq!(frame.kind, FrameKind::Disconnect);
    }
}
