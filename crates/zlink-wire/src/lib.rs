//! Framing codec and message value for the zlink STREAM wire protocol.
//!
//! This crate has no knowledge of sockets, transports, or event loops —
//! it only turns bytes into [`codec::DecodedFrame`]s and back, and holds
//! the [`Message`] value type that the rest of zlink passes around.

pub mod codec;
pub mod error;
pub mod message;

pub use codec::{DecodedFrame, Decoder, FrameKind, DEFAULT_MAX_MESSAGE_SIZE, PREFIX_LEN};
pub use error::WireError;
pub use message::{Message, MessageFlags};
