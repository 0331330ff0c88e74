//! A STREAM socket, its length-prefixed wire codec, and the reactor
//! that drives both over TCP.
//!
//! ```no_run
//! use zlink::{Message, SocketOptions, StreamSocket};
//!
//! let mut socket = StreamSocket::new(SocketOptions::new())?;
//! socket.connect("tcp://127.0.0.1:5555")?;
//!
//! // The first frame of every delivery carries the peer's routing id,
//! // the second its payload (a single status byte for a connect/
//! // disconnect notice).
//! if let Some(rid_frame) = socket.recv() {
//!     let routing_id = u32::from_be_bytes(rid_frame.payload()[..4].try_into().unwrap());
//!     let _payload = socket.recv();
//!     socket.send(Message::routing_id_frame(routing_id))?;
//!     socket.send(Message::from(&b"hello"[..]))?;
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

extern crate self as zlink;

pub use zlink_engine as engine;
pub use zlink_monitor as monitor;
pub use zlink_time as time;
pub use zlink_transport as transport;
pub use zlink_wire as wire;
pub use tracing;

pub use zlink_monitor::{MonitorEvent, MonitorSink};
pub use zlink_socket::{Endpoint, RoutingTable, SocketError, SocketEvent, SocketOptions, StreamSocket};
pub use zlink_transport::{Handshake, HandshakeTransport, NullHandshake, PlainTcpTransport, Transport, TransportError};
pub use zlink_wire::{DecodedFrame, Decoder, FrameKind, Message, MessageFlags, WireError};
