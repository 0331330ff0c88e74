//! Non-blocking byte-stream transports for the zlink engine.
//!
//! `Transport` is the narrow capability the engine needs: register with
//! a `mio::Poll`, read and write raw bytes, report open/closed. Framing
//! lives in `zlink-wire`, connection state machinery lives in
//! `zlink-engine`; this crate only ever moves bytes.

pub mod error;
pub mod handshake;
pub mod tcp;
pub mod transport;

pub use error::TransportError;
pub use handshake::{Handshake, HandshakeTransport, NullHandshake};
pub use tcp::PlainTcpTransport;
pub use transport::Transport;
