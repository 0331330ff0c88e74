use std::net::SocketAddr;

use mio::{Interest, Registry, Token};

use crate::error::TransportError;

/// A non-blocking, byte-oriented connection.
///
/// This is the capability the stream engine needs and nothing more: it
/// reads and writes raw bytes, registers itself with a `mio::Poll`, and
/// reports whether it's still open. Framing, buffering and the
/// handshake protocol all live above this trait, not inside it, so a
/// TLS or WebSocket transport can be dropped in later without touching
/// the engine.
pub trait Transport: Send {
    /// `false` once the peer has closed the connection or a fatal I/O
    /// error has been observed.
    fn is_open(&self) -> bool;

    /// Whether [`Transport::try_handshake`] must be polled to completion
    /// before `try_read`/`try_write` may be called. Plain TCP has no
    /// handshake; [`crate::HandshakeTransport`] wraps a transport to add one.
    fn requires_handshake(&self) -> bool {
        false
    }

    /// Drive the handshake one step. Returns `Ok(true)` once complete,
    /// `Ok(false)` if it would block waiting for more I/O.
    fn try_handshake(&mut self) -> Result<bool, TransportError> {
        Ok(true)
    }

    /// Read available bytes into `buf`. `Ok(0)` means either "no data
    /// available right now" or "peer closed" — check [`Transport::is_open`]
    /// to tell them apart.
    fn try_read(&mut self, buf: &mut [u8]) -> Result<usize, TransportError>;

    /// Write as much of `buf` as the kernel will currently accept.
    /// `Ok(0)` means the write would block.
    fn try_write(&mut self, buf: &[u8]) -> Result<usize, TransportError>;

    fn peer_addr(&self) -> Option<SocketAddr>;

    fn register(&mut self, registry: &Registry, token: Token, interest: Interest) -> Result<(), TransportError>;
    fn reregister(&mut self, registry: &Registry, token: Token, interest: Interest) -> Result<(), TransportError>;
    fn deregister(&mut self, registry: &Registry) -> Result<(), TransportError>;

    fn close(&mut self);
}
