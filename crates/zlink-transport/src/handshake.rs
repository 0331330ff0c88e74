use std::net::SocketAddr;

use mio::{Interest, Registry, Token};

use crate::error::TransportError;
use crate::transport::Transport;

/// A pluggable handshake protocol layered on top of a [`Transport`].
///
/// TLS and WebSocket upgrades are the two concrete cases this seam
/// exists for; neither is implemented here, but [`HandshakeTransport`]
/// is where a future handshake type plugs in without changing the
/// engine, the wire codec, or the socket above it.
pub trait Handshake<T: Transport>: Send {
    /// Drive the handshake one non-blocking step. Returns `Ok(true)`
    /// once the handshake has completed and ordinary framed I/O may
    /// begin, `Ok(false)` if it needs another poll cycle.
    fn step(&mut self, transport: &mut T) -> Result<bool, TransportError>;
}

/// A handshake that completes immediately — used in tests and for any
/// transport that genuinely has no negotiation step, so the engine
/// doesn't need a separate "no handshake" code path.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullHandshake;

impl<T: Transport> Handshake<T> for NullHandshake {
    fn step(&mut self, _transport: &mut T) -> Result<bool, TransportError> {
        Ok(true)
    }
}

/// Wraps a transport with a handshake that must complete before normal
/// reads and writes are allowed through.
pub struct HandshakeTransport<T, H> {
    inner: T,
    handshake: H,
    complete: bool,
}

impl<T: Transport, H: Handshake<T>> HandshakeTransport<T, H> {
    pub fn new(inner: T, handshake: H) -> Self {
        Self { inner, handshake, complete: false }
    }

    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl<T: Transport, H: Handshake<T>> Transport for HandshakeTransport<T, H> {
    fn is_open(&self) -> bool {
        self.inner.is_open()
    }

    fn requires_handshake(&self) -> bool {
        true
    }

    fn try_handshake(&mut self) -> Result<bool, TransportError> {
        if self.complete {
            return Ok(true);
        }
        let done = self.handshake.step(&mut self.inner)?;
        self.complete = done;
        Ok(done)
    }

    fn try_read(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
        self.inner.try_read(buf)
    }

    fn try_write(&mut self, buf: &[u8]) -> Result<usize, TransportError> {
        self.inner.try_write(buf)
    }

    fn peer_addr(&self) -> Option<SocketAddr> {
        self.inner.peer_addr()
    }

    fn register(&mut self, registry: &Registry, token: Token, interest: Interest) -> Result<(), TransportError> {
        self.inner.register(registry, token, interest)
    }

    fn reregister(&mut self, registry: &Registry, token: Token, interest: Interest) -> Result<(), TransportError> {
        self.inner.reregister(registry, token, interest)
    }

    fn deregister(&mut self, registry: &Registry) -> Result<(), TransportError> {
        self.inner.deregister(registry)
    }

    fn close(&mut self) {
        self.inner.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{TcpListener, TcpStream as StdTcpStream};

    use crate::tcp::PlainTcpTransport;

    fn loopback_pair() -> (PlainTcpTransport, PlainTcpTransport) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let client = StdTcpStream::connect(addr).unwrap();
        let (server, peer) = listener.accept().unwrap();
        client.set_nonblocking(true).unwrap();
        server.set_nonblocking(true).unwrap();
        let client = PlainTcpTransport::new(mio::net::TcpStream::from_std(client), peer).unwrap();
        let server = PlainTcpTransport::new(mio::net::TcpStream::from_std(server), addr).unwrap();
        (client, server)
    }

    #[test]
    fn null_handshake_completes_on_first_step() {
        let (tcp, _peer) = loopback_pair();
        let mut transport = HandshakeTransport::new(tcp, NullHandshake);
        assert!(transport.requires_handshake());
        assert!(transport.try_handshake().unwrap());
    }
}
