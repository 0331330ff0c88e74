use std::io::{self, Read, Write};
use std::net::SocketAddr;
use std::os::fd::AsRawFd;

use mio::{Interest, Registry, Token};
use tracing::debug;

use crate::error::TransportError;
use crate::transport::Transport;

/// A plain, unencrypted TCP connection.
///
/// Raw byte shuttling only — no framing, no backlog, no handshake. The
/// engine above this type owns the decoder, the send buffers and the
/// read/write-pending bookkeeping; this type's whole job is turning
/// `mio::net::TcpStream` into the [`Transport`] trait.
pub struct PlainTcpTransport {
    stream: mio::net::TcpStream,
    peer_addr: SocketAddr,
    open: bool,
}

impl PlainTcpTransport {
    #[must_use]
    pub fn new(stream: mio::net::TcpStream, peer_addr: SocketAddr) -> io::Result<Self> {
        stream.set_nodelay(true)?;
        Ok(Self { stream, peer_addr, open: true })
    }

    /// Set kernel `SO_SNDBUF` on the underlying socket.
    pub fn set_send_buf_size(&self, size: usize) {
        self.setsockopt(libc::SO_SNDBUF, size);
    }

    /// Set kernel `SO_RCVBUF` on the underlying socket.
    pub fn set_recv_buf_size(&self, size: usize) {
        self.setsockopt(libc::SO_RCVBUF, size);
    }

    fn setsockopt(&self, name: libc::c_int, size: usize) {
        let fd = self.stream.as_raw_fd();
        let size = size as libc::c_int;
        unsafe {
            libc::setsockopt(
                fd,
                libc::SOL_SOCKET,
                name,
                std::ptr::addr_of!(size).cast(),
                core::mem::size_of::<libc::c_int>() as libc::socklen_t,
            );
        }
    }
}

impl Transport for PlainTcpTransport {
    fn is_open(&self) -> bool {
        self.open
    }

    fn try_read(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
        match self.stream.read(buf) {
            Ok(0) => {
                self.open = false;
                Ok(0)
            }
            Ok(n) => Ok(n),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(0),
            Err(e) => {
                debug!(err = ?e, "tcp transport read error");
                self.open = false;
                Err(TransportError::Io(e))
            }
        }
    }

    fn try_write(&mut self, buf: &[u8]) -> Result<usize, TransportError> {
        match self.stream.write(buf) {
            Ok(0) if !buf.is_empty() => {
                self.open = false;
                Ok(0)
            }
            Ok(n) => Ok(n),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(0),
            Err(e) => {
                debug!(err = ?e, "tcp transport write error");
                self.open = false;
                Err(TransportError::Io(e))
            }
        }
    }

    fn peer_addr(&self) -> Option<SocketAddr> {
        Some(self.peer_addr)
    }

    fn register(&mut self, registry: &Registry, token: Token, interest: Interest) -> Result<(), TransportError> {
        registry.register(&mut self.stream, token, interest).map_err(Into::into)
    }

    fn reregister(&mut self, registry: &Registry, token: Token, interest: Interest) -> Result<(), TransportError> {
        registry.reregister(&mut self.stream, token, interest).map_err(Into::into)
    }

    fn deregister(&mut self, registry: &Registry) -> Result<(), TransportError> {
        registry.deregister(&mut self.stream).map_err(Into::into)
    }

    fn close(&mut self) {
        debug!(peer = %self.peer_addr, "closing tcp transport");
        let _ = self.stream.shutdown(std::net::Shutdown::Both);
        self.open = false;
    }
}
