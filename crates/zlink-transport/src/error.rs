use std::io;

use thiserror::Error;

/// Failures a [`crate::Transport`] can report.
///
/// Ordinary non-blocking "no data yet" is not an error here: `try_read`
/// and `try_write` surface it as `Ok(0)`, the same convention
/// `std::io::Read`/`Write` use once `io::ErrorKind::WouldBlock` has been
/// filtered out. An `Ok(0)` from `try_read` is therefore ambiguous
/// between "would block" and "peer closed"; transports disambiguate by
/// reporting a closed peer through [`Transport::is_open`] instead.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("transport io error: {0}")]
    Io(#[from] io::Error),

    #[error("handshake failed: {0}")]
    HandshakeFailed(&'static str),

    #[error("endpoint scheme is not wired to a transport: {0}")]
    Unsupported(&'static str),
}
