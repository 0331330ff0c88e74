use thiserror::Error;

use zlink_wire::WireError;

/// Why an engine tore a connection down, handed to
/// [`crate::Session::engine_error`] so the owning socket can turn it
/// into the right monitor event.
#[derive(Error, Debug, Clone)]
pub enum EngineError {
    #[error("protocol violation: {0}")]
    Protocol(#[from] WireError),

    #[error("handshake did not complete before the deadline")]
    Timeout,

    #[error("connection error: {0}")]
    Connection(String),
}
