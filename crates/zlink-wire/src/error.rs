use thiserror::Error;

/// Failures that can occur while decoding bytes off the wire.
///
/// These never reach a `zlink` user directly: the engine that owns the
/// decoder turns every variant into a connection teardown, and the socket
/// surfaces only a `disconnected` synthetic event for the affected
/// routing id.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireError {
    #[error("frame length {length} exceeds the configured maximum of {max}")]
    MessageTooLarge { length: u32, max: u32 },

    #[error("malformed frame: {0}")]
    Protocol(&'static str),
}

impl WireError {
    /// The errno-shaped code a C-ABI caller would see for this failure.
    #[must_use]
    pub const fn errno_like(self) -> &'static str {
        match self {
            WireError::MessageTooLarge { .. } => "EMSGSIZE",
            WireError::Protocol(_) => "EPROTO",
        }
    }
}
