use zlink_wire::Message;

/// Flows from the I/O thread to [`crate::StreamSocket::recv`].
///
/// `PipeAttached`/`PipeDetached` are the synthetic notifications a
/// STREAM socket delivers for every connect/disconnect; `Message` is an
/// ordinary payload that arrived off the wire.
pub enum SocketEvent {
    PipeAttached { routing_id: u32, endpoint: String },
    PipeDetached { routing_id: u32, endpoint: String },
    Message { routing_id: u32, message: Message },
}

/// Requests flowing from [`crate::StreamSocket`]'s public handle to its
/// I/O thread.
pub enum Command {
    Connect {
        endpoint: crate::Endpoint,
        reply: crossbeam_channel::Sender<Result<(), crate::SocketError>>,
    },
    Bind {
        endpoint: crate::Endpoint,
        reply: crossbeam_channel::Sender<Result<std::net::SocketAddr, crate::SocketError>>,
    },
    Send {
        routing_id: u32,
        message: Message,
        reply: crossbeam_channel::Sender<Result<(), crate::SocketError>>,
    },
    /// A single `0x00` payload byte on the second frame of a send asks
    /// the socket to tear that peer's connection down rather than
    /// deliver the byte as data — the wire equivalent of hanging up.
    ClosePeer {
        routing_id: u32,
    },
    RestartInput {
        routing_id: u32,
    },
    Shutdown,
}
