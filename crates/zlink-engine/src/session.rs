use zlink_wire::Message;

use crate::error::EngineError;

/// The engine's collaborator on the other side of a connection.
///
/// An `Engine` never touches sockets belonging to other peers and never
/// decides what happens to a message once it's delivered — that's the
/// job of whatever implements `Session`, typically one pipe endpoint
/// owned by a socket's routing table.
pub trait Session: Send {
    /// Deliver a message that arrived off the wire. If the session's
    /// inbound queue is full, returns the message back in `Err` so the
    /// engine can park it; the engine then stops reading until the
    /// socket explicitly restarts input, at which point the parked
    /// message is retried before any new bytes are read.
    fn push(&mut self, message: Message) -> Result<(), Message>;

    /// Take the next message queued for send, if any.
    fn pull(&mut self) -> Option<Message>;

    /// Called after a batch of `pull()`-sourced messages has been
    /// handed to the transport, so the session can release any
    /// backpressure it was applying.
    fn flush(&mut self) {}

    /// The engine is tearing the connection down.
    fn engine_error(&mut self, was_handshaking: bool, reason: EngineError);
}
