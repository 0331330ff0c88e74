use std::io;

use thiserror::Error;

use zlink_wire::Message;

#[derive(Error, Debug)]
pub enum SocketError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    #[error("endpoint scheme {0:?} is not wired to a transport")]
    Unsupported(&'static str),

    #[error("endpoint {0:?} could not be parsed")]
    InvalidEndpoint(String),

    #[error("a routing id must be exactly 4 bytes, got {0}")]
    InvalidRoutingId(usize),

    #[error("no peer is attached with routing id {0}")]
    UnknownRoutingId(u32),

    #[error("peer is not currently writable; retry with the same message")]
    WouldBlock(Message),

    #[error("send sequence violation: {0}")]
    InvalidSendSequence(&'static str),

    #[error("the socket's I/O thread has shut down")]
    Closed,
}
