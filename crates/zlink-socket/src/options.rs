use std::time::Duration;

use crate::error::SocketError;

/// Floor for `send_buffer_limit`: a cap below this would make every send
/// round-trip the kernel for messages that would otherwise batch
/// together, mirroring the minimum a real async stream engine enforces
/// regardless of a smaller configured batch size.
const MIN_SEND_BUFFER_LIMIT: usize = zlink_engine::engine::MIN_SEND_BUFFER_LIMIT;

/// Tunables for a [`crate::StreamSocket`], set before `bind`/`connect`
/// and applied to every peer the socket subsequently attaches.
#[derive(Debug, Clone)]
pub struct SocketOptions {
    pub(crate) max_message_size: u32,
    pub(crate) handshake_timeout: Duration,
    pub(crate) send_buf_size: Option<usize>,
    pub(crate) recv_buf_size: Option<usize>,
    pub(crate) monitor_capacity: usize,
    pub(crate) routing_id: Option<[u8; 4]>,
    pub(crate) router_mandatory: bool,
    pub(crate) high_water_mark: usize,
    pub(crate) send_buffer_limit: usize,
}

impl Default for SocketOptions {
    fn default() -> Self {
        Self {
            max_message_size: zlink_wire::DEFAULT_MAX_MESSAGE_SIZE,
            handshake_timeout: Duration::from_secs(30),
            send_buf_size: None,
            recv_buf_size: None,
            monitor_capacity: 256,
            routing_id: None,
            router_mandatory: true,
            high_water_mark: 1024,
            send_buffer_limit: MIN_SEND_BUFFER_LIMIT,
        }
    }
}

impl SocketOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_max_message_size(mut self, bytes: u32) -> Self {
        self.max_message_size = bytes;
        self
    }

    #[must_use]
    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    /// Set kernel `SO_SNDBUF` for every peer this socket attaches.
    #[must_use]
    pub fn with_send_buf_size(mut self, bytes: usize) -> Self {
        self.send_buf_size = Some(bytes);
        self
    }

    /// Set kernel `SO_RCVBUF` for every peer this socket attaches.
    #[must_use]
    pub fn with_recv_buf_size(mut self, bytes: usize) -> Self {
        self.recv_buf_size = Some(bytes);
        self
    }

    #[must_use]
    pub fn with_monitor_capacity(mut self, capacity: usize) -> Self {
        self.monitor_capacity = capacity;
        self
    }

    /// Set the identity this socket reports as its own — distinct from
    /// a peer's routing id, which is always auto-assigned. Always
    /// exactly 4 bytes, the same width as the routing id field in the
    /// frame envelope.
    pub fn with_routing_id(mut self, rid: &[u8]) -> Result<Self, SocketError> {
        if rid.len() != 4 {
            return Err(SocketError::InvalidRoutingId(rid.len()));
        }
        let mut buf = [0u8; 4];
        buf.copy_from_slice(rid);
        self.routing_id = Some(buf);
        Ok(self)
    }

    /// Toggle strict routing. When `true` (the default), sending to a
    /// routing id with no attached peer fails with
    /// [`SocketError::UnknownRoutingId`] instead of being silently
    /// dropped.
    #[must_use]
    pub fn with_router_mandatory(mut self, mandatory: bool) -> Self {
        self.router_mandatory = mandatory;
        self
    }

    /// Cap on outstanding outbound messages queued per peer before a
    /// `send` to that peer reports backpressure instead of buffering
    /// further.
    #[must_use]
    pub fn with_high_water_mark(mut self, messages: usize) -> Self {
        self.high_water_mark = messages;
        self
    }

    /// Cap on bytes an engine will encode ahead of the kernel for one
    /// peer, floored the same way a 512 KiB minimum batch size is
    /// floored.
    #[must_use]
    pub fn with_send_buffer_limit(mut self, bytes: usize) -> Self {
        self.send_buffer_limit = bytes.max(MIN_SEND_BUFFER_LIMIT);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn routing_id_must_be_four_bytes() {
        assert!(SocketOptions::new().with_routing_id(b"abc").is_err());
        assert!(SocketOptions::new().with_routing_id(b"abcde").is_err());
        assert!(SocketOptions::new().with_routing_id(b"abcd").is_ok());
    }

    #[test]
    fn router_mandatory_defaults_to_strict() {
        assert!(SocketOptions::new().router_mandatory);
    }

    #[test]
    fn send_buffer_limit_is_floored() {
        let opts = SocketOptions::new().with_send_buffer_limit(1024);
        assert_eq!(opts.send_buffer_limit, MIN_SEND_BUFFER_LIMIT);
    }
}
