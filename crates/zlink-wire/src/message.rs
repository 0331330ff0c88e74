use bitflags::bitflags;
use bytes::Bytes;

bitflags! {
    /// Flags carried alongside a message.
    ///
    /// Only `MORE` is meaningful today; the bitset exists (rather than a
    /// bare `bool`) because the wire envelope and the socket's multipart
    /// contract both key off it the same way the original `more` flag does.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct MessageFlags: u8 {
        const MORE = 0b0000_0001;
    }
}

/// An owned, move-only message value.
///
/// `Bytes` is already atomically refcounted and cheap to clone: handing
/// the same payload to several consumers never copies, and the backing
/// allocation is freed exactly when the last handle drops it. Routing id
/// is attribute data, not payload: the codec sets it on decode, the
/// socket sets it before a send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    payload: Bytes,
    flags: MessageFlags,
    routing_id: Option<u32>,
}

impl Message {
    #[must_use]
    pub fn new(payload: Bytes) -> Self {
        Self { payload, flags: MessageFlags::empty(), routing_id: None }
    }

    #[must_use]
    pub fn from_static(bytes: &'static [u8]) -> Self {
        Self::new(Bytes::from_static(bytes))
    }

    #[must_use]
    pub fn empty() -> Self {
        Self::new(Bytes::new())
    }

    /// Build the routing-id frame a STREAM delivery always leads with:
    /// the 4-byte id, flagged `MORE` so a receiver knows a payload frame
    /// follows.
    #[must_use]
    pub fn routing_id_frame(routing_id: u32) -> Self {
        let mut msg = Self::new(Bytes::copy_from_slice(&routing_id.to_be_bytes()));
        msg.set_more(true);
        msg.set_routing_id(routing_id);
        msg
    }

    #[must_use]
    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    #[must_use]
    pub fn into_payload(self) -> Bytes {
        self.payload
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    #[must_use]
    pub fn more(&self) -> bool {
        self.flags.contains(MessageFlags::MORE)
    }

    pub fn set_more(&mut self, more: bool) {
        self.flags.set(MessageFlags::MORE, more);
    }

    #[must_use]
    pub fn routing_id(&self) -> Option<u32> {
        self.routing_id
    }

    pub fn set_routing_id(&mut self, rid: u32) {
        self.routing_id = Some(rid);
    }

    #[must_use]
    pub fn flags(&self) -> MessageFlags {
        self.flags
    }
}

impl From<Vec<u8>> for Message {
    fn from(value: Vec<u8>) -> Self {
        Self::new(Bytes::from(value))
    }
}

impl From<&[u8]> for Message {
    fn from(value: &[u8]) -> Self {
        Self::new(Bytes::copy_from_slice(value))
    }
}
