use std::net::SocketAddr;
use std::str::FromStr;
use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, Sender};

use zlink_monitor::{MonitorEvent, MonitorSink};
use zlink_wire::Message;

use crate::endpoint::Endpoint;
use crate::error::SocketError;
use crate::events::{Command, SocketEvent};
use crate::io_thread::IoThread;
use crate::options::SocketOptions;

const EVENTS_CAPACITY: usize = 4096;

/// A pending two-frame delivery: the routing-id frame has already been
/// returned from `recv`, and this is the data frame still owed before
/// the next `recv` may start a new delivery. A synthetic connect or
/// disconnect notification carries a single code byte as its second
/// frame (`0x01`/`0x00`) rather than an empty one, matching what a peer
/// talking raw wire would see.
enum PendingSecondFrame {
    Data(Message),
    Code(u8),
}

const STREAM_EVENT_CONNECT: u8 = 0x01;
const STREAM_EVENT_DISCONNECT: u8 = 0x00;

/// The user-facing STREAM socket handle.
///
/// Connections are driven on a dedicated background thread; this type
/// is just a thin, cheaply-clonable-by-construction front end posting
/// [`Command`]s to it and draining [`SocketEvent`]s from it. Every
/// delivery follows the two-frame contract: a `recv` first returns the
/// peer's routing id, then the payload (or an empty payload for a
/// synthetic connect/disconnect notification).
pub struct StreamSocket {
    commands: Sender<Command>,
    events: Receiver<SocketEvent>,
    io_thread: Option<JoinHandle<()>>,
    pending_second_frame: Option<PendingSecondFrame>,
    /// The routing id a `send` rid-frame named, awaiting its payload
    /// frame to complete the two-frame contract.
    pending_send: Option<u32>,
    monitor_rx: Receiver<MonitorEvent>,
    local_routing_id: Option<[u8; 4]>,
}

impl StreamSocket {
    /// Start the socket's I/O thread. No connections are made until
    /// `bind` or `connect` is called.
    pub fn new(options: SocketOptions) -> std::io::Result<Self> {
        let (commands_tx, commands_rx) = crossbeam_channel::unbounded();
        let (events_tx, events_rx) = crossbeam_channel::bounded(EVENTS_CAPACITY);
        let (monitor, monitor_rx) = MonitorSink::channel(options.monitor_capacity);
        let local_routing_id = options.routing_id;

        let io_thread = IoThread::new(commands_rx, events_tx, monitor, options)?;
        let handle = std::thread::Builder::new()
            .name("zlink-io".to_string())
            .spawn(move || {
                if let Some(core) = core_affinity::get_core_ids().and_then(|ids| ids.into_iter().next()) {
                    core_affinity::set_for_current(core);
                }
                io_thread.run();
            })?;

        Ok(Self {
            commands: commands_tx,
            events: events_rx,
            io_thread: Some(handle),
            pending_second_frame: None,
            pending_send: None,
            monitor_rx,
            local_routing_id,
        })
    }

    /// The identity this socket reports as its own, if one was
    /// configured via [`SocketOptions::with_routing_id`]. Distinct from
    /// any peer's routing id, which is always auto-assigned.
    #[must_use]
    pub fn local_routing_id(&self) -> Option<[u8; 4]> {
        self.local_routing_id
    }

    pub fn bind(&self, endpoint: &str) -> Result<SocketAddr, SocketError> {
        let endpoint = Endpoint::from_str(endpoint)?;
        let (reply_tx, reply_rx) = crossbeam_channel::bounded(1);
        self.commands
            .send(Command::Bind { endpoint, reply: reply_tx })
            .map_err(|_| SocketError::Closed)?;
        reply_rx.recv().map_err(|_| SocketError::Closed)?
    }

    pub fn connect(&self, endpoint: &str) -> Result<(), SocketError> {
        let endpoint = Endpoint::from_str(endpoint)?;
        let (reply_tx, reply_rx) = crossbeam_channel::bounded(1);
        self.commands.send(Command::Connect { endpoint, reply: reply_tx }).map_err(|_| SocketError::Closed)?;
        reply_rx.recv().map_err(|_| SocketError::Closed)?
    }

    /// Advance the two-frame send contract by one frame.
    ///
    /// The first call per delivery must carry the target's routing id
    /// as a 4-byte payload with `more` set — anything else without
    /// `more` is a no-op (there's nothing to address it to), and a
    /// `more`-flagged frame of the wrong length is
    /// [`SocketError::InvalidSendSequence`]. The second call is the
    /// payload; a single `0x00` byte there doesn't send data at all, it
    /// tears that peer's connection down (the wire equivalent of a
    /// peer going away).
    pub fn send(&mut self, frame: Message) -> Result<(), SocketError> {
        match self.pending_send.take() {
            None => {
                if !frame.more() {
                    return Ok(());
                }
                if frame.payload().len() != 4 {
                    return Err(SocketError::InvalidSendSequence(
                        "routing-id frame must be exactly 4 bytes",
                    ));
                }
                let routing_id = u32::from_be_bytes(frame.payload()[..4].try_into().unwrap());
                self.pending_send = Some(routing_id);
                Ok(())
            }
            Some(routing_id) => {
                if frame.payload().len() == 1 && frame.payload()[0] == STREAM_EVENT_DISCONNECT {
                    let _ = self.commands.send(Command::ClosePeer { routing_id });
                    return Ok(());
                }
                let (reply_tx, reply_rx) = crossbeam_channel::bounded(1);
                self.commands
                    .send(Command::Send { routing_id, message: frame, reply: reply_tx })
                    .map_err(|_| SocketError::Closed)?;
                reply_rx.recv().map_err(|_| SocketError::Closed)?
            }
        }
    }

    /// Receive the next frame. Returns `None` if nothing is queued right
    /// now; callers poll this the same way they'd poll a non-blocking
    /// socket.
    pub fn recv(&mut self) -> Option<Message> {
        if let Some(pending) = self.pending_second_frame.take() {
            return Some(match pending {
                PendingSecondFrame::Data(msg) => msg,
                PendingSecondFrame::Code(code) => Message::from(&[code][..]),
            });
        }

        match self.events.try_recv().ok()? {
            SocketEvent::Message { routing_id, message } => {
                self.pending_second_frame = Some(PendingSecondFrame::Data(message));
                Some(Message::routing_id_frame(routing_id))
            }
            SocketEvent::PipeAttached { routing_id, .. } => {
                self.pending_second_frame = Some(PendingSecondFrame::Code(STREAM_EVENT_CONNECT));
                Some(Message::routing_id_frame(routing_id))
            }
            SocketEvent::PipeDetached { routing_id, .. } => {
                self.pending_second_frame = Some(PendingSecondFrame::Code(STREAM_EVENT_DISCONNECT));
                Some(Message::routing_id_frame(routing_id))
            }
        }
    }

    /// Tell the engine for `routing_id` it may resume reading after a
    /// previous `recv` backlog caused it to stop.
    pub fn restart_input(&self, routing_id: u32) {
        let _ = self.commands.send(Command::RestartInput { routing_id });
    }

    #[must_use]
    pub fn monitor(&self) -> &Receiver<MonitorEvent> {
        &self.monitor_rx
    }
}

impl Drop for StreamSocket {
    fn drop(&mut self) {
        let _ = self.commands.send(Command::Shutdown);
        if let Some(handle) = self.io_thread.take() {
            let _ = handle.join();
        }
    }
}
