use std::collections::VecDeque;

use mio::event::Event;
use mio::{Interest, Registry, Token};
use tracing::{debug, trace, warn};

use zlink_time::Deadline;
use zlink_transport::{Transport, TransportError};
use zlink_wire::{DecodedFrame, Decoder, FrameKind, Message};

use crate::error::EngineError;
use crate::session::Session;

const INITIAL_RECV_BUF: usize = 4 * 1024;
const MAX_RECV_BUF: usize = 64 * 1024;
/// Floor for a configured send buffer cap, mirroring the 512 KiB minimum
/// a real async stream engine enforces regardless of a smaller batch
/// size — a cap below this would make every send round-trip the kernel
/// for messages that would otherwise batch together.
pub const MIN_SEND_BUFFER_LIMIT: usize = 512 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Idle,
    Handshaking,
    Running,
    Terminating,
}

/// Bridges a [`Transport`] to a [`Session`] through the wire codec.
///
/// One engine owns exactly one connection. It holds the receive scratch
/// buffer and decoder, the two-buffer send discipline (`send_buffer_main`
/// collects what the session hands it, `send_buffer_flush` is what's
/// actually in flight to the kernel), and the handshake/backpressure
/// bookkeeping that used to live inline in a single `poll_with` loop —
/// here split so a reactor can drive many engines off one `mio::Poll`.
pub struct Engine<T: Transport> {
    transport: T,
    session: Box<dyn Session>,
    decoder: Decoder,
    state: EngineState,
    local_routing_id: u32,

    recv_buf: Vec<u8>,
    send_buffer_main: Vec<u8>,
    send_buffer_flush: Vec<u8>,
    flush_cursor: usize,
    send_buffer_limit: usize,

    /// Frames already pulled off the wire and decoded but not yet
    /// handed to the session, because an earlier frame from the same
    /// read parked on backpressure. Drained one at a time by
    /// [`Engine::restart_input`] before any new bytes are read, so a
    /// decoded frame is never silently discarded.
    pending_frames: VecDeque<DecodedFrame>,

    input_stopped: bool,
    output_stopped: bool,
    read_armed: bool,
    write_armed: bool,
    parked: Option<Message>,

    handshake_deadline: Option<Deadline>,
}

impl<T: Transport> Engine<T> {
    pub fn new(
        transport: T,
        session: Box<dyn Session>,
        local_routing_id: u32,
        max_message_size: u32,
        send_buffer_limit: usize,
    ) -> Self {
        Self {
            transport,
            session,
            decoder: Decoder::new(max_message_size),
            state: EngineState::Idle,
            local_routing_id,
            recv_buf: vec![0; INITIAL_RECV_BUF],
            send_buffer_main: Vec::new(),
            send_buffer_flush: Vec::new(),
            flush_cursor: 0,
            send_buffer_limit: send_buffer_limit.max(MIN_SEND_BUFFER_LIMIT),
            pending_frames: VecDeque::new(),
            input_stopped: false,
            output_stopped: false,
            read_armed: false,
            write_armed: false,
            parked: None,
            handshake_deadline: None,
        }
    }

    #[must_use]
    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Register with the reactor and enter `Handshaking` or `Running`
    /// depending on what the transport requires.
    pub fn plug(
        &mut self,
        registry: &Registry,
        token: Token,
        handshake_timeout: std::time::Duration,
    ) -> Result<(), EngineError> {
        self.transport
            .register(registry, token, Interest::READABLE)
            .map_err(io_to_connection_error)?;
        self.read_armed = true;

        if self.transport.requires_handshake() {
            self.state = EngineState::Handshaking;
            self.handshake_deadline = Some(Deadline::after(handshake_timeout));
        } else {
            self.state = EngineState::Running;
        }
        Ok(())
    }

    /// Process one readiness event. Returns `false` once the engine has
    /// torn the connection down and should be dropped by the caller.
    pub fn poll_once(&mut self, registry: &Registry, token: Token, event: &Event) -> bool {
        if self.state == EngineState::Terminating {
            return false;
        }

        if self.state == EngineState::Handshaking {
            if !self.drive_handshake(registry, token) {
                return false;
            }
            if self.state == EngineState::Handshaking {
                return true;
            }
        }

        if event.is_readable() && !self.input_stopped {
            if !self.drain_readable(registry, token) {
                return false;
            }
        }

        if event.is_writable() {
            self.fill_send_buffer();
            if !self.drain_writable(registry, token) {
                return false;
            }
        }

        self.pump_output(registry, token)
    }

    /// Pull anything the session has queued for send and make sure
    /// WRITABLE interest is armed if there's now something to write.
    /// `plug()` only registers for READABLE, so a freshly connected
    /// engine needs one of these to notice an already-queued message
    /// instead of waiting for an unrelated readiness event.
    pub fn pump_output(&mut self, registry: &Registry, token: Token) -> bool {
        self.fill_send_buffer();
        if !self.send_buffer_main.is_empty() || self.flush_cursor < self.send_buffer_flush.len() {
            if !self.arm_writable(registry, token) {
                return false;
            }
        }
        true
    }

    /// Check the handshake deadline; called once per reactor tick
    /// independent of readiness, since a deadline can expire with no
    /// event ever arriving.
    pub fn check_handshake_timeout(&mut self) -> bool {
        if self.state != EngineState::Handshaking {
            return true;
        }
        match &self.handshake_deadline {
            Some(d) if d.is_elapsed() => {
                self.error(false, EngineError::Timeout);
                false
            }
            _ => true,
        }
    }

    fn drive_handshake(&mut self, registry: &Registry, token: Token) -> bool {
        match self.transport.try_handshake() {
            Ok(true) => {
                self.state = EngineState::Running;
                self.handshake_deadline = None;
                true
            }
            Ok(false) => true,
            Err(err) => {
                self.error(true, EngineError::Connection(err.to_string()));
                let _ = registry;
                let _ = token;
                false
            }
        }
    }

    /// Try to redeliver a parked message, drain anything else already
    /// decoded from a previous read, and only then resume reading.
    /// Nothing decoded off the wire is ever skipped: the parked message
    /// and the pending-frame queue are always retried, in order, before
    /// a fresh byte is read.
    pub fn restart_input(&mut self, registry: &Registry, token: Token) -> bool {
        if let Some(msg) = self.parked.take() {
            if let Err(msg) = self.session.push(msg) {
                self.parked = Some(msg);
                return true;
            }
        }
        if !self.deliver_pending() {
            return true;
        }
        self.input_stopped = false;
        if !self.read_armed {
            return self.arm_readable(registry, token);
        }
        true
    }

    pub fn restart_output(&mut self) {
        self.output_stopped = false;
    }

    pub fn terminate(&mut self, registry: &Registry) {
        if self.state == EngineState::Terminating {
            return;
        }
        self.state = EngineState::Terminating;
        let _ = self.transport.deregister(registry);
        self.transport.close();
    }

    pub fn error(&mut self, was_handshaking: bool, reason: EngineError) {
        if self.state == EngineState::Terminating {
            return;
        }
        warn!(?reason, was_handshaking, "engine tearing down connection");
        self.state = EngineState::Terminating;
        self.transport.close();
        self.session.engine_error(was_handshaking, reason);
    }

    /// Read once and decode whatever that read produced. One `try_read`
    /// per call rather than looping to `WouldBlock`: a peer with a deep
    /// backlog still only gets one read's worth of service per reactor
    /// tick, so a shared poll loop dispatching many engines interleaves
    /// peers instead of draining one dry before moving to the next.
    /// mio's readiness stays level-triggered, so a socket that still has
    /// bytes queued is simply reported readable again next tick.
    fn drain_readable(&mut self, registry: &Registry, token: Token) -> bool {
        let _ = (registry, token);
        let n = match self.transport.try_read(&mut self.recv_buf) {
            Ok(0) if !self.transport.is_open() => {
                self.error(false, EngineError::Connection("peer closed".to_string()));
                return false;
            }
            Ok(0) => return true,
            Ok(n) => n,
            Err(err) => {
                self.error(false, EngineError::Connection(err.to_string()));
                return false;
            }
        };

        match self.decoder.decode_from(&self.recv_buf[..n]) {
            Ok(frames) => self.pending_frames.extend(frames),
            Err(wire_err) => {
                self.error(false, EngineError::Protocol(wire_err));
                return false;
            }
        }

        if n == self.recv_buf.len() && self.recv_buf.len() < MAX_RECV_BUF {
            let grown = (self.recv_buf.len() * 2).min(MAX_RECV_BUF);
            self.recv_buf.resize(grown, 0);
        }

        self.deliver_pending();
        true
    }

    /// Drain [`Engine::pending_frames`] into the session, one at a time.
    /// Stops the moment the session applies backpressure, leaving
    /// whatever's left in the queue for the next call — nothing already
    /// decoded is ever dropped on the floor.
    fn deliver_pending(&mut self) -> bool {
        while let Some(frame) = self.pending_frames.pop_front() {
            if !self.deliver(frame) {
                return false;
            }
        }
        true
    }

    /// Deliver one decoded frame to the session. Returns `false` if the
    /// session is full and reading should pause; the frame's message is
    /// parked for [`Engine::restart_input`] to retry.
    fn deliver(&mut self, frame: DecodedFrame) -> bool {
        let mut message = Message::new(frame.payload);
        message.set_routing_id(frame.routing_id);
        if frame.kind != FrameKind::Data {
            trace!(kind = ?frame.kind, rid = frame.routing_id, "received non-data frame");
        }

        match self.session.push(message) {
            Ok(()) => true,
            Err(msg) => {
                self.parked = Some(msg);
                self.input_stopped = true;
                false
            }
        }
    }

    /// Pull session-queued messages into `send_buffer_main` up to
    /// `send_buffer_limit`, checked before each pull rather than after —
    /// the buffer can end up slightly over the limit by one message's
    /// worth, but a session that keeps producing can never grow it
    /// unboundedly. Anything left in the session once the cap is hit
    /// waits for the next writable tick.
    fn fill_send_buffer(&mut self) {
        if self.output_stopped {
            return;
        }
        while self.send_buffer_main.len() < self.send_buffer_limit {
            let Some(msg) = self.session.pull() else { break };
            zlink_wire::codec::encode_into(
                &mut self.send_buffer_main,
                FrameKind::Data,
                msg.routing_id().unwrap_or(self.local_routing_id),
                msg.payload(),
            );
        }
        self.session.flush();
    }

    fn drain_writable(&mut self, registry: &Registry, token: Token) -> bool {
        if self.flush_cursor >= self.send_buffer_flush.len() && !self.send_buffer_main.is_empty() {
            std::mem::swap(&mut self.send_buffer_flush, &mut self.send_buffer_main);
            self.send_buffer_main.clear();
            self.flush_cursor = 0;
        }

        while self.flush_cursor < self.send_buffer_flush.len() {
            let chunk = &self.send_buffer_flush[self.flush_cursor..];
            match self.transport.try_write(chunk) {
                Ok(0) => break,
                Ok(n) => {
                    self.flush_cursor += n;
                    if self.flush_cursor >= self.send_buffer_flush.len() && !self.send_buffer_main.is_empty() {
                        std::mem::swap(&mut self.send_buffer_flush, &mut self.send_buffer_main);
                        self.send_buffer_main.clear();
                        self.flush_cursor = 0;
                    }
                }
                Err(err) => {
                    self.error(false, EngineError::Connection(err.to_string()));
                    return false;
                }
            }
        }

        if self.flush_cursor >= self.send_buffer_flush.len() {
            self.send_buffer_flush.clear();
            self.flush_cursor = 0;
            if self.write_armed {
                if let Err(err) = self.transport.reregister(registry, token, Interest::READABLE) {
                    self.error(false, io_to_connection_error(err));
                    return false;
                }
                self.write_armed = false;
            }
        }
        true
    }

    fn arm_writable(&mut self, registry: &Registry, token: Token) -> bool {
        if self.write_armed {
            return true;
        }
        if let Err(err) = self.transport.reregister(registry, token, Interest::READABLE | Interest::WRITABLE) {
            self.error(false, io_to_connection_error(err));
            return false;
        }
        self.write_armed = true;
        true
    }

    fn arm_readable(&mut self, registry: &Registry, token: Token) -> bool {
        let interest = if self.write_armed { Interest::READABLE | Interest::WRITABLE } else { Interest::READABLE };
        if let Err(err) = self.transport.reregister(registry, token, interest) {
            self.error(false, io_to_connection_error(err));
            return false;
        }
        self.read_armed = true;
        true
    }
}

fn io_to_connection_error(err: TransportError) -> EngineError {
    debug!(?err, "transport registration error");
    EngineError::Connection(err.to_string())
}
