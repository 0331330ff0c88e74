use crossbeam_channel::{Receiver, Sender};

use zlink_engine::{EngineError, Session};
use zlink_monitor::{MonitorEvent, MonitorSink};
use zlink_wire::Message;

use crate::events::SocketEvent;

/// The engine-facing half of one peer connection.
///
/// Translates between the engine's `Session` contract and the socket's
/// channel-based public API: inbound messages are tagged with this
/// pipe's routing id and handed to the socket's shared event channel,
/// outbound messages are pulled from a per-pipe queue fed by
/// `StreamSocket::send`.
pub struct PipeSession {
    routing_id: u32,
    endpoint: String,
    events_tx: Sender<SocketEvent>,
    outbox_rx: Receiver<Message>,
    monitor: MonitorSink,
}

impl PipeSession {
    #[must_use]
    pub fn new(
        routing_id: u32,
        endpoint: String,
        events_tx: Sender<SocketEvent>,
        outbox_rx: Receiver<Message>,
        monitor: MonitorSink,
    ) -> Self {
        Self { routing_id, endpoint, events_tx, outbox_rx, monitor }
    }
}

impl Session for PipeSession {
    fn push(&mut self, mut message: Message) -> Result<(), Message> {
        message.set_routing_id(self.routing_id);
        match self.events_tx.try_send(SocketEvent::Message { routing_id: self.routing_id, message }) {
            Ok(()) => Ok(()),
            Err(crossbeam_channel::TrySendError::Full(SocketEvent::Message { message, .. })) => Err(message),
            Err(crossbeam_channel::TrySendError::Disconnected(SocketEvent::Message { message, .. })) => Err(message),
            Err(_) => unreachable!("try_send only ever returns the value we sent"),
        }
    }

    fn pull(&mut self) -> Option<Message> {
        self.outbox_rx.try_recv().ok()
    }

    fn engine_error(&mut self, was_handshaking: bool, reason: EngineError) {
        let event = if was_handshaking {
            MonitorEvent::HandshakeFailed { endpoint: self.endpoint.clone(), value: 0 }
        } else {
            match &reason {
                EngineError::Protocol(_) => {
                    MonitorEvent::ProtocolError { endpoint: self.endpoint.clone(), value: 0 }
                }
                EngineError::Timeout => {
                    MonitorEvent::HandshakeFailed { endpoint: self.endpoint.clone(), value: 0 }
                }
                EngineError::Connection(_) => {
                    MonitorEvent::Disconnected { endpoint: self.endpoint.clone(), remote_addr: None }
                }
            }
        };
        self.monitor.emit(event);
        let _ = self
            .events_tx
            .try_send(SocketEvent::PipeDetached { routing_id: self.routing_id, endpoint: self.endpoint.clone() });
    }
}
