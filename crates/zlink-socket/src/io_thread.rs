use std::collections::HashMap;
use std::net::ToSocketAddrs;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender, TrySendError};
use mio::{Events, Interest, Poll, Token};
use tracing::{debug, warn};

use zlink_engine::{Engine, EngineError};
use zlink_monitor::{MonitorEvent, MonitorSink};
use zlink_transport::PlainTcpTransport;
use zlink_wire::Message;

use crate::endpoint::Endpoint;
use crate::error::SocketError;
use crate::events::{Command, SocketEvent};
use crate::options::SocketOptions;
use crate::pipe::PipeSession;
use crate::routing::RoutingTable;

const LISTENER_TOKEN: Token = Token(usize::MAX);
const POLL_TIMEOUT: Duration = Duration::from_millis(50);

/// Owns every peer connection for one socket and drives them off a
/// single `mio::Poll`, mirroring `TcpConnector::poll_with`'s
/// zero-timeout reactor loop generalized to a bounded wait and a
/// command queue feeding in from the public API thread.
pub struct IoThread {
    poll: Poll,
    listener: Option<mio::net::TcpListener>,
    engines: HashMap<Token, Engine<PlainTcpTransport>>,
    routing: RoutingTable,
    outboxes: HashMap<u32, Sender<Message>>,
    endpoints: HashMap<Token, String>,
    next_token: usize,
    commands: Receiver<Command>,
    events_tx: Sender<SocketEvent>,
    monitor: MonitorSink,
    options: SocketOptions,
}

impl IoThread {
    pub fn new(
        commands: Receiver<Command>,
        events_tx: Sender<SocketEvent>,
        monitor: MonitorSink,
        options: SocketOptions,
    ) -> std::io::Result<Self> {
        Ok(Self {
            poll: Poll::new()?,
            listener: None,
            engines: HashMap::new(),
            routing: RoutingTable::new(),
            outboxes: HashMap::new(),
            endpoints: HashMap::new(),
            next_token: 0,
            commands,
            events_tx,
            monitor,
            options,
        })
    }

    pub fn run(mut self) {
        let mut events = Events::with_capacity(256);
        loop {
            if !self.drain_commands() {
                return;
            }

            if let Err(err) = self.poll.poll(&mut events, Some(POLL_TIMEOUT)) {
                if err.kind() == std::io::ErrorKind::Interrupted {
                    continue;
                }
                warn!(?err, "zlink io thread: poll failed");
                return;
            }

            for event in events.iter() {
                if event.token() == LISTENER_TOKEN {
                    self.accept_incoming();
                    continue;
                }
                self.dispatch(event.token(), event);
            }

            for timed_out in self.collect_handshake_timeouts() {
                self.teardown(timed_out);
            }
        }
    }

    /// Returns `false` once a `Shutdown` command is seen.
    fn drain_commands(&mut self) -> bool {
        loop {
            match self.commands.try_recv() {
                Ok(Command::Shutdown) => return false,
                Ok(Command::Connect { endpoint, reply }) => {
                    let _ = reply.send(self.handle_connect(endpoint));
                }
                Ok(Command::Bind { endpoint, reply }) => {
                    let _ = reply.send(self.handle_bind(endpoint));
                }
                Ok(Command::Send { routing_id, message, reply }) => {
                    let _ = reply.send(self.handle_send(routing_id, message));
                }
                Ok(Command::ClosePeer { routing_id }) => {
                    self.handle_close_peer(routing_id);
                }
                Ok(Command::RestartInput { routing_id }) => {
                    self.handle_restart_input(routing_id);
                }
                Err(crossbeam_channel::TryRecvError::Empty) => return true,
                Err(crossbeam_channel::TryRecvError::Disconnected) => return false,
            }
        }
    }

    fn handle_bind(&mut self, endpoint: Endpoint) -> Result<std::net::SocketAddr, SocketError> {
        let Endpoint::Tcp(addr) = endpoint else {
            return Err(SocketError::Unsupported(endpoint.scheme()));
        };
        let socket_addr = addr
            .to_socket_addrs()
            .map_err(SocketError::Io)?
            .next()
            .ok_or_else(|| SocketError::InvalidEndpoint(addr.clone()))?;

        let mut listener = mio::net::TcpListener::bind(socket_addr)?;
        let bound = listener.local_addr()?;
        self.poll.registry().register(&mut listener, LISTENER_TOKEN, Interest::READABLE)?;
        self.listener = Some(listener);
        self.monitor.emit(MonitorEvent::Listening { endpoint: format!("tcp://{bound}"), local_addr: Some(bound) });
        Ok(bound)
    }

    fn handle_connect(&mut self, endpoint: Endpoint) -> Result<(), SocketError> {
        let Endpoint::Tcp(addr) = endpoint else {
            return Err(SocketError::Unsupported(endpoint.scheme()));
        };
        let socket_addr =
            addr.to_socket_addrs().map_err(SocketError::Io)?.next().ok_or_else(|| SocketError::InvalidEndpoint(addr.clone()))?;

        let stream = mio::net::TcpStream::connect(socket_addr)?;
        let transport = PlainTcpTransport::new(stream, socket_addr)?;
        let endpoint_name = format!("tcp://{socket_addr}");
        self.attach(transport, endpoint_name);
        Ok(())
    }

    fn accept_incoming(&mut self) {
        loop {
            let accept_result = match &self.listener {
                Some(listener) => listener.accept(),
                None => return,
            };
            match accept_result {
                Ok((stream, peer_addr)) => {
                    let Ok(transport) = PlainTcpTransport::new(stream, peer_addr) else { continue };
                    let endpoint_name = format!("tcp://{peer_addr}");
                    self.monitor.emit(MonitorEvent::Accepted {
                        endpoint: endpoint_name.clone(),
                        local_addr: None,
                        remote_addr: Some(peer_addr),
                    });
                    self.attach(transport, endpoint_name);
                }
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => break,
                Err(e) => {
                    self.monitor.emit(MonitorEvent::AcceptFailed { endpoint: "tcp://listener".into(), value: 0 });
                    debug!(?e, "zlink io thread: accept failed");
                    break;
                }
            }
        }
    }

    fn attach(&mut self, transport: PlainTcpTransport, endpoint_name: String) {
        if let Some(size) = self.options.send_buf_size {
            transport.set_send_buf_size(size);
        }
        if let Some(size) = self.options.recv_buf_size {
            transport.set_recv_buf_size(size);
        }

        let token = Token(self.next_token);
        self.next_token += 1;

        let rid = self.routing.attach(token);
        let (outbox_tx, outbox_rx) = crossbeam_channel::bounded(self.options.high_water_mark);
        self.outboxes.insert(rid, outbox_tx);
        self.endpoints.insert(token, endpoint_name.clone());

        let session = Box::new(PipeSession::new(rid, endpoint_name.clone(), self.events_tx.clone(), outbox_rx, self.monitor.clone()));
        let mut engine =
            Engine::new(transport, session, rid, self.options.max_message_size, self.options.send_buffer_limit);

        if let Err(err) = engine.plug(self.poll.registry(), token, self.options.handshake_timeout) {
            debug!(?err, "zlink io thread: failed to plug engine");
            self.routing.detach_by_token(token);
            self.outboxes.remove(&rid);
            self.endpoints.remove(&token);
            return;
        }

        self.monitor.emit(MonitorEvent::Connected {
            endpoint: endpoint_name.clone(),
            local_addr: None,
            remote_addr: None,
        });
        let _ = self.events_tx.try_send(SocketEvent::PipeAttached { routing_id: rid, endpoint: endpoint_name });

        self.engines.insert(token, engine);
    }

    fn dispatch(&mut self, token: Token, event: &mio::event::Event) {
        let Some(engine) = self.engines.get_mut(&token) else { return };
        let alive = engine.poll_once(self.poll.registry(), token, event);
        if !alive {
            self.teardown(token);
        }
    }

    fn collect_handshake_timeouts(&mut self) -> Vec<Token> {
        let mut timed_out = Vec::new();
        for (token, engine) in &mut self.engines {
            if !engine.check_handshake_timeout() {
                timed_out.push(*token);
            }
        }
        timed_out
    }

    fn teardown(&mut self, token: Token) {
        self.engines.remove(&token);
        self.endpoints.remove(&token);
        if let Some(rid) = self.routing.detach_by_token(token) {
            self.outboxes.remove(&rid);
        }
    }

    /// Unknown routing id and a full outbox are different failures: the
    /// first means there's no route at all (an EHOSTUNREACH-equivalent,
    /// suppressed instead when `router_mandatory` is off), the second
    /// means the route exists but can't take more right now
    /// (EAGAIN-equivalent) — and unlike the unknown-route case the
    /// message is handed back to the caller instead of being dropped.
    fn handle_send(&mut self, routing_id: u32, message: Message) -> Result<(), SocketError> {
        let Some(tx) = self.outboxes.get(&routing_id) else {
            return self.reject_unrouted(routing_id);
        };

        match tx.try_send(message) {
            Ok(()) => {}
            Err(TrySendError::Full(msg)) => return Err(SocketError::WouldBlock(msg)),
            Err(TrySendError::Disconnected(_msg)) => return self.reject_unrouted(routing_id),
        }

        if let Some(token) = self.routing.token_for(routing_id) {
            if let Some(engine) = self.engines.get_mut(&token) {
                engine.pump_output(self.poll.registry(), token);
            }
        }
        Ok(())
    }

    fn reject_unrouted(&self, routing_id: u32) -> Result<(), SocketError> {
        if self.options.router_mandatory {
            Err(SocketError::UnknownRoutingId(routing_id))
        } else {
            Ok(())
        }
    }

    fn handle_restart_input(&mut self, routing_id: u32) {
        if let Some(token) = self.routing.token_for(routing_id) {
            if let Some(engine) = self.engines.get_mut(&token) {
                engine.restart_input(self.poll.registry(), token);
            }
        }
    }

    /// Tear a peer's connection down by request rather than by error —
    /// the wire equivalent of the second frame of a send being a single
    /// `0x00` byte. Routed through `Engine::error` so the peer still
    /// gets the same disconnect notification a real I/O failure would
    /// produce.
    fn handle_close_peer(&mut self, routing_id: u32) {
        let Some(token) = self.routing.token_for(routing_id) else { return };
        if let Some(engine) = self.engines.get_mut(&token) {
            engine.error(false, EngineError::Connection("closed by the local socket".to_string()));
        }
        self.teardown(token);
    }
}
