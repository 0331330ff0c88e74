use std::net::SocketAddr;

/// A notification about something that happened to a socket's connections.
///
/// Carries enough context to reconstruct what a text-based monitor log
/// line would say (`endpoint`, an integer `value` whose meaning depends
/// on the variant — an errno-like code for failures, a byte count for
/// `Closed`), plus the local/remote addresses when they're known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorEvent {
    Listening { endpoint: String, local_addr: Option<SocketAddr> },
    Accepted { endpoint: String, local_addr: Option<SocketAddr>, remote_addr: Option<SocketAddr> },
    AcceptFailed { endpoint: String, value: i32 },
    Connected { endpoint: String, local_addr: Option<SocketAddr>, remote_addr: Option<SocketAddr> },
    ConnectDelayed { endpoint: String },
    ConnectRetried { endpoint: String, value: i32 },
    Closed { endpoint: String, remote_addr: Option<SocketAddr> },
    Disconnected { endpoint: String, remote_addr: Option<SocketAddr> },
    HandshakeFailed { endpoint: String, value: i32 },
    ProtocolError { endpoint: String, value: i32 },
}

impl MonitorEvent {
    #[must_use]
    pub fn endpoint(&self) -> &str {
        match self {
            MonitorEvent::Listening { endpoint, .. }
            | MonitorEvent::Accepted { endpoint, .. }
            | MonitorEvent::AcceptFailed { endpoint, .. }
            | MonitorEvent::Connected { endpoint, .. }
            | MonitorEvent::ConnectDelayed { endpoint }
            | MonitorEvent::ConnectRetried { endpoint, .. }
            | MonitorEvent::Closed { endpoint, .. }
            | MonitorEvent::Disconnected { endpoint, .. }
            | MonitorEvent::HandshakeFailed { endpoint, .. }
            | MonitorEvent::ProtocolError { endpoint, .. } => endpoint,
        }
    }
}
