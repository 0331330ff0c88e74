//! Best-effort socket event notifications, decoupled from the I/O path
//! by a bounded, lossy channel.

pub mod event;
pub mod sink;

pub use event::MonitorEvent;
pub use sink::MonitorSink;
