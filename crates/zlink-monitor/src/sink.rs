use crossbeam_channel::{Receiver, Sender, TrySendError};
use tracing::trace;

use crate::event::MonitorEvent;

/// The write side of a monitor channel.
///
/// Monitoring is best-effort: a slow or absent reader must never slow
/// down or block a socket's I/O thread, so `emit` always uses
/// `try_send` and silently drops the event (at `trace!`, so the drop is
/// still observable) rather than block or grow the channel without
/// bound.
#[derive(Clone)]
pub struct MonitorSink {
    tx: Sender<MonitorEvent>,
}

impl MonitorSink {
    #[must_use]
    pub fn channel(capacity: usize) -> (Self, Receiver<MonitorEvent>) {
        let (tx, rx) = crossbeam_channel::bounded(capacity);
        (Self { tx }, rx)
    }

    pub fn emit(&self, event: MonitorEvent) {
        match self.tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                trace!(endpoint = event.endpoint(), "monitor channel full, dropping event");
            }
            Err(TrySendError::Disconnected(event)) => {
                trace!(endpoint = event.endpoint(), "monitor channel has no reader, dropping event");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_are_dropped_once_the_channel_is_full() {
        let (sink, rx) = MonitorSink::channel(1);
        sink.emit(MonitorEvent::ConnectDelayed { endpoint: "tcp://a".into() });
        sink.emit(MonitorEvent::ConnectDelayed { endpoint: "tcp://b".into() });

        let first = rx.try_recv().unwrap();
        assert_eq!(first.endpoint(), "tcp://a");
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn emit_does_not_panic_once_every_receiver_is_dropped() {
        let (sink, rx) = MonitorSink::channel(1);
        drop(rx);
        sink.emit(MonitorEvent::ConnectDelayed { endpoint: "tcp://a".into() });
    }
}
