//! Drive-level event notifications (§2 item 7, §6 "Events emitted by the
//! drive").
//!
//! The teacher's networked event loop wires channels between tasks with
//! `tokio::sync::mpsc`; a library has no connection to pipe events down,
//! so this uses a broadcast channel subscribers opt into instead.

use tokio::sync::broadcast;

/// One drive-level event.
#[derive(Debug, Clone)]
pub enum Event {
    /// Bring-up finished successfully.
    Ready,
    /// Bring-up, or a later asynchronous feed operation, failed. Carries a
    /// human-readable message since [`crate::error::Error`] is not `Clone`
    /// across all variants used by the originating subsystem.
    Error(String),
    /// The metadata feed gained at least one new block.
    Update,
    /// A write stream to `name` is about to append its first byte (§4.8
    /// step 4).
    Appending { name: String },
    /// A write stream to `name` committed its stat (§4.8 step 6).
    Append { name: String },
}

/// Broadcaster side of the drive's event stream.
#[derive(Clone)]
pub struct Events {
    tx: broadcast::Sender<Event>,
}

impl Default for Events {
    fn default() -> Self {
        Self::new()
    }
}

impl Events {
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(256);
        Self { tx }
    }

    /// Subscribe to future events. Events emitted before subscribing are
    /// not replayed.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }

    /// Emit an event to every current subscriber. A quiet drive with no
    /// subscribers is not an error.
    pub fn emit(&self, event: Event) {
        let _ = self.tx.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_observe_emitted_events() {
        let events = Events::new();
        let mut rx = events.subscribe();
        events.emit(Event::Ready);
        match rx.recv().await.unwrap() {
            Event::Ready => {}
            other => panic!("unexpected event: {other:?}"),
        }
    }
}
