//! Bounded blocking FIFO between two executors (§4.2 of the design).

use std::time::Duration;

use crate::error::{EngineError, EngineResult};
use crate::event::Event;

/// Capacity used for an `EventQueue` when a component does not override it.
pub const DEFAULT_QUEUE_CAPACITY: usize = 64;

/// A bounded, optionally stream-name-tagged FIFO between an upstream and a
/// downstream executor.
///
/// Built on `flume`'s bounded channel: `put` blocks while the queue is full,
/// `take` blocks while it is empty, and closing the channel (dropping every
/// sender, which the engine's stop path does) makes every blocked and future
/// `take` fail with `QueueClosed` instead of hanging forever.
#[derive(Clone)]
pub struct EventQueue {
    stream_name: Option<String>,
    sender: flume::Sender<Event>,
    receiver: flume::Receiver<Event>,
}

impl EventQueue {
    /// Create a new queue with the given capacity, optionally tagging every
    /// event that passes through `put` with `stream_name`.
    pub fn new(capacity: usize, stream_name: Option<String>) -> Self {
        let (sender, receiver) = flume::bounded(capacity.max(1));
        Self {
            stream_name,
            sender,
            receiver,
        }
    }

    pub fn with_default_capacity(stream_name: Option<String>) -> Self {
        Self::new(DEFAULT_QUEUE_CAPACITY, stream_name)
    }

    pub fn stream_name(&self) -> Option<&str> {
        self.stream_name.as_deref()
    }

    /// Put `event` onto the queue, blocking while it is full.
    ///
    /// If this queue is tagged with a stream name and `event` does not
    /// already carry a stream-name tag of its own, it is wrapped so that the
    /// downstream operator can discriminate by input name (a join's two
    /// inputs, for instance). An event that already carries a tag (e.g. one
    /// forwarded unchanged from an upstream named input) is left alone.
    pub fn put(&self, event: Event) -> EngineResult<()> {
        let event = match (&self.stream_name, event.stream_name()) {
            (Some(name), None) => event.with_stream_name(name.clone()),
            _ => event,
        };
        self.sender.send(event).map_err(|_| EngineError::QueueClosed)
    }

    /// Take the next event, blocking until one is available or the queue is
    /// closed.
    pub fn take(&self) -> EngineResult<Event> {
        self.receiver.recv().map_err(|_| EngineError::QueueClosed)
    }

    /// Take the next event, blocking for at most `timeout`. Used by the
    /// operator-instance loop to let a `WindowingOperator`'s idle ticker
    /// (§4.5) make progress under a stalled input.
    pub fn take_timeout(&self, timeout: Duration) -> EngineResult<Option<Event>> {
        match self.receiver.recv_timeout(timeout) {
            Ok(event) => Ok(Some(event)),
            Err(flume::RecvTimeoutError::Timeout) => Ok(None),
            Err(flume::RecvTimeoutError::Disconnected) => Err(EngineError::QueueClosed),
        }
    }

    /// A clone of the underlying receiver, for the dispatcher's selectable
    /// multiplex over several inbound queues (§4.7, §4.9).
    pub(crate) fn receiver(&self) -> flume::Receiver<Event> {
        self.receiver.clone()
    }

    /// Close this queue's sending half immediately, so every blocked and
    /// future `take`/`put` on it fails with `QueueClosed`. Called by the
    /// engine's stop path.
    pub fn close(&self) {
        // Dropping every Sender closes the channel for `flume`; since this
        // queue is typically shared (cloned) across producers, explicitly
        // disconnecting releases the channel without requiring every clone
        // to be dropped first.
        self.sender.disconnect();
        self.receiver.drain().for_each(drop);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_tags_untagged_events_with_the_queue_stream_name() {
        let queue = EventQueue::new(4, Some("vehicle".to_string()));
        queue.put(Event::single("n", 1)).unwrap();
        let event = queue.take().unwrap();
        assert_eq!(event.stream_name(), Some("vehicle"));
    }

    #[test]
    fn put_preserves_an_existing_stream_name_tag() {
        let queue = EventQueue::new(4, Some("vehicle".to_string()));
        queue
            .put(Event::single("n", 1).with_stream_name("other"))
            .unwrap();
        let event = queue.take().unwrap();
        assert_eq!(event.stream_name(), Some("other"));
    }

    #[test]
    fn take_after_close_fails_with_queue_closed() {
        let queue = EventQueue::new(4, None);
        queue.close();
        assert!(matches!(queue.take(), Err(EngineError::QueueClosed)));
    }

    #[test]
    fn take_timeout_returns_none_when_empty() {
        let queue = EventQueue::new(4, None);
        let result = queue.take_timeout(Duration::from_millis(5)).unwrap();
        assert!(result.is_none());
    }
}
