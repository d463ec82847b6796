//! Per-instance output buffer (§4.1 of the design).

use indexmap::IndexMap;

use crate::event::{Event, DEFAULT_CHANNEL};

/// The scratch buffer a `Source` or `Operator` instance writes its output
/// events into on every invocation.
///
/// A collector is never shared across threads: each `InstanceExecutor` owns
/// exactly one, and the engine pre-registers every channel the component
/// declares before the instance's first call. `IndexMap` is used instead of
/// a `HashMap` purely so that repeated runs register (and therefore iterate)
/// channels in the same order, which makes fan-out logs and tests
/// deterministic. The design leaves the iteration order unspecified; this
/// is just a convenient default.
#[derive(Debug, Default)]
pub struct EventCollector {
    channels: IndexMap<String, Vec<Event>>,
}

impl EventCollector {
    pub fn new() -> Self {
        let mut collector = Self {
            channels: IndexMap::new(),
        };
        collector.register_channel(DEFAULT_CHANNEL);
        collector
    }

    /// Register a channel. Idempotent: registering an already-known channel
    /// is a no-op and does not clear its contents.
    pub fn register_channel(&mut self, channel: &str) {
        self.channels
            .entry(channel.to_string())
            .or_insert_with(Vec::new);
    }

    /// Append an event to `channel`. Silently dropped if `channel` was never
    /// registered. By design, the engine registers every channel a
    /// component can possibly emit on before the component ever runs, so a
    /// miss here means the component is emitting on a channel it never
    /// declared.
    pub fn add(&mut self, event: Event, channel: &str) {
        if let Some(events) = self.channels.get_mut(channel) {
            events.push(event);
        } else {
            log::warn!("dropping event emitted on unregistered channel `{channel}`");
        }
    }

    /// Append an event to the default channel.
    pub fn add_default(&mut self, event: Event) {
        self.add(event, DEFAULT_CHANNEL);
    }

    pub fn registered_channels(&self) -> impl Iterator<Item = &str> {
        self.channels.keys().map(String::as_str)
    }

    pub fn event_list(&self, channel: &str) -> &[Event] {
        self.channels
            .get(channel)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Empty every channel's event list, keeping the channels registered.
    pub fn clear(&mut self) {
        for events in self.channels.values_mut() {
            events.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_preserves_insertion_order_within_a_channel() {
        let mut collector = EventCollector::new();
        collector.add_default(Event::single("n", 1));
        collector.add_default(Event::single("n", 2));
        collector.add_default(Event::single("n", 3));

        let values: Vec<_> = collector
            .event_list(DEFAULT_CHANNEL)
            .iter()
            .map(|e| e.get_field("n").unwrap().as_i64().unwrap())
            .collect();
        assert_eq!(values, vec![1, 2, 3]);
    }

    #[test]
    fn add_to_unregistered_channel_is_silently_dropped() {
        let mut collector = EventCollector::new();
        collector.add(Event::single("n", 1), "errors");
        assert!(collector.event_list("errors").is_empty());
    }

    #[test]
    fn clear_keeps_channels_registered() {
        let mut collector = EventCollector::new();
        collector.register_channel("errors");
        collector.add(Event::single("n", 1), "errors");
        collector.clear();
        assert!(collector.event_list("errors").is_empty());
        assert!(collector.registered_channels().any(|c| c == "errors"));
    }
}
