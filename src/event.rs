//! The uniform record that flows between every stage of a job.
//!
//! `NamedEvent` and `TimedEvent` from the design are not separate types: an
//! [`Event`] is a single envelope that *may* carry a stream-name tag and/or a
//! timestamp alongside its payload. "Is this event named" / "is this event
//! timed" become predicates (`stream_name().is_some()`, `timestamp().is_some()`)
//! on the one envelope rather than a subclass hierarchy, matching the
//! capability-trait shape called for by the design.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

/// The payload carried by an [`Event`].
///
/// Most jobs are happy with the field-dictionary representation (`Fields`),
/// which is what every demonstration job in this crate uses. Components that
/// want a strongly typed payload (and are willing to give up the generic
/// field accessors) can use `Typed` and downcast it back with
/// [`Event::payload_as`].
#[derive(Clone)]
pub enum Payload {
    /// A loosely typed field dictionary, e.g. decoded from a JSON line read
    /// off a socket.
    Fields(Map<String, Value>),
    /// An arbitrary, strongly typed payload. Shared via `Arc` so that an
    /// event can be cheaply cloned when it is broadcast to every instance of
    /// an operator (see `AllGrouping`).
    Typed(Arc<dyn Any + Send + Sync>),
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Payload::Fields(map) => f.debug_tuple("Fields").field(map).finish(),
            Payload::Typed(_) => f.write_str("Typed(..)"),
        }
    }
}

/// An immutable record passed between a `Source`/`Operator` and the engine.
///
/// Construct one with [`Event::from_fields`] or [`Event::from_typed`], then
/// thread it through [`with_stream_name`](Event::with_stream_name) and/or
/// [`with_timestamp`](Event::with_timestamp) as needed. Cloning an `Event` is
/// cheap: the field map is the only part that is deep-copied, and `Typed`
/// payloads are reference counted.
#[derive(Clone, Debug)]
pub struct Event {
    payload: Payload,
    stream_name: Option<String>,
    timestamp: Option<i64>,
}

impl Event {
    /// Build an event from a field dictionary.
    pub fn from_fields(fields: Map<String, Value>) -> Self {
        Self {
            payload: Payload::Fields(fields),
            stream_name: None,
            timestamp: None,
        }
    }

    /// Build an event from a single `(field, value)` pair.
    pub fn single(field: impl Into<String>, value: impl Into<Value>) -> Self {
        let mut fields = Map::new();
        fields.insert(field.into(), value.into());
        Self::from_fields(fields)
    }

    /// Build an event wrapping a strongly typed payload.
    pub fn from_typed<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            payload: Payload::Typed(Arc::new(value)),
            stream_name: None,
            timestamp: None,
        }
    }

    /// Attach (or replace) the stream-name tag, turning this into what the
    /// design calls a `NamedEvent`.
    #[must_use]
    pub fn with_stream_name(mut self, stream_name: impl Into<String>) -> Self {
        self.stream_name = Some(stream_name.into());
        self
    }

    /// Attach (or replace) the event-time timestamp in milliseconds, turning
    /// this into what the design calls a `TimedEvent`.
    #[must_use]
    pub fn with_timestamp(mut self, timestamp_millis: i64) -> Self {
        self.timestamp = Some(timestamp_millis);
        self
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Downcast a `Typed` payload back to `T`. Returns `None` for a `Fields`
    /// payload or a type mismatch.
    pub fn payload_as<T: Any>(&self) -> Option<&T> {
        match &self.payload {
            Payload::Typed(value) => value.downcast_ref::<T>(),
            Payload::Fields(_) => None,
        }
    }

    /// Look up a field by name. Returns `None` for a `Typed` payload or a
    /// missing field.
    pub fn get_field(&self, field: &str) -> Option<&Value> {
        match &self.payload {
            Payload::Fields(map) => map.get(field),
            Payload::Typed(_) => None,
        }
    }

    /// All fields of a `Fields` payload. Returns `None` for a `Typed`
    /// payload.
    pub fn fields(&self) -> Option<&Map<String, Value>> {
        match &self.payload {
            Payload::Fields(map) => Some(map),
            Payload::Typed(_) => None,
        }
    }

    /// The stream-name tag, if this event is a `NamedEvent`.
    pub fn stream_name(&self) -> Option<&str> {
        self.stream_name.as_deref()
    }

    /// The stream-name tag, defaulting to `"default"`, the fallback every
    /// `Operator::apply` implementation is expected to tolerate for
    /// single-input operators (§6 of the design).
    pub fn stream_name_or_default(&self) -> &str {
        self.stream_name.as_deref().unwrap_or(DEFAULT_STREAM_NAME)
    }

    /// The event-time timestamp in milliseconds, if this event is a
    /// `TimedEvent`.
    pub fn timestamp(&self) -> Option<i64> {
        self.timestamp
    }
}

/// The stream name assumed for edges the caller did not explicitly label.
pub const DEFAULT_STREAM_NAME: &str = "default";

/// The channel every `EventCollector` registers up front, used whenever a
/// component does not declare any side channels.
pub const DEFAULT_CHANNEL: &str = "default";
