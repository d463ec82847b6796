//! The single error type returned by the public API.
//!
//! Graph-construction mistakes (`DuplicateEdge`, `DuplicateSource`,
//! `InvalidTopology`, `CyclicTopology`) are reported synchronously from the
//! builder methods that detect them and abort submission. `UntimedEvent` and
//! `QueueClosed` are runtime conditions observed by a single worker; the
//! worker logs them and exits (or continues, for per-event failures) rather
//! than propagating them back through `submit`.

use thiserror::Error;

/// Errors surfaced by the engine's public API.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The same operator was applied to a channel of a `Stream` twice.
    #[error("operator `{operator}` was already applied to channel `{channel}`")]
    DuplicateEdge {
        operator: String,
        channel: String,
    },

    /// `Job::add_source` was called twice with the same source.
    #[error("source `{0}` was already added to this job")]
    DuplicateSource(String),

    /// A topology operation is not valid for the component it targets, e.g.
    /// attaching an inbound queue to a `Source`, or a cycle was detected
    /// while walking the logical graph.
    #[error("invalid topology: {0}")]
    InvalidTopology(String),

    /// The DFS walk performed by `StreamEngine::submit` revisited a node
    /// already on the current path.
    #[error("cyclic topology detected at component `{0}`")]
    CyclicTopology(String),

    /// A `WindowingStrategy` received an event with no timestamp.
    #[error("timed events are required by time-based windowing strategies")]
    UntimedEvent,

    /// A blocking queue operation was attempted after the engine stopped.
    #[error("queue closed")]
    QueueClosed,
}

pub type EngineResult<T> = Result<T, EngineError>;
