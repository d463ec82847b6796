//! `Stream`, `NamedStreams`, `Streams`, and the windowing builder wrapper
//! (§3, §4.4 of the design).

use crate::error::EngineResult;
use crate::event::DEFAULT_CHANNEL;
use crate::graph::component::{ComponentId, OperatorSpec};
use crate::graph::job::{Job, OperatorHandle};
use crate::window::{WindowOperator, WindowingOperator, WindowingStrategy};

/// The output of one component. Cloning a `Stream` is cheap: it is just a
/// `(job, source-node, channel)` handle, not a buffer of events.
#[derive(Clone)]
pub struct Stream {
    job: Job,
    from: ComponentId,
    channel: String,
}

impl Stream {
    pub(crate) fn new(job: Job, from: ComponentId) -> Self {
        Self {
            job,
            from,
            channel: DEFAULT_CHANNEL.to_string(),
        }
    }

    pub(crate) fn job(&self) -> &Job {
        &self.job
    }

    pub(crate) fn from(&self) -> ComponentId {
        self.from
    }

    pub(crate) fn channel(&self) -> &str {
        &self.channel
    }

    /// A view of this stream restricted to a named side channel (e.g. an
    /// `"errors"` channel an upstream operator emits onto via
    /// `collector.add(event, "errors")`). `apply_operator` on the returned
    /// view records the edge on that channel instead of `"default"`.
    #[must_use]
    pub fn select_channel(&self, channel: impl Into<String>) -> Stream {
        Stream {
            job: self.job.clone(),
            from: self.from,
            channel: channel.into(),
        }
    }

    /// Attach `op` to this stream under the default input name and channel.
    /// Fails with `DuplicateEdge` if `op` was already applied to this exact
    /// channel of this stream.
    pub fn apply_operator(&self, op: &OperatorHandle) -> EngineResult<Stream> {
        self.apply_operator_named(op, crate::event::DEFAULT_STREAM_NAME)
    }

    /// Like [`apply_operator`](Self::apply_operator), labelling the inbound
    /// edge with `stream_name` so `op`'s per-input grouping map and
    /// `Operator::apply`'s `stream_name` argument pick it out.
    pub fn apply_operator_named(&self, op: &OperatorHandle, stream_name: &str) -> EngineResult<Stream> {
        self.job
            .record_edge(self.from, &self.channel, stream_name, op.id())?;
        Ok(op.outgoing_stream())
    }

    /// Apply a `WindowingStrategy` to this stream, returning a builder whose
    /// `apply_operator` wraps a user [`WindowOperator`] in the engine's
    /// `WindowingOperator` adapter.
    #[must_use]
    pub fn with_windowing(&self, strategy: impl WindowingStrategy + 'static) -> WindowedStream {
        WindowedStream {
            stream: self.clone(),
            strategy: Box::new(strategy),
        }
    }
}

/// A `Stream` with a `WindowingStrategy` attached, waiting for the user's
/// `WindowOperator` (§4.4, §4.5 of the design).
pub struct WindowedStream {
    stream: Stream,
    strategy: Box<dyn WindowingStrategy>,
}

impl WindowedStream {
    /// Wrap `window_op` in the engine's `WindowingOperator` adapter,
    /// register it with `parallelism` instances, and connect it to the
    /// underlying stream.
    pub fn apply_operator(
        self,
        name: impl Into<String>,
        parallelism: usize,
        window_op: impl WindowOperator + 'static,
    ) -> EngineResult<Stream> {
        let windowing = WindowingOperator::new(self.strategy, Box::new(window_op));
        let job = self.stream.job().clone();
        let handle = job.add_operator(OperatorSpec::new(name, parallelism, windowing));
        self.stream.apply_operator(&handle)
    }
}

/// A mapping `{input_name -> Stream}` used to apply one operator across
/// several inbound streams, each labelled by its own input name. This is the
/// building block for joins (§4.4 of the design).
pub struct NamedStreams {
    pairs: Vec<(String, Stream)>,
}

impl NamedStreams {
    pub fn of<N: Into<String>>(pairs: impl IntoIterator<Item = (N, Stream)>) -> Self {
        Self {
            pairs: pairs.into_iter().map(|(name, s)| (name.into(), s)).collect(),
        }
    }

    /// Apply `op` to every named stream in turn, each under its own input
    /// name, so `op`'s per-stream-name grouping map is consulted on
    /// dispatch. Returns `op`'s outgoing stream.
    pub fn join(&self, op: &OperatorHandle) -> EngineResult<Stream> {
        for (name, stream) in &self.pairs {
            stream.apply_operator_named(op, name)?;
        }
        Ok(op.outgoing_stream())
    }
}

/// A list of `Stream`s all feeding the same operator under the default
/// input name, i.e. a union, as opposed to `NamedStreams`' per-input
/// labelling (§4.4 of the design).
pub struct Streams {
    streams: Vec<Stream>,
}

impl Streams {
    pub fn of(streams: impl IntoIterator<Item = Stream>) -> Self {
        Self {
            streams: streams.into_iter().collect(),
        }
    }

    pub fn apply_operator(&self, op: &OperatorHandle) -> EngineResult<Stream> {
        for stream in &self.streams {
            stream.apply_operator(op)?;
        }
        Ok(op.outgoing_stream())
    }
}
