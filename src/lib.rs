//! `cascade` is a lightweight, single-process, parallel stream-processing
//! execution engine: the core of a mini-dataflow runtime in the spirit of
//! Storm/Heron/Flink's execution layer.
//!
//! A job driver builds a directed acyclic graph of [`Source`](graph::Source)s
//! and [`Operator`](graph::Operator)s connected by [`Stream`](graph::Stream)s
//! (§3, §4.4), then hands the finished [`Job`](graph::Job) to
//! [`StreamEngine::submit`](exec::StreamEngine::submit) (§4.9), which
//! materialises the physical topology (one [`EventQueue`](queue::EventQueue)
//! per logical edge, one worker thread per parallel instance, one dispatcher
//! thread per operator, §4.6-§4.8) and starts it.
//!
//! This crate has no concrete sources, operators, or wire protocol of its
//! own; those are the responsibility of the job driver embedding it (§1, §6).
//! See the `demos/` directory for runnable example jobs exercising the
//! public API end to end.

pub mod clock;
pub mod collector;
pub mod config;
pub mod error;
pub mod event;
pub mod exec;
pub mod graph;
pub mod grouping;
mod hash;
pub mod queue;
pub mod window;

pub use collector::EventCollector;
pub use config::EngineConfig;
pub use error::{EngineError, EngineResult};
pub use event::Event;
pub use exec::{RunningJob, StreamEngine};
pub use graph::{
    ComponentId, Job, NamedStreams, Operator, OperatorHandle, OperatorSpec, Source, SourceSpec, Stream, Streams,
    WindowedStream,
};
pub use grouping::{AllGrouping, FieldGrouping, GroupingStrategy, GroupingTarget, RoundRobin};
pub use window::{EventWindow, SlidingTimeWindowingStrategy, WindowOperator, WindowingOperator, WindowingStrategy};
