//! The `Source`/`Operator` contract and the specs that attach a name,
//! parallelism, and grouping configuration to them (§3, §6 of the design).

use std::collections::HashMap;
use std::time::Duration;

use dyn_clone::DynClone;

use crate::collector::EventCollector;
use crate::event::Event;
use crate::grouping::{GroupingStrategy, RoundRobin};

/// A node with no inputs that produces events into the job.
///
/// `setup_instance` is called exactly once, before the first call to
/// `get_events`, so that per-instance state (sockets, counters) is created
/// there rather than at construction time, since the engine deep-clones the
/// user's `Source` once per parallel instance before `setup_instance` runs.
pub trait Source: DynClone + Send {
    fn setup_instance(&mut self, instance: usize);

    /// Produce zero or more events into `collector`. Called repeatedly in a
    /// tight loop; a call that produces nothing causes an immediate next
    /// call, so implementations that poll an external system should block
    /// there themselves rather than busy-spin.
    fn get_events(&mut self, collector: &mut EventCollector);
}

dyn_clone::clone_trait_object!(Source);

/// A node with one or more named inputs that transforms events.
///
/// `stream_name` in `apply` equals the name the upstream `Stream` was
/// attached under (`"default"` unless the edge came from a `NamedStreams`
/// join or an explicit `stream_name` argument); single-input operators
/// should simply ignore it.
pub trait Operator: DynClone + Send {
    fn setup_instance(&mut self, instance: usize);

    fn apply(&mut self, stream_name: &str, event: &Event, collector: &mut EventCollector);

    /// Opt in to idle ticking: if `Some(interval)`, the engine calls
    /// [`Operator::on_idle_tick`] every time `interval` elapses with no
    /// inbound event, instead of blocking indefinitely on the input queue.
    /// Only [`crate::window::WindowingOperator`] needs this; every other
    /// operator keeps the default `None` and is never ticked.
    fn idle_tick_interval(&self) -> Option<Duration> {
        None
    }

    /// Called instead of `apply` when the idle ticker fires. The default
    /// implementation is a no-op; overridden by `WindowingOperator`.
    fn on_idle_tick(&mut self, _collector: &mut EventCollector) {}
}

dyn_clone::clone_trait_object!(Operator);

/// Identifies one node of the logical graph. Streams and `NamedStreams`
/// carry only these handles, never direct references to the node's data.
/// The actual `Source`/`Operator` trait objects are owned by the `Job`
/// (§9 of the design: "nodes are owned by the Job; Streams hold only
/// handles").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentId {
    Source(usize),
    Operator(usize),
}

impl std::fmt::Display for ComponentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ComponentId::Source(i) => write!(f, "source#{i}"),
            ComponentId::Operator(i) => write!(f, "operator#{i}"),
        }
    }
}

/// A `Source` plus its name and requested parallelism.
pub struct SourceSpec {
    pub(crate) name: String,
    pub(crate) parallelism: usize,
    pub(crate) source: Box<dyn Source>,
}

impl SourceSpec {
    pub fn new(name: impl Into<String>, parallelism: usize, source: impl Source + 'static) -> Self {
        assert!(parallelism >= 1, "parallelism must be at least 1");
        Self {
            name: name.into(),
            parallelism,
            source: Box::new(source),
        }
    }
}

/// An `Operator` plus its name, requested parallelism, and per-input-name
/// grouping map (§3's `{stream_name -> GroupingStrategy}`, defaulting to
/// `{default: RoundRobin}`).
pub struct OperatorSpec {
    pub(crate) name: String,
    pub(crate) parallelism: usize,
    pub(crate) operator: Box<dyn Operator>,
    pub(crate) groupings: HashMap<String, Box<dyn GroupingStrategy>>,
    pub(crate) default_grouping: Box<dyn GroupingStrategy>,
}

impl OperatorSpec {
    /// A regular operator; inputs with no explicit grouping use
    /// `RoundRobin`.
    pub fn new(name: impl Into<String>, parallelism: usize, operator: impl Operator + 'static) -> Self {
        assert!(parallelism >= 1, "parallelism must be at least 1");
        Self {
            name: name.into(),
            parallelism,
            operator: Box::new(operator),
            groupings: HashMap::new(),
            default_grouping: Box::new(RoundRobin::new()),
        }
    }

    /// A `JoinOperator`: inputs with no explicit grouping use `AllGrouping`
    /// instead of `RoundRobin`, so every named input is broadcast to every
    /// instance unless overridden.
    pub fn join(name: impl Into<String>, parallelism: usize, operator: impl Operator + 'static) -> Self {
        let mut spec = Self::new(name, parallelism, operator);
        spec.default_grouping = Box::new(crate::grouping::AllGrouping::new());
        spec
    }

    /// Override the grouping strategy used for events arriving under
    /// `stream_name`.
    #[must_use]
    pub fn with_grouping(mut self, stream_name: impl Into<String>, strategy: impl GroupingStrategy + 'static) -> Self {
        self.groupings.insert(stream_name.into(), Box::new(strategy));
        self
    }
}
