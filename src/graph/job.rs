//! The job builder: owns every node of the logical graph and the edges
//! recorded while the user calls `Stream::apply_operator` (§3, §6 of the
//! design).

use std::cell::RefCell;
use std::rc::Rc;

use fxhash::FxHashSet;

use crate::error::{EngineError, EngineResult};
use crate::graph::component::{ComponentId, OperatorSpec, Source, SourceSpec};
use crate::graph::stream::Stream;

pub(crate) struct Edge {
    pub(crate) from: ComponentId,
    pub(crate) channel: String,
    pub(crate) stream_name: String,
    pub(crate) to: ComponentId,
}

pub(crate) struct JobInner {
    pub(crate) name: String,
    pub(crate) sources: Vec<SourceSpec>,
    pub(crate) operators: Vec<OperatorSpec>,
    pub(crate) edges: Vec<Edge>,
    applied: FxHashSet<(ComponentId, String, ComponentId)>,
    source_identities: FxHashSet<usize>,
}

/// A stream-processing job under construction.
///
/// Build the graph with [`Job::add_source`], [`Job::add_operator`], and the
/// `Stream`/`NamedStreams` builder methods they return, then hand the job to
/// [`crate::exec::StreamEngine::submit`]. A `Job` is frozen the moment
/// `submit` starts walking it; nothing here mutates the graph after that.
#[derive(Clone)]
pub struct Job {
    pub(crate) inner: Rc<RefCell<JobInner>>,
}

impl Job {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            inner: Rc::new(RefCell::new(JobInner {
                name: name.into(),
                sources: Vec::new(),
                operators: Vec::new(),
                edges: Vec::new(),
                applied: FxHashSet::default(),
                source_identities: FxHashSet::default(),
            })),
        }
    }

    pub fn name(&self) -> String {
        self.inner.borrow().name.clone()
    }

    /// Register a source with the job and return its outgoing `Stream`.
    ///
    /// Each distinct `SourceSpec` value may only be added once; this is
    /// enforced by identity (the spec's boxed `Source` pointer), matching
    /// the design's `DuplicateSource` error for "the same source object
    /// added twice".
    pub fn add_source(&self, spec: SourceSpec) -> EngineResult<Stream> {
        let mut inner = self.inner.borrow_mut();
        let identity = spec.source.as_ref() as *const dyn Source as *const () as usize;
        if !inner.source_identities.insert(identity) {
            return Err(EngineError::DuplicateSource(spec.name.clone()));
        }
        let id = inner.sources.len();
        inner.sources.push(spec);
        drop(inner);
        Ok(Stream::new(self.clone(), ComponentId::Source(id)))
    }

    /// Register an operator with the job. Returns a handle that can be
    /// applied to one or more `Stream`s (directly, or via `NamedStreams` for
    /// a join with several named inputs).
    pub fn add_operator(&self, spec: OperatorSpec) -> OperatorHandle {
        let mut inner = self.inner.borrow_mut();
        let id = inner.operators.len();
        inner.operators.push(spec);
        OperatorHandle {
            job: self.clone(),
            id: ComponentId::Operator(id),
        }
    }

    pub(crate) fn record_edge(
        &self,
        from: ComponentId,
        channel: &str,
        stream_name: &str,
        to: ComponentId,
    ) -> EngineResult<()> {
        let mut inner = self.inner.borrow_mut();
        let key = (from, channel.to_string(), to);
        if !inner.applied.insert(key) {
            let operator_name = match to {
                ComponentId::Operator(i) => inner.operators[i].name.clone(),
                ComponentId::Source(_) => unreachable!("a source cannot be an edge target"),
            };
            return Err(EngineError::DuplicateEdge {
                operator: operator_name,
                channel: channel.to_string(),
            });
        }
        inner.edges.push(Edge {
            from,
            channel: channel.to_string(),
            stream_name: stream_name.to_string(),
            to,
        });
        Ok(())
    }
}

/// A handle to an operator registered with a [`Job`], returned by
/// [`Job::add_operator`]. Cheap to clone; every clone refers to the same
/// underlying `OperatorSpec`.
#[derive(Clone)]
pub struct OperatorHandle {
    pub(crate) job: Job,
    pub(crate) id: ComponentId,
}

impl OperatorHandle {
    pub fn id(&self) -> ComponentId {
        self.id
    }

    /// The outgoing `Stream` of this operator, for connecting it to further
    /// downstream operators.
    pub fn outgoing_stream(&self) -> Stream {
        Stream::new(self.job.clone(), self.id)
    }
}
