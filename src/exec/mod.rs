//! Materialises the physical topology from a logical [`Job`] and runs it
//! (§4.6-§4.9 of the design).
//!
//! [`StreamEngine::submit`] is the one place these pieces come together:
//! it walks the logical graph built with [`crate::graph`], creates one
//! [`ComponentExecutor`] per node, wires an [`EventQueue`] for every edge,
//! and starts every worker thread.

mod instance;

use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::graph::component::{ComponentId, Operator, OperatorSpec, Source, SourceSpec};
use crate::graph::job::{Edge, Job};
use crate::grouping::GroupingStrategy;
use crate::queue::EventQueue;

pub(crate) use instance::OutgoingQueues;

/// Per-component build state, filled in while walking the logical graph and
/// consumed by [`StreamEngine::submit`] once wiring is complete.
struct SourceBuild {
    name: String,
    parallelism: usize,
    source: Box<dyn Source>,
    outgoing: OutgoingQueues,
}

struct OperatorBuild {
    name: String,
    parallelism: usize,
    operator: Box<dyn Operator>,
    groupings: HashMap<String, Box<dyn GroupingStrategy>>,
    default_grouping: Box<dyn GroupingStrategy>,
    outgoing: OutgoingQueues,
    inbound: Vec<EventQueue>,
}

impl SourceBuild {
    fn register_channel(&mut self, channel: &str) {
        self.outgoing.entry(channel.to_string()).or_default();
    }

    fn add_outgoing_queue(&mut self, channel: &str, queue: EventQueue) {
        self.outgoing.entry(channel.to_string()).or_default().push(queue);
    }
}

impl OperatorBuild {
    fn register_channel(&mut self, channel: &str) {
        self.outgoing.entry(channel.to_string()).or_default();
    }

    fn add_outgoing_queue(&mut self, channel: &str, queue: EventQueue) {
        self.outgoing.entry(channel.to_string()).or_default().push(queue);
    }

    fn add_incoming_queue(&mut self, queue: EventQueue) {
        self.inbound.push(queue);
    }
}

/// A job the engine has started. Dropping this leaves the job running in
/// the background; call [`RunningJob::stop`] to shut it down (§5 of the
/// design).
pub struct RunningJob {
    name: String,
    queues: Vec<EventQueue>,
    handles: Vec<std::thread::JoinHandle<()>>,
}

impl RunningJob {
    /// Close every queue the engine created for this job (making every
    /// blocked and future `take`/`put` fail with `QueueClosed`) and join
    /// every worker thread. Events still sitting in a queue at the moment
    /// of the call are discarded, matching the design's at-most-once,
    /// best-effort shutdown semantics.
    pub fn stop(mut self) {
        log::debug!("stopping job `{}`", self.name);
        for queue in &self.queues {
            queue.close();
        }
        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }
        log::debug!("job `{}` stopped", self.name);
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Walks a logical [`Job`], materialises the physical topology it
/// describes, and starts it (§4.9 of the design).
pub struct StreamEngine {
    config: EngineConfig,
}

impl StreamEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    /// One-shot: consumes `job`, builds every executor, wires every
    /// connection, and starts every worker. Returns once startup is
    /// complete; the engine itself never joins the workers (see
    /// [`RunningJob::stop`]).
    pub fn submit(&self, job: Job) -> EngineResult<RunningJob> {
        let (name, sources, operators, edges) = {
            let mut inner = job.inner.borrow_mut();
            (
                inner.name.clone(),
                std::mem::take(&mut inner.sources),
                std::mem::take(&mut inner.operators),
                std::mem::take(&mut inner.edges),
            )
        };

        Self::check_acyclic(sources.len(), &operators, &edges)?;

        let mut source_builds: Vec<SourceBuild> = sources
            .into_iter()
            .map(|spec: SourceSpec| SourceBuild {
                name: spec.name,
                parallelism: spec.parallelism,
                source: spec.source,
                outgoing: IndexMap::new(),
            })
            .collect();

        let mut operator_builds: Vec<OperatorBuild> = operators
            .into_iter()
            .map(|spec: OperatorSpec| OperatorBuild {
                name: spec.name,
                parallelism: spec.parallelism,
                operator: spec.operator,
                groupings: spec.groupings,
                default_grouping: spec.default_grouping,
                outgoing: IndexMap::new(),
                inbound: Vec::new(),
            })
            .collect();

        // Wire every edge: one EventQueue per Connection, registered as an
        // outgoing queue of the upstream and an additional inbound queue of
        // the downstream dispatcher (§4.9 step 2).
        let mut all_queues = Vec::with_capacity(edges.len());
        for edge in &edges {
            let queue = EventQueue::new(self.config.queue_capacity, Some(edge.stream_name.clone()));
            all_queues.push(queue.clone());

            match edge.from {
                ComponentId::Source(i) => {
                    source_builds[i].register_channel(&edge.channel);
                    source_builds[i].add_outgoing_queue(&edge.channel, queue.clone());
                }
                ComponentId::Operator(i) => {
                    operator_builds[i].register_channel(&edge.channel);
                    operator_builds[i].add_outgoing_queue(&edge.channel, queue.clone());
                }
            }

            match edge.to {
                ComponentId::Operator(i) => operator_builds[i].add_incoming_queue(queue),
                ComponentId::Source(_) => {
                    return Err(EngineError::InvalidTopology(
                        "an edge cannot target a source".to_string(),
                    ))
                }
            }
        }

        log::debug!(
            "job `{name}`: built {} source(s), {} operator(s), {} connection(s)",
            source_builds.len(),
            operator_builds.len(),
            edges.len(),
        );

        let mut handles = Vec::new();

        for build in operator_builds {
            handles.extend(Self::start_operator(build));
        }
        for build in source_builds {
            handles.extend(Self::start_source(build));
        }

        Ok(RunningJob {
            name,
            queues: all_queues,
            handles,
        })
    }

    fn start_source(build: SourceBuild) -> Vec<std::thread::JoinHandle<()>> {
        let channels: Vec<String> = build.outgoing.keys().cloned().collect();
        (0..build.parallelism)
            .map(|i| {
                instance::spawn_source_instance(
                    build.name.clone(),
                    i,
                    build.source.clone(),
                    channels.clone(),
                    build.outgoing.clone(),
                )
            })
            .collect()
    }

    /// Start every instance of one operator plus its dispatcher. The
    /// dispatcher is spawned first so that instance input queues already
    /// exist by the time it begins multiplexing the inbound connections.
    fn start_operator(build: OperatorBuild) -> Vec<std::thread::JoinHandle<()>> {
        let OperatorBuild {
            name,
            parallelism,
            operator,
            groupings,
            default_grouping,
            outgoing,
            inbound,
        } = build;

        let instance_queues: Vec<EventQueue> = (0..parallelism)
            .map(|_| EventQueue::with_default_capacity(None))
            .collect();

        let channels: Vec<String> = outgoing.keys().cloned().collect();

        let mut handles = Vec::with_capacity(parallelism + 1);
        handles.push(spawn_dispatcher(
            name.clone(),
            inbound,
            instance_queues.clone(),
            groupings,
            default_grouping,
        ));

        for (i, input_queue) in instance_queues.into_iter().enumerate() {
            let operator = operator.clone();
            handles.push(instance::spawn_operator_instance(
                name.clone(),
                i,
                operator,
                input_queue,
                channels.clone(),
                outgoing.clone(),
            ));
        }

        handles
    }

    /// DFS over the edge graph from every source, failing with
    /// `CyclicTopology` the moment the walk revisits a node already on its
    /// current path (§4.9's "Graph cycles" note).
    fn check_acyclic(num_sources: usize, operators: &[OperatorSpec], edges: &[Edge]) -> EngineResult<()> {
        let mut adjacency: HashMap<ComponentId, Vec<ComponentId>> = HashMap::new();
        for edge in edges {
            adjacency.entry(edge.from).or_default().push(edge.to);
        }

        let mut visited: HashSet<ComponentId> = HashSet::new();
        let mut on_path: HashSet<ComponentId> = HashSet::new();

        fn visit(
            node: ComponentId,
            adjacency: &HashMap<ComponentId, Vec<ComponentId>>,
            visited: &mut HashSet<ComponentId>,
            on_path: &mut HashSet<ComponentId>,
            operators: &[OperatorSpec],
        ) -> EngineResult<()> {
            if on_path.contains(&node) {
                let label = match node {
                    ComponentId::Source(_) => node.to_string(),
                    ComponentId::Operator(i) => operators[i].name.clone(),
                };
                return Err(EngineError::CyclicTopology(label));
            }
            if !visited.insert(node) {
                return Ok(());
            }
            on_path.insert(node);
            if let Some(next) = adjacency.get(&node) {
                for &child in next {
                    visit(child, adjacency, visited, on_path, operators)?;
                }
            }
            on_path.remove(&node);
            Ok(())
        }

        for i in 0..num_sources {
            visit(ComponentId::Source(i), &adjacency, &mut visited, &mut on_path, operators)?;
        }
        for i in 0..operators.len() {
            visit(
                ComponentId::Operator(i),
                &adjacency,
                &mut visited,
                &mut on_path,
                operators,
            )?;
        }
        Ok(())
    }
}

/// One `select`-based dispatcher per operator (§4.7 of the design): reads
/// from every inbound `Connection` queue with a single multiplexed receive
/// (fixing the reference design's single-inbound-queue limitation, §9),
/// consults the per-stream-name grouping map, and routes the event onto one
/// or all instance input queues.
fn spawn_dispatcher(
    operator_name: String,
    mut inbound: Vec<EventQueue>,
    instance_queues: Vec<EventQueue>,
    mut groupings: HashMap<String, Box<dyn GroupingStrategy>>,
    mut default_grouping: Box<dyn GroupingStrategy>,
) -> std::thread::JoinHandle<()> {
    let label = format!("{operator_name} (dispatcher)");
    std::thread::Builder::new()
        .name(label.clone())
        .spawn(move || {
            log::debug!("{label} started with {} inbound queue(s)", inbound.len());
            loop {
                if inbound.is_empty() {
                    break;
                }
                match select_next(&mut inbound) {
                    Polled::Event(event) => {
                        let stream_name = event.stream_name_or_default().to_string();
                        let strategy = match groupings.get_mut(&stream_name) {
                            Some(strategy) => strategy,
                            None => &mut default_grouping,
                        };
                        match strategy.instance_for(&event, instance_queues.len()) {
                            crate::grouping::GroupingTarget::Instance(i) => {
                                log::trace!("{label}: routing event to instance {i}");
                                if let Err(err) = instance_queues[i].put(event) {
                                    log::error!("{label}: instance {i} queue closed: {err}");
                                }
                            }
                            crate::grouping::GroupingTarget::Broadcast => {
                                log::trace!("{label}: broadcasting event to {} instance(s)", instance_queues.len());
                                for queue in &instance_queues {
                                    if let Err(err) = queue.put(event.clone()) {
                                        log::error!("{label}: instance queue closed: {err}");
                                    }
                                }
                            }
                        }
                    }
                    Polled::AllClosed => break,
                }
            }
            log::debug!("{label} stopped");
        })
        .expect("failed to spawn dispatcher thread")
}

enum Polled {
    Event(crate::event::Event),
    AllClosed,
}

/// Blocks until any queue in `inbound` has an item, removing any queue that
/// turns out to be closed instead of returning it as an event. Rebuilds the
/// `flume::Selector` every call since it borrows the receivers for the
/// duration of the wait; the dispatcher is not on a latency-critical path
/// so the per-call setup cost is not a concern here.
fn select_next(inbound: &mut Vec<EventQueue>) -> Polled {
    loop {
        if inbound.is_empty() {
            return Polled::AllClosed;
        }

        let receivers: Vec<flume::Receiver<crate::event::Event>> =
            inbound.iter().map(EventQueue::receiver).collect();

        let mut selector = flume::Selector::new();
        for (i, receiver) in receivers.iter().enumerate() {
            selector = selector.recv(receiver, move |result| (i, result));
        }
        let (closed_index, result) = selector.wait();
        drop(selector);

        match result {
            Ok(event) => return Polled::Event(event),
            Err(_) => {
                inbound.remove(closed_index);
            }
        }
    }
}
