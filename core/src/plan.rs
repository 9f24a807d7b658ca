//! Flow planning: turning a pattern and a topology into phases of flows
//!
//! Planning is pure and deterministic. Hosts are referenced by their index in
//! the topology, so the same pattern over the same topology always yields the
//! same plan.

use serde::{Deserialize, Serialize};

use crate::pattern::{PatternDescriptor, PatternKind};
use crate::topology::Topology;

/// Messages at or above this size get one stream per 100 MB
const BYTES_PER_STREAM: u64 = 100_000_000;

/// Upper bound on parallel streams per flow
const MAX_STREAMS: u64 = 8;

/// Upper bound on the per-write block length
const MAX_BLOCK_LEN: u64 = 1_000_000;

/// A directed flow between two topology indices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FlowPair {
    /// Source host index
    pub src: usize,
    /// Destination host index
    pub dst: usize,
}

impl FlowPair {
    fn new(src: usize, dst: usize) -> Self {
        debug_assert_ne!(src, dst, "self-loop flow");
        Self { src, dst }
    }
}

/// Parameters every flow of a phase runs with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowSpec {
    /// Flow duration in seconds
    pub duration_secs: u64,

    /// Message size in bytes
    pub message_size: u64,
}

impl FlowSpec {
    /// Number of parallel streams the meter should open: one per 100 MB, 1 to 8
    pub fn parallel_streams(&self) -> u64 {
        (self.message_size / BYTES_PER_STREAM).clamp(1, MAX_STREAMS)
    }

    /// Length of each write, capped at 1 MB
    pub fn block_len(&self) -> u64 {
        self.message_size.min(MAX_BLOCK_LEN)
    }
}

/// One set of flows executed concurrently
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Phase {
    /// Phase name, e.g. "reduce-scatter"
    pub name: String,

    /// Flows of this phase
    pub flows: Vec<FlowPair>,

    /// Per-flow parameters
    pub spec: FlowSpec,
}

/// Ordered phases for one pattern execution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowPlan {
    /// Pattern the plan was built for
    pub pattern: PatternKind,

    /// Phases, in execution order
    pub phases: Vec<Phase>,
}

impl FlowPlan {
    /// Whether the plan contains no flows at all
    pub fn is_empty(&self) -> bool {
        self.phases.iter().all(|p| p.flows.is_empty())
    }

    /// Total number of flows across phases
    pub fn flow_count(&self) -> usize {
        self.phases.iter().map(|p| p.flows.len()).sum()
    }
}

/// Build the flow plan for `pattern` over `topology`
///
/// Fewer than two hosts yields an empty plan.
pub fn plan(pattern: &PatternDescriptor, topology: &Topology) -> FlowPlan {
    let n = topology.len();
    if n < 2 {
        return FlowPlan {
            pattern: pattern.kind,
            phases: Vec::new(),
        };
    }

    let spec = FlowSpec {
        duration_secs: pattern.duration_secs,
        message_size: pattern.message_size,
    };

    let phases = match pattern.kind {
        PatternKind::AllReduce => {
            // Both halves share the pattern's duration and split the buffer across hosts
            let half = FlowSpec {
                duration_secs: (pattern.duration_secs / 2).max(1),
                message_size: (pattern.message_size / n as u64).max(1),
            };
            vec![
                phase("reduce-scatter", reduce_scatter_flows(n), half),
                phase("allgather", all_to_all_flows(n), half),
            ]
        }
        PatternKind::AllGather => vec![phase("allgather", all_to_all_flows(n), spec)],
        PatternKind::Broadcast => vec![phase("broadcast", broadcast_flows(n), spec)],
        PatternKind::Ring => vec![phase("ring", ring_flows(n), spec)],
        PatternKind::ParameterServer => {
            vec![phase("parameter_server", parameter_server_flows(n), spec)]
        }
    };

    FlowPlan {
        pattern: pattern.kind,
        phases,
    }
}

fn phase(name: &str, flows: Vec<FlowPair>, spec: FlowSpec) -> Phase {
    Phase {
        name: name.to_string(),
        flows,
        spec,
    }
}

/// Targets of host `host_idx` during reduce-scatter: the next `floor(sqrt(n))` hosts
/// around the ring, never the host itself
pub fn reduce_scatter_targets(host_idx: usize, n: usize) -> Vec<usize> {
    (0..isqrt(n))
        .map(|k| (host_idx + k + 1) % n)
        .filter(|&target| target != host_idx)
        .collect()
}

fn reduce_scatter_flows(n: usize) -> Vec<FlowPair> {
    (0..n)
        .flat_map(|i| {
            reduce_scatter_targets(i, n)
                .into_iter()
                .map(move |j| FlowPair::new(i, j))
        })
        .collect()
}

fn all_to_all_flows(n: usize) -> Vec<FlowPair> {
    let mut flows = Vec::with_capacity(n * (n - 1));
    for i in 0..n {
        for j in 0..n {
            if i != j {
                flows.push(FlowPair::new(i, j));
            }
        }
    }
    flows
}

fn broadcast_flows(n: usize) -> Vec<FlowPair> {
    (1..n).map(|dst| FlowPair::new(0, dst)).collect()
}

fn ring_flows(n: usize) -> Vec<FlowPair> {
    (0..n).map(|i| FlowPair::new(i, (i + 1) % n)).collect()
}

fn parameter_server_flows(n: usize) -> Vec<FlowPair> {
    // Pushes and pulls run concurrently in a single phase
    let push = (1..n).map(|worker| FlowPair::new(worker, 0));
    let pull = (1..n).map(|worker| FlowPair::new(0, worker));
    push.chain(pull).collect()
}

/// Integer square root, rounded down
fn isqrt(n: usize) -> usize {
    let mut root = (n as f64).sqrt() as usize;
    while root * root > n {
        root -= 1;
    }
    while (root + 1) * (root + 1) <= n {
        root += 1;
    }
    root
}
