//! Aggregated results: per phase, per pattern and per run

use serde::{Deserialize, Serialize};

use crate::flow::ErrorKind;
use crate::pattern::PatternKind;

/// Round to two decimal places
pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// One successful flow as it appears in a phase summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowSummary {
    /// Source host name
    pub src: String,
    /// Destination host name
    pub dst: String,
    /// Achieved bandwidth, Gbps, two decimals
    pub bandwidth_gbps: f64,
    /// TCP retransmissions
    pub retransmits: u64,
}

/// One failed flow, kept for reporting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedFlow {
    /// Source host name
    pub src: String,
    /// Destination host name
    pub dst: String,
    /// Failure class
    pub kind: ErrorKind,
    /// Cause
    pub message: String,
}

/// Aggregate over one phase's flows
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PhaseResult {
    /// Phase name
    pub phase: String,

    /// Successful flows
    pub flows: Vec<FlowSummary>,

    /// Failed flows
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<FailedFlow>,

    /// Count of failed flows
    pub failed_flows: usize,

    /// Sum of successful flows' bandwidth, Gbps
    pub total_bandwidth_gbps: f64,

    /// Mean CPU over successful flows, percent; 0 when none succeeded
    pub avg_cpu_percent: f64,

    /// Mean bandwidth per successful flow, Gbps; 0 when none succeeded
    pub avg_per_flow_gbps: f64,

    /// Expected per-flow rate the phase was graded against, Gbps
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_flow_gbps: Option<f64>,

    /// Successful flows slower than `min_flow_gbps`
    #[serde(default)]
    pub below_threshold: usize,
}

impl PhaseResult {
    /// Flows that were executed (successful + failed)
    pub fn total_flows(&self) -> usize {
        self.flows.len() + self.failed_flows
    }

    /// Successful flows
    pub fn successful_flows(&self) -> usize {
        self.flows.len()
    }
}

/// Aggregate over all phases of a pattern
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternResult {
    /// Which pattern ran
    pub pattern: PatternKind,

    /// Phase results, in execution order
    pub phases: Vec<PhaseResult>,

    /// Mean of the phases' total bandwidth, Gbps
    pub total_bandwidth_gbps: f64,

    /// Mean per-flow bandwidth over phases with at least one success, Gbps
    pub avg_per_flow_gbps: f64,

    /// Mean CPU over phases with at least one success, percent
    pub avg_cpu_percent: f64,

    /// Failed flows summed across phases
    pub failed_flows: usize,

    /// Flows executed across phases
    pub total_flows: usize,

    /// Expected per-flow rate, Gbps, if the run set one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_flow_gbps: Option<f64>,

    /// Successful flows slower than `min_flow_gbps`, summed across phases
    #[serde(default)]
    pub below_threshold: usize,

    /// Why the pattern was not executed, if it was skipped
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skipped: Option<String>,
}

impl PatternResult {
    /// Zero-flow result for a pattern that could not be planned
    pub fn skipped(pattern: PatternKind, reason: impl Into<String>) -> Self {
        Self {
            pattern,
            phases: Vec::new(),
            total_bandwidth_gbps: 0.0,
            avg_per_flow_gbps: 0.0,
            avg_cpu_percent: 0.0,
            failed_flows: 0,
            total_flows: 0,
            min_flow_gbps: None,
            below_threshold: 0,
            skipped: Some(reason.into()),
        }
    }

    /// Phase by name
    pub fn phase(&self, name: &str) -> Option<&PhaseResult> {
        self.phases.iter().find(|p| p.phase == name)
    }

    /// Whether at least one flow succeeded
    pub fn any_success(&self) -> bool {
        self.phases.iter().any(|p| p.successful_flows() > 0)
    }

    /// Rate verdict: every planned flow succeeded at or above `min_flow_gbps`
    ///
    /// `None` when no rate was set or the pattern did not run.
    pub fn meets_rate(&self) -> Option<bool> {
        if self.skipped.is_some() {
            return None;
        }
        self.min_flow_gbps
            .map(|_| self.total_flows > 0 && self.failed_flows == 0 && self.below_threshold == 0)
    }
}

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Still executing
    Running,
    /// Every requested pattern ran
    Completed,
    /// Interrupted before all patterns ran
    Cancelled,
}

/// Accumulated results of one benchmark run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    /// When the run started
    pub timestamp: chrono::DateTime<chrono::Utc>,

    /// When the run ended
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<chrono::DateTime<chrono::Utc>>,

    /// Final status
    pub status: RunStatus,

    /// Pattern results in execution order, at most one per pattern
    pub patterns: Vec<PatternResult>,
}

impl RunResult {
    /// Start an empty run
    pub fn new() -> Self {
        Self {
            timestamp: chrono::Utc::now(),
            finished_at: None,
            status: RunStatus::Running,
            patterns: Vec::new(),
        }
    }

    /// Record a pattern result, replacing any earlier result for the same pattern
    pub fn insert(&mut self, result: PatternResult) {
        match self.patterns.iter_mut().find(|p| p.pattern == result.pattern) {
            Some(existing) => *existing = result,
            None => self.patterns.push(result),
        }
    }

    /// Result for `pattern`
    pub fn get(&self, pattern: PatternKind) -> Option<&PatternResult> {
        self.patterns.iter().find(|p| p.pattern == pattern)
    }

    /// Mark the run as ended
    pub fn finish(&mut self, status: RunStatus) {
        self.status = status;
        self.finished_at = Some(chrono::Utc::now());
    }

    /// Whether every requested pattern ran
    pub fn is_complete(&self) -> bool {
        self.status == RunStatus::Completed
    }

    /// Sum of every pattern's total bandwidth, Gbps
    pub fn combined_bandwidth_gbps(&self) -> f64 {
        round2(self.patterns.iter().map(|p| p.total_bandwidth_gbps).sum())
    }

    /// Failed flows across all patterns
    pub fn failed_flows(&self) -> usize {
        self.patterns.iter().map(|p| p.failed_flows).sum()
    }

    /// Rate verdict over every graded pattern; `None` if none was graded
    pub fn meets_rate(&self) -> Option<bool> {
        self.patterns
            .iter()
            .filter_map(PatternResult::meets_rate)
            .reduce(|all, ok| all && ok)
    }
}

impl Default for RunResult {
    fn default() -> Self {
        Self::new()
    }
}
