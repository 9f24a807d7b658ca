//! Outcome of a single measured flow

use serde::{Deserialize, Serialize};

/// What a flow meter reports for a successful flow
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FlowMeasurement {
    /// Achieved throughput in bits per second
    pub bandwidth_bps: f64,

    /// TCP retransmissions observed by the sender
    #[serde(default)]
    pub retransmits: u64,

    /// Sender host CPU utilization, percent
    #[serde(default)]
    pub cpu_percent: f64,
}

impl FlowMeasurement {
    /// Create a measurement
    pub fn new(bandwidth_bps: f64, retransmits: u64, cpu_percent: f64) -> Self {
        Self {
            bandwidth_bps,
            retransmits,
            cpu_percent,
        }
    }

    /// Achieved throughput in Gbps
    pub fn bandwidth_gbps(&self) -> f64 {
        self.bandwidth_bps / 1e9
    }

    /// Reject values no meter could legitimately produce
    pub fn validate(&self) -> Result<(), String> {
        if !self.bandwidth_bps.is_finite() || self.bandwidth_bps < 0.0 {
            return Err(format!("invalid bandwidth: {}", self.bandwidth_bps));
        }
        if !self.cpu_percent.is_finite() || self.cpu_percent < 0.0 {
            return Err(format!("invalid cpu utilization: {}", self.cpu_percent));
        }
        Ok(())
    }
}

/// Classification of a failed flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Meter did not answer within the per-flow timeout
    Timeout,
    /// Remote execution failed (unreachable host, non-zero exit, ...)
    RemoteFailure,
    /// Meter answered with data that could not be used
    MalformedOutput,
    /// The measuring task panicked
    Panicked,
    /// Anything else
    Unknown,
}

/// Success or failure of one flow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FlowOutcome {
    /// Flow completed and was measured
    Success(FlowMeasurement),
    /// Flow failed; the phase continues without it
    Failed {
        /// Failure class
        kind: ErrorKind,
        /// Human-readable cause
        message: String,
    },
}

/// Result of one planned (source, destination) flow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowResult {
    /// Source host name
    pub src: String,

    /// Destination host name
    pub dst: String,

    /// What happened
    pub outcome: FlowOutcome,
}

impl FlowResult {
    /// A successful flow
    pub fn success(src: impl Into<String>, dst: impl Into<String>, m: FlowMeasurement) -> Self {
        Self {
            src: src.into(),
            dst: dst.into(),
            outcome: FlowOutcome::Success(m),
        }
    }

    /// A failed flow
    pub fn failed(
        src: impl Into<String>,
        dst: impl Into<String>,
        kind: ErrorKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            src: src.into(),
            dst: dst.into(),
            outcome: FlowOutcome::Failed {
                kind,
                message: message.into(),
            },
        }
    }

    /// Whether the flow was measured
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, FlowOutcome::Success(_))
    }

    /// The measurement, if the flow succeeded
    pub fn measurement(&self) -> Option<&FlowMeasurement> {
        match &self.outcome {
            FlowOutcome::Success(m) => Some(m),
            FlowOutcome::Failed { .. } => None,
        }
    }

    /// The failure class, if the flow failed
    pub fn error_kind(&self) -> Option<ErrorKind> {
        match &self.outcome {
            FlowOutcome::Success(_) => None,
            FlowOutcome::Failed { kind, .. } => Some(*kind),
        }
    }
}
