//! Run configuration types

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{FabricError, FabricResult};
use crate::pattern::PatternOverrides;
use crate::plan::FlowSpec;

/// Run configuration
///
/// Defines how flows are dispatched, how patterns are spaced out and what
/// per-flow rate counts as healthy. Intervals use humantime strings in
/// config files (e.g. `"30s"`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Concurrent flows a single host may source
    pub flows_per_host: usize,

    /// Added to a flow's duration to form its timeout
    #[serde(with = "humantime_serde")]
    pub timeout_grace: Duration,

    /// Wait after starting listeners before the first flow
    #[serde(with = "humantime_serde")]
    pub listener_warmup: Duration,

    /// Pause between consecutive patterns
    #[serde(with = "humantime_serde")]
    pub settle: Duration,

    /// Expected per-flow rate in Gbps; flows below it fail the rate check
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_flow_gbps: Option<f64>,

    /// Descriptor overrides applied to every pattern
    pub overrides: PatternOverrides,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            flows_per_host: 2,
            timeout_grace: Duration::from_secs(30),
            listener_warmup: Duration::from_secs(5),
            settle: Duration::from_secs(10),
            min_flow_gbps: None,
            overrides: PatternOverrides::default(),
        }
    }
}

impl RunConfig {
    /// Load a JSON config file; missing fields take their defaults
    pub fn from_json_file(path: impl AsRef<Path>) -> FabricResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Set the descriptor overrides
    pub fn with_overrides(mut self, overrides: PatternOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    /// Set per-host concurrency
    pub fn with_flows_per_host(mut self, flows_per_host: usize) -> Self {
        self.flows_per_host = flows_per_host;
        self
    }

    /// Set the expected per-flow rate
    pub fn with_min_flow_gbps(mut self, min_flow_gbps: f64) -> Self {
        self.min_flow_gbps = Some(min_flow_gbps);
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> FabricResult<()> {
        if self.flows_per_host == 0 {
            return Err(FabricError::config("flows_per_host must be at least 1"));
        }
        if let Some(rate) = self.min_flow_gbps {
            if !rate.is_finite() || rate <= 0.0 {
                return Err(FabricError::config(format!(
                    "min_flow_gbps must be a positive number, got {rate}"
                )));
            }
        }
        self.overrides.validate()
    }

    /// Global concurrency bound for a phase: hosts × flows_per_host, within [1, flow_count]
    ///
    /// The executor additionally caps each source host at `flows_per_host`.
    pub fn concurrency_bound(&self, host_count: usize, flow_count: usize) -> usize {
        host_count
            .saturating_mul(self.flows_per_host)
            .min(flow_count)
            .max(1)
    }

    /// Timeout for a single flow of `spec`
    pub fn flow_timeout(&self, spec: &FlowSpec) -> Duration {
        Duration::from_secs(spec.duration_secs).saturating_add(self.timeout_grace)
    }
}
