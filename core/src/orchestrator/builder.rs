//! Builder pattern for Orchestrator construction

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::config::RunConfig;
use crate::error::{FabricError, FabricResult};
use crate::pattern::PatternCatalog;
use crate::topology::Topology;
use crate::traits::{FlowMeter, ListenerControl};

use super::lifecycle::Orchestrator;

/// Builder for creating an Orchestrator with proper configuration
///
/// # Example
///
/// ```ignore
/// let orchestrator = OrchestratorBuilder::new()
///     .topology(topology)
///     .meter(meter)
///     .listeners(listeners)
///     .flows_per_host(4)
///     .build()?;
/// ```
pub struct OrchestratorBuilder {
    config: RunConfig,
    topology: Option<Arc<Topology>>,
    catalog: PatternCatalog,
    meter: Option<Arc<dyn FlowMeter>>,
    listeners: Option<Arc<dyn ListenerControl>>,
    cancel: Option<CancellationToken>,
}

impl OrchestratorBuilder {
    /// Create a new orchestrator builder with default configuration
    pub fn new() -> Self {
        Self {
            config: RunConfig::default(),
            topology: None,
            catalog: PatternCatalog::builtin(),
            meter: None,
            listeners: None,
            cancel: None,
        }
    }

    /// Set the full run configuration
    pub fn config(mut self, config: RunConfig) -> Self {
        self.config = config;
        self
    }

    /// Set per-host flow concurrency
    pub fn flows_per_host(mut self, flows_per_host: usize) -> Self {
        self.config.flows_per_host = flows_per_host;
        self
    }

    /// Set the topology
    pub fn topology(mut self, topology: impl Into<Arc<Topology>>) -> Self {
        self.topology = Some(topology.into());
        self
    }

    /// Replace the builtin pattern catalog
    pub fn catalog(mut self, catalog: PatternCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    /// Set the flow meter
    pub fn meter(mut self, meter: Arc<dyn FlowMeter>) -> Self {
        self.meter = Some(meter);
        self
    }

    /// Set the listener control
    pub fn listeners(mut self, listeners: Arc<dyn ListenerControl>) -> Self {
        self.listeners = Some(listeners);
        self
    }

    /// Use an externally owned cancellation token
    pub fn cancellation_token(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Build the orchestrator
    ///
    /// # Errors
    ///
    /// Returns an error if topology, meter or listeners are not set, or if
    /// configuration validation fails.
    pub fn build(self) -> FabricResult<Orchestrator> {
        let topology = self
            .topology
            .ok_or_else(|| FabricError::missing_config("topology"))?;

        let meter = self
            .meter
            .ok_or_else(|| FabricError::missing_config("meter"))?;

        let listeners = self
            .listeners
            .ok_or_else(|| FabricError::missing_config("listeners"))?;

        self.config.validate()?;

        Ok(Orchestrator::new(
            self.config,
            topology,
            self.catalog,
            meter,
            listeners,
            self.cancel.unwrap_or_default(),
        ))
    }
}

impl Default for OrchestratorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
