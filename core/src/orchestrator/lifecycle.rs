//! Orchestrator run lifecycle

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use tokio_util::sync::CancellationToken;

use crate::config::RunConfig;
use crate::error::{FabricError, FabricResult};
use crate::executor::FlowExecutor;
use crate::pattern::{PatternCatalog, PatternDescriptor, PatternKind};
use crate::plan::{plan, FlowPlan};
use crate::results::{PatternResult, RunResult, RunStatus};
use crate::topology::Topology;
use crate::traits::{FlowMeter, ListenerControl};

use super::aggregator::{aggregate_phase, combine_phases};

/// Orchestrator manages the benchmark run lifecycle
///
/// Patterns run one at a time, in the order requested. For each pattern the
/// listeners are started, the plan's phases are executed in order and
/// aggregated, and the listeners are stopped again before the settle pause.
pub struct Orchestrator {
    /// Run configuration
    pub(crate) config: RunConfig,

    /// Hosts under test
    pub(crate) topology: Arc<Topology>,

    /// Pattern descriptors
    pub(crate) catalog: PatternCatalog,

    /// Flow meter (shared across flow tasks)
    pub(crate) meter: Arc<dyn FlowMeter>,

    /// Listener lifecycle collaborator
    pub(crate) listeners: Arc<dyn ListenerControl>,

    /// Fired on external interrupt
    pub(crate) cancel: CancellationToken,
}

impl Orchestrator {
    /// Create a new orchestrator
    ///
    /// Use `OrchestratorBuilder` for a more ergonomic construction.
    pub fn new(
        config: RunConfig,
        topology: Arc<Topology>,
        catalog: PatternCatalog,
        meter: Arc<dyn FlowMeter>,
        listeners: Arc<dyn ListenerControl>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            config,
            topology,
            catalog,
            meter,
            listeners,
            cancel,
        }
    }

    /// Token that cancels the run when fired
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Request cancellation of the run
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    /// Get the run configuration
    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Get the topology
    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    /// Get the pattern catalog
    pub fn catalog(&self) -> &PatternCatalog {
        &self.catalog
    }

    /// Descriptor for `kind` with the run's overrides applied
    pub fn descriptor(&self, kind: PatternKind) -> PatternDescriptor {
        self.catalog
            .descriptor(kind)
            .with_overrides(&self.config.overrides)
    }

    /// Flow plan for `kind` over this run's topology
    pub fn plan_pattern(&self, kind: PatternKind) -> FlowPlan {
        plan(&self.descriptor(kind), &self.topology)
    }

    /// Run the requested patterns
    ///
    /// Unknown names fail before any listener is started. Cancellation stops
    /// the run between phases or patterns and yields a `Cancelled` result
    /// holding every pattern that completed. Listeners are always stopped
    /// before this returns.
    pub async fn run<S: AsRef<str>>(&self, patterns: &[S]) -> FabricResult<RunResult> {
        let kinds = self.catalog.resolve(patterns)?;
        if kinds.is_empty() {
            return Err(FabricError::config("no patterns requested"));
        }

        let start = Instant::now();
        tracing::info!(
            hosts = self.topology.len(),
            patterns = ?kinds.iter().map(PatternKind::key).collect::<Vec<_>>(),
            flows_per_host = self.config.flows_per_host,
            "Starting benchmark run"
        );

        let mut run = RunResult::new();
        let mut listeners_up = false;
        let outcome = self.run_patterns(&kinds, &mut run, &mut listeners_up).await;

        if listeners_up {
            self.stop_listeners().await;
        }

        let status = match outcome {
            Ok(()) => RunStatus::Completed,
            Err(FabricError::Cancelled) => {
                tracing::info!(
                    completed = run.patterns.len(),
                    requested = kinds.len(),
                    "Run cancelled"
                );
                RunStatus::Cancelled
            }
            Err(e) => {
                tracing::error!(error = %e, "Run aborted");
                return Err(e);
            }
        };
        run.finish(status);

        tracing::info!(
            elapsed_secs = start.elapsed().as_secs_f64(),
            status = ?run.status,
            combined_gbps = run.combined_bandwidth_gbps(),
            failed_flows = run.failed_flows(),
            meets_rate = ?run.meets_rate(),
            "Benchmark run finished"
        );

        Ok(run)
    }

    /// Run with Ctrl+C signal handling
    ///
    /// Ctrl+C cancels the run; listeners are still torn down.
    pub async fn run_with_signal_handling<S: AsRef<str>>(
        &self,
        patterns: &[S],
    ) -> FabricResult<RunResult> {
        let cancel = self.cancel.clone();

        let signal_handle = tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    tracing::info!("Received Ctrl+C, stopping after cleanup...");
                    cancel.cancel();
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to listen for Ctrl+C");
                }
            }
        });

        let result = self.run(patterns).await;

        signal_handle.abort();

        result
    }

    async fn run_patterns(
        &self,
        kinds: &[PatternKind],
        run: &mut RunResult,
        listeners_up: &mut bool,
    ) -> FabricResult<()> {
        for (idx, &kind) in kinds.iter().enumerate() {
            if self.cancel.is_cancelled() {
                return Err(FabricError::Cancelled);
            }

            let plan = self.plan_pattern(kind);
            if plan.is_empty() {
                let err = FabricError::planning(
                    kind.key(),
                    format!(
                        "topology has {} host(s), at least {} required",
                        self.topology.len(),
                        kind.min_hosts()
                    ),
                );
                tracing::warn!(pattern = %kind, error = %err, "Skipping pattern");
                run.insert(PatternResult::skipped(kind, err.to_string()));
                continue;
            }

            self.start_listeners().await;
            *listeners_up = true;
            self.pause(self.config.listener_warmup).await?;

            let result = self.execute_plan(&plan).await?;
            run.insert(result);

            self.stop_listeners().await;
            *listeners_up = false;

            if idx + 1 < kinds.len() {
                self.pause(self.config.settle).await?;
            }
        }

        Ok(())
    }

    /// Execute a plan's phases in order and combine their aggregates
    pub async fn execute_plan(&self, plan: &FlowPlan) -> FabricResult<PatternResult> {
        let start = Instant::now();
        tracing::info!(
            pattern = %plan.pattern,
            phases = plan.phases.len(),
            flows = plan.flow_count(),
            "Starting pattern"
        );

        let mut phases = Vec::with_capacity(plan.phases.len());
        for phase in &plan.phases {
            let executor = FlowExecutor::new(
                Arc::clone(&self.meter),
                self.config
                    .concurrency_bound(self.topology.len(), phase.flows.len()),
                self.config.flow_timeout(&phase.spec),
            )
            .with_per_source_limit(self.config.flows_per_host)
            .with_cancellation(self.cancel.clone());

            let results = executor.execute(&self.topology, phase).await?;
            let aggregated = aggregate_phase(&results, &phase.name, self.config.min_flow_gbps);

            tracing::info!(
                pattern = %plan.pattern,
                phase = %phase.name,
                total_gbps = aggregated.total_bandwidth_gbps,
                avg_per_flow_gbps = aggregated.avg_per_flow_gbps,
                avg_cpu_percent = aggregated.avg_cpu_percent,
                failed_flows = aggregated.failed_flows,
                below_threshold = aggregated.below_threshold,
                "Phase aggregated"
            );
            phases.push(aggregated);
        }

        let result = combine_phases(plan.pattern, phases);
        tracing::info!(
            pattern = %plan.pattern,
            total_gbps = result.total_bandwidth_gbps,
            failed_flows = result.failed_flows,
            meets_rate = ?result.meets_rate(),
            elapsed_secs = start.elapsed().as_secs_f64(),
            "Pattern completed"
        );

        Ok(result)
    }

    /// Start a listener on every host; failures are logged and tolerated
    async fn start_listeners(&self) {
        tracing::info!(hosts = self.topology.len(), "Starting listeners");

        let outcomes = join_all(
            self.topology
                .hosts()
                .iter()
                .map(|host| self.listeners.start(host)),
        )
        .await;

        for err in outcomes.into_iter().filter_map(Result::err) {
            tracing::warn!(
                host = %err.host,
                error = %err.message,
                "Listener failed to start, flows to this host are expected to fail"
            );
        }
    }

    /// Stop the listener on every host; failures are logged and tolerated
    async fn stop_listeners(&self) {
        tracing::info!(hosts = self.topology.len(), "Stopping listeners");

        let outcomes = join_all(
            self.topology
                .hosts()
                .iter()
                .map(|host| self.listeners.stop(host)),
        )
        .await;

        for err in outcomes.into_iter().filter_map(Result::err) {
            tracing::warn!(host = %err.host, error = %err.message, "Listener failed to stop");
        }
    }

    /// Sleep for `duration` unless cancelled first
    async fn pause(&self, duration: Duration) -> FabricResult<()> {
        tokio::select! {
            biased;

            _ = self.cancel.cancelled() => Err(FabricError::Cancelled),
            _ = tokio::time::sleep(duration) => Ok(()),
        }
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("config", &self.config)
            .field("hosts", &self.topology.len())
            .field("meter", &self.meter.name())
            .finish()
    }
}
