//! Phase execution loop

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Semaphore;
use tokio::task::AbortHandle;
use tokio_util::sync::CancellationToken;

use crate::error::{FabricError, FabricResult};
use crate::flow::{ErrorKind, FlowOutcome, FlowResult};
use crate::plan::{FlowSpec, Phase};
use crate::topology::{Host, Topology};
use crate::traits::FlowMeter;

/// Executes the flows of a phase with bounded concurrency
///
/// Two bounds apply: a phase-wide cap on flows in flight and, optionally, a
/// cap on flows sourced by any one host. Every input flow yields exactly one
/// result. Result order is the order the
/// flows were planned in, though callers must not rely on it.
pub struct FlowExecutor {
    /// Flow meter (shared across flow tasks via Arc)
    meter: Arc<dyn FlowMeter>,

    /// Maximum flows in flight
    concurrency: usize,

    /// Maximum flows in flight per source host
    per_source: Option<usize>,

    /// Per-flow timeout, counted from when the flow gets its slots
    timeout: Duration,

    /// Cancels the phase; in-flight flows are abandoned
    cancel: CancellationToken,
}

impl FlowExecutor {
    /// Create an executor
    pub fn new(meter: Arc<dyn FlowMeter>, concurrency: usize, timeout: Duration) -> Self {
        Self {
            meter,
            concurrency: concurrency.max(1),
            per_source: None,
            timeout,
            cancel: CancellationToken::new(),
        }
    }

    /// Observe `token` for cancellation
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Cap the flows any one host sources at a time
    pub fn with_per_source_limit(mut self, limit: usize) -> Self {
        self.per_source = Some(limit.max(1));
        self
    }

    /// Run every flow of `phase` and collect one result per flow
    ///
    /// # Errors
    ///
    /// [`FabricError::Cancelled`] if the token fires before the phase finishes,
    /// [`FabricError::Invariant`] if a flow references a host outside `topology`.
    pub async fn execute(
        &self,
        topology: &Topology,
        phase: &Phase,
    ) -> FabricResult<Vec<FlowResult>> {
        if self.cancel.is_cancelled() {
            return Err(FabricError::Cancelled);
        }

        let mut endpoints = Vec::with_capacity(phase.flows.len());
        for pair in &phase.flows {
            let src = resolve(topology, pair.src)?;
            let dst = resolve(topology, pair.dst)?;
            endpoints.push((pair.src, src.clone(), dst.clone()));
        }

        let start = Instant::now();
        tracing::info!(
            phase = %phase.name,
            flows = endpoints.len(),
            concurrency = self.concurrency,
            per_source = ?self.per_source,
            duration_secs = phase.spec.duration_secs,
            message_size = phase.spec.message_size,
            "Executing phase"
        );

        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let source_slots: Vec<Arc<Semaphore>> = match self.per_source {
            Some(limit) => (0..topology.len())
                .map(|_| Arc::new(Semaphore::new(limit)))
                .collect(),
            None => Vec::new(),
        };
        let mut handles = Vec::with_capacity(endpoints.len());

        for (src_index, src, dst) in endpoints {
            let names = (src.name.clone(), dst.name.clone());
            let meter = Arc::clone(&self.meter);
            let semaphore = Arc::clone(&semaphore);
            let source_slot = source_slots.get(src_index).cloned();
            let spec = phase.spec;
            let timeout = self.timeout;

            let handle = tokio::spawn(async move {
                // Source slot first so a waiting flow never holds a phase-wide slot.
                // Semaphores are never closed, so acquire cannot fail.
                let _source_permit = match source_slot {
                    Some(slot) => slot.acquire_owned().await.ok(),
                    None => None,
                };
                let _permit = semaphore.acquire_owned().await.ok();
                measure_one(meter.as_ref(), &src, &dst, &spec, timeout).await
            });
            handles.push((names, handle));
        }

        let aborts: Vec<AbortHandle> = handles.iter().map(|(_, h)| h.abort_handle()).collect();

        // Barrier: the phase ends when every task has reported
        let collect = async move {
            let mut results = Vec::with_capacity(handles.len());
            for ((src, dst), handle) in handles {
                match handle.await {
                    Ok(result) => results.push(result),
                    Err(e) => {
                        tracing::error!(src = %src, dst = %dst, error = %e, "Flow task panicked");
                        let message = e.to_string();
                        results.push(FlowResult::failed(src, dst, ErrorKind::Panicked, message));
                    }
                }
            }
            results
        };

        tokio::select! {
            biased;

            _ = self.cancel.cancelled() => {
                for abort in &aborts {
                    abort.abort();
                }
                tracing::info!(phase = %phase.name, "Phase cancelled, abandoning in-flight flows");
                Err(FabricError::Cancelled)
            }

            results = collect => {
                let failed = results.iter().filter(|r| !r.is_success()).count();
                tracing::info!(
                    phase = %phase.name,
                    succeeded = results.len() - failed,
                    failed,
                    elapsed_secs = start.elapsed().as_secs_f64(),
                    "Phase finished"
                );
                Ok(results)
            }
        }
    }
}

fn resolve(topology: &Topology, index: usize) -> FabricResult<&Host> {
    topology.host(index).ok_or_else(|| {
        FabricError::invariant(format!(
            "flow references host index {index}, topology has {} hosts",
            topology.len()
        ))
    })
}

/// Measure a single flow, absorbing every failure into the result
async fn measure_one(
    meter: &dyn FlowMeter,
    src: &Host,
    dst: &Host,
    spec: &FlowSpec,
    timeout: Duration,
) -> FlowResult {
    let result = match tokio::time::timeout(timeout, meter.measure(src, dst, spec)).await {
        Ok(Ok(measurement)) => match measurement.validate() {
            Ok(()) => FlowResult::success(&src.name, &dst.name, measurement),
            Err(reason) => {
                FlowResult::failed(&src.name, &dst.name, ErrorKind::MalformedOutput, reason)
            }
        },
        Ok(Err(e)) => FlowResult::failed(&src.name, &dst.name, e.to_error_kind(), e.to_string()),
        Err(_) => FlowResult::failed(
            &src.name,
            &dst.name,
            ErrorKind::Timeout,
            format!("no result within {timeout:?}"),
        ),
    };

    match &result.outcome {
        FlowOutcome::Success(m) => tracing::debug!(
            src = %src.name,
            dst = %dst.name,
            gbps = m.bandwidth_gbps(),
            retransmits = m.retransmits,
            "Flow measured"
        ),
        FlowOutcome::Failed { kind, message } => tracing::warn!(
            src = %src.name,
            dst = %dst.name,
            kind = ?kind,
            error = %message,
            "Flow failed"
        ),
    }

    result
}

impl std::fmt::Debug for FlowExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlowExecutor")
            .field("meter", &self.meter.name())
            .field("concurrency", &self.concurrency)
            .field("per_source", &self.per_source)
            .field("timeout", &self.timeout)
            .finish()
    }
}
