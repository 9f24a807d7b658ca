//! Flow executor: runs one phase's flows concurrently
//!
//! The executor is the fan-out point of a run. For each planned flow it
//! spawns a tokio task that:
//!
//! 1. Waits for a slot on its source host's semaphore, when a per-source
//!    limit is set, then for a slot on the phase's concurrency semaphore
//! 2. Calls the [`FlowMeter`](crate::traits::FlowMeter) under a per-flow timeout
//! 3. Converts whatever happens (success, meter error, timeout, panic) into
//!    exactly one [`FlowResult`](crate::flow::FlowResult)
//!
//! `execute` returns once every task has produced its result. Nothing a single
//! flow does can fail the phase; only cancellation ends it early.
//!
//! # Example
//!
//! ```ignore
//! use fabric_bench_core::executor::FlowExecutor;
//!
//! let executor = FlowExecutor::new(meter, 8, Duration::from_secs(90))
//!     .with_per_source_limit(2)
//!     .with_cancellation(token);
//!
//! let results = executor.execute(&topology, &phase).await?;
//! assert_eq!(results.len(), phase.flows.len());
//! ```

mod runner;

pub use runner::FlowExecutor;
