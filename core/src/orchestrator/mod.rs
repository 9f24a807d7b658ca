//! Orchestrator for benchmark run lifecycle management
//!
//! The Orchestrator coordinates a complete benchmark run:
//! - Planning each requested pattern over the topology
//! - Starting and stopping listeners around every pattern
//! - Executing phases through a bounded `FlowExecutor`
//! - Aggregating flow results into phase and pattern summaries
//! - Honouring cancellation between phases and patterns
//!
//! # Example
//!
//! ```ignore
//! use fabric_bench_core::OrchestratorBuilder;
//!
//! let orchestrator = OrchestratorBuilder::new()
//!     .topology(topology)
//!     .meter(meter)
//!     .listeners(listeners)
//!     .build()?;
//!
//! let run = orchestrator.run_with_signal_handling(&["all"]).await?;
//! ```

mod aggregator;
mod builder;
mod lifecycle;

pub use aggregator::{aggregate_phase, combine_phases};
pub use builder::OrchestratorBuilder;
pub use lifecycle::Orchestrator;
