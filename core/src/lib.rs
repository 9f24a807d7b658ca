//! fabric-bench-core: Core orchestration for synthetic collective traffic
//!
//! This crate holds everything a benchmark run needs apart from the actual
//! measurement tooling:
//!
//! - Topology and pattern catalog types
//! - The flow planner, mapping a pattern onto a topology
//! - The flow executor, running a phase's flows under bounded concurrency
//! - Result aggregation and the run orchestrator
//! - Collaborator traits (FlowMeter, ListenerControl) and error handling

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod executor;
pub mod flow;
pub mod orchestrator;
pub mod pattern;
pub mod plan;
pub mod results;
pub mod topology;
pub mod traits;

#[cfg(test)]
mod testing;

pub use config::RunConfig;
pub use error::*;
pub use executor::FlowExecutor;
pub use flow::*;
pub use orchestrator::{aggregate_phase, combine_phases, Orchestrator, OrchestratorBuilder};
pub use pattern::*;
pub use plan::{plan, FlowPair, FlowPlan, FlowSpec, Phase};
pub use results::*;
pub use topology::*;
pub use traits::*;
