//! SSH-driven collaborators for fabric-bench
//!
//! This crate provides implementations of the core collaborator traits:
//!
//! - `CommandMeter`: `FlowMeter` running a measurement command on the source host
//! - `CommandListeners`: `ListenerControl` starting and stopping listeners per host
//! - `SshRunner`: the `RemoteExec` both of them use to reach hosts

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod listener;
pub mod meter;
pub mod ssh;

#[cfg(test)]
mod testing;

use std::sync::Arc;

pub use config::{CommandTemplates, ProbeConfig, ProbeConfigError, SshConfig};
pub use listener::CommandListeners;
pub use meter::{parse_measurement, render, CommandMeter};
pub use ssh::{CommandOutput, RemoteExec, SshRunner};

/// Meter and listener control sharing one SSH runner
pub fn ssh_probes(config: &ProbeConfig) -> (CommandMeter, CommandListeners) {
    let exec: Arc<dyn RemoteExec> = Arc::new(SshRunner::new(config.ssh.clone()));
    (
        CommandMeter::new(Arc::clone(&exec), config.commands.measure.clone()),
        CommandListeners::new(exec, &config.commands),
    )
}
