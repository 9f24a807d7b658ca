//! Listener control through remote commands

use std::sync::Arc;

use async_trait::async_trait;
use fabric_bench_core::{Host, ListenerControl, ListenerError};

use crate::config::CommandTemplates;
use crate::ssh::RemoteExec;

/// Starts and stops listeners by running fixed commands on each host
pub struct CommandListeners {
    exec: Arc<dyn RemoteExec>,
    start: String,
    stop: String,
}

impl CommandListeners {
    /// Create listener control from the configured templates
    pub fn new(exec: Arc<dyn RemoteExec>, commands: &CommandTemplates) -> Self {
        Self {
            exec,
            start: commands.start_listener.clone(),
            stop: commands.stop_listener.clone(),
        }
    }

    async fn run(&self, host: &Host, command: &str) -> Result<(), ListenerError> {
        let output = self
            .exec
            .exec(host, command)
            .await
            .map_err(|e| ListenerError::new(&host.name, e.to_string()))?;

        if output.success() {
            Ok(())
        } else {
            Err(ListenerError::new(&host.name, output.failure_reason()))
        }
    }
}

#[async_trait]
impl ListenerControl for CommandListeners {
    async fn start(&self, host: &Host) -> Result<(), ListenerError> {
        self.run(host, &self.start).await
    }

    async fn stop(&self, host: &Host) -> Result<(), ListenerError> {
        self.run(host, &self.stop).await
    }
}

impl std::fmt::Debug for CommandListeners {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandListeners")
            .field("start", &self.start)
            .field("stop", &self.stop)
            .finish()
    }
}
