//! Scripted `RemoteExec` for meter and listener tests

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use fabric_bench_core::Host;

use crate::ssh::{CommandOutput, RemoteExec};

/// Answers every command on a host with a fixed output; unknown hosts succeed silently
#[derive(Default)]
pub(crate) struct ScriptedExec {
    responses: HashMap<String, CommandOutput>,
    unreachable: HashSet<String>,
    commands: Mutex<Vec<(String, String)>>,
}

impl ScriptedExec {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn respond(mut self, host: &str, status: i32, stdout: &str) -> Self {
        self.responses.insert(
            host.to_string(),
            CommandOutput {
                status: Some(status),
                stdout: stdout.to_string(),
                stderr: String::new(),
            },
        );
        self
    }

    pub(crate) fn unreachable(mut self, host: &str) -> Self {
        self.unreachable.insert(host.to_string());
        self
    }

    pub(crate) fn commands(&self) -> Vec<(String, String)> {
        self.commands.lock().unwrap().clone()
    }
}

#[async_trait]
impl RemoteExec for ScriptedExec {
    async fn exec(&self, host: &Host, command: &str) -> std::io::Result<CommandOutput> {
        self.commands
            .lock()
            .unwrap()
            .push((host.name.clone(), command.to_string()));

        if self.unreachable.contains(&host.name) {
            return Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "ssh: not found",
            ));
        }

        Ok(self.responses.get(&host.name).cloned().unwrap_or(CommandOutput {
            status: Some(0),
            stdout: String::new(),
            stderr: String::new(),
        }))
    }
}
