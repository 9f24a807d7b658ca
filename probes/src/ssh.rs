//! Remote command execution over SSH

use std::process::Stdio;

use async_trait::async_trait;
use fabric_bench_core::Host;
use tokio::process::Command;

use crate::config::SshConfig;

/// Captured result of a remote command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code; `None` if the process was killed by a signal
    pub status: Option<i32>,
    /// Standard output
    pub stdout: String,
    /// Standard error
    pub stderr: String,
}

impl CommandOutput {
    /// Whether the command exited with status 0
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }

    /// Short description of a failed command, for error messages
    pub fn failure_reason(&self) -> String {
        let stderr = self.stderr.trim();
        match (self.status, stderr.is_empty()) {
            (Some(code), true) => format!("exit status {code}"),
            (Some(code), false) => format!("exit status {code}: {stderr}"),
            (None, true) => "terminated by signal".to_string(),
            (None, false) => format!("terminated by signal: {stderr}"),
        }
    }
}

/// Runs a shell command on a host
#[async_trait]
pub trait RemoteExec: Send + Sync {
    /// Run `command` on `host` and capture its output
    ///
    /// A non-zero exit is reported through `CommandOutput::status`, not as an error.
    async fn exec(&self, host: &Host, command: &str) -> std::io::Result<CommandOutput>;
}

/// `RemoteExec` backed by the system `ssh` client
///
/// Uses key-based authentication in batch mode, so a host that would prompt
/// for a password fails immediately instead of hanging.
#[derive(Debug, Clone)]
pub struct SshRunner {
    config: SshConfig,
}

impl SshRunner {
    /// Create a runner
    pub fn new(config: SshConfig) -> Self {
        Self { config }
    }

    /// Arguments passed to `ssh` for running `command` on `host`
    pub fn args(&self, host: &Host, command: &str) -> Vec<String> {
        let mut args = vec![
            "-o".to_string(),
            "BatchMode=yes".to_string(),
            "-o".to_string(),
            format!("ConnectTimeout={}", self.config.connect_timeout.as_secs().max(1)),
        ];

        for option in &self.config.options {
            args.push("-o".to_string());
            args.push(option.clone());
        }

        if let Some(identity) = &self.config.identity_file {
            args.push("-i".to_string());
            args.push(identity.clone());
        }

        args.push(format!("{}@{}", self.config.user, host.mgmt_ip));
        args.push(command.to_string());
        args
    }
}

#[async_trait]
impl RemoteExec for SshRunner {
    async fn exec(&self, host: &Host, command: &str) -> std::io::Result<CommandOutput> {
        tracing::debug!(host = %host.name, addr = %host.mgmt_ip, command, "ssh exec");

        // kill_on_drop: a timed-out or cancelled flow must not leave ssh behind
        let output = Command::new("ssh")
            .args(self.args(host, command))
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await?;

        Ok(CommandOutput {
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}
