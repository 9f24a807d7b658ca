//! Probe configuration
//!
//! How hosts are reached (SSH user, options, connect timeout) and which
//! commands measure a flow and manage its listener.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Placeholders recognised in command templates
pub const PLACEHOLDERS: [&str; 5] = [
    "{dst}",
    "{duration}",
    "{message_size}",
    "{streams}",
    "{block_len}",
];

/// Probe configuration error
#[derive(Debug, Error)]
pub enum ProbeConfigError {
    /// A required field is empty
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    /// A template cannot address its flow
    #[error("invalid template for {field}: {reason}")]
    InvalidTemplate {
        /// Template field
        field: &'static str,
        /// Cause
        reason: String,
    },

    /// Connect timeout out of range
    #[error("invalid connect timeout: {0:?}")]
    InvalidTimeout(Duration),

    /// Config file could not be read
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Config file could not be parsed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

// ============================================================================
// SSH settings
// ============================================================================

/// How hosts are reached
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SshConfig {
    /// Remote user
    #[serde(default = "default_user")]
    pub user: String,

    /// Extra `-o` options passed verbatim (e.g. "StrictHostKeyChecking=no")
    #[serde(default)]
    pub options: Vec<String>,

    /// Identity file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity_file: Option<String>,

    /// SSH connect timeout
    #[serde(default = "default_connect_timeout")]
    #[serde(with = "humantime_serde")]
    pub connect_timeout: Duration,
}

fn default_user() -> String {
    "cumulus".to_string()
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(10)
}

impl Default for SshConfig {
    fn default() -> Self {
        Self {
            user: default_user(),
            options: Vec::new(),
            identity_file: None,
            connect_timeout: default_connect_timeout(),
        }
    }
}

// ============================================================================
// Command templates
// ============================================================================

/// Commands run on the hosts
///
/// `measure` runs on the flow's source host and must print one JSON object
/// with `bandwidth_bps` and optionally `retransmits` and `cpu_percent`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandTemplates {
    /// Flow measurement, run on the source host
    #[serde(default = "default_measure")]
    pub measure: String,

    /// Listener start, run on every host
    #[serde(default = "default_start_listener")]
    pub start_listener: String,

    /// Listener stop, run on every host
    #[serde(default = "default_stop_listener")]
    pub stop_listener: String,
}

fn default_measure() -> String {
    concat!(
        "iperf3 -c {dst} -t {duration} -P {streams} -l {block_len} -J | ",
        "jq -c '{bandwidth_bps: .end.sum_sent.bits_per_second, ",
        "retransmits: (.end.sum_sent.retransmits // 0), ",
        "cpu_percent: .end.cpu_utilization_percent.host_total}'"
    )
    .to_string()
}

fn default_start_listener() -> String {
    "pkill iperf3; nohup iperf3 -s -D".to_string()
}

fn default_stop_listener() -> String {
    "pkill iperf3 || true".to_string()
}

impl Default for CommandTemplates {
    fn default() -> Self {
        Self {
            measure: default_measure(),
            start_listener: default_start_listener(),
            stop_listener: default_stop_listener(),
        }
    }
}

// ============================================================================
// Probe configuration
// ============================================================================

/// Full probe configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeConfig {
    /// SSH settings
    #[serde(default)]
    pub ssh: SshConfig,

    /// Command templates
    #[serde(default)]
    pub commands: CommandTemplates,
}

impl ProbeConfig {
    /// Load a JSON probe config; missing fields take their defaults
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ProbeConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;

        tracing::debug!(path = %path.display(), user = %config.ssh.user, "Loaded probe config");
        Ok(config)
    }

    /// Set the remote user
    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.ssh.user = user.into();
        self
    }

    /// Set the measurement template
    pub fn with_measure_template(mut self, template: impl Into<String>) -> Self {
        self.commands.measure = template.into();
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ProbeConfigError> {
        if self.ssh.user.is_empty() {
            return Err(ProbeConfigError::MissingField("ssh.user"));
        }

        if self.ssh.connect_timeout < Duration::from_secs(1)
            || self.ssh.connect_timeout > Duration::from_secs(300)
        {
            return Err(ProbeConfigError::InvalidTimeout(self.ssh.connect_timeout));
        }

        if self.commands.measure.trim().is_empty() {
            return Err(ProbeConfigError::MissingField("commands.measure"));
        }
        if !self.commands.measure.contains("{dst}") {
            return Err(ProbeConfigError::InvalidTemplate {
                field: "commands.measure",
                reason: "must reference {dst}".to_string(),
            });
        }

        if self.commands.start_listener.trim().is_empty() {
            return Err(ProbeConfigError::MissingField("commands.start_listener"));
        }
        if self.commands.stop_listener.trim().is_empty() {
            return Err(ProbeConfigError::MissingField("commands.stop_listener"));
        }

        Ok(())
    }
}
