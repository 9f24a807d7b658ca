//! Collaborator traits for flow measurement and listener lifecycle
//!
//! These traits are defined in core so the orchestrator can be driven by any
//! measurement backend. Implementations live in their own crates (probes/).

use std::time::Duration;

use async_trait::async_trait;

use crate::flow::{ErrorKind, FlowMeasurement};
use crate::plan::FlowSpec;
use crate::topology::Host;

// ============================================================================
// Flow Meter Trait
// ============================================================================

/// Measures one point-to-point flow between two hosts
///
/// Implementations may block for the whole flow duration. The executor bounds
/// each call with its own timeout, so implementations need not enforce one.
#[async_trait]
pub trait FlowMeter: Send + Sync {
    /// Meter identifier (e.g. "ssh-command")
    fn name(&self) -> &str;

    /// Run a flow from `src` to `dst` and report what was achieved
    async fn measure(
        &self,
        src: &Host,
        dst: &Host,
        spec: &FlowSpec,
    ) -> Result<FlowMeasurement, MeterError>;
}

/// Meter-side failures
#[derive(Debug, thiserror::Error)]
pub enum MeterError {
    /// The meter gave up waiting on its own
    #[error("measurement timed out after {0:?}")]
    Timeout(Duration),

    /// Remote command failed
    #[error("remote execution failed: {0}")]
    Remote(String),

    /// Output could not be parsed
    #[error("malformed measurement output: {0}")]
    Malformed(String),

    /// Local process could not be started
    #[error("failed to spawn measurement: {0}")]
    Spawn(#[from] std::io::Error),
}

impl MeterError {
    /// Convert to ErrorKind for result classification
    pub fn to_error_kind(&self) -> ErrorKind {
        match self {
            MeterError::Timeout(_) => ErrorKind::Timeout,
            MeterError::Remote(_) | MeterError::Spawn(_) => ErrorKind::RemoteFailure,
            MeterError::Malformed(_) => ErrorKind::MalformedOutput,
        }
    }
}

// ============================================================================
// Listener Control Trait
// ============================================================================

/// Starts and stops the measurement listener on a host
#[async_trait]
pub trait ListenerControl: Send + Sync {
    /// Start (or restart) the listener on `host`
    async fn start(&self, host: &Host) -> Result<(), ListenerError>;

    /// Stop the listener on `host`
    async fn stop(&self, host: &Host) -> Result<(), ListenerError>;
}

/// Listener start/stop failure; logged, never fatal
#[derive(Debug, thiserror::Error)]
#[error("listener on {host}: {message}")]
pub struct ListenerError {
    /// Host name
    pub host: String,
    /// Cause
    pub message: String,
}

impl ListenerError {
    /// Create a listener error
    pub fn new(host: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meter_error_to_error_kind() {
        assert_eq!(
            MeterError::Timeout(Duration::from_secs(30)).to_error_kind(),
            ErrorKind::Timeout
        );
        assert_eq!(
            MeterError::Remote("exit status 1".into()).to_error_kind(),
            ErrorKind::RemoteFailure
        );
        assert_eq!(
            MeterError::Malformed("expected value".into()).to_error_kind(),
            ErrorKind::MalformedOutput
        );

        let spawn = MeterError::from(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "ssh not found",
        ));
        assert_eq!(spawn.to_error_kind(), ErrorKind::RemoteFailure);
    }

    #[test]
    fn test_listener_error_display() {
        let err = ListenerError::new("host3", "connection refused");
        assert_eq!(err.to_string(), "listener on host3: connection refused");
    }
}
