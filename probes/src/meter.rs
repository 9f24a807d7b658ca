//! Command-template flow meter

use std::sync::Arc;

use async_trait::async_trait;
use fabric_bench_core::{FlowMeasurement, FlowMeter, FlowSpec, Host, MeterError};

use crate::ssh::RemoteExec;

/// Fill a command template for one flow
///
/// Unknown `{...}` sequences are left untouched, so templates may contain
/// shell or jq braces.
pub fn render(template: &str, dst: &Host, spec: &FlowSpec) -> String {
    template
        .replace("{dst}", &dst.data_ip)
        .replace("{duration}", &spec.duration_secs.to_string())
        .replace("{message_size}", &spec.message_size.to_string())
        .replace("{streams}", &spec.parallel_streams().to_string())
        .replace("{block_len}", &spec.block_len().to_string())
}

/// Parse the measurement printed by a measure command
///
/// The last non-empty line must be a JSON object with `bandwidth_bps` and
/// optionally `retransmits` and `cpu_percent`.
pub fn parse_measurement(stdout: &str) -> Result<FlowMeasurement, MeterError> {
    let line = stdout
        .lines()
        .map(str::trim)
        .rev()
        .find(|l| !l.is_empty())
        .ok_or_else(|| MeterError::Malformed("empty output".to_string()))?;

    serde_json::from_str(line).map_err(|e| MeterError::Malformed(e.to_string()))
}

/// Measures a flow by running a command on its source host
pub struct CommandMeter {
    exec: Arc<dyn RemoteExec>,
    template: String,
}

impl CommandMeter {
    /// Create a meter running `template` through `exec`
    pub fn new(exec: Arc<dyn RemoteExec>, template: impl Into<String>) -> Self {
        Self {
            exec,
            template: template.into(),
        }
    }

    /// The command template
    pub fn template(&self) -> &str {
        &self.template
    }
}

#[async_trait]
impl FlowMeter for CommandMeter {
    fn name(&self) -> &str {
        "ssh-command"
    }

    async fn measure(
        &self,
        src: &Host,
        dst: &Host,
        spec: &FlowSpec,
    ) -> Result<FlowMeasurement, MeterError> {
        let command = render(&self.template, dst, spec);
        let output = self.exec.exec(src, &command).await?;

        if !output.success() {
            return Err(MeterError::Remote(output.failure_reason()));
        }

        parse_measurement(&output.stdout)
    }
}

impl std::fmt::Debug for CommandMeter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandMeter")
            .field("template", &self.template)
            .finish()
    }
}
