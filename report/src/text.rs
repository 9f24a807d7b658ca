//! Plain-text run summary

use std::fmt;

use fabric_bench_core::{PatternResult, RunResult, RunStatus};

const WIDTH: usize = 80;

/// Render a run as the human-readable report
pub fn render_text(run: &RunResult) -> String {
    TextReport(run).to_string()
}

/// Display adapter producing the text report of a run
#[derive(Debug, Clone, Copy)]
pub struct TextReport<'a>(pub &'a RunResult);

impl fmt::Display for TextReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let run = self.0;
        let rule = "=".repeat(WIDTH);
        let generated = run.finished_at.unwrap_or(run.timestamp);

        writeln!(f, "{rule}")?;
        writeln!(f, "Collective Traffic Pattern Report")?;
        writeln!(f, "Generated: {}", generated.format("%Y-%m-%d %H:%M:%S UTC"))?;
        writeln!(f, "Status: {}", status_label(run.status))?;
        writeln!(f, "{rule}")?;

        for pattern in &run.patterns {
            write_pattern(f, pattern)?;
        }

        writeln!(f)?;
        writeln!(f, "{rule}")?;
        writeln!(f, "Summary")?;
        writeln!(f, "{rule}")?;
        writeln!(
            f,
            "Combined Bandwidth (all patterns): {:.2} Gbps",
            run.combined_bandwidth_gbps()
        )?;
        writeln!(f, "Failed Flows (all patterns): {}", run.failed_flows())?;
        if let Some(ok) = run.meets_rate() {
            writeln!(f, "Rate Check (all patterns): {}", verdict(ok))?;
        }

        Ok(())
    }
}

fn write_pattern(f: &mut fmt::Formatter<'_>, result: &PatternResult) -> fmt::Result {
    writeln!(f)?;
    writeln!(f, "{} Pattern Results", result.pattern.key().to_uppercase())?;
    writeln!(f, "{}", "-".repeat(40))?;

    if let Some(reason) = &result.skipped {
        return writeln!(f, "Skipped: {reason}");
    }

    writeln!(f, "Total Bandwidth: {:.2} Gbps", result.total_bandwidth_gbps)?;
    writeln!(f, "Average Per Flow: {:.2} Gbps", result.avg_per_flow_gbps)?;
    writeln!(
        f,
        "Failed Flows: {} of {}",
        result.failed_flows, result.total_flows
    )?;
    writeln!(f, "Average CPU Usage: {:.2}%", result.avg_cpu_percent)?;

    if let (Some(min), Some(ok)) = (result.min_flow_gbps, result.meets_rate()) {
        writeln!(
            f,
            "Rate Check: {} ({} below {:.2} Gbps, {} failed)",
            verdict(ok),
            result.below_threshold,
            min,
            result.failed_flows
        )?;
    }

    if result.phases.len() > 1 {
        for phase in &result.phases {
            writeln!(
                f,
                "  {}: {:.2} Gbps over {} flows ({} succeeded, {} failed)",
                phase.phase,
                phase.total_bandwidth_gbps,
                phase.total_flows(),
                phase.successful_flows(),
                phase.failed_flows
            )?;
        }
    }

    Ok(())
}

fn verdict(ok: bool) -> &'static str {
    if ok {
        "PASS"
    } else {
        "FAIL"
    }
}

fn status_label(status: RunStatus) -> &'static str {
    match status {
        RunStatus::Running => "running",
        RunStatus::Completed => "completed",
        RunStatus::Cancelled => "cancelled",
    }
}
