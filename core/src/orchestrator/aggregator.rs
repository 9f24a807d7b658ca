//! Result aggregation from flow results to phase and pattern summaries

use crate::flow::{FlowOutcome, FlowResult};
use crate::pattern::PatternKind;
use crate::results::{round2, FailedFlow, FlowSummary, PatternResult, PhaseResult};

/// Aggregate one phase's flow results
///
/// Failed flows are counted but excluded from every bandwidth and CPU figure.
/// With `min_flow_gbps` set, successful flows slower than that rate are
/// counted in `below_threshold`.
pub fn aggregate_phase(
    results: &[FlowResult],
    phase: &str,
    min_flow_gbps: Option<f64>,
) -> PhaseResult {
    let mut flows = Vec::new();
    let mut failures = Vec::new();
    let mut total_bandwidth = 0.0;
    let mut total_cpu = 0.0;
    let mut below_threshold = 0;

    for result in results {
        match &result.outcome {
            FlowOutcome::Success(m) => {
                let gbps = m.bandwidth_gbps();
                if min_flow_gbps.is_some_and(|min| gbps < min) {
                    below_threshold += 1;
                }
                flows.push(FlowSummary {
                    src: result.src.clone(),
                    dst: result.dst.clone(),
                    bandwidth_gbps: round2(gbps),
                    retransmits: m.retransmits,
                });
                total_bandwidth += gbps;
                total_cpu += m.cpu_percent;
            }
            FlowOutcome::Failed { kind, message } => failures.push(FailedFlow {
                src: result.src.clone(),
                dst: result.dst.clone(),
                kind: *kind,
                message: message.clone(),
            }),
        }
    }

    let successful = flows.len();
    let (avg_cpu_percent, avg_per_flow_gbps) = if successful > 0 {
        (
            round2(total_cpu / successful as f64),
            round2(total_bandwidth / successful as f64),
        )
    } else {
        (0.0, 0.0)
    };

    PhaseResult {
        phase: phase.to_string(),
        flows,
        failed_flows: failures.len(),
        failures,
        total_bandwidth_gbps: round2(total_bandwidth),
        avg_cpu_percent,
        avg_per_flow_gbps,
        min_flow_gbps,
        below_threshold,
    }
}

/// Combine a pattern's phases
///
/// Phases run one after another, so the pattern-level bandwidth is the mean
/// of the phase totals rather than their sum.
pub fn combine_phases(pattern: PatternKind, phases: Vec<PhaseResult>) -> PatternResult {
    let total_bandwidth_gbps = mean(phases.iter().map(|p| p.total_bandwidth_gbps));

    let measured: Vec<&PhaseResult> = phases.iter().filter(|p| p.successful_flows() > 0).collect();
    let avg_per_flow_gbps = mean(measured.iter().map(|p| p.avg_per_flow_gbps));
    let avg_cpu_percent = mean(measured.iter().map(|p| p.avg_cpu_percent));

    PatternResult {
        pattern,
        failed_flows: phases.iter().map(|p| p.failed_flows).sum(),
        total_flows: phases.iter().map(|p| p.total_flows()).sum(),
        min_flow_gbps: phases.iter().find_map(|p| p.min_flow_gbps),
        below_threshold: phases.iter().map(|p| p.below_threshold).sum(),
        total_bandwidth_gbps,
        avg_per_flow_gbps,
        avg_cpu_percent,
        phases,
        skipped: None,
    }
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count > 0 {
        round2(sum / count as f64)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::{ErrorKind, FlowMeasurement};

    fn ok(src: &str, dst: &str, gbps: f64, cpu: f64) -> FlowResult {
        FlowResult::success(src, dst, FlowMeasurement::new(gbps * 1e9, 0, cpu))
    }

    fn failed(src: &str, dst: &str) -> FlowResult {
        FlowResult::failed(src, dst, ErrorKind::RemoteFailure, "connection refused")
    }

    #[test]
    fn test_aggregate_mixed_results() {
        let results = vec![
            ok("h1", "h2", 5.0, 10.0),
            ok("h2", "h3", 10.0, 20.0),
            ok("h3", "h1", 15.0, 30.0),
            failed("h1", "h3"),
        ];

        let phase = aggregate_phase(&results, "ring", None);

        assert_eq!(phase.phase, "ring");
        assert_eq!(phase.total_bandwidth_gbps, 30.0);
        assert_eq!(phase.avg_per_flow_gbps, 10.0);
        assert_eq!(phase.avg_cpu_percent, 20.0);
        assert_eq!(phase.failed_flows, 1);
        assert_eq!(phase.flows.len(), 3);
        assert_eq!(phase.total_flows(), 4);
        assert_eq!(phase.failures[0].kind, ErrorKind::RemoteFailure);
    }

    #[test]
    fn test_aggregate_all_failed_has_no_nan() {
        let results = vec![failed("h1", "h2"), failed("h2", "h1")];

        let phase = aggregate_phase(&results, "allgather", None);

        assert_eq!(phase.total_bandwidth_gbps, 0.0);
        assert_eq!(phase.avg_cpu_percent, 0.0);
        assert_eq!(phase.avg_per_flow_gbps, 0.0);
        assert_eq!(phase.failed_flows, 2);
        assert!(phase.flows.is_empty());
    }

    #[test]
    fn test_aggregate_empty() {
        let phase = aggregate_phase(&[], "broadcast", None);
        assert_eq!(phase.total_flows(), 0);
        assert_eq!(phase.total_bandwidth_gbps, 0.0);
    }

    #[test]
    fn test_aggregate_rounds_totals() {
        let results = vec![
            ok("h1", "h2", 9.4, 1.0),
            ok("h1", "h3", 9.4, 1.0),
            ok("h1", "h4", 9.4, 1.0),
        ];

        let phase = aggregate_phase(&results, "broadcast", None);
        assert_eq!(phase.total_bandwidth_gbps, 28.2);
        assert_eq!(phase.flows[0].bandwidth_gbps, 9.4);
    }

    #[test]
    fn test_combine_averages_phase_totals() {
        let reduce_scatter = aggregate_phase(&[ok("h1", "h2", 20.0, 10.0)], "reduce-scatter", None);
        let allgather = aggregate_phase(
            &[ok("h1", "h2", 20.0, 30.0), ok("h2", "h1", 20.0, 30.0), failed("h1", "h3")],
            "allgather",
            None,
        );

        let result = combine_phases(PatternKind::AllReduce, vec![reduce_scatter, allgather]);

        // mean of 20 and 40, not their sum
        assert_eq!(result.total_bandwidth_gbps, 30.0);
        assert_eq!(result.avg_per_flow_gbps, 20.0);
        assert_eq!(result.avg_cpu_percent, 20.0);
        assert_eq!(result.failed_flows, 1);
        assert_eq!(result.total_flows, 4);
        assert!(result.phase("allgather").is_some());
        assert!(result.skipped.is_none());
    }

    #[test]
    fn test_combine_single_phase_matches_phase() {
        let phase = aggregate_phase(&[ok("h1", "h2", 7.5, 4.0), failed("h2", "h1")], "ring", None);
        let result = combine_phases(PatternKind::Ring, vec![phase.clone()]);

        assert_eq!(result.total_bandwidth_gbps, phase.total_bandwidth_gbps);
        assert_eq!(result.avg_per_flow_gbps, phase.avg_per_flow_gbps);
        assert_eq!(result.avg_cpu_percent, phase.avg_cpu_percent);
    }

    #[test]
    fn test_combine_all_failed_reports_planned_count() {
        let phase = aggregate_phase(&[failed("h1", "h2"), failed("h2", "h1")], "ring", None);
        let result = combine_phases(PatternKind::Ring, vec![phase]);

        assert_eq!(result.failed_flows, 2);
        assert_eq!(result.total_flows, 2);
        assert_eq!(result.total_bandwidth_gbps, 0.0);
        assert!(!result.any_success());
    }

    #[test]
    fn test_flows_below_rate_are_counted() {
        let results = vec![
            ok("h1", "h2", 9.4, 1.0),
            ok("h2", "h3", 8.0, 1.0),
            ok("h3", "h4", 6.1, 1.0),
            failed("h4", "h1"),
        ];

        let phase = aggregate_phase(&results, "ring", Some(8.0));

        // 8.0 meets an 8.0 threshold; the failed flow is not a slow flow
        assert_eq!(phase.below_threshold, 1);
        assert_eq!(phase.min_flow_gbps, Some(8.0));

        let result = combine_phases(PatternKind::Ring, vec![phase]);
        assert_eq!(result.below_threshold, 1);
        assert_eq!(result.meets_rate(), Some(false));
    }

    #[test]
    fn test_rate_check_across_phases() {
        let fast = |name: &str| aggregate_phase(&[ok("h1", "h2", 9.0, 1.0)], name, Some(8.0));

        let result = combine_phases(
            PatternKind::AllReduce,
            vec![fast("reduce-scatter"), fast("allgather")],
        );
        assert_eq!(result.below_threshold, 0);
        assert_eq!(result.meets_rate(), Some(true));

        let slow = aggregate_phase(&[ok("h1", "h2", 2.0, 1.0)], "allgather", Some(8.0));
        let result = combine_phases(PatternKind::AllReduce, vec![fast("reduce-scatter"), slow]);
        assert_eq!(result.below_threshold, 1);
        assert_eq!(result.meets_rate(), Some(false));
    }

    #[test]
    fn test_failed_flows_fail_the_rate_check() {
        let results = [ok("h1", "h2", 9.0, 1.0), failed("h2", "h1")];
        let phase = aggregate_phase(&results, "ring", Some(8.0));
        let result = combine_phases(PatternKind::Ring, vec![phase]);

        assert_eq!(result.below_threshold, 0);
        assert_eq!(result.meets_rate(), Some(false));
    }

    #[test]
    fn test_no_threshold_means_no_verdict() {
        let phase = aggregate_phase(&[ok("h1", "h2", 0.5, 1.0)], "ring", None);
        assert_eq!(phase.below_threshold, 0);

        let result = combine_phases(PatternKind::Ring, vec![phase]);
        assert_eq!(result.meets_rate(), None);
    }

    #[test]
    fn test_combine_no_phases() {
        let result = combine_phases(PatternKind::Broadcast, Vec::new());
        assert_eq!(result.total_bandwidth_gbps, 0.0);
        assert_eq!(result.total_flows, 0);
    }
}
