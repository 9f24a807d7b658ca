//! Report generation for benchmark runs
//!
//! This crate provides:
//!
//! - A plain-text summary of a run (per pattern and combined)
//! - JSON persistence of the full `RunResult`

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod json_export;
pub mod text;

use std::path::{Path, PathBuf};

use fabric_bench_core::RunResult;
use thiserror::Error;

pub use json_export::{export_json, load_json};
pub use text::{render_text, TextReport};

/// File name of the text report
pub const TEXT_REPORT: &str = "traffic_generation_report.txt";

/// File name of the JSON results
pub const JSON_RESULTS: &str = "traffic_generation_results.json";

/// Report output failure
#[derive(Debug, Error)]
pub enum ReportError {
    /// File could not be written or read
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Results could not be (de)serialized
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Paths of the files written by [`write_outputs`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportPaths {
    /// Text report
    pub text: PathBuf,
    /// JSON results
    pub json: PathBuf,
}

/// Write the text report and JSON results into `dir`, creating it if needed
pub fn write_outputs(run: &RunResult, dir: &Path) -> Result<ReportPaths, ReportError> {
    std::fs::create_dir_all(dir)?;

    let paths = ReportPaths {
        text: dir.join(TEXT_REPORT),
        json: dir.join(JSON_RESULTS),
    };

    std::fs::write(&paths.text, render_text(run))?;
    export_json(run, &paths.json)?;

    tracing::info!(
        text = %paths.text.display(),
        json = %paths.json.display(),
        "Report saved"
    );

    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fabric_bench_core::{
        aggregate_phase, combine_phases, ErrorKind, FlowMeasurement, FlowResult, PatternKind,
        PatternResult, RunStatus,
    };

    pub(crate) fn sample_run() -> RunResult {
        let ok = |d: &str| FlowResult::success("h1", d, FlowMeasurement::new(9.4e9, 2, 15.0));
        let flows = vec![
            ok("h2"),
            ok("h3"),
            ok("h4"),
            FlowResult::failed("h1", "h5", ErrorKind::Timeout, "no answer after 90s"),
        ];

        let mut run = RunResult::new();
        run.insert(combine_phases(
            PatternKind::Broadcast,
            vec![aggregate_phase(&flows, "broadcast", None)],
        ));
        run.insert(PatternResult::skipped(
            PatternKind::Ring,
            "topology has 1 host(s), ring needs at least 2",
        ));
        run.finish(RunStatus::Completed);
        run
    }

    #[test]
    fn test_write_outputs_creates_both_files() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("reports");

        let paths = write_outputs(&sample_run(), &out).unwrap();

        assert_eq!(paths.text, out.join(TEXT_REPORT));
        assert_eq!(paths.json, out.join(JSON_RESULTS));
        let text = std::fs::read_to_string(&paths.text).unwrap();
        assert!(text.contains("Combined Bandwidth"));
    }

    #[test]
    fn test_json_results_reload() {
        let dir = tempfile::tempdir().unwrap();
        let run = sample_run();

        let paths = write_outputs(&run, dir.path()).unwrap();
        let loaded = load_json(&paths.json).unwrap();

        assert_eq!(loaded, run);
        assert_eq!(loaded.get(PatternKind::Broadcast).unwrap().failed_flows, 1);
    }

    #[test]
    fn test_load_json_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{not json").unwrap();

        assert!(matches!(load_json(&path), Err(ReportError::Json(_))));
    }
}
