//! JSON export of a run

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use fabric_bench_core::RunResult;

use crate::ReportError;

/// Write `run` as pretty-printed JSON to `path`
pub fn export_json(run: &RunResult, path: &Path) -> Result<(), ReportError> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, run)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

/// Read a run previously written by [`export_json`]
pub fn load_json(path: &Path) -> Result<RunResult, ReportError> {
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}
