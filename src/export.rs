//! Timeline export.
//!
//! Drains the simulator's event log into a tab-separated table, the format
//! consumed by downstream tooling, and optionally into JSON for programmatic
//! use. Tick times are divided by the parser's scale factor so the output
//! shows user-facing fractional time again.

use crate::engine::Simulator;
use crate::event::{EventKind, TimelineEvent};
use crate::parser::SCALE_FACTOR;
use crate::task::TaskKind;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

const HEADER: &str = "Time\tJobID\tTaskID\tDescription\tEvent";
const RULE: &str = "--------------------------------------------------------";

/// Write the timeline as a tab-separated table.
pub fn write_timeline(sim: &Simulator, path: &Path) -> io::Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    writeln!(out, "{HEADER}")?;
    writeln!(out, "{RULE}")?;
    for event in sim.timeline() {
        let time = event.time as f64 / SCALE_FACTOR as f64;
        // Idle rows carry no job; -1 keeps the columns aligned for consumers
        // expecting numeric fields.
        let job_id = event.job_id.map_or(-1, |id| id as i64);
        let task_id = event.task_id.map_or(-1, |id| id as i64);
        writeln!(
            out,
            "{time:.1}\t{job_id}\t{task_id}\t{}\t{}",
            describe(sim, event),
            event.kind.label()
        )?;
    }
    out.flush()
}

/// Write the raw event log as JSON, times still in ticks.
pub fn write_json(sim: &Simulator, path: &Path) -> io::Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut out, sim.timeline())?;
    out.flush()
}

/// Human-readable source column for a timeline row.
fn describe(sim: &Simulator, event: &TimelineEvent) -> String {
    if event.kind == EventKind::DeadlineMiss {
        return "FAILURE".to_string();
    }
    if let EventKind::ServerExec(policy) = event.kind {
        return format!("Server({policy})");
    }
    let kind = event.task_id.and_then(|id| sim.task_kind(id));
    match kind {
        Some(TaskKind::Server) => {
            let policy = sim
                .server_policy()
                .map(|p| p.name())
                .unwrap_or("Background");
            format!("Server({policy})")
        }
        Some(TaskKind::Periodic) | Some(TaskKind::Sporadic) => "Periodic".to_string(),
        Some(TaskKind::Aperiodic) => "Aperiodic".to_string(),
        None => "Unknown".to_string(),
    }
}

/// Artifact path for a run aborted by a deadline miss: `output.txt` becomes
/// `output_ABORTED.txt`.
pub fn aborted_path(path: &Path) -> std::path::PathBuf {
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("output");
    let name = match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{stem}_ABORTED.{ext}"),
        None => format!("{stem}_ABORTED"),
    };
    path.with_file_name(name)
}
