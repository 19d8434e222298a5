// Simulator binary: parse a task-set file, run one hyperperiod, export the
// timeline. Exit code 0 on a clean run, 1 when the input holds no tasks (or
// cannot be read), 2 on a deadline miss.

use rtsim::export;
use rtsim::parser;
use rtsim::{RunOutcome, SchedulingPolicy, Simulator};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info, warn};

/// Command-line options parsed from program arguments.
struct CliOptions {
    /// Task-set input file.
    input: Option<PathBuf>,
    /// Timeline output file (redirected to `*_ABORTED.*` on a miss).
    output: PathBuf,
    /// Priority policy driving the ready queue.
    algorithm: SchedulingPolicy,
    /// Also write the raw event log as JSON next to the output.
    json: bool,
}

/// Map an `--algorithm` value to a policy.
///
/// Accepts the menu numbers 1 through 4 as well as the short names. Anything
/// else falls back to Rate Monotonic with a warning.
fn parse_algorithm(value: &str) -> SchedulingPolicy {
    let by_name = match value.to_ascii_lowercase().as_str() {
        "rm" | "rate-monotonic" => Some(SchedulingPolicy::RateMonotonic),
        "dm" | "deadline-monotonic" => Some(SchedulingPolicy::DeadlineMonotonic),
        "edf" | "earliest-deadline-first" => Some(SchedulingPolicy::EarliestDeadlineFirst),
        "lst" | "least-slack-time" => Some(SchedulingPolicy::LeastSlackTime),
        _ => value.parse::<u32>().ok().and_then(SchedulingPolicy::from_choice),
    };
    by_name.unwrap_or_else(|| {
        warn!(value, "unknown algorithm selection, using Rate Monotonic");
        SchedulingPolicy::RateMonotonic
    })
}

/// Parse command-line arguments, supporting both `--key=value` and
/// `--key value` forms.
fn parse_cli_options() -> CliOptions {
    let mut options = CliOptions {
        input: None,
        output: PathBuf::from("output.txt"),
        algorithm: SchedulingPolicy::RateMonotonic,
        json: false,
    };
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        let (key, value) = match arg.split_once('=') {
            Some((key, value)) => (key.to_string(), Some(value.to_string())),
            None => (arg, None),
        };
        match key.as_str() {
            "--json" => options.json = true,
            "--input" => {
                if let Some(value) = value.or_else(|| args.next()) {
                    options.input = Some(PathBuf::from(value));
                }
            }
            "--output" => {
                if let Some(value) = value.or_else(|| args.next()) {
                    options.output = PathBuf::from(value);
                }
            }
            "--algorithm" => {
                if let Some(value) = value.or_else(|| args.next()) {
                    options.algorithm = parse_algorithm(&value);
                }
            }
            other => warn!(argument = other, "ignoring unknown argument"),
        }
    }
    options
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let options = parse_cli_options();
    let Some(input) = options.input else {
        eprintln!(
            "usage: rtsim --input <task-file> [--algorithm <1-4|rm|dm|edf|lst>] \
             [--output <file>] [--json]"
        );
        return ExitCode::from(1);
    };

    let task_set = match parser::read_task_file(&input) {
        Ok(set) => set,
        Err(err) => {
            error!(path = %input.display(), %err, "could not load task set");
            return ExitCode::from(1);
        }
    };
    if task_set.is_empty() {
        error!(path = %input.display(), "no tasks found in input");
        return ExitCode::from(1);
    }

    info!(
        periodic = task_set.periodic.len(),
        aperiodic = task_set.aperiodic.len(),
        algorithm = options.algorithm.name(),
        server = task_set
            .server_policy
            .map(|p| p.name())
            .unwrap_or("Background"),
        "task set loaded"
    );

    let mut sim = Simulator::new(
        task_set.periodic,
        task_set.aperiodic,
        options.algorithm,
        task_set.server_policy,
    );
    let outcome = sim.run();

    let artifact = match outcome {
        RunOutcome::Completed => options.output.clone(),
        RunOutcome::DeadlineMiss { .. } => export::aborted_path(&options.output),
    };
    if let Err(err) = export_all(&sim, &artifact, options.json) {
        error!(path = %artifact.display(), %err, "failed to write timeline");
        return ExitCode::from(1);
    }
    info!(path = %artifact.display(), "timeline written");

    match outcome {
        RunOutcome::Completed => ExitCode::SUCCESS,
        RunOutcome::DeadlineMiss { time, job_id, task_id } => {
            error!(time, job_id, task_id, "simulation aborted on deadline miss");
            ExitCode::from(2)
        }
    }
}

fn export_all(sim: &Simulator, path: &Path, json: bool) -> std::io::Result<()> {
    export::write_timeline(sim, path)?;
    if json {
        export::write_json(sim, &path.with_extension("json"))?;
    }
    Ok(())
}
