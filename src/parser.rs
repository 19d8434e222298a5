//! Line-oriented task-set input.
//!
//! One task per line. The leading token selects the kind: `P` periodic, `D`
//! sporadic, `A` aperiodic. Numeric fields follow, with the shape deciding
//! their meaning:
//!
//! - `P <e> <p>` releases at 0, deadline equals the period
//! - `P <r> <e> <p>` explicit release, deadline equals the period
//! - `P <r> <e> <p> <d>` explicit (constrained) deadline
//! - `A <r> <e>` one-shot aperiodic work
//!
//! Numbers may be fractional: every value is multiplied by [`SCALE_FACTOR`]
//! and rounded so the engine only ever sees integer ticks. An aperiodic line
//! may carry a trailing `Poller` or `Deferrable` tag selecting the global
//! server policy; the last tag in the file wins and no tag means background
//! service. `#` comments, blank lines, and lines the grammar cannot place are
//! skipped (the latter with a warning).

use crate::server::ServerPolicy;
use crate::task::{Task, TaskKind};
use std::fmt;
use std::fs;
use std::io;
use std::path::Path;
use tracing::warn;

/// Ticks per user-facing time unit. Input values are scaled up by this factor
/// on parse; the exporter divides times back down.
pub const SCALE_FACTOR: u64 = 10;

/// Parsed task set plus the server policy selected by input tags.
#[derive(Debug, Default)]
pub struct TaskSet {
    /// Periodic and sporadic tasks, in input order.
    pub periodic: Vec<Task>,
    /// Aperiodic tasks, in input order.
    pub aperiodic: Vec<Task>,
    /// `None` means background aperiodic service.
    pub server_policy: Option<ServerPolicy>,
}

impl TaskSet {
    pub fn is_empty(&self) -> bool {
        self.periodic.is_empty() && self.aperiodic.is_empty()
    }
}

/// Failure to read a task-set file. Parse-level problems never fail the whole
/// file; offending lines are skipped instead.
#[derive(Debug)]
#[non_exhaustive]
pub enum ParseError {
    Io(io::Error),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::Io(err) => write!(f, "failed to read task file: {err}"),
        }
    }
}

impl std::error::Error for ParseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ParseError::Io(err) => Some(err),
        }
    }
}

impl From<io::Error> for ParseError {
    fn from(err: io::Error) -> ParseError {
        ParseError::Io(err)
    }
}

/// Read and parse a task-set file.
pub fn read_task_file(path: &Path) -> Result<TaskSet, ParseError> {
    let text = fs::read_to_string(path)?;
    Ok(parse_task_set(&text))
}

/// Parse a task set from text. Task ids are assigned from 1 in input order.
pub fn parse_task_set(input: &str) -> TaskSet {
    let mut set = TaskSet::default();
    let mut next_id: u32 = 1;

    for (line_no, line) in input.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let mut tokens = line.split_whitespace();
        let kind = match tokens.next() {
            Some("P") => TaskKind::Periodic,
            Some("D") => TaskKind::Sporadic,
            Some("A") => TaskKind::Aperiodic,
            _ => {
                warn!(line = line_no + 1, "skipping line with unknown task kind");
                continue;
            }
        };

        // Numbers end at the first token that does not parse; whatever
        // follows is trailing text that may carry a policy tag.
        let mut numbers: Vec<u64> = Vec::new();
        let mut trailing = String::new();
        let mut malformed = false;
        for token in tokens {
            if trailing.is_empty() {
                match token.parse::<f64>() {
                    Ok(value) if value >= 0.0 => {
                        numbers.push(scale(value));
                        continue;
                    }
                    Ok(_) => {
                        malformed = true;
                        break;
                    }
                    Err(_) => {}
                }
            }
            trailing.push_str(token);
            trailing.push(' ');
        }

        if kind == TaskKind::Aperiodic {
            // Every aperiodic line may restate the global policy; the last
            // tag read wins. A tagless line leaves the current choice alone.
            if let Some(policy) = ServerPolicy::from_tag(&trailing) {
                set.server_policy = Some(policy);
            }
        }

        // Field shapes by count. A zero wcet or period after scaling cannot
        // be simulated, so such lines are rejected with the malformed ones.
        let task = if malformed {
            None
        } else if kind == TaskKind::Aperiodic {
            match numbers.as_slice() {
                &[release, wcet] if wcet > 0 => Some(Task::aperiodic(next_id, release, wcet)),
                _ => None,
            }
        } else {
            let fields = match numbers.as_slice() {
                &[wcet, period] => Some((0, wcet, period, period)),
                &[release, wcet, period] => Some((release, wcet, period, period)),
                &[release, wcet, period, deadline, ..] => Some((release, wcet, period, deadline)),
                _ => None,
            };
            fields
                .filter(|&(_, wcet, period, _)| wcet > 0 && period > 0)
                .map(|(release, wcet, period, deadline)| {
                    if kind == TaskKind::Sporadic {
                        Task::sporadic(next_id, release, wcet, period, deadline)
                    } else {
                        Task::periodic(next_id, release, wcet, period, deadline)
                    }
                })
        };

        match task {
            Some(task) => {
                next_id += 1;
                if task.kind == TaskKind::Aperiodic {
                    set.aperiodic.push(task);
                } else {
                    set.periodic.push(task);
                }
            }
            None => warn!(line = line_no + 1, "skipping malformed task line"),
        }
    }
    set
}

fn scale(value: f64) -> u64 {
    (value * SCALE_FACTOR as f64).round() as u64
}
