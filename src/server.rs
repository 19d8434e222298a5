//! Aperiodic-service policies backing the synthesized server task.
//!
//! The engine calls [`ServerPolicy::serve`] only when the priority policy has
//! picked the server job. Both policies spend budget the same way when work is
//! pending: one tick goes to the head of the aperiodic FIFO and one tick is
//! debited from the server budget. They differ only on an empty queue: a
//! polling server forfeits its whole remaining budget the moment it is picked
//! idle, a deferrable server keeps it for later ticks in the same period.
//!
//! Background service has no server at all; the engine runs pending aperiodic
//! work directly whenever the ready queue is empty.

use crate::event::{EventKind, EventLog, TimelineEvent};
use crate::task::Job;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

/// Budget-spending strategy for the server task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServerPolicy {
    Polling,
    Deferrable,
}

/// What the server did with its tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServeOutcome {
    /// One tick of aperiodic work was executed and billed to the budget.
    Ran,
    /// No pending work; the engine must schedule someone else this tick.
    Yielded,
}

impl ServerPolicy {
    /// Parse the trailing policy tag of an aperiodic input line.
    ///
    /// Unknown or absent tags mean background service, so `None` here.
    pub fn from_tag(text: &str) -> Option<ServerPolicy> {
        if text.contains("Poller") {
            Some(ServerPolicy::Polling)
        } else if text.contains("Deferrable") {
            Some(ServerPolicy::Deferrable)
        } else {
            None
        }
    }

    /// Name used in input tags and exported descriptions.
    pub fn name(&self) -> &'static str {
        match self {
            ServerPolicy::Polling => "Poller",
            ServerPolicy::Deferrable => "Deferrable",
        }
    }

    /// Spend at most one tick of the picked server job on pending work.
    ///
    /// With pending work: executes one tick of the FIFO head, debits the
    /// job's remaining time and the server budget together, and on completion
    /// logs the finish at `now + 1` and drops the job. The caller removes the
    /// server job once its budget reaches zero.
    ///
    /// Without pending work: polling zeroes the budget (the caller then
    /// removes the exhausted server job), deferrable leaves it untouched.
    pub fn serve(
        &self,
        server_job: &mut Job,
        pending: &mut VecDeque<Job>,
        log: &mut EventLog,
        now: u64,
    ) -> ServeOutcome {
        debug_assert!(server_job.is_server());
        debug_assert!(server_job.remaining > 0, "exhausted server job was scheduled");

        let Some(job) = pending.front_mut() else {
            if let ServerPolicy::Polling = self {
                // Picked with nothing to do: the whole remaining budget is lost.
                server_job.remaining = 0;
            }
            return ServeOutcome::Yielded;
        };

        log.push(TimelineEvent::for_job(now, job, EventKind::ServerExec(*self)));
        job.remaining -= 1;
        server_job.remaining -= 1;

        if job.is_complete() {
            log.push(TimelineEvent::for_job(now + 1, job, EventKind::AperiodicFinish));
            pending.pop_front();
        }
        ServeOutcome::Ran
    }
}

impl fmt::Display for ServerPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
