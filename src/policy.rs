//! Priority policies for ordering the ready queue.
//!
//! All four policies reduce to a sort key over jobs: the queue is sorted
//! ascending by the key so the head is the most eligible job. Rate Monotonic
//! and Deadline Monotonic read static task fields; Earliest Deadline First
//! and Least Slack Time depend on runtime state, and LST additionally on the
//! current tick, so the queue is re-sorted every tick. Ties always break by
//! job id ascending, which is arrival order, so equal-priority jobs run FIFO
//! and the resulting order is total and deterministic.

use crate::task::Job;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The scheduling algorithm driving the ready-queue order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SchedulingPolicy {
    RateMonotonic,
    DeadlineMonotonic,
    EarliestDeadlineFirst,
    LeastSlackTime,
}

impl SchedulingPolicy {
    /// Map a menu choice (1 through 4) to a policy.
    pub fn from_choice(choice: u32) -> Option<SchedulingPolicy> {
        match choice {
            1 => Some(SchedulingPolicy::RateMonotonic),
            2 => Some(SchedulingPolicy::DeadlineMonotonic),
            3 => Some(SchedulingPolicy::EarliestDeadlineFirst),
            4 => Some(SchedulingPolicy::LeastSlackTime),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SchedulingPolicy::RateMonotonic => "Rate Monotonic",
            SchedulingPolicy::DeadlineMonotonic => "Deadline Monotonic",
            SchedulingPolicy::EarliestDeadlineFirst => "Earliest Deadline First",
            SchedulingPolicy::LeastSlackTime => "Least Slack Time",
        }
    }

    /// Sort the ready queue into priority order at tick `now`.
    ///
    /// The head of the queue afterwards is the job the engine should run.
    /// Sorting an already ordered queue is a no-op: the key plus the job-id
    /// tie-break form a total order.
    pub fn sort_ready(&self, ready: &mut [Job], now: u64) {
        match self {
            SchedulingPolicy::RateMonotonic => {
                ready.sort_by(|a, b| {
                    a.task
                        .period
                        .cmp(&b.task.period)
                        .then_with(|| a.id.cmp(&b.id))
                });
            }
            SchedulingPolicy::DeadlineMonotonic => {
                ready.sort_by(|a, b| {
                    a.task
                        .relative_deadline
                        .cmp(&b.task.relative_deadline)
                        .then_with(|| a.id.cmp(&b.id))
                });
            }
            SchedulingPolicy::EarliestDeadlineFirst => {
                ready.sort_by(|a, b| {
                    a.abs_deadline
                        .cmp(&b.abs_deadline)
                        .then_with(|| a.id.cmp(&b.id))
                });
            }
            SchedulingPolicy::LeastSlackTime => {
                ready.sort_by(|a, b| {
                    a.slack(now)
                        .cmp(&b.slack(now))
                        .then_with(|| a.id.cmp(&b.id))
                });
            }
        }
    }
}

impl fmt::Display for SchedulingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
