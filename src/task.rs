//! Task and job definitions shared by all scheduler components.
//!
//! A [`Task`] is the static description of a recurring (or one-shot) workload;
//! a [`Job`] is one released instance of it. Tasks are created once before a
//! run and wrapped in [`Arc`] so every job can hold a reference to its
//! definition for as long as it lives. Jobs themselves are plain owned values
//! that move between the engine's queues.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Task id assigned to the synthesized server task.
///
/// User tasks are numbered from 1 by the input parser, so this value never
/// collides in practice. The engine identifies the server through
/// [`TaskKind::Server`], not through this id; the id only shows up in the
/// exported timeline.
pub const SERVER_TASK_ID: u32 = 999;

/// Classification of a task, which decides its arrival rule and which queue
/// its jobs live in.
///
/// `Server` is the periodic task synthesized by the engine when a polling or
/// deferrable server is requested. It arrives and competes for the CPU like
/// any periodic task but its execution is intercepted by the server policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskKind {
    Periodic,
    Sporadic,
    Aperiodic,
    Server,
}

/// Static parameters of a task. All times are integer ticks.
///
/// For periodic and sporadic tasks `period > 0` and the relative deadline is
/// usually equal to the period, though a tighter (constrained) deadline is
/// allowed. Aperiodic tasks only use `release` and `wcet`; their `period` and
/// `relative_deadline` are zero and never read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: u32,
    pub kind: TaskKind,
    pub release: u64,
    pub wcet: u64,
    pub period: u64,
    pub relative_deadline: u64,
}

impl Task {
    /// Create a periodic task releasing every `period` ticks from `release`.
    pub fn periodic(id: u32, release: u64, wcet: u64, period: u64, relative_deadline: u64) -> Task {
        debug_assert!(wcet > 0, "periodic task needs a positive wcet");
        debug_assert!(period > 0, "periodic task needs a positive period");
        Task {
            id,
            kind: TaskKind::Periodic,
            release,
            wcet,
            period,
            relative_deadline,
        }
    }

    /// Create a sporadic task. Arrivals are generated at the minimum
    /// inter-arrival cadence, exactly like a periodic task.
    pub fn sporadic(id: u32, release: u64, wcet: u64, period: u64, relative_deadline: u64) -> Task {
        Task {
            kind: TaskKind::Sporadic,
            ..Task::periodic(id, release, wcet, period, relative_deadline)
        }
    }

    /// Create a one-shot aperiodic task released at an absolute tick.
    pub fn aperiodic(id: u32, release: u64, wcet: u64) -> Task {
        debug_assert!(wcet > 0, "aperiodic task needs a positive wcet");
        Task {
            id,
            kind: TaskKind::Aperiodic,
            release,
            wcet,
            period: 0,
            relative_deadline: 0,
        }
    }

    /// Create the server task backing a polling or deferrable server.
    ///
    /// The deadline equals the period so an instance expires exactly when the
    /// next one is released, which is what makes budget replenishment work.
    pub fn server(capacity: u64, period: u64) -> Task {
        debug_assert!(capacity > 0 && capacity <= period);
        Task {
            id: SERVER_TASK_ID,
            kind: TaskKind::Server,
            release: 0,
            wcet: capacity,
            period,
            relative_deadline: period,
        }
    }

    pub const fn is_server(&self) -> bool {
        matches!(self.kind, TaskKind::Server)
    }

    /// Arrival predicate: does this task release a job at tick `now`?
    pub fn releases_at(&self, now: u64) -> bool {
        match self.kind {
            TaskKind::Aperiodic => now == self.release,
            _ => now >= self.release && (now - self.release) % self.period == 0,
        }
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T{} ({:?})", self.id, self.kind)
    }
}

/// One released instance of a task, uniquely owned by whichever queue holds it.
///
/// `abs_deadline` is `arrival + relative_deadline`; aperiodic jobs carry the
/// value but have no deadline semantics, so it is never checked for them.
/// `remaining` starts at the task's wcet and is decremented once per executed
/// tick, never below zero.
#[derive(Debug, Clone)]
pub struct Job {
    /// Globally monotonic id, also the FIFO tie-breaker among equal priorities.
    pub id: u64,
    pub task: Arc<Task>,
    pub arrival: u64,
    pub abs_deadline: u64,
    pub remaining: u64,
    /// First tick of execution, unset until the job first runs.
    pub start: Option<u64>,
    /// Tick right after the last executed tick, unset until completion.
    pub finish: Option<u64>,
}

impl Job {
    pub fn new(id: u64, task: Arc<Task>, arrival: u64) -> Job {
        let abs_deadline = arrival + task.relative_deadline;
        let remaining = task.wcet;
        Job {
            id,
            task,
            arrival,
            abs_deadline,
            remaining,
            start: None,
            finish: None,
        }
    }

    /// Ticks this job can still be delayed without missing its deadline.
    /// Negative once the deadline can no longer be met.
    pub fn slack(&self, now: u64) -> i64 {
        self.abs_deadline as i64 - now as i64 - self.remaining as i64
    }

    pub fn is_complete(&self) -> bool {
        self.remaining == 0
    }

    pub fn is_server(&self) -> bool {
        self.task.is_server()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn periodic_release_predicate_follows_cadence() {
        let task = Task::periodic(1, 2, 1, 4, 4);
        assert!(!task.releases_at(0));
        assert!(!task.releases_at(1));
        assert!(task.releases_at(2));
        assert!(!task.releases_at(3));
        assert!(task.releases_at(6));
        assert!(task.releases_at(10));
    }

    #[test]
    fn aperiodic_releases_exactly_once() {
        let task = Task::aperiodic(3, 7, 2);
        assert!(!task.releases_at(6));
        assert!(task.releases_at(7));
        assert!(!task.releases_at(8));
    }

    #[test]
    fn job_deadline_and_slack() {
        let task = Arc::new(Task::periodic(1, 0, 2, 10, 8));
        let job = Job::new(1, task, 4);
        assert_eq!(job.abs_deadline, 12);
        assert_eq!(job.slack(4), 6);
        assert_eq!(job.slack(11), -1);
    }

    #[test]
    fn server_task_shape() {
        let task = Task::server(2, 5);
        assert_eq!(task.id, SERVER_TASK_ID);
        assert!(task.is_server());
        assert_eq!(task.wcet, 2);
        assert_eq!(task.relative_deadline, task.period);
        assert!(task.releases_at(0));
        assert!(task.releases_at(5));
        assert!(!task.releases_at(3));
    }
}
