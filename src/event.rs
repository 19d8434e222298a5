//! Timeline events and the append-only event log.
//!
//! The engine is the only producer of events; the exporter is the only
//! consumer. Event kinds form a closed enum so downstream code matches on
//! variants instead of parsing label strings, with the server policy carried
//! as data on [`EventKind::ServerExec`].

use crate::server::ServerPolicy;
use crate::task::Job;
use serde::{Deserialize, Serialize};

/// What happened during a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    /// An aperiodic job entered the pending queue.
    AperiodicArrival,
    /// A ready job executed for one tick.
    Running,
    /// A ready job completed (logged at the tick after its last execution).
    Finish,
    /// An aperiodic job completed under server service.
    AperiodicFinish,
    /// The server spent one budget tick on aperiodic work.
    ServerExec(ServerPolicy),
    /// An aperiodic job executed on an otherwise idle CPU.
    BackgroundRun,
    /// Nothing executed this tick.
    Idle,
    /// A constrained-deadline job overran its absolute deadline. Terminal.
    DeadlineMiss,
}

impl EventKind {
    /// Label used in the exported timeline.
    pub fn label(&self) -> &'static str {
        match self {
            EventKind::AperiodicArrival => "AperiodicArrival",
            EventKind::Running => "Running",
            EventKind::Finish => "Finish",
            EventKind::AperiodicFinish => "AperiodicFinish",
            EventKind::ServerExec(ServerPolicy::Polling) => "ServerExec",
            EventKind::ServerExec(ServerPolicy::Deferrable) => "ServerExec(DS)",
            EventKind::BackgroundRun => "BackgroundRun",
            EventKind::Idle => "Idle",
            EventKind::DeadlineMiss => "DEADLINE_MISS",
        }
    }

    /// Whether this kind represents one tick of CPU consumption.
    pub fn is_execution(&self) -> bool {
        matches!(
            self,
            EventKind::Running | EventKind::ServerExec(_) | EventKind::BackgroundRun
        )
    }
}

/// One record of the simulation timeline.
///
/// `job_id` and `task_id` are absent on [`EventKind::Idle`] rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineEvent {
    pub time: u64,
    pub job_id: Option<u64>,
    pub task_id: Option<u32>,
    pub kind: EventKind,
}

impl TimelineEvent {
    /// Event attributed to a specific job.
    pub fn for_job(time: u64, job: &Job, kind: EventKind) -> TimelineEvent {
        TimelineEvent {
            time,
            job_id: Some(job.id),
            task_id: Some(job.task.id),
            kind,
        }
    }

    /// Idle marker with no job attribution.
    pub fn idle(time: u64) -> TimelineEvent {
        TimelineEvent {
            time,
            job_id: None,
            task_id: None,
            kind: EventKind::Idle,
        }
    }
}

/// Append-only ordered sequence of timeline events.
///
/// Push order is chronological by construction of the tick loop; the log
/// asserts that event times never decrease.
#[derive(Debug, Default)]
pub struct EventLog {
    events: Vec<TimelineEvent>,
}

impl EventLog {
    pub fn new() -> EventLog {
        EventLog::default()
    }

    pub fn push(&mut self, event: TimelineEvent) {
        debug_assert!(
            self.events.last().map_or(true, |last| last.time <= event.time),
            "event times must be non-decreasing"
        );
        self.events.push(event);
    }

    pub fn events(&self) -> &[TimelineEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_match_exported_vocabulary() {
        assert_eq!(EventKind::ServerExec(ServerPolicy::Polling).label(), "ServerExec");
        assert_eq!(
            EventKind::ServerExec(ServerPolicy::Deferrable).label(),
            "ServerExec(DS)"
        );
        assert_eq!(EventKind::DeadlineMiss.label(), "DEADLINE_MISS");
        assert_eq!(EventKind::Idle.label(), "Idle");
    }

    #[test]
    fn execution_kinds() {
        assert!(EventKind::Running.is_execution());
        assert!(EventKind::BackgroundRun.is_execution());
        assert!(EventKind::ServerExec(ServerPolicy::Polling).is_execution());
        assert!(!EventKind::Idle.is_execution());
        assert!(!EventKind::Finish.is_execution());
    }

    #[test]
    fn log_appends_in_order() {
        let mut log = EventLog::new();
        log.push(TimelineEvent::idle(0));
        log.push(TimelineEvent::idle(0));
        log.push(TimelineEvent::idle(1));
        assert_eq!(log.len(), 3);
        assert_eq!(log.events()[2].time, 1);
    }
}
