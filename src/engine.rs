//! Tick-driven simulation engine.
//!
//! The engine owns every live job and advances one integer tick at a time over
//! the capped hyperperiod, performing for each tick, in this order:
//!
//! 1. Reap expired server jobs so a stale instance cannot shadow a fresh one.
//! 2. Release periodic and sporadic jobs into the ready queue.
//! 3. Release aperiodic jobs into the pending FIFO, logging their arrival.
//! 4. Sort the ready queue with the priority policy.
//! 5. Decide what runs: the head job, the server policy (when the head is the
//!    server job), background aperiodic work on an empty queue, or nothing.
//! 6. Apply execution effects and completion.
//! 7. Check deadlines; a miss terminates the run.
//!
//! The loop is single-threaded and deterministic: task iteration is input
//! order, sorts are total, and job ids break all remaining ties.

use crate::event::{EventKind, EventLog, TimelineEvent};
use crate::hyperperiod;
use crate::policy::SchedulingPolicy;
use crate::server::{ServeOutcome, ServerPolicy};
use crate::task::{Job, Task, TaskKind};
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Budget, in ticks, the server may spend per server period.
pub const SERVER_CAPACITY: u64 = 2;

/// Replenishment cadence of the server budget, in ticks.
pub const SERVER_PERIOD: u64 = 5;

/// Terminal state of a simulation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The full horizon elapsed without a deadline miss.
    Completed,
    /// A constrained-deadline job overran its deadline; the run stopped there.
    DeadlineMiss { time: u64, job_id: u64, task_id: u32 },
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, RunOutcome::Completed)
    }
}

/// What the decision step selected for the current tick.
enum Dispatch {
    /// The server policy already performed (and logged) the work.
    Served,
    /// Run the ready-queue job at this index.
    Ready(usize),
    /// Nothing eligible in the ready queue; try background, else idle.
    FallThrough,
}

/// Uniprocessor discrete-event scheduling simulator.
///
/// Construction fixes the task set, the priority policy, and the
/// aperiodic-service policy; [`Simulator::run`] then drives the tick loop to
/// completion or to the first deadline miss, streaming events into the log.
#[derive(Debug)]
pub struct Simulator {
    /// Periodic and sporadic tasks, input order, plus the synthesized server
    /// task at the end when a server policy is active.
    periodic: Vec<Arc<Task>>,
    aperiodic: Vec<Arc<Task>>,
    policy: SchedulingPolicy,
    server: Option<ServerPolicy>,
    hyperperiod: u64,
    /// Jobs competing for the CPU, re-sorted by the policy each tick.
    ready: Vec<Job>,
    /// Aperiodic jobs awaiting service, FIFO by arrival.
    pending_aperiodic: VecDeque<Job>,
    history: EventLog,
    next_job_id: u64,
}

impl Simulator {
    /// Build a simulator for a task set.
    ///
    /// `periodic` holds the periodic and sporadic tasks; `server` selects the
    /// aperiodic-service policy, `None` meaning plain background service.
    /// When a server policy is given, the server task is synthesized and
    /// appended to the periodic set. The hyperperiod is computed from the
    /// user's periodic tasks alone; the server's period does not stretch it.
    pub fn new(
        periodic: Vec<Task>,
        aperiodic: Vec<Task>,
        policy: SchedulingPolicy,
        server: Option<ServerPolicy>,
    ) -> Simulator {
        let mut periodic: Vec<Arc<Task>> = periodic.into_iter().map(Arc::new).collect();
        let aperiodic: Vec<Arc<Task>> = aperiodic.into_iter().map(Arc::new).collect();
        let hyperperiod = hyperperiod::horizon(&periodic, &aperiodic);

        if server.is_some() {
            periodic.push(Arc::new(Task::server(SERVER_CAPACITY, SERVER_PERIOD)));
        }

        Simulator {
            periodic,
            aperiodic,
            policy,
            server,
            hyperperiod,
            ready: Vec::new(),
            pending_aperiodic: VecDeque::new(),
            history: EventLog::new(),
            next_job_id: 1,
        }
    }

    /// Drive the tick loop over the whole horizon.
    ///
    /// Returns at the first deadline miss, with the miss already logged.
    pub fn run(&mut self) -> RunOutcome {
        info!(
            hyperperiod = self.hyperperiod,
            policy = self.policy.name(),
            server = self.server.map(|s| s.name()).unwrap_or("Background"),
            "starting simulation"
        );

        for now in 0..self.hyperperiod {
            self.reap_expired_servers(now);
            self.release_arrivals(now);
            self.policy.sort_ready(&mut self.ready, now);

            match self.decide(now) {
                Dispatch::Served => {}
                Dispatch::Ready(index) => self.execute(index, now),
                Dispatch::FallThrough => self.background_or_idle(now),
            }

            if let Some(miss) = self.check_deadlines(now) {
                return miss;
            }
        }
        RunOutcome::Completed
    }

    /// Timeline of everything that happened so far, in order.
    pub fn timeline(&self) -> &[TimelineEvent] {
        self.history.events()
    }

    pub fn hyperperiod(&self) -> u64 {
        self.hyperperiod
    }

    pub fn server_policy(&self) -> Option<ServerPolicy> {
        self.server
    }

    /// Look up the kind of a task by id, across both task lists.
    pub fn task_kind(&self, task_id: u32) -> Option<TaskKind> {
        self.periodic
            .iter()
            .chain(self.aperiodic.iter())
            .find(|task| task.id == task_id)
            .map(|task| task.kind)
    }

    /// Step 1: drop server instances whose period window has closed.
    ///
    /// The server's deadline equals its period, so an instance expires exactly
    /// when the next one is released. Removing it here keeps the dead instance
    /// from ever being picked over, or confused with, the fresh one.
    fn reap_expired_servers(&mut self, now: u64) {
        self.ready
            .retain(|job| !(job.is_server() && job.abs_deadline <= now));
    }

    /// Steps 2 and 3: release every job due at this tick, input order.
    fn release_arrivals(&mut self, now: u64) {
        for task in &self.periodic {
            if task.releases_at(now) {
                let job = Job::new(self.next_job_id, Arc::clone(task), now);
                self.next_job_id += 1;
                self.ready.push(job);
            }
        }
        for task in &self.aperiodic {
            if task.releases_at(now) {
                let job = Job::new(self.next_job_id, Arc::clone(task), now);
                self.next_job_id += 1;
                self.history
                    .push(TimelineEvent::for_job(now, &job, EventKind::AperiodicArrival));
                self.pending_aperiodic.push_back(job);
            }
        }
    }

    /// Step 5: pick the execution source for this tick.
    ///
    /// A non-server head runs directly. A server head is handed to the server
    /// policy; on a yield the polling server is destroyed (its budget is
    /// gone) and the next job in queue order runs, while a deferrable yield
    /// keeps the server parked at the head and runs the job behind it, if any.
    fn decide(&mut self, now: u64) -> Dispatch {
        if self.ready.is_empty() {
            return Dispatch::FallThrough;
        }
        if !self.ready[0].is_server() {
            return Dispatch::Ready(0);
        }
        // A server job only exists when a server policy is active.
        let Some(server) = self.server else {
            return Dispatch::Ready(0);
        };

        match server.serve(
            &mut self.ready[0],
            &mut self.pending_aperiodic,
            &mut self.history,
            now,
        ) {
            ServeOutcome::Ran => {
                if self.ready[0].is_complete() {
                    // Budget exhausted, this instance is done.
                    self.ready.remove(0);
                }
                Dispatch::Served
            }
            ServeOutcome::Yielded => match server {
                ServerPolicy::Polling => {
                    self.ready.remove(0);
                    if self.ready.is_empty() {
                        Dispatch::FallThrough
                    } else {
                        Dispatch::Ready(0)
                    }
                }
                ServerPolicy::Deferrable => {
                    if self.ready.len() > 1 {
                        Dispatch::Ready(1)
                    } else {
                        Dispatch::FallThrough
                    }
                }
            },
        }
    }

    /// Step 6: run one tick of a ready job and apply completion effects.
    fn execute(&mut self, index: usize, now: u64) {
        let job = &mut self.ready[index];
        if job.start.is_none() {
            job.start = Some(now);
        }
        self.history
            .push(TimelineEvent::for_job(now, job, EventKind::Running));
        job.remaining -= 1;

        if job.is_complete() {
            job.finish = Some(now + 1);
            self.history
                .push(TimelineEvent::for_job(now + 1, job, EventKind::Finish));
            self.ready.remove(index);
        }
    }

    /// Step 5 fall-through: background aperiodic service on an empty ready
    /// queue, otherwise an idle tick.
    ///
    /// Background consumption neither stamps the job nor logs a completion;
    /// the job is simply drained and dropped.
    fn background_or_idle(&mut self, now: u64) {
        if self.ready.is_empty() {
            if let Some(job) = self.pending_aperiodic.front_mut() {
                self.history
                    .push(TimelineEvent::for_job(now, job, EventKind::BackgroundRun));
                job.remaining -= 1;
                if job.is_complete() {
                    self.pending_aperiodic.pop_front();
                }
                return;
            }
        }
        self.history.push(TimelineEvent::idle(now));
    }

    /// Step 7: verify every non-server ready job can still meet its deadline.
    ///
    /// Expired server jobs found here are zombies from a closed period window
    /// and are removed without ceremony. The first real violation ends the
    /// run.
    fn check_deadlines(&mut self, now: u64) -> Option<RunOutcome> {
        let mut index = 0;
        while index < self.ready.len() {
            let job = &self.ready[index];
            if job.is_server() {
                if now + 1 > job.abs_deadline {
                    debug!(job_id = job.id, time = now + 1, "removing expired server job");
                    self.ready.remove(index);
                } else {
                    index += 1;
                }
                continue;
            }

            if now + 1 > job.abs_deadline {
                error!(
                    time = now + 1,
                    job_id = job.id,
                    task_id = job.task.id,
                    "deadline miss detected"
                );
                let miss = RunOutcome::DeadlineMiss {
                    time: now + 1,
                    job_id: job.id,
                    task_id: job.task.id,
                };
                self.history
                    .push(TimelineEvent::for_job(now + 1, job, EventKind::DeadlineMiss));
                return Some(miss);
            }
            index += 1;
        }
        None
    }
}
