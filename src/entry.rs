//! Scheduler entries: a job, its compiled schedule, and firing bookkeeping.

use crate::schedule::Schedule;
use crate::Timestamp;
use std::sync::Arc;

/// Work submitted to the scheduler.
///
/// Implemented for every `Fn()` closure, so most callers go through
/// [`Cron::add_fn`](crate::Cron::add_fn). Each firing runs on its own
/// worker thread; overlapping runs of the same job are the job's concern.
pub trait Job: Send + Sync + 'static {
    /// Execute the job once.
    fn run(&self);
}

impl<F> Job for F
where
    F: Fn() + Send + Sync + 'static,
{
    fn run(&self) {
        self()
    }
}

/// Options applied to an entry at registration.
#[derive(Debug, Clone, Copy, Default)]
pub struct EntryOpts {
    pub(crate) times: u32,
    pub(crate) run_first: bool,
}

impl EntryOpts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cap the number of firings; `0` means unlimited.
    pub fn max_execute_times(mut self, times: u32) -> Self {
        self.times = times;
        self
    }

    /// Fire once as soon as the scheduler starts, ahead of the first
    /// scheduled instant.
    pub fn run_first(mut self) -> Self {
        self.run_first = true;
        self
    }
}

/// The minimum schedulable unit: one job paired with its schedule.
pub struct Entry {
    pub id: i64,
    pub spec: String,
    pub schedule: Schedule,
    pub job: Arc<dyn Job>,
    /// Next firing instant; `None` means never, and sorts after any real
    /// instant.
    pub next: Option<Timestamp>,
    /// Previous firing instant, if any.
    pub prev: Option<Timestamp>,
    /// Max firings; `0` means unlimited.
    pub times: u32,
    /// Firings so far.
    pub(crate) count: u32,
    pub(crate) run_first: bool,
}

impl Entry {
    /// True once a capped entry has used up its firings.
    pub fn exhausted(&self) -> bool {
        self.times != 0 && self.count >= self.times
    }
}
