//! Elapsed-time scheduling for tasks that share the control thread.

/// A task that should run every `period_ms`.
///
/// The next run is measured from when the previous run *started*, and missed
/// periods are not replayed: a task that is late runs once, then waits a
/// full period again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeriodicTask {
    period_ms: u64,
    last_run_ms: Option<u64>,
}

impl PeriodicTask {
    /// Due immediately, then every `period_ms`.
    pub fn new(period_ms: u64) -> Self {
        Self {
            period_ms: period_ms.max(1),
            last_run_ms: None,
        }
    }

    /// First due one full period after `start_ms`.
    pub fn deferred(period_ms: u64, start_ms: u64) -> Self {
        Self {
            period_ms: period_ms.max(1),
            last_run_ms: Some(start_ms),
        }
    }

    pub fn due(&self, now_ms: u64) -> bool {
        match self.last_run_ms {
            None => true,
            Some(last) => now_ms.saturating_sub(last) >= self.period_ms,
        }
    }

    /// Record that a run started at `now_ms`.
    pub fn mark(&mut self, now_ms: u64) {
        self.last_run_ms = Some(now_ms);
    }

    /// Milliseconds until the task is due; 0 when already due.
    pub fn next_due_in(&self, now_ms: u64) -> u64 {
        match self.last_run_ms {
            None => 0,
            Some(last) => (last.saturating_add(self.period_ms)).saturating_sub(now_ms),
        }
    }

    pub fn period_ms(&self) -> u64 {
        self.period_ms
    }

    pub fn last_run_ms(&self) -> Option<u64> {
        self.last_run_ms
    }
}
