//! Repeating task handles for periodic telemetry refresh.
//!
//! A task never runs on its own: the host polls it with the current instant
//! and performs the work when `poll` reports the task is due.

use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::error::ModelError;

/// Lifecycle of a [`RepeatingTask`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    /// Created but never started.
    Idle,
    Running,
    /// Stopped; may be started again.
    Stopped,
    /// Torn down for good; polls and starts are ignored or rejected.
    Disposed,
}

/// Fixed-interval repeating task with start/stop/dispose control.
///
/// # Examples
///
/// ```
/// use std::time::{Duration, Instant};
/// use pv_monitor::sim::schedule::RepeatingTask;
///
/// let t0 = Instant::now();
/// let mut task = RepeatingTask::new("inverters", Duration::from_secs(5))
///     .expect("non-zero interval");
/// task.start(t0).expect("fresh task starts");
/// assert!(!task.poll(t0 + Duration::from_secs(4)));
/// assert!(task.poll(t0 + Duration::from_secs(5)));
/// task.dispose();
/// assert!(!task.poll(t0 + Duration::from_secs(60)));
/// ```
#[derive(Debug, Clone)]
pub struct RepeatingTask {
    name: String,
    interval: Duration,
    state: TaskState,
    next_due: Option<Instant>,
    runs: u64,
}

impl RepeatingTask {
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidInput`] for a zero interval.
    pub fn new(name: impl Into<String>, interval: Duration) -> Result<Self, ModelError> {
        let name = name.into();
        if interval.is_zero() {
            return Err(ModelError::invalid(format!(
                "task {name}: interval must be > 0"
            )));
        }
        Ok(Self {
            name,
            interval,
            state: TaskState::Idle,
            next_due: None,
            runs: 0,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn state(&self) -> TaskState {
        self.state
    }

    /// Number of times the task has come due.
    pub fn runs(&self) -> u64 {
        self.runs
    }

    pub fn is_running(&self) -> bool {
        self.state == TaskState::Running
    }

    /// Starts (or restarts) the task; the first run is due one interval
    /// after `now`. Starting a running task leaves it unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidInput`] if the task was disposed.
    pub fn start(&mut self, now: Instant) -> Result<(), ModelError> {
        match self.state {
            TaskState::Disposed => Err(ModelError::invalid(format!(
                "task {} was disposed",
                self.name
            ))),
            TaskState::Running => Ok(()),
            TaskState::Idle | TaskState::Stopped => {
                self.state = TaskState::Running;
                self.next_due = Some(now + self.interval);
                debug!(
                    task = %self.name,
                    interval_ms = self.interval.as_millis() as u64,
                    "task started"
                );
                Ok(())
            }
        }
    }

    /// Pauses the task. No effect unless running.
    pub fn stop(&mut self) {
        if self.state == TaskState::Running {
            self.state = TaskState::Stopped;
            self.next_due = None;
            debug!(task = %self.name, "task stopped");
        }
    }

    /// Tears the task down permanently.
    pub fn dispose(&mut self) {
        if self.state != TaskState::Disposed {
            self.state = TaskState::Disposed;
            self.next_due = None;
            debug!(task = %self.name, runs = self.runs, "task disposed");
        }
    }

    /// Returns `true` when the task is due at `now` and schedules the next
    /// run one interval later. Missed intervals are not replayed.
    pub fn poll(&mut self, now: Instant) -> bool {
        match (self.state, self.next_due) {
            (TaskState::Running, Some(due)) if now >= due => {
                self.next_due = Some(now + self.interval);
                self.runs += 1;
                true
            }
            (TaskState::Disposed, _) => {
                warn!(task = %self.name, "poll after dispose ignored");
                false
            }
            _ => false,
        }
    }
}
