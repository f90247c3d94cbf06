//! Status presentation for a tracked job.
//!
//! [`StatusView`] maps a job status to the copy and progress value shown to
//! the user; [`ElapsedTimer`] counts whole seconds while the job is pending
//! or processing.

use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::job::JobStatus;
use crate::poller::PollerState;

/// What the status display shows for a given job status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusView {
    pub title: &'static str,
    pub message: String,
    /// Progress bar value, in percent.
    pub progress: u8,
    /// Whether a busy indicator should be shown.
    pub show_loader: bool,
}

impl StatusView {
    /// Build the view for `status`. `error_message` replaces the generic
    /// failure copy when the job failed.
    pub fn for_status(status: JobStatus, error_message: Option<&str>) -> Self {
        let (title, message, show_loader) = match status {
            JobStatus::Pending => (
                "Upload Complete",
                "Your document is queued for analysis...".to_string(),
                true,
            ),
            JobStatus::Processing => (
                "Analyzing Document",
                "AI is analyzing your document for risks and insights...".to_string(),
                true,
            ),
            JobStatus::Completed => (
                "Analysis Complete!",
                "Your document has been analyzed successfully.".to_string(),
                false,
            ),
            JobStatus::Failed => (
                "Analysis Failed",
                error_message
                    .filter(|m| !m.is_empty())
                    .unwrap_or("Something went wrong. Please try again.")
                    .to_string(),
                false,
            ),
            JobStatus::Unknown => ("Unknown Status", "Processing...".to_string(), true),
        };

        Self {
            title,
            message,
            progress: status.progress(),
            show_loader,
        }
    }

    /// Build the view for a poller state. Timeouts are shown as failures
    /// with the timeout copy.
    pub fn for_state(state: &PollerState) -> Self {
        match state {
            PollerState::Idle => Self::for_status(JobStatus::Pending, None),
            PollerState::Polling { status, .. } => Self::for_status(*status, None),
            PollerState::Completed { .. } => Self::for_status(JobStatus::Completed, None),
            PollerState::Failed { error } => {
                Self::for_status(JobStatus::Failed, Some(&error.user_message()))
            }
            PollerState::TimedOut { .. } => Self::for_status(
                JobStatus::Failed,
                Some(crate::error::TIMEOUT_MESSAGE),
            ),
        }
    }
}

/// Format seconds as `Xs` under a minute, `Ym Zs` otherwise.
pub fn format_elapsed(seconds: u64) -> String {
    if seconds < 60 {
        return format!("{seconds}s");
    }
    format!("{}m {}s", seconds / 60, seconds % 60)
}

/// One-second counter that runs while the tracked job is pending or
/// processing and stops for good once the poller reaches a terminal state
/// or goes away.
pub struct ElapsedTimer {
    seconds: watch::Receiver<u64>,
    task: JoinHandle<()>,
}

impl ElapsedTimer {
    /// Start counting against a poller's state stream.
    pub fn spawn(state: watch::Receiver<PollerState>) -> Self {
        Self::spawn_with_tick(state, Duration::from_secs(1))
    }

    fn spawn_with_tick(mut state: watch::Receiver<PollerState>, tick: Duration) -> Self {
        let (tx, rx) = watch::channel(0u64);
        let task = tokio::spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + tick, tick);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                if state.borrow().is_terminal() {
                    break;
                }
                tokio::select! {
                    changed = state.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                    _ = ticker.tick() => {
                        if state.borrow().is_waiting() {
                            tx.send_modify(|s| *s += 1);
                        }
                    }
                }
            }
        });
        Self { seconds: rx, task }
    }

    /// Seconds counted so far.
    pub fn seconds(&self) -> u64 {
        *self.seconds.borrow()
    }

    /// Elapsed time formatted for display.
    pub fn display(&self) -> String {
        format_elapsed(self.seconds())
    }

    /// Whether the counter has stopped.
    pub fn is_stopped(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for ElapsedTimer {
    fn drop(&mut self) {
        self.task.abort();
    }
}
