//! Job status poller.
//!
//! Tracks one analysis job from submission to a terminal state and hands
//! off the result exactly once.
//!
//! ```text
//!            start()             completed + resultId, result fetched
//!   Idle ──────────────→ Polling ─────────────────────────────────→ Completed
//!                          │  ↺ pending / processing (every interval)
//!                          ├──→ Failed    (failed, missing resultId, transport error)
//!                          └──→ TimedOut  (attempt ceiling reached)
//! ```
//!
//! **Invariants:**
//! - The first status query is issued immediately, later ones on a fixed
//!   interval.
//! - No status query is issued after a terminal response, and never more
//!   than `max_attempts` in total.
//! - The result is fetched at most once per job.
//! - Nothing is retried; every error ends the poller.
//! - After teardown ([`PollHandle::cancel`] or dropping the handle) the
//!   poller publishes no further state or events.
//! - One session runs at most one poller per job.

use std::sync::{Arc, Mutex};

use rustc_hash::FxHashSet;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::PollPolicy;
use crate::error::{ClientError, ClientResult, MISSING_IDS_MESSAGE};
use crate::job::{JobId, JobStatus, JobStatusReport, OwnerId, ResultId};
use crate::result::AnalysisResult;
use crate::service::AnalysisService;

/// State of a poller.
#[derive(Debug, Clone, PartialEq)]
pub enum PollerState {
    /// Not started.
    Idle,
    /// Querying status; `status` is the last reported value.
    Polling { attempts: u32, status: JobStatus },
    /// Result fetched and handed off.
    Completed { result_id: ResultId },
    /// Ended with an error.
    Failed { error: ClientError },
    /// Attempt ceiling reached while the job was still running.
    TimedOut { attempts: u32 },
}

impl PollerState {
    /// Check if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PollerState::Completed { .. } | PollerState::Failed { .. } | PollerState::TimedOut { .. }
        )
    }

    /// Last job status known to this state.
    pub fn job_status(&self) -> Option<JobStatus> {
        match self {
            PollerState::Idle => None,
            PollerState::Polling { status, .. } => Some(*status),
            PollerState::Completed { .. } => Some(JobStatus::Completed),
            PollerState::Failed { .. } => Some(JobStatus::Failed),
            PollerState::TimedOut { .. } => None,
        }
    }

    /// True while the job is waiting on or being worked by the service.
    pub fn is_waiting(&self) -> bool {
        matches!(self, PollerState::Polling { status, .. } if status.is_pending())
    }
}

/// What the driver should do after a transition.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// Keep polling.
    Continue(JobStatus),
    /// Stop the timer and fetch this result once.
    FetchResult(ResultId),
    /// A terminal state was reached.
    Stop,
}

/// Pure transition logic of the poller, free of timers and I/O.
#[derive(Debug, Clone)]
pub struct PollerMachine {
    job_id: JobId,
    state: PollerState,
    max_attempts: u32,
    fetch_requested: bool,
}

impl PollerMachine {
    pub fn new(job_id: JobId, max_attempts: u32) -> Self {
        Self {
            job_id,
            state: PollerState::Idle,
            max_attempts,
            fetch_requested: false,
        }
    }

    pub fn state(&self) -> &PollerState {
        &self.state
    }

    pub fn attempts(&self) -> u32 {
        match self.state {
            PollerState::Polling { attempts, .. } | PollerState::TimedOut { attempts } => attempts,
            _ => 0,
        }
    }

    /// Leave `Idle`. Any other state rejects the call.
    pub fn start(&mut self) -> ClientResult<()> {
        if self.state != PollerState::Idle {
            return Err(ClientError::AlreadyPolling(self.job_id.to_string()));
        }
        self.state = PollerState::Polling {
            attempts: 0,
            status: JobStatus::Pending,
        };
        Ok(())
    }

    /// Count a status query about to be dispatched. Returns the attempt
    /// number, or `None` when no further query is allowed.
    pub fn begin_attempt(&mut self) -> Option<u32> {
        match &mut self.state {
            PollerState::Polling { attempts, .. }
                if *attempts < self.max_attempts && !self.fetch_requested =>
            {
                *attempts += 1;
                Some(*attempts)
            }
            _ => None,
        }
    }

    /// Apply a status report.
    pub fn observe(&mut self, report: &JobStatusReport) -> Step {
        let PollerState::Polling { attempts, .. } = self.state else {
            return Step::Stop;
        };
        if self.fetch_requested {
            return Step::Stop;
        }

        match report.status {
            JobStatus::Completed => match report.usable_result_id() {
                Some(result_id) => {
                    self.fetch_requested = true;
                    self.state = PollerState::Polling {
                        attempts,
                        status: JobStatus::Completed,
                    };
                    Step::FetchResult(result_id.clone())
                }
                None => self.fail(ClientError::MissingResult(self.job_id.to_string())),
            },
            JobStatus::Failed => self.fail(ClientError::JobFailed(report.error_message.clone())),
            status if attempts >= self.max_attempts => {
                debug!(job_id = %self.job_id, %status, attempts, "attempt ceiling reached");
                self.state = PollerState::TimedOut { attempts };
                Step::Stop
            }
            status => {
                self.state = PollerState::Polling { attempts, status };
                Step::Continue(status)
            }
        }
    }

    /// Record the fetched result.
    pub fn complete(&mut self, result_id: ResultId) -> Step {
        if self.fetch_requested && !self.state.is_terminal() {
            self.state = PollerState::Completed { result_id };
        }
        Step::Stop
    }

    /// End in `Failed` unless already terminal.
    pub fn fail(&mut self, error: ClientError) -> Step {
        if !self.state.is_terminal() {
            self.state = PollerState::Failed { error };
        }
        Step::Stop
    }
}

/// Notification emitted by a running poller.
#[derive(Debug, Clone, PartialEq)]
pub enum PollEvent {
    /// A non-terminal status was observed.
    Status {
        status: JobStatus,
        attempt: u32,
        progress: u8,
    },
    /// The result is ready. Emitted at most once.
    Completed {
        result_id: ResultId,
        result: Box<AnalysisResult>,
    },
    /// The poller stopped on an error (including timeout).
    Failed { error: ClientError, message: String },
}

/// How a poller ended.
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    Completed {
        result_id: ResultId,
        result: AnalysisResult,
    },
    Failed(ClientError),
    /// Torn down before reaching a terminal state.
    Cancelled,
}

impl PollOutcome {
    /// Message for the display layer, if any.
    pub fn message(&self) -> Option<String> {
        match self {
            PollOutcome::Failed(err) => Some(err.user_message()),
            PollOutcome::Completed { .. } | PollOutcome::Cancelled => None,
        }
    }

    pub fn into_result(self) -> Option<AnalysisResult> {
        match self {
            PollOutcome::Completed { result, .. } => Some(result),
            _ => None,
        }
    }
}

/// Starts pollers and guarantees one poller per job within a session.
pub struct JobPoller<S: ?Sized> {
    service: Arc<S>,
    policy: PollPolicy,
    active: Arc<Mutex<FxHashSet<JobId>>>,
}

impl<S: ?Sized> Clone for JobPoller<S> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
            policy: self.policy,
            active: Arc::clone(&self.active),
        }
    }
}

impl<S> JobPoller<S>
where
    S: AnalysisService + ?Sized + 'static,
{
    pub fn new(service: Arc<S>, policy: PollPolicy) -> Self {
        Self {
            service,
            policy,
            active: Arc::new(Mutex::new(FxHashSet::default())),
        }
    }

    pub fn policy(&self) -> &PollPolicy {
        &self.policy
    }

    /// Whether a poller for `job_id` is currently running.
    pub fn is_tracking(&self, job_id: &JobId) -> bool {
        lock_active(&self.active).contains(job_id)
    }

    /// Start polling `job_id` on behalf of `owner_id`.
    ///
    /// Fails immediately, without spawning anything, when either id is blank,
    /// the policy is invalid, or the job is already being polled. Must be
    /// called from within a tokio runtime.
    pub fn start(
        &self,
        job_id: impl Into<JobId>,
        owner_id: impl Into<OwnerId>,
    ) -> ClientResult<PollHandle> {
        let job_id = job_id.into();
        let owner_id = owner_id.into();
        if job_id.is_blank() || owner_id.is_blank() {
            warn!(%job_id, %owner_id, "refusing to poll without job and owner ids");
            return Err(ClientError::Configuration(MISSING_IDS_MESSAGE.to_string()));
        }
        self.policy.validate()?;

        let mut machine = PollerMachine::new(job_id.clone(), self.policy.max_attempts);
        machine.start()?;

        if !lock_active(&self.active).insert(job_id.clone()) {
            return Err(ClientError::AlreadyPolling(job_id.to_string()));
        }
        let registration = Registration {
            active: Arc::clone(&self.active),
            job_id: job_id.clone(),
        };

        let cancel = CancellationToken::new();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(machine.state().clone());

        let task = PollTask {
            service: Arc::clone(&self.service),
            job_id: job_id.clone(),
            owner_id,
            policy: self.policy,
            machine,
            cancel: cancel.clone(),
            events: events_tx,
            state: state_tx,
            _registration: registration,
        };
        info!(%job_id, interval_ms = self.policy.interval_ms, max_attempts = self.policy.max_attempts, "polling job status");
        let task = tokio::spawn(task.run());

        Ok(PollHandle {
            job_id,
            cancel,
            events: events_rx,
            state: state_rx,
            task: Some(task),
        })
    }
}

fn lock_active(active: &Mutex<FxHashSet<JobId>>) -> std::sync::MutexGuard<'_, FxHashSet<JobId>> {
    active.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Removes a job from the session registry when its task ends.
struct Registration {
    active: Arc<Mutex<FxHashSet<JobId>>>,
    job_id: JobId,
}

impl Drop for Registration {
    fn drop(&mut self) {
        lock_active(&self.active).remove(&self.job_id);
    }
}

/// The spawned half of a poller.
struct PollTask<S: ?Sized> {
    service: Arc<S>,
    job_id: JobId,
    owner_id: OwnerId,
    policy: PollPolicy,
    machine: PollerMachine,
    cancel: CancellationToken,
    events: mpsc::UnboundedSender<PollEvent>,
    state: watch::Sender<PollerState>,
    _registration: Registration,
}

impl<S> PollTask<S>
where
    S: AnalysisService + ?Sized,
{
    async fn run(mut self) -> PollOutcome {
        let mut ticker = time::interval(self.policy.interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let result_id = loop {
            tokio::select! {
                biased;
                () = self.cancel.cancelled() => return self.torn_down(),
                _ = ticker.tick() => {}
            }

            let Some(attempt) = self.machine.begin_attempt() else {
                // Unreachable while the machine is driven only from here.
                return self.finish();
            };
            debug!(job_id = %self.job_id, attempt, max = self.policy.max_attempts, "checking job status");

            let response = tokio::select! {
                biased;
                () = self.cancel.cancelled() => return self.torn_down(),
                r = self.service.job_status(&self.job_id, &self.owner_id) => r,
            };
            if self.cancel.is_cancelled() {
                return self.torn_down();
            }

            let step = match response {
                Ok(report) => self.machine.observe(&report),
                Err(err) => self.machine.fail(err),
            };
            match step {
                Step::Continue(status) => {
                    self.publish_state();
                    self.emit(PollEvent::Status {
                        status,
                        attempt,
                        progress: status.progress(),
                    });
                }
                Step::FetchResult(result_id) => break result_id,
                Step::Stop => return self.finish(),
            }
        };

        // Timer is dropped here: completed means no further status queries.
        drop(ticker);
        self.publish_state();
        info!(job_id = %self.job_id, %result_id, "job completed, fetching result");

        let fetched = tokio::select! {
            biased;
            () = self.cancel.cancelled() => return self.torn_down(),
            r = self.service.analysis_result(&result_id, &self.owner_id) => r,
        };
        if self.cancel.is_cancelled() {
            return self.torn_down();
        }

        match fetched {
            Ok(result) => {
                self.machine.complete(result_id.clone());
                self.publish_state();
                self.emit(PollEvent::Completed {
                    result_id: result_id.clone(),
                    result: Box::new(result.clone()),
                });
                PollOutcome::Completed { result_id, result }
            }
            Err(err) => {
                self.machine.fail(err);
                self.finish()
            }
        }
    }

    /// Publish a terminal failure or timeout and build the outcome.
    fn finish(&self) -> PollOutcome {
        let error = match self.machine.state() {
            PollerState::Failed { error } => error.clone(),
            PollerState::TimedOut { attempts } => ClientError::Timeout {
                job_id: self.job_id.to_string(),
                attempts: *attempts,
            },
            other => ClientError::Configuration(format!("poller stopped in state {other:?}")),
        };
        let message = error.user_message();
        warn!(job_id = %self.job_id, %error, "polling stopped");
        self.publish_state();
        self.emit(PollEvent::Failed {
            error: error.clone(),
            message,
        });
        PollOutcome::Failed(error)
    }

    fn torn_down(&self) -> PollOutcome {
        debug!(job_id = %self.job_id, attempts = self.machine.attempts(), "poller torn down");
        PollOutcome::Cancelled
    }

    fn publish_state(&self) {
        if self.cancel.is_cancelled() {
            return;
        }
        self.state.send_replace(self.machine.state().clone());
    }

    fn emit(&self, event: PollEvent) {
        if self.cancel.is_cancelled() {
            return;
        }
        // The receiver may be gone if the caller only awaits the outcome.
        let _ = self.events.send(event);
    }
}

/// Caller-side handle to a running poller.
///
/// Dropping the handle tears the poller down.
pub struct PollHandle {
    job_id: JobId,
    cancel: CancellationToken,
    events: mpsc::UnboundedReceiver<PollEvent>,
    state: watch::Receiver<PollerState>,
    task: Option<JoinHandle<PollOutcome>>,
}

impl PollHandle {
    pub fn job_id(&self) -> &JobId {
        &self.job_id
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> PollerState {
        self.state.borrow().clone()
    }

    /// Subscribe to state changes, e.g. for an [`ElapsedTimer`](crate::progress::ElapsedTimer).
    pub fn subscribe(&self) -> watch::Receiver<PollerState> {
        self.state.clone()
    }

    /// Next event, or `None` once the poller has stopped and all events
    /// have been received.
    pub async fn next_event(&mut self) -> Option<PollEvent> {
        self.events.recv().await
    }

    /// Tear the poller down. Takes effect before the next state mutation,
    /// even if a request is in flight.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Wait for the poller to stop.
    pub async fn outcome(mut self) -> PollOutcome {
        let Some(task) = self.task.take() else {
            return PollOutcome::Cancelled;
        };
        match task.await {
            Ok(outcome) => outcome,
            Err(err) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
            Err(_) => PollOutcome::Cancelled,
        }
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
