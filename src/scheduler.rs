//! Fixed-interval polling of a submitted job.
//!
//! [`PollingScheduler`] runs the status checks for one job strictly one
//! after another: wait `interval`, check, apply the outcome through the
//! [`StateMachine`], repeat. Waiting goes through a [`Clock`], so tests can
//! substitute virtual time.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::Notify;
use tracing::{debug, info, warn};

use crate::api::HumanizeApi;
use crate::config::HumanizerConfig;
use crate::error::ClassifiedError;
use crate::state_machine::{Job, JobResult, PollOutcome, StateMachine, Transition};

/// Source of delays for the scheduler.
pub trait Clock: Send + Sync {
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send;
}

/// [`Clock`] backed by `tokio::time`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

impl Clock for TokioClock {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Cooperative cancellation flag shared between a job and its caller.
///
/// Cancelling stops any further status checks. A check already in flight
/// completes, but its result is discarded.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    inner: Arc<CancelInner>,
}

#[derive(Debug, Default)]
struct CancelInner {
    cancelled: AtomicBool,
    notify: Notify,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Resolves once [`cancel`](Self::cancel) has been called.
    pub async fn cancelled(&self) {
        loop {
            // Register before checking the flag so a concurrent cancel is not missed.
            let notified = self.inner.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

/// Interval and attempt budget for polling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(3),
            max_attempts: 40,
        }
    }
}

impl From<&HumanizerConfig> for SchedulerConfig {
    fn from(config: &HumanizerConfig) -> Self {
        Self {
            interval: config.poll_interval(),
            max_attempts: config.max_attempts.max(1),
        }
    }
}

/// Polls one job at a time until it reaches a terminal state.
#[derive(Debug, Clone)]
pub struct PollingScheduler<C = TokioClock> {
    config: SchedulerConfig,
    clock: C,
}

impl PollingScheduler<TokioClock> {
    pub fn new(config: SchedulerConfig) -> Self {
        Self::with_clock(config, TokioClock)
    }
}

impl<C: Clock> PollingScheduler<C> {
    pub fn with_clock(config: SchedulerConfig, clock: C) -> Self {
        let config = SchedulerConfig {
            max_attempts: config.max_attempts.max(1),
            ..config
        };
        Self { config, clock }
    }

    pub fn config(&self) -> SchedulerConfig {
        self.config
    }

    /// Poll `job` until it succeeds, fails, times out, or is cancelled.
    ///
    /// `on_progress` is called once per status check, before the check is
    /// made, with the elapsed-attempts progress estimate.
    pub async fn run<A: HumanizeApi>(
        &self,
        api: &A,
        job: &mut Job,
        cancel: &CancelToken,
        mut on_progress: impl FnMut(f64),
    ) -> Result<JobResult, ClassifiedError> {
        if cancel.is_cancelled() && !job.state.is_terminal() {
            return Err(self.cancel(job));
        }
        StateMachine::start_polling(job)?;
        let max_attempts = self.config.max_attempts;

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(self.cancel(job)),
                _ = self.clock.sleep(self.config.interval) => {}
            }
            if cancel.is_cancelled() {
                return Err(self.cancel(job));
            }

            let progress = StateMachine::record_attempt(job, max_attempts)?;
            on_progress(progress);
            debug!(job_id = %job.id, attempt = job.attempts, max_attempts, "checking job status");

            let outcome = match api.fetch_status(&job.id).await {
                Ok(status) => PollOutcome::Status(status),
                Err(err) => PollOutcome::Fault(err),
            };

            if cancel.is_cancelled() {
                debug!(job_id = %job.id, "discarding status check result after cancellation");
                return Err(self.cancel(job));
            }

            if let PollOutcome::Fault(err) = &outcome {
                warn!(
                    job_id = %job.id,
                    attempt = job.attempts,
                    kind = %err.kind,
                    detail = err.detail.as_deref().unwrap_or(""),
                    "status check failed"
                );
            }

            match StateMachine::next(job, outcome, max_attempts)? {
                Transition::Continue => {}
                Transition::Succeeded(result) => {
                    info!(job_id = %job.id, attempts = job.attempts, "job succeeded");
                    return Ok(result);
                }
                Transition::Failed(err) => {
                    warn!(job_id = %job.id, attempts = job.attempts, kind = %err.kind, "job failed");
                    return Err(err);
                }
                Transition::TimedOut(err) => {
                    warn!(job_id = %job.id, attempts = job.attempts, "job timed out");
                    return Err(err);
                }
            }
        }
    }

    fn cancel(&self, job: &mut Job) -> ClassifiedError {
        info!(job_id = %job.id, attempts = job.attempts, "job cancelled");
        match StateMachine::cancel(job) {
            Ok(err) => err,
            Err(invalid) => invalid.into(),
        }
    }
}
