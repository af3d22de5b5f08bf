use chrono::Utc;
use thiserror::Error;

use super::job::{Job, JobMetadata, JobResult, JobState};
use crate::api::JobStatus;
use crate::credits::estimate_cost;
use crate::error::{ClassifiedError, ErrorKind};

/// Progress reported once input validation passed and submission begins.
pub const PROGRESS_SUBMITTING: f64 = 10.0;
/// Progress reported once the service accepted the job.
pub const PROGRESS_SUBMITTED: f64 = 50.0;
/// Progress reported on success.
pub const PROGRESS_DONE: f64 = 100.0;

/// Elapsed-attempts estimate of progress while polling:
/// `min(50 + attempts / max_attempts * 40, 100)`.
pub fn poll_progress(attempts: u32, max_attempts: u32) -> f64 {
    let max = max_attempts.max(1) as f64;
    (PROGRESS_SUBMITTED + attempts as f64 / max * 40.0).min(PROGRESS_DONE)
}

/// What a single status check observed.
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    /// The service answered; the job may or may not be ready.
    Status(JobStatus),
    /// The check failed (transport or protocol error).
    Fault(ClassifiedError),
}

/// The result of applying a poll outcome to a job.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// Still polling; schedule another check.
    Continue,
    Succeeded(JobResult),
    Failed(ClassifiedError),
    TimedOut(ClassifiedError),
}

/// A transition was requested from a state that does not allow it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("job {job_id} cannot move from {from} to {to}")]
pub struct InvalidTransition {
    pub job_id: String,
    pub from: JobState,
    pub to: JobState,
}

impl From<InvalidTransition> for ClassifiedError {
    fn from(err: InvalidTransition) -> Self {
        let kind = if err.from == JobState::Cancelled {
            ErrorKind::Cancelled
        } else {
            ErrorKind::UnknownApiError
        };
        ClassifiedError::new(kind).with_detail(err.to_string())
    }
}

/// Drives a [`Job`] through its lifecycle. Every mutation of a job goes
/// through here.
pub struct StateMachine;

impl StateMachine {
    /// Submitted → Polling.
    pub fn start_polling(job: &mut Job) -> Result<(), InvalidTransition> {
        Self::require(job, JobState::Submitted, JobState::Polling)?;
        Self::enter(job, JobState::Polling);
        Ok(())
    }

    /// Count one status check and return the progress to report for it.
    pub fn record_attempt(job: &mut Job, max_attempts: u32) -> Result<f64, InvalidTransition> {
        Self::require(job, JobState::Polling, JobState::Polling)?;
        job.attempts += 1;
        job.updated_at = Utc::now();
        Ok(poll_progress(job.attempts, max_attempts))
    }

    /// Apply the outcome of the check counted by the last
    /// [`record_attempt`](Self::record_attempt).
    ///
    /// - Ready output → `Succeeded` with the job's [`JobResult`].
    /// - Not ready or a fault with attempts left → `Continue`.
    /// - Not ready on the last attempt → `TimedOut` (ProcessingTimeout).
    /// - A fault on the last attempt → `Failed` carrying that fault.
    pub fn next(
        job: &mut Job,
        outcome: PollOutcome,
        max_attempts: u32,
    ) -> Result<Transition, InvalidTransition> {
        Self::require(job, JobState::Polling, JobState::Polling)?;
        let exhausted = job.attempts >= max_attempts;

        let transition = match outcome {
            PollOutcome::Status(status) if status.ready => {
                Transition::Succeeded(Self::result_for(job, status))
            }
            PollOutcome::Status(_) if exhausted => Transition::TimedOut(
                ClassifiedError::new(ErrorKind::ProcessingTimeout)
                    .with_detail(format!("no output after {} status checks", job.attempts)),
            ),
            PollOutcome::Fault(err) if exhausted => Transition::Failed(err),
            PollOutcome::Status(_) | PollOutcome::Fault(_) => Transition::Continue,
        };

        match &transition {
            Transition::Continue => job.updated_at = Utc::now(),
            Transition::Succeeded(_) => Self::enter(job, JobState::Succeeded),
            Transition::Failed(_) => Self::enter(job, JobState::Failed),
            Transition::TimedOut(_) => Self::enter(job, JobState::TimedOut),
        }

        Ok(transition)
    }

    /// Submitted | Polling → Cancelled.
    pub fn cancel(job: &mut Job) -> Result<ClassifiedError, InvalidTransition> {
        if job.state.is_terminal() {
            return Err(InvalidTransition {
                job_id: job.id.clone(),
                from: job.state,
                to: JobState::Cancelled,
            });
        }
        Self::enter(job, JobState::Cancelled);
        Ok(ClassifiedError::new(ErrorKind::Cancelled)
            .with_detail(format!("cancelled after {} status checks", job.attempts)))
    }

    fn require(job: &Job, expected: JobState, to: JobState) -> Result<(), InvalidTransition> {
        if job.state == expected {
            Ok(())
        } else {
            Err(InvalidTransition {
                job_id: job.id.clone(),
                from: job.state,
                to,
            })
        }
    }

    fn enter(job: &mut Job, next: JobState) {
        job.state_history.push(job.state);
        job.state = next;
        job.updated_at = Utc::now();
    }

    fn result_for(job: &Job, status: JobStatus) -> JobResult {
        JobResult {
            output: status.output.unwrap_or_default(),
            cost_credits: estimate_cost(&job.request.text),
            metadata: JobMetadata {
                readability: status
                    .readability
                    .filter(|r| !r.is_empty())
                    .unwrap_or_else(|| job.request.readability.as_str().to_string()),
                purpose: status
                    .purpose
                    .filter(|p| !p.is_empty())
                    .unwrap_or_else(|| job.request.purpose.as_str().to_string()),
            },
        }
    }
}
