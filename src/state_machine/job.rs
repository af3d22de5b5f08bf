use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::api::{HumanizationRequest, JobHandle};

/// Lifecycle of a submitted job.
///
/// Submitted → Polling → {Succeeded | Failed | TimedOut | Cancelled}
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobState {
    Submitted,
    Polling,
    Succeeded,
    Failed,
    TimedOut,
    Cancelled,
}

impl JobState {
    /// No transition leaves a terminal state.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobState::Succeeded | JobState::Failed | JobState::TimedOut | JobState::Cancelled
        )
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobState::Submitted => write!(f, "SUBMITTED"),
            JobState::Polling => write!(f, "POLLING"),
            JobState::Succeeded => write!(f, "SUCCEEDED"),
            JobState::Failed => write!(f, "FAILED"),
            JobState::TimedOut => write!(f, "TIMED_OUT"),
            JobState::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

/// One humanization request tracked from submission to a terminal state.
///
/// Only [`StateMachine`](super::StateMachine) mutates `attempts`, `state`
/// and `state_history`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub request: HumanizationRequest,
    pub submitted_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub attempts: u32,
    pub state: JobState,
    pub state_history: Vec<JobState>,
}

impl Job {
    /// Create a job for a submission the service accepted.
    pub fn submitted(handle: JobHandle, request: HumanizationRequest) -> Self {
        let now = Utc::now();
        Self {
            id: handle.id,
            request,
            submitted_at: now,
            updated_at: now,
            attempts: 0,
            state: JobState::Submitted,
            state_history: Vec::new(),
        }
    }
}

/// Options the service reports it applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobMetadata {
    pub readability: String,
    pub purpose: String,
}

/// Output of a job that reached `Succeeded`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobResult {
    pub output: String,
    pub cost_credits: u64,
    pub metadata: JobMetadata,
}
