mod job;
mod state;

pub use job::{Job, JobMetadata, JobResult, JobState};
pub use state::{
    InvalidTransition, PROGRESS_DONE, PROGRESS_SUBMITTED, PROGRESS_SUBMITTING, PollOutcome,
    StateMachine, Transition, poll_progress,
};
