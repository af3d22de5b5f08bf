//! Client-side workflow for a text humanization service.
//!
//! A request is validated and priced locally ([`credits`]), submitted
//! through [`api::HumanizeClient`], polled to a terminal state by
//! [`scheduler::PollingScheduler`], and reported as a stream of
//! [`workflow::WorkflowEvent`]s. Failures are mapped onto a fixed taxonomy
//! in [`error`]. Credit debits are proposed as [`ledger::LedgerDelta`]s for
//! the caller to apply.

pub mod api;
pub mod cli;
pub mod config;
pub mod credits;
pub mod error;
pub mod ledger;
pub mod logging;
pub mod scheduler;
pub mod state_machine;
pub mod ui;
pub mod workflow;

pub use api::{HumanizationRequest, HumanizeApi, HumanizeClient, Purpose, Readability, Strength};
pub use config::HumanizerConfig;
pub use credits::{PlanContext, estimate_cost, validate};
pub use error::{ClassifiedError, ErrorClassifier, ErrorKind, HumanizerError};
pub use ledger::{LedgerDelta, LedgerQueue, UsageLedger};
pub use scheduler::{CancelToken, Clock, PollingScheduler, SchedulerConfig, TokioClock};
pub use workflow::{Completion, HumanizationWorkflow, WorkflowEvent, WorkflowRun};
