//! End-to-end humanization of one request.
//!
//! [`HumanizationWorkflow::run`] validates the request, submits it, polls it
//! to a terminal state and reports everything as a stream of
//! [`WorkflowEvent`]s: progress updates, then exactly one `Completed` or
//! `Failed`. On success the workflow proposes a [`LedgerDelta`]; applying it
//! is the caller's job.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::Stream;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{info, warn};

use crate::api::{HumanizationRequest, HumanizeApi};
use crate::credits::{self, PlanContext};
use crate::error::{ClassifiedError, ErrorKind};
use crate::ledger::LedgerDelta;
use crate::scheduler::{CancelToken, Clock, PollingScheduler, TokioClock};
use crate::state_machine::{Job, JobResult, PROGRESS_DONE, PROGRESS_SUBMITTED, PROGRESS_SUBMITTING};

/// Something the caller should show or act on.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkflowEvent {
    /// Estimated completion, 0 to 100. Non-decreasing within one run.
    ProgressUpdate(f64),
    Completed(Completion),
    Failed(ClassifiedError),
}

impl WorkflowEvent {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, WorkflowEvent::ProgressUpdate(_))
    }
}

/// A successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub job_id: String,
    pub result: JobResult,
    /// Debit to apply to the caller's ledger. `None` for anonymous callers.
    pub ledger_delta: Option<LedgerDelta>,
}

/// Orchestrates validation, submission and polling.
pub struct HumanizationWorkflow<A, C = TokioClock> {
    api: Arc<A>,
    scheduler: PollingScheduler<C>,
}

impl<A, C> HumanizationWorkflow<A, C>
where
    A: HumanizeApi + 'static,
    C: Clock + Clone + 'static,
{
    pub fn new(api: Arc<A>, scheduler: PollingScheduler<C>) -> Self {
        Self { api, scheduler }
    }

    /// Start a run in the background and return its event stream.
    pub fn run(&self, request: HumanizationRequest, plan: Option<PlanContext>) -> WorkflowRun {
        self.run_with_cancel(request, plan, CancelToken::new())
    }

    /// Like [`run`](Self::run), with a caller-supplied cancellation token.
    pub fn run_with_cancel(
        &self,
        request: HumanizationRequest,
        plan: Option<PlanContext>,
        cancel: CancelToken,
    ) -> WorkflowRun {
        let (sender, receiver) = mpsc::unbounded_channel();
        let api = Arc::clone(&self.api);
        let scheduler = self.scheduler.clone();
        let token = cancel.clone();

        tokio::spawn(async move {
            let mut emit = |event: WorkflowEvent| {
                // Nobody is listening any more; stop the job.
                if sender.send(event).is_err() {
                    token.cancel();
                }
            };
            drive(api.as_ref(), &scheduler, request, plan, &token, &mut emit).await;
        });

        WorkflowRun {
            events: UnboundedReceiverStream::new(receiver),
            cancel,
        }
    }

    /// Run on the current task, handing each event to `emit`.
    pub async fn execute(
        &self,
        request: HumanizationRequest,
        plan: Option<PlanContext>,
        cancel: &CancelToken,
        mut emit: impl FnMut(WorkflowEvent),
    ) {
        drive(self.api.as_ref(), &self.scheduler, request, plan, cancel, &mut emit).await;
    }
}

async fn drive<A: HumanizeApi, C: Clock>(
    api: &A,
    scheduler: &PollingScheduler<C>,
    request: HumanizationRequest,
    plan: Option<PlanContext>,
    cancel: &CancelToken,
    emit: &mut impl FnMut(WorkflowEvent),
) {
    if cancel.is_cancelled() {
        emit(WorkflowEvent::Failed(ClassifiedError::new(ErrorKind::Cancelled)));
        return;
    }

    if let Err(err) = credits::validate(&request.text, plan.as_ref()) {
        info!(kind = %err.kind, detail = err.detail.as_deref().unwrap_or(""), "request rejected");
        emit(WorkflowEvent::Failed(err));
        return;
    }

    emit(WorkflowEvent::ProgressUpdate(PROGRESS_SUBMITTING));
    let submitted = api.submit(&request).await;
    // A cancel that lands while the submit is in flight wins over its result.
    if cancel.is_cancelled() {
        info!(submitted = submitted.is_ok(), "cancelled during submission");
        emit(WorkflowEvent::Failed(ClassifiedError::new(ErrorKind::Cancelled)));
        return;
    }
    let handle = match submitted {
        Ok(handle) => handle,
        Err(err) => {
            warn!(kind = %err.kind, status = ?err.status, "submission failed");
            emit(WorkflowEvent::Failed(err));
            return;
        }
    };
    info!(job_id = %handle.id, "job submitted");

    let mut job = Job::submitted(handle, request);
    emit(WorkflowEvent::ProgressUpdate(PROGRESS_SUBMITTED));

    let outcome = scheduler
        .run(api, &mut job, cancel, |p| emit(WorkflowEvent::ProgressUpdate(p)))
        .await;

    match outcome {
        Ok(result) => {
            emit(WorkflowEvent::ProgressUpdate(PROGRESS_DONE));
            let ledger_delta = plan.map(|_| LedgerDelta::for_result(&job.request, &result));
            emit(WorkflowEvent::Completed(Completion {
                job_id: job.id.clone(),
                result,
                ledger_delta,
            }));
        }
        Err(err) => emit(WorkflowEvent::Failed(err)),
    }
}

/// Handle to a running workflow: a stream of events plus cancellation.
///
/// Dropping the handle cancels the job.
pub struct WorkflowRun {
    events: UnboundedReceiverStream<WorkflowEvent>,
    cancel: CancelToken,
}

impl WorkflowRun {
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Drain the stream, calling `on_progress` for each update, and return
    /// the terminal outcome.
    pub async fn finish(
        mut self,
        mut on_progress: impl FnMut(f64),
    ) -> Result<Completion, ClassifiedError> {
        use futures::StreamExt;

        while let Some(event) = self.next().await {
            match event {
                WorkflowEvent::ProgressUpdate(p) => on_progress(p),
                WorkflowEvent::Completed(completion) => return Ok(completion),
                WorkflowEvent::Failed(err) => return Err(err),
            }
        }
        // The worker always ends with a terminal event; reaching here means it panicked.
        Err(ClassifiedError::new(ErrorKind::UnknownApiError).with_detail("workflow ended without a result"))
    }
}

impl Stream for WorkflowRun {
    type Item = WorkflowEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.events).poll_next(cx)
    }
}

impl Drop for WorkflowRun {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use futures::StreamExt;

    use super::*;
    use crate::api::JobStatus;
    use crate::scheduler::SchedulerConfig;
    use crate::scheduler::testing::{RecordingClock, ScriptedApi};

    fn workflow(api: Arc<ScriptedApi>, max_attempts: u32) -> HumanizationWorkflow<ScriptedApi, RecordingClock> {
        let scheduler = PollingScheduler::with_clock(
            SchedulerConfig {
                interval: Duration::from_secs(3),
                max_attempts,
            },
            RecordingClock::default(),
        );
        HumanizationWorkflow::new(api, scheduler)
    }

    fn plan() -> Option<PlanContext> {
        Some(PlanContext {
            character_limit: 15_000,
            credits_remaining: 1_000,
        })
    }

    fn progress(events: &[WorkflowEvent]) -> Vec<f64> {
        events
            .iter()
            .filter_map(|e| match e {
                WorkflowEvent::ProgressUpdate(p) => Some(*p),
                _ => None,
            })
            .collect()
    }

    fn terminal(events: &[WorkflowEvent]) -> &WorkflowEvent {
        let terminals: Vec<_> = events.iter().filter(|e| e.is_terminal()).collect();
        assert_eq!(terminals.len(), 1, "expected exactly one terminal event: {events:?}");
        assert!(events.last().unwrap().is_terminal());
        terminals[0]
    }

    fn failure_kind(events: &[WorkflowEvent]) -> ErrorKind {
        match terminal(events) {
            WorkflowEvent::Failed(err) => err.kind,
            other => panic!("expected Failed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn completes_with_output_from_third_poll() {
        let api = Arc::new(ScriptedApi::new(vec![
            Ok(JobStatus::pending()),
            Ok(JobStatus::pending()),
            Ok(JobStatus::ready("Hello world")),
        ]));
        let text = "w".repeat(600);

        let events: Vec<_> = workflow(Arc::clone(&api), 40)
            .run(HumanizationRequest::new(text.clone()), plan())
            .collect()
            .await;

        assert_eq!(progress(&events), vec![10.0, 50.0, 51.0, 52.0, 53.0, 100.0]);
        match terminal(&events) {
            WorkflowEvent::Completed(done) => {
                assert_eq!(done.job_id, "doc-1");
                assert_eq!(done.result.output, "Hello world");
                assert_eq!(done.result.cost_credits, credits::estimate_cost(&text));
                let delta = done.ledger_delta.as_ref().unwrap();
                assert_eq!(delta.credits, 60);
                assert_eq!(delta.entry.original, text);
                assert_eq!(delta.entry.humanized, "Hello world");
            }
            other => panic!("expected Completed, got {other:?}"),
        }
        assert_eq!(api.submits(), 1);
        assert_eq!(api.fetches(), 3);
    }

    #[tokio::test]
    async fn progress_is_non_decreasing_and_ends_at_100() {
        let mut statuses = vec![Err(ClassifiedError::new(ErrorKind::NetworkError)); 5];
        statuses.extend(vec![Ok(JobStatus::pending()); 10]);
        statuses.push(Ok(JobStatus::ready("done")));
        let api = Arc::new(ScriptedApi::new(statuses));

        let events: Vec<_> = workflow(api, 40)
            .run(HumanizationRequest::new("q".repeat(80)), None)
            .collect()
            .await;

        let values = progress(&events);
        assert!(values.windows(2).all(|w| w[0] <= w[1]), "{values:?}");
        assert_eq!(*values.last().unwrap(), 100.0);
        assert!(matches!(terminal(&events), WorkflowEvent::Completed(_)));
    }

    #[tokio::test]
    async fn anonymous_run_proposes_no_ledger_delta() {
        let api = Arc::new(ScriptedApi::new(vec![Ok(JobStatus::ready("ok"))]));
        let outcome = workflow(api, 40)
            .run(HumanizationRequest::new("q".repeat(80)), None)
            .finish(|_| {})
            .await
            .unwrap();
        assert_eq!(outcome.result.cost_credits, 8);
        assert!(outcome.ledger_delta.is_none());
    }

    #[tokio::test]
    async fn short_text_fails_without_network() {
        let api = Arc::new(ScriptedApi::new(Vec::new()));
        let events: Vec<_> = workflow(Arc::clone(&api), 40)
            .run(HumanizationRequest::new("a".repeat(49)), plan())
            .collect()
            .await;

        assert_eq!(events.len(), 1);
        assert_eq!(failure_kind(&events), ErrorKind::InputTooShort);
        assert_eq!(api.submits(), 0);
        assert_eq!(api.fetches(), 0);
    }

    #[tokio::test]
    async fn long_text_fails_without_network() {
        let api = Arc::new(ScriptedApi::new(Vec::new()));
        let events: Vec<_> = workflow(Arc::clone(&api), 40)
            .run(HumanizationRequest::new("a".repeat(1_001)), None)
            .collect()
            .await;

        assert_eq!(failure_kind(&events), ErrorKind::InputTooLong);
        assert_eq!(api.submits(), 0);
    }

    #[tokio::test]
    async fn credit_precheck_fails_without_network() {
        let api = Arc::new(ScriptedApi::new(Vec::new()));
        let poor = Some(PlanContext {
            character_limit: 15_000,
            credits_remaining: 10,
        });
        let events: Vec<_> = workflow(Arc::clone(&api), 40)
            .run(HumanizationRequest::new("a".repeat(600)), poor)
            .collect()
            .await;

        assert_eq!(failure_kind(&events), ErrorKind::InsufficientCredits);
        assert_eq!(api.submits(), 0);
    }

    #[tokio::test]
    async fn submit_402_fails_with_zero_polls() {
        let api = Arc::new(ScriptedApi::failing_submit(
            ClassifiedError::new(ErrorKind::InsufficientCredits).with_status(402),
        ));
        let events: Vec<_> = workflow(Arc::clone(&api), 40)
            .run(HumanizationRequest::new("a".repeat(600)), plan())
            .collect()
            .await;

        assert_eq!(failure_kind(&events), ErrorKind::InsufficientCredits);
        assert_eq!(api.submits(), 1);
        assert_eq!(api.fetches(), 0);
    }

    #[tokio::test]
    async fn never_ready_times_out_after_exactly_max_attempts() {
        let api = Arc::new(ScriptedApi::new(Vec::new()));
        let events: Vec<_> = workflow(Arc::clone(&api), 40)
            .run(HumanizationRequest::new("a".repeat(600)), plan())
            .collect()
            .await;

        assert_eq!(failure_kind(&events), ErrorKind::ProcessingTimeout);
        assert_eq!(api.fetches(), 40);
        // 10, 50 and one update per poll.
        assert_eq!(progress(&events).len(), 42);
        assert_eq!(*progress(&events).last().unwrap(), 90.0);
    }

    #[tokio::test]
    async fn cancel_mid_poll_yields_one_cancelled_failure() {
        let token = CancelToken::new();
        let api = Arc::new(
            ScriptedApi::new(Vec::new()).cancelling_on_fetch(3, token.clone()),
        );
        let events: Vec<_> = workflow(Arc::clone(&api), 40)
            .run_with_cancel(HumanizationRequest::new("a".repeat(600)), plan(), token)
            .collect()
            .await;

        assert_eq!(failure_kind(&events), ErrorKind::Cancelled);
        assert_eq!(api.fetches(), 3);
    }

    #[tokio::test]
    async fn cancel_during_failing_submit_reports_cancelled() {
        let token = CancelToken::new();
        let api = Arc::new(
            ScriptedApi::failing_submit(ClassifiedError::new(ErrorKind::ServiceError).with_status(503))
                .cancelling_on_submit(token.clone()),
        );
        let events: Vec<_> = workflow(Arc::clone(&api), 40)
            .run_with_cancel(HumanizationRequest::new("a".repeat(600)), plan(), token)
            .collect()
            .await;

        assert_eq!(failure_kind(&events), ErrorKind::Cancelled);
        assert_eq!(api.submits(), 1);
        assert_eq!(api.fetches(), 0);
    }

    #[tokio::test]
    async fn cancel_during_successful_submit_skips_polling() {
        let token = CancelToken::new();
        let api = Arc::new(
            ScriptedApi::new(vec![Ok(JobStatus::ready("too late"))]).cancelling_on_submit(token.clone()),
        );
        let events: Vec<_> = workflow(Arc::clone(&api), 40)
            .run_with_cancel(HumanizationRequest::new("a".repeat(600)), plan(), token)
            .collect()
            .await;

        assert_eq!(failure_kind(&events), ErrorKind::Cancelled);
        assert_eq!(progress(&events), vec![10.0]);
        assert_eq!(api.fetches(), 0);
    }

    #[tokio::test]
    async fn cancel_before_start_makes_no_calls() {
        let api = Arc::new(ScriptedApi::new(Vec::new()));
        let token = CancelToken::new();
        token.cancel();
        let events: Vec<_> = workflow(Arc::clone(&api), 40)
            .run_with_cancel(HumanizationRequest::new("a".repeat(600)), plan(), token)
            .collect()
            .await;

        assert_eq!(events.len(), 1);
        assert_eq!(failure_kind(&events), ErrorKind::Cancelled);
        assert_eq!(api.submits(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_stream_stops_polling() {
        let api = Arc::new(ScriptedApi::new(Vec::new()));
        let workflow = HumanizationWorkflow::new(
            Arc::clone(&api),
            PollingScheduler::new(SchedulerConfig::default()),
        );

        let mut run = workflow.run(HumanizationRequest::new("a".repeat(600)), plan());
        // 10, 50, then the first poll's 51.
        for expected in [10.0, 50.0, 51.0] {
            assert_eq!(run.next().await, Some(WorkflowEvent::ProgressUpdate(expected)));
        }
        drop(run);

        tokio::time::sleep(Duration::from_secs(300)).await;
        assert_eq!(api.fetches(), 1);
    }

    #[tokio::test]
    async fn execute_runs_inline() {
        let api = Arc::new(ScriptedApi::new(vec![Ok(JobStatus::ready("inline"))]));
        let mut events = Vec::new();
        workflow(api, 40)
            .execute(
                HumanizationRequest::new("a".repeat(600)),
                plan(),
                &CancelToken::new(),
                |e| events.push(e),
            )
            .await;
        assert!(matches!(terminal(&events), WorkflowEvent::Completed(_)));
    }
}
