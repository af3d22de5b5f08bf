//! Caller-owned credit ledger and its serialized update queue.
//!
//! The workflow never touches a [`UsageLedger`] itself. It proposes a
//! [`LedgerDelta`] and the owner applies it. When several jobs run at once,
//! [`LedgerQueue`] owns the ledger inside a single task and applies deltas
//! in arrival order, so concurrent debits are never lost.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::debug;
use uuid::Uuid;

use crate::api::HumanizationRequest;
use crate::credits::PlanContext;
use crate::state_machine::JobResult;

/// Characters of output kept in a history preview.
const PREVIEW_CHARS: usize = 100;

/// One completed job as recorded in the usage history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: Uuid,
    pub name: String,
    pub date: NaiveDate,
    pub preview: String,
    pub original: String,
    pub humanized: String,
    pub credits: u64,
    pub readability: String,
    pub purpose: String,
    pub created_at: DateTime<Utc>,
}

impl HistoryEntry {
    pub fn new(request: &HumanizationRequest, result: &JobResult, created_at: DateTime<Utc>) -> Self {
        let date = created_at.date_naive();
        let preview: String = result.output.chars().take(PREVIEW_CHARS).collect();
        Self {
            id: Uuid::new_v4(),
            name: format!("Text Humanization {}", date.format("%Y-%m-%d")),
            date,
            preview: format!("{preview}..."),
            original: request.text.clone(),
            humanized: result.output.clone(),
            credits: result.cost_credits,
            readability: result.metadata.readability.clone(),
            purpose: result.metadata.purpose.clone(),
            created_at,
        }
    }
}

/// A proposed debit plus the history entry that goes with it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerDelta {
    pub credits: u64,
    pub entry: HistoryEntry,
}

impl LedgerDelta {
    pub fn for_result(request: &HumanizationRequest, result: &JobResult) -> Self {
        Self {
            credits: result.cost_credits,
            entry: HistoryEntry::new(request, result, Utc::now()),
        }
    }
}

/// Credit balance and usage history, most recent entry first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageLedger {
    pub total_credits: u64,
    pub used_credits: u64,
    pub history: Vec<HistoryEntry>,
}

impl UsageLedger {
    pub fn new(total_credits: u64, used_credits: u64) -> Self {
        Self {
            total_credits,
            used_credits,
            history: Vec::new(),
        }
    }

    pub fn remaining(&self) -> u64 {
        self.total_credits.saturating_sub(self.used_credits)
    }

    pub fn apply(&mut self, delta: LedgerDelta) {
        self.used_credits = self.used_credits.saturating_add(delta.credits);
        self.history.insert(0, delta.entry);
    }

    /// Plan context for validating the next request against this balance.
    pub fn plan_context(&self, character_limit: usize) -> PlanContext {
        PlanContext {
            character_limit,
            credits_remaining: self.remaining(),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("ledger queue has shut down")]
pub struct LedgerClosed;

enum LedgerCommand {
    Apply {
        delta: LedgerDelta,
        reply: oneshot::Sender<UsageLedger>,
    },
    Snapshot {
        reply: oneshot::Sender<UsageLedger>,
    },
}

/// Single-writer queue in front of a [`UsageLedger`].
///
/// Cloning the queue is cheap; every clone feeds the same task.
#[derive(Debug, Clone)]
pub struct LedgerQueue {
    sender: mpsc::Sender<LedgerCommand>,
}

impl std::fmt::Debug for LedgerCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LedgerCommand::Apply { delta, .. } => write!(f, "Apply({} credits)", delta.credits),
            LedgerCommand::Snapshot { .. } => write!(f, "Snapshot"),
        }
    }
}

impl LedgerQueue {
    /// Move `ledger` into a background task and return the queue feeding it.
    /// The task ends when every clone of the queue has been dropped.
    pub fn spawn(ledger: UsageLedger) -> (Self, JoinHandle<UsageLedger>) {
        let (sender, mut receiver) = mpsc::channel::<LedgerCommand>(32);

        let handle = tokio::spawn(async move {
            let mut ledger = ledger;
            while let Some(command) = receiver.recv().await {
                match command {
                    LedgerCommand::Apply { delta, reply } => {
                        debug!(credits = delta.credits, "applying ledger delta");
                        ledger.apply(delta);
                        let _ = reply.send(ledger.clone());
                    }
                    LedgerCommand::Snapshot { reply } => {
                        let _ = reply.send(ledger.clone());
                    }
                }
            }
            ledger
        });

        (Self { sender }, handle)
    }

    /// Apply `delta` and return the ledger as it stands afterwards.
    pub async fn apply(&self, delta: LedgerDelta) -> Result<UsageLedger, LedgerClosed> {
        let (reply, response) = oneshot::channel();
        self.sender
            .send(LedgerCommand::Apply { delta, reply })
            .await
            .map_err(|_| LedgerClosed)?;
        response.await.map_err(|_| LedgerClosed)
    }

    pub async fn snapshot(&self) -> Result<UsageLedger, LedgerClosed> {
        let (reply, response) = oneshot::channel();
        self.sender
            .send(LedgerCommand::Snapshot { reply })
            .await
            .map_err(|_| LedgerClosed)?;
        response.await.map_err(|_| LedgerClosed)
    }
}
