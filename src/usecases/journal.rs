//! Transaction Journal Use Case - persist terminal outcomes
//!
//! Listens to orchestrator progress and appends one [`TxRecord`] per
//! operation that reaches `Confirmed` or `Failed`. Journal write
//! failures are logged and never reach the operator's result.

use std::sync::Arc;

use anyhow::Result;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::domain::transaction::{TxProgress, TxStage};
use crate::ports::repository::{Repository, TxRecord};

/// Map a progress event to its journal record, if terminal.
pub fn record_for(progress: &TxProgress) -> Option<TxRecord> {
  let (success, tx_id, confirmed_round, error) = match &progress.stage {
    TxStage::Confirmed { tx_id, round } => (true, Some(tx_id.clone()), Some(*round), None),
    TxStage::Failed(e) => (false, e.tx_id().map(str::to_string), None, Some(e.clone())),
    _ => return None,
  };
  Some(TxRecord {
    op_id: progress.op_id,
    kind: progress.kind,
    success,
    tx_id,
    confirmed_round,
    error,
    timestamp: progress.at,
  })
}

/// Appends terminal operations to the repository.
pub struct TransactionJournal<R: Repository> {
  repo: Arc<R>,
}

impl<R: Repository> TransactionJournal<R> {
  pub const fn new(repo: Arc<R>) -> Self {
    Self { repo }
  }

  /// Persist one event if it is terminal. Returns whether a record was written.
  pub async fn observe(&self, progress: &TxProgress) -> bool {
    let Some(record) = record_for(progress) else {
      return false;
    };
    match self.repo.append_transaction(&record).await {
      Ok(()) => {
        debug!(op_id = %record.op_id, success = record.success, "Journaled operation");
        true
      }
      Err(e) => {
        warn!(op_id = %record.op_id, error = %e, "Failed to journal operation");
        false
      }
    }
  }

  /// Newest-last slice of the journal.
  pub async fn recent(&self, limit: usize) -> Result<Vec<TxRecord>> {
    self.repo.recent_transactions(limit).await
  }

  /// Consume progress until shutdown or until the orchestrator goes away.
  pub async fn run(
    self: Arc<Self>,
    mut progress_rx: broadcast::Receiver<TxProgress>,
    mut shutdown_rx: broadcast::Receiver<()>,
  ) {
    loop {
      tokio::select! {
        _ = shutdown_rx.recv() => {
          info!("Journal shutting down");
          return;
        }
        event = progress_rx.recv() => match event {
          Ok(progress) => {
            self.observe(&progress).await;
          }
          Err(broadcast::error::RecvError::Lagged(n)) => {
            warn!(skipped = n, "Journal lagged behind progress events");
          }
          Err(broadcast::error::RecvError::Closed) => return,
        },
      }
    }
  }
}
