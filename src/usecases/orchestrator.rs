//! Transaction Orchestrator Use Case - build, sign, submit, confirm
//!
//! One operation walks `Idle → BuildingLegs → AwaitingSignature →
//! Submitting → AwaitingConfirmation → Confirmed | Failed`. Every
//! transition is broadcast as a [`TxProgress`].
//!
//! Preconditions (connected wallet, valid request, configured pool)
//! are checked before any network access. Once a group is submitted
//! the confirmation wait runs in a detached task: dropping the caller
//! does not stop it, nor the pool refresh that follows confirmation.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, oneshot, watch};
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use super::pool_sync::PoolSynchronizer;
use crate::domain::legs::{build_legs, PoolTarget};
use crate::domain::transaction::{
  AddLiquidityRequest, OperationKind, RemoveLiquidityRequest, SwapRequest, TransactionRequest,
  TransactionResult, TxErrorKind, TxProgress, TxStage,
};
use crate::domain::wallet::WalletSession;
use crate::ports::ledger::LedgerClient;
use crate::ports::wallet::{WalletConnector, WalletError};

/// Default confirmation budget in rounds.
pub const DEFAULT_CONFIRMATION_ROUNDS: u64 = 4;

/// Bounds of the confirmation wait.
#[derive(Debug, Clone, Copy)]
pub struct ConfirmationPolicy {
  /// Rounds to wait before giving up.
  pub max_rounds: u64,
  /// Wall-clock cap on the whole wait.
  pub timeout: Duration,
  /// Pause after a failed status or block-wait request.
  pub retry_delay: Duration,
}

impl Default for ConfirmationPolicy {
  fn default() -> Self {
    Self {
      max_rounds: DEFAULT_CONFIRMATION_ROUNDS,
      timeout: Duration::from_secs(30),
      retry_delay: Duration::from_millis(500),
    }
  }
}

/// Builds and drives pool operations.
pub struct TransactionOrchestrator<L: LedgerClient, W: WalletConnector> {
  ledger: Arc<L>,
  wallet: Arc<W>,
  pool: Arc<PoolSynchronizer<L>>,
  session: watch::Receiver<WalletSession>,
  policy: ConfirmationPolicy,
  progress: broadcast::Sender<TxProgress>,
}

impl<L: LedgerClient, W: WalletConnector> TransactionOrchestrator<L, W> {
  pub fn new(
    ledger: Arc<L>,
    wallet: Arc<W>,
    pool: Arc<PoolSynchronizer<L>>,
    session: watch::Receiver<WalletSession>,
    policy: ConfirmationPolicy,
  ) -> Self {
    let (progress, _) = broadcast::channel(256);
    Self {
      ledger,
      wallet,
      pool,
      session,
      policy,
      progress,
    }
  }

  /// Stage transitions of every operation.
  pub fn subscribe_progress(&self) -> broadcast::Receiver<TxProgress> {
    self.progress.subscribe()
  }

  pub async fn execute_swap(&self, request: SwapRequest) -> TransactionResult {
    self.execute(TransactionRequest::Swap(request)).await
  }

  pub async fn execute_add_liquidity(&self, request: AddLiquidityRequest) -> TransactionResult {
    self.execute(TransactionRequest::AddLiquidity(request)).await
  }

  pub async fn execute_remove_liquidity(&self, request: RemoveLiquidityRequest) -> TransactionResult {
    self.execute(TransactionRequest::RemoveLiquidity(request)).await
  }

  /// Run one operation to a terminal state. Never panics, never errors:
  /// failures come back as `TransactionResult::Failed`.
  pub async fn execute(&self, request: TransactionRequest) -> TransactionResult {
    let op_id = Uuid::new_v4();
    let kind = request.kind();
    let span = info_span!("tx", %op_id, op = %kind);

    let progress = Progress {
      op_id,
      kind,
      tx: self.progress.clone(),
    };
    self.run(request, progress).instrument(span).await
  }

  async fn run(&self, request: TransactionRequest, progress: Progress) -> TransactionResult {
    progress.emit(TxStage::Idle);

    // Preconditions: no network access before these pass.
    let Some(sender) = self.session.borrow().connected_address() else {
      return progress.fail(TxErrorKind::WalletNotConnected);
    };
    if let Err(e) = request.validate() {
      return progress.fail(e);
    }
    let app_id = self.pool.app_id();
    if app_id == 0 {
      return progress.fail(TxErrorKind::PoolNotConfigured);
    }

    progress.emit(TxStage::BuildingLegs);
    let params = match self.ledger.suggested_params().await {
      Ok(params) => params,
      Err(e) => return progress.fail(TxErrorKind::LedgerUnavailable(e.to_string())),
    };
    let legs = match build_legs(&request, sender, &params, PoolTarget::new(app_id)) {
      Ok(legs) => legs,
      Err(e) => return progress.fail(TxErrorKind::InvalidRequest(e.to_string())),
    };
    debug!(legs = legs.len(), first_valid = params.last_round, "Legs built");

    progress.emit(TxStage::AwaitingSignature);
    let signed = match self.wallet.sign_group(&legs).await {
      Ok(signed) => signed,
      Err(WalletError::UserRejected) => return progress.fail(TxErrorKind::UserRejected),
      Err(WalletError::NotConnected) => return progress.fail(TxErrorKind::WalletNotConnected),
      Err(e) => return progress.fail(TxErrorKind::SubmissionFailed(format!("signing failed: {e}"))),
    };
    if signed.len() != legs.len() {
      return progress.fail(TxErrorKind::SubmissionFailed(format!(
        "wallet returned {} signatures for {} legs",
        signed.len(),
        legs.len()
      )));
    }

    progress.emit(TxStage::Submitting);
    let tx_id = match self.ledger.send_raw_group(&signed).await {
      Ok(tx_id) => tx_id,
      Err(e) => return progress.fail(TxErrorKind::SubmissionFailed(e.to_string())),
    };
    info!(tx_id = %tx_id, "Group submitted");

    progress.emit(TxStage::AwaitingConfirmation {
      tx_id: tx_id.clone(),
    });

    // Detached: a submitted group can only be awaited, not retracted.
    let (done_tx, done_rx) = oneshot::channel();
    let ledger = Arc::clone(&self.ledger);
    let pool = Arc::clone(&self.pool);
    let policy = self.policy;
    tokio::spawn(
      async move {
        let result = match wait_for_confirmation(ledger.as_ref(), &tx_id, &policy).await {
          Ok(round) => {
            info!(tx_id = %tx_id, round, "Group confirmed");
            progress.emit(TxStage::Confirmed {
              tx_id: tx_id.clone(),
              round,
            });
            pool.refresh().await;
            TransactionResult::Confirmed {
              tx_id,
              confirmed_round: round,
            }
          }
          Err(e) => progress.fail(e),
        };
        let _ = done_tx.send(result);
      }
      .in_current_span(),
    );

    done_rx.await.unwrap_or_else(|_| {
      TransactionResult::failed(TxErrorKind::SubmissionFailed(
        "confirmation task aborted".to_string(),
      ))
    })
  }
}

/// Emits stage transitions for one operation.
struct Progress {
  op_id: Uuid,
  kind: OperationKind,
  tx: broadcast::Sender<TxProgress>,
}

impl Progress {
  fn emit(&self, stage: TxStage) {
    // No subscribers is fine.
    let _ = self.tx.send(TxProgress::new(self.op_id, self.kind, stage));
  }

  fn fail(&self, error: TxErrorKind) -> TransactionResult {
    warn!(error = %error, "Operation failed");
    self.emit(TxStage::Failed(error.clone()));
    TransactionResult::failed(error)
  }
}

/// Poll until `tx_id` is in a block, bounded by rounds and wall-clock.
///
/// Returns the confirmed round. A pool error means the node evicted
/// the group; nothing is resubmitted.
pub async fn wait_for_confirmation<L: LedgerClient + ?Sized>(
  ledger: &L,
  tx_id: &str,
  policy: &ConfirmationPolicy,
) -> Result<u64, TxErrorKind> {
  let timed_out = || TxErrorKind::ConfirmationTimeout {
    rounds: policy.max_rounds,
    tx_id: tx_id.to_string(),
  };

  let wait = async {
    let mut current = ledger.status().await.ok().map(|s| s.last_round);

    for _ in 0..policy.max_rounds {
      match ledger.pending_transaction(tx_id).await {
        Ok(info) => {
          if let Some(round) = info.confirmed_round {
            return Ok(round);
          }
          if !info.pool_error.is_empty() {
            return Err(TxErrorKind::SubmissionFailed(info.pool_error));
          }
        }
        Err(e) => warn!(error = %e, "Pending transaction lookup failed"),
      }

      current = match current {
        Some(round) => match ledger.wait_for_block_after(round).await {
          Ok(status) => Some(status.last_round.max(round + 1)),
          Err(e) => {
            warn!(error = %e, round, "Block wait failed");
            tokio::time::sleep(policy.retry_delay).await;
            Some(round + 1)
          }
        },
        None => {
          tokio::time::sleep(policy.retry_delay).await;
          ledger.status().await.ok().map(|s| s.last_round)
        }
      };
    }

    Err(timed_out())
  };

  match tokio::time::timeout(policy.timeout, wait).await {
    Ok(result) => result,
    Err(_) => Err(timed_out()),
  }
}
