//! Ledger Port - Algorand node read and submit interface
//!
//! The orchestrator, synchronizer and session bootstrap only talk to
//! the ledger through this trait. The algod adapter implements it over
//! REST v2; tests substitute a mock.

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::address::Address;
use crate::domain::encoding::SuggestedParams;

/// Failure of a single ledger request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
  /// 404 from the node (unknown application, transaction or account).
  #[error("not found: {0}")]
  NotFound(String),
  /// The node refused the request (4xx other than 404), e.g. a rejected group.
  #[error("rejected by node: {0}")]
  Rejected(String),
  /// 5xx or unexpected status.
  #[error("HTTP {status}: {body}")]
  Http { status: u16, body: String },
  /// Connection, DNS or timeout failure.
  #[error("transport error: {0}")]
  Transport(String),
  /// The response body could not be decoded.
  #[error("decode error: {0}")]
  Decode(String),
}

impl LedgerError {
  /// Whether a read may be retried.
  pub const fn is_transient(&self) -> bool {
    matches!(self, Self::Transport(_) | Self::Http { status: 500..=599, .. })
  }
}

/// Balances of one account.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountInfo {
  /// Native balance in microAlgos.
  pub amount: u64,
  /// Asset id → holding.
  pub assets: HashMap<u64, u64>,
}

/// Node sync status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeStatus {
  pub last_round: u64,
}

/// Pool view of a submitted transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingInfo {
  /// Set once the transaction is in a block.
  pub confirmed_round: Option<u64>,
  /// Non-empty when the node evicted the transaction.
  pub pool_error: String,
}

/// Trait for Algorand ledger access.
#[async_trait]
pub trait LedgerClient: Send + Sync + 'static {
  /// Network parameters for building legs.
  async fn suggested_params(&self) -> Result<SuggestedParams, LedgerError>;

  /// Decoded uint64 slots of an application's global state.
  ///
  /// Keys are UTF-8 decoded; byte-slice values are skipped.
  /// Returns `NotFound` when the application does not exist.
  async fn application_global_state(&self, app_id: u64) -> Result<HashMap<String, u64>, LedgerError>;

  /// Balances of an account.
  async fn account_info(&self, address: &Address) -> Result<AccountInfo, LedgerError>;

  /// Submit concatenated signed transactions as one group.
  ///
  /// Never retried. Returns the id of the first transaction.
  async fn send_raw_group(&self, signed: &[Vec<u8>]) -> Result<String, LedgerError>;

  /// Current node status.
  async fn status(&self) -> Result<NodeStatus, LedgerError>;

  /// Pool or block status of a transaction.
  async fn pending_transaction(&self, tx_id: &str) -> Result<PendingInfo, LedgerError>;

  /// Block until the node has seen a round after `round`.
  async fn wait_for_block_after(&self, round: u64) -> Result<NodeStatus, LedgerError>;
}
