//! Repository Port - local persistence
//!
//! Two concerns: the append-only transaction journal (JSONL, one file
//! per day) and the stored wallet session used for restoration.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::transaction::{OperationKind, TxErrorKind};

/// Terminal outcome of one operation, as journaled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TxRecord {
  pub op_id: Uuid,
  pub kind: OperationKind,
  pub success: bool,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub tx_id: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub confirmed_round: Option<u64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub error: Option<TxErrorKind>,
  pub timestamp: DateTime<Utc>,
}

/// Wallet session persisted across restarts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredSession {
  pub version: u32,
  /// Text form of the connected address.
  pub address: String,
  pub network: String,
  pub saved_at: DateTime<Utc>,
}

/// Trait for persistence providers.
#[async_trait]
pub trait Repository: Send + Sync + 'static {
  /// Append a terminal transaction record to today's journal.
  async fn append_transaction(&self, record: &TxRecord) -> anyhow::Result<()>;

  /// Most recent records across journal files, newest last.
  async fn recent_transactions(&self, limit: usize) -> anyhow::Result<Vec<TxRecord>>;

  /// Atomically replace the stored session.
  async fn save_session(&self, session: &StoredSession) -> anyhow::Result<()>;

  async fn load_session(&self) -> anyhow::Result<Option<StoredSession>>;

  /// Remove the stored session. No-op when absent.
  async fn clear_session(&self) -> anyhow::Result<()>;
}
