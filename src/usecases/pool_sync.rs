//! Pool Synchronizer Use Case - cached view of the pool application
//!
//! Each refresh builds a whole [`PoolSnapshot`] and swaps it in.
//! Lookup failures degrade to the documented fallback state and are
//! never returned as errors. Concurrent refreshes are allowed; the one
//! that completes last wins.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

use crate::domain::pool::{FallbackReason, PoolSnapshot, PoolSource, PoolState};
use crate::ports::ledger::{LedgerClient, LedgerError};

/// Owns the cached pool snapshot.
pub struct PoolSynchronizer<L: LedgerClient> {
  ledger: Arc<L>,
  app_id: u64,
  asset_x: u64,
  asset_y: u64,
  state: watch::Sender<PoolSnapshot>,
}

impl<L: LedgerClient> PoolSynchronizer<L> {
  pub fn new(ledger: Arc<L>, app_id: u64, asset_x: u64, asset_y: u64) -> Self {
    let initial = PoolSnapshot::fallback(app_id, asset_x, asset_y, FallbackReason::NotLoaded);
    let (state, _) = watch::channel(initial);
    Self {
      ledger,
      app_id,
      asset_x,
      asset_y,
      state,
    }
  }

  pub const fn app_id(&self) -> u64 {
    self.app_id
  }

  pub fn subscribe(&self) -> watch::Receiver<PoolSnapshot> {
    self.state.subscribe()
  }

  pub fn snapshot(&self) -> PoolSnapshot {
    self.state.borrow().clone()
  }

  /// Read the application's global state and replace the cache.
  #[instrument(skip(self), fields(app_id = self.app_id))]
  pub async fn refresh(&self) -> PoolSnapshot {
    let snapshot = self.load().await;
    self.state.send_replace(snapshot.clone());
    snapshot
  }

  async fn load(&self) -> PoolSnapshot {
    if self.app_id == 0 {
      debug!("No pool application configured, using fallback state");
      return self.fallback(FallbackReason::NotConfigured);
    }

    match self.ledger.application_global_state(self.app_id).await {
      Ok(table) => {
        let state = PoolState::from_global_state(self.app_id, self.asset_x, self.asset_y, &table);
        info!(price = state.current_price, keys = table.len(), "Pool state loaded from chain");
        PoolSnapshot {
          state,
          source: PoolSource::OnChain,
        }
      }
      Err(LedgerError::NotFound(msg)) => {
        info!(detail = %msg, "Pool application not deployed, using fallback state");
        self.fallback(FallbackReason::NotDeployed)
      }
      Err(e) => {
        warn!(error = %e, "Pool application lookup failed, using fallback state");
        self.fallback(FallbackReason::Unreachable)
      }
    }
  }

  fn fallback(&self, reason: FallbackReason) -> PoolSnapshot {
    PoolSnapshot::fallback(self.app_id, self.asset_x, self.asset_y, reason)
  }
}
