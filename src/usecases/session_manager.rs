//! Session Manager Use Case - Wallet session bootstrap and upkeep
//!
//! Sole owner of the [`WalletSession`]. Other components only read it
//! through a `watch` receiver. Mutated by:
//! - `connect` (interactive, one balance refresh on success)
//! - `disconnect` (operator- or wallet-originated, idempotent)
//! - `refresh_balance` (timer or explicit)

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use thiserror::Error;
use tokio::sync::{broadcast, watch};
use tracing::{debug, info, instrument, warn};

use crate::domain::address::Address;
use crate::domain::wallet::WalletSession;
use crate::ports::ledger::{LedgerClient, LedgerError};
use crate::ports::repository::{Repository, StoredSession};
use crate::ports::wallet::{WalletConnector, WalletError};

/// Stored session format version.
const SESSION_VERSION: u32 = 1;

/// Caller-facing session failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
  #[error("Connection request rejected by user")]
  UserRejected,
  #[error("wallet error: {0}")]
  Wallet(WalletError),
  #[error("ledger error: {0}")]
  Ledger(LedgerError),
}

impl From<WalletError> for SessionError {
  fn from(e: WalletError) -> Self {
    match e {
      WalletError::UserRejected => Self::UserRejected,
      other => Self::Wallet(other),
    }
  }
}

/// Owns the wallet session.
pub struct SessionManager<L: LedgerClient, W: WalletConnector, R: Repository> {
  ledger: Arc<L>,
  wallet: Arc<W>,
  repo: Arc<R>,
  /// Network tag the stored session belongs to.
  network: String,
  state: watch::Sender<WalletSession>,
}

impl<L: LedgerClient, W: WalletConnector, R: Repository> SessionManager<L, W, R> {
  pub fn new(ledger: Arc<L>, wallet: Arc<W>, repo: Arc<R>, network: impl Into<String>) -> Self {
    let (state, _) = watch::channel(WalletSession::default());
    Self {
      ledger,
      wallet,
      repo,
      network: network.into(),
      state,
    }
  }

  /// Read handle on the session.
  pub fn subscribe(&self) -> watch::Receiver<WalletSession> {
    self.state.subscribe()
  }

  /// Copy of the current session.
  pub fn snapshot(&self) -> WalletSession {
    self.state.borrow().clone()
  }

  /// Restore a stored session without prompting.
  ///
  /// Every failure is logged and leaves the session disconnected.
  #[instrument(skip(self))]
  pub async fn initialize(&self) {
    let stored = match self.repo.load_session().await {
      Ok(Some(stored)) => stored,
      Ok(None) => {
        debug!("No stored wallet session");
        return;
      }
      Err(e) => {
        warn!(error = %e, "Failed to read stored wallet session");
        return;
      }
    };

    if stored.network != self.network {
      info!(stored = %stored.network, current = %self.network, "Stored session belongs to another network, discarding");
      self.forget_stored().await;
      return;
    }

    let address: Address = match stored.address.parse() {
      Ok(address) => address,
      Err(e) => {
        warn!(error = %e, "Stored session address is invalid, discarding");
        self.forget_stored().await;
        return;
      }
    };

    match self.wallet.reconnect(&address).await {
      Ok(Some(address)) => {
        self.state.send_replace(WalletSession::connected(address));
        info!(address = %address.short(), "Wallet session restored");
        if let Err(e) = self.refresh_balance().await {
          warn!(error = %e, "Initial balance refresh failed");
        }
      }
      Ok(None) => {
        info!(address = %address.short(), "Wallet no longer holds stored account");
        self.forget_stored().await;
      }
      Err(e) => warn!(error = %e, "Wallet session restoration failed"),
    }
  }

  /// Interactive connect. Triggers exactly one balance refresh on success.
  ///
  /// On rejection the session is left untouched.
  #[instrument(skip(self))]
  pub async fn connect(&self) -> Result<Address, SessionError> {
    let address = self.wallet.connect().await?;

    self.state.send_replace(WalletSession::connected(address));
    info!(address = %address.short(), "Wallet connected");

    let stored = StoredSession {
      version: SESSION_VERSION,
      address: address.to_string(),
      network: self.network.clone(),
      saved_at: Utc::now(),
    };
    if let Err(e) = self.repo.save_session(&stored).await {
      warn!(error = %e, "Failed to persist wallet session");
    }

    if let Err(e) = self.refresh_balance().await {
      warn!(error = %e, "Balance refresh after connect failed");
    }

    Ok(address)
  }

  /// Reset to the disconnected defaults. Idempotent.
  #[instrument(skip(self))]
  pub async fn disconnect(&self) {
    let was_connected = self.state.borrow().is_connected;

    if was_connected {
      if let Err(e) = self.wallet.disconnect().await {
        warn!(error = %e, "Wallet disconnect failed");
      }
      self.forget_stored().await;
    }

    let reset = self.state.send_if_modified(|session| {
      if *session == WalletSession::default() {
        false
      } else {
        *session = WalletSession::default();
        true
      }
    });
    if reset {
      info!("Wallet disconnected");
    }
  }

  /// Replace balances of the connected account. No-op when disconnected.
  pub async fn refresh_balance(&self) -> Result<(), SessionError> {
    let Some(address) = self.state.borrow().connected_address() else {
      return Ok(());
    };

    let info = self
      .ledger
      .account_info(&address)
      .await
      .map_err(SessionError::Ledger)?;

    // The account may have been disconnected while the request was in flight.
    self.state.send_if_modified(|session| {
      if session.connected_address() != Some(address) {
        return false;
      }
      session.balance = info.amount;
      session.asset_balances = info.assets;
      true
    });
    debug!(balance = info.amount, "Balance refreshed");
    Ok(())
  }

  /// Force a disconnect whenever the wallet reports one.
  #[instrument(skip(self, shutdown_rx))]
  pub async fn watch_disconnects(self: Arc<Self>, mut shutdown_rx: broadcast::Receiver<()>) {
    let mut events = self.wallet.disconnect_events();
    loop {
      tokio::select! {
        _ = shutdown_rx.recv() => return,
        event = events.recv() => match event {
          Ok(()) | Err(broadcast::error::RecvError::Lagged(_)) => {
            info!("Wallet reported disconnect");
            self.disconnect().await;
          }
          Err(broadcast::error::RecvError::Closed) => return,
        },
      }
    }
  }

  /// Refresh the balance on a fixed cadence until shutdown.
  #[instrument(skip(self, shutdown_rx))]
  pub async fn run_balance_refresh(self: Arc<Self>, every: Duration, mut shutdown_rx: broadcast::Receiver<()>) {
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    ticker.tick().await;

    loop {
      tokio::select! {
        _ = shutdown_rx.recv() => return,
        _ = ticker.tick() => {}
      }
      if let Err(e) = self.refresh_balance().await {
        warn!(error = %e, "Periodic balance refresh failed");
      }
    }
  }

  async fn forget_stored(&self) {
    if let Err(e) = self.repo.clear_session().await {
      warn!(error = %e, "Failed to clear stored wallet session");
    }
  }
}
