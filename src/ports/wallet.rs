//! Wallet Port - account connection and group signing
//!
//! A wallet connector hands out at most one account and signs whole
//! groups. Signing is interactive: the connector asks a
//! [`SignatureApproval`] before producing signatures.

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::broadcast;

use crate::domain::address::Address;
use crate::domain::encoding::Transaction;

/// Wallet failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WalletError {
  /// The operator declined the connection or signature.
  #[error("request rejected by user")]
  UserRejected,
  /// No account is connected.
  #[error("no wallet account connected")]
  NotConnected,
  /// The wallet service could not be reached.
  #[error("wallet unavailable: {0}")]
  Unavailable(String),
  /// The wallet answered with something unexpected.
  #[error("wallet protocol error: {0}")]
  Protocol(String),
}

/// What the operator is asked to approve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApprovalRequest {
  /// Hand an account to this client.
  Connect { address: Address },
  /// Sign a group of legs.
  Sign {
    /// One human-readable line per leg.
    legs: Vec<String>,
  },
}

/// Operator consent, shown before a wallet acts.
#[async_trait]
pub trait SignatureApproval: Send + Sync + 'static {
  /// `true` when the operator approves.
  async fn approve(&self, request: &ApprovalRequest) -> bool;
}

/// Trait for wallet connectors.
#[async_trait]
pub trait WalletConnector: Send + Sync + 'static {
  /// Interactive connect. Returns the single account handed out.
  async fn connect(&self) -> Result<Address, WalletError>;

  /// Non-interactive check that `address` is still available.
  ///
  /// `Ok(None)` when the wallet no longer holds that account.
  async fn reconnect(&self, address: &Address) -> Result<Option<Address>, WalletError>;

  /// Release the wallet session. Idempotent.
  async fn disconnect(&self) -> Result<(), WalletError>;

  /// Interactively sign every leg of `group`, returning signed blobs in order.
  async fn sign_group(&self, group: &[Transaction]) -> Result<Vec<Vec<u8>>, WalletError>;

  /// Wallet-originated disconnect notifications.
  fn disconnect_events(&self) -> broadcast::Receiver<()>;
}
