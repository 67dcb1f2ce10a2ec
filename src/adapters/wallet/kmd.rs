//! kmd Wallet Connector - key-management daemon over REST v1
//!
//! Holds at most one wallet handle and one account. Every connect and
//! every signature goes through the operator approval first. A
//! keepalive loop renews the handle; when renewal fails the session is
//! dropped and a disconnect event is broadcast.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, instrument, warn};

use super::types::{
  HandleRequest, InitHandleRequest, InitHandleResponse, KmdErrorBody, ListKeysResponse,
  ListWalletsResponse, SignTransactionRequest, SignTransactionResponse,
};
use crate::domain::address::Address;
use crate::domain::encoding::Transaction;
use crate::ports::wallet::{ApprovalRequest, SignatureApproval, WalletConnector, WalletError};

/// Header carrying the kmd API token.
pub const TOKEN_HEADER: &str = "X-KMD-API-Token";

/// kmd connection settings.
#[derive(Debug, Clone)]
pub struct KmdConfig {
  pub base_url: String,
  pub token: String,
  /// Wallet to open; empty selects the first wallet kmd lists.
  pub wallet_name: String,
  pub wallet_password: String,
  pub timeout: Duration,
  /// Handle renewal cadence.
  pub keepalive: Duration,
}

#[derive(Debug, Clone)]
struct KmdSession {
  handle: String,
  address: Address,
}

/// Wallet connector backed by a kmd daemon.
pub struct KmdWallet {
  http: Client,
  config: KmdConfig,
  approval: Arc<dyn SignatureApproval>,
  session: Mutex<Option<KmdSession>>,
  disconnect_tx: broadcast::Sender<()>,
}

impl KmdWallet {
  pub fn new(config: KmdConfig, approval: Arc<dyn SignatureApproval>) -> Result<Self, WalletError> {
    let http = Client::builder()
      .timeout(config.timeout)
      .build()
      .map_err(|e| WalletError::Unavailable(format!("failed to build HTTP client: {e}")))?;
    let (disconnect_tx, _) = broadcast::channel(8);

    Ok(Self {
      http,
      config,
      approval,
      session: Mutex::new(None),
      disconnect_tx,
    })
  }

  async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T, WalletError> {
    let url = format!("{}{}", self.config.base_url.trim_end_matches('/'), path);
    let response = self
      .http
      .post(&url)
      .header(TOKEN_HEADER, &self.config.token)
      .json(body)
      .send()
      .await
      .map_err(|e| WalletError::Unavailable(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
      let text = response.text().await.unwrap_or_default();
      let message = serde_json::from_str::<KmdErrorBody>(&text)
        .map(|b| b.message)
        .unwrap_or(text);
      return Err(match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
          WalletError::Unavailable(format!("kmd refused credentials: {message}"))
        }
        s if s.is_server_error() => WalletError::Unavailable(format!("kmd {s}: {message}")),
        s => WalletError::Protocol(format!("kmd {s}: {message}")),
      });
    }

    response
      .json::<T>()
      .await
      .map_err(|e| WalletError::Protocol(e.to_string()))
  }

  async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, WalletError> {
    let url = format!("{}{}", self.config.base_url.trim_end_matches('/'), path);
    let response = self
      .http
      .get(&url)
      .header(TOKEN_HEADER, &self.config.token)
      .send()
      .await
      .map_err(|e| WalletError::Unavailable(e.to_string()))?;

    if !response.status().is_success() {
      return Err(WalletError::Unavailable(format!("kmd {}", response.status())));
    }

    response
      .json::<T>()
      .await
      .map_err(|e| WalletError::Protocol(e.to_string()))
  }

  /// Open a wallet handle on the configured wallet.
  async fn open_handle(&self) -> Result<String, WalletError> {
    let listed: ListWalletsResponse = self.get("/v1/wallets").await?;
    let wallet = listed
      .wallets
      .iter()
      .find(|w| self.config.wallet_name.is_empty() || w.name == self.config.wallet_name)
      .ok_or_else(|| WalletError::Unavailable(format!("kmd wallet {:?} not found", self.config.wallet_name)))?;

    let init: InitHandleResponse = self
      .post(
        "/v1/wallet/init",
        &InitHandleRequest {
          wallet_id: &wallet.id,
          wallet_password: &self.config.wallet_password,
        },
      )
      .await?;

    debug!(wallet = %wallet.name, "Opened kmd wallet handle");
    Ok(init.wallet_handle_token)
  }

  async fn list_addresses(&self, handle: &str) -> Result<Vec<Address>, WalletError> {
    let keys: ListKeysResponse = self
      .post("/v1/key/list", &HandleRequest { wallet_handle_token: handle })
      .await?;

    keys
      .addresses
      .iter()
      .map(|a| a.parse::<Address>().map_err(|e| WalletError::Protocol(format!("bad address {a}: {e}"))))
      .collect()
  }

  async fn release(&self, handle: &str) {
    let result: Result<serde_json::Value, _> = self
      .post("/v1/wallet/release", &HandleRequest { wallet_handle_token: handle })
      .await;
    if let Err(e) = result {
      debug!(error = %e, "Failed to release kmd handle");
    }
  }

  /// Renew the wallet handle every `keepalive` until shutdown.
  ///
  /// A failed renewal drops the session and emits a disconnect event.
  #[instrument(skip(self, shutdown_rx))]
  pub async fn run_keepalive(self: Arc<Self>, mut shutdown_rx: broadcast::Receiver<()>) {
    let mut interval = tokio::time::interval(self.config.keepalive);
    interval.tick().await;

    loop {
      tokio::select! {
        _ = shutdown_rx.recv() => {
          info!("kmd keepalive shutting down");
          return;
        }
        _ = interval.tick() => {}
      }

      let handle = match self.session.lock().await.as_ref() {
        Some(s) => s.handle.clone(),
        None => continue,
      };

      let renewed: Result<serde_json::Value, _> = self
        .post("/v1/wallet/renew", &HandleRequest { wallet_handle_token: &handle })
        .await;

      if let Err(e) = renewed {
        warn!(error = %e, "kmd handle renewal failed, dropping wallet session");
        let mut guard = self.session.lock().await;
        if guard.as_ref().is_some_and(|s| s.handle == handle) {
          *guard = None;
          drop(guard);
          let _ = self.disconnect_tx.send(());
        }
      }
    }
  }
}

#[async_trait]
impl WalletConnector for KmdWallet {
  #[instrument(skip(self))]
  async fn connect(&self) -> Result<Address, WalletError> {
    let handle = self.open_handle().await?;
    let address = match self.list_addresses(&handle).await?.first() {
      Some(a) => *a,
      None => {
        self.release(&handle).await;
        return Err(WalletError::Protocol("kmd wallet holds no keys".to_string()));
      }
    };

    if !self.approval.approve(&ApprovalRequest::Connect { address }).await {
      self.release(&handle).await;
      return Err(WalletError::UserRejected);
    }

    let previous = self.session.lock().await.replace(KmdSession { handle, address });
    if let Some(old) = previous {
      self.release(&old.handle).await;
    }

    info!(address = %address.short(), "kmd account connected");
    Ok(address)
  }

  async fn reconnect(&self, address: &Address) -> Result<Option<Address>, WalletError> {
    let handle = self.open_handle().await?;
    if !self.list_addresses(&handle).await?.contains(address) {
      self.release(&handle).await;
      return Ok(None);
    }

    let previous = self.session.lock().await.replace(KmdSession {
      handle,
      address: *address,
    });
    if let Some(old) = previous {
      self.release(&old.handle).await;
    }
    Ok(Some(*address))
  }

  async fn disconnect(&self) -> Result<(), WalletError> {
    let previous = self.session.lock().await.take();
    if let Some(old) = previous {
      self.release(&old.handle).await;
    }
    Ok(())
  }

  #[instrument(skip(self, group), fields(legs = group.len()))]
  async fn sign_group(&self, group: &[Transaction]) -> Result<Vec<Vec<u8>>, WalletError> {
    let session = self.session.lock().await.clone().ok_or(WalletError::NotConnected)?;

    if group.iter().any(|leg| leg.sender != session.address) {
      return Err(WalletError::Protocol("group contains legs from another sender".to_string()));
    }

    let legs = group.iter().map(Transaction::describe).collect();
    if !self.approval.approve(&ApprovalRequest::Sign { legs }).await {
      return Err(WalletError::UserRejected);
    }

    let mut signed = Vec::with_capacity(group.len());
    for leg in group {
      let unsigned = leg.encode().map_err(|e| WalletError::Protocol(e.to_string()))?;
      let response: SignTransactionResponse = self
        .post(
          "/v1/transaction/sign",
          &SignTransactionRequest {
            wallet_handle_token: &session.handle,
            wallet_password: &self.config.wallet_password,
            transaction: BASE64.encode(unsigned),
          },
        )
        .await?;
      let blob = BASE64
        .decode(response.signed_transaction.as_bytes())
        .map_err(|e| WalletError::Protocol(format!("signed transaction: {e}")))?;
      signed.push(blob);
    }

    Ok(signed)
  }

  fn disconnect_events(&self) -> broadcast::Receiver<()> {
    self.disconnect_tx.subscribe()
  }
}
