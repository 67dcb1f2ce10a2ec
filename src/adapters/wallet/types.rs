//! kmd REST v1 request/response types.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
pub struct ListWalletsResponse {
  #[serde(default)]
  pub wallets: Vec<KmdWalletInfo>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct KmdWalletInfo {
  pub id: String,
  pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct InitHandleRequest<'a> {
  pub wallet_id: &'a str,
  pub wallet_password: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InitHandleResponse {
  pub wallet_handle_token: String,
}

/// Body of renew, release and key listing.
#[derive(Debug, Clone, Serialize)]
pub struct HandleRequest<'a> {
  pub wallet_handle_token: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListKeysResponse {
  #[serde(default)]
  pub addresses: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SignTransactionRequest<'a> {
  pub wallet_handle_token: &'a str,
  pub wallet_password: &'a str,
  /// Base64 canonical msgpack of the unsigned transaction.
  pub transaction: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SignTransactionResponse {
  /// Base64 msgpack of the signed transaction.
  pub signed_transaction: String,
}

/// kmd error envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct KmdErrorBody {
  #[serde(default)]
  pub message: String,
}
