//! algod REST v2 response types.

use std::collections::HashMap;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::Deserialize;

use crate::domain::encoding::SuggestedParams;
use crate::ports::ledger::{AccountInfo, LedgerError, PendingInfo};

/// Error body returned by algod on non-2xx responses.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
  pub message: String,
}

/// `GET /v2/transactions/params`.
#[derive(Debug, Clone, Deserialize)]
pub struct ParamsResponse {
  #[serde(rename = "genesis-hash")]
  pub genesis_hash: String,
  #[serde(rename = "genesis-id")]
  pub genesis_id: String,
  #[serde(rename = "last-round")]
  pub last_round: u64,
  #[serde(rename = "min-fee")]
  pub min_fee: u64,
}

impl TryFrom<ParamsResponse> for SuggestedParams {
  type Error = LedgerError;

  fn try_from(raw: ParamsResponse) -> Result<Self, Self::Error> {
    let bytes = BASE64
      .decode(raw.genesis_hash.as_bytes())
      .map_err(|e| LedgerError::Decode(format!("genesis hash: {e}")))?;
    let genesis_hash: [u8; 32] = bytes
      .try_into()
      .map_err(|_| LedgerError::Decode("genesis hash must be 32 bytes".to_string()))?;

    Ok(Self {
      min_fee: raw.min_fee,
      genesis_id: raw.genesis_id,
      genesis_hash,
      last_round: raw.last_round,
    })
  }
}

/// `GET /v2/applications/{id}`.
#[derive(Debug, Clone, Deserialize)]
pub struct ApplicationResponse {
  pub params: ApplicationParams,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApplicationParams {
  #[serde(rename = "global-state", default)]
  pub global_state: Vec<TealKeyValue>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TealKeyValue {
  /// Base64 key bytes.
  pub key: String,
  pub value: TealValue,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TealValue {
  /// 1 = bytes, 2 = uint.
  #[serde(rename = "type")]
  pub kind: u8,
  #[serde(default)]
  pub uint: u64,
}

const TEAL_UINT: u8 = 2;

/// Decode keys and keep the integer slots.
///
/// Keys that are not valid base64 or UTF-8 are skipped.
pub fn decode_global_state(entries: &[TealKeyValue]) -> HashMap<String, u64> {
  entries
    .iter()
    .filter(|kv| kv.value.kind == TEAL_UINT)
    .filter_map(|kv| {
      let raw = BASE64.decode(kv.key.as_bytes()).ok()?;
      let name = String::from_utf8(raw).ok()?;
      Some((name, kv.value.uint))
    })
    .collect()
}

/// `GET /v2/accounts/{address}`.
#[derive(Debug, Clone, Deserialize)]
pub struct AccountResponse {
  pub amount: u64,
  #[serde(default)]
  pub assets: Vec<AssetHolding>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssetHolding {
  #[serde(rename = "asset-id")]
  pub asset_id: u64,
  pub amount: u64,
}

impl From<AccountResponse> for AccountInfo {
  fn from(raw: AccountResponse) -> Self {
    Self {
      amount: raw.amount,
      assets: raw.assets.into_iter().map(|h| (h.asset_id, h.amount)).collect(),
    }
  }
}

/// `POST /v2/transactions`.
#[derive(Debug, Clone, Deserialize)]
pub struct PostTransactionsResponse {
  #[serde(rename = "txId")]
  pub tx_id: String,
}

/// `GET /v2/status` and `/v2/status/wait-for-block-after/{round}`.
#[derive(Debug, Clone, Deserialize)]
pub struct NodeStatusResponse {
  #[serde(rename = "last-round")]
  pub last_round: u64,
}

/// `GET /v2/transactions/pending/{txid}`.
#[derive(Debug, Clone, Deserialize)]
pub struct PendingTransactionResponse {
  #[serde(rename = "confirmed-round", default)]
  pub confirmed_round: Option<u64>,
  #[serde(rename = "pool-error", default)]
  pub pool_error: String,
}

impl From<PendingTransactionResponse> for PendingInfo {
  fn from(raw: PendingTransactionResponse) -> Self {
    Self {
      confirmed_round: raw.confirmed_round.filter(|r| *r > 0),
      pool_error: raw.pool_error,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_decode_global_state_skips_bytes_values() {
    let json = r#"{"params": {"global-state": [
      {"key": "Y3VycmVudF9wcmljZQ==", "value": {"type": 2, "uint": 125000000}},
      {"key": "b3duZXI=", "value": {"type": 1, "bytes": "AAAA", "uint": 0}}
    ]}}"#;
    let app: ApplicationResponse = serde_json::from_str(json).unwrap();
    let table = decode_global_state(&app.params.global_state);

    assert_eq!(table.len(), 1);
    assert_eq!(table.get("current_price"), Some(&125_000_000));
  }

  #[test]
  fn test_application_without_global_state() {
    let app: ApplicationResponse = serde_json::from_str(r#"{"params": {}}"#).unwrap();
    assert!(decode_global_state(&app.params.global_state).is_empty());
  }

  #[test]
  fn test_params_conversion() {
    let raw = ParamsResponse {
      genesis_hash: BASE64.encode([7u8; 32]),
      genesis_id: "testnet-v1.0".to_string(),
      last_round: 10,
      min_fee: 1000,
    };
    let params = SuggestedParams::try_from(raw).unwrap();
    assert_eq!(params.genesis_hash, [7u8; 32]);
    assert_eq!(params.min_fee, 1000);
  }

  #[test]
  fn test_params_rejects_short_hash() {
    let raw = ParamsResponse {
      genesis_hash: BASE64.encode([7u8; 8]),
      genesis_id: "x".to_string(),
      last_round: 1,
      min_fee: 1000,
    };
    assert!(matches!(SuggestedParams::try_from(raw), Err(LedgerError::Decode(_))));
  }

  #[test]
  fn test_pending_round_zero_is_unconfirmed() {
    let raw: PendingTransactionResponse =
      serde_json::from_str(r#"{"confirmed-round": 0, "pool-error": ""}"#).unwrap();
    let info = PendingInfo::from(raw);
    assert_eq!(info.confirmed_round, None);
  }
}
