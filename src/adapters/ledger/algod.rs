//! algod-backed implementation of the ledger port.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, instrument};

use super::client::AlgodHttp;
use super::types::{
  decode_global_state, AccountResponse, ApplicationResponse, NodeStatusResponse, ParamsResponse,
  PendingTransactionResponse, PostTransactionsResponse,
};
use crate::domain::address::Address;
use crate::domain::encoding::SuggestedParams;
use crate::ports::ledger::{AccountInfo, LedgerClient, LedgerError, NodeStatus, PendingInfo};

/// Long-poll timeout for `wait-for-block-after`.
const BLOCK_WAIT_TIMEOUT: Duration = Duration::from_secs(30);

/// Ledger client over algod REST v2.
pub struct AlgodLedger {
  http: AlgodHttp,
}

impl AlgodLedger {
  pub const fn new(http: AlgodHttp) -> Self {
    Self { http }
  }
}

#[async_trait]
impl LedgerClient for AlgodLedger {
  async fn suggested_params(&self) -> Result<SuggestedParams, LedgerError> {
    let raw: ParamsResponse = self.http.get_json("/v2/transactions/params").await?;
    SuggestedParams::try_from(raw)
  }

  #[instrument(skip(self))]
  async fn application_global_state(&self, app_id: u64) -> Result<HashMap<String, u64>, LedgerError> {
    let app: ApplicationResponse = self.http.get_json(&format!("/v2/applications/{app_id}")).await?;
    let table = decode_global_state(&app.params.global_state);
    debug!(keys = table.len(), "Decoded application global state");
    Ok(table)
  }

  async fn account_info(&self, address: &Address) -> Result<AccountInfo, LedgerError> {
    let raw: AccountResponse = self.http.get_json(&format!("/v2/accounts/{address}")).await?;
    Ok(raw.into())
  }

  #[instrument(skip(self, signed), fields(legs = signed.len()))]
  async fn send_raw_group(&self, signed: &[Vec<u8>]) -> Result<String, LedgerError> {
    let body = signed.concat();
    let response: PostTransactionsResponse = self.http.post_raw("/v2/transactions", body).await?;
    Ok(response.tx_id)
  }

  async fn status(&self) -> Result<NodeStatus, LedgerError> {
    let raw: NodeStatusResponse = self.http.get_json("/v2/status").await?;
    Ok(NodeStatus {
      last_round: raw.last_round,
    })
  }

  async fn pending_transaction(&self, tx_id: &str) -> Result<PendingInfo, LedgerError> {
    let raw: PendingTransactionResponse = self
      .http
      .get_json(&format!("/v2/transactions/pending/{tx_id}"))
      .await?;
    Ok(raw.into())
  }

  async fn wait_for_block_after(&self, round: u64) -> Result<NodeStatus, LedgerError> {
    let raw: NodeStatusResponse = self
      .http
      .get_json_with_timeout(&format!("/v2/status/wait-for-block-after/{round}"), BLOCK_WAIT_TIMEOUT)
      .await?;
    Ok(NodeStatus {
      last_round: raw.last_round,
    })
  }
}
