//! Integration Tests - End-to-end Client Component Testing
//!
//! Tests the interaction between usecases, ports, and mock adapters.
//! Uses mockall for trait mocking and tokio::test for async tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use mockall::mock;
use mockall::predicate::*;
use tokio::sync::{broadcast, watch};
use uuid::Uuid;

use seltra_client::adapters::persistence::RepositoryImpl;
use seltra_client::domain::address::Address;
use seltra_client::domain::encoding::{SuggestedParams, Transaction, TxType};
use seltra_client::domain::market::{Connectivity, PricePoint, Scenario};
use seltra_client::domain::pool::{FallbackReason, PoolSource, PoolState};
use seltra_client::domain::transaction::{
  OperationKind, RemoveLiquidityRequest, SwapRequest, TransactionResult, TxErrorKind, TxProgress,
  TxStage,
};
use seltra_client::domain::wallet::WalletSession;
use seltra_client::ports::ledger::{AccountInfo, LedgerClient, LedgerError, NodeStatus, PendingInfo};
use seltra_client::ports::market_api::{
  MarketApi, MarketApiError, MarketMetrics, MarketStatus, WalletsOverview,
};
use seltra_client::ports::repository::{Repository, StoredSession, TxRecord};
use seltra_client::ports::wallet::{WalletConnector, WalletError};
use seltra_client::usecases::journal::TransactionJournal;
use seltra_client::usecases::market_poller::MarketPoller;
use seltra_client::usecases::orchestrator::{ConfirmationPolicy, TransactionOrchestrator};
use seltra_client::usecases::pool_sync::PoolSynchronizer;
use seltra_client::usecases::session_manager::{SessionError, SessionManager};

// ---- Mock Definitions ----

mock! {
  pub Ledger {}

  #[async_trait::async_trait]
  impl LedgerClient for Ledger {
    async fn suggested_params(&self) -> Result<SuggestedParams, LedgerError>;
    async fn application_global_state(&self, app_id: u64) -> Result<HashMap<String, u64>, LedgerError>;
    async fn account_info(&self, address: &Address) -> Result<AccountInfo, LedgerError>;
    async fn send_raw_group(&self, signed: &[Vec<u8>]) -> Result<String, LedgerError>;
    async fn status(&self) -> Result<NodeStatus, LedgerError>;
    async fn pending_transaction(&self, tx_id: &str) -> Result<PendingInfo, LedgerError>;
    async fn wait_for_block_after(&self, round: u64) -> Result<NodeStatus, LedgerError>;
  }
}

mock! {
  pub Wallet {}

  #[async_trait::async_trait]
  impl WalletConnector for Wallet {
    async fn connect(&self) -> Result<Address, WalletError>;
    async fn reconnect(&self, address: &Address) -> Result<Option<Address>, WalletError>;
    async fn disconnect(&self) -> Result<(), WalletError>;
    async fn sign_group(&self, group: &[Transaction]) -> Result<Vec<Vec<u8>>, WalletError>;
    fn disconnect_events(&self) -> broadcast::Receiver<()>;
  }
}

mock! {
  pub Market {}

  #[async_trait::async_trait]
  impl MarketApi for Market {
    async fn health(&self) -> Result<String, MarketApiError>;
    async fn status(&self) -> Result<MarketStatus, MarketApiError>;
    async fn metrics(&self) -> Result<MarketMetrics, MarketApiError>;
    async fn history(&self, window: u32) -> Result<Vec<PricePoint>, MarketApiError>;
    async fn wallets(&self) -> Result<WalletsOverview, MarketApiError>;
    async fn pending_transactions(
      &self,
    ) -> Result<Vec<seltra_client::domain::market::PendingSimTransaction>, MarketApiError>;
    async fn set_scenario(&self, scenario: Scenario) -> Result<(), MarketApiError>;
    async fn set_volatility_regime(
      &self,
      regime: seltra_client::domain::market::VolatilityRegime,
    ) -> Result<(), MarketApiError>;
    async fn add_price_shock(
      &self,
      shock: seltra_client::domain::market::PriceShock,
    ) -> Result<(), MarketApiError>;
    async fn set_trading_pattern(
      &self,
      pattern: seltra_client::domain::market::TradingPattern,
    ) -> Result<(), MarketApiError>;
    async fn trigger_demo_scenario(
      &self,
      demo: seltra_client::domain::market::DemoScenario,
    ) -> Result<(), MarketApiError>;
  }
}

mock! {
  pub Repo {}

  #[async_trait::async_trait]
  impl Repository for Repo {
    async fn append_transaction(&self, record: &TxRecord) -> anyhow::Result<()>;
    async fn recent_transactions(&self, limit: usize) -> anyhow::Result<Vec<TxRecord>>;
    async fn save_session(&self, session: &StoredSession) -> anyhow::Result<()>;
    async fn load_session(&self) -> anyhow::Result<Option<StoredSession>>;
    async fn clear_session(&self) -> anyhow::Result<()>;
  }
}

// ---- Fixtures ----

const APP_ID: u64 = 1_001;
const ASSET_Y: u64 = 7;

fn alice() -> Address {
  Address::new([0xA1; 32])
}

fn params() -> SuggestedParams {
  SuggestedParams {
    min_fee: 1_000,
    genesis_id: "dockernet-v1".to_string(),
    genesis_hash: [9; 32],
    last_round: 100,
  }
}

fn swap_native_in() -> SwapRequest {
  SwapRequest {
    asset_in: 0,
    asset_out: ASSET_Y,
    amount_in: 1_000_000,
    min_amount_out: 990_000,
    deadline: 1_900_000_000,
  }
}

fn fast_policy() -> ConfirmationPolicy {
  ConfirmationPolicy {
    max_rounds: 4,
    timeout: Duration::from_secs(5),
    retry_delay: Duration::from_millis(1),
  }
}

fn orchestrator(
  ledger: MockLedger,
  wallet: MockWallet,
  session: WalletSession,
) -> (
  TransactionOrchestrator<MockLedger, MockWallet>,
  Arc<PoolSynchronizer<MockLedger>>,
  watch::Sender<WalletSession>,
) {
  let ledger = Arc::new(ledger);
  let pool = Arc::new(PoolSynchronizer::new(Arc::clone(&ledger), APP_ID, 0, ASSET_Y));
  let (session_tx, session_rx) = watch::channel(session);
  let orch = TransactionOrchestrator::new(ledger, Arc::new(wallet), Arc::clone(&pool), session_rx, fast_policy());
  (orch, pool, session_tx)
}

fn status(scenario: &str, price: f64) -> MarketStatus {
  MarketStatus {
    running: true,
    current_price: price,
    current_volatility: 0.02,
    scenario: scenario.to_string(),
    regime: "medium".to_string(),
  }
}

// ---- Pool synchronizer ----

#[tokio::test]
async fn test_failed_lookup_yields_documented_fallback() {
  let mut ledger = MockLedger::new();
  ledger
    .expect_application_global_state()
    .with(eq(APP_ID))
    .times(2)
    .returning(|_| Err(LedgerError::Transport("connection refused".into())));

  let pool = PoolSynchronizer::new(Arc::new(ledger), APP_ID, 0, ASSET_Y);
  let first = pool.refresh().await;
  let second = pool.refresh().await;

  assert_eq!(first.state, PoolState::fallback(APP_ID, 0, ASSET_Y));
  assert_eq!(first.state.app_id, APP_ID);
  assert_eq!(first.state.current_price, 100_000_000);
  assert_eq!(first.state.total_liquidity, 1_000_000_000);
  assert_eq!(first.state.fee_rate, 30);
  assert_eq!(first.state.ranges.len(), 3);
  assert_eq!(first.source, PoolSource::Fallback(FallbackReason::Unreachable));
  assert_eq!(first, second);
}

#[tokio::test]
async fn test_missing_application_is_not_deployed() {
  let mut ledger = MockLedger::new();
  ledger
    .expect_application_global_state()
    .returning(|_| Err(LedgerError::NotFound("application does not exist".into())));

  let pool = PoolSynchronizer::new(Arc::new(ledger), APP_ID, 0, ASSET_Y);
  let snap = pool.refresh().await;
  assert_eq!(snap.source, PoolSource::Fallback(FallbackReason::NotDeployed));
  assert_eq!(snap.state, PoolState::fallback(APP_ID, 0, ASSET_Y));
}

#[tokio::test]
async fn test_unconfigured_pool_makes_no_request() {
  let pool = PoolSynchronizer::new(Arc::new(MockLedger::new()), 0, 0, ASSET_Y);
  let snap = pool.refresh().await;
  assert_eq!(snap.source, PoolSource::Fallback(FallbackReason::NotConfigured));
}

#[tokio::test]
async fn test_on_chain_state_merges_present_keys() {
  let mut ledger = MockLedger::new();
  ledger.expect_application_global_state().returning(|_| {
    Ok(HashMap::from([
      ("current_price".to_string(), 105_000_000),
      ("range2_liquidity".to_string(), 42),
    ]))
  });

  let pool = PoolSynchronizer::new(Arc::new(ledger), APP_ID, 0, ASSET_Y);
  let snap = pool.refresh().await;
  assert_eq!(snap.source, PoolSource::OnChain);
  assert_eq!(snap.state.current_price, 105_000_000);
  assert_eq!(snap.state.fee_rate, 30);
  assert_eq!(snap.state.ranges[1].liquidity, 42);
  assert_eq!(snap.state.ranges[0].liquidity, 500_000_000);
}

// ---- Session bootstrap ----

#[tokio::test]
async fn test_connect_refreshes_balance_once_and_disconnect_is_idempotent() {
  let mut ledger = MockLedger::new();
  ledger
    .expect_account_info()
    .with(eq(alice()))
    .times(1)
    .returning(|_| {
      Ok(AccountInfo {
        amount: 5_000_000,
        assets: HashMap::from([(ASSET_Y, 250)]),
      })
    });

  let mut wallet = MockWallet::new();
  wallet.expect_connect().times(1).returning(|| Ok(alice()));
  wallet.expect_disconnect().times(1).returning(|| Ok(()));

  let mut repo = MockRepo::new();
  repo
    .expect_save_session()
    .withf(|s: &StoredSession| s.network == "localnet" && s.address == alice().to_string())
    .times(1)
    .returning(|_| Ok(()));
  repo.expect_clear_session().times(1).returning(|| Ok(()));

  let manager = SessionManager::new(Arc::new(ledger), Arc::new(wallet), Arc::new(repo), "localnet");
  let mut rx = manager.subscribe();

  let address = manager.connect().await.unwrap();
  assert_eq!(address, alice());

  let session = rx.borrow_and_update().clone();
  assert!(session.is_connected);
  assert_eq!(session.address, Some(alice()));
  assert_eq!(session.balance, 5_000_000);
  assert_eq!(session.holding(ASSET_Y), 250);

  manager.disconnect().await;
  assert!(rx.has_changed().unwrap());
  assert_eq!(*rx.borrow_and_update(), WalletSession::default());

  manager.disconnect().await;
  assert!(!rx.has_changed().unwrap());
  assert_eq!(manager.snapshot(), WalletSession::default());
}

#[tokio::test]
async fn test_rejected_connect_leaves_session_untouched() {
  let mut wallet = MockWallet::new();
  wallet
    .expect_connect()
    .times(1)
    .returning(|| Err(WalletError::UserRejected));

  let manager = SessionManager::new(
    Arc::new(MockLedger::new()),
    Arc::new(wallet),
    Arc::new(MockRepo::new()),
    "localnet",
  );
  assert_eq!(manager.connect().await.unwrap_err(), SessionError::UserRejected);
  assert_eq!(manager.snapshot(), WalletSession::default());
}

#[tokio::test]
async fn test_initialize_restores_stored_session() {
  let mut repo = MockRepo::new();
  repo.expect_load_session().times(1).returning(|| {
    Ok(Some(StoredSession {
      version: 1,
      address: alice().to_string(),
      network: "localnet".to_string(),
      saved_at: Utc::now(),
    }))
  });

  let mut wallet = MockWallet::new();
  wallet
    .expect_reconnect()
    .with(eq(alice()))
    .times(1)
    .returning(|a| Ok(Some(*a)));

  let mut ledger = MockLedger::new();
  ledger.expect_account_info().times(1).returning(|_| {
    Ok(AccountInfo {
      amount: 1,
      assets: HashMap::new(),
    })
  });

  let manager = SessionManager::new(Arc::new(ledger), Arc::new(wallet), Arc::new(repo), "localnet");
  manager.initialize().await;
  assert_eq!(manager.snapshot().connected_address(), Some(alice()));
}

#[tokio::test]
async fn test_initialize_discards_session_of_other_network() {
  let mut repo = MockRepo::new();
  repo.expect_load_session().returning(|| {
    Ok(Some(StoredSession {
      version: 1,
      address: alice().to_string(),
      network: "mainnet".to_string(),
      saved_at: Utc::now(),
    }))
  });
  repo.expect_clear_session().times(1).returning(|| Ok(()));

  // No reconnect expectation: the wallet must not be asked.
  let manager = SessionManager::new(
    Arc::new(MockLedger::new()),
    Arc::new(MockWallet::new()),
    Arc::new(repo),
    "localnet",
  );
  manager.initialize().await;
  assert!(!manager.snapshot().is_connected);
}

#[tokio::test]
async fn test_initialize_swallows_storage_errors() {
  let mut repo = MockRepo::new();
  repo
    .expect_load_session()
    .returning(|| Err(anyhow::anyhow!("disk on fire")));

  let manager = SessionManager::new(
    Arc::new(MockLedger::new()),
    Arc::new(MockWallet::new()),
    Arc::new(repo),
    "localnet",
  );
  manager.initialize().await;
  assert_eq!(manager.snapshot(), WalletSession::default());
}

#[tokio::test]
async fn test_wallet_originated_disconnect_resets_session() {
  let (events_tx, _) = broadcast::channel::<()>(4);
  let events = events_tx.clone();

  let mut wallet = MockWallet::new();
  wallet.expect_connect().times(1).returning(|| Ok(alice()));
  wallet
    .expect_disconnect_events()
    .times(1)
    .returning(move || events.subscribe());
  wallet.expect_disconnect().times(1).returning(|| Ok(()));

  let mut ledger = MockLedger::new();
  ledger.expect_account_info().returning(|_| {
    Ok(AccountInfo {
      amount: 3_000_000,
      assets: HashMap::new(),
    })
  });

  let mut repo = MockRepo::new();
  repo.expect_save_session().returning(|_| Ok(()));
  repo.expect_clear_session().times(1).returning(|| Ok(()));

  let manager = Arc::new(SessionManager::new(
    Arc::new(ledger),
    Arc::new(wallet),
    Arc::new(repo),
    "localnet",
  ));
  manager.connect().await.unwrap();
  let mut rx = manager.subscribe();
  rx.borrow_and_update();

  let (shutdown_tx, _) = broadcast::channel::<()>(1);
  let watcher = tokio::spawn(Arc::clone(&manager).watch_disconnects(shutdown_tx.subscribe()));

  while events_tx.receiver_count() == 0 {
    tokio::task::yield_now().await;
  }
  events_tx.send(()).unwrap();

  tokio::time::timeout(Duration::from_secs(1), rx.changed())
    .await
    .unwrap()
    .unwrap();
  assert_eq!(*rx.borrow(), WalletSession::default());

  shutdown_tx.send(()).unwrap();
  tokio::time::timeout(Duration::from_secs(1), watcher)
    .await
    .unwrap()
    .unwrap();
}

// ---- Transaction orchestrator ----

#[tokio::test]
async fn test_native_swap_builds_payment_then_call_and_confirms() {
  let mut ledger = MockLedger::new();
  ledger.expect_suggested_params().times(1).returning(|| Ok(params()));
  ledger
    .expect_send_raw_group()
    .withf(|signed: &[Vec<u8>]| signed.len() == 2)
    .times(1)
    .returning(|_| Ok("SWAPTXID".to_string()));
  ledger
    .expect_status()
    .returning(|| Ok(NodeStatus { last_round: 100 }));
  ledger
    .expect_pending_transaction()
    .with(eq("SWAPTXID"))
    .returning(|_| {
      Ok(PendingInfo {
        confirmed_round: Some(101),
        pool_error: String::new(),
      })
    });
  // Pool refresh after confirmation.
  ledger
    .expect_application_global_state()
    .with(eq(APP_ID))
    .times(1)
    .returning(|_| Ok(HashMap::from([("current_price".to_string(), 99_000_000)])));

  let mut wallet = MockWallet::new();
  wallet
    .expect_sign_group()
    .withf(|legs: &[Transaction]| {
      legs.len() == 2
        && legs[0].tx_type == TxType::Payment
        && legs[0].amount == 1_000_000
        && legs[0].receiver == Some(Address::for_application(APP_ID))
        && legs[1].tx_type == TxType::ApplicationCall
        && legs[1].app_args[0] == b"swap".to_vec()
        && legs[1].foreign_assets == vec![ASSET_Y]
        && legs[0].group.is_some()
        && legs[0].group == legs[1].group
    })
    .times(1)
    .returning(|legs| Ok(legs.iter().map(|_| vec![0xAB]).collect()));

  let (orch, pool, _session_tx) = orchestrator(ledger, wallet, WalletSession::connected(alice()));
  let mut progress = orch.subscribe_progress();

  let result = orch.execute_swap(swap_native_in()).await;
  assert_eq!(
    result,
    TransactionResult::Confirmed {
      tx_id: "SWAPTXID".to_string(),
      confirmed_round: 101,
    }
  );
  assert!(result.success());
  assert_eq!(pool.snapshot().state.current_price, 99_000_000);

  let mut stages = Vec::new();
  while let Ok(p) = progress.try_recv() {
    stages.push(p.stage);
  }
  assert_eq!(stages.first(), Some(&TxStage::Idle));
  assert!(stages.contains(&TxStage::AwaitingSignature));
  assert_eq!(
    stages.last(),
    Some(&TxStage::Confirmed {
      tx_id: "SWAPTXID".to_string(),
      round: 101,
    })
  );
  for pair in stages.windows(2) {
    assert!(pair[0].can_advance_to(&pair[1]), "{:?} -> {:?}", pair[0], pair[1]);
  }
}

#[tokio::test]
async fn test_asset_swap_starts_with_asset_transfer() {
  let mut ledger = MockLedger::new();
  ledger.expect_suggested_params().returning(|| Ok(params()));

  let mut wallet = MockWallet::new();
  wallet
    .expect_sign_group()
    .withf(|legs: &[Transaction]| {
      legs.len() == 2
        && legs[0].tx_type == TxType::AssetTransfer
        && legs[0].asset_id == ASSET_Y
        && legs[0].asset_amount == 500
        && legs[1].tx_type == TxType::ApplicationCall
    })
    .times(1)
    .returning(|_| Err(WalletError::UserRejected));

  let (orch, _pool, _tx) = orchestrator(ledger, wallet, WalletSession::connected(alice()));
  let result = orch
    .execute_swap(SwapRequest {
      asset_in: ASSET_Y,
      asset_out: 0,
      amount_in: 500,
      min_amount_out: 1,
      deadline: 1_900_000_000,
    })
    .await;
  assert_eq!(result.error(), Some(&TxErrorKind::UserRejected));
}

#[tokio::test]
async fn test_disconnected_wallet_fails_without_network_calls() {
  // Mocks with no expectations panic on any call.
  let (orch, _pool, _tx) = orchestrator(MockLedger::new(), MockWallet::new(), WalletSession::default());

  let result = orch.execute_swap(swap_native_in()).await;
  assert!(!result.success());
  assert_eq!(result.error(), Some(&TxErrorKind::WalletNotConnected));
  assert_eq!(result.error().unwrap().to_string(), "Wallet not connected");

  let result = orch
    .execute_remove_liquidity(RemoveLiquidityRequest {
      lp_tokens: 10,
      range_id: 1,
    })
    .await;
  assert_eq!(result.error(), Some(&TxErrorKind::WalletNotConnected));
}

#[tokio::test]
async fn test_remove_liquidity_is_single_leg() {
  let mut ledger = MockLedger::new();
  ledger.expect_suggested_params().returning(|| Ok(params()));

  let mut wallet = MockWallet::new();
  wallet
    .expect_sign_group()
    .withf(|legs: &[Transaction]| {
      legs.len() == 1
        && legs[0].tx_type == TxType::ApplicationCall
        && legs[0].app_args[0] == b"remove_liquidity".to_vec()
        && legs[0].app_args[1] == 10u64.to_be_bytes().to_vec()
        && legs[0].app_args[2] == 2u64.to_be_bytes().to_vec()
        && legs[0].group.is_none()
    })
    .times(1)
    .returning(|_| Err(WalletError::UserRejected));

  let (orch, _pool, _tx) = orchestrator(ledger, wallet, WalletSession::connected(alice()));
  let result = orch
    .execute_remove_liquidity(RemoveLiquidityRequest {
      lp_tokens: 10,
      range_id: 2,
    })
    .await;
  assert_eq!(result.error(), Some(&TxErrorKind::UserRejected));
}

#[tokio::test]
async fn test_confirmation_timeout_does_not_resubmit() {
  let mut ledger = MockLedger::new();
  ledger.expect_suggested_params().returning(|| Ok(params()));
  ledger
    .expect_send_raw_group()
    .times(1)
    .returning(|_| Ok("SLOWTX".to_string()));
  ledger
    .expect_status()
    .returning(|| Ok(NodeStatus { last_round: 100 }));
  ledger.expect_pending_transaction().times(4).returning(|_| {
    Ok(PendingInfo {
      confirmed_round: None,
      pool_error: String::new(),
    })
  });
  ledger
    .expect_wait_for_block_after()
    .returning(|round| Ok(NodeStatus { last_round: round + 1 }));

  let mut wallet = MockWallet::new();
  wallet
    .expect_sign_group()
    .returning(|legs| Ok(legs.iter().map(|_| vec![1]).collect()));

  let (orch, _pool, _tx) = orchestrator(ledger, wallet, WalletSession::connected(alice()));
  let result = orch.execute_swap(swap_native_in()).await;
  assert_eq!(
    result.error(),
    Some(&TxErrorKind::ConfirmationTimeout {
      rounds: 4,
      tx_id: "SLOWTX".to_string(),
    })
  );
  assert_eq!(result.tx_id(), Some("SLOWTX"));
}

#[tokio::test]
async fn test_pool_error_is_submission_failure() {
  let mut ledger = MockLedger::new();
  ledger.expect_suggested_params().returning(|| Ok(params()));
  ledger
    .expect_send_raw_group()
    .returning(|_| Ok("EVICTED".to_string()));
  ledger
    .expect_status()
    .returning(|| Ok(NodeStatus { last_round: 100 }));
  ledger.expect_pending_transaction().times(1).returning(|_| {
    Ok(PendingInfo {
      confirmed_round: None,
      pool_error: "overspend".to_string(),
    })
  });

  let mut wallet = MockWallet::new();
  wallet
    .expect_sign_group()
    .returning(|legs| Ok(legs.iter().map(|_| vec![1]).collect()));

  let (orch, _pool, _tx) = orchestrator(ledger, wallet, WalletSession::connected(alice()));
  let result = orch.execute_swap(swap_native_in()).await;
  assert_eq!(
    result.error(),
    Some(&TxErrorKind::SubmissionFailed("overspend".to_string()))
  );
}

#[tokio::test]
async fn test_rejected_submission_is_reported() {
  let mut ledger = MockLedger::new();
  ledger.expect_suggested_params().returning(|| Ok(params()));
  ledger
    .expect_send_raw_group()
    .times(1)
    .returning(|_| Err(LedgerError::Rejected("txgroup had 0 fee".into())));

  let mut wallet = MockWallet::new();
  wallet
    .expect_sign_group()
    .returning(|legs| Ok(legs.iter().map(|_| vec![1]).collect()));

  let (orch, _pool, _tx) = orchestrator(ledger, wallet, WalletSession::connected(alice()));
  let result = orch.execute_swap(swap_native_in()).await;
  assert!(matches!(result.error(), Some(TxErrorKind::SubmissionFailed(_))));
}

#[tokio::test]
async fn test_params_failure_is_ledger_unavailable() {
  let mut ledger = MockLedger::new();
  ledger
    .expect_suggested_params()
    .returning(|| Err(LedgerError::Transport("timeout".into())));

  // Nothing may be signed when params are missing.
  let (orch, _pool, _tx) = orchestrator(ledger, MockWallet::new(), WalletSession::connected(alice()));
  let result = orch.execute_swap(swap_native_in()).await;
  assert!(matches!(result.error(), Some(TxErrorKind::LedgerUnavailable(_))));
}

// ---- Market poller ----

#[tokio::test]
async fn test_metrics_failure_flips_connectivity_and_recovers() {
  let calls = Arc::new(AtomicUsize::new(0));
  let counter = Arc::clone(&calls);

  let mut api = MockMarket::new();
  api.expect_status().returning(|| Ok(status("normal", 1.0)));
  api.expect_metrics().returning(move || {
    if counter.fetch_add(1, Ordering::SeqCst) == 0 {
      Err(MarketApiError::Transport("connection reset".into()))
    } else {
      Ok(MarketMetrics::default())
    }
  });
  api.expect_history().with(eq(50)).returning(|_| Ok(Vec::new()));

  let poller = MarketPoller::new(Arc::new(api), 50);
  let mut connectivity = poller.subscribe_connectivity();
  let failures = poller.subscribe_failures();
  assert_eq!(*connectivity.borrow_and_update(), Connectivity::Unknown);

  assert!(poller.tick().await.is_err());
  assert_eq!(*connectivity.borrow_and_update(), Connectivity::Lost);
  assert!(poller.market_snapshot().is_none());
  assert_eq!(*failures.borrow(), 1);

  assert!(poller.tick().await.is_ok());
  assert_eq!(*connectivity.borrow_and_update(), Connectivity::Connected);
  assert!(poller.market_snapshot().is_some());
  assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_each_tick_replaces_snapshot_whole() {
  let calls = Arc::new(AtomicUsize::new(0));
  let counter = Arc::clone(&calls);

  let mut api = MockMarket::new();
  api.expect_status().returning(move || {
    if counter.fetch_add(1, Ordering::SeqCst) == 0 {
      Ok(status("volatile", 1.10))
    } else {
      Ok(status("calm", 0.95))
    }
  });
  let metric_calls = Arc::new(AtomicUsize::new(0));
  let metric_counter = Arc::clone(&metric_calls);
  api.expect_metrics().returning(move || {
    if metric_counter.fetch_add(1, Ordering::SeqCst) == 0 {
      Ok(MarketMetrics {
        regime: Some("high".into()),
        current_volatility: Some(0.08),
        ..MarketMetrics::default()
      })
    } else {
      Ok(MarketMetrics::default())
    }
  });
  let history_calls = Arc::new(AtomicUsize::new(0));
  let history_counter = Arc::clone(&history_calls);
  api.expect_history().returning(move |_| {
    if history_counter.fetch_add(1, Ordering::SeqCst) == 0 {
      Ok(vec![
        PricePoint { price: 1.0, volume: 3.0, timestamp: 1.0 },
        PricePoint { price: 1.1, volume: 4.0, timestamp: 2.0 },
      ])
    } else {
      Ok(Vec::new())
    }
  });

  let poller = MarketPoller::new(Arc::new(api), 100);
  poller.tick().await.unwrap();
  let first = poller.market_snapshot().unwrap();
  assert_eq!(first.regime, "high");
  assert_eq!(first.price_history.len(), 2);

  poller.tick().await.unwrap();
  let second = poller.market_snapshot().unwrap();
  assert_eq!(second.scenario, "calm");
  assert_eq!(second.regime, "medium");
  assert!((second.volatility - 0.02).abs() < f64::EPSILON);
  assert!(second.price_history.is_empty());
  assert!(second.volume.abs() < f64::EPSILON);
}

#[tokio::test]
async fn test_control_request_does_not_touch_snapshot() {
  let mut api = MockMarket::new();
  api
    .expect_set_scenario()
    .with(eq(Scenario::FlashCrash))
    .times(1)
    .returning(|_| Err(MarketApiError::Throttled));

  let poller = MarketPoller::new(Arc::new(api), 100);
  poller.set_scenario(Scenario::FlashCrash).await.unwrap();
  assert!(poller.market_snapshot().is_none());
  assert_eq!(poller.connectivity(), Connectivity::Unknown);
}

#[tokio::test]
async fn test_shutdown_stops_future_ticks() {
  let market_calls = Arc::new(AtomicUsize::new(0));
  let activity_calls = Arc::new(AtomicUsize::new(0));
  let market_counter = Arc::clone(&market_calls);
  let activity_counter = Arc::clone(&activity_calls);

  let mut api = MockMarket::new();
  api.expect_status().returning(move || {
    market_counter.fetch_add(1, Ordering::SeqCst);
    Ok(status("normal", 1.0))
  });
  api.expect_metrics().returning(|| Ok(MarketMetrics::default()));
  api.expect_history().returning(|_| Ok(Vec::new()));
  api.expect_pending_transactions().returning(move || {
    activity_counter.fetch_add(1, Ordering::SeqCst);
    Ok(Vec::new())
  });
  api.expect_wallets().returning(|| Ok(WalletsOverview::default()));

  let poller = Arc::new(MarketPoller::new(Arc::new(api), 10));
  let (shutdown_tx, _) = broadcast::channel::<()>(1);
  let market_loop = tokio::spawn(
    Arc::clone(&poller).run(Duration::from_millis(10), shutdown_tx.subscribe()),
  );
  let activity_loop = tokio::spawn(
    Arc::clone(&poller).run_activity(Duration::from_millis(10), shutdown_tx.subscribe()),
  );

  tokio::time::sleep(Duration::from_millis(60)).await;
  shutdown_tx.send(()).unwrap();
  tokio::time::timeout(Duration::from_secs(1), market_loop)
    .await
    .unwrap()
    .unwrap();
  tokio::time::timeout(Duration::from_secs(1), activity_loop)
    .await
    .unwrap()
    .unwrap();

  let market_before = market_calls.load(Ordering::SeqCst);
  let activity_before = activity_calls.load(Ordering::SeqCst);
  assert!(market_before >= 1);
  assert!(activity_before >= 1);
  assert_eq!(poller.connectivity(), Connectivity::Connected);

  tokio::time::sleep(Duration::from_millis(50)).await;
  assert_eq!(market_calls.load(Ordering::SeqCst), market_before);
  assert_eq!(activity_calls.load(Ordering::SeqCst), activity_before);
}

// ---- Journal ----

#[tokio::test]
async fn test_journal_persists_terminal_progress() {
  let dir = tempfile::tempdir().unwrap();
  let repo = Arc::new(RepositoryImpl::from_data_dir(dir.path()).await.unwrap());
  let journal = TransactionJournal::new(Arc::clone(&repo));

  let op_id = Uuid::new_v4();
  assert!(
    !journal
      .observe(&TxProgress::new(op_id, OperationKind::Swap, TxStage::Submitting))
      .await
  );
  assert!(
    journal
      .observe(&TxProgress::new(
        op_id,
        OperationKind::Swap,
        TxStage::Confirmed {
          tx_id: "JOURNALED".into(),
          round: 7,
        },
      ))
      .await
  );

  let records = tokio_test::assert_ok!(journal.recent(10).await);
  assert_eq!(records.len(), 1);
  assert_eq!(records[0].op_id, op_id);
  assert_eq!(records[0].tx_id.as_deref(), Some("JOURNALED"));
}

#[tokio::test]
async fn test_journal_write_failure_is_absorbed() {
  let mut repo = MockRepo::new();
  repo
    .expect_append_transaction()
    .times(1)
    .returning(|_| Err(anyhow::anyhow!("read-only filesystem")));

  let journal = TransactionJournal::new(Arc::new(repo));
  let written = journal
    .observe(&TxProgress::new(
      Uuid::new_v4(),
      OperationKind::AddLiquidity,
      TxStage::Failed(TxErrorKind::UserRejected),
    ))
    .await;
  assert!(!written);
}
