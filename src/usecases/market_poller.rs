//! Market Poller Use Case - simulator snapshots and controls
//!
//! Two loops, each owning its own cached value:
//! - market tick: status + metrics + history → [`MarketSnapshot`]
//! - activity tick: pending transactions + wallets → [`ActivitySnapshot`]
//!
//! A successful tick replaces its snapshot whole. A failed market tick
//! keeps the previous snapshot and flips connectivity to `Lost`; the
//! next successful tick flips it back. Controls are spawned requests
//! that never touch local state.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures_util::future::{try_join, try_join3};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, instrument, warn};

use crate::domain::market::{
  ActivitySnapshot, Connectivity, DemoScenario, MarketSnapshot, PricePoint, PriceShock, Scenario,
  TradingPattern, VolatilityRegime,
};
use crate::ports::market_api::{MarketApi, MarketApiError, MarketMetrics, MarketStatus};

/// Merge one tick's responses into a fresh snapshot.
///
/// Metrics win over status where both carry a value; `volume` is the
/// newest history sample's volume.
pub fn merge_snapshot(
  status: MarketStatus,
  metrics: MarketMetrics,
  history: Vec<PricePoint>,
  now: DateTime<Utc>,
) -> MarketSnapshot {
  MarketSnapshot {
    price: status.current_price,
    volume: history.last().map_or(0.0, |p| p.volume),
    volatility: metrics.current_volatility.unwrap_or(status.current_volatility),
    regime: metrics.regime.unwrap_or(status.regime),
    scenario: metrics.scenario.unwrap_or(status.scenario),
    timestamp: now,
    price_history: history,
  }
}

/// Polls the simulator and exposes the latest snapshots.
pub struct MarketPoller<M: MarketApi> {
  api: Arc<M>,
  history_window: u32,
  market: watch::Sender<Option<MarketSnapshot>>,
  activity: watch::Sender<Option<ActivitySnapshot>>,
  connectivity: watch::Sender<Connectivity>,
  /// Failed market ticks since start.
  failures: watch::Sender<u64>,
}

impl<M: MarketApi> MarketPoller<M> {
  pub fn new(api: Arc<M>, history_window: u32) -> Self {
    let (market, _) = watch::channel(None);
    let (activity, _) = watch::channel(None);
    let (connectivity, _) = watch::channel(Connectivity::Unknown);
    let (failures, _) = watch::channel(0);
    Self {
      api,
      history_window,
      market,
      activity,
      connectivity,
      failures,
    }
  }

  pub fn subscribe_market(&self) -> watch::Receiver<Option<MarketSnapshot>> {
    self.market.subscribe()
  }

  pub fn subscribe_activity(&self) -> watch::Receiver<Option<ActivitySnapshot>> {
    self.activity.subscribe()
  }

  pub fn subscribe_connectivity(&self) -> watch::Receiver<Connectivity> {
    self.connectivity.subscribe()
  }

  pub fn subscribe_failures(&self) -> watch::Receiver<u64> {
    self.failures.subscribe()
  }

  pub fn market_snapshot(&self) -> Option<MarketSnapshot> {
    self.market.borrow().clone()
  }

  pub fn activity_snapshot(&self) -> Option<ActivitySnapshot> {
    self.activity.borrow().clone()
  }

  pub fn connectivity(&self) -> Connectivity {
    *self.connectivity.borrow()
  }

  /// One market tick: fetch all three concurrently, then replace.
  pub async fn tick(&self) -> Result<(), MarketApiError> {
    let fetched = try_join3(
      self.api.status(),
      self.api.metrics(),
      self.api.history(self.history_window),
    )
    .await;

    match fetched {
      Ok((status, metrics, history)) => {
        self
          .market
          .send_replace(Some(merge_snapshot(status, metrics, history, Utc::now())));
        self.set_connectivity(Connectivity::Connected);
        Ok(())
      }
      Err(e) => {
        warn!(error = %e, "Market poll failed");
        self.failures.send_modify(|n| *n += 1);
        self.set_connectivity(Connectivity::Lost);
        Err(e)
      }
    }
  }

  /// One activity tick.
  pub async fn activity_tick(&self) -> Result<(), MarketApiError> {
    let (pending, wallets) = try_join(self.api.pending_transactions(), self.api.wallets()).await?;
    self.activity.send_replace(Some(ActivitySnapshot {
      pending_transactions: pending,
      wallets: wallets.wallets,
      whale_count: wallets.whale_count,
      retail_count: wallets.retail_count,
      timestamp: Utc::now(),
    }));
    Ok(())
  }

  fn set_connectivity(&self, next: Connectivity) {
    let changed = self.connectivity.send_if_modified(|current| {
      if *current == next {
        false
      } else {
        *current = next;
        true
      }
    });
    if changed {
      match next {
        Connectivity::Connected => info!("Market simulator connected"),
        Connectivity::Lost => warn!("Market simulator connection lost"),
        Connectivity::Unknown => {}
      }
    }
  }

  /// Market loop. Shutdown stops future ticks; a running tick finishes.
  #[instrument(skip(self, shutdown_rx))]
  pub async fn run(self: Arc<Self>, every: Duration, mut shutdown_rx: broadcast::Receiver<()>) {
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
      tokio::select! {
        biased;
        _ = shutdown_rx.recv() => {
          info!("Market poller shutting down");
          return;
        }
        _ = ticker.tick() => {}
      }
      let _ = self.tick().await;
    }
  }

  /// Activity loop on its own cadence.
  #[instrument(skip(self, shutdown_rx))]
  pub async fn run_activity(self: Arc<Self>, every: Duration, mut shutdown_rx: broadcast::Receiver<()>) {
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
      tokio::select! {
        biased;
        _ = shutdown_rx.recv() => return,
        _ = ticker.tick() => {}
      }
      if let Err(e) = self.activity_tick().await {
        debug!(error = %e, "Activity poll failed");
      }
    }
  }

  /// `GET /health` once; logs and reports reachability.
  pub async fn check_health(&self) -> bool {
    match self.api.health().await {
      Ok(status) => {
        info!(status = %status, "Market simulator health");
        true
      }
      Err(e) => {
        warn!(error = %e, "Market simulator health check failed");
        false
      }
    }
  }

  pub fn set_scenario(&self, scenario: Scenario) -> JoinHandle<()> {
    let api = Arc::clone(&self.api);
    spawn_control("scenario", async move { api.set_scenario(scenario).await })
  }

  pub fn set_volatility_regime(&self, regime: VolatilityRegime) -> JoinHandle<()> {
    let api = Arc::clone(&self.api);
    spawn_control("volatility", async move { api.set_volatility_regime(regime).await })
  }

  pub fn add_price_shock(&self, shock: PriceShock) -> JoinHandle<()> {
    let api = Arc::clone(&self.api);
    spawn_control("shock", async move { api.add_price_shock(shock).await })
  }

  pub fn set_trading_pattern(&self, pattern: TradingPattern) -> JoinHandle<()> {
    let api = Arc::clone(&self.api);
    spawn_control("pattern", async move { api.set_trading_pattern(pattern).await })
  }

  pub fn trigger_demo_scenario(&self, demo: DemoScenario) -> JoinHandle<()> {
    let api = Arc::clone(&self.api);
    spawn_control("demo", async move { api.trigger_demo_scenario(demo).await })
  }
}

fn spawn_control<F>(control: &'static str, request: F) -> JoinHandle<()>
where
  F: std::future::Future<Output = Result<(), MarketApiError>> + Send + 'static,
{
  tokio::spawn(async move {
    match request.await {
      Ok(()) => info!(control, "Control request sent"),
      Err(MarketApiError::Throttled) => warn!(control, "Control request dropped by rate limit"),
      Err(e) => warn!(control, error = %e, "Control request failed"),
    }
  })
}
