//! Simulator HTTP Client - market simulation REST API
//!
//! Reads go straight through; the poller retries on its next tick.
//! Control writes pass a client-side rate limiter first and are dropped
//! with [`MarketApiError::Throttled`] when over quota.

use std::num::NonZeroU32;
use std::time::Duration;

use async_trait::async_trait;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, instrument};

use super::types::{
  HealthResponse, HistoryResponse, MetricsResponse, PatternBody, PendingResponse, RegimeBody,
  ScenarioBody, ShockBody, StatusResponse, WalletsResponse,
};
use crate::domain::market::{
  DemoScenario, PendingSimTransaction, PricePoint, PriceShock, Scenario, TradingPattern,
  VolatilityRegime,
};
use crate::ports::market_api::{
  MarketApi, MarketApiError, MarketMetrics, MarketStatus, WalletsOverview,
};

/// Configuration for the simulator client.
#[derive(Debug, Clone)]
pub struct SimulatorClientConfig {
  pub base_url: String,
  pub timeout: Duration,
  /// Control requests allowed per second.
  pub control_rate_per_sec: u32,
}

impl Default for SimulatorClientConfig {
  fn default() -> Self {
    Self {
      base_url: "http://localhost:8000".to_string(),
      timeout: Duration::from_secs(5),
      control_rate_per_sec: 2,
    }
  }
}

type ControlLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// HTTP client for the market simulation backend.
pub struct SimulatorClient {
  http: Client,
  base_url: String,
  limiter: ControlLimiter,
}

impl SimulatorClient {
  pub fn new(config: SimulatorClientConfig) -> Result<Self, MarketApiError> {
    let http = Client::builder()
      .timeout(config.timeout)
      .pool_max_idle_per_host(4)
      .build()
      .map_err(|e| MarketApiError::Transport(format!("failed to build HTTP client: {e}")))?;

    let rate = NonZeroU32::new(config.control_rate_per_sec).unwrap_or(NonZeroU32::MIN);

    Ok(Self {
      http,
      base_url: config.base_url.trim_end_matches('/').to_string(),
      limiter: RateLimiter::direct(Quota::per_second(rate)),
    })
  }

  fn url(&self, path: &str) -> String {
    format!("{}{}", self.base_url, path)
  }

  async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, MarketApiError> {
    let response = self
      .http
      .get(self.url(path))
      .send()
      .await
      .map_err(|e| MarketApiError::Transport(e.to_string()))?;
    decode(response).await
  }

  async fn post<B: Serialize + ?Sized>(&self, path: &str, body: Option<&B>) -> Result<(), MarketApiError> {
    if self.limiter.check().is_err() {
      return Err(MarketApiError::Throttled);
    }

    let mut request = self.http.post(self.url(path));
    if let Some(body) = body {
      request = request.json(body);
    }

    let response = request
      .send()
      .await
      .map_err(|e| MarketApiError::Transport(e.to_string()))?;
    let _: serde_json::Value = decode(response).await?;
    debug!(path, "Control request accepted");
    Ok(())
  }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, MarketApiError> {
  let status = response.status();
  if !status.is_success() {
    let body = response.text().await.unwrap_or_default();
    return Err(MarketApiError::Http {
      status: status.as_u16(),
      body,
    });
  }
  response
    .json::<T>()
    .await
    .map_err(|e| MarketApiError::Decode(e.to_string()))
}

#[async_trait]
impl MarketApi for SimulatorClient {
  async fn health(&self) -> Result<String, MarketApiError> {
    let raw: HealthResponse = self.get("/health").await?;
    Ok(raw.status)
  }

  async fn status(&self) -> Result<MarketStatus, MarketApiError> {
    let raw: StatusResponse = self.get("/api/v1/status").await?;
    Ok(raw.into())
  }

  async fn metrics(&self) -> Result<MarketMetrics, MarketApiError> {
    let raw: MetricsResponse = self.get("/api/v1/metrics").await?;
    Ok(raw.into())
  }

  async fn history(&self, window: u32) -> Result<Vec<PricePoint>, MarketApiError> {
    let raw: HistoryResponse = self.get(&format!("/api/v1/history?window={window}")).await?;
    Ok(raw.history)
  }

  async fn wallets(&self) -> Result<WalletsOverview, MarketApiError> {
    let raw: WalletsResponse = self.get("/api/v1/blockchain/wallets").await?;
    Ok(raw.into())
  }

  async fn pending_transactions(&self) -> Result<Vec<PendingSimTransaction>, MarketApiError> {
    let raw: PendingResponse = self.get("/api/v1/blockchain/transactions/pending").await?;
    Ok(raw.pending_transactions)
  }

  #[instrument(skip(self))]
  async fn set_scenario(&self, scenario: Scenario) -> Result<(), MarketApiError> {
    self
      .post("/api/v1/scenario", Some(&ScenarioBody { scenario: scenario.as_str() }))
      .await
  }

  #[instrument(skip(self))]
  async fn set_volatility_regime(&self, regime: VolatilityRegime) -> Result<(), MarketApiError> {
    self
      .post("/api/v1/volatility", Some(&RegimeBody { regime: regime.as_str() }))
      .await
  }

  #[instrument(skip(self))]
  async fn add_price_shock(&self, shock: PriceShock) -> Result<(), MarketApiError> {
    self
      .post(
        "/api/v1/shock",
        Some(&ShockBody {
          magnitude: shock.magnitude(),
          duration: shock.duration(),
        }),
      )
      .await
  }

  #[instrument(skip(self))]
  async fn set_trading_pattern(&self, pattern: TradingPattern) -> Result<(), MarketApiError> {
    self
      .post("/api/v1/blockchain/pattern", Some(&PatternBody { pattern: pattern.as_str() }))
      .await
  }

  #[instrument(skip(self))]
  async fn trigger_demo_scenario(&self, demo: DemoScenario) -> Result<(), MarketApiError> {
    self
      .post::<()>(&format!("/api/v1/demo/scenario?scenario_name={}", demo.as_str()), None)
      .await
  }
}
