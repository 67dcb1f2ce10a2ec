//! Market API Port - off-chain simulation backend
//!
//! Reads feed the poller; writes are fire-and-forget controls whose
//! effect is only observed through later reads.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::market::{
  DemoScenario, PendingSimTransaction, PricePoint, PriceShock, Scenario, SimWallet,
  TradingPattern, VolatilityRegime,
};

/// Failure of a simulator request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MarketApiError {
  #[error("HTTP {status}: {body}")]
  Http { status: u16, body: String },
  #[error("transport error: {0}")]
  Transport(String),
  #[error("decode error: {0}")]
  Decode(String),
  /// Client-side rate limit hit; the request was not sent.
  #[error("control request throttled")]
  Throttled,
}

/// Market half of `/api/v1/status`.
#[derive(Debug, Clone, PartialEq)]
pub struct MarketStatus {
  pub running: bool,
  pub current_price: f64,
  pub current_volatility: f64,
  pub scenario: String,
  pub regime: String,
}

/// `/api/v1/metrics`. Every field is absent until the backend has data.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarketMetrics {
  pub current_volatility: Option<f64>,
  pub realized_volatility: Option<f64>,
  pub max_drawdown: Option<f64>,
  pub volume_weighted_price: Option<f64>,
  pub total_trades: Option<u64>,
  pub scenario: Option<String>,
  pub regime: Option<String>,
}

/// `/api/v1/blockchain/wallets`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WalletsOverview {
  pub wallets: Vec<SimWallet>,
  pub whale_count: u64,
  pub retail_count: u64,
}

/// Trait for the market simulation backend.
#[async_trait]
pub trait MarketApi: Send + Sync + 'static {
  /// `GET /health`. Returns the reported status string.
  async fn health(&self) -> Result<String, MarketApiError>;

  async fn status(&self) -> Result<MarketStatus, MarketApiError>;

  async fn metrics(&self) -> Result<MarketMetrics, MarketApiError>;

  /// Last `window` price samples, oldest first.
  async fn history(&self, window: u32) -> Result<Vec<PricePoint>, MarketApiError>;

  async fn wallets(&self) -> Result<WalletsOverview, MarketApiError>;

  async fn pending_transactions(&self) -> Result<Vec<PendingSimTransaction>, MarketApiError>;

  async fn set_scenario(&self, scenario: Scenario) -> Result<(), MarketApiError>;

  async fn set_volatility_regime(&self, regime: VolatilityRegime) -> Result<(), MarketApiError>;

  async fn add_price_shock(&self, shock: PriceShock) -> Result<(), MarketApiError>;

  async fn set_trading_pattern(&self, pattern: TradingPattern) -> Result<(), MarketApiError>;

  async fn trigger_demo_scenario(&self, demo: DemoScenario) -> Result<(), MarketApiError>;
}
