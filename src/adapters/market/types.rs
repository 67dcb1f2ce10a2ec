//! Simulator REST request/response types.
//!
//! The backend fills missing numbers with zero and missing names with
//! `"unknown"`; every field here tolerates absence the same way.

use serde::{Deserialize, Serialize};

use crate::domain::market::{PendingSimTransaction, PricePoint, SimWallet};
use crate::ports::market_api::{MarketMetrics, MarketStatus, WalletsOverview};

fn unknown() -> String {
  "unknown".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct HealthResponse {
  #[serde(default = "unknown")]
  pub status: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatusResponse {
  pub market_simulation: MarketSimulationStatus,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MarketSimulationStatus {
  #[serde(default)]
  pub running: bool,
  #[serde(default)]
  pub current_price: f64,
  #[serde(default)]
  pub current_volatility: f64,
  #[serde(default = "unknown")]
  pub scenario: String,
  #[serde(default = "unknown")]
  pub regime: String,
}

impl From<StatusResponse> for MarketStatus {
  fn from(raw: StatusResponse) -> Self {
    let m = raw.market_simulation;
    Self {
      running: m.running,
      current_price: m.current_price,
      current_volatility: m.current_volatility,
      scenario: m.scenario,
      regime: m.regime,
    }
  }
}

/// `{}` until the backend has two price samples.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MetricsResponse {
  pub current_volatility: Option<f64>,
  pub realized_volatility: Option<f64>,
  pub max_drawdown: Option<f64>,
  pub volume_weighted_price: Option<f64>,
  pub total_trades: Option<u64>,
  pub scenario: Option<String>,
  pub regime: Option<String>,
}

impl From<MetricsResponse> for MarketMetrics {
  fn from(raw: MetricsResponse) -> Self {
    Self {
      current_volatility: raw.current_volatility,
      realized_volatility: raw.realized_volatility,
      max_drawdown: raw.max_drawdown,
      volume_weighted_price: raw.volume_weighted_price,
      total_trades: raw.total_trades,
      scenario: raw.scenario,
      regime: raw.regime,
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct HistoryResponse {
  #[serde(default)]
  pub history: Vec<PricePoint>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WalletsResponse {
  #[serde(default)]
  pub wallets: Vec<SimWallet>,
  #[serde(default)]
  pub whale_count: u64,
  #[serde(default)]
  pub retail_count: u64,
}

impl From<WalletsResponse> for WalletsOverview {
  fn from(raw: WalletsResponse) -> Self {
    Self {
      wallets: raw.wallets,
      whale_count: raw.whale_count,
      retail_count: raw.retail_count,
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PendingResponse {
  #[serde(default)]
  pub pending_transactions: Vec<PendingSimTransaction>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScenarioBody<'a> {
  pub scenario: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegimeBody<'a> {
  pub regime: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub struct ShockBody {
  pub magnitude: f64,
  pub duration: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PatternBody<'a> {
  pub pattern: &'a str,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_empty_metrics_object() {
    let raw: MetricsResponse = serde_json::from_str("{}").unwrap();
    assert_eq!(MarketMetrics::from(raw), MarketMetrics::default());
  }

  #[test]
  fn test_status_with_missing_names() {
    let raw: StatusResponse = serde_json::from_str(
      r#"{"market_simulation": {"running": true, "current_price": 1.02, "current_volatility": 0.03},
          "blockchain_simulation": {"running": false}}"#,
    )
    .unwrap();
    let status = MarketStatus::from(raw);
    assert!(status.running);
    assert_eq!(status.scenario, "unknown");
    assert!((status.current_price - 1.02).abs() < f64::EPSILON);
  }

  #[test]
  fn test_history_points() {
    let raw: HistoryResponse = serde_json::from_str(
      r#"{"history": [{"price": 1.0, "volume": 10.0, "timestamp": 1700000000.5}], "count": 1}"#,
    )
    .unwrap();
    assert_eq!(raw.history.len(), 1);
    assert!((raw.history[0].volume - 10.0).abs() < f64::EPSILON);
  }

  #[test]
  fn test_wallets_defaults() {
    let raw: WalletsResponse = serde_json::from_str(
      r#"{"wallets": [{"address": "W1", "pattern": "whale"}], "total_count": 1, "whale_count": 1}"#,
    )
    .unwrap();
    let overview = WalletsOverview::from(raw);
    assert_eq!(overview.whale_count, 1);
    assert_eq!(overview.retail_count, 0);
    assert_eq!(overview.wallets[0].total_transactions, 0);
  }
}
