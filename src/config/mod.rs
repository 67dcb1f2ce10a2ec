//! Configuration Module - TOML-based Client Configuration
//!
//! Loads and validates configuration from `config.toml` with
//! environment variable overrides for endpoints and secrets.
//! Pool ids, endpoints and cadences are externalized here; nothing
//! is hardcoded in the domain layer.

pub mod loader;
pub mod network;

use std::time::Duration;

use serde::Deserialize;

pub use network::{NetworkConfig, NetworkPreset, NetworkSection};

/// Top-level client configuration.
///
/// Every section and field has a default, so an empty file is a valid
/// localnet configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
  #[serde(default)]
  pub app: AppSection,
  #[serde(default)]
  pub network: NetworkSection,
  #[serde(default)]
  pub pool: PoolConfig,
  #[serde(default)]
  pub wallet: WalletConfig,
  #[serde(default)]
  pub market: MarketConfig,
  #[serde(default)]
  pub tx: TxConfig,
  #[serde(default)]
  pub metrics: MetricsConfig,
  #[serde(default)]
  pub persistence: PersistenceConfig,
}

/// Process identity.
#[derive(Debug, Clone, Deserialize)]
pub struct AppSection {
  #[serde(default = "default_name")]
  pub name: String,
  /// Log level (trace, debug, info, warn, error); `RUST_LOG` wins.
  #[serde(default = "default_log_level")]
  pub log_level: String,
}

impl Default for AppSection {
  fn default() -> Self {
    Self {
      name: default_name(),
      log_level: default_log_level(),
    }
  }
}

/// Pool application and its asset pair.
#[derive(Debug, Clone, Deserialize)]
pub struct PoolConfig {
  /// Application id; 0 means not deployed yet.
  #[serde(default)]
  pub app_id: u64,
  /// Asset ids of the pair; 0 is the native asset.
  #[serde(default)]
  pub asset_x: u64,
  #[serde(default = "default_asset_y")]
  pub asset_y: u64,
}

impl Default for PoolConfig {
  fn default() -> Self {
    Self {
      app_id: 0,
      asset_x: 0,
      asset_y: default_asset_y(),
    }
  }
}

/// kmd connection and approval behavior.
#[derive(Debug, Clone, Deserialize)]
pub struct WalletConfig {
  #[serde(default = "default_kmd_url")]
  pub kmd_url: String,
  /// Falls back to `KMD_TOKEN`.
  #[serde(default)]
  pub kmd_token: String,
  /// Empty selects the first wallet kmd lists.
  #[serde(default)]
  pub wallet_name: String,
  /// Falls back to `KMD_PASSWORD`.
  #[serde(default)]
  pub wallet_password: String,
  /// Skip the console prompt before connect and signing.
  #[serde(default)]
  pub auto_approve: bool,
  #[serde(default = "default_balance_refresh")]
  pub balance_refresh_secs: u64,
  #[serde(default = "default_keepalive")]
  pub keepalive_secs: u64,
  #[serde(default = "default_timeout")]
  pub timeout_secs: u64,
}

impl Default for WalletConfig {
  fn default() -> Self {
    Self {
      kmd_url: default_kmd_url(),
      kmd_token: String::new(),
      wallet_name: String::new(),
      wallet_password: String::new(),
      auto_approve: false,
      balance_refresh_secs: default_balance_refresh(),
      keepalive_secs: default_keepalive(),
      timeout_secs: default_timeout(),
    }
  }
}

/// Market simulator endpoint and cadences.
#[derive(Debug, Clone, Deserialize)]
pub struct MarketConfig {
  #[serde(default = "default_market_url")]
  pub base_url: String,
  #[serde(default = "default_poll_interval")]
  pub poll_interval_ms: u64,
  #[serde(default = "default_activity_interval")]
  pub activity_interval_ms: u64,
  /// Samples requested from `/history`.
  #[serde(default = "default_history_window")]
  pub history_window: u32,
  /// Control requests allowed per second.
  #[serde(default = "default_control_rate")]
  pub control_rate_per_sec: u32,
  #[serde(default = "default_market_timeout")]
  pub timeout_secs: u64,
}

impl Default for MarketConfig {
  fn default() -> Self {
    Self {
      base_url: default_market_url(),
      poll_interval_ms: default_poll_interval(),
      activity_interval_ms: default_activity_interval(),
      history_window: default_history_window(),
      control_rate_per_sec: default_control_rate(),
      timeout_secs: default_market_timeout(),
    }
  }
}

/// Transaction building and confirmation.
#[derive(Debug, Clone, Deserialize)]
pub struct TxConfig {
  #[serde(default = "default_confirmation_rounds")]
  pub confirmation_rounds: u64,
  #[serde(default = "default_confirmation_timeout")]
  pub confirmation_timeout_secs: u64,
  /// Added to now when the operator omits a deadline.
  #[serde(default = "default_deadline")]
  pub deadline_secs: u64,
  /// Ledger request timeout.
  #[serde(default = "default_timeout")]
  pub request_timeout_secs: u64,
  #[serde(default = "default_max_retries")]
  pub max_retries: u32,
}

impl Default for TxConfig {
  fn default() -> Self {
    Self {
      confirmation_rounds: default_confirmation_rounds(),
      confirmation_timeout_secs: default_confirmation_timeout(),
      deadline_secs: default_deadline(),
      request_timeout_secs: default_timeout(),
      max_retries: default_max_retries(),
    }
  }
}

/// Metrics and monitoring configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
  /// Enable Prometheus metrics export.
  #[serde(default)]
  pub enabled: bool,
  /// Metrics server bind address.
  #[serde(default = "default_metrics_addr")]
  pub bind_address: String,
  /// Health check endpoint port.
  #[serde(default = "default_health_port")]
  pub health_port: u16,
}

impl Default for MetricsConfig {
  fn default() -> Self {
    Self {
      enabled: false,
      bind_address: default_metrics_addr(),
      health_port: default_health_port(),
    }
  }
}

/// Persistence configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct PersistenceConfig {
  /// Directory for the session file and the transaction journal.
  #[serde(default = "default_data_dir")]
  pub data_dir: String,
}

impl Default for PersistenceConfig {
  fn default() -> Self {
    Self {
      data_dir: default_data_dir(),
    }
  }
}

impl MarketConfig {
  pub const fn poll_interval(&self) -> Duration {
    Duration::from_millis(self.poll_interval_ms)
  }

  pub const fn activity_interval(&self) -> Duration {
    Duration::from_millis(self.activity_interval_ms)
  }
}

// Default value functions for serde

fn default_name() -> String {
  "seltra-client".to_string()
}

fn default_log_level() -> String {
  "info".to_string()
}

fn default_asset_y() -> u64 {
  1
}

fn default_kmd_url() -> String {
  "http://localhost:4002".to_string()
}

fn default_balance_refresh() -> u64 {
  10
}

fn default_keepalive() -> u64 {
  30
}

fn default_timeout() -> u64 {
  10
}

fn default_market_url() -> String {
  "http://localhost:8000".to_string()
}

fn default_poll_interval() -> u64 {
  2_000
}

fn default_activity_interval() -> u64 {
  5_000
}

fn default_history_window() -> u32 {
  100
}

fn default_control_rate() -> u32 {
  2
}

fn default_market_timeout() -> u64 {
  5
}

fn default_confirmation_rounds() -> u64 {
  4
}

fn default_confirmation_timeout() -> u64 {
  30
}

fn default_deadline() -> u64 {
  3_600
}

fn default_max_retries() -> u32 {
  3
}

fn default_metrics_addr() -> String {
  "0.0.0.0:9090".to_string()
}

fn default_health_port() -> u16 {
  8080
}

fn default_data_dir() -> String {
  "data".to_string()
}
