//! Configuration Loader - File Loading and Validation
//!
//! Handles locating and loading `config.toml`, applying environment
//! overrides for secrets, and validating all parameters with clear
//! error messages.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;

use super::AppConfig;

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "SELTRA_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Config path: first CLI argument, else `SELTRA_CONFIG`, else `config.toml`.
pub fn config_path(arg: Option<String>, env: impl Fn(&str) -> Option<String>) -> PathBuf {
  arg
    .or_else(|| env(CONFIG_ENV))
    .filter(|p| !p.is_empty())
    .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from)
}

/// Load, apply environment secrets, and validate.
///
/// A missing file at the default path yields the built-in defaults; a
/// missing file that was named explicitly is an error.
pub fn load_config(path: &Path, explicit: bool) -> Result<AppConfig> {
  let mut config = if path.exists() || explicit {
    let content = std::fs::read_to_string(path)
      .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    parse_config(&content)?
  } else {
    AppConfig::default()
  };

  apply_env_secrets(&mut config, |k| std::env::var(k).ok());
  validate_config(&config)?;

  info!(
    path = %path.display(),
    network = %config.network.preset,
    app_id = config.pool.app_id,
    "Configuration loaded successfully"
  );

  Ok(config)
}

/// Parse TOML text into an [`AppConfig`].
pub fn parse_config(content: &str) -> Result<AppConfig> {
  toml::from_str(content).with_context(|| "Failed to parse config.toml")
}

/// Fill wallet secrets left empty in the file from `KMD_TOKEN` and
/// `KMD_PASSWORD`.
pub fn apply_env_secrets(config: &mut AppConfig, env: impl Fn(&str) -> Option<String>) {
  if config.wallet.kmd_token.is_empty() {
    if let Some(token) = env("KMD_TOKEN") {
      config.wallet.kmd_token = token;
    }
  }
  if config.wallet.wallet_password.is_empty() {
    if let Some(password) = env("KMD_PASSWORD") {
      config.wallet.wallet_password = password;
    }
  }
}

/// Validate all configuration parameters.
pub fn validate_config(config: &AppConfig) -> Result<()> {
  // Endpoints
  anyhow::ensure!(
    !config.wallet.kmd_url.is_empty(),
    "wallet.kmd_url must not be empty"
  );
  anyhow::ensure!(
    !config.market.base_url.is_empty(),
    "market.base_url must not be empty"
  );
  if let Some(server) = &config.network.algod_server {
    anyhow::ensure!(!server.is_empty(), "network.algod_server must not be empty");
  }

  // Cadences
  anyhow::ensure!(
    config.market.poll_interval_ms > 0,
    "market.poll_interval_ms must be positive"
  );
  anyhow::ensure!(
    config.market.activity_interval_ms > 0,
    "market.activity_interval_ms must be positive"
  );
  anyhow::ensure!(
    config.market.control_rate_per_sec > 0,
    "market.control_rate_per_sec must be positive"
  );
  anyhow::ensure!(
    config.wallet.balance_refresh_secs > 0,
    "wallet.balance_refresh_secs must be positive"
  );
  anyhow::ensure!(
    config.wallet.keepalive_secs > 0,
    "wallet.keepalive_secs must be positive"
  );

  // Transactions
  anyhow::ensure!(
    config.tx.confirmation_rounds > 0,
    "tx.confirmation_rounds must be positive"
  );
  anyhow::ensure!(
    config.tx.confirmation_timeout_secs > 0,
    "tx.confirmation_timeout_secs must be positive"
  );

  // Pool
  anyhow::ensure!(
    config.pool.asset_x != config.pool.asset_y,
    "pool.asset_x and pool.asset_y must differ, both are {}",
    config.pool.asset_x
  );

  Ok(())
}
