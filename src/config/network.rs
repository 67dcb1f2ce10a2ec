//! Network resolution - preset, then file overrides, then environment.
//!
//! The result is an immutable [`NetworkConfig`] built once at startup.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// Default token of a local sandbox node.
pub const LOCALNET_TOKEN: &str = "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";

/// Known Algorand networks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkPreset {
  Localnet,
  Testnet,
  Mainnet,
}

impl NetworkPreset {
  pub const fn as_str(&self) -> &'static str {
    match self {
      Self::Localnet => "localnet",
      Self::Testnet => "testnet",
      Self::Mainnet => "mainnet",
    }
  }

  /// Genesis id the node must report.
  pub const fn chain_id(&self) -> &'static str {
    match self {
      Self::Localnet => "dockernet-v1",
      Self::Testnet => "testnet-v1.0",
      Self::Mainnet => "mainnet-v1.0",
    }
  }

  pub const fn ledger_endpoint(&self) -> &'static str {
    match self {
      Self::Localnet => "http://localhost:4001",
      Self::Testnet => "https://testnet-api.algonode.cloud",
      Self::Mainnet => "https://mainnet-api.algonode.cloud",
    }
  }

  pub const fn indexer_endpoint(&self) -> &'static str {
    match self {
      Self::Localnet => "http://localhost:8980",
      Self::Testnet => "https://testnet-idx.algonode.cloud",
      Self::Mainnet => "https://mainnet-idx.algonode.cloud",
    }
  }

  /// Public endpoints take no token.
  pub const fn ledger_token(&self) -> &'static str {
    match self {
      Self::Localnet => LOCALNET_TOKEN,
      Self::Testnet | Self::Mainnet => "",
    }
  }
}

impl fmt::Display for NetworkPreset {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for NetworkPreset {
  type Err = anyhow::Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_lowercase().as_str() {
      "localnet" => Ok(Self::Localnet),
      "testnet" => Ok(Self::Testnet),
      "mainnet" => Ok(Self::Mainnet),
      other => anyhow::bail!("unknown network {other:?}, expected localnet, testnet or mainnet"),
    }
  }
}

/// `[network]` section: preset plus optional overrides.
#[derive(Debug, Clone, Deserialize)]
pub struct NetworkSection {
  #[serde(default = "default_preset")]
  pub preset: NetworkPreset,
  pub algod_server: Option<String>,
  pub algod_token: Option<String>,
  pub indexer_server: Option<String>,
  /// Expected genesis id; defaults to the preset's.
  pub chain_id: Option<String>,
}

impl Default for NetworkSection {
  fn default() -> Self {
    Self {
      preset: default_preset(),
      algod_server: None,
      algod_token: None,
      indexer_server: None,
      chain_id: None,
    }
  }
}

fn default_preset() -> NetworkPreset {
  NetworkPreset::Localnet
}

/// Resolved, immutable network settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkConfig {
  pub ledger_endpoint: String,
  pub ledger_token: String,
  pub indexer_endpoint: String,
  pub network_tag: String,
  pub chain_id: String,
}

impl NetworkConfig {
  /// Resolve `section` against its preset, then apply environment
  /// overrides (`ALGOD_SERVER`, `ALGOD_TOKEN`, `INDEXER_SERVER`).
  pub fn resolve(section: &NetworkSection, env: impl Fn(&str) -> Option<String>) -> Self {
    let preset = section.preset;
    let pick = |var: &str, file: &Option<String>, fallback: &str| {
      env(var)
        .filter(|v| !v.is_empty())
        .or_else(|| file.clone())
        .unwrap_or_else(|| fallback.to_string())
    };

    Self {
      ledger_endpoint: pick("ALGOD_SERVER", &section.algod_server, preset.ledger_endpoint()),
      ledger_token: pick("ALGOD_TOKEN", &section.algod_token, preset.ledger_token()),
      indexer_endpoint: pick("INDEXER_SERVER", &section.indexer_server, preset.indexer_endpoint()),
      network_tag: preset.as_str().to_string(),
      chain_id: section
        .chain_id
        .clone()
        .unwrap_or_else(|| preset.chain_id().to_string()),
    }
  }
}
