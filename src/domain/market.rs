//! Market simulation domain types.
//!
//! The simulator backend owns price generation; the client only
//! mirrors its state and sends control requests. Control enums are
//! closed so invalid names never leave the process.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Largest accepted price shock (fraction of price, either sign).
pub const MAX_SHOCK_MAGNITUDE: f64 = 0.5;

/// Default shock duration in seconds.
pub const DEFAULT_SHOCK_DURATION_SECS: u64 = 60;

/// Rejected control value.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ControlError {
    #[error("unknown {kind} {value:?}, expected one of: {expected}")]
    UnknownName {
        kind: &'static str,
        value: String,
        expected: String,
    },
    #[error("shock magnitude must be between -0.5 and 0.5, got {0}")]
    ShockMagnitude(f64),
    #[error("shock duration must be positive")]
    ShockDuration,
}

/// Declares a closed, string-backed control enum.
macro_rules! named_enum {
    ($(#[$meta:meta])* $name:ident, $kind:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $text)]
                $variant,
            )+
        }

        impl $name {
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            pub const fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ControlError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim() {
                    $($text => Ok(Self::$variant),)+
                    other => Err(ControlError::UnknownName {
                        kind: $kind,
                        value: other.to_string(),
                        expected: Self::ALL
                            .iter()
                            .map(Self::as_str)
                            .collect::<Vec<_>>()
                            .join(", "),
                    }),
                }
            }
        }
    };
}

named_enum!(
    /// Market scenario driving the price process.
    Scenario, "scenario", {
        Normal => "normal",
        Volatile => "volatile",
        Calm => "calm",
        Trending => "trending",
        MeanReverting => "mean_reverting",
        FlashCrash => "flash_crash",
        WhaleActivity => "whale_activity",
    }
);

named_enum!(
    /// Volatility regime of the simulator.
    VolatilityRegime, "regime", {
        Low => "low",
        Medium => "medium",
        High => "high",
    }
);

named_enum!(
    /// Trading pattern of the simulated wallets.
    TradingPattern, "pattern", {
        Normal => "normal",
        Volatile => "volatile",
    }
);

named_enum!(
    /// Preset combining scenario, regime and trading pattern.
    DemoScenario, "demo scenario", {
        CalmMarket => "calm_market",
        VolatileSpike => "volatile_spike",
        FlashCrash => "flash_crash",
        WhaleActivity => "whale_activity",
    }
);

/// A validated one-off price shock.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PriceShock {
    magnitude: f64,
    duration: u64,
}

impl PriceShock {
    pub fn new(magnitude: f64, duration: u64) -> Result<Self, ControlError> {
        if !magnitude.is_finite() || magnitude.abs() > MAX_SHOCK_MAGNITUDE {
            return Err(ControlError::ShockMagnitude(magnitude));
        }
        if duration == 0 {
            return Err(ControlError::ShockDuration);
        }
        Ok(Self {
            magnitude,
            duration,
        })
    }

    pub const fn magnitude(&self) -> f64 {
        self.magnitude
    }

    pub const fn duration(&self) -> u64 {
        self.duration
    }
}

/// One sample of the simulated price series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub price: f64,
    pub volume: f64,
    pub timestamp: f64,
}

/// Merged view of one poll tick. Replaced whole, never patched.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketSnapshot {
    pub price: f64,
    pub volume: f64,
    pub volatility: f64,
    pub regime: String,
    pub scenario: String,
    pub timestamp: DateTime<Utc>,
    pub price_history: Vec<PricePoint>,
}

/// Reachability of the simulator backend as seen by the poller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Connectivity {
    /// No tick has completed yet.
    Unknown,
    Connected,
    Lost,
}

impl Connectivity {
    /// `true` unless the last tick failed.
    pub const fn is_usable(&self) -> bool {
        !matches!(self, Self::Lost)
    }
}

/// A transaction queued by the blockchain simulator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingSimTransaction {
    pub wallet_address: String,
    pub transaction_type: String,
    pub size: f64,
    pub target_time: f64,
    pub time_until_execution: f64,
}

/// A wallet driven by the blockchain simulator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimWallet {
    pub address: String,
    pub pattern: String,
    #[serde(default)]
    pub algo_balance: f64,
    #[serde(default)]
    pub total_transactions: u64,
    #[serde(default)]
    pub success_rate: f64,
    #[serde(default)]
    pub total_volume: f64,
}

/// Simulated chain activity, polled on its own cadence.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivitySnapshot {
    pub pending_transactions: Vec<PendingSimTransaction>,
    pub wallets: Vec<SimWallet>,
    pub whale_count: u64,
    pub retail_count: u64,
    pub timestamp: DateTime<Utc>,
}
