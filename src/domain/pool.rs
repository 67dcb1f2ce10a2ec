//! Pool state model and the on-chain global-state key table.
//!
//! The pool contract stores its configuration as named uint64 slots.
//! A snapshot is always built whole: either from the decoded key/value
//! table merged over the documented defaults, or entirely from the
//! defaults when the application cannot be read.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Fixed-point scale of on-chain prices (1e8).
pub const PRICE_DECIMALS: u32 = 8;

/// Number of liquidity ranges the pool contract maintains.
pub const RANGE_COUNT: u64 = 3;

pub const KEY_CURRENT_PRICE: &str = "current_price";
pub const KEY_TOTAL_LIQUIDITY: &str = "total_liquidity";
pub const KEY_FEE_RATE: &str = "current_fee_rate";

pub const DEFAULT_CURRENT_PRICE: u64 = 100_000_000;
pub const DEFAULT_TOTAL_LIQUIDITY: u64 = 1_000_000_000;
pub const DEFAULT_FEE_RATE: u64 = 30;

/// Default `(lower, upper, liquidity)` per range id 1..=3.
pub const DEFAULT_RANGES: [(u64, u64, u64); 3] = [
    (90_000_000, 110_000_000, 500_000_000),
    (80_000_000, 120_000_000, 300_000_000),
    (70_000_000, 130_000_000, 200_000_000),
];

/// A single liquidity range of the pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Range {
    pub id: u64,
    pub lower: u64,
    pub upper: u64,
    pub liquidity: u64,
    pub is_active: bool,
}

impl Range {
    /// Build a range and derive its active flag from the pool price.
    ///
    /// A range is active when the price sits inside `[lower, upper]`
    /// and it holds liquidity.
    pub const fn new(id: u64, lower: u64, upper: u64, liquidity: u64, price: u64) -> Self {
        let is_active = lower <= price && price <= upper && liquidity > 0;
        Self {
            id,
            lower,
            upper,
            liquidity,
            is_active,
        }
    }
}

/// Typed view of the pool application's global state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolState {
    pub app_id: u64,
    pub asset_x: u64,
    pub asset_y: u64,
    pub current_price: u64,
    pub total_liquidity: u64,
    pub fee_rate: u64,
    pub ranges: Vec<Range>,
}

impl PoolState {
    /// The documented fallback record used when the application is unreadable.
    pub fn fallback(app_id: u64, asset_x: u64, asset_y: u64) -> Self {
        Self::from_global_state(app_id, asset_x, asset_y, &HashMap::new())
    }

    /// Merge a decoded global-state table over the defaults.
    ///
    /// Keys outside the fixed table are ignored; missing keys take
    /// their default value.
    pub fn from_global_state(
        app_id: u64,
        asset_x: u64,
        asset_y: u64,
        table: &HashMap<String, u64>,
    ) -> Self {
        let read = |key: &str, default: u64| table.get(key).copied().unwrap_or(default);

        let current_price = read(KEY_CURRENT_PRICE, DEFAULT_CURRENT_PRICE);

        let ranges = (1..=RANGE_COUNT)
            .zip(DEFAULT_RANGES)
            .map(|(id, (lower, upper, liquidity))| {
                Range::new(
                    id,
                    read(&range_key(id, "lower"), lower),
                    read(&range_key(id, "upper"), upper),
                    read(&range_key(id, "liquidity"), liquidity),
                    current_price,
                )
            })
            .collect();

        Self {
            app_id,
            asset_x,
            asset_y,
            current_price,
            total_liquidity: read(KEY_TOTAL_LIQUIDITY, DEFAULT_TOTAL_LIQUIDITY),
            fee_rate: read(KEY_FEE_RATE, DEFAULT_FEE_RATE),
            ranges,
        }
    }

    /// Price as a decimal (fixed-point 1e8 unscaled).
    pub fn price(&self) -> Decimal {
        Decimal::from_i128_with_scale(i128::from(self.current_price), PRICE_DECIMALS)
    }

    /// Fee rate as a percentage (basis points / 100).
    pub fn fee_percent(&self) -> Decimal {
        Decimal::from_i128_with_scale(i128::from(self.fee_rate), 2)
    }

    /// The first range containing the current price, if any.
    pub fn active_range(&self) -> Option<&Range> {
        self.ranges.iter().find(|r| r.is_active)
    }
}

/// Global-state key for a range field, e.g. `range2_upper`.
pub fn range_key(range_id: u64, field: &str) -> String {
    format!("range{range_id}_{field}")
}

/// Every key the synchronizer reads from the application.
pub fn known_keys() -> Vec<String> {
    let mut keys = vec![
        KEY_CURRENT_PRICE.to_string(),
        KEY_TOTAL_LIQUIDITY.to_string(),
        KEY_FEE_RATE.to_string(),
    ];
    for id in 1..=RANGE_COUNT {
        for field in ["lower", "upper", "liquidity"] {
            keys.push(range_key(id, field));
        }
    }
    keys
}

/// Why a snapshot was built from defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackReason {
    /// No pool application id configured (id 0).
    NotConfigured,
    /// The ledger answered that the application does not exist.
    NotDeployed,
    /// The ledger could not be reached or returned garbage.
    Unreachable,
    /// No refresh has completed yet.
    NotLoaded,
}

/// Where the cached pool state came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoolSource {
    OnChain,
    Fallback(FallbackReason),
}

impl PoolSource {
    /// Label used for metrics and console output.
    pub const fn label(&self) -> &'static str {
        match self {
            Self::OnChain => "on_chain",
            Self::Fallback(FallbackReason::NotConfigured) => "fallback_not_configured",
            Self::Fallback(FallbackReason::NotDeployed) => "fallback_not_deployed",
            Self::Fallback(FallbackReason::Unreachable) => "fallback_unreachable",
            Self::Fallback(FallbackReason::NotLoaded) => "fallback_not_loaded",
        }
    }
}

/// Pool state plus provenance, replaced as one value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolSnapshot {
    pub state: PoolState,
    pub source: PoolSource,
}

impl PoolSnapshot {
    pub fn fallback(app_id: u64, asset_x: u64, asset_y: u64, reason: FallbackReason) -> Self {
        Self {
            state: PoolState::fallback(app_id, asset_x, asset_y),
            source: PoolSource::Fallback(reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_matches_documented_constants() {
        let state = PoolState::fallback(42, 0, 7);
        assert_eq!(state.app_id, 42);
        assert_eq!(state.current_price, 100_000_000);
        assert_eq!(state.total_liquidity, 1_000_000_000);
        assert_eq!(state.fee_rate, 30);
        assert_eq!(state.ranges.len(), 3);
        assert_eq!(state.ranges[0], Range::new(1, 90_000_000, 110_000_000, 500_000_000, 100_000_000));
        assert_eq!(state.ranges[1].lower, 80_000_000);
        assert_eq!(state.ranges[2].upper, 130_000_000);
        assert!(state.ranges.iter().all(|r| r.is_active));
    }

    #[test]
    fn test_partial_table_merges_with_defaults() {
        let mut table = HashMap::new();
        table.insert("current_price".to_string(), 125_000_000);
        table.insert("range2_liquidity".to_string(), 0);
        table.insert("unrelated_key".to_string(), 99);

        let state = PoolState::from_global_state(1, 0, 7, &table);
        assert_eq!(state.current_price, 125_000_000);
        assert_eq!(state.total_liquidity, DEFAULT_TOTAL_LIQUIDITY);
        assert_eq!(state.ranges[1].liquidity, 0);
        assert_eq!(state.ranges[1].upper, 120_000_000);
        // 125 is outside range1 [90, 110] and range2 has no liquidity.
        assert!(!state.ranges[0].is_active);
        assert!(!state.ranges[1].is_active);
        assert!(state.ranges[2].is_active);
        assert_eq!(state.active_range().map(|r| r.id), Some(3));
    }

    #[test]
    fn test_known_keys_cover_table() {
        let keys = known_keys();
        assert_eq!(keys.len(), 12);
        assert!(keys.contains(&"range3_liquidity".to_string()));
        assert!(keys.contains(&"current_fee_rate".to_string()));
    }

    #[test]
    fn test_decimal_views() {
        let state = PoolState::fallback(1, 0, 7);
        assert_eq!(state.price().to_string(), "1.00000000");
        assert_eq!(state.fee_percent().to_string(), "0.30");
    }
}
