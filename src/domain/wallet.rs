//! Wallet session state.

use std::collections::HashMap;

use rust_decimal::Decimal;

use super::address::Address;

/// microAlgos per Algo.
pub const MICROALGO_DECIMALS: u32 = 6;

/// The operator's connection to the wallet. At most one account.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WalletSession {
    pub is_connected: bool,
    pub address: Option<Address>,
    /// Native balance in microAlgos.
    pub balance: u64,
    /// Asset id → holding in base units.
    pub asset_balances: HashMap<u64, u64>,
}

impl WalletSession {
    /// A connected session with no balance loaded yet.
    pub fn connected(address: Address) -> Self {
        Self {
            is_connected: true,
            address: Some(address),
            ..Self::default()
        }
    }

    /// Address of a connected session, `None` otherwise.
    pub fn connected_address(&self) -> Option<Address> {
        if self.is_connected { self.address } else { None }
    }

    /// Holding of an asset; id 0 is the native balance.
    pub fn holding(&self, asset_id: u64) -> u64 {
        if asset_id == 0 {
            self.balance
        } else {
            self.asset_balances.get(&asset_id).copied().unwrap_or(0)
        }
    }

    /// Native balance in Algos.
    pub fn balance_algo(&self) -> Decimal {
        Decimal::from_i128_with_scale(i128::from(self.balance), MICROALGO_DECIMALS)
    }
}
