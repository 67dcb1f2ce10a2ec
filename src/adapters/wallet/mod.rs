//! Wallet Adapter
//!
//! Sub-modules:
//! - `kmd`: `WalletConnector` over the kmd REST API, with handle keepalive
//! - `types`: kmd request/response types

pub mod kmd;
pub mod types;

pub use kmd::{KmdConfig, KmdWallet};
