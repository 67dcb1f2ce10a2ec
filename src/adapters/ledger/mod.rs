//! Algorand Ledger Adapter
//!
//! Sub-modules:
//! - `client`: token-authenticated HTTP client with retries
//! - `algod`: `LedgerClient` implementation over REST v2
//! - `types`: response types and global-state decoding

pub mod algod;
pub mod client;
pub mod types;

pub use algod::AlgodLedger;
pub use client::{AlgodClientConfig, AlgodHttp};
