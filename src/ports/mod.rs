//! Ports Layer - Hexagonal Architecture Boundaries
//!
//! Interfaces the use cases require from the outside world.
//! Adapters implement these traits; tests mock them.
//!
//! Port categories:
//! - `LedgerClient`: Algorand node reads and group submission
//! - `WalletConnector`: account connection and interactive signing
//! - `MarketApi`: market simulation backend
//! - `Repository`: transaction journal and stored session

pub mod ledger;
pub mod market_api;
pub mod repository;
pub mod wallet;
