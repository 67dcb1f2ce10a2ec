//! Use Cases Layer - Application Business Logic
//!
//! Orchestrates domain logic with port interfaces. Each use case owns
//! one piece of shared state and publishes it through a `watch` or
//! `broadcast` channel; nothing else mutates it.
//!
//! Use cases:
//! - `SessionManager`: wallet session bootstrap, connect, disconnect
//! - `PoolSynchronizer`: cached pool application state
//! - `TransactionOrchestrator`: swap / add / remove groups end to end
//! - `MarketPoller`: simulator snapshots and control requests
//! - `TransactionJournal`: terminal outcomes to local storage

pub mod journal;
pub mod market_poller;
pub mod orchestrator;
pub mod pool_sync;
pub mod session_manager;
