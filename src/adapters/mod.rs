//! Adapters Layer - Hexagonal Architecture Outer Ring
//!
//! Implements the port traits defined in `crate::ports` with concrete
//! external dependencies (HTTP clients, file I/O, stdin). Each
//! sub-module groups adapters by infrastructure concern.
//!
//! Adapter categories:
//! - `ledger`: algod REST v2 client
//! - `wallet`: kmd REST v1 connector and signer
//! - `market`: market simulator REST client
//! - `metrics`: Prometheus metrics export and health checks
//! - `persistence`: session file and JSONL transaction journal
//! - `console`: operator command loop and approval prompts

pub mod console;
pub mod ledger;
pub mod market;
pub mod metrics;
pub mod persistence;
pub mod wallet;
