//! Market Simulation Adapter
//!
//! Sub-modules:
//! - `client`: `MarketApi` over the simulator REST API, with control throttling
//! - `types`: request/response types

pub mod client;
pub mod types;

pub use client::{SimulatorClient, SimulatorClientConfig};
