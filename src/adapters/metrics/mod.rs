//! Metrics and Monitoring Adapters
//!
//! Prometheus metrics export and health check endpoints (/live,
//! /ready) via axum 0.7, plus the recorder that feeds both from
//! transaction progress events.

pub mod health;
pub mod prometheus;
pub mod recorder;

pub use health::{HealthServer, HealthState};
pub use prometheus::MetricsRegistry;
