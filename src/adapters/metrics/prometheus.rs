//! Prometheus Metrics Registry - Client Observability
//!
//! Registers and exposes Prometheus metrics for pool operations,
//! pool refreshes, market polling and the wallet balance.

use std::sync::Arc;

use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use prometheus::{
    Encoder, Gauge, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts,
    Registry, TextEncoder,
};
use tokio::sync::broadcast;
use tracing::{info, instrument, warn};

/// Centralized Prometheus metrics for the client.
///
/// All metrics follow the naming convention `seltra_client_*`.
pub struct MetricsRegistry {
    registry: Registry,
    /// Terminal operations by kind and outcome label.
    pub transactions: IntCounterVec,
    /// Submit-to-confirmation latency (milliseconds).
    pub confirmation_latency_ms: HistogramVec,
    /// Pool refreshes by source label.
    pub pool_refreshes: IntCounterVec,
    /// Failed market poll ticks.
    pub market_poll_failures: IntCounter,
    /// Market connectivity (1 = connected, 0 = lost).
    pub market_connected: IntGauge,
    /// Native balance of the connected account.
    pub wallet_balance_microalgos: Gauge,
}

impl MetricsRegistry {
    /// Create and register all Prometheus metrics.
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let transactions = IntCounterVec::new(
            Opts::new(
                "seltra_client_transactions_total",
                "Pool operations by kind and outcome",
            ),
            &["op", "outcome"],
        )?;

        let confirmation_latency_ms = HistogramVec::new(
            HistogramOpts::new(
                "seltra_client_confirmation_latency_ms",
                "Time from submission to confirmation in milliseconds",
            )
            .buckets(vec![
                500.0, 1_000.0, 2_500.0, 4_000.0, 6_000.0, 10_000.0, 20_000.0, 40_000.0,
            ]),
            &["op"],
        )?;

        let pool_refreshes = IntCounterVec::new(
            Opts::new(
                "seltra_client_pool_refresh_total",
                "Pool state refreshes by snapshot source",
            ),
            &["source"],
        )?;

        let market_poll_failures = IntCounter::new(
            "seltra_client_market_poll_failures_total",
            "Market poll ticks that failed",
        )?;

        let market_connected = IntGauge::new(
            "seltra_client_market_connected",
            "Market simulator connectivity (1=connected, 0=lost)",
        )?;

        let wallet_balance_microalgos = Gauge::new(
            "seltra_client_wallet_balance_microalgos",
            "Native balance of the connected account",
        )?;

        registry.register(Box::new(transactions.clone()))?;
        registry.register(Box::new(confirmation_latency_ms.clone()))?;
        registry.register(Box::new(pool_refreshes.clone()))?;
        registry.register(Box::new(market_poll_failures.clone()))?;
        registry.register(Box::new(market_connected.clone()))?;
        registry.register(Box::new(wallet_balance_microalgos.clone()))?;

        Ok(Self {
            registry,
            transactions,
            confirmation_latency_ms,
            pool_refreshes,
            market_poll_failures,
            market_connected,
            wallet_balance_microalgos,
        })
    }

    /// Render all metrics in the Prometheus text format.
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }

    /// Serve Prometheus metrics on the configured bind address.
    #[instrument(skip(self, shutdown_rx))]
    pub async fn serve(
        self: Arc<Self>,
        bind_address: String,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) -> anyhow::Result<()> {
        let metrics_self = Arc::clone(&self);

        let app = Router::new().route(
            "/metrics",
            get(move || {
                let metrics = Arc::clone(&metrics_self);
                async move {
                    match metrics.render() {
                        Ok(body) => (StatusCode::OK, body),
                        Err(e) => {
                            warn!(error = %e, "Failed to encode metrics");
                            (StatusCode::INTERNAL_SERVER_ERROR, String::new())
                        }
                    }
                }
            }),
        );

        let listener = tokio::net::TcpListener::bind(&bind_address).await?;
        info!(address = %bind_address, "Prometheus metrics server started");

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
            })
            .await?;

        Ok(())
    }
}
