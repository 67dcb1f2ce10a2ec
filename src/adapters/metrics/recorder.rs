//! Metrics Recorder - feeds Prometheus and health state from use-case channels
//!
//! Observes the orchestrator's progress broadcast and the poller,
//! pool and session watches. Confirmation latency is measured per
//! operation from `AwaitingConfirmation` to its terminal stage.

use std::collections::HashMap;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{broadcast, watch};
use tracing::{debug, info, instrument};
use uuid::Uuid;

use super::health::HealthState;
use super::prometheus::MetricsRegistry;
use crate::domain::market::Connectivity;
use crate::domain::pool::{FallbackReason, PoolSnapshot, PoolSource};
use crate::domain::transaction::{TxProgress, TxStage};
use crate::domain::wallet::WalletSession;

/// Channels the recorder listens to.
pub struct RecorderInputs {
    pub progress: broadcast::Receiver<TxProgress>,
    pub pool: watch::Receiver<PoolSnapshot>,
    pub connectivity: watch::Receiver<Connectivity>,
    /// Running count of failed market ticks.
    pub poll_failures: watch::Receiver<u64>,
    pub session: watch::Receiver<WalletSession>,
}

/// Translates state changes into metric updates.
pub struct MetricsRecorder {
    metrics: Arc<MetricsRegistry>,
    health: Arc<HealthState>,
    /// Submission instants of operations awaiting confirmation.
    in_flight: HashMap<Uuid, Instant>,
    poll_failures_seen: u64,
}

impl MetricsRecorder {
    pub fn new(metrics: Arc<MetricsRegistry>, health: Arc<HealthState>) -> Self {
        Self {
            metrics,
            health,
            in_flight: HashMap::new(),
            poll_failures_seen: 0,
        }
    }

    /// Record one progress event.
    pub fn on_progress(&mut self, progress: &TxProgress) {
        let op = progress.kind.opcode();
        match &progress.stage {
            TxStage::AwaitingConfirmation { .. } => {
                self.in_flight.insert(progress.op_id, Instant::now());
            }
            TxStage::Confirmed { .. } => {
                if let Some(started) = self.in_flight.remove(&progress.op_id) {
                    let elapsed_ms = started.elapsed().as_secs_f64() * 1_000.0;
                    self.metrics
                        .confirmation_latency_ms
                        .with_label_values(&[op])
                        .observe(elapsed_ms);
                }
                self.metrics
                    .transactions
                    .with_label_values(&[op, "confirmed"])
                    .inc();
            }
            TxStage::Failed(error) => {
                self.in_flight.remove(&progress.op_id);
                self.metrics
                    .transactions
                    .with_label_values(&[op, error.label()])
                    .inc();
            }
            _ => {}
        }
    }

    pub fn on_pool(&self, snapshot: &PoolSnapshot) {
        self.metrics
            .pool_refreshes
            .with_label_values(&[snapshot.source.label()])
            .inc();
        match snapshot.source {
            PoolSource::OnChain => self.health.ledger_reachable.store(true, Ordering::Relaxed),
            PoolSource::Fallback(FallbackReason::Unreachable) => {
                self.health.ledger_reachable.store(false, Ordering::Relaxed);
            }
            PoolSource::Fallback(_) => {}
        }
    }

    pub fn on_connectivity(&self, connectivity: Connectivity) {
        match connectivity {
            Connectivity::Connected => {
                self.metrics.market_connected.set(1);
                self.health.market_reachable.store(true, Ordering::Relaxed);
            }
            Connectivity::Lost => {
                self.metrics.market_connected.set(0);
                self.health.market_reachable.store(false, Ordering::Relaxed);
            }
            Connectivity::Unknown => {}
        }
    }

    pub fn on_poll_failures(&mut self, total: u64) {
        let delta = total.saturating_sub(self.poll_failures_seen);
        self.metrics.market_poll_failures.inc_by(delta);
        self.poll_failures_seen = total;
    }

    pub fn on_session(&self, session: &WalletSession) {
        #[allow(clippy::cast_precision_loss)]
        self.metrics
            .wallet_balance_microalgos
            .set(session.balance as f64);
    }

    /// Number of operations submitted but not yet terminal.
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Drive the recorder until shutdown.
    #[instrument(skip_all)]
    pub async fn run(mut self, mut inputs: RecorderInputs, mut shutdown_rx: broadcast::Receiver<()>) {
        info!("Metrics recorder started");
        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => return,
                event = inputs.progress.recv() => match event {
                    Ok(progress) => self.on_progress(&progress),
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        debug!(skipped = n, "Recorder lagged behind progress events");
                    }
                    Err(broadcast::error::RecvError::Closed) => return,
                },
                changed = inputs.pool.changed() => {
                    if changed.is_err() {
                        return;
                    }
                    let snapshot = inputs.pool.borrow_and_update().clone();
                    self.on_pool(&snapshot);
                }
                changed = inputs.connectivity.changed() => {
                    if changed.is_err() {
                        return;
                    }
                    let connectivity = *inputs.connectivity.borrow_and_update();
                    self.on_connectivity(connectivity);
                }
                changed = inputs.poll_failures.changed() => {
                    if changed.is_err() {
                        return;
                    }
                    let total = *inputs.poll_failures.borrow_and_update();
                    self.on_poll_failures(total);
                }
                changed = inputs.session.changed() => {
                    if changed.is_err() {
                        return;
                    }
                    let session = inputs.session.borrow_and_update().clone();
                    self.on_session(&session);
                }
            }
        }
    }
}
