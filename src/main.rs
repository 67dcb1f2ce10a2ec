//! Seltra Client - Entry Point
//!
//! Initializes configuration, logging, the ledger, wallet and market
//! clients, and the operator console. Runs until `quit`, end of input
//! or SIGINT.
//!
//! Wiring sequence:
//! 1. Locate and load config.toml + validate
//! 2. Init tracing (JSON structured logging to stderr)
//! 3. Resolve NetworkConfig (preset → file → env)
//! 4. Create algod, kmd and simulator clients
//! 5. Verify the node's genesis id (mismatch aborts, unreachable warns)
//! 6. Create use cases (session, pool, orchestrator, poller, journal)
//! 7. Spawn background tasks (keepalive, disconnect watch, balance
//!    refresh, market and activity pollers, journal, metrics, health)
//! 8. Restore the wallet session, load the pool, check the simulator
//! 9. Run the console until quit or SIGINT → graceful shutdown

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

use std::path::Path;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::signal;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

mod adapters;
mod config;
mod domain;
mod ports;
mod usecases;

use adapters::console::{AutoApproval, Console, ConsoleApproval, ConsoleContext, ConsoleInput};
use adapters::ledger::{AlgodClientConfig, AlgodHttp, AlgodLedger};
use adapters::market::{SimulatorClient, SimulatorClientConfig};
use adapters::metrics::recorder::{MetricsRecorder, RecorderInputs};
use adapters::metrics::{HealthServer, HealthState, MetricsRegistry};
use adapters::persistence::RepositoryImpl;
use adapters::wallet::{KmdConfig, KmdWallet};
use config::NetworkConfig;
use ports::ledger::LedgerClient;
use ports::wallet::SignatureApproval;
use usecases::journal::TransactionJournal;
use usecases::market_poller::MarketPoller;
use usecases::orchestrator::{ConfirmationPolicy, TransactionOrchestrator};
use usecases::pool_sync::PoolSynchronizer;
use usecases::session_manager::SessionManager;

#[tokio::main]
async fn main() -> Result<()> {
    // ── 1. Load configuration ───────────────────────────────
    let arg = std::env::args().nth(1);
    let explicit = arg.is_some() || std::env::var(config::loader::CONFIG_ENV).is_ok();
    let path = config::loader::config_path(arg, |k| std::env::var(k).ok());
    let config = config::loader::load_config(&path, explicit)
        .context("Failed to load configuration")?;

    // ── 2. Initialize structured JSON logging ───────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.app.log_level)),
        )
        .with_writer(std::io::stderr)
        .json()
        .init();

    // ── 3. Resolve network once ─────────────────────────────
    let network = NetworkConfig::resolve(&config.network, |k| std::env::var(k).ok());

    info!(
        name = %config.app.name,
        version = env!("CARGO_PKG_VERSION"),
        network = %network.network_tag,
        ledger = %network.ledger_endpoint,
        indexer = %network.indexer_endpoint,
        app_id = config.pool.app_id,
        "Starting Seltra client"
    );

    let (shutdown_tx, _shutdown_rx) = broadcast::channel::<()>(1);
    let health = Arc::new(HealthState::new());

    // ── 4. Clients ──────────────────────────────────────────
    let algod_config = AlgodClientConfig {
        base_url: network.ledger_endpoint.clone(),
        token: network.ledger_token.clone(),
        timeout: Duration::from_secs(config.tx.request_timeout_secs),
        max_concurrent: 8,
        max_retries: config.tx.max_retries,
        retry_base_delay: Duration::from_millis(200),
    };
    let ledger = Arc::new(AlgodLedger::new(
        AlgodHttp::new(algod_config).context("Failed to create algod client")?,
    ));

    let input = ConsoleInput::stdin();
    let approval: Arc<dyn SignatureApproval> = if config.wallet.auto_approve {
        warn!("Auto-approve enabled, connections and signatures will not be confirmed");
        Arc::new(AutoApproval)
    } else {
        Arc::new(ConsoleApproval::new(Arc::clone(&input)))
    };
    let kmd_config = KmdConfig {
        base_url: config.wallet.kmd_url.clone(),
        token: config.wallet.kmd_token.clone(),
        wallet_name: config.wallet.wallet_name.clone(),
        wallet_password: config.wallet.wallet_password.clone(),
        timeout: Duration::from_secs(config.wallet.timeout_secs),
        keepalive: Duration::from_secs(config.wallet.keepalive_secs),
    };
    let wallet = Arc::new(KmdWallet::new(kmd_config, approval).context("Failed to create kmd client")?);

    let market_api = Arc::new(
        SimulatorClient::new(SimulatorClientConfig {
            base_url: config.market.base_url.clone(),
            timeout: Duration::from_secs(config.market.timeout_secs),
            control_rate_per_sec: config.market.control_rate_per_sec,
        })
        .context("Failed to create market simulator client")?,
    );

    let repo = Arc::new(
        RepositoryImpl::from_data_dir(Path::new(&config.persistence.data_dir))
            .await
            .context("Failed to initialize local storage")?,
    );

    // ── 5. Genesis check ────────────────────────────────────
    match ledger.suggested_params().await {
        Ok(params) => {
            anyhow::ensure!(
                params.genesis_id == network.chain_id,
                "Ledger genesis id {:?} does not match configured chain id {:?}",
                params.genesis_id,
                network.chain_id
            );
            info!(genesis = %params.genesis_id, round = params.last_round, "Ledger reachable");
        }
        Err(e) => {
            health.ledger_reachable.store(false, Ordering::Relaxed);
            warn!(error = %e, "Ledger unreachable, running degraded");
        }
    }

    // ── 6. Use cases ────────────────────────────────────────
    let session = Arc::new(SessionManager::new(
        Arc::clone(&ledger),
        Arc::clone(&wallet),
        Arc::clone(&repo),
        network.network_tag.clone(),
    ));
    let pool = Arc::new(PoolSynchronizer::new(
        Arc::clone(&ledger),
        config.pool.app_id,
        config.pool.asset_x,
        config.pool.asset_y,
    ));
    let policy = ConfirmationPolicy {
        max_rounds: config.tx.confirmation_rounds,
        timeout: Duration::from_secs(config.tx.confirmation_timeout_secs),
        ..ConfirmationPolicy::default()
    };
    let orchestrator = Arc::new(TransactionOrchestrator::new(
        Arc::clone(&ledger),
        Arc::clone(&wallet),
        Arc::clone(&pool),
        session.subscribe(),
        policy,
    ));
    let poller = Arc::new(MarketPoller::new(Arc::clone(&market_api), config.market.history_window));
    let journal = Arc::new(TransactionJournal::new(Arc::clone(&repo)));

    // ── 7. Background tasks ─────────────────────────────────
    let mut tasks = Vec::new();

    tasks.push(tokio::spawn(
        Arc::clone(&wallet).run_keepalive(shutdown_tx.subscribe()),
    ));
    tasks.push(tokio::spawn(
        Arc::clone(&session).watch_disconnects(shutdown_tx.subscribe()),
    ));
    tasks.push(tokio::spawn(Arc::clone(&session).run_balance_refresh(
        Duration::from_secs(config.wallet.balance_refresh_secs),
        shutdown_tx.subscribe(),
    )));
    tasks.push(tokio::spawn(
        Arc::clone(&poller).run(config.market.poll_interval(), shutdown_tx.subscribe()),
    ));
    tasks.push(tokio::spawn(
        Arc::clone(&poller).run_activity(config.market.activity_interval(), shutdown_tx.subscribe()),
    ));
    tasks.push(tokio::spawn(
        Arc::clone(&journal).run(orchestrator.subscribe_progress(), shutdown_tx.subscribe()),
    ));

    if config.metrics.enabled {
        let metrics = Arc::new(MetricsRegistry::new().context("Failed to register metrics")?);
        let recorder = MetricsRecorder::new(Arc::clone(&metrics), Arc::clone(&health));
        let inputs = RecorderInputs {
            progress: orchestrator.subscribe_progress(),
            pool: pool.subscribe(),
            connectivity: poller.subscribe_connectivity(),
            poll_failures: poller.subscribe_failures(),
            session: session.subscribe(),
        };
        tasks.push(tokio::spawn(recorder.run(inputs, shutdown_tx.subscribe())));

        let bind = config.metrics.bind_address.clone();
        let metrics_shutdown = shutdown_tx.subscribe();
        tasks.push(tokio::spawn(async move {
            if let Err(e) = metrics.serve(bind, metrics_shutdown).await {
                error!(error = %e, "Metrics server failed");
            }
        }));

        let health_server = HealthServer::new(Arc::clone(&health), config.metrics.health_port);
        let health_shutdown = shutdown_tx.subscribe();
        tasks.push(tokio::spawn(async move {
            if let Err(e) = health_server.run(health_shutdown).await {
                error!(error = %e, "Health server failed");
            }
        }));
    }

    // ── 8. Startup checks ───────────────────────────────────
    poller.check_health().await;
    session.initialize().await;
    pool.refresh().await;

    info!("All tasks spawned, client is running");

    // ── 9. Console until quit or SIGINT ─────────────────────
    let console = Console::new(
        ConsoleContext {
            session: Arc::clone(&session),
            pool: Arc::clone(&pool),
            orchestrator: Arc::clone(&orchestrator),
            market: Arc::clone(&poller),
            journal: Arc::clone(&journal),
            asset_x: config.pool.asset_x,
            asset_y: config.pool.asset_y,
            deadline_secs: config.tx.deadline_secs,
        },
        input,
    );
    let console_handle = tokio::spawn(console.run(shutdown_tx.subscribe()));

    tokio::select! {
        _ = signal::ctrl_c() => info!("SIGINT received, initiating graceful shutdown"),
        _ = console_handle => info!("Console closed, shutting down"),
    }

    // ── Graceful shutdown ───────────────────────────────────
    let _ = shutdown_tx.send(());
    info!("Shutdown signal broadcast to all tasks");

    // Submitted groups are awaited by their own tasks; give loops a
    // bounded window to finish their current tick.
    for task in tasks {
        let _ = tokio::time::timeout(Duration::from_secs(5), task).await;
    }

    info!("Shutdown complete");
    Ok(())
}
