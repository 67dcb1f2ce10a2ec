//! Operator Console - line-oriented command loop
//!
//! Reads commands from stdin, dispatches them to the use cases and
//! prints plain-text summaries. Transaction progress is echoed as it
//! happens. Bad input is reported and the loop continues.

pub mod command;
pub mod prompt;
pub mod render;

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::broadcast;
use tracing::{info, warn};

pub use command::{Command, ParseError};
pub use prompt::{AutoApproval, ConsoleApproval, ConsoleInput};

use crate::domain::transaction::{AddLiquidityRequest, RemoveLiquidityRequest, SwapRequest};
use crate::ports::ledger::LedgerClient;
use crate::ports::market_api::MarketApi;
use crate::ports::repository::Repository;
use crate::ports::wallet::WalletConnector;
use crate::usecases::journal::TransactionJournal;
use crate::usecases::market_poller::MarketPoller;
use crate::usecases::orchestrator::TransactionOrchestrator;
use crate::usecases::pool_sync::PoolSynchronizer;
use crate::usecases::session_manager::{SessionError, SessionManager};

/// Records shown by `history`.
const HISTORY_LIMIT: usize = 20;

/// Use cases and settings the console drives.
pub struct ConsoleContext<L: LedgerClient, W: WalletConnector, R: Repository, M: MarketApi> {
    pub session: Arc<SessionManager<L, W, R>>,
    pub pool: Arc<PoolSynchronizer<L>>,
    pub orchestrator: Arc<TransactionOrchestrator<L, W>>,
    pub market: Arc<MarketPoller<M>>,
    pub journal: Arc<TransactionJournal<R>>,
    /// Pool assets used for `add`.
    pub asset_x: u64,
    pub asset_y: u64,
    /// Added to now when the operator omits a deadline.
    pub deadline_secs: u64,
}

/// Whether the loop keeps reading after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

pub struct Console<L: LedgerClient, W: WalletConnector, R: Repository, M: MarketApi> {
    ctx: ConsoleContext<L, W, R, M>,
    input: Arc<ConsoleInput>,
}

impl<L: LedgerClient, W: WalletConnector, R: Repository, M: MarketApi> Console<L, W, R, M> {
    pub const fn new(ctx: ConsoleContext<L, W, R, M>, input: Arc<ConsoleInput>) -> Self {
        Self { ctx, input }
    }

    /// Run until `quit`, end of input, or shutdown.
    pub async fn run(self, mut shutdown_rx: broadcast::Receiver<()>) {
        let echo = tokio::spawn(echo_progress(self.ctx.orchestrator.subscribe_progress()));
        println!("seltra client ready, type `help` for commands");

        loop {
            print_prompt();
            let line = tokio::select! {
                _ = shutdown_rx.recv() => break,
                line = self.input.next_line() => line,
            };
            let Some(line) = line else {
                info!("Console input closed");
                break;
            };

            match Command::parse(&line) {
                Ok(None) => {}
                Ok(Some(command)) => {
                    if self.dispatch(command).await == Flow::Quit {
                        break;
                    }
                }
                Err(e) => println!("error: {e}"),
            }
        }

        echo.abort();
    }

    async fn dispatch(&self, command: Command) -> Flow {
        let ctx = &self.ctx;
        match command {
            Command::Help => println!("{}", command::HELP),
            Command::Status => {
                println!("{}", render::session(&ctx.session.snapshot()));
                println!("{}", render::pool(&ctx.pool.snapshot()));
                println!(
                    "{}",
                    render::market(ctx.market.market_snapshot().as_ref(), ctx.market.connectivity())
                );
            }
            Command::Connect => match ctx.session.connect().await {
                Ok(address) => println!("connected {address}"),
                Err(SessionError::UserRejected) => println!("connection rejected"),
                Err(e) => println!("error: {e}"),
            },
            Command::Disconnect => {
                ctx.session.disconnect().await;
                println!("disconnected");
            }
            Command::Balance => {
                if let Err(e) = ctx.session.refresh_balance().await {
                    println!("error: {e}");
                }
                println!("{}", render::session(&ctx.session.snapshot()));
            }
            Command::Pool => println!("{}", render::pool(&ctx.pool.snapshot())),
            Command::Refresh => println!("{}", render::pool(&ctx.pool.refresh().await)),
            Command::Market => println!(
                "{}",
                render::market(ctx.market.market_snapshot().as_ref(), ctx.market.connectivity())
            ),
            Command::Activity => println!("{}", render::activity(ctx.market.activity_snapshot().as_ref())),
            Command::History => match ctx.journal.recent(HISTORY_LIMIT).await {
                Ok(records) => println!("{}", render::history(&records)),
                Err(e) => {
                    warn!(error = %e, "Failed to read transaction journal");
                    println!("error: {e}");
                }
            },
            Command::Swap {
                asset_in,
                asset_out,
                amount_in,
                min_out,
                deadline,
            } => {
                let request = SwapRequest {
                    asset_in,
                    asset_out,
                    amount_in,
                    min_amount_out: min_out,
                    deadline: self.deadline(deadline),
                };
                let result = ctx.orchestrator.execute_swap(request).await;
                println!("{}", render::result(&result));
            }
            Command::Add {
                amount_x,
                amount_y,
                min_x,
                min_y,
                range_id,
                deadline,
            } => {
                let request = AddLiquidityRequest {
                    asset_x: ctx.asset_x,
                    asset_y: ctx.asset_y,
                    amount_x_desired: amount_x,
                    amount_y_desired: amount_y,
                    amount_x_min: min_x,
                    amount_y_min: min_y,
                    range_id,
                    deadline: self.deadline(deadline),
                };
                let result = ctx.orchestrator.execute_add_liquidity(request).await;
                println!("{}", render::result(&result));
            }
            Command::Remove { lp_tokens, range_id } => {
                let request = RemoveLiquidityRequest { lp_tokens, range_id };
                let result = ctx.orchestrator.execute_remove_liquidity(request).await;
                println!("{}", render::result(&result));
            }
            Command::Scenario(scenario) => {
                ctx.market.set_scenario(scenario);
                println!("scenario -> {scenario}");
            }
            Command::Regime(regime) => {
                ctx.market.set_volatility_regime(regime);
                println!("regime -> {regime}");
            }
            Command::Shock(shock) => {
                ctx.market.add_price_shock(shock);
                println!("shock {:+} for {}s", shock.magnitude(), shock.duration());
            }
            Command::Pattern(pattern) => {
                ctx.market.set_trading_pattern(pattern);
                println!("pattern -> {pattern}");
            }
            Command::Demo(demo) => {
                ctx.market.trigger_demo_scenario(demo);
                println!("demo -> {demo}");
            }
            Command::Quit => return Flow::Quit,
        }
        Flow::Continue
    }

    fn deadline(&self, explicit: Option<u64>) -> u64 {
        explicit.unwrap_or_else(|| {
            let now = u64::try_from(Utc::now().timestamp()).unwrap_or(0);
            command::default_deadline(now, self.ctx.deadline_secs)
        })
    }
}

fn print_prompt() {
    use std::io::Write;
    let mut out = std::io::stdout().lock();
    let _ = write!(out, "> ");
    let _ = out.flush();
}

async fn echo_progress(mut rx: broadcast::Receiver<crate::domain::transaction::TxProgress>) {
    loop {
        match rx.recv().await {
            Ok(progress) => {
                if let Some(line) = render::progress(&progress) {
                    println!("{line}");
                }
            }
            Err(broadcast::error::RecvError::Lagged(_)) => {}
            Err(broadcast::error::RecvError::Closed) => return,
        }
    }
}
