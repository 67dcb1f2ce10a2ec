//! Console command grammar.
//!
//! One command per line, whitespace-separated arguments. Parsing never
//! touches the network; errors are printed by the REPL and the loop
//! continues.

use std::str::FromStr;

use thiserror::Error;

use crate::domain::market::{
    ControlError, DemoScenario, PriceShock, Scenario, TradingPattern, VolatilityRegime,
    DEFAULT_SHOCK_DURATION_SECS,
};

/// Rejected console input.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("unknown command {0:?}, type `help`")]
    Unknown(String),
    #[error("usage: {0}")]
    Usage(&'static str),
    #[error("{name} must be a non-negative integer, got {value:?}")]
    Integer { name: &'static str, value: String },
    #[error("{name} must be a number, got {value:?}")]
    Number { name: &'static str, value: String },
    #[error(transparent)]
    Control(#[from] ControlError),
}

/// A parsed operator command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Help,
    Status,
    Connect,
    Disconnect,
    Balance,
    Pool,
    Refresh,
    Market,
    Activity,
    History,
    Swap {
        asset_in: u64,
        asset_out: u64,
        amount_in: u64,
        min_out: u64,
        deadline: Option<u64>,
    },
    Add {
        amount_x: u64,
        amount_y: u64,
        min_x: u64,
        min_y: u64,
        range_id: u64,
        deadline: Option<u64>,
    },
    Remove {
        lp_tokens: u64,
        range_id: u64,
    },
    Scenario(Scenario),
    Regime(VolatilityRegime),
    Shock(PriceShock),
    Pattern(TradingPattern),
    Demo(DemoScenario),
    Quit,
}

const SWAP_USAGE: &str = "swap <assetIn> <assetOut> <amountIn> <minOut> [deadline]";
const ADD_USAGE: &str = "add <amountX> <amountY> <minX> <minY> <rangeId> [deadline]";
const REMOVE_USAGE: &str = "remove <lpTokens> <rangeId>";
const SHOCK_USAGE: &str = "shock <magnitude> [duration]";

pub const HELP: &str = "\
commands:
  status                         session, pool and market summary
  connect | disconnect           wallet session
  balance                        refresh and show balances
  pool | refresh                 show | reload pool state
  market | activity              latest simulator snapshots
  history                        recent journaled operations
  swap <assetIn> <assetOut> <amountIn> <minOut> [deadline]
  add <amountX> <amountY> <minX> <minY> <rangeId> [deadline]
  remove <lpTokens> <rangeId>
  scenario <name> | regime <name> | pattern <name> | demo <name>
  shock <magnitude> [duration]
  quit";

impl Command {
    /// Parse one input line. Blank lines yield `Ok(None)`.
    pub fn parse(line: &str) -> Result<Option<Self>, ParseError> {
        let mut words = line.split_whitespace();
        let Some(head) = words.next() else {
            return Ok(None);
        };
        let args: Vec<&str> = words.collect();

        let command = match head.to_ascii_lowercase().as_str() {
            "help" | "?" => Self::Help,
            "status" => Self::Status,
            "connect" => Self::Connect,
            "disconnect" => Self::Disconnect,
            "balance" => Self::Balance,
            "pool" => Self::Pool,
            "refresh" => Self::Refresh,
            "market" => Self::Market,
            "activity" => Self::Activity,
            "history" => Self::History,
            "quit" | "exit" => Self::Quit,
            "swap" => {
                arity(&args, 4, 5, SWAP_USAGE)?;
                Self::Swap {
                    asset_in: integer("assetIn", args[0])?,
                    asset_out: integer("assetOut", args[1])?,
                    amount_in: integer("amountIn", args[2])?,
                    min_out: integer("minOut", args[3])?,
                    deadline: args.get(4).map(|v| integer("deadline", v)).transpose()?,
                }
            }
            "add" => {
                arity(&args, 5, 6, ADD_USAGE)?;
                Self::Add {
                    amount_x: integer("amountX", args[0])?,
                    amount_y: integer("amountY", args[1])?,
                    min_x: integer("minX", args[2])?,
                    min_y: integer("minY", args[3])?,
                    range_id: integer("rangeId", args[4])?,
                    deadline: args.get(5).map(|v| integer("deadline", v)).transpose()?,
                }
            }
            "remove" => {
                arity(&args, 2, 2, REMOVE_USAGE)?;
                Self::Remove {
                    lp_tokens: integer("lpTokens", args[0])?,
                    range_id: integer("rangeId", args[1])?,
                }
            }
            "shock" => {
                arity(&args, 1, 2, SHOCK_USAGE)?;
                let magnitude = number("magnitude", args[0])?;
                let duration = match args.get(1) {
                    Some(v) => integer("duration", v)?,
                    None => DEFAULT_SHOCK_DURATION_SECS,
                };
                Self::Shock(PriceShock::new(magnitude, duration)?)
            }
            "scenario" => Self::Scenario(named(&args, "scenario <name>")?),
            "regime" => Self::Regime(named(&args, "regime <name>")?),
            "pattern" => Self::Pattern(named(&args, "pattern <name>")?),
            "demo" => Self::Demo(named(&args, "demo <name>")?),
            other => return Err(ParseError::Unknown(other.to_string())),
        };
        Ok(Some(command))
    }
}

/// Deadline used when the operator omits one.
pub const fn default_deadline(now_secs: u64, deadline_secs: u64) -> u64 {
    now_secs.saturating_add(deadline_secs)
}

fn arity(args: &[&str], min: usize, max: usize, usage: &'static str) -> Result<(), ParseError> {
    if (min..=max).contains(&args.len()) {
        Ok(())
    } else {
        Err(ParseError::Usage(usage))
    }
}

fn integer(name: &'static str, value: &str) -> Result<u64, ParseError> {
    value.parse().map_err(|_| ParseError::Integer {
        name,
        value: value.to_string(),
    })
}

fn number(name: &'static str, value: &str) -> Result<f64, ParseError> {
    value.parse().map_err(|_| ParseError::Number {
        name,
        value: value.to_string(),
    })
}

fn named<T>(args: &[&str], usage: &'static str) -> Result<T, ParseError>
where
    T: FromStr<Err = ControlError>,
{
    arity(args, 1, 1, usage)?;
    Ok(args[0].parse()?)
}
