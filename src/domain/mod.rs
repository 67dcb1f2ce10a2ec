//! Domain layer - pool, wallet, market and transaction models.
//!
//! Pure types and functions only: no I/O, no async. The ledger wire
//! form (addresses, canonical encoding, leg construction) lives here
//! too since it must be reproduced bit-exactly and tested in isolation.

pub mod address;
pub mod encoding;
pub mod legs;
pub mod market;
pub mod pool;
pub mod transaction;
pub mod wallet;

pub use address::{Address, AddressError};
pub use encoding::{SuggestedParams, Transaction, TxType};
pub use legs::{build_legs, PoolTarget};
pub use market::{
    ActivitySnapshot, Connectivity, ControlError, DemoScenario, MarketSnapshot, PricePoint,
    PriceShock, Scenario, TradingPattern, VolatilityRegime,
};
pub use pool::{FallbackReason, PoolSnapshot, PoolSource, PoolState, Range};
pub use transaction::{
    AddLiquidityRequest, OperationKind, RemoveLiquidityRequest, SwapRequest, TransactionRequest,
    TransactionResult, TxErrorKind, TxProgress, TxStage, NATIVE_ASSET_ID,
};
pub use wallet::WalletSession;
