//! Pool operation requests, outcomes and the per-operation state machine.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Asset id of the native currency (ALGO).
pub const NATIVE_ASSET_ID: u64 = 0;

/// Returns `true` for the native-asset sentinel.
pub const fn is_native(asset_id: u64) -> bool {
    asset_id == NATIVE_ASSET_ID
}

/// Swap one pool asset for the other.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapRequest {
    pub asset_in: u64,
    pub asset_out: u64,
    pub amount_in: u64,
    pub min_amount_out: u64,
    /// Unix seconds after which the contract rejects the call.
    pub deadline: u64,
}

/// Deposit both assets into one range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddLiquidityRequest {
    pub asset_x: u64,
    pub asset_y: u64,
    pub amount_x_desired: u64,
    pub amount_y_desired: u64,
    pub amount_x_min: u64,
    pub amount_y_min: u64,
    pub range_id: u64,
    pub deadline: u64,
}

/// Burn LP tokens of one range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveLiquidityRequest {
    pub lp_tokens: u64,
    pub range_id: u64,
}

/// An operator-initiated pool operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TransactionRequest {
    Swap(SwapRequest),
    AddLiquidity(AddLiquidityRequest),
    RemoveLiquidity(RemoveLiquidityRequest),
}

impl TransactionRequest {
    /// Operation kind, also the contract opcode tag.
    pub const fn kind(&self) -> OperationKind {
        match self {
            Self::Swap(_) => OperationKind::Swap,
            Self::AddLiquidity(_) => OperationKind::AddLiquidity,
            Self::RemoveLiquidity(_) => OperationKind::RemoveLiquidity,
        }
    }

    /// Local sanity checks, run before any network access.
    pub fn validate(&self) -> Result<(), TxErrorKind> {
        let invalid = |msg: &str| Err(TxErrorKind::InvalidRequest(msg.to_string()));
        match self {
            Self::Swap(req) => {
                if req.amount_in == 0 {
                    return invalid("swap amount must be positive");
                }
                if req.asset_in == req.asset_out {
                    return invalid("swap assets must differ");
                }
            }
            Self::AddLiquidity(req) => {
                if req.amount_x_desired == 0 && req.amount_y_desired == 0 {
                    return invalid("at least one deposit amount must be positive");
                }
                if req.amount_x_min > req.amount_x_desired || req.amount_y_min > req.amount_y_desired {
                    return invalid("minimum amounts cannot exceed desired amounts");
                }
                check_range(req.range_id)?;
            }
            Self::RemoveLiquidity(req) => {
                if req.lp_tokens == 0 {
                    return invalid("LP token amount must be positive");
                }
                check_range(req.range_id)?;
            }
        }
        Ok(())
    }
}

fn check_range(range_id: u64) -> Result<(), TxErrorKind> {
    if (1..=super::pool::RANGE_COUNT).contains(&range_id) {
        Ok(())
    } else {
        Err(TxErrorKind::InvalidRequest(format!(
            "range id must be 1..={}, got {range_id}",
            super::pool::RANGE_COUNT
        )))
    }
}

/// The three supported pool operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Swap,
    AddLiquidity,
    RemoveLiquidity,
}

impl OperationKind {
    /// Opcode tag carried as the first application argument.
    pub const fn opcode(&self) -> &'static str {
        match self {
            Self::Swap => "swap",
            Self::AddLiquidity => "add_liquidity",
            Self::RemoveLiquidity => "remove_liquidity",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.opcode())
    }
}

/// Why an operation ended in `Failed`.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum TxErrorKind {
    #[error("Wallet not connected")]
    WalletNotConnected,
    #[error("Signature request rejected by user")]
    UserRejected,
    #[error("Submission failed: {0}")]
    SubmissionFailed(String),
    #[error("Confirmation of {tx_id} timed out after {rounds} rounds")]
    ConfirmationTimeout { rounds: u64, tx_id: String },
    #[error("Ledger unavailable: {0}")]
    LedgerUnavailable(String),
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("Pool application not configured")]
    PoolNotConfigured,
}

impl TxErrorKind {
    /// Short label for metrics.
    pub const fn label(&self) -> &'static str {
        match self {
            Self::WalletNotConnected => "wallet_not_connected",
            Self::UserRejected => "user_rejected",
            Self::SubmissionFailed(_) => "submission_failed",
            Self::ConfirmationTimeout { .. } => "confirmation_timeout",
            Self::LedgerUnavailable(_) => "ledger_unavailable",
            Self::InvalidRequest(_) => "invalid_request",
            Self::PoolNotConfigured => "pool_not_configured",
        }
    }

    /// Id of a group that reached the ledger before the failure.
    pub fn tx_id(&self) -> Option<&str> {
        match self {
            Self::ConfirmationTimeout { tx_id, .. } => Some(tx_id),
            _ => None,
        }
    }
}

/// Caller-facing outcome of an operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TransactionResult {
    Confirmed { tx_id: String, confirmed_round: u64 },
    Failed { error: TxErrorKind },
}

impl TransactionResult {
    pub const fn failed(error: TxErrorKind) -> Self {
        Self::Failed { error }
    }

    pub const fn success(&self) -> bool {
        matches!(self, Self::Confirmed { .. })
    }

    pub fn tx_id(&self) -> Option<&str> {
        match self {
            Self::Confirmed { tx_id, .. } => Some(tx_id),
            Self::Failed { error } => error.tx_id(),
        }
    }

    pub const fn error(&self) -> Option<&TxErrorKind> {
        match self {
            Self::Confirmed { .. } => None,
            Self::Failed { error } => Some(error),
        }
    }
}

/// Stages of one operation. `Confirmed` and `Failed` are terminal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TxStage {
    Idle,
    BuildingLegs,
    AwaitingSignature,
    Submitting,
    AwaitingConfirmation { tx_id: String },
    Confirmed { tx_id: String, round: u64 },
    Failed(TxErrorKind),
}

impl TxStage {
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Confirmed { .. } | Self::Failed(_))
    }

    /// Whether `next` is a legal successor of `self`.
    pub const fn can_advance_to(&self, next: &Self) -> bool {
        matches!(
            (self, next),
            (Self::Idle, Self::BuildingLegs)
                | (Self::BuildingLegs, Self::AwaitingSignature)
                | (Self::AwaitingSignature, Self::Submitting)
                | (Self::Submitting, Self::AwaitingConfirmation { .. })
                | (Self::AwaitingConfirmation { .. }, Self::Confirmed { .. })
                | (Self::Idle | Self::BuildingLegs | Self::AwaitingSignature
                    | Self::Submitting | Self::AwaitingConfirmation { .. }, Self::Failed(_))
        )
    }
}

/// One stage transition, broadcast to observers (journal, metrics, console).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TxProgress {
    pub op_id: Uuid,
    pub kind: OperationKind,
    pub stage: TxStage,
    pub at: DateTime<Utc>,
}

impl TxProgress {
    pub fn new(op_id: Uuid, kind: OperationKind, stage: TxStage) -> Self {
        Self {
            op_id,
            kind,
            stage,
            at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn swap(asset_in: u64, asset_out: u64, amount_in: u64) -> TransactionRequest {
        TransactionRequest::Swap(SwapRequest {
            asset_in,
            asset_out,
            amount_in,
            min_amount_out: 0,
            deadline: 0,
        })
    }

    #[test]
    fn test_wallet_not_connected_message() {
        assert_eq!(TxErrorKind::WalletNotConnected.to_string(), "Wallet not connected");
    }

    #[test]
    fn test_swap_validation() {
        assert!(swap(0, 7, 1_000_000).validate().is_ok());
        assert!(matches!(
            swap(7, 7, 1).validate(),
            Err(TxErrorKind::InvalidRequest(_))
        ));
        assert!(swap(0, 7, 0).validate().is_err());
    }

    #[test]
    fn test_remove_liquidity_range_bounds() {
        let ok = TransactionRequest::RemoveLiquidity(RemoveLiquidityRequest {
            lp_tokens: 10,
            range_id: 3,
        });
        let bad = TransactionRequest::RemoveLiquidity(RemoveLiquidityRequest {
            lp_tokens: 10,
            range_id: 4,
        });
        assert!(ok.validate().is_ok());
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_opcode_tags() {
        assert_eq!(OperationKind::Swap.opcode(), "swap");
        assert_eq!(OperationKind::AddLiquidity.opcode(), "add_liquidity");
        assert_eq!(OperationKind::RemoveLiquidity.opcode(), "remove_liquidity");
    }

    #[test]
    fn test_result_accessors() {
        let ok = TransactionResult::Confirmed {
            tx_id: "TX1".to_string(),
            confirmed_round: 9,
        };
        assert!(ok.success());
        assert_eq!(ok.tx_id(), Some("TX1"));

        let failed = TransactionResult::failed(TxErrorKind::UserRejected);
        assert!(!failed.success());
        assert_eq!(failed.error(), Some(&TxErrorKind::UserRejected));
        assert_eq!(failed.tx_id(), None);

        let timed_out = TransactionResult::failed(TxErrorKind::ConfirmationTimeout {
            rounds: 4,
            tx_id: "TX2".to_string(),
        });
        assert_eq!(timed_out.tx_id(), Some("TX2"));
        assert_eq!(
            timed_out.error().map(ToString::to_string).as_deref(),
            Some("Confirmation of TX2 timed out after 4 rounds")
        );
    }

    #[test]
    fn test_stage_transitions() {
        assert!(TxStage::Idle.can_advance_to(&TxStage::BuildingLegs));
        assert!(TxStage::Submitting.can_advance_to(&TxStage::AwaitingConfirmation {
            tx_id: "X".into()
        }));
        assert!(!TxStage::Idle.can_advance_to(&TxStage::Submitting));
        assert!(!TxStage::Confirmed { tx_id: "X".into(), round: 1 }
            .can_advance_to(&TxStage::Failed(TxErrorKind::UserRejected)));
        assert!(TxStage::Failed(TxErrorKind::UserRejected).is_terminal());
    }
}
