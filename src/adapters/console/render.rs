//! Plain-text rendering of client state for the console.

use std::fmt::Write;

use crate::domain::market::{ActivitySnapshot, Connectivity, MarketSnapshot};
use crate::domain::pool::PoolSnapshot;
use crate::domain::transaction::{TransactionResult, TxProgress, TxStage};
use crate::domain::wallet::WalletSession;
use crate::ports::repository::TxRecord;

/// Pending transactions and wallets listed before truncation.
const ACTIVITY_ROWS: usize = 5;

pub fn session(session: &WalletSession) -> String {
    let Some(address) = session.connected_address() else {
        return "wallet: not connected".to_string();
    };
    let mut out = format!(
        "wallet: {} ({})\n  balance: {} ALGO",
        address.short(),
        address,
        session.balance_algo()
    );
    let mut assets: Vec<_> = session.asset_balances.iter().collect();
    assets.sort_unstable();
    for (id, amount) in assets {
        let _ = write!(out, "\n  asset {id}: {amount}");
    }
    out
}

pub fn pool(snapshot: &PoolSnapshot) -> String {
    let state = &snapshot.state;
    let mut out = format!(
        "pool app {} [{}]\n  assets: {} / {}\n  price: {}  fee: {}%  liquidity: {}",
        state.app_id,
        snapshot.source.label(),
        state.asset_x,
        state.asset_y,
        state.price(),
        state.fee_percent(),
        state.total_liquidity
    );
    for range in &state.ranges {
        let _ = write!(
            out,
            "\n  range {}: [{}, {}] liquidity {}{}",
            range.id,
            range.lower,
            range.upper,
            range.liquidity,
            if range.is_active { " (active)" } else { "" }
        );
    }
    out
}

pub fn market(snapshot: Option<&MarketSnapshot>, connectivity: Connectivity) -> String {
    let status = match connectivity {
        Connectivity::Unknown => "connecting",
        Connectivity::Connected => "connected",
        Connectivity::Lost => "connection lost",
    };
    let Some(snap) = snapshot else {
        return format!("market: no data yet ({status})");
    };
    format!(
        "market: {status}\n  price: {:.6}  volume: {:.2}  volatility: {:.4}\n  scenario: {}  regime: {}  history: {} points  at {}",
        snap.price,
        snap.volume,
        snap.volatility,
        snap.scenario,
        snap.regime,
        snap.price_history.len(),
        snap.timestamp.format("%H:%M:%S")
    )
}

pub fn activity(snapshot: Option<&ActivitySnapshot>) -> String {
    let Some(snap) = snapshot else {
        return "activity: no data yet".to_string();
    };
    let mut out = format!(
        "activity: {} pending, {} wallets ({} whale / {} retail)",
        snap.pending_transactions.len(),
        snap.wallets.len(),
        snap.whale_count,
        snap.retail_count
    );
    for tx in snap.pending_transactions.iter().take(ACTIVITY_ROWS) {
        let _ = write!(
            out,
            "\n  {} {} {:.2} in {:.1}s",
            tx.wallet_address, tx.transaction_type, tx.size, tx.time_until_execution
        );
    }
    out
}

pub fn history(records: &[TxRecord]) -> String {
    if records.is_empty() {
        return "history: empty".to_string();
    }
    let mut out = String::from("history:");
    for r in records {
        let outcome = match (&r.tx_id, &r.error) {
            (Some(tx_id), _) => format!("confirmed {tx_id} round {}", r.confirmed_round.unwrap_or(0)),
            (None, Some(e)) => format!("failed: {e}"),
            (None, None) => "unknown".to_string(),
        };
        let _ = write!(
            out,
            "\n  {} {:<16} {outcome}",
            r.timestamp.format("%Y-%m-%d %H:%M:%S"),
            r.kind.opcode()
        );
    }
    out
}

pub fn result(result: &TransactionResult) -> String {
    match result {
        TransactionResult::Confirmed {
            tx_id,
            confirmed_round,
        } => format!("confirmed: {tx_id} in round {confirmed_round}"),
        TransactionResult::Failed { error } => format!("failed: {error}"),
    }
}

/// One line per stage transition, `None` for terminal stages (the
/// result line covers those).
pub fn progress(progress: &TxProgress) -> Option<String> {
    let stage = match &progress.stage {
        TxStage::Idle | TxStage::Confirmed { .. } | TxStage::Failed(_) => return None,
        TxStage::BuildingLegs => "building transaction group".to_string(),
        TxStage::AwaitingSignature => "waiting for signature".to_string(),
        TxStage::Submitting => "submitting".to_string(),
        TxStage::AwaitingConfirmation { tx_id } => format!("submitted {tx_id}, waiting for confirmation"),
    };
    Some(format!("[{}] {stage}", progress.kind.opcode()))
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use super::*;
    use crate::domain::address::Address;
    use crate::domain::pool::FallbackReason;
    use crate::domain::transaction::{OperationKind, TxErrorKind};

    #[test]
    fn test_disconnected_session() {
        assert_eq!(session(&WalletSession::default()), "wallet: not connected");
    }

    #[test]
    fn test_connected_session_lists_assets_sorted() {
        let mut s = WalletSession::connected(Address::new([7; 32]));
        s.balance = 2_500_000;
        s.asset_balances.insert(20, 5);
        s.asset_balances.insert(10, 3);
        let text = session(&s);
        assert!(text.contains("2.500000 ALGO"));
        let first = text.find("asset 10").unwrap();
        let second = text.find("asset 20").unwrap();
        assert!(first < second);
    }

    #[test]
    fn test_pool_marks_active_range_and_source() {
        let snap = PoolSnapshot::fallback(0, 0, 1, FallbackReason::NotConfigured);
        let text = pool(&snap);
        assert!(text.contains("fallback_not_configured"));
        assert!(text.contains("(active)"));
    }

    #[test]
    fn test_market_without_data() {
        assert_eq!(
            market(None, Connectivity::Lost),
            "market: no data yet (connection lost)"
        );
    }

    #[test]
    fn test_result_lines() {
        let ok = TransactionResult::Confirmed {
            tx_id: "ABC".into(),
            confirmed_round: 12,
        };
        assert_eq!(result(&ok), "confirmed: ABC in round 12");
        let err = TransactionResult::failed(TxErrorKind::WalletNotConnected);
        assert_eq!(result(&err), "failed: Wallet not connected");
    }

    #[test]
    fn test_history_line() {
        let record = TxRecord {
            op_id: Uuid::new_v4(),
            kind: OperationKind::Swap,
            success: false,
            tx_id: None,
            confirmed_round: None,
            error: Some(TxErrorKind::UserRejected),
            timestamp: Utc::now(),
        };
        let text = history(&[record]);
        assert!(text.contains("swap"));
        assert!(text.contains("failed: Signature request rejected by user"));
    }

    #[test]
    fn test_terminal_progress_is_silent() {
        let p = TxProgress::new(Uuid::new_v4(), OperationKind::Swap, TxStage::Failed(TxErrorKind::UserRejected));
        assert!(progress(&p).is_none());
        let p = TxProgress::new(Uuid::new_v4(), OperationKind::Swap, TxStage::Submitting);
        assert_eq!(progress(&p).unwrap(), "[swap] submitting");
    }
}
