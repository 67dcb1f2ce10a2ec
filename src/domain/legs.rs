//! Leg construction for the three pool operations.
//!
//! Leg order and argument order are part of the contract interface:
//! a swap's funding leg precedes its call leg, and integer arguments
//! follow the opcode tag in declaration order.

use super::address::Address;
use super::encoding::{assign_group, EncodeError, SuggestedParams, Transaction, TxType};
use super::transaction::{
    is_native, AddLiquidityRequest, OperationKind, RemoveLiquidityRequest, SwapRequest,
    TransactionRequest,
};

/// Target pool application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolTarget {
    pub app_id: u64,
    pub address: Address,
}

impl PoolTarget {
    pub fn new(app_id: u64) -> Self {
        Self {
            app_id,
            address: Address::for_application(app_id),
        }
    }
}

/// Build the legs of `request`, grouped when there is more than one.
pub fn build_legs(
    request: &TransactionRequest,
    sender: Address,
    params: &SuggestedParams,
    pool: PoolTarget,
) -> Result<Vec<Transaction>, EncodeError> {
    let mut legs = match request {
        TransactionRequest::Swap(req) => swap_legs(req, sender, params, pool),
        TransactionRequest::AddLiquidity(req) => vec![add_liquidity_leg(req, sender, params, pool)],
        TransactionRequest::RemoveLiquidity(req) => {
            vec![remove_liquidity_leg(req, sender, params, pool)]
        }
    };

    if legs.len() > 1 {
        assign_group(&mut legs)?;
    }
    Ok(legs)
}

fn swap_legs(
    req: &SwapRequest,
    sender: Address,
    params: &SuggestedParams,
    pool: PoolTarget,
) -> Vec<Transaction> {
    let funding = if is_native(req.asset_in) {
        let mut pay = Transaction::with_header(TxType::Payment, sender, params);
        pay.receiver = Some(pool.address);
        pay.amount = req.amount_in;
        pay
    } else {
        let mut axfer = Transaction::with_header(TxType::AssetTransfer, sender, params);
        axfer.asset_receiver = Some(pool.address);
        axfer.asset_amount = req.amount_in;
        axfer.asset_id = req.asset_in;
        axfer
    };

    let call = app_call(
        OperationKind::Swap,
        &[req.asset_in, req.asset_out, req.amount_in, req.min_amount_out, req.deadline],
        foreign_assets(&[req.asset_in, req.asset_out]),
        sender,
        params,
        pool,
    );

    vec![funding, call]
}

fn add_liquidity_leg(
    req: &AddLiquidityRequest,
    sender: Address,
    params: &SuggestedParams,
    pool: PoolTarget,
) -> Transaction {
    app_call(
        OperationKind::AddLiquidity,
        &[
            req.asset_x,
            req.asset_y,
            req.amount_x_desired,
            req.amount_y_desired,
            req.amount_x_min,
            req.amount_y_min,
            req.range_id,
            req.deadline,
        ],
        foreign_assets(&[req.asset_x, req.asset_y]),
        sender,
        params,
        pool,
    )
}

fn remove_liquidity_leg(
    req: &RemoveLiquidityRequest,
    sender: Address,
    params: &SuggestedParams,
    pool: PoolTarget,
) -> Transaction {
    app_call(
        OperationKind::RemoveLiquidity,
        &[req.lp_tokens, req.range_id],
        Vec::new(),
        sender,
        params,
        pool,
    )
}

fn app_call(
    op: OperationKind,
    args: &[u64],
    foreign: Vec<u64>,
    sender: Address,
    params: &SuggestedParams,
    pool: PoolTarget,
) -> Transaction {
    let mut call = Transaction::with_header(TxType::ApplicationCall, sender, params);
    call.app_id = pool.app_id;
    call.app_args = encode_args(op, args);
    call.foreign_assets = foreign;
    call
}

/// Opcode tag as UTF-8, then each integer as 8 bytes big-endian.
pub fn encode_args(op: OperationKind, args: &[u64]) -> Vec<Vec<u8>> {
    let mut out = Vec::with_capacity(args.len() + 1);
    out.push(op.opcode().as_bytes().to_vec());
    out.extend(args.iter().map(|a| a.to_be_bytes().to_vec()));
    out
}

/// Non-native assets, deduplicated, in first-seen order.
fn foreign_assets(ids: &[u64]) -> Vec<u64> {
    let mut out = Vec::with_capacity(ids.len());
    for &id in ids {
        if !is_native(id) && !out.contains(&id) {
            out.push(id);
        }
    }
    out
}
