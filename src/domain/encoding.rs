//! Canonical transaction encoding, transaction ids and group ids.
//!
//! The ledger hashes the canonical MessagePack form of a transaction:
//! map keys sorted bytewise, zero and empty fields omitted, byte strings
//! as `bin`. Fields of [`Transaction`] are declared in key order so
//! `rmp_serde::to_vec_named` emits them already sorted.

use data_encoding::BASE32_NOPAD;
use serde::ser::SerializeSeq;
use serde::{Serialize, Serializer};
use thiserror::Error;

use super::address::{sha512_256, Address};

/// Width of the validity window in rounds.
pub const VALIDITY_WINDOW: u64 = 1_000;

/// Domain separator for transaction ids.
const TX_PREFIX: &[u8] = b"TX";
/// Domain separator for group ids.
const GROUP_PREFIX: &[u8] = b"TG";

#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("msgpack encoding failed: {0}")]
    Msgpack(String),
    #[error("empty transaction group")]
    EmptyGroup,
}

/// Network parameters needed to build a leg.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuggestedParams {
    pub min_fee: u64,
    pub genesis_id: String,
    pub genesis_hash: [u8; 32],
    pub last_round: u64,
}

/// Leg type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxType {
    Payment,
    AssetTransfer,
    ApplicationCall,
}

impl TxType {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Payment => "pay",
            Self::AssetTransfer => "axfer",
            Self::ApplicationCall => "appl",
        }
    }
}

/// One leg of an atomic group.
///
/// A single record covers payments, asset transfers and application
/// calls; unused fields stay at zero and are omitted from the encoding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transaction {
    #[serde(rename = "aamt", skip_serializing_if = "is_zero")]
    pub asset_amount: u64,
    #[serde(rename = "amt", skip_serializing_if = "is_zero")]
    pub amount: u64,
    #[serde(rename = "apaa", skip_serializing_if = "Vec::is_empty", serialize_with = "bin_list")]
    pub app_args: Vec<Vec<u8>>,
    #[serde(rename = "apas", skip_serializing_if = "Vec::is_empty")]
    pub foreign_assets: Vec<u64>,
    #[serde(rename = "apid", skip_serializing_if = "is_zero")]
    pub app_id: u64,
    #[serde(rename = "arcv", skip_serializing_if = "Option::is_none", serialize_with = "opt_address")]
    pub asset_receiver: Option<Address>,
    #[serde(skip_serializing_if = "is_zero")]
    pub fee: u64,
    #[serde(rename = "fv", skip_serializing_if = "is_zero")]
    pub first_valid: u64,
    #[serde(rename = "gen", skip_serializing_if = "String::is_empty")]
    pub genesis_id: String,
    #[serde(rename = "gh", serialize_with = "bin32")]
    pub genesis_hash: [u8; 32],
    #[serde(rename = "grp", skip_serializing_if = "Option::is_none", serialize_with = "opt_bin32")]
    pub group: Option<[u8; 32]>,
    #[serde(rename = "lv", skip_serializing_if = "is_zero")]
    pub last_valid: u64,
    #[serde(skip_serializing_if = "Vec::is_empty", serialize_with = "bin")]
    pub note: Vec<u8>,
    #[serde(rename = "rcv", skip_serializing_if = "Option::is_none", serialize_with = "opt_address")]
    pub receiver: Option<Address>,
    #[serde(rename = "snd", serialize_with = "address")]
    pub sender: Address,
    #[serde(rename = "type", serialize_with = "tx_type")]
    pub tx_type: TxType,
    #[serde(rename = "xaid", skip_serializing_if = "is_zero")]
    pub asset_id: u64,
}

impl Transaction {
    /// Empty leg of the given type with the common header filled in.
    pub fn with_header(tx_type: TxType, sender: Address, params: &SuggestedParams) -> Self {
        Self {
            asset_amount: 0,
            amount: 0,
            app_args: Vec::new(),
            foreign_assets: Vec::new(),
            app_id: 0,
            asset_receiver: None,
            fee: params.min_fee,
            first_valid: params.last_round,
            genesis_id: params.genesis_id.clone(),
            genesis_hash: params.genesis_hash,
            group: None,
            last_valid: params.last_round + VALIDITY_WINDOW,
            note: Vec::new(),
            receiver: None,
            sender,
            tx_type,
            asset_id: 0,
        }
    }

    /// Canonical MessagePack bytes, the form wallets sign.
    pub fn encode(&self) -> Result<Vec<u8>, EncodeError> {
        rmp_serde::to_vec_named(self).map_err(|e| EncodeError::Msgpack(e.to_string()))
    }

    /// Raw 32-byte id: SHA-512/256 over `"TX" || canonical bytes`.
    pub fn raw_id(&self) -> Result<[u8; 32], EncodeError> {
        let mut preimage = TX_PREFIX.to_vec();
        preimage.extend(self.encode()?);
        Ok(sha512_256(&preimage))
    }

    /// Text transaction id (52 base32 characters).
    pub fn id(&self) -> Result<String, EncodeError> {
        Ok(BASE32_NOPAD.encode(&self.raw_id()?))
    }

    /// One-line summary shown when asking for a signature.
    pub fn describe(&self) -> String {
        let to = |a: Option<Address>| a.map(|a| a.short()).unwrap_or_else(|| "?".to_string());
        match self.tx_type {
            TxType::Payment => format!("pay {} microAlgos to {}", self.amount, to(self.receiver)),
            TxType::AssetTransfer => format!(
                "transfer {} of asset {} to {}",
                self.asset_amount,
                self.asset_id,
                to(self.asset_receiver)
            ),
            TxType::ApplicationCall => {
                let op = self
                    .app_args
                    .first()
                    .map(|a| String::from_utf8_lossy(a).into_owned())
                    .unwrap_or_default();
                let args: Vec<String> = self
                    .app_args
                    .iter()
                    .skip(1)
                    .map(|a| match <[u8; 8]>::try_from(a.as_slice()) {
                        Ok(be) => u64::from_be_bytes(be).to_string(),
                        Err(_) => format!("0x{}", a.iter().map(|b| format!("{b:02x}")).collect::<String>()),
                    })
                    .collect();
                format!("call app {} {}({}) fee {}", self.app_id, op, args.join(", "), self.fee)
            }
        }
    }
}

#[derive(Serialize)]
struct GroupPreimage<'a> {
    #[serde(serialize_with = "bin32_list")]
    txlist: &'a [[u8; 32]],
}

/// Compute the group id of `legs` and stamp it on each, in order.
///
/// Any group id already present is cleared before hashing.
pub fn assign_group(legs: &mut [Transaction]) -> Result<[u8; 32], EncodeError> {
    if legs.is_empty() {
        return Err(EncodeError::EmptyGroup);
    }

    let mut ids = Vec::with_capacity(legs.len());
    for leg in legs.iter_mut() {
        leg.group = None;
        ids.push(leg.raw_id()?);
    }

    let mut preimage = GROUP_PREFIX.to_vec();
    preimage.extend(
        rmp_serde::to_vec_named(&GroupPreimage { txlist: &ids })
            .map_err(|e| EncodeError::Msgpack(e.to_string()))?,
    );
    let group = sha512_256(&preimage);

    for leg in legs.iter_mut() {
        leg.group = Some(group);
    }
    Ok(group)
}

#[allow(clippy::trivially_copy_pass_by_ref)]
const fn is_zero(v: &u64) -> bool {
    *v == 0
}

struct Bin<'a>(&'a [u8]);

impl Serialize for Bin<'_> {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_bytes(self.0)
    }
}

fn bin<S: Serializer>(v: &[u8], s: S) -> Result<S::Ok, S::Error> {
    s.serialize_bytes(v)
}

fn bin32<S: Serializer>(v: &[u8; 32], s: S) -> Result<S::Ok, S::Error> {
    s.serialize_bytes(v)
}

fn opt_bin32<S: Serializer>(v: &Option<[u8; 32]>, s: S) -> Result<S::Ok, S::Error> {
    match v {
        Some(bytes) => s.serialize_bytes(bytes),
        None => s.serialize_none(),
    }
}

fn address<S: Serializer>(v: &Address, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_bytes(v.as_bytes())
}

fn opt_address<S: Serializer>(v: &Option<Address>, s: S) -> Result<S::Ok, S::Error> {
    match v {
        Some(addr) => s.serialize_bytes(addr.as_bytes()),
        None => s.serialize_none(),
    }
}

fn bin_list<S: Serializer>(v: &[Vec<u8>], s: S) -> Result<S::Ok, S::Error> {
    let mut seq = s.serialize_seq(Some(v.len()))?;
    for item in v {
        seq.serialize_element(&Bin(item))?;
    }
    seq.end()
}

fn bin32_list<S: Serializer>(v: &[[u8; 32]], s: S) -> Result<S::Ok, S::Error> {
    let mut seq = s.serialize_seq(Some(v.len()))?;
    for item in v {
        seq.serialize_element(&Bin(item))?;
    }
    seq.end()
}

fn tx_type<S: Serializer>(v: &TxType, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(v.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> SuggestedParams {
        SuggestedParams {
            min_fee: 1_000,
            genesis_id: "sandnet-v1".to_string(),
            genesis_hash: [9u8; 32],
            last_round: 500,
        }
    }

    fn payment(amount: u64) -> Transaction {
        let mut tx = Transaction::with_header(TxType::Payment, Address::new([1u8; 32]), &params());
        tx.receiver = Some(Address::for_application(1234));
        tx.amount = amount;
        tx
    }

    fn position(haystack: &[u8], needle: &[u8]) -> Option<usize> {
        haystack.windows(needle.len()).position(|w| w == needle)
    }

    #[test]
    fn test_header_uses_min_fee_and_window() {
        let tx = payment(5);
        assert_eq!(tx.fee, 1_000);
        assert_eq!(tx.first_valid, 500);
        assert_eq!(tx.last_valid, 1_500);
    }

    #[test]
    fn test_encoding_keys_sorted_and_zeros_omitted() {
        let bytes = payment(5).encode().unwrap();
        // fixmap with amt fee fv gen gh lv rcv snd type
        assert_eq!(bytes[0], 0x80 | 9);
        let keys: [&[u8]; 9] = [b"amt", b"fee", b"fv", b"gen", b"gh", b"lv", b"rcv", b"snd", b"type"];
        let mut last = 0;
        for key in keys {
            let mut encoded = vec![0xa0 | key.len() as u8];
            encoded.extend_from_slice(key);
            let at = position(&bytes, &encoded).unwrap();
            assert!(at >= last);
            last = at;
        }
        assert!(position(&bytes, b"apid").is_none());
        assert!(position(&bytes, b"grp").is_none());
    }

    #[test]
    fn test_byte_fields_encode_as_bin() {
        let bytes = payment(5).encode().unwrap();
        // bin8 header followed by the 32-byte genesis hash
        let mut gh = vec![0xc4, 32];
        gh.extend_from_slice(&[9u8; 32]);
        assert!(position(&bytes, &gh).is_some());
    }

    #[test]
    fn test_tx_id_shape_and_determinism() {
        let a = payment(5).id().unwrap();
        let b = payment(5).id().unwrap();
        let c = payment(6).id().unwrap();
        assert_eq!(a.len(), 52);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_assign_group_stamps_every_leg() {
        let mut legs = vec![payment(5), payment(6)];
        let before = legs[0].id().unwrap();
        let group = assign_group(&mut legs).unwrap();
        assert!(legs.iter().all(|l| l.group == Some(group)));
        assert_ne!(legs[0].id().unwrap(), before);
    }

    #[test]
    fn test_assign_group_is_order_sensitive_and_idempotent() {
        let mut forward = vec![payment(5), payment(6)];
        let mut reverse = vec![payment(6), payment(5)];
        let g1 = assign_group(&mut forward).unwrap();
        let g2 = assign_group(&mut reverse).unwrap();
        assert_ne!(g1, g2);
        assert_eq!(assign_group(&mut forward).unwrap(), g1);
    }

    #[test]
    fn test_empty_group_rejected() {
        assert!(matches!(assign_group(&mut []), Err(EncodeError::EmptyGroup)));
    }
}
