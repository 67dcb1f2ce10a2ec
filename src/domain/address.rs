//! Algorand account addresses.
//!
//! An address is a 32-byte ed25519 public key. Its text form is the
//! RFC 4648 base32 encoding (no padding) of the key followed by a
//! 4-byte checksum, the tail of SHA-512/256 over the key.
//!
//! Application accounts have no key pair: their address is the
//! SHA-512/256 digest of `"appID" || app_id` (big-endian), which is
//! where funding legs of a pool operation are sent.

use std::fmt;
use std::str::FromStr;

use data_encoding::{DecodeKind, BASE32_NOPAD};
use sha2::{Digest, Sha512_256};
use thiserror::Error;

const CHECKSUM_LEN: usize = 4;

/// Length of an address in its text form.
pub const ADDRESS_TEXT_LEN: usize = 58;

/// Address parse failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    #[error("address must be 58 characters, got {0}")]
    Length(usize),
    #[error("invalid base32 character {0:?}")]
    Alphabet(char),
    #[error("invalid base32 text: {0}")]
    Base32(data_encoding::DecodeError),
    #[error("address checksum mismatch")]
    Checksum,
}

/// A 32-byte Algorand account address.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address([u8; 32]);

impl Address {
    /// Wrap a raw public key.
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Derived account of an application (escrow of the pool contract).
    pub fn for_application(app_id: u64) -> Self {
        let mut preimage = Vec::with_capacity(13);
        preimage.extend_from_slice(b"appID");
        preimage.extend_from_slice(&app_id.to_be_bytes());
        Self(sha512_256(&preimage))
    }

    /// Raw public key bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    fn checksum(&self) -> [u8; CHECKSUM_LEN] {
        let digest = sha512_256(&self.0);
        let mut out = [0u8; CHECKSUM_LEN];
        out.copy_from_slice(&digest[32 - CHECKSUM_LEN..]);
        out
    }

    /// Abbreviated form for logs and console output.
    pub fn short(&self) -> String {
        let full = self.to_string();
        format!("{}...{}", &full[..6], &full[full.len() - 4..])
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut raw = Vec::with_capacity(32 + CHECKSUM_LEN);
        raw.extend_from_slice(&self.0);
        raw.extend_from_slice(&self.checksum());
        f.write_str(&BASE32_NOPAD.encode(&raw))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({self})")
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.len() != ADDRESS_TEXT_LEN {
            return Err(AddressError::Length(s.len()));
        }

        // 58 chars carry 290 bits; the last 2 must be zero.
        let raw = BASE32_NOPAD.decode(s.as_bytes()).map_err(|e| match e.kind {
            DecodeKind::Symbol => s
                .get(e.position..)
                .and_then(|rest| rest.chars().next())
                .map_or(AddressError::Base32(e), AddressError::Alphabet),
            _ => AddressError::Base32(e),
        })?;

        let mut key = [0u8; 32];
        key.copy_from_slice(&raw[..32]);
        let address = Self(key);

        if raw[32..32 + CHECKSUM_LEN] != address.checksum() {
            return Err(AddressError::Checksum);
        }

        Ok(address)
    }
}

/// SHA-512/256 digest as a fixed array.
pub fn sha512_256(data: &[u8]) -> [u8; 32] {
    let digest = Sha512_256::digest(data);
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest);
    out
}
