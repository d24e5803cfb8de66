//! Canonical storage encoding for EVM chain primitives.
//!
//! Every primitive stored by the ingestion pipeline (addresses, 32-byte hashes, fixed-width
//! unsigned integers, opaque calldata and call-trace paths) has exactly one canonical storage
//! representation per [`EncodingPolicy`]. [`Canonical::encode`] and [`Canonical::decode`] are
//! mutual inverses, and decoding never truncates or coerces: malformed input fails with
//! [`EncodingError`].
//!
//! The encoder knows nothing about the storage backend. The backend picks a policy once (hex
//! text or raw bytes) and builds a [`CanonicalEncoder`] from it.

mod bytes;
mod error;
mod policy;
mod trace_address;
mod uint;

pub use alloy::primitives::{Address, B256 as Hash32, Bytes as Calldata, U128, U160, U256};

pub use self::{
    bytes::{ByteInput, parse_address, parse_calldata, parse_hash32},
    error::EncodingError,
    policy::EncodingPolicy,
    trace_address::TraceAddress,
    uint::FixedWidthUint,
};

/// 256-bit unsigned integer, stored with up to 78 decimal digits.
pub type UInt256 = U256;
/// 160-bit unsigned integer, stored with up to 49 decimal digits.
pub type UInt160 = U160;
/// 128-bit unsigned integer, stored with up to 39 decimal digits.
pub type UInt128 = U128;

/// A primitive value in its storage-neutral physical form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StorageValue {
    Text(String),
    Binary(Vec<u8>),
}

impl StorageValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            Self::Binary(_) => None,
        }
    }

    pub fn as_binary(&self) -> Option<&[u8]> {
        match self {
            Self::Text(_) => None,
            Self::Binary(b) => Some(b),
        }
    }
}

/// A chain primitive with a canonical storage representation.
pub trait Canonical: Sized {
    /// Human readable primitive name, used in error messages.
    const PRIMITIVE: &'static str;

    /// Encodes the value into its canonical physical form under `policy`.
    fn encode(&self, policy: EncodingPolicy) -> StorageValue;

    /// Decodes a value from either physical form.
    fn decode(value: &StorageValue) -> Result<Self, EncodingError>;
}

/// Encoder bound to the storage policy selected at initialization.
///
/// Clones are cheap, and every component that writes rows should share the same instance so
/// that all values land in the same physical layout.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CanonicalEncoder {
    policy: EncodingPolicy,
}

impl CanonicalEncoder {
    pub const fn new(policy: EncodingPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> EncodingPolicy {
        self.policy
    }

    pub fn encode<T: Canonical>(&self, value: &T) -> StorageValue {
        value.encode(self.policy)
    }

    pub fn encode_opt<T: Canonical>(&self, value: Option<&T>) -> Option<StorageValue> {
        value.map(|v| self.encode(v))
    }

    /// Decoding accepts both physical layouts regardless of the configured policy.
    pub fn decode<T: Canonical>(&self, value: &StorageValue) -> Result<T, EncodingError> {
        T::decode(value)
    }

    /// Rewrites `value` into the canonical form of this encoder's policy.
    ///
    /// Fails if `value` does not decode as a `T`.
    pub fn canonicalize<T: Canonical>(
        &self,
        value: &StorageValue,
    ) -> Result<StorageValue, EncodingError> {
        T::decode(value).map(|v| self.encode(&v))
    }
}
