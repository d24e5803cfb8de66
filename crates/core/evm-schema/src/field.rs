//! Field definitions

use arrow::datatypes::DataType;
use evm_codec::{
    Address, Calldata, Canonical, CanonicalEncoder, EncodingError, EncodingPolicy, Hash32,
    StorageValue, TraceAddress, UInt128, UInt160, UInt256,
};

/// Semantic type of a stored field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    /// Non-negative block height.
    BlockNumber,
    Int64,
    Address,
    Hash32,
    UInt256,
    UInt160,
    UInt128,
    /// Arbitrary-length opaque bytes.
    Calldata,
    TraceAddress,
    Text,
    /// Opaque JSON blob, stored verbatim.
    Json,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BlockNumber => "block_number",
            Self::Int64 => "int64",
            Self::Address => "address",
            Self::Hash32 => "hash32",
            Self::UInt256 => "uint256",
            Self::UInt160 => "uint160",
            Self::UInt128 => "uint128",
            Self::Calldata => "calldata",
            Self::TraceAddress => "trace_address",
            Self::Text => "text",
            Self::Json => "json",
        }
    }

    /// Whether values of this type go through the canonical encoder.
    pub fn is_encoded(&self) -> bool {
        matches!(
            self,
            Self::Address
                | Self::Hash32
                | Self::UInt256
                | Self::UInt160
                | Self::UInt128
                | Self::Calldata
                | Self::TraceAddress
        )
    }

    /// Whether the physical layout of this type depends on the encoding policy.
    pub fn is_byte_oriented(&self) -> bool {
        matches!(self, Self::Address | Self::Hash32 | Self::Calldata)
    }

    /// Decodes `value` as this type and re-encodes it under the encoder's policy.
    ///
    /// Returns `None` for types that are not encoded.
    pub(crate) fn canonicalize(
        &self,
        encoder: &CanonicalEncoder,
        value: &StorageValue,
    ) -> Option<Result<StorageValue, EncodingError>> {
        let canonical = match self {
            Self::Address => encoder.canonicalize::<Address>(value),
            Self::Hash32 => encoder.canonicalize::<Hash32>(value),
            Self::UInt256 => encoder.canonicalize::<UInt256>(value),
            Self::UInt160 => encoder.canonicalize::<UInt160>(value),
            Self::UInt128 => encoder.canonicalize::<UInt128>(value),
            Self::Calldata => encoder.canonicalize::<Calldata>(value),
            Self::TraceAddress => encoder.canonicalize::<TraceAddress>(value),
            Self::BlockNumber | Self::Int64 | Self::Text | Self::Json => return None,
        };
        Some(canonical)
    }

    /// Columnar type under the given policy.
    ///
    /// Integers wider than 64 bits are kept as decimal strings, since no arrow decimal type
    /// holds 78 digits.
    pub fn arrow_type(&self, policy: EncodingPolicy) -> DataType {
        match (self, policy) {
            (Self::BlockNumber, _) => DataType::UInt64,
            (Self::Int64, _) => DataType::Int64,
            (Self::Address, EncodingPolicy::Binary) => DataType::FixedSizeBinary(20),
            (Self::Hash32, EncodingPolicy::Binary) => DataType::FixedSizeBinary(32),
            (Self::Calldata, EncodingPolicy::Binary) => DataType::Binary,
            (Self::Address | Self::Hash32 | Self::Calldata, EncodingPolicy::Textual) => {
                DataType::Utf8
            }
            (
                Self::UInt256
                | Self::UInt160
                | Self::UInt128
                | Self::TraceAddress
                | Self::Text
                | Self::Json,
                _,
            ) => DataType::Utf8,
        }
    }
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named, typed field of an entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDef {
    pub name: &'static str,
    pub ty: FieldType,
    pub nullable: bool,
    /// Needs a secondary index for equality or range lookups.
    pub indexed: bool,
    pub unique: bool,
}

impl FieldDef {
    pub fn new(name: &'static str, ty: FieldType, nullable: bool) -> Self {
        Self {
            name,
            ty,
            nullable,
            indexed: false,
            unique: false,
        }
    }

    pub fn indexed(self) -> Self {
        Self {
            indexed: true,
            ..self
        }
    }

    pub fn unique(self) -> Self {
        Self {
            unique: true,
            ..self
        }
    }
}
