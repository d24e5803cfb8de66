//! Byte-oriented primitives: addresses, 32-byte hashes and opaque calldata

use alloy::primitives::{Address, B256, Bytes};

use crate::{Canonical, EncodingError, EncodingPolicy, StorageValue};

/// Input accepted for byte-oriented primitives: either raw bytes or a hex string.
///
/// Hex strings may carry a `0x`/`0X` prefix and use either letter case.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteInput<'a> {
    Raw(&'a [u8]),
    Hex(&'a str),
}

impl<'a> From<&'a [u8]> for ByteInput<'a> {
    fn from(value: &'a [u8]) -> Self {
        Self::Raw(value)
    }
}

impl<'a, const N: usize> From<&'a [u8; N]> for ByteInput<'a> {
    fn from(value: &'a [u8; N]) -> Self {
        Self::Raw(value.as_slice())
    }
}

impl<'a> From<&'a Vec<u8>> for ByteInput<'a> {
    fn from(value: &'a Vec<u8>) -> Self {
        Self::Raw(value.as_slice())
    }
}

impl<'a> From<&'a str> for ByteInput<'a> {
    fn from(value: &'a str) -> Self {
        Self::Hex(value)
    }
}

impl<'a> From<&'a String> for ByteInput<'a> {
    fn from(value: &'a String) -> Self {
        Self::Hex(value.as_str())
    }
}

/// Parses a 20-byte address from raw bytes or hex.
pub fn parse_address<'a>(input: impl Into<ByteInput<'a>>) -> Result<Address, EncodingError> {
    let bytes = input_bytes(input.into(), Address::PRIMITIVE)?;
    check_len(Address::PRIMITIVE, 20, bytes.len())?;
    Ok(Address::from_slice(&bytes))
}

/// Parses a 32-byte hash from raw bytes or hex.
pub fn parse_hash32<'a>(input: impl Into<ByteInput<'a>>) -> Result<B256, EncodingError> {
    let bytes = input_bytes(input.into(), B256::PRIMITIVE)?;
    check_len(B256::PRIMITIVE, 32, bytes.len())?;
    Ok(B256::from_slice(&bytes))
}

/// Parses arbitrary-length calldata from raw bytes or hex.
pub fn parse_calldata<'a>(input: impl Into<ByteInput<'a>>) -> Result<Bytes, EncodingError> {
    input_bytes(input.into(), Bytes::PRIMITIVE).map(Bytes::from)
}

fn input_bytes(input: ByteInput<'_>, primitive: &'static str) -> Result<Vec<u8>, EncodingError> {
    match input {
        ByteInput::Raw(bytes) => Ok(bytes.to_vec()),
        ByteInput::Hex(s) => decode_hex(s, primitive),
    }
}

fn decode_hex(input: &str, primitive: &'static str) -> Result<Vec<u8>, EncodingError> {
    let digits = input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
        .unwrap_or(input);
    hex::decode(digits).map_err(|source| EncodingError::InvalidHex {
        primitive,
        input: input.to_string(),
        source,
    })
}

fn check_len(primitive: &'static str, expected: usize, actual: usize) -> Result<(), EncodingError> {
    if expected != actual {
        return Err(EncodingError::InvalidLength {
            primitive,
            expected,
            actual,
        });
    }
    Ok(())
}

fn encode_bytes(bytes: &[u8], policy: EncodingPolicy) -> StorageValue {
    match policy {
        EncodingPolicy::Textual => StorageValue::Text(format!("0x{}", hex::encode(bytes))),
        EncodingPolicy::Binary => StorageValue::Binary(bytes.to_vec()),
    }
}

fn storage_input(value: &StorageValue) -> ByteInput<'_> {
    match value {
        StorageValue::Text(s) => ByteInput::Hex(s),
        StorageValue::Binary(b) => ByteInput::Raw(b),
    }
}

impl Canonical for Address {
    const PRIMITIVE: &'static str = "address";

    fn encode(&self, policy: EncodingPolicy) -> StorageValue {
        encode_bytes(self.as_slice(), policy)
    }

    fn decode(value: &StorageValue) -> Result<Self, EncodingError> {
        parse_address(storage_input(value))
    }
}

impl Canonical for B256 {
    const PRIMITIVE: &'static str = "hash32";

    fn encode(&self, policy: EncodingPolicy) -> StorageValue {
        encode_bytes(self.as_slice(), policy)
    }

    fn decode(value: &StorageValue) -> Result<Self, EncodingError> {
        parse_hash32(storage_input(value))
    }
}

impl Canonical for Bytes {
    const PRIMITIVE: &'static str = "calldata";

    fn encode(&self, policy: EncodingPolicy) -> StorageValue {
        encode_bytes(self.as_ref(), policy)
    }

    fn decode(value: &StorageValue) -> Result<Self, EncodingError> {
        parse_calldata(storage_input(value))
    }
}
