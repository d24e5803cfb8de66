//! Error types for canonical encoding and decoding

/// Errors raised when a primitive value cannot be encoded to, or decoded from, its canonical
/// storage representation.
///
/// These always indicate malformed input or data corruption and are never silently coerced.
#[derive(Debug, thiserror::Error)]
pub enum EncodingError {
    /// The input is not valid hexadecimal.
    #[error("invalid hex for {primitive}: {input:?}: {source}")]
    InvalidHex {
        primitive: &'static str,
        input: String,
        #[source]
        source: hex::FromHexError,
    },

    /// The decoded byte length does not match the fixed width of the primitive.
    #[error("invalid length for {primitive}: expected {expected} bytes, got {actual}")]
    InvalidLength {
        primitive: &'static str,
        expected: usize,
        actual: usize,
    },

    /// The input is not a plain unsigned decimal number.
    #[error("invalid decimal for {primitive}: {input:?}")]
    InvalidDecimal {
        primitive: &'static str,
        input: String,
    },

    /// The decimal representation has more digits than the declared column width allows.
    #[error("{primitive} allows at most {max} decimal digits, got {actual}")]
    TooManyDigits {
        primitive: &'static str,
        max: usize,
        actual: usize,
    },

    /// The value does not fit in the declared bit width.
    #[error("value {value} exceeds the bit width of {primitive}")]
    Overflow {
        primitive: &'static str,
        value: String,
    },

    /// The trace address is not a bracketed list of non-negative integers.
    #[error("invalid trace address {input:?}: {reason}")]
    InvalidTraceAddress { input: String, reason: &'static str },

    /// A binary payload expected to carry text is not valid UTF-8.
    #[error("invalid utf-8 in {primitive} payload")]
    InvalidUtf8 { primitive: &'static str },
}
