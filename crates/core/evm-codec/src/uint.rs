//! Fixed-width unsigned integers
//!
//! Integers are stored as exact base-10 digits under both policies, the way a `NUMERIC(p, 0)`
//! column holds them. A binary payload is read as a big-endian integer of exactly the declared
//! byte width.

use alloy::primitives::{U128, U160, U256};

use crate::{Canonical, EncodingError, EncodingPolicy, StorageValue};

/// An unsigned integer with a declared bit width and a matching decimal digit budget.
pub trait FixedWidthUint: Canonical + Copy {
    /// Declared bit width.
    const BITS: usize;
    /// Decimal digits needed to hold every value of the bit width.
    const MAX_DIGITS: usize;

    /// Parses a plain base-10 string, rejecting anything beyond the bit width.
    fn from_decimal_str(input: &str) -> Result<Self, EncodingError>;

    /// Narrows a 256-bit value, rejecting anything beyond the bit width.
    fn from_u256(value: U256) -> Result<Self, EncodingError>;
}

macro_rules! impl_fixed_width_uint {
    ($ty:ty, $name:literal, bits = $bits:literal, digits = $digits:literal) => {
        impl FixedWidthUint for $ty {
            const BITS: usize = $bits;
            const MAX_DIGITS: usize = $digits;

            fn from_decimal_str(input: &str) -> Result<Self, EncodingError> {
                if input.is_empty() || !input.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(EncodingError::InvalidDecimal {
                        primitive: $name,
                        input: input.to_string(),
                    });
                }

                let digits = input.trim_start_matches('0').len();
                if digits > Self::MAX_DIGITS {
                    return Err(EncodingError::TooManyDigits {
                        primitive: $name,
                        max: Self::MAX_DIGITS,
                        actual: digits,
                    });
                }

                <$ty>::from_str_radix(input, 10).map_err(|_| EncodingError::Overflow {
                    primitive: $name,
                    value: input.to_string(),
                })
            }

            fn from_u256(value: U256) -> Result<Self, EncodingError> {
                let bytes = value.to_be_bytes::<32>();
                let (high, low) = bytes.split_at(32 - $bits / 8);
                if high.iter().any(|b| *b != 0) {
                    return Err(EncodingError::Overflow {
                        primitive: $name,
                        value: value.to_string(),
                    });
                }
                Ok(<$ty>::from_be_slice(low))
            }
        }

        impl Canonical for $ty {
            const PRIMITIVE: &'static str = $name;

            fn encode(&self, _policy: EncodingPolicy) -> StorageValue {
                StorageValue::Text(self.to_string())
            }

            fn decode(value: &StorageValue) -> Result<Self, EncodingError> {
                match value {
                    StorageValue::Text(s) => Self::from_decimal_str(s),
                    StorageValue::Binary(b) if b.len() == $bits / 8 => Ok(<$ty>::from_be_slice(b)),
                    StorageValue::Binary(b) => Err(EncodingError::InvalidLength {
                        primitive: $name,
                        expected: $bits / 8,
                        actual: b.len(),
                    }),
                }
            }
        }
    };
}

impl_fixed_width_uint!(U256, "uint256", bits = 256, digits = 78);
impl_fixed_width_uint!(U160, "uint160", bits = 160, digits = 49);
impl_fixed_width_uint!(U128, "uint128", bits = 128, digits = 39);

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn max_values_fit_their_digit_budget() {
        //* Then
        assert_eq!(U256::MAX.to_string().len(), U256::MAX_DIGITS);
        assert_eq!(U160::MAX.to_string().len(), U160::MAX_DIGITS);
        assert_eq!(U128::MAX.to_string().len(), U128::MAX_DIGITS);
    }

    #[test]
    fn uint256_roundtrips_max_value() {
        //* Given
        let value = U256::MAX;

        //* When
        let encoded = value.encode(EncodingPolicy::Binary);

        //* Then
        assert_eq!(
            encoded,
            StorageValue::Text(
                "115792089237316195423570985008687907853269984665640564039457584007913129639935"
                    .to_string()
            )
        );
        assert_eq!(U256::decode(&encoded).expect("decode"), value);
    }

    #[test]
    fn uint128_rejects_value_one_past_max() {
        //* Given
        // 2^128
        let too_big = "340282366920938463463374607431768211456";

        //* When
        let result = U128::from_decimal_str(too_big);

        //* Then
        assert!(matches!(result, Err(EncodingError::Overflow { .. })));
    }

    #[test]
    fn uint160_rejects_too_many_digits() {
        //* Given
        let fifty_digits = "1".repeat(50);

        //* When
        let result = U160::from_decimal_str(&fifty_digits);

        //* Then
        assert!(matches!(
            result,
            Err(EncodingError::TooManyDigits {
                max: 49,
                actual: 50,
                ..
            })
        ));
    }

    #[test]
    fn leading_zeros_do_not_count_against_the_budget() {
        //* Given
        let padded = format!("{}42", "0".repeat(60));

        //* When
        let value = U128::from_decimal_str(&padded).expect("padded value should parse");

        //* Then
        assert_eq!(value, U128::from(42u64));
    }

    #[test]
    fn non_decimal_input_is_rejected() {
        //* Then
        assert!(matches!(
            U256::from_decimal_str("0x10"),
            Err(EncodingError::InvalidDecimal { .. })
        ));
        assert!(matches!(
            U256::from_decimal_str("-1"),
            Err(EncodingError::InvalidDecimal { .. })
        ));
        assert!(matches!(
            U256::from_decimal_str(""),
            Err(EncodingError::InvalidDecimal { .. })
        ));
    }

    #[test]
    fn narrowing_rejects_values_beyond_bit_width() {
        //* Given
        let fits = U256::from(u128::MAX);
        let overflows = U256::from(1u64) << 160;

        //* When
        let narrowed = U128::from_u256(fits).expect("u128::MAX fits in 128 bits");
        let rejected = U160::from_u256(overflows);

        //* Then
        assert_eq!(narrowed, U128::MAX);
        assert!(matches!(rejected, Err(EncodingError::Overflow { .. })));
    }

    #[test]
    fn binary_payload_is_read_big_endian() {
        //* Given
        let mut bytes = vec![0u8; 16];
        bytes[15] = 7;

        //* When
        let value = U128::decode(&StorageValue::Binary(bytes)).expect("decode");

        //* Then
        assert_eq!(value, U128::from(7u64));
        assert!(U128::decode(&StorageValue::Binary(vec![0; 17])).is_err());
    }
}
