//! Error types for schema validation and writes

use evm_codec::{EncodingError, EncodingPolicy};

use crate::{EntityKey, FieldType};

/// A record does not satisfy its entity's field contract.
#[derive(Debug, thiserror::Error)]
pub enum SchemaValidationError {
    #[error("{entity}: expected {expected} fields, got {actual}")]
    Arity {
        entity: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("{entity}.{field}: key field is null")]
    NullKey {
        entity: &'static str,
        field: &'static str,
    },

    #[error("{entity}.{field}: field is not nullable")]
    NullField {
        entity: &'static str,
        field: &'static str,
    },

    #[error("{entity}.{field}: expected a {expected} value, got {actual}")]
    TypeMismatch {
        entity: &'static str,
        field: &'static str,
        expected: FieldType,
        actual: &'static str,
    },

    #[error("{entity}.{field}: {source}")]
    Encoding {
        entity: &'static str,
        field: &'static str,
        #[source]
        source: EncodingError,
    },

    #[error("{entity}.{field}: value is not in canonical {policy} form")]
    NonCanonical {
        entity: &'static str,
        field: &'static str,
        policy: EncodingPolicy,
    },

    #[error("{entity}.{field}: value {value} is out of range")]
    OutOfRange {
        entity: &'static str,
        field: &'static str,
        value: String,
    },

    #[error("{entity}: unknown field {field}")]
    UnknownField {
        entity: &'static str,
        field: &'static str,
    },

    #[error("{entity}.{field}: {source}")]
    UnknownEnumValue {
        entity: &'static str,
        field: &'static str,
        #[source]
        source: UnknownEnumValueError,
    },

    #[error("{entity}.{field}: unexpected json shape: {source}")]
    InvalidJson {
        entity: &'static str,
        field: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// An insert targeted a key that already exists for an immutable entity.
///
/// Re-ingesting a range that is already covered is a caller bug: the coverage tracker should
/// have been consulted first. Overwrite-on-conflict semantics are not defined.
#[derive(Debug, thiserror::Error)]
#[error("duplicate key {key} for {entity}")]
pub struct DuplicateKeyError {
    pub entity: &'static str,
    pub key: EntityKey,
}

/// A stored tag does not name any member of a closed enumeration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} value: {value:?}")]
pub struct UnknownEnumValueError {
    pub kind: &'static str,
    pub value: String,
}
