//! Field contracts for decoded EVM chain entities.
//!
//! Each stored entity exposes an [`EntitySchema`]: its ordered fields with semantic type and
//! nullability, its primary key, and its secondary indexes. Entities convert to and from
//! storage-neutral [`Row`]s through a [`CanonicalEncoder`], and rows are validated against the
//! schema before any driver sees them.
//!
//! Chain entities (blocks, transactions, events, traces, transfers) are insert-only. A driver
//! implementing [`EntityWriter`] must reject a key that already exists.

pub mod ddl;
mod driver;
pub mod entities;
mod error;
mod field;
mod schema;
mod tags;
mod value;

use evm_codec::CanonicalEncoder;

pub use self::{
    driver::{EntityWriter, MemoryEntityStore, WriteError, insert_entities, validate_batch},
    error::{DuplicateKeyError, SchemaValidationError, UnknownEnumValueError},
    field::{FieldDef, FieldType},
    schema::EntitySchema,
    tags::{BackfillDataType, SupportedNetwork, VmTag},
    value::{EntityKey, KeyPart, Row, RowReader, RowWriter, Value},
};

/// A stored record type.
pub trait Entity: Sized {
    fn schema() -> &'static EntitySchema;

    /// Encodes the record into a row in schema field order.
    fn to_row(&self, encoder: &CanonicalEncoder) -> Result<Row, SchemaValidationError>;

    /// Decodes a record from a row in either physical layout.
    fn from_row(row: &Row) -> Result<Self, SchemaValidationError>;

    fn key(&self, encoder: &CanonicalEncoder) -> Result<EntityKey, SchemaValidationError> {
        Self::schema().key_of(&self.to_row(encoder)?)
    }
}

/// Schemas of the decoded chain data tables.
pub fn chain_schemas() -> [&'static EntitySchema; 5] {
    use entities::{Block, Erc20Transfer, Event, Trace, Transaction};
    [
        Block::schema(),
        Transaction::schema(),
        Event::schema(),
        Trace::schema(),
        Erc20Transfer::schema(),
    ]
}
