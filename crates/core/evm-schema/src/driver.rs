//! Storage driver contract for insert-only entities

use std::{
    collections::{BTreeMap, HashMap, HashSet},
    future::Future,
    sync::{Mutex, PoisonError},
};

use evm_codec::CanonicalEncoder;

use crate::{DuplicateKeyError, Entity, EntityKey, EntitySchema, Row, SchemaValidationError};

/// Errors returned by [`EntityWriter`] implementations.
#[derive(Debug, thiserror::Error)]
pub enum WriteError {
    #[error(transparent)]
    Validation(#[from] SchemaValidationError),

    #[error(transparent)]
    DuplicateKey(#[from] DuplicateKeyError),

    /// Failure reported by the underlying storage engine
    #[error("storage driver error: {0}")]
    Driver(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),
}

/// A backend that persists rows of immutable entities.
///
/// Implementations must insert a batch atomically and reject any row whose key already exists
/// with [`WriteError::DuplicateKey`]. Rows are expected in the canonical form of the
/// implementation's encoder; see [`validate_batch`].
pub trait EntityWriter: Send + Sync {
    /// Inserts `rows` into the table described by `schema`, returning the number written.
    fn insert_rows(
        &self,
        schema: &'static EntitySchema,
        rows: Vec<Row>,
    ) -> impl Future<Output = Result<usize, WriteError>> + Send;
}

/// Validates every row of a batch and returns their keys, in order.
///
/// Fails on the first invalid row, or when two rows share a key.
pub fn validate_batch(
    schema: &EntitySchema,
    rows: &[Row],
    encoder: &CanonicalEncoder,
) -> Result<Vec<EntityKey>, WriteError> {
    let mut seen = HashSet::with_capacity(rows.len());
    let mut keys = Vec::with_capacity(rows.len());
    for row in rows {
        schema.validate(row, encoder)?;
        let key = schema.key_of(row)?;
        if !seen.insert(key.clone()) {
            return Err(DuplicateKeyError {
                entity: schema.name(),
                key,
            }
            .into());
        }
        keys.push(key);
    }
    Ok(keys)
}

/// Converts `entities` to rows with `encoder` and hands them to `writer`.
pub async fn insert_entities<W, E>(
    writer: &W,
    encoder: &CanonicalEncoder,
    entities: &[E],
) -> Result<usize, WriteError>
where
    W: EntityWriter,
    E: Entity,
{
    let rows = entities
        .iter()
        .map(|e| e.to_row(encoder))
        .collect::<Result<Vec<_>, _>>()?;
    writer.insert_rows(E::schema(), rows).await
}

/// In-memory [`EntityWriter`], keyed by table and primary key.
#[derive(Debug, Default)]
pub struct MemoryEntityStore {
    encoder: CanonicalEncoder,
    tables: Mutex<HashMap<String, BTreeMap<EntityKey, Row>>>,
}

impl MemoryEntityStore {
    pub fn new(encoder: CanonicalEncoder) -> Self {
        Self {
            encoder,
            tables: Default::default(),
        }
    }

    pub fn encoder(&self) -> &CanonicalEncoder {
        &self.encoder
    }

    pub fn len(&self, schema: &EntitySchema) -> usize {
        let tables = self.tables.lock().unwrap_or_else(PoisonError::into_inner);
        tables
            .get(&schema.qualified_name())
            .map_or(0, BTreeMap::len)
    }

    pub fn get(&self, schema: &EntitySchema, key: &EntityKey) -> Option<Row> {
        let tables = self.tables.lock().unwrap_or_else(PoisonError::into_inner);
        tables
            .get(&schema.qualified_name())
            .and_then(|table| table.get(key).cloned())
    }

    /// Reads back every stored `E`, in key order.
    pub fn fetch<E: Entity>(&self) -> Result<Vec<E>, SchemaValidationError> {
        let tables = self.tables.lock().unwrap_or_else(PoisonError::into_inner);
        tables
            .get(&E::schema().qualified_name())
            .into_iter()
            .flat_map(BTreeMap::values)
            .map(E::from_row)
            .collect()
    }
}

impl EntityWriter for MemoryEntityStore {
    async fn insert_rows(
        &self,
        schema: &'static EntitySchema,
        rows: Vec<Row>,
    ) -> Result<usize, WriteError> {
        let keys = validate_batch(schema, &rows, &self.encoder)?;

        let mut tables = self.tables.lock().unwrap_or_else(PoisonError::into_inner);
        let table = tables.entry(schema.qualified_name()).or_default();
        if let Some(key) = keys.iter().find(|key| table.contains_key(*key)) {
            return Err(DuplicateKeyError {
                entity: schema.name(),
                key: key.clone(),
            }
            .into());
        }

        let count = rows.len();
        table.extend(keys.into_iter().zip(rows));
        Ok(count)
    }
}
