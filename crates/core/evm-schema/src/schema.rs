//! Entity schemas

use std::sync::Arc;

use arrow::datatypes::{Field, Schema, SchemaRef};
use evm_codec::{CanonicalEncoder, EncodingPolicy};

use crate::{EntityKey, FieldDef, FieldType, KeyPart, Row, SchemaValidationError, Value};

/// Field contract of a stored entity: ordered fields, primary key, and secondary indexes.
///
/// The schema is storage neutral. It does not perform writes; drivers render it into their
/// own physical layout (see [`crate::ddl`] and [`EntitySchema::arrow_schema`]).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntitySchema {
    namespace: &'static str,
    name: &'static str,
    fields: Vec<FieldDef>,
    primary_key: Vec<&'static str>,
    key_positions: Vec<usize>,
}

impl EntitySchema {
    /// Creates a schema.
    ///
    /// Schemas are static definitions, so a primary key naming an unknown field is a
    /// programming error and panics.
    pub fn new(
        namespace: &'static str,
        name: &'static str,
        fields: Vec<FieldDef>,
        primary_key: Vec<&'static str>,
    ) -> Self {
        assert!(!primary_key.is_empty(), "{name}: empty primary key");
        let key_positions = primary_key
            .iter()
            .map(|key| {
                fields
                    .iter()
                    .position(|f| f.name == *key)
                    .unwrap_or_else(|| panic!("{name}: primary key field {key} is not defined"))
            })
            .collect();

        Self {
            namespace,
            name,
            fields,
            primary_key,
            key_positions,
        }
    }

    /// Table name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Database schema the table lives in.
    pub fn namespace(&self) -> &'static str {
        self.namespace
    }

    /// `namespace.name`
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.namespace, self.name)
    }

    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    pub fn primary_key(&self) -> &[&'static str] {
        &self.primary_key
    }

    pub fn key_fields(&self) -> impl Iterator<Item = &FieldDef> {
        self.key_positions.iter().map(|&pos| &self.fields[pos])
    }

    pub fn is_key_field(&self, name: &str) -> bool {
        self.primary_key.contains(&name)
    }

    /// Fields that carry a secondary index.
    pub fn indexed_fields(&self) -> impl Iterator<Item = &FieldDef> {
        self.fields.iter().filter(|f| f.indexed)
    }

    pub fn unique_fields(&self) -> impl Iterator<Item = &FieldDef> {
        self.fields.iter().filter(|f| f.unique)
    }

    /// Checks that `row` satisfies this schema and is in the canonical form of `encoder`.
    pub fn validate(
        &self,
        row: &Row,
        encoder: &CanonicalEncoder,
    ) -> Result<(), SchemaValidationError> {
        self.check_arity(row)?;
        for (field, cell) in self.fields.iter().zip(row) {
            self.check_cell(field, cell.as_ref(), encoder)?;
        }
        Ok(())
    }

    /// Rewrites every encoded cell of `row` into the canonical form of `encoder`, then
    /// validates the result.
    ///
    /// Accepts rows produced under a different policy or with non-canonical hex casing.
    pub fn normalize(
        &self,
        row: Row,
        encoder: &CanonicalEncoder,
    ) -> Result<Row, SchemaValidationError> {
        self.check_arity(&row)?;
        let row = self
            .fields
            .iter()
            .zip(row)
            .map(|(field, cell)| match cell {
                Some(value) if field.ty.is_encoded() => {
                    let Some(storage) = value.to_storage() else {
                        return Err(self.mismatch(field, &value));
                    };
                    match field.ty.canonicalize(encoder, &storage) {
                        Some(Ok(canonical)) => Ok(Some(Value::from(canonical))),
                        Some(Err(source)) => Err(SchemaValidationError::Encoding {
                            entity: self.name,
                            field: field.name,
                            source,
                        }),
                        None => Ok(Some(value)),
                    }
                }
                other => Ok(other),
            })
            .collect::<Result<Row, _>>()?;

        self.validate(&row, encoder)?;
        Ok(row)
    }

    /// Extracts the primary key of `row`.
    pub fn key_of(&self, row: &Row) -> Result<EntityKey, SchemaValidationError> {
        self.check_arity(row)?;
        self.key_positions
            .iter()
            .map(|&pos| {
                let field = &self.fields[pos];
                match &row[pos] {
                    None => Err(SchemaValidationError::NullKey {
                        entity: self.name,
                        field: field.name,
                    }),
                    Some(Value::Int(v)) => Ok(KeyPart::Int(*v)),
                    Some(Value::Text(s)) => Ok(KeyPart::Text(s.clone())),
                    Some(Value::Binary(b)) => Ok(KeyPart::Binary(b.clone())),
                    Some(other @ Value::Json(_)) => Err(self.mismatch(field, other)),
                }
            })
            .collect::<Result<Vec<_>, _>>()
            .map(EntityKey)
    }

    /// Columnar rendering of this schema under `policy`.
    pub fn arrow_schema(&self, policy: EncodingPolicy) -> SchemaRef {
        let fields = self
            .fields
            .iter()
            .map(|f| Field::new(f.name, f.ty.arrow_type(policy), f.nullable))
            .collect::<Vec<_>>();
        Arc::new(Schema::new(fields))
    }

    fn check_arity(&self, row: &Row) -> Result<(), SchemaValidationError> {
        if row.len() != self.fields.len() {
            return Err(SchemaValidationError::Arity {
                entity: self.name,
                expected: self.fields.len(),
                actual: row.len(),
            });
        }
        Ok(())
    }

    fn check_cell(
        &self,
        field: &FieldDef,
        cell: Option<&Value>,
        encoder: &CanonicalEncoder,
    ) -> Result<(), SchemaValidationError> {
        let Some(value) = cell else {
            if self.is_key_field(field.name) {
                return Err(SchemaValidationError::NullKey {
                    entity: self.name,
                    field: field.name,
                });
            }
            if !field.nullable {
                return Err(SchemaValidationError::NullField {
                    entity: self.name,
                    field: field.name,
                });
            }
            return Ok(());
        };

        match (field.ty, value) {
            (FieldType::BlockNumber, Value::Int(v)) if *v < 0 => {
                Err(SchemaValidationError::OutOfRange {
                    entity: self.name,
                    field: field.name,
                    value: v.to_string(),
                })
            }
            (FieldType::BlockNumber | FieldType::Int64, Value::Int(_))
            | (FieldType::Text, Value::Text(_))
            | (FieldType::Json, Value::Json(_)) => Ok(()),
            (ty, value) if ty.is_encoded() => {
                let Some(storage) = value.to_storage() else {
                    return Err(self.mismatch(field, value));
                };
                match ty.canonicalize(encoder, &storage) {
                    Some(Ok(canonical)) if canonical == storage => Ok(()),
                    Some(Ok(_)) => Err(SchemaValidationError::NonCanonical {
                        entity: self.name,
                        field: field.name,
                        policy: encoder.policy(),
                    }),
                    Some(Err(source)) => Err(SchemaValidationError::Encoding {
                        entity: self.name,
                        field: field.name,
                        source,
                    }),
                    None => Ok(()),
                }
            }
            (_, value) => Err(self.mismatch(field, value)),
        }
    }

    fn mismatch(&self, field: &FieldDef, value: &Value) -> SchemaValidationError {
        SchemaValidationError::TypeMismatch {
            entity: self.name,
            field: field.name,
            expected: field.ty,
            actual: value.kind(),
        }
    }
}
