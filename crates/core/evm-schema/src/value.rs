//! Row cells, keys, and positional row access

use std::fmt;

use evm_codec::{Canonical, CanonicalEncoder, StorageValue};

use crate::{EntitySchema, FieldType, SchemaValidationError};

/// A single stored cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Text(String),
    Binary(Vec<u8>),
    Json(serde_json::Value),
}

impl Value {
    /// Name of the cell kind, for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Int(_) => "int",
            Self::Text(_) => "text",
            Self::Binary(_) => "binary",
            Self::Json(_) => "json",
        }
    }

    /// The physical storage form, if this cell holds one.
    pub fn to_storage(&self) -> Option<StorageValue> {
        match self {
            Self::Text(s) => Some(StorageValue::Text(s.clone())),
            Self::Binary(b) => Some(StorageValue::Binary(b.clone())),
            Self::Int(_) | Self::Json(_) => None,
        }
    }
}

impl From<StorageValue> for Value {
    fn from(value: StorageValue) -> Self {
        match value {
            StorageValue::Text(s) => Self::Text(s),
            StorageValue::Binary(b) => Self::Binary(b),
        }
    }
}

/// A record in schema field order. `None` is a null cell.
pub type Row = Vec<Option<Value>>;

/// One component of an entity key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum KeyPart {
    Int(i64),
    Text(String),
    Binary(Vec<u8>),
}

impl fmt::Display for KeyPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Text(s) => write!(f, "{s}"),
            Self::Binary(b) => write!(f, "0x{}", hex::encode(b)),
        }
    }
}

/// Primary key values of a record, in key field order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityKey(pub Vec<KeyPart>);

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (i, part) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{part}")?;
        }
        f.write_str(")")
    }
}

/// Builds a row positionally, in schema field order.
pub struct RowWriter<'a> {
    schema: &'a EntitySchema,
    encoder: &'a CanonicalEncoder,
    row: Row,
}

impl<'a> RowWriter<'a> {
    pub fn new(schema: &'a EntitySchema, encoder: &'a CanonicalEncoder) -> Self {
        Self {
            schema,
            encoder,
            row: Vec::with_capacity(schema.fields().len()),
        }
    }

    fn current_field(&self) -> &'static str {
        self.schema
            .fields()
            .get(self.row.len())
            .map(|f| f.name)
            .unwrap_or("<extra>")
    }

    pub fn encoded<T: Canonical>(&mut self, value: &T) {
        self.row.push(Some(self.encoder.encode(value).into()));
    }

    pub fn encoded_opt<T: Canonical>(&mut self, value: Option<&T>) {
        self.row
            .push(self.encoder.encode_opt(value).map(Value::from));
    }

    pub fn u64(&mut self, value: u64) -> Result<(), SchemaValidationError> {
        let value = i64::try_from(value).map_err(|_| SchemaValidationError::OutOfRange {
            entity: self.schema.name(),
            field: self.current_field(),
            value: value.to_string(),
        })?;
        self.row.push(Some(Value::Int(value)));
        Ok(())
    }

    pub fn u64_opt(&mut self, value: Option<u64>) -> Result<(), SchemaValidationError> {
        match value {
            Some(v) => self.u64(v),
            None => {
                self.row.push(None);
                Ok(())
            }
        }
    }

    pub fn i64(&mut self, value: i64) {
        self.row.push(Some(Value::Int(value)));
    }

    pub fn text(&mut self, value: impl Into<String>) {
        self.row.push(Some(Value::Text(value.into())));
    }

    pub fn text_opt(&mut self, value: Option<&str>) {
        self.row.push(value.map(|s| Value::Text(s.to_string())));
    }

    pub fn json(&mut self, value: serde_json::Value) {
        self.row.push(Some(Value::Json(value)));
    }

    pub fn json_opt(&mut self, value: Option<serde_json::Value>) {
        self.row.push(value.map(Value::Json));
    }

    /// Returns the row, checking it has exactly one cell per field.
    pub fn finish(self) -> Result<Row, SchemaValidationError> {
        let expected = self.schema.fields().len();
        if self.row.len() != expected {
            return Err(SchemaValidationError::Arity {
                entity: self.schema.name(),
                expected,
                actual: self.row.len(),
            });
        }
        Ok(self.row)
    }
}

/// Reads typed values out of a row by field name.
pub struct RowReader<'a> {
    schema: &'a EntitySchema,
    row: &'a Row,
}

impl<'a> RowReader<'a> {
    pub fn new(schema: &'a EntitySchema, row: &'a Row) -> Result<Self, SchemaValidationError> {
        if row.len() != schema.fields().len() {
            return Err(SchemaValidationError::Arity {
                entity: schema.name(),
                expected: schema.fields().len(),
                actual: row.len(),
            });
        }
        Ok(Self { schema, row })
    }

    fn cell(&self, field: &'static str) -> Result<Option<&'a Value>, SchemaValidationError> {
        let pos = self
            .schema
            .position(field)
            .ok_or(SchemaValidationError::UnknownField {
                entity: self.schema.name(),
                field,
            })?;
        Ok(self.row[pos].as_ref())
    }

    fn present(&self, field: &'static str) -> Result<&'a Value, SchemaValidationError> {
        self.cell(field)?.ok_or(SchemaValidationError::NullField {
            entity: self.schema.name(),
            field,
        })
    }

    fn mismatch(&self, field: &'static str, value: &Value) -> SchemaValidationError {
        let expected = self
            .schema
            .field(field)
            .map(|f| f.ty)
            .unwrap_or(FieldType::Text);
        SchemaValidationError::TypeMismatch {
            entity: self.schema.name(),
            field,
            expected,
            actual: value.kind(),
        }
    }

    fn decode_cell<T: Canonical>(
        &self,
        field: &'static str,
        value: &Value,
    ) -> Result<T, SchemaValidationError> {
        let storage = value.to_storage().ok_or_else(|| self.mismatch(field, value))?;
        T::decode(&storage).map_err(|source| SchemaValidationError::Encoding {
            entity: self.schema.name(),
            field,
            source,
        })
    }

    pub fn decoded<T: Canonical>(&self, field: &'static str) -> Result<T, SchemaValidationError> {
        let value = self.present(field)?;
        self.decode_cell(field, value)
    }

    pub fn decoded_opt<T: Canonical>(
        &self,
        field: &'static str,
    ) -> Result<Option<T>, SchemaValidationError> {
        self.cell(field)?
            .map(|value| self.decode_cell(field, value))
            .transpose()
    }

    pub fn i64(&self, field: &'static str) -> Result<i64, SchemaValidationError> {
        match self.present(field)? {
            Value::Int(v) => Ok(*v),
            other => Err(self.mismatch(field, other)),
        }
    }

    pub fn u64(&self, field: &'static str) -> Result<u64, SchemaValidationError> {
        let value = self.i64(field)?;
        u64::try_from(value).map_err(|_| SchemaValidationError::OutOfRange {
            entity: self.schema.name(),
            field,
            value: value.to_string(),
        })
    }

    pub fn u64_opt(&self, field: &'static str) -> Result<Option<u64>, SchemaValidationError> {
        match self.cell(field)? {
            None => Ok(None),
            Some(_) => self.u64(field).map(Some),
        }
    }

    pub fn text(&self, field: &'static str) -> Result<String, SchemaValidationError> {
        match self.present(field)? {
            Value::Text(s) => Ok(s.clone()),
            other => Err(self.mismatch(field, other)),
        }
    }

    pub fn text_opt(&self, field: &'static str) -> Result<Option<String>, SchemaValidationError> {
        match self.cell(field)? {
            None => Ok(None),
            Some(_) => self.text(field).map(Some),
        }
    }

    pub fn json(&self, field: &'static str) -> Result<serde_json::Value, SchemaValidationError> {
        match self.present(field)? {
            Value::Json(v) => Ok(v.clone()),
            other => Err(self.mismatch(field, other)),
        }
    }

    pub fn json_opt(
        &self,
        field: &'static str,
    ) -> Result<Option<serde_json::Value>, SchemaValidationError> {
        match self.cell(field)? {
            None => Ok(None),
            Some(_) => self.json(field).map(Some),
        }
    }

    /// Reads a JSON cell into a typed shape.
    pub fn json_as<T: serde::de::DeserializeOwned>(
        &self,
        field: &'static str,
    ) -> Result<Option<T>, SchemaValidationError> {
        self.json_opt(field)?
            .map(|v| {
                serde_json::from_value(v).map_err(|source| SchemaValidationError::InvalidJson {
                    entity: self.schema.name(),
                    field,
                    source,
                })
            })
            .transpose()
    }
}
