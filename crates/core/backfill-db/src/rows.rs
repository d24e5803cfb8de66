//! Generic SQL rendering and row transfer for entity schemas
//!
//! Statements are derived from an [`EntitySchema`], so any entity can be written and read
//! without a hand-written query. Wide integers travel as decimal text and JSON as its text
//! form; both are cast on the server.

use evm_codec::EncodingPolicy;
use evm_schema::{EntitySchema, FieldType, Row, Value};
use sqlx::{
    Postgres, Row as _,
    postgres::{PgArguments, PgRow},
    query::Query,
};

/// Server-side cast applied to a bound parameter of type `ty`.
fn param_cast(ty: FieldType) -> &'static str {
    match ty {
        FieldType::Json => "::jsonb",
        FieldType::UInt256 | FieldType::UInt160 | FieldType::UInt128 => "::numeric",
        _ => "",
    }
}

/// Whether the column is read back through a `::text` cast.
fn reads_as_text(ty: FieldType) -> bool {
    matches!(
        ty,
        FieldType::Json | FieldType::UInt256 | FieldType::UInt160 | FieldType::UInt128
    )
}

pub fn insert_sql(schema: &EntitySchema) -> String {
    let columns = schema
        .fields()
        .iter()
        .map(|f| f.name)
        .collect::<Vec<_>>()
        .join(", ");
    let params = schema
        .fields()
        .iter()
        .enumerate()
        .map(|(i, f)| format!("${}{}", i + 1, param_cast(f.ty)))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "INSERT INTO {} ({columns}) VALUES ({params})",
        schema.qualified_name()
    )
}

/// `SELECT` of every field in schema order, followed by `tail` (filters, ordering).
pub fn select_sql(schema: &EntitySchema, tail: &str) -> String {
    let columns = schema
        .fields()
        .iter()
        .map(|f| {
            if reads_as_text(f.ty) {
                format!("{0}::text AS {0}", f.name)
            } else {
                f.name.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(", ");
    format!("SELECT {columns} FROM {} {tail}", schema.qualified_name())
        .trim_end()
        .to_string()
}

/// Binds every cell of `row` in schema order.
///
/// Nulls are bound with the column's own type so that Postgres accepts them without a cast.
pub fn bind_row<'q>(
    mut query: Query<'q, Postgres, PgArguments>,
    schema: &EntitySchema,
    policy: EncodingPolicy,
    row: &'q Row,
) -> Query<'q, Postgres, PgArguments> {
    for (field, cell) in schema.fields().iter().zip(row) {
        query = match cell {
            Some(Value::Int(v)) => query.bind(*v),
            Some(Value::Text(s)) => query.bind(s.as_str()),
            Some(Value::Binary(b)) => query.bind(b.as_slice()),
            Some(Value::Json(j)) => query.bind(j.to_string()),
            None => match field.ty {
                FieldType::BlockNumber | FieldType::Int64 => query.bind(None::<i64>),
                ty if ty.is_byte_oriented() && policy == EncodingPolicy::Binary => {
                    query.bind(None::<Vec<u8>>)
                }
                _ => query.bind(None::<String>),
            },
        };
    }
    query
}

/// Reads a row selected with [`select_sql`].
pub fn decode_row(
    schema: &EntitySchema,
    policy: EncodingPolicy,
    pg_row: &PgRow,
) -> Result<Row, sqlx::Error> {
    schema
        .fields()
        .iter()
        .enumerate()
        .map(|(idx, field)| {
            let cell = match field.ty {
                FieldType::BlockNumber | FieldType::Int64 => {
                    pg_row.try_get::<Option<i64>, _>(idx)?.map(Value::Int)
                }
                FieldType::Json => pg_row
                    .try_get::<Option<String>, _>(idx)?
                    .map(|text| serde_json::from_str(&text))
                    .transpose()
                    .map_err(|err| sqlx::Error::ColumnDecode {
                        index: field.name.to_string(),
                        source: Box::new(err),
                    })?
                    .map(Value::Json),
                ty if ty.is_byte_oriented() && policy == EncodingPolicy::Binary => pg_row
                    .try_get::<Option<Vec<u8>>, _>(idx)?
                    .map(Value::Binary),
                _ => pg_row.try_get::<Option<String>, _>(idx)?.map(Value::Text),
            };
            Ok(cell)
        })
        .collect()
}
