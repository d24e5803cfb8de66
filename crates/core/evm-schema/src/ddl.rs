//! Relational rendering of entity schemas (PostgreSQL dialect)

use evm_codec::EncodingPolicy;

use crate::{EntitySchema, FieldType};

/// Column type of `ty` under `policy`.
pub fn column_type(ty: FieldType, policy: EncodingPolicy) -> &'static str {
    match (ty, policy) {
        (FieldType::BlockNumber | FieldType::Int64, _) => "BIGINT",
        (FieldType::Address | FieldType::Hash32 | FieldType::Calldata, EncodingPolicy::Binary) => {
            "BYTEA"
        }
        (FieldType::Address, EncodingPolicy::Textual) => "VARCHAR(42)",
        (FieldType::Hash32, EncodingPolicy::Textual) => "VARCHAR(66)",
        (FieldType::Calldata, EncodingPolicy::Textual) => "TEXT",
        (FieldType::UInt256, _) => "NUMERIC(78, 0)",
        (FieldType::UInt160, _) => "NUMERIC(49, 0)",
        (FieldType::UInt128, _) => "NUMERIC(39, 0)",
        (FieldType::TraceAddress | FieldType::Text, _) => "TEXT",
        (FieldType::Json, _) => "JSONB",
    }
}

pub fn create_namespace(schema: &EntitySchema) -> String {
    format!("CREATE SCHEMA IF NOT EXISTS {}", schema.namespace())
}

pub fn create_table(schema: &EntitySchema, policy: EncodingPolicy) -> String {
    let mut lines = schema
        .fields()
        .iter()
        .map(|f| {
            let null = if f.nullable { "" } else { " NOT NULL" };
            format!("    {} {}{null}", f.name, column_type(f.ty, policy))
        })
        .collect::<Vec<_>>();

    lines.push(format!("    PRIMARY KEY ({})", schema.primary_key().join(", ")));
    lines.extend(
        schema
            .unique_fields()
            .map(|f| format!("    UNIQUE ({})", f.name)),
    );

    format!(
        "CREATE TABLE IF NOT EXISTS {} (\n{}\n)",
        schema.qualified_name(),
        lines.join(",\n")
    )
}

/// Secondary index statements, one per indexed field.
///
/// A field that alone forms the primary key is already indexed and is skipped.
pub fn create_indexes(schema: &EntitySchema) -> Vec<String> {
    schema
        .indexed_fields()
        .filter(|f| schema.primary_key() != [f.name])
        .map(|f| {
            format!(
                "CREATE INDEX IF NOT EXISTS ix_{table}_{field} ON {qualified} ({field})",
                table = schema.name(),
                field = f.name,
                qualified = schema.qualified_name(),
            )
        })
        .collect()
}

/// Every statement needed to create `schema` from scratch, in execution order.
pub fn create_all(schema: &EntitySchema, policy: EncodingPolicy) -> Vec<String> {
    let mut statements = vec![create_namespace(schema), create_table(schema, policy)];
    statements.extend(create_indexes(schema));
    statements
}

#[cfg(test)]
mod tests {
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{Entity, entities::Event, entities::Transaction};

    #[test]
    fn create_table_renders_composite_key_and_text_policy() {
        //* When
        let ddl = create_table(Event::schema(), EncodingPolicy::Textual);

        //* Then
        assert_eq!(
            ddl,
            indoc! {"
                CREATE TABLE IF NOT EXISTS ethereum_data.default_events (
                    block_number BIGINT NOT NULL,
                    log_index BIGINT NOT NULL,
                    transaction_index BIGINT NOT NULL,
                    contract_address VARCHAR(42) NOT NULL,
                    event_name TEXT,
                    abi_name TEXT,
                    decoded_event JSONB,
                    PRIMARY KEY (block_number, log_index)
                )"}
        );
    }

    #[test]
    fn binary_policy_stores_bytes_as_bytea() {
        //* When
        let ddl = create_table(Transaction::schema(), EncodingPolicy::Binary);

        //* Then
        assert!(ddl.contains("transaction_hash BYTEA NOT NULL"));
        assert!(ddl.contains("to_address BYTEA,"));
        assert!(ddl.contains("value NUMERIC(78, 0) NOT NULL"));
        assert!(ddl.contains("error TEXT,"));
    }

    #[test]
    fn create_indexes_covers_indexed_fields() {
        //* When
        let indexes = create_indexes(Transaction::schema());

        //* Then
        assert_eq!(
            indexes,
            vec![
                "CREATE INDEX IF NOT EXISTS ix_transactions_block_number ON ethereum_data.transactions (block_number)",
                "CREATE INDEX IF NOT EXISTS ix_transactions_from_address ON ethereum_data.transactions (from_address)",
                "CREATE INDEX IF NOT EXISTS ix_transactions_to_address ON ethereum_data.transactions (to_address)",
            ]
        );
    }
}
