use std::sync::LazyLock;

use evm_codec::{Address, Calldata, CanonicalEncoder};

use super::{CHAIN_NAMESPACE, TraceFields};
use crate::{
    Entity, EntitySchema, FieldDef, FieldType, Row, RowReader, RowWriter, SchemaValidationError,
};

static SCHEMA: LazyLock<EntitySchema> = LazyLock::new(schema);

pub const TABLE_NAME: &str = "traces";

fn schema() -> EntitySchema {
    let mut fields = TraceFields::fields();
    fields.extend([
        FieldDef::new("from_address", FieldType::Address, false).indexed(),
        FieldDef::new("to_address", FieldType::Address, true).indexed(),
        FieldDef::new("input", FieldType::Calldata, true),
        FieldDef::new("output", FieldType::Calldata, true),
        FieldDef::new("decoded_function", FieldType::Text, true).indexed(),
        FieldDef::new("decoded_input", FieldType::Json, true),
        FieldDef::new("decoded_output", FieldType::Json, true),
    ]);
    EntitySchema::new(
        CHAIN_NAMESPACE,
        TABLE_NAME,
        fields,
        vec!["transaction_hash", "trace_address"],
    )
}

#[derive(Debug, Clone, PartialEq)]
pub struct Trace {
    pub common: TraceFields,
    pub from_address: Address,
    pub to_address: Option<Address>,
    pub input: Option<Calldata>,
    pub output: Option<Calldata>,
    pub decoded_function: Option<String>,
    pub decoded_input: Option<serde_json::Value>,
    pub decoded_output: Option<serde_json::Value>,
}

impl Entity for Trace {
    fn schema() -> &'static EntitySchema {
        &SCHEMA
    }

    fn to_row(&self, encoder: &CanonicalEncoder) -> Result<Row, SchemaValidationError> {
        let mut w = RowWriter::new(&SCHEMA, encoder);
        self.common.write(&mut w)?;
        w.encoded(&self.from_address);
        w.encoded_opt(self.to_address.as_ref());
        w.encoded_opt(self.input.as_ref());
        w.encoded_opt(self.output.as_ref());
        w.text_opt(self.decoded_function.as_deref());
        w.json_opt(self.decoded_input.clone());
        w.json_opt(self.decoded_output.clone());
        w.finish()
    }

    fn from_row(row: &Row) -> Result<Self, SchemaValidationError> {
        let r = RowReader::new(&SCHEMA, row)?;
        Ok(Self {
            common: TraceFields::read(&r)?,
            from_address: r.decoded("from_address")?,
            to_address: r.decoded_opt("to_address")?,
            input: r.decoded_opt("input")?,
            output: r.decoded_opt("output")?,
            decoded_function: r.text_opt("decoded_function")?,
            decoded_input: r.json_opt("decoded_input")?,
            decoded_output: r.json_opt("decoded_output")?,
        })
    }
}
