use std::sync::LazyLock;

use evm_codec::{Address, Calldata, CanonicalEncoder, UInt128, UInt256};

use super::{CHAIN_NAMESPACE, TransactionFields};
use crate::{
    Entity, EntitySchema, FieldDef, FieldType, Row, RowReader, RowWriter, SchemaValidationError,
};

static SCHEMA: LazyLock<EntitySchema> = LazyLock::new(schema);

pub const TABLE_NAME: &str = "transactions";

fn schema() -> EntitySchema {
    let mut fields = TransactionFields::fields();
    fields.extend([
        FieldDef::new("nonce", FieldType::Int64, false),
        FieldDef::new("from_address", FieldType::Address, false).indexed(),
        FieldDef::new("to_address", FieldType::Address, true).indexed(),
        FieldDef::new("input", FieldType::Calldata, true),
        FieldDef::new("value", FieldType::UInt256, false),
        FieldDef::new("gas_available", FieldType::Int64, true),
        FieldDef::new("gas_price", FieldType::UInt128, false),
        FieldDef::new("decoded_signature", FieldType::Text, true),
        FieldDef::new("decoded_input", FieldType::Json, true),
    ]);
    EntitySchema::new(CHAIN_NAMESPACE, TABLE_NAME, fields, vec!["transaction_hash"])
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub common: TransactionFields,
    pub nonce: u64,
    pub from_address: Address,
    /// `None` for contract creations.
    pub to_address: Option<Address>,
    pub input: Option<Calldata>,
    pub value: UInt256,
    pub gas_available: Option<u64>,
    pub gas_price: UInt128,
    pub decoded_signature: Option<String>,
    pub decoded_input: Option<serde_json::Value>,
}

impl Entity for Transaction {
    fn schema() -> &'static EntitySchema {
        &SCHEMA
    }

    fn to_row(&self, encoder: &CanonicalEncoder) -> Result<Row, SchemaValidationError> {
        let mut w = RowWriter::new(&SCHEMA, encoder);
        self.common.write(&mut w)?;
        w.u64(self.nonce)?;
        w.encoded(&self.from_address);
        w.encoded_opt(self.to_address.as_ref());
        w.encoded_opt(self.input.as_ref());
        w.encoded(&self.value);
        w.u64_opt(self.gas_available)?;
        w.encoded(&self.gas_price);
        w.text_opt(self.decoded_signature.as_deref());
        w.json_opt(self.decoded_input.clone());
        w.finish()
    }

    fn from_row(row: &Row) -> Result<Self, SchemaValidationError> {
        let r = RowReader::new(&SCHEMA, row)?;
        Ok(Self {
            common: TransactionFields::read(&r)?,
            nonce: r.u64("nonce")?,
            from_address: r.decoded("from_address")?,
            to_address: r.decoded_opt("to_address")?,
            input: r.decoded_opt("input")?,
            value: r.decoded("value")?,
            gas_available: r.u64_opt("gas_available")?,
            gas_price: r.decoded("gas_price")?,
            decoded_signature: r.text_opt("decoded_signature")?,
            decoded_input: r.json_opt("decoded_input")?,
        })
    }
}
