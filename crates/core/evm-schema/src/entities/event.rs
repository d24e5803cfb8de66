use std::sync::LazyLock;

use evm_codec::CanonicalEncoder;

use super::{CHAIN_NAMESPACE, EventFields};
use crate::{
    Entity, EntitySchema, FieldDef, FieldType, Row, RowReader, RowWriter, SchemaValidationError,
};

static SCHEMA: LazyLock<EntitySchema> = LazyLock::new(schema);

pub const TABLE_NAME: &str = "default_events";

fn schema() -> EntitySchema {
    let mut fields = EventFields::fields();
    fields.extend([
        FieldDef::new("event_name", FieldType::Text, true).indexed(),
        FieldDef::new("abi_name", FieldType::Text, true).indexed(),
        FieldDef::new("decoded_event", FieldType::Json, true),
    ]);
    EntitySchema::new(
        CHAIN_NAMESPACE,
        TABLE_NAME,
        fields,
        vec!["block_number", "log_index"],
    )
}

/// A log emitted by a contract. The decoded columns stay `None` until an ABI matches.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub common: EventFields,
    pub event_name: Option<String>,
    pub abi_name: Option<String>,
    pub decoded_event: Option<serde_json::Value>,
}

impl Event {
    pub fn is_decoded(&self) -> bool {
        self.event_name.is_some()
    }
}

impl Entity for Event {
    fn schema() -> &'static EntitySchema {
        &SCHEMA
    }

    fn to_row(&self, encoder: &CanonicalEncoder) -> Result<Row, SchemaValidationError> {
        let mut w = RowWriter::new(&SCHEMA, encoder);
        self.common.write(&mut w)?;
        w.text_opt(self.event_name.as_deref());
        w.text_opt(self.abi_name.as_deref());
        w.json_opt(self.decoded_event.clone());
        w.finish()
    }

    fn from_row(row: &Row) -> Result<Self, SchemaValidationError> {
        let r = RowReader::new(&SCHEMA, row)?;
        Ok(Self {
            common: EventFields::read(&r)?,
            event_name: r.text_opt("event_name")?,
            abi_name: r.text_opt("abi_name")?,
            decoded_event: r.json_opt("decoded_event")?,
        })
    }
}
