use std::sync::LazyLock;

use evm_codec::CanonicalEncoder;

use super::INTERNAL_NAMESPACE;
use crate::{
    Entity, EntitySchema, FieldDef, FieldType, Row, RowReader, RowWriter, SchemaValidationError,
    VmTag,
};

static SCHEMA: LazyLock<EntitySchema> = LazyLock::new(schema);

pub const TABLE_NAME: &str = "contract_abis";

fn schema() -> EntitySchema {
    EntitySchema::new(
        INTERNAL_NAMESPACE,
        TABLE_NAME,
        vec![
            FieldDef::new("abi_name", FieldType::Text, false),
            FieldDef::new("abi_json", FieldType::Json, false),
            FieldDef::new("priority", FieldType::Int64, false),
            FieldDef::new("vm_tag", FieldType::Text, false),
        ],
        vec!["abi_name"],
    )
}

/// A named contract ABI used by the decoding service.
///
/// When several ABIs match the same selector, the one with the highest `priority` wins.
#[derive(Debug, Clone, PartialEq)]
pub struct ContractAbi {
    pub abi_name: String,
    /// ABI declarations, in source order.
    pub abi_json: Vec<serde_json::Value>,
    pub priority: i64,
    pub vm_tag: VmTag,
}

impl Entity for ContractAbi {
    fn schema() -> &'static EntitySchema {
        &SCHEMA
    }

    fn to_row(&self, encoder: &CanonicalEncoder) -> Result<Row, SchemaValidationError> {
        let mut w = RowWriter::new(&SCHEMA, encoder);
        w.text(&self.abi_name);
        w.json(serde_json::Value::Array(self.abi_json.clone()));
        w.i64(self.priority);
        w.text(self.vm_tag.as_str());
        w.finish()
    }

    fn from_row(row: &Row) -> Result<Self, SchemaValidationError> {
        let r = RowReader::new(&SCHEMA, row)?;
        let vm_tag = r.text("vm_tag")?;
        Ok(Self {
            abi_name: r.text("abi_name")?,
            abi_json: r.json_as("abi_json")?.unwrap_or_default(),
            priority: r.i64("priority")?,
            vm_tag: vm_tag
                .parse()
                .map_err(|source| SchemaValidationError::UnknownEnumValue {
                    entity: TABLE_NAME,
                    field: "vm_tag",
                    source,
                })?,
        })
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::Value;

    #[test]
    fn from_row_with_unknown_vm_tag_fails() {
        //* Given
        let row = vec![
            Some(Value::Text("ERC20".to_string())),
            Some(Value::Json(serde_json::json!([]))),
            Some(Value::Int(0)),
            Some(Value::Text("MoveVM".to_string())),
        ];

        //* When
        let result = ContractAbi::from_row(&row);

        //* Then
        let Err(SchemaValidationError::UnknownEnumValue { source, .. }) = result else {
            panic!("expected unknown enum value, got {result:?}");
        };
        assert_eq!(source.value, "MoveVM");
    }

    #[test]
    fn abi_declarations_keep_their_order() {
        //* Given
        let abi = ContractAbi {
            abi_name: "ERC20".to_string(),
            abi_json: vec![
                serde_json::json!({"type": "event", "name": "Transfer"}),
                serde_json::json!({"type": "event", "name": "Approval"}),
            ],
            priority: 10,
            vm_tag: VmTag::Evm,
        };
        let encoder = CanonicalEncoder::default();

        //* When
        let row = abi.to_row(&encoder).expect("row should build");
        let back = ContractAbi::from_row(&row).expect("row should read back");

        //* Then
        assert_eq!(row[3], Some(Value::Text("EVM".to_string())));
        assert_eq!(back, abi);
    }
}
