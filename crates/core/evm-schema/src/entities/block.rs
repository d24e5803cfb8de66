use std::sync::LazyLock;

use evm_codec::{Address, Calldata, CanonicalEncoder, Hash32, UInt128};

use super::{BlockFields, CHAIN_NAMESPACE};
use crate::{
    Entity, EntitySchema, FieldDef, FieldType, Row, RowReader, RowWriter, SchemaValidationError,
};

static SCHEMA: LazyLock<EntitySchema> = LazyLock::new(schema);

pub const TABLE_NAME: &str = "blocks";

fn schema() -> EntitySchema {
    let mut fields = BlockFields::fields();
    fields.extend([
        FieldDef::new("parent_hash", FieldType::Hash32, false),
        FieldDef::new("miner", FieldType::Address, false),
        FieldDef::new("difficulty", FieldType::UInt128, true),
        FieldDef::new("gas_limit", FieldType::Int64, false),
        FieldDef::new("extra_data", FieldType::Calldata, false),
    ]);
    EntitySchema::new(CHAIN_NAMESPACE, TABLE_NAME, fields, vec!["block_number"])
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub common: BlockFields,
    pub parent_hash: Hash32,
    pub miner: Address,
    /// Absent after the merge.
    pub difficulty: Option<UInt128>,
    pub gas_limit: u64,
    pub extra_data: Calldata,
}

impl Entity for Block {
    fn schema() -> &'static EntitySchema {
        &SCHEMA
    }

    fn to_row(&self, encoder: &CanonicalEncoder) -> Result<Row, SchemaValidationError> {
        let mut w = RowWriter::new(&SCHEMA, encoder);
        self.common.write(&mut w)?;
        w.encoded(&self.parent_hash);
        w.encoded(&self.miner);
        w.encoded_opt(self.difficulty.as_ref());
        w.u64(self.gas_limit)?;
        w.encoded(&self.extra_data);
        w.finish()
    }

    fn from_row(row: &Row) -> Result<Self, SchemaValidationError> {
        let r = RowReader::new(&SCHEMA, row)?;
        Ok(Self {
            common: BlockFields::read(&r)?,
            parent_hash: r.decoded("parent_hash")?,
            miner: r.decoded("miner")?,
            difficulty: r.decoded_opt("difficulty")?,
            gas_limit: r.u64("gas_limit")?,
            extra_data: r.decoded("extra_data")?,
        })
    }
}
