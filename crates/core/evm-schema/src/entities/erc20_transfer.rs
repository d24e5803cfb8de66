use std::sync::LazyLock;

use evm_codec::CanonicalEncoder;

use super::{CHAIN_NAMESPACE, TransferFields};
use crate::{Entity, EntitySchema, Row, RowReader, RowWriter, SchemaValidationError};

static SCHEMA: LazyLock<EntitySchema> = LazyLock::new(|| {
    EntitySchema::new(
        CHAIN_NAMESPACE,
        TABLE_NAME,
        TransferFields::fields(),
        vec!["transaction_hash", "log_index"],
    )
});

pub const TABLE_NAME: &str = "erc20_transfers";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Erc20Transfer {
    pub common: TransferFields,
}

impl Entity for Erc20Transfer {
    fn schema() -> &'static EntitySchema {
        &SCHEMA
    }

    fn to_row(&self, encoder: &CanonicalEncoder) -> Result<Row, SchemaValidationError> {
        let mut w = RowWriter::new(&SCHEMA, encoder);
        self.common.write(&mut w)?;
        w.finish()
    }

    fn from_row(row: &Row) -> Result<Self, SchemaValidationError> {
        let r = RowReader::new(&SCHEMA, row)?;
        Ok(Self {
            common: TransferFields::read(&r)?,
        })
    }
}
