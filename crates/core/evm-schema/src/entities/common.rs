//! Field sets shared by chain entity tables
//!
//! Each set is embedded by value into its concrete entity and contributes the leading fields
//! of that entity's schema, in the order listed here.

use evm_codec::{Address, Hash32, TraceAddress, UInt128, UInt256};

use crate::{FieldDef, FieldType, RowReader, RowWriter, SchemaValidationError};

/// Stored in place of an empty failure message, so that a failed call is never
/// indistinguishable from a successful one.
pub const EMPTY_ERROR_SENTINEL: &str = "True";

/// Normalizes a call failure message: `None` is success, an empty message becomes
/// [`EMPTY_ERROR_SENTINEL`].
pub fn normalize_error(error: Option<String>) -> Option<String> {
    error.map(|message| {
        if message.is_empty() {
            EMPTY_ERROR_SENTINEL.to_string()
        } else {
            message
        }
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockFields {
    pub block_number: u64,
    pub block_hash: Hash32,
    pub timestamp: u64,
    pub transaction_count: u64,
    pub effective_gas_price: Option<UInt128>,
    pub gas_used: Option<u64>,
}

impl BlockFields {
    pub(crate) fn fields() -> Vec<FieldDef> {
        vec![
            FieldDef::new("block_number", FieldType::BlockNumber, false),
            FieldDef::new("block_hash", FieldType::Hash32, false).unique(),
            FieldDef::new("timestamp", FieldType::Int64, false),
            FieldDef::new("transaction_count", FieldType::Int64, false),
            FieldDef::new("effective_gas_price", FieldType::UInt128, true),
            FieldDef::new("gas_used", FieldType::Int64, true),
        ]
    }

    pub(crate) fn write(&self, w: &mut RowWriter<'_>) -> Result<(), SchemaValidationError> {
        w.u64(self.block_number)?;
        w.encoded(&self.block_hash);
        w.u64(self.timestamp)?;
        w.u64(self.transaction_count)?;
        w.encoded_opt(self.effective_gas_price.as_ref());
        w.u64_opt(self.gas_used)
    }

    pub(crate) fn read(r: &RowReader<'_>) -> Result<Self, SchemaValidationError> {
        Ok(Self {
            block_number: r.u64("block_number")?,
            block_hash: r.decoded("block_hash")?,
            timestamp: r.u64("timestamp")?,
            transaction_count: r.u64("transaction_count")?,
            effective_gas_price: r.decoded_opt("effective_gas_price")?,
            gas_used: r.u64_opt("gas_used")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionFields {
    pub transaction_hash: Hash32,
    pub block_number: u64,
    pub transaction_index: u64,
    pub timestamp: u64,
    pub gas_used: Option<u64>,
    /// Failure message, `None` when the transaction succeeded.
    pub error: Option<String>,
}

impl TransactionFields {
    pub(crate) fn fields() -> Vec<FieldDef> {
        vec![
            FieldDef::new("transaction_hash", FieldType::Hash32, false),
            // Not a foreign key: transactions may be ingested before their block.
            FieldDef::new("block_number", FieldType::BlockNumber, false).indexed(),
            FieldDef::new("transaction_index", FieldType::Int64, false),
            FieldDef::new("timestamp", FieldType::Int64, false),
            FieldDef::new("gas_used", FieldType::Int64, true),
            FieldDef::new("error", FieldType::Text, true),
        ]
    }

    pub(crate) fn write(&self, w: &mut RowWriter<'_>) -> Result<(), SchemaValidationError> {
        w.encoded(&self.transaction_hash);
        w.u64(self.block_number)?;
        w.u64(self.transaction_index)?;
        w.u64(self.timestamp)?;
        w.u64_opt(self.gas_used)?;
        w.text_opt(normalize_error(self.error.clone()).as_deref());
        Ok(())
    }

    pub(crate) fn read(r: &RowReader<'_>) -> Result<Self, SchemaValidationError> {
        Ok(Self {
            transaction_hash: r.decoded("transaction_hash")?,
            block_number: r.u64("block_number")?,
            transaction_index: r.u64("transaction_index")?,
            timestamp: r.u64("timestamp")?,
            gas_used: r.u64_opt("gas_used")?,
            error: r.text_opt("error")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventFields {
    pub block_number: u64,
    pub log_index: u64,
    pub transaction_index: u64,
    pub contract_address: Address,
}

impl EventFields {
    pub(crate) fn fields() -> Vec<FieldDef> {
        vec![
            FieldDef::new("block_number", FieldType::BlockNumber, false).indexed(),
            FieldDef::new("log_index", FieldType::Int64, false),
            FieldDef::new("transaction_index", FieldType::Int64, false),
            FieldDef::new("contract_address", FieldType::Address, false).indexed(),
        ]
    }

    pub(crate) fn write(&self, w: &mut RowWriter<'_>) -> Result<(), SchemaValidationError> {
        w.u64(self.block_number)?;
        w.u64(self.log_index)?;
        w.u64(self.transaction_index)?;
        w.encoded(&self.contract_address);
        Ok(())
    }

    pub(crate) fn read(r: &RowReader<'_>) -> Result<Self, SchemaValidationError> {
        Ok(Self {
            block_number: r.u64("block_number")?,
            log_index: r.u64("log_index")?,
            transaction_index: r.u64("transaction_index")?,
            contract_address: r.decoded("contract_address")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceFields {
    pub block_number: u64,
    pub transaction_hash: Hash32,
    pub transaction_index: u64,
    pub trace_address: TraceAddress,
    pub gas_used: u64,
    /// Failure message, `None` when the call succeeded.
    pub error: Option<String>,
}

impl TraceFields {
    pub(crate) fn fields() -> Vec<FieldDef> {
        vec![
            FieldDef::new("block_number", FieldType::BlockNumber, false).indexed(),
            FieldDef::new("transaction_hash", FieldType::Hash32, false),
            FieldDef::new("transaction_index", FieldType::Int64, false),
            FieldDef::new("trace_address", FieldType::TraceAddress, false),
            FieldDef::new("gas_used", FieldType::Int64, false),
            FieldDef::new("error", FieldType::Text, true),
        ]
    }

    pub(crate) fn write(&self, w: &mut RowWriter<'_>) -> Result<(), SchemaValidationError> {
        w.u64(self.block_number)?;
        w.encoded(&self.transaction_hash);
        w.u64(self.transaction_index)?;
        w.encoded(&self.trace_address);
        w.u64(self.gas_used)?;
        w.text_opt(normalize_error(self.error.clone()).as_deref());
        Ok(())
    }

    pub(crate) fn read(r: &RowReader<'_>) -> Result<Self, SchemaValidationError> {
        Ok(Self {
            block_number: r.u64("block_number")?,
            transaction_hash: r.decoded("transaction_hash")?,
            transaction_index: r.u64("transaction_index")?,
            trace_address: r.decoded("trace_address")?,
            gas_used: r.u64("gas_used")?,
            error: r.text_opt("error")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferFields {
    pub block_number: u64,
    pub transaction_hash: Hash32,
    pub transaction_index: u64,
    pub log_index: u64,
    pub token_address: Address,
    pub from_address: Address,
    pub to_address: Address,
    pub value: UInt256,
}

impl TransferFields {
    pub(crate) fn fields() -> Vec<FieldDef> {
        vec![
            FieldDef::new("block_number", FieldType::BlockNumber, false).indexed(),
            FieldDef::new("transaction_hash", FieldType::Hash32, false),
            FieldDef::new("transaction_index", FieldType::Int64, false),
            FieldDef::new("log_index", FieldType::Int64, false),
            FieldDef::new("token_address", FieldType::Address, false).indexed(),
            FieldDef::new("from_address", FieldType::Address, false).indexed(),
            FieldDef::new("to_address", FieldType::Address, false).indexed(),
            FieldDef::new("value", FieldType::UInt256, false),
        ]
    }

    pub(crate) fn write(&self, w: &mut RowWriter<'_>) -> Result<(), SchemaValidationError> {
        w.u64(self.block_number)?;
        w.encoded(&self.transaction_hash);
        w.u64(self.transaction_index)?;
        w.u64(self.log_index)?;
        w.encoded(&self.token_address);
        w.encoded(&self.from_address);
        w.encoded(&self.to_address);
        w.encoded(&self.value);
        Ok(())
    }

    pub(crate) fn read(r: &RowReader<'_>) -> Result<Self, SchemaValidationError> {
        Ok(Self {
            block_number: r.u64("block_number")?,
            transaction_hash: r.decoded("transaction_hash")?,
            transaction_index: r.u64("transaction_index")?,
            log_index: r.u64("log_index")?,
            token_address: r.decoded("token_address")?,
            from_address: r.decoded("from_address")?,
            to_address: r.decoded("to_address")?,
            value: r.decoded("value")?,
        })
    }
}
