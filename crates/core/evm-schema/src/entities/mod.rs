//! Stored entity definitions

mod backfilled_range;
mod block;
mod common;
mod contract_abi;
mod erc20_transfer;
mod event;
mod trace;
mod transaction;

pub use self::{
    backfilled_range::{BackfillFilter, BackfilledRangeRecord, FilterValue, RangeMetadata},
    block::Block,
    common::{
        BlockFields, EMPTY_ERROR_SENTINEL, EventFields, TraceFields, TransactionFields,
        TransferFields, normalize_error,
    },
    contract_abi::ContractAbi,
    erc20_transfer::Erc20Transfer,
    event::Event,
    trace::Trace,
    transaction::Transaction,
};

/// Database schema holding decoded chain data.
pub const CHAIN_NAMESPACE: &str = "ethereum_data";

/// Database schema holding pipeline bookkeeping.
pub const INTERNAL_NAMESPACE: &str = "internal";
