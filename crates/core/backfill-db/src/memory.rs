//! In-process implementations of the tracker and ABI registry

use std::{
    collections::{BTreeMap, HashMap},
    sync::{Mutex, PoisonError},
};

use evm_schema::entities::{BackfilledRangeRecord, ContractAbi, RangeMetadata};

use crate::{
    AbiRegistry, BlockInterval, Error, RangeKey, RangeStore, RecordOutcome,
    tracker::{RecordPlan, missing_in, plan_record},
};

/// [`RangeStore`] held in memory.
///
/// A single lock guards every key, so `record_completed` is trivially atomic per key.
#[derive(Debug, Default)]
pub struct MemoryRangeStore {
    ranges: Mutex<HashMap<RangeKey, Vec<BackfilledRangeRecord>>>,
}

impl MemoryRangeStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn apply(stored: &mut Vec<BackfilledRangeRecord>, plan: RecordPlan) {
    match plan {
        RecordPlan::Unchanged { .. } => {}
        RecordPlan::Refresh { record } => {
            if let Some(slot) = stored
                .iter_mut()
                .find(|r| r.start_block == record.start_block)
            {
                *slot = record;
            }
        }
        RecordPlan::Replace { absorbed, record } => {
            stored.retain(|r| !absorbed.iter().any(|a| a.start_block == r.start_block));
            let pos = stored.partition_point(|r| r.start_block < record.start_block);
            stored.insert(pos, record);
        }
    }
}

impl RangeStore for MemoryRangeStore {
    #[tracing::instrument(skip_all, fields(%key, %interval), err)]
    async fn record_completed(
        &self,
        key: &RangeKey,
        interval: BlockInterval,
        metadata: RangeMetadata,
    ) -> Result<RecordOutcome, Error> {
        let mut ranges = self.ranges.lock().unwrap_or_else(PoisonError::into_inner);
        let stored = ranges.entry(key.clone()).or_default();

        let plan = plan_record(key, stored, interval, metadata)?;
        let outcome = plan.outcome()?;
        apply(stored, plan);

        Ok(outcome)
    }

    #[tracing::instrument(skip_all, fields(%key, %window), err)]
    async fn missing_ranges(
        &self,
        key: &RangeKey,
        window: BlockInterval,
    ) -> Result<Vec<BlockInterval>, Error> {
        let ranges = self.ranges.lock().unwrap_or_else(PoisonError::into_inner);
        let stored = ranges.get(key).map(Vec::as_slice).unwrap_or_default();
        Ok(missing_in(stored, window)?)
    }

    #[tracing::instrument(skip_all, fields(%key), err)]
    async fn list_ranges(&self, key: &RangeKey) -> Result<Vec<BackfilledRangeRecord>, Error> {
        let ranges = self.ranges.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(ranges.get(key).cloned().unwrap_or_default())
    }
}

/// [`AbiRegistry`] held in memory.
#[derive(Debug, Default)]
pub struct MemoryAbiRegistry {
    abis: Mutex<BTreeMap<String, ContractAbi>>,
}

impl MemoryAbiRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AbiRegistry for MemoryAbiRegistry {
    async fn upsert_abi(&self, abi: &ContractAbi) -> Result<(), Error> {
        let mut abis = self.abis.lock().unwrap_or_else(PoisonError::into_inner);
        abis.insert(abi.abi_name.clone(), abi.clone());
        Ok(())
    }

    async fn get_abi(&self, name: &str) -> Result<Option<ContractAbi>, Error> {
        let abis = self.abis.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(abis.get(name).cloned())
    }

    async fn list_abis(&self) -> Result<Vec<ContractAbi>, Error> {
        let abis = self.abis.lock().unwrap_or_else(PoisonError::into_inner);
        let mut list = abis.values().cloned().collect::<Vec<_>>();
        list.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then_with(|| a.abi_name.cmp(&b.abi_name))
        });
        Ok(list)
    }

    async fn delete_abi(&self, name: &str) -> Result<bool, Error> {
        let mut abis = self.abis.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(abis.remove(name).is_some())
    }
}
