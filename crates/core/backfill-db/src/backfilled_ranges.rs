//! Postgres-backed coverage tracking
//!
//! Writers of the same [`RangeKey`] are serialized with a transaction-scoped advisory lock, so
//! the read-plan-write cycle of `record_completed` never interleaves for one key. Distinct keys
//! proceed in parallel.

use evm_codec::EncodingPolicy;
use evm_schema::{
    Entity,
    entities::{BackfilledRangeRecord, RangeMetadata},
};
use sqlx::postgres::PgRow;

use crate::{
    BackfillDb, BlockInterval, Error, RangeKey, RangeStore, RecordOutcome,
    rows,
    tracker::{RecordPlan, missing_in, plan_record},
};

pub(crate) mod sql;

fn decode_records(
    policy: EncodingPolicy,
    pg_rows: Vec<PgRow>,
) -> Result<Vec<BackfilledRangeRecord>, Error> {
    let schema = BackfilledRangeRecord::schema();
    pg_rows
        .iter()
        .map(|pg_row| -> Result<_, Error> {
            let row = rows::decode_row(schema, policy, pg_row)?;
            Ok(BackfilledRangeRecord::from_row(&row)?)
        })
        .collect()
}

impl RangeStore for BackfillDb {
    #[tracing::instrument(skip_all, fields(%key, %interval), err)]
    async fn record_completed(
        &self,
        key: &RangeKey,
        interval: BlockInterval,
        metadata: RangeMetadata,
    ) -> Result<RecordOutcome, Error> {
        let mut tx = self.pool.begin().await?;
        sql::lock_key(&mut *tx, key).await?;

        let policy = self.encoder.policy();
        let stored = decode_records(policy, sql::touching(&mut *tx, key, interval).await?)?;
        let plan = plan_record(key, &stored, interval, metadata)?;
        let outcome = plan.outcome()?;

        match plan {
            RecordPlan::Unchanged { .. } => return Ok(outcome),
            RecordPlan::Refresh { record } => {
                sql::update_metadata(&mut *tx, &record).await?;
            }
            RecordPlan::Replace { absorbed, record } => {
                let starts = absorbed.iter().map(|r| r.start_block).collect::<Vec<_>>();
                sql::delete_by_start(&mut *tx, key, &starts).await?;
                let row = record.to_row(&self.encoder)?;
                sql::insert(&mut *tx, policy, &row).await?;
            }
        }

        tx.commit().await?;
        tracing::info!(
            covering = %outcome.covering,
            absorbed = outcome.absorbed.len(),
            "recorded backfilled range"
        );
        Ok(outcome)
    }

    #[tracing::instrument(skip_all, fields(%key, %window), err)]
    async fn missing_ranges(
        &self,
        key: &RangeKey,
        window: BlockInterval,
    ) -> Result<Vec<BlockInterval>, Error> {
        let stored = decode_records(
            self.encoder.policy(),
            sql::touching(&*self.pool, key, window).await?,
        )?;
        Ok(missing_in(&stored, window)?)
    }

    #[tracing::instrument(skip_all, fields(%key), err)]
    async fn list_ranges(&self, key: &RangeKey) -> Result<Vec<BackfilledRangeRecord>, Error> {
        decode_records(self.encoder.policy(), sql::list(&*self.pool, key).await?)
    }
}

/// In-tree integration tests
#[cfg(all(test, feature = "temp-db"))]
mod tests {
    mod it_ranges;
}
