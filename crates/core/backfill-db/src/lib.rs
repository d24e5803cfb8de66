//! Backfill coverage tracking for the EVM ingestion pipeline.
//!
//! Records which block intervals of each `(network, data type, filter)` have been ingested,
//! answers which sub-ranges of a window are still missing, and keeps the contract ABI registry
//! used by decoding. Decoded chain entities are written through the same Postgres pool via
//! [`evm_schema::EntityWriter`].

use std::sync::Arc;

use evm_codec::{CanonicalEncoder, EncodingPolicy};
use tracing::instrument;

mod abis;
mod backfilled_ranges;
mod config;
mod db;
mod entities;
mod error;
mod key;
mod memory;
pub mod metadata;
mod ranges;
mod rows;
#[cfg(feature = "temp-db")]
pub mod temp;
mod tracker;

use self::db::ConnPool;
#[cfg(feature = "temp-db")]
pub use self::temp::{KEEP_TEMP_DIRS, TempBackfillDb, temp_backfill_db};
pub use self::{
    abis::AbiRegistry,
    config::PoolConfig,
    db::ConnError,
    error::{Error, InvalidRangeError, RangeConflictError},
    key::RangeKey,
    memory::{MemoryAbiRegistry, MemoryRangeStore},
    ranges::{BlockInterval, CoverageSet, MAX_STORABLE_BLOCK},
    tracker::{RangeStore, RecordOutcome, RecordPlan, plan_record},
};

/// Default pool size for the backfill DB.
pub const DEFAULT_POOL_SIZE: u32 = 10;

/// Connection pool to the backfill DB. Clones will refer to the same instance.
#[derive(Clone, Debug)]
pub struct BackfillDb {
    pool: ConnPool,
    url: Arc<str>,
    encoder: CanonicalEncoder,
}

impl BackfillDb {
    /// Sets up a connection pool to the backfill DB
    ///
    /// Runs migrations if necessary. Entities are stored in the textual layout.
    #[instrument(skip_all, err)]
    pub async fn connect(url: &str, pool_size: u32) -> Result<Self, Error> {
        Self::connect_with_config(
            url,
            &PoolConfig::with_size(pool_size),
            true,
            EncodingPolicy::default(),
        )
        .await
    }

    /// Sets up a connection pool to the backfill DB with explicit pool settings
    ///
    /// Runs migrations only if `auto_migrate` is true. `policy` selects the physical layout of
    /// the entity tables and must match the layout they were created with.
    #[instrument(skip_all, fields(policy = %policy), err)]
    pub async fn connect_with_config(
        url: &str,
        config: &PoolConfig,
        auto_migrate: bool,
        policy: EncodingPolicy,
    ) -> Result<Self, Error> {
        let pool = ConnPool::connect(url, config).await?;
        if auto_migrate {
            pool.run_migrations().await?;
        }
        Ok(Self {
            pool,
            url: url.into(),
            encoder: CanonicalEncoder::new(policy),
        })
    }

    /// Sets up a connection pool with retry logic for databases that are still starting.
    #[cfg(feature = "temp-db")]
    #[instrument(skip_all, err)]
    pub async fn connect_with_retry(
        url: &str,
        pool_size: u32,
        policy: EncodingPolicy,
    ) -> Result<Self, Error> {
        use std::time::Duration;

        use backon::{ExponentialBuilder, Retryable};

        let retry_policy = ExponentialBuilder::default()
            .with_min_delay(Duration::from_millis(10))
            .with_max_delay(Duration::from_millis(100))
            .with_max_times(20);

        fn is_db_starting_up(err: &ConnError) -> bool {
            matches!(
                err,
                ConnError::ConnectionError(sqlx::Error::Database(db_err))
                if db_err.code().is_some_and(|code| code == "57P03")
            )
        }

        fn notify_retry(err: &ConnError, dur: Duration) {
            tracing::warn!(
                error = %err,
                "Database still starting up during connection. Retrying in {:.1}s",
                dur.as_secs_f32()
            );
        }

        let config = PoolConfig::with_size(pool_size);
        let pool = (|| ConnPool::connect(url, &config))
            .retry(retry_policy)
            .when(is_db_starting_up)
            .notify(notify_retry)
            .await?;

        pool.run_migrations().await?;

        Ok(Self {
            pool,
            url: url.into(),
            encoder: CanonicalEncoder::new(policy),
        })
    }

    /// Encoder matching the physical layout of the entity tables.
    pub fn encoder(&self) -> &CanonicalEncoder {
        &self.encoder
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn default_pool_size() -> u32 {
        DEFAULT_POOL_SIZE
    }
}
