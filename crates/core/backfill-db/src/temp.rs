use std::sync::LazyLock;

use evm_codec::EncodingPolicy;
use pgtemp::{PgTempDB, PgTempDBBuilder};
use tokio::sync::OnceCell;

use crate::{BackfillDb, DEFAULT_POOL_SIZE};

/// Whether to keep the temporary directory after the backfill DB is dropped
///
/// This is set to `false` by default, but can be overridden by the `KEEP_TEMP_DIRS` environment
/// variable.
pub static KEEP_TEMP_DIRS: LazyLock<bool> = LazyLock::new(|| {
    std::env::var("KEEP_TEMP_DIRS")
        .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
        .unwrap_or(false)
});

/// Backfill DB on a throwaway PostgreSQL instance
///
/// On drop, the database is deleted.
pub struct TempBackfillDb {
    inner: BackfillDb,

    /// On drop, the database is deleted.
    _temp_db: PgTempDB,
}

impl TempBackfillDb {
    /// Starts a temporary PostgreSQL, migrates it and creates the entity tables for `policy`.
    pub async fn new(keep: bool, policy: EncodingPolicy) -> Self {
        let builder = PgTempDBBuilder::new().persist_data(keep);
        let pg_temp = PgTempDB::from_builder(builder);

        tracing::info!(
            "initializing temp backfill-db at: {}",
            pg_temp.data_dir().display()
        );
        let uri = pg_temp.connection_uri();

        let db = BackfillDb::connect_with_retry(&uri, DEFAULT_POOL_SIZE, policy)
            .await
            .expect("failed to connect to backfill-db");
        db.create_entity_tables()
            .await
            .expect("failed to create entity tables");

        Self {
            inner: db,
            _temp_db: pg_temp,
        }
    }
}

impl std::ops::Deref for TempBackfillDb {
    type Target = BackfillDb;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

/// Temp backfill db for sharing among tests. It is shared with the reasoning that this helps us
/// catch more bugs, even if it is less deterministic.
static TEMP_BACKFILL_DB: OnceCell<TempBackfillDb> = OnceCell::const_new();

/// Shared temporary backfill DB in the textual layout
pub async fn temp_backfill_db() -> &'static TempBackfillDb {
    TEMP_BACKFILL_DB
        .get_or_init(|| TempBackfillDb::new(*KEEP_TEMP_DIRS, EncodingPolicy::Textual))
        .await
}
