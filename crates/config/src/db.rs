use backfill_db::{BackfillDb, DEFAULT_POOL_SIZE, PoolConfig};
use evm_codec::EncodingPolicy;

/// Backfill database connection and behavior settings.
#[derive(Clone, serde::Deserialize)]
pub struct BackfillDbConfig {
    /// Database connection URL (required)
    pub url: String,
    /// Size of the connection pool (default: 10)
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,
    /// Automatically run database migrations on startup (default: true)
    #[serde(default = "default_auto_migrate")]
    pub auto_migrate: bool,
}

/// Serde default for [`BackfillDbConfig::pool_size`]. Returns [`DEFAULT_POOL_SIZE`].
fn default_pool_size() -> u32 {
    DEFAULT_POOL_SIZE
}

/// Serde default for [`BackfillDbConfig::auto_migrate`]. Returns `true`.
fn default_auto_migrate() -> bool {
    true
}

impl BackfillDbConfig {
    pub fn pool_config(&self) -> PoolConfig {
        PoolConfig::with_size(self.pool_size)
    }

    /// Connects with these settings, storing entities in the `policy` layout.
    pub async fn connect(&self, policy: EncodingPolicy) -> Result<BackfillDb, backfill_db::Error> {
        BackfillDb::connect_with_config(&self.url, &self.pool_config(), self.auto_migrate, policy)
            .await
    }
}

// The URL may carry credentials
impl std::fmt::Debug for BackfillDbConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackfillDbConfig")
            .field("url", &"<redacted>")
            .field("pool_size", &self.pool_size)
            .field("auto_migrate", &self.auto_migrate)
            .finish()
    }
}
