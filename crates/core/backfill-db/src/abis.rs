//! Contract ABI registry

use std::future::Future;

use evm_schema::{VmTag, entities::ContractAbi};
use sqlx::types::Json;

use crate::{BackfillDb, Error};

pub(crate) mod sql;

/// Named contract ABIs available to the decoding service.
pub trait AbiRegistry: Send + Sync {
    /// Inserts `abi`, replacing any ABI with the same name.
    fn upsert_abi(&self, abi: &ContractAbi) -> impl Future<Output = Result<(), Error>> + Send;

    fn get_abi(&self, name: &str) -> impl Future<Output = Result<Option<ContractAbi>, Error>> + Send;

    /// All ABIs, highest priority first, ties broken by name.
    fn list_abis(&self) -> impl Future<Output = Result<Vec<ContractAbi>, Error>> + Send;

    /// Returns whether an ABI was removed.
    fn delete_abi(&self, name: &str) -> impl Future<Output = Result<bool, Error>> + Send;
}

/// Row of `internal.contract_abis`
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct AbiRow {
    abi_name: String,
    abi_json: Json<Vec<serde_json::Value>>,
    priority: i64,
    vm_tag: String,
}

impl TryFrom<AbiRow> for ContractAbi {
    type Error = Error;

    fn try_from(row: AbiRow) -> Result<Self, Self::Error> {
        Ok(ContractAbi {
            abi_name: row.abi_name,
            abi_json: row.abi_json.0,
            priority: row.priority,
            vm_tag: row.vm_tag.parse::<VmTag>()?,
        })
    }
}

impl AbiRegistry for BackfillDb {
    #[tracing::instrument(skip(self, abi), fields(abi_name = %abi.abi_name), err)]
    async fn upsert_abi(&self, abi: &ContractAbi) -> Result<(), Error> {
        sql::upsert(&*self.pool, abi).await?;
        Ok(())
    }

    #[tracing::instrument(skip(self), err)]
    async fn get_abi(&self, name: &str) -> Result<Option<ContractAbi>, Error> {
        sql::get_by_name(&*self.pool, name)
            .await?
            .map(ContractAbi::try_from)
            .transpose()
    }

    #[tracing::instrument(skip(self), err)]
    async fn list_abis(&self) -> Result<Vec<ContractAbi>, Error> {
        sql::list(&*self.pool)
            .await?
            .into_iter()
            .map(ContractAbi::try_from)
            .collect()
    }

    #[tracing::instrument(skip(self), err)]
    async fn delete_abi(&self, name: &str) -> Result<bool, Error> {
        Ok(sql::delete(&*self.pool, name).await?)
    }
}
