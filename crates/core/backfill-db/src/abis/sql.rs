//! Internal SQL operations for the contract ABI registry

use evm_schema::entities::ContractAbi;
use sqlx::{Executor, Postgres, types::Json};

use super::AbiRow;

pub async fn upsert<'c, E>(exe: E, abi: &ContractAbi) -> Result<(), sqlx::Error>
where
    E: Executor<'c, Database = Postgres>,
{
    let query = indoc::indoc! {r#"
        INSERT INTO internal.contract_abis (abi_name, abi_json, priority, vm_tag)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (abi_name) DO UPDATE
        SET abi_json = EXCLUDED.abi_json,
            priority = EXCLUDED.priority,
            vm_tag = EXCLUDED.vm_tag
    "#};
    sqlx::query(query)
        .bind(&abi.abi_name)
        .bind(Json(&abi.abi_json))
        .bind(abi.priority)
        .bind(abi.vm_tag.as_str())
        .execute(exe)
        .await?;
    Ok(())
}

pub async fn get_by_name<'c, E>(exe: E, name: &str) -> Result<Option<AbiRow>, sqlx::Error>
where
    E: Executor<'c, Database = Postgres>,
{
    let query = indoc::indoc! {r#"
        SELECT abi_name, abi_json, priority, vm_tag
        FROM internal.contract_abis
        WHERE abi_name = $1
    "#};
    sqlx::query_as(query).bind(name).fetch_optional(exe).await
}

pub async fn list<'c, E>(exe: E) -> Result<Vec<AbiRow>, sqlx::Error>
where
    E: Executor<'c, Database = Postgres>,
{
    let query = indoc::indoc! {r#"
        SELECT abi_name, abi_json, priority, vm_tag
        FROM internal.contract_abis
        ORDER BY priority DESC, abi_name ASC
    "#};
    sqlx::query_as(query).fetch_all(exe).await
}

/// Returns whether a row was deleted
pub async fn delete<'c, E>(exe: E, name: &str) -> Result<bool, sqlx::Error>
where
    E: Executor<'c, Database = Postgres>,
{
    let query = "DELETE FROM internal.contract_abis WHERE abi_name = $1";
    let result = sqlx::query(query).bind(name).execute(exe).await?;
    Ok(result.rows_affected() > 0)
}
