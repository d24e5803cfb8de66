//! Internal SQL operations for backfilled ranges

use evm_codec::EncodingPolicy;
use evm_schema::{Entity, Row, entities::BackfilledRangeRecord};
use sqlx::{Executor, Postgres, postgres::PgRow, types::Json};

use crate::{BlockInterval, RangeKey, rows};

/// Block columns are `BIGINT`; every `BlockInterval` fits.
fn block(n: u64) -> i64 {
    n as i64
}

/// Serializes writers of `key` until the surrounding transaction ends.
pub async fn lock_key<'c, E>(exe: E, key: &RangeKey) -> Result<(), sqlx::Error>
where
    E: Executor<'c, Database = Postgres>,
{
    let query = "SELECT pg_advisory_xact_lock(hashtextextended($1, 0))";
    sqlx::query(query)
        .bind(key.to_string())
        .execute(exe)
        .await?;
    Ok(())
}

/// Ranges of `key`, ascending.
pub async fn list<'c, E>(exe: E, key: &RangeKey) -> Result<Vec<PgRow>, sqlx::Error>
where
    E: Executor<'c, Database = Postgres>,
{
    let query = rows::select_sql(
        BackfilledRangeRecord::schema(),
        indoc::indoc! {r#"
            WHERE data_type = $1 AND network = $2 AND filter_key = $3
            ORDER BY start_block
        "#},
    );
    sqlx::query(&query)
        .bind(key.data_type().as_str())
        .bind(key.network().as_str())
        .bind(key.filter_key())
        .fetch_all(exe)
        .await
}

/// Ranges of `key` that overlap or touch `interval`, ascending.
pub async fn touching<'c, E>(
    exe: E,
    key: &RangeKey,
    interval: BlockInterval,
) -> Result<Vec<PgRow>, sqlx::Error>
where
    E: Executor<'c, Database = Postgres>,
{
    let query = rows::select_sql(
        BackfilledRangeRecord::schema(),
        indoc::indoc! {r#"
            WHERE data_type = $1 AND network = $2 AND filter_key = $3
              AND start_block <= $5 AND end_block >= $4
            ORDER BY start_block
        "#},
    );
    sqlx::query(&query)
        .bind(key.data_type().as_str())
        .bind(key.network().as_str())
        .bind(key.filter_key())
        .bind(block(interval.start()))
        .bind(block(interval.end()))
        .fetch_all(exe)
        .await
}

pub async fn insert<'c, E>(exe: E, policy: EncodingPolicy, row: &Row) -> Result<(), sqlx::Error>
where
    E: Executor<'c, Database = Postgres>,
{
    let schema = BackfilledRangeRecord::schema();
    let query = rows::insert_sql(schema);
    rows::bind_row(sqlx::query(&query), schema, policy, row)
        .execute(exe)
        .await?;
    Ok(())
}

/// Deletes the ranges of `key` starting at any of `starts`, returning how many were removed.
pub async fn delete_by_start<'c, E>(
    exe: E,
    key: &RangeKey,
    starts: &[u64],
) -> Result<u64, sqlx::Error>
where
    E: Executor<'c, Database = Postgres>,
{
    let query = indoc::indoc! {r#"
        DELETE FROM internal.backfilled_ranges
        WHERE data_type = $1 AND network = $2 AND filter_key = $3
          AND start_block = ANY($4)
    "#};
    let starts = starts.iter().copied().map(block).collect::<Vec<_>>();
    let result = sqlx::query(query)
        .bind(key.data_type().as_str())
        .bind(key.network().as_str())
        .bind(key.filter_key())
        .bind(starts)
        .execute(exe)
        .await?;
    Ok(result.rows_affected())
}

/// Overwrites the metadata of a stored range in place.
pub async fn update_metadata<'c, E>(
    exe: E,
    record: &BackfilledRangeRecord,
) -> Result<(), sqlx::Error>
where
    E: Executor<'c, Database = Postgres>,
{
    let query = indoc::indoc! {r#"
        UPDATE internal.backfilled_ranges
        SET metadata = $6, decoded_abis = $7
        WHERE data_type = $1 AND network = $2 AND filter_key = $3
          AND start_block = $4 AND end_block = $5
    "#};
    sqlx::query(query)
        .bind(record.data_type.as_str())
        .bind(record.network.as_str())
        .bind(record.filter_key())
        .bind(block(record.start_block))
        .bind(block(record.end_block))
        .bind(record.metadata.metadata.as_ref().map(Json))
        .bind(record.metadata.decoded_abis.as_ref().map(Json))
        .execute(exe)
        .await?;
    Ok(())
}
