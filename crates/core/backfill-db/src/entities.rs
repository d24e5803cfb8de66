//! Postgres storage of decoded chain entities

use evm_schema::{
    DuplicateKeyError, Entity, EntitySchema, EntityWriter, Row, WriteError, chain_schemas, ddl,
    validate_batch,
};

use crate::{BackfillDb, Error, rows};

impl BackfillDb {
    /// Creates the chain data namespace, tables and indexes for the configured layout.
    ///
    /// Idempotent.
    #[tracing::instrument(skip(self), err)]
    pub async fn create_entity_tables(&self) -> Result<(), Error> {
        let mut tx = self.pool.begin().await?;
        for schema in chain_schemas() {
            for statement in ddl::create_all(schema, self.encoder.policy()) {
                sqlx::query(&statement).execute(&mut *tx).await?;
            }
        }
        tx.commit().await?;
        Ok(())
    }

    /// Reads back every stored `E` in primary key order.
    #[tracing::instrument(skip(self), fields(table = E::schema().name()), err)]
    pub async fn fetch_entities<E: Entity>(&self) -> Result<Vec<E>, Error> {
        let schema = E::schema();
        let order = schema
            .key_fields()
            .map(|f| f.name)
            .collect::<Vec<_>>()
            .join(", ");
        let sql = rows::select_sql(schema, &format!("ORDER BY {order}"));

        let policy = self.encoder.policy();
        sqlx::query(&sql)
            .fetch_all(&*self.pool)
            .await?
            .iter()
            .map(|pg_row| -> Result<E, Error> {
                let row = rows::decode_row(schema, policy, pg_row)?;
                Ok(E::from_row(&row)?)
            })
            .collect()
    }
}

impl EntityWriter for BackfillDb {
    #[tracing::instrument(skip_all, fields(table = schema.name(), rows = rows.len()), err)]
    async fn insert_rows(
        &self,
        schema: &'static EntitySchema,
        rows: Vec<Row>,
    ) -> Result<usize, WriteError> {
        let keys = validate_batch(schema, &rows, &self.encoder)?;
        let sql = rows::insert_sql(schema);
        let policy = self.encoder.policy();

        let mut tx = self.pool.begin().await.map_err(driver_error)?;
        for (key, row) in keys.into_iter().zip(&rows) {
            let result = rows::bind_row(sqlx::query(&sql), schema, policy, row)
                .execute(&mut *tx)
                .await;
            match result {
                Ok(_) => {}
                Err(sqlx::Error::Database(err)) if err.is_unique_violation() => {
                    return Err(DuplicateKeyError {
                        entity: schema.name(),
                        key,
                    }
                    .into());
                }
                Err(err) => return Err(driver_error(err)),
            }
        }
        tx.commit().await.map_err(driver_error)?;

        Ok(rows.len())
    }
}

fn driver_error(err: sqlx::Error) -> WriteError {
    WriteError::Driver(Box::new(err))
}

/// In-tree integration tests
#[cfg(all(test, feature = "temp-db"))]
mod tests {
    mod it_entities;
}
