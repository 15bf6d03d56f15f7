use async_trait::async_trait;
use chrono::{DateTime, Utc};
use inventory_core::{
    models::{ColumnValue, LinkSpec, UpsertBatch, UpsertStats},
    traits::ResourceStore,
    InventoryError, InventoryResult,
};
use sqlx::{postgres::PgRow, PgPool, Postgres, QueryBuilder, Row};
use tracing::{debug, instrument};

/// PostgreSQL 单条语句的绑定参数上限
const MAX_BIND_PARAMS: usize = 65_535;

pub struct PostgresResourceStore {
    pool: PgPool,
}

impl PostgresResourceStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn count_inserted(rows: &[PgRow]) -> InventoryResult<UpsertStats> {
        let mut stats = UpsertStats::default();
        for row in rows {
            if row.try_get::<bool, _>("inserted")? {
                stats.inserted += 1;
            } else {
                stats.updated += 1;
            }
        }
        Ok(stats)
    }

    fn decode_column(row: &PgRow, index: usize) -> InventoryResult<ColumnValue> {
        if let Ok(v) = row.try_get::<Option<String>, _>(index) {
            return Ok(ColumnValue::Text(v));
        }
        if let Ok(v) = row.try_get::<Option<i64>, _>(index) {
            return Ok(ColumnValue::Int(v));
        }
        if let Ok(v) = row.try_get::<Option<bool>, _>(index) {
            return Ok(ColumnValue::Bool(v));
        }
        let v = row.try_get::<Option<DateTime<Utc>>, _>(index)?;
        Ok(ColumnValue::Timestamp(v))
    }

    fn build_upsert<'a>(
        batch: &UpsertBatch,
        rows: &'a [Vec<ColumnValue>],
    ) -> QueryBuilder<'a, Postgres> {
        let mut qb: QueryBuilder<'a, Postgres> = QueryBuilder::new(format!(
            "INSERT INTO {} ({}) ",
            batch.table,
            batch.columns.join(", ")
        ));

        qb.push_values(rows, |mut b, row| {
            for value in row {
                match value {
                    ColumnValue::Text(v) => b.push_bind(v.clone()),
                    ColumnValue::Int(v) => b.push_bind(*v),
                    ColumnValue::Bool(v) => b.push_bind(*v),
                    ColumnValue::Timestamp(v) => b.push_bind(*v),
                };
            }
        });

        qb.push(format!(
            " ON CONFLICT ({}) DO UPDATE SET ",
            batch.key_columns.join(", ")
        ));
        for column in batch.update_columns() {
            qb.push(format!("{column} = EXCLUDED.{column}, "));
        }
        // xmax = 0 表示本语句新插入的行
        qb.push("updated_at = now() RETURNING (xmax = 0) AS inserted");
        qb
    }
}

#[async_trait]
impl ResourceStore for PostgresResourceStore {
    #[instrument(skip(self, batch), fields(table = batch.table, rows = batch.len()))]
    async fn upsert(&self, batch: UpsertBatch) -> InventoryResult<UpsertStats> {
        if batch.is_empty() {
            return Ok(UpsertStats::default());
        }
        if batch.columns.is_empty() {
            return Err(InventoryError::DatabaseOperation(format!(
                "表 {} 没有可写入的列",
                batch.table
            )));
        }

        let rows_per_statement = (MAX_BIND_PARAMS / batch.columns.len()).max(1);
        let mut stats = UpsertStats::default();
        for chunk in batch.rows.chunks(rows_per_statement) {
            let mut qb = Self::build_upsert(&batch, chunk);
            let rows = qb.build().fetch_all(&self.pool).await?;
            stats = stats.merge(Self::count_inserted(&rows)?);
        }

        debug!(
            inserted = stats.inserted,
            updated = stats.updated,
            "upsert完成"
        );
        Ok(stats)
    }

    async fn select(
        &self,
        table: &'static str,
        columns: &'static [&'static str],
    ) -> InventoryResult<Vec<Vec<ColumnValue>>> {
        let column_list = columns.join(", ");
        let rows = sqlx::query(&format!(
            "SELECT DISTINCT {column_list} FROM {table} ORDER BY {column_list}"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                (0..columns.len())
                    .map(|i| Self::decode_column(row, i))
                    .collect::<InventoryResult<Vec<_>>>()
            })
            .collect()
    }

    #[instrument(skip(self, spec), fields(link = spec.name))]
    async fn link(&self, spec: &LinkSpec) -> InventoryResult<UpsertStats> {
        if spec.join_on.is_empty() {
            return Err(InventoryError::DatabaseOperation(format!(
                "关系 {} 没有连接条件",
                spec.name
            )));
        }

        let predicate = spec
            .join_on
            .iter()
            .map(|(owner, owned)| format!("o.{owner} = d.{owned}"))
            .collect::<Vec<_>>()
            .join(" AND ");

        let sql = format!(
            r#"
            INSERT INTO {link} ({owner_id}, {owned_id})
            SELECT DISTINCT o.id, d.id
            FROM {owner} o
            JOIN {owned} d ON {predicate}
            ON CONFLICT ({owner_id}, {owned_id}) DO UPDATE SET updated_at = now()
            RETURNING (xmax = 0) AS inserted
            "#,
            link = spec.link_table,
            owner_id = spec.owner_id_column,
            owned_id = spec.owned_id_column,
            owner = spec.owner_table,
            owned = spec.owned_table,
        );

        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        Self::count_inserted(&rows)
    }
}
