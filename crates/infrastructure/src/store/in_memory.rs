use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use inventory_core::{
    models::{ColumnValue, LinkSpec, UpsertBatch, UpsertStats},
    traits::ResourceStore,
    Clock, InventoryError, InventoryResult, SystemClock,
};
use tokio::sync::RwLock;

/// 内存中的一行资源，带代理键和时间戳
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRow {
    pub id: i64,
    pub values: Vec<ColumnValue>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct Table {
    columns: Vec<&'static str>,
    rows: BTreeMap<Vec<ColumnValue>, StoredRow>,
    next_id: i64,
}

impl Table {
    fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| *c == column)
    }

    fn value<'a>(&self, row: &'a StoredRow, column: &str) -> Option<&'a ColumnValue> {
        self.column_index(column).and_then(|i| row.values.get(i))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkRow {
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct StoreState {
    tables: HashMap<&'static str, Table>,
    links: HashMap<&'static str, BTreeMap<(i64, i64), LinkRow>>,
}

/// 内存资源存储
///
/// 冲突语义与 PostgreSQL 实现一致：按自然键插入或更新，冲突时刷新 `updated_at`；
/// 同一批次内出现重复自然键视为错误。
pub struct InMemoryResourceStore {
    state: RwLock<StoreState>,
    clock: Arc<dyn Clock>,
}

impl InMemoryResourceStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            state: RwLock::new(StoreState::default()),
            clock,
        }
    }

    /// 表中所有行，按自然键排序
    pub async fn rows(&self, table: &str) -> Vec<StoredRow> {
        let state = self.state.read().await;
        state
            .tables
            .get(table)
            .map(|t| t.rows.values().cloned().collect())
            .unwrap_or_default()
    }

    pub async fn row_by_key(&self, table: &str, key: &[ColumnValue]) -> Option<StoredRow> {
        let state = self.state.read().await;
        state.tables.get(table)?.rows.get(key).cloned()
    }

    /// 关系表中的 (owner_id, owned_id) 对
    pub async fn links(&self, link_table: &str) -> Vec<((i64, i64), LinkRow)> {
        let state = self.state.read().await;
        state
            .links
            .get(link_table)
            .map(|l| l.iter().map(|(k, v)| (*k, *v)).collect())
            .unwrap_or_default()
    }
}

impl Default for InMemoryResourceStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ResourceStore for InMemoryResourceStore {
    async fn upsert(&self, batch: UpsertBatch) -> InventoryResult<UpsertStats> {
        if batch.is_empty() {
            return Ok(UpsertStats::default());
        }

        let mut seen = BTreeSet::new();
        for row in &batch.rows {
            if row.len() != batch.columns.len() {
                return Err(InventoryError::DatabaseOperation(format!(
                    "表 {} 的行列数不匹配",
                    batch.table
                )));
            }
            if !seen.insert(batch.key_of(row)) {
                return Err(InventoryError::DatabaseOperation(format!(
                    "表 {} 的同一批次中存在重复的自然键",
                    batch.table
                )));
            }
        }

        let now = self.clock.now();
        let mut state = self.state.write().await;
        let table = state.tables.entry(batch.table).or_default();
        if table.columns.is_empty() {
            table.columns = batch.columns.to_vec();
        }

        let mut stats = UpsertStats::default();
        for row in &batch.rows {
            let key = batch.key_of(row);
            match table.rows.get_mut(&key) {
                Some(existing) => {
                    existing.values = row.clone();
                    existing.updated_at = now;
                    stats.updated += 1;
                }
                None => {
                    table.next_id += 1;
                    table.rows.insert(
                        key,
                        StoredRow {
                            id: table.next_id,
                            values: row.clone(),
                            created_at: now,
                            updated_at: now,
                        },
                    );
                    stats.inserted += 1;
                }
            }
        }

        Ok(stats)
    }

    async fn select(
        &self,
        table: &'static str,
        columns: &'static [&'static str],
    ) -> InventoryResult<Vec<Vec<ColumnValue>>> {
        let state = self.state.read().await;
        let Some(data) = state.tables.get(table) else {
            return Ok(Vec::new());
        };

        let indexes = columns
            .iter()
            .map(|c| {
                data.column_index(c).ok_or_else(|| {
                    InventoryError::DatabaseOperation(format!("表 {table} 不存在列 {c}"))
                })
            })
            .collect::<InventoryResult<Vec<_>>>()?;

        let distinct: BTreeSet<Vec<ColumnValue>> = data
            .rows
            .values()
            .map(|row| indexes.iter().map(|i| row.values[*i].clone()).collect())
            .collect();
        Ok(distinct.into_iter().collect())
    }

    async fn link(&self, spec: &LinkSpec) -> InventoryResult<UpsertStats> {
        let now = self.clock.now();
        let mut state = self.state.write().await;

        let pairs: BTreeSet<(i64, i64)> = match (
            state.tables.get(spec.owner_table),
            state.tables.get(spec.owned_table),
        ) {
            (Some(owner), Some(owned)) => {
                let mut pairs = BTreeSet::new();
                for o in owner.rows.values() {
                    for d in owned.rows.values() {
                        let joined = spec.join_on.iter().all(|(oc, dc)| {
                            match (owner.value(o, oc), owned.value(d, dc)) {
                                (Some(a), Some(b)) => !a.is_null() && a == b,
                                _ => false,
                            }
                        });
                        if joined {
                            pairs.insert((o.id, d.id));
                        }
                    }
                }
                pairs
            }
            _ => BTreeSet::new(),
        };

        let links = state.links.entry(spec.link_table).or_default();
        let mut stats = UpsertStats::default();
        for pair in pairs {
            match links.get_mut(&pair) {
                Some(existing) => {
                    existing.updated_at = now;
                    stats.updated += 1;
                }
                None => {
                    links.insert(
                        pair,
                        LinkRow {
                            created_at: now,
                            updated_at: now,
                        },
                    );
                    stats.inserted += 1;
                }
            }
        }

        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use inventory_core::ManualClock;

    const COLUMNS: &[&str] = &["name", "namespace"];

    fn batch(rows: &[(&str, &str)]) -> UpsertBatch {
        UpsertBatch {
            table: "g_project",
            key_columns: &["name"],
            columns: COLUMNS,
            rows: rows
                .iter()
                .map(|(n, ns)| vec![ColumnValue::text(*n), ColumnValue::text(*ns)])
                .collect(),
        }
    }

    #[tokio::test]
    async fn test_upsert_insert_then_update() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let store = InMemoryResourceStore::with_clock(clock.clone());

        let stats = store.upsert(batch(&[("dev", "garden-dev")])).await.unwrap();
        assert_eq!(stats, UpsertStats { inserted: 1, updated: 0 });

        clock.advance(Duration::minutes(1));
        let stats = store.upsert(batch(&[("dev", "garden-dev2")])).await.unwrap();
        assert_eq!(stats, UpsertStats { inserted: 0, updated: 1 });

        let rows = store.rows("g_project").await;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, 1);
        assert_eq!(rows[0].values[1], ColumnValue::text("garden-dev2"));
        assert!(rows[0].updated_at > rows[0].created_at);
    }

    #[tokio::test]
    async fn test_duplicate_key_in_batch_rejected() {
        let store = InMemoryResourceStore::new();
        let result = store
            .upsert(batch(&[("dev", "a"), ("dev", "b")]))
            .await;
        assert!(result.is_err());
        assert!(store.rows("g_project").await.is_empty());
    }

    #[tokio::test]
    async fn test_select_distinct_sorted() {
        let store = InMemoryResourceStore::new();
        store
            .upsert(batch(&[("b", "shared"), ("a", "shared"), ("c", "other")]))
            .await
            .unwrap();

        let values = store.select("g_project", &["namespace"]).await.unwrap();
        assert_eq!(
            values,
            vec![vec![ColumnValue::text("other")], vec![ColumnValue::text("shared")]]
        );
        assert!(store.select("g_project", &["missing"]).await.is_err());
        assert!(store.select("g_seed", &["name"]).await.unwrap().is_empty());
    }
}
