//! 采集结果的行模型
//!
//! 每种资源通过 [`Record`] 声明表名、自然键列和全部列；存储层只看到类型擦除后的
//! [`UpsertBatch`]，因此同一套存储实现可以服务所有资源类型。

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// 列值；可空列使用带类型的 `None`，保证绑定参数时类型明确
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(untagged)]
pub enum ColumnValue {
    Text(Option<String>),
    Int(Option<i64>),
    Bool(Option<bool>),
    Timestamp(Option<DateTime<Utc>>),
}

impl ColumnValue {
    pub fn text(value: impl Into<String>) -> Self {
        ColumnValue::Text(Some(value.into()))
    }

    pub fn opt_text(value: Option<String>) -> Self {
        ColumnValue::Text(value)
    }

    pub fn int(value: i64) -> Self {
        ColumnValue::Int(Some(value))
    }

    pub fn bool(value: bool) -> Self {
        ColumnValue::Bool(Some(value))
    }

    pub fn timestamp(value: Option<DateTime<Utc>>) -> Self {
        ColumnValue::Timestamp(value)
    }

    pub fn is_null(&self) -> bool {
        match self {
            ColumnValue::Text(v) => v.is_none(),
            ColumnValue::Int(v) => v.is_none(),
            ColumnValue::Bool(v) => v.is_none(),
            ColumnValue::Timestamp(v) => v.is_none(),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ColumnValue::Text(Some(v)) => Some(v.as_str()),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            ColumnValue::Int(v) => *v,
            _ => None,
        }
    }
}

impl fmt::Display for ColumnValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnValue::Text(Some(v)) => write!(f, "{v}"),
            ColumnValue::Int(Some(v)) => write!(f, "{v}"),
            ColumnValue::Bool(Some(v)) => write!(f, "{v}"),
            ColumnValue::Timestamp(Some(v)) => write!(f, "{}", v.to_rfc3339()),
            _ => write!(f, "NULL"),
        }
    }
}

/// 可被批量 upsert 的资源行
///
/// `COLUMNS` 必须包含 `KEY_COLUMNS`，且与 `values()` 的顺序一一对应。
/// 行类型实现 `Ord`，去重时同键的行按整行排序取第一条，结果与到达顺序无关。
pub trait Record: Ord + Clone + Send + Sync + 'static {
    const TABLE: &'static str;
    const KEY_COLUMNS: &'static [&'static str];
    const COLUMNS: &'static [&'static str];

    type Key: Ord + Clone + fmt::Debug;

    fn natural_key(&self) -> Self::Key;

    fn values(&self) -> Vec<ColumnValue>;
}

/// 类型擦除后的 upsert 批次
#[derive(Debug, Clone, PartialEq)]
pub struct UpsertBatch {
    pub table: &'static str,
    pub key_columns: &'static [&'static str],
    pub columns: &'static [&'static str],
    pub rows: Vec<Vec<ColumnValue>>,
}

impl UpsertBatch {
    pub fn from_records<R: Record>(records: &[R]) -> Self {
        Self {
            table: R::TABLE,
            key_columns: R::KEY_COLUMNS,
            columns: R::COLUMNS,
            rows: records.iter().map(Record::values).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// 冲突时需要更新的列（非键列）
    pub fn update_columns(&self) -> Vec<&'static str> {
        self.columns
            .iter()
            .filter(|c| !self.key_columns.contains(c))
            .copied()
            .collect()
    }

    fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| *c == column)
    }

    /// 提取一行的自然键
    pub fn key_of(&self, row: &[ColumnValue]) -> Vec<ColumnValue> {
        self.key_columns
            .iter()
            .filter_map(|c| self.column_index(c))
            .filter_map(|i| row.get(i).cloned())
            .collect()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpsertStats {
    pub inserted: u64,
    pub updated: u64,
}

impl UpsertStats {
    pub fn affected(&self) -> u64 {
        self.inserted + self.updated
    }

    pub fn merge(self, other: UpsertStats) -> UpsertStats {
        UpsertStats {
            inserted: self.inserted + other.inserted,
            updated: self.updated + other.updated,
        }
    }
}

/// 关系表定义：owner 表与 owned 表按列对连接，结果写入由两个代理键组成的关系表
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkSpec {
    pub name: &'static str,
    pub link_table: &'static str,
    pub owner_table: &'static str,
    pub owner_id_column: &'static str,
    pub owned_table: &'static str,
    pub owned_id_column: &'static str,
    /// (owner列, owned列)
    pub join_on: &'static [(&'static str, &'static str)],
}
