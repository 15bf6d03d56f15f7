//! 通用的并发安全注册表
//!
//! 任务处理器、周期任务、指标样本、客户端和会话都通过 `Registry<K, V>` 管理。
//! `range` 在锁内复制快照、在锁外遍历，因此回调可以重入同一个注册表。

use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::{PoisonError, RwLock};

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("注册项已存在: {0}")]
    AlreadyExists(String),
}

#[derive(Debug)]
pub struct Registry<K, V> {
    items: RwLock<HashMap<K, V>>,
}

impl<K, V> Registry<K, V>
where
    K: Eq + Hash + Clone + Debug,
    V: Clone,
{
    pub fn new() -> Self {
        Self {
            items: RwLock::new(HashMap::new()),
        }
    }

    /// 注册新条目，键已存在时返回 `AlreadyExists` 且保留原值
    pub fn register(&self, key: K, value: V) -> Result<(), RegistryError> {
        let mut items = self.items.write().unwrap_or_else(PoisonError::into_inner);
        if items.contains_key(&key) {
            return Err(RegistryError::AlreadyExists(format!("{key:?}")));
        }
        items.insert(key, value);
        Ok(())
    }

    /// 仅在初始化阶段使用，重复注册直接终止进程
    pub fn must_register(&self, key: K, value: V) {
        if let Err(e) = self.register(key, value) {
            panic!("{e}");
        }
    }

    /// 总是替换，返回被替换的旧值
    pub fn overwrite(&self, key: K, value: V) -> Option<V> {
        let mut items = self.items.write().unwrap_or_else(PoisonError::into_inner);
        items.insert(key, value)
    }

    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let items = self.items.read().unwrap_or_else(PoisonError::into_inner);
        items.get(key).cloned()
    }

    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let items = self.items.read().unwrap_or_else(PoisonError::into_inner);
        items.contains_key(key)
    }

    /// 删除条目并返回被删除的值；并发删除同一个键时只有一个调用方拿到值
    pub fn unregister<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let mut items = self.items.write().unwrap_or_else(PoisonError::into_inner);
        items.remove(key)
    }

    pub fn len(&self) -> usize {
        let items = self.items.read().unwrap_or_else(PoisonError::into_inner);
        items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn keys(&self) -> Vec<K> {
        let items = self.items.read().unwrap_or_else(PoisonError::into_inner);
        items.keys().cloned().collect()
    }

    pub fn snapshot(&self) -> Vec<(K, V)> {
        let items = self.items.read().unwrap_or_else(PoisonError::into_inner);
        items
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// 遍历快照，回调返回的第一个错误会终止遍历并向上传播
    pub fn range<E, F>(&self, mut f: F) -> Result<(), E>
    where
        F: FnMut(&K, &V) -> Result<(), E>,
    {
        for (key, value) in self.snapshot() {
            f(&key, &value)?;
        }
        Ok(())
    }
}

impl<K, V> Default for Registry<K, V>
where
    K: Eq + Hash + Clone + Debug,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}
