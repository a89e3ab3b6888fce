//! 记录存储
//!
//! 所有实体都以 JSON 文档的形式按 (kind, id) 保存。默认使用内存存储，
//! 配置了数据库连接时使用 Postgres。

use serde::{de::DeserializeOwned, Serialize};
use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
};
use uuid::Uuid;

use crate::core::error::CoreError;

#[cfg(feature = "database")]
use super::database::PgStore;

/// 可持久化的实体
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// 存储键
    const KIND: &'static str;
    /// 提示文案中使用的名称
    const LABEL: &'static str;

    fn id(&self) -> Uuid;
}

type Table = HashMap<Uuid, serde_json::Value>;

/// 内存存储
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<HashMap<&'static str, Table>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read<R>(&self, f: impl FnOnce(&HashMap<&'static str, Table>) -> R) -> Result<R, CoreError> {
        let tables = self
            .tables
            .read()
            .map_err(|_| CoreError::Internal("存储锁已损坏".to_string()))?;
        Ok(f(&tables))
    }

    fn write<R>(
        &self,
        f: impl FnOnce(&mut HashMap<&'static str, Table>) -> R,
    ) -> Result<R, CoreError> {
        let mut tables = self
            .tables
            .write()
            .map_err(|_| CoreError::Internal("存储锁已损坏".to_string()))?;
        Ok(f(&mut tables))
    }

    pub fn list_values(&self, kind: &'static str) -> Result<Vec<serde_json::Value>, CoreError> {
        self.read(|t| t.get(kind).map(|rows| rows.values().cloned().collect()).unwrap_or_default())
    }

    pub fn get_value(&self, kind: &'static str, id: Uuid) -> Result<Option<serde_json::Value>, CoreError> {
        self.read(|t| t.get(kind).and_then(|rows| rows.get(&id).cloned()))
    }

    pub fn put_value(&self, kind: &'static str, id: Uuid, body: serde_json::Value) -> Result<(), CoreError> {
        self.write(|t| {
            t.entry(kind).or_default().insert(id, body);
        })
    }

    pub fn remove_value(&self, kind: &'static str, id: Uuid) -> Result<bool, CoreError> {
        self.write(|t| t.get_mut(kind).and_then(|rows| rows.remove(&id)).is_some())
    }

    pub fn count(&self, kind: &'static str) -> Result<usize, CoreError> {
        self.read(|t| t.get(kind).map(|rows| rows.len()).unwrap_or(0))
    }
}

/// 存储后端
#[derive(Clone)]
pub enum Store {
    Memory(MemoryStore),
    #[cfg(feature = "database")]
    Postgres(PgStore),
}

impl Store {
    pub fn memory() -> Self {
        Store::Memory(MemoryStore::new())
    }

    pub fn backend(&self) -> &'static str {
        match self {
            Store::Memory(_) => "in-memory",
            #[cfg(feature = "database")]
            Store::Postgres(_) => "postgres",
        }
    }

    pub async fn list<T: Record>(&self) -> Result<Vec<T>, CoreError> {
        let values = match self {
            Store::Memory(m) => m.list_values(T::KIND)?,
            #[cfg(feature = "database")]
            Store::Postgres(pg) => pg.list_values(T::KIND).await?,
        };

        values
            .into_iter()
            .map(|v| serde_json::from_value(v).map_err(CoreError::from))
            .collect()
    }

    pub async fn get<T: Record>(&self, id: Uuid) -> Result<Option<T>, CoreError> {
        let value = match self {
            Store::Memory(m) => m.get_value(T::KIND, id)?,
            #[cfg(feature = "database")]
            Store::Postgres(pg) => pg.get_value(T::KIND, id).await?,
        };

        value
            .map(|v| serde_json::from_value(v).map_err(CoreError::from))
            .transpose()
    }

    /// 读取单条记录，不存在时返回 NotFound
    pub async fn fetch<T: Record>(&self, id: Uuid) -> Result<T, CoreError> {
        self.get::<T>(id)
            .await?
            .ok_or_else(|| CoreError::not_found(T::LABEL, id))
    }

    /// 确认记录存在
    pub async fn ensure_exists<T: Record>(&self, id: Uuid) -> Result<(), CoreError> {
        self.fetch::<T>(id).await.map(|_| ())
    }

    pub async fn upsert<T: Record>(&self, record: &T) -> Result<(), CoreError> {
        let body = serde_json::to_value(record)?;
        match self {
            Store::Memory(m) => m.put_value(T::KIND, record.id(), body),
            #[cfg(feature = "database")]
            Store::Postgres(pg) => pg.put_value(T::KIND, record.id(), body).await,
        }
    }

    pub async fn remove<T: Record>(&self, id: Uuid) -> Result<bool, CoreError> {
        match self {
            Store::Memory(m) => m.remove_value(T::KIND, id),
            #[cfg(feature = "database")]
            Store::Postgres(pg) => pg.remove_value(T::KIND, id).await,
        }
    }

    /// 删除记录，不存在时返回 NotFound
    pub async fn delete<T: Record>(&self, id: Uuid) -> Result<(), CoreError> {
        if self.remove::<T>(id).await? {
            Ok(())
        } else {
            Err(CoreError::not_found(T::LABEL, id))
        }
    }

    pub async fn count<T: Record>(&self) -> Result<usize, CoreError> {
        match self {
            Store::Memory(m) => m.count(T::KIND),
            #[cfg(feature = "database")]
            Store::Postgres(pg) => pg.count(T::KIND).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Note {
        id: Uuid,
        text: String,
    }

    impl Record for Note {
        const KIND: &'static str = "note";
        const LABEL: &'static str = "笔记";

        fn id(&self) -> Uuid {
            self.id
        }
    }

    #[tokio::test]
    async fn memory_store_crud() {
        let store = Store::memory();
        let note = Note {
            id: Uuid::new_v4(),
            text: "feed chickens".to_string(),
        };

        store.upsert(&note).await.unwrap();
        assert_eq!(store.count::<Note>().await.unwrap(), 1);
        assert_eq!(store.fetch::<Note>(note.id).await.unwrap(), note);

        let mut edited = note.clone();
        edited.text = "feed goats".to_string();
        store.upsert(&edited).await.unwrap();
        assert_eq!(store.list::<Note>().await.unwrap(), vec![edited]);

        store.delete::<Note>(note.id).await.unwrap();
        assert!(store.get::<Note>(note.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn missing_record_is_not_found() {
        let store = Store::memory();
        let err = store.fetch::<Note>(Uuid::nil()).await.unwrap_err();
        assert!(matches!(err, CoreError::NotFound(_)));

        let err = store.delete::<Note>(Uuid::nil()).await.unwrap_err();
        assert!(matches!(err, CoreError::NotFound(_)));
    }
}
