//! Async facade over [`Database`]
//!
//! Engine calls block, so each one runs on tokio's blocking pool.

use crate::config::ClientConfig;
use crate::database::Database;
use crate::engine::Engine;
use stax_core::{Error, Result};
use stax_protocol::BatchOperation;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

/// Database wrapper for async callers
pub struct AsyncDatabase {
    config: ClientConfig,
    inner: RwLock<Option<Arc<Database>>>,
}

impl AsyncDatabase {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            inner: RwLock::new(None),
        }
    }

    /// Open over `engine`; fails with `AlreadyOpen` if already open
    pub async fn open<E: Engine + 'static>(&self, engine: Arc<E>) -> Result<()> {
        let mut inner = self.inner.write().await;
        if inner.is_some() {
            return Err(Error::AlreadyOpen);
        }

        let config = self.config.clone();
        let db = run_blocking(move || Database::open_with_config(engine, config)).await?;
        *inner = Some(Arc::new(db));
        info!("Async database opened");
        Ok(())
    }

    /// Close the database; closing a closed database is a no-op
    pub async fn close(&self) -> Result<()> {
        let Some(db) = self.inner.write().await.take() else {
            return Ok(());
        };
        run_blocking(move || db.close()).await?;
        info!("Async database closed");
        Ok(())
    }

    pub async fn is_open(&self) -> bool {
        self.inner.read().await.is_some()
    }

    /// Apply `operations` to the async batch collection
    pub async fn insert_batch(&self, operations: Vec<BatchOperation>) -> Result<()> {
        let db = self.database().await?;
        if operations.is_empty() {
            return Ok(());
        }

        let name = self.config.async_batch_collection.clone();
        run_blocking(move || db.collection(&name)?.execute_batch(&operations)).await
    }

    /// Read `keys` from the async multi-get collection, in order
    pub async fn multi_get(&self, keys: Vec<String>) -> Result<Vec<Option<String>>> {
        let db = self.database().await?;
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let name = self.config.async_multiget_collection.clone();
        run_blocking(move || {
            let collection = db.collection(&name)?;
            keys.iter().map(|key| collection.get(key)).collect()
        })
        .await
    }

    async fn database(&self) -> Result<Arc<Database>> {
        self.inner.read().await.clone().ok_or(Error::DatabaseClosed)
    }
}

impl Default for AsyncDatabase {
    fn default() -> Self {
        Self::new(ClientConfig::default())
    }
}

async fn run_blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| Error::Internal(format!("blocking task failed: {}", e)))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryEngine;

    #[tokio::test]
    async fn test_open_twice() {
        let db = AsyncDatabase::default();
        db.open(Arc::new(MemoryEngine::new())).await.unwrap();
        let err = db.open(Arc::new(MemoryEngine::new())).await.unwrap_err();
        assert!(matches!(err, Error::AlreadyOpen));
    }

    #[tokio::test]
    async fn test_requires_open() {
        let db = AsyncDatabase::default();
        assert!(matches!(db.insert_batch(vec![]).await, Err(Error::DatabaseClosed)));
        assert!(matches!(db.multi_get(vec![]).await, Err(Error::DatabaseClosed)));
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_batch_then_multi_get() {
        let config = ClientConfig {
            async_multiget_collection: "shared".to_string(),
            async_batch_collection: "shared".to_string(),
            ..ClientConfig::for_testing()
        };
        let db = AsyncDatabase::new(config);
        let engine = Arc::new(MemoryEngine::new());
        db.open(engine.clone()).await.unwrap();

        db.insert_batch(vec![BatchOperation::insert("a", "1"), BatchOperation::insert("b", "2")])
            .await
            .unwrap();
        db.insert_batch(vec![]).await.unwrap();
        assert_eq!(engine.batch_count(), 1);

        let values = db
            .multi_get(vec!["a".to_string(), "missing".to_string(), "b".to_string()])
            .await
            .unwrap();
        assert_eq!(values, vec![Some("1".to_string()), None, Some("2".to_string())]);
        assert!(db.multi_get(vec![]).await.unwrap().is_empty());

        db.close().await.unwrap();
        assert!(!db.is_open().await);
        assert!(engine.is_closed());
    }
}
