use staxdb::{AsyncDatabase, BatchOperation, ClientConfig, Error, MemoryEngine};
use std::sync::Arc;

#[tokio::test]
async fn batch_and_multi_get_round_trip() {
    let engine = Arc::new(MemoryEngine::new());
    let db = AsyncDatabase::new(ClientConfig::default());
    db.open(engine.clone()).await.unwrap();

    db.insert_batch(vec![BatchOperation::insert("k1", "v1"), BatchOperation::insert("k2", "v2")])
        .await
        .unwrap();

    // Batches and multi-gets use separate collections by default
    let values = db.multi_get(vec!["k1".to_string()]).await.unwrap();
    assert_eq!(values, vec![None]);

    db.close().await.unwrap();
    assert!(engine.is_closed());
}

#[tokio::test]
async fn lifecycle_errors() {
    let db = AsyncDatabase::default();
    assert!(!db.is_open().await);
    assert!(matches!(
        db.insert_batch(vec![BatchOperation::remove("k")]).await,
        Err(Error::DatabaseClosed)
    ));

    db.open(Arc::new(MemoryEngine::new())).await.unwrap();
    assert!(matches!(
        db.open(Arc::new(MemoryEngine::new())).await,
        Err(Error::AlreadyOpen)
    ));

    db.close().await.unwrap();
    db.close().await.unwrap();
    assert!(matches!(db.multi_get(vec!["k".to_string()]).await, Err(Error::DatabaseClosed)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_batches() {
    let config = ClientConfig {
        async_multiget_collection: "async_batch_collection".to_string(),
        ..ClientConfig::default()
    };
    let db = Arc::new(AsyncDatabase::new(config));
    db.open(Arc::new(MemoryEngine::new())).await.unwrap();

    let mut tasks = Vec::new();
    for worker in 0..4 {
        let db = db.clone();
        tasks.push(tokio::spawn(async move {
            let ops = (0..10)
                .map(|i| BatchOperation::insert(format!("w{}:{}", worker, i), i.to_string()))
                .collect();
            db.insert_batch(ops).await
        }));
    }
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    let values = db
        .multi_get(vec!["w0:0".to_string(), "w3:9".to_string()])
        .await
        .unwrap();
    assert_eq!(values, vec![Some("0".to_string()), Some("9".to_string())]);
}
