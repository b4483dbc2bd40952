use serde_json::json;
use staxdb::protocol::{decode_batch, encode_batch};
use staxdb::{BatchOperation, Database, Error, KeyRange, MemoryEngine, ObjectId, Result};
use std::sync::Arc;

fn open() -> Result<(Database, Arc<MemoryEngine>)> {
    let engine = Arc::new(MemoryEngine::new());
    let db = Database::open_for_testing(engine.clone())?;
    Ok((db, engine))
}

#[test]
fn batch_layout_is_byte_exact() -> Result<()> {
    let buffer = encode_batch(&[BatchOperation::insert("k1", "v1"), BatchOperation::remove("k2")])?;
    assert_eq!(
        buffer,
        vec![
            2, 0, 0, 0, // count
            1, 2, 0, 0, 0, b'k', b'1', 2, 0, 0, 0, b'v', b'1', // insert
            2, 2, 0, 0, 0, b'k', b'2', // remove
        ]
    );
    assert_eq!(buffer.len(), 24);
    assert_eq!(decode_batch(&buffer)?.len(), 2);
    Ok(())
}

#[test]
fn batches_apply_in_order() -> Result<()> {
    let (db, engine) = open()?;
    let kv = db.collection("kv")?;

    kv.execute_batch(&[
        BatchOperation::insert("k", "first"),
        BatchOperation::remove("k"),
        BatchOperation::insert("k", "second"),
    ])?;
    assert_eq!(kv.get("k")?.as_deref(), Some("second"));

    kv.execute_batch(&[])?;
    assert_eq!(engine.batch_count(), 1);
    Ok(())
}

#[test]
fn write_transaction_commit_and_reuse() -> Result<()> {
    let (db, _engine) = open()?;
    let kv = db.collection("kv")?;

    let mut txn = kv.begin_write_transaction()?;
    txn.insert("a", "1")?;
    txn.insert("b", "2")?;
    txn.remove("a")?;
    txn.commit()?;

    assert_eq!(kv.get("a")?, None);
    assert_eq!(kv.get("b")?.as_deref(), Some("2"));
    assert!(matches!(txn.insert("c", "3"), Err(Error::TransactionClosed(_))));
    Ok(())
}

#[test]
fn dropped_write_transaction_is_discarded() -> Result<()> {
    let (db, _engine) = open()?;
    let kv = db.collection("kv")?;
    {
        let mut txn = kv.begin_write_transaction()?;
        txn.insert("ghost", "boo")?;
    }
    assert_eq!(kv.get("ghost")?, None);
    Ok(())
}

#[test]
fn graph_transaction_is_atomic() -> Result<()> {
    let (db, engine) = open()?;
    let graph = db.graph()?;

    let mut txn = graph.begin_transaction()?;
    let a = txn.insert_object(json!({ "name": "a" }))?;
    let b = txn.insert_object(json!({ "name": "b" }))?;
    txn.insert_relationship(a, "KNOWS", b)?;
    assert_eq!(engine.object_count(), 0);
    txn.commit()?;
    assert_eq!(engine.object_count(), 2);

    let mut txn = graph.begin_transaction()?;
    txn.delete_object(a)?;
    txn.abort()?;
    assert_eq!(engine.object_count(), 2);
    Ok(())
}

#[test]
fn failed_graph_commit_leaves_graph_unchanged() -> Result<()> {
    let (db, engine) = open()?;
    let graph = db.graph()?;

    let mut txn = graph.begin_transaction()?;
    let a = txn.insert_object(json!({ "name": "a" }))?;
    txn.insert_relationship(a, "KNOWS", ObjectId::from_internal(999))?;
    assert!(txn.commit().is_err());
    assert_eq!(engine.object_count(), 0);
    Ok(())
}

#[test]
fn prefix_range_includes_every_continuation() -> Result<()> {
    let (db, _engine) = open()?;
    let kv = db.collection("kv")?;
    for key in ["user:alice", "user:émile", "user:~x", "users", "other"] {
        kv.insert(key, "v")?;
    }

    let keys: Vec<String> = kv
        .range(&KeyRange::prefix("user:"))?
        .records()?
        .map(|r| r.map(|record| record.key_str().unwrap_or_default().to_string()))
        .collect::<Result<_>>()?;
    assert_eq!(keys, vec!["user:alice", "user:~x", "user:émile"]);
    Ok(())
}

#[test]
fn closed_database_rejects_everything() -> Result<()> {
    let (db, _engine) = open()?;
    let kv = db.collection("kv")?;
    db.close()?;
    db.close()?;

    assert!(matches!(kv.get("a"), Err(Error::DatabaseClosed)));
    assert!(matches!(db.graph(), Err(Error::DatabaseClosed)));
    Ok(())
}
