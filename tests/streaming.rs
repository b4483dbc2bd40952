use serde_json::json;
use staxdb::{ClientConfig, Database, KeyRange, MemoryEngine, Result};
use std::sync::Arc;

fn open(config: ClientConfig) -> Result<(Database, Arc<MemoryEngine>)> {
    let engine = Arc::new(MemoryEngine::new());
    let db = Database::open_with_config(engine.clone(), config)?;
    Ok((db, engine))
}

#[test]
fn stream_visits_every_record_and_closes() -> Result<()> {
    let (db, engine) = open(ClientConfig::default())?;
    let items = db.collection("items")?;
    for i in 0..120 {
        items.insert(&format!("item:{:03}", i), "x")?;
    }

    let stream = items.range(&KeyRange::all())?.records()?;
    let keys = stream
        .map(|r| r.map(|record| record.key_str().unwrap_or_default().to_string()))
        .collect::<Result<Vec<_>>>()?;

    assert_eq!(keys.len(), 120);
    assert_eq!(keys[0], "item:000");
    assert_eq!(keys[119], "item:119");
    assert_eq!(engine.open_result_sets(), 0);
    Ok(())
}

#[test]
fn early_break_releases_the_result_set() -> Result<()> {
    let (db, engine) = open(ClientConfig::for_testing())?;
    let items = db.collection("items")?;
    for i in 0..10 {
        items.insert(&format!("item:{}", i), "x")?;
    }

    for (seen, record) in items.range(&KeyRange::all())?.records()?.enumerate() {
        record?;
        if seen == 2 {
            break;
        }
    }
    assert_eq!(engine.open_result_sets(), 0);
    Ok(())
}

#[test]
fn graph_query_stream() -> Result<()> {
    let (db, engine) = open(ClientConfig::for_testing())?;
    let graph = db.graph()?;
    for i in 0..9 {
        graph.insert_object(json!({ "name": format!("user{}", i), "team": if i % 3 == 0 { "core" } else { "web" } }))?;
    }

    let names = graph
        .query()
        .find(json!({ "team": "web" }))?
        .execute()?
        .records()?
        .map(|r| r.map(|record| record.property("name").unwrap_or_default().to_string()))
        .collect::<Result<Vec<_>>>()?;

    assert_eq!(names.len(), 6);
    assert!(!names.contains(&"user0".to_string()));
    assert_eq!(engine.open_result_sets(), 0);
    Ok(())
}
