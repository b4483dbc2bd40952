//! In-memory engine
//!
//! A complete [`Engine`] kept in process memory. It compiles plans by shape
//! and evaluates them from the runtime parameters alone, the same split a
//! native engine uses, so tests exercise the real client contract. A few
//! switches let tests provoke engine failures.
//!
//! Each `Find` step replaces the running set; `Intersect` and `Union`
//! combine with it.

use crate::engine::{Engine, GraphTransactionHandle, KvTransactionHandle, ObjectData, ResultHandle};
use serde_json::Value;
use stax_core::{CollectionId, Direction, Error, ObjectId, PlanId, Result};
use stax_protocol::{BatchOperation, KeyRange, PageRequest, PlanParameters, Record, ResultPage, decode_batch};
use stax_query::criterion::MAX_EXACT_FLOAT_INT;
use stax_query::{OpType, PlanSignature, QueryPlan, geohash, number_key};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info};

type Relationship = (ObjectId, String, ObjectId);

#[derive(Debug, Default)]
struct Store {
    collection_ids: HashMap<String, CollectionId>,
    collections: Vec<BTreeMap<Vec<u8>, Vec<u8>>>,
    objects: BTreeMap<ObjectId, ObjectData>,
    relationships: Vec<Relationship>,
    next_object: u32,
    compiled: Vec<PlanSignature>,
}

impl Store {
    fn collection_mut(&mut self, id: CollectionId) -> Result<&mut BTreeMap<Vec<u8>, Vec<u8>>> {
        self.collections
            .get_mut(id.as_internal() as usize)
            .ok_or_else(|| Error::Engine(format!("unknown collection {}", id.as_internal())))
    }

    fn collection(&self, id: CollectionId) -> Result<&BTreeMap<Vec<u8>, Vec<u8>>> {
        self.collections
            .get(id.as_internal() as usize)
            .ok_or_else(|| Error::Engine(format!("unknown collection {}", id.as_internal())))
    }

    fn apply(&mut self, collection: CollectionId, operations: Vec<BatchOperation>) -> Result<()> {
        let data = self.collection_mut(collection)?;
        for op in operations {
            match op {
                BatchOperation::Insert { key, value } => {
                    data.insert(key.into_bytes(), value.into_bytes());
                }
                BatchOperation::Remove { key } => {
                    data.remove(key.as_bytes());
                }
            }
        }
        Ok(())
    }

    fn allocate_object(&mut self) -> ObjectId {
        self.next_object += 1;
        ObjectId::from_internal(self.next_object)
    }

    fn apply_graph(&mut self, write: GraphWrite) -> Result<()> {
        match write {
            GraphWrite::Insert(id, data) => {
                self.objects.insert(id, data);
            }
            GraphWrite::Update(id, data) => {
                let object = self
                    .objects
                    .get_mut(&id)
                    .ok_or_else(|| Error::Engine(format!("object {} not found", id)))?;
                object.extend(data);
            }
            GraphWrite::Delete(id) => {
                self.objects
                    .remove(&id)
                    .ok_or_else(|| Error::Engine(format!("object {} not found", id)))?;
                self.relationships.retain(|(s, _, t)| *s != id && *t != id);
            }
            GraphWrite::Relate(source, rel_type, target) => {
                for id in [source, target] {
                    if !self.objects.contains_key(&id) {
                        return Err(Error::Engine(format!("object {} not found", id)));
                    }
                }
                self.relationships.push((source, rel_type, target));
            }
        }
        Ok(())
    }

    fn object_record(&self, id: ObjectId) -> Option<Record> {
        let object = self.objects.get(&id)?;
        let properties = object
            .iter()
            .map(|(k, v)| (k.clone(), property_text(v)))
            .collect();
        Some(Record::Object { id, properties })
    }
}

#[derive(Debug)]
enum GraphWrite {
    Insert(ObjectId, ObjectData),
    Update(ObjectId, ObjectData),
    Delete(ObjectId),
    Relate(ObjectId, String, ObjectId),
}

/// Process-local engine for tests and embedding
#[derive(Debug, Default)]
pub struct MemoryEngine {
    store: Arc<RwLock<Store>>,
    open_results: Arc<AtomicUsize>,
    compile_count: AtomicUsize,
    batch_count: AtomicUsize,
    commit_count: AtomicUsize,
    compile_override: Mutex<Option<i64>>,
    null_results: AtomicBool,
    closed: AtomicBool,
}

impl MemoryEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `compile_query` calls received
    pub fn compile_count(&self) -> usize {
        self.compile_count.load(Ordering::SeqCst)
    }

    /// Number of non-empty batches applied
    pub fn batch_count(&self) -> usize {
        self.batch_count.load(Ordering::SeqCst)
    }

    pub fn commit_count(&self) -> usize {
        self.commit_count.load(Ordering::SeqCst)
    }

    /// Result sets handed out and not yet closed
    pub fn open_result_sets(&self) -> usize {
        self.open_results.load(Ordering::SeqCst)
    }

    /// Make `compile_query` return `raw` instead of a real plan id
    pub fn set_compile_result(&self, raw: Option<i64>) {
        if let Ok(mut slot) = self.compile_override.lock() {
            *slot = raw;
        }
    }

    /// Make query execution return no result handle
    pub fn set_null_results(&self, enabled: bool) {
        self.null_results.store(enabled, Ordering::SeqCst);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Number of live graph objects
    pub fn object_count(&self) -> usize {
        self.read().map(|s| s.objects.len()).unwrap_or(0)
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Store>> {
        self.ensure_open()?;
        self.store
            .read()
            .map_err(|_| Error::Internal("Failed to acquire store lock".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Store>> {
        self.ensure_open()?;
        write_store(&self.store)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            return Err(Error::Engine("engine is closed".to_string()));
        }
        Ok(())
    }

    fn results(&self, records: Vec<Record>) -> Option<Box<dyn ResultHandle>> {
        if self.null_results.load(Ordering::SeqCst) {
            return None;
        }
        self.open_results.fetch_add(1, Ordering::SeqCst);
        Some(Box::new(MemoryResults {
            records,
            open_results: self.open_results.clone(),
        }))
    }
}

fn write_store(store: &RwLock<Store>) -> Result<RwLockWriteGuard<'_, Store>> {
    store
        .write()
        .map_err(|_| Error::Internal("Failed to acquire store lock".to_string()))
}

impl Engine for MemoryEngine {
    fn compile_query(&self, plan: &QueryPlan) -> Result<i64> {
        self.compile_count.fetch_add(1, Ordering::SeqCst);
        if let Some(raw) = self.compile_override.lock().ok().and_then(|slot| *slot) {
            return Ok(raw);
        }
        if plan.is_empty() {
            return Ok(PlanId::INVALID_RAW);
        }

        let mut store = self.write()?;
        store.compiled.push(plan.signature());
        Ok(store.compiled.len() as i64 - 1)
    }

    fn execute_query(&self, plan_id: PlanId, plan: &QueryPlan) -> Result<Option<Box<dyn ResultHandle>>> {
        let store = self.read()?;
        let compiled = store
            .compiled
            .get(plan_id.as_internal() as usize)
            .ok_or_else(|| Error::Execution(format!("unknown plan id {}", plan_id)))?;
        if *compiled != plan.signature() {
            return Err(Error::Execution(format!(
                "plan id {} was compiled for a different plan shape",
                plan_id
            )));
        }

        let matches = evaluate(&store, plan, &plan.parameters())?;
        let records = matches.into_iter().filter_map(|id| store.object_record(id)).collect::<Vec<_>>();
        debug!(plan_id = %plan_id, results = records.len(), "Executed plan");
        Ok(self.results(records))
    }

    fn execute_range_query(
        &self,
        collection: CollectionId,
        range: &KeyRange,
    ) -> Result<Option<Box<dyn ResultHandle>>> {
        let store = self.read()?;
        let records = store
            .collection(collection)?
            .iter()
            .filter(|(key, _)| range.contains(key))
            .map(|(key, value)| Record::KeyValue {
                key: key.clone(),
                value: value.clone(),
            })
            .collect();
        Ok(self.results(records))
    }

    fn open_collection(&self, name: &str) -> Result<CollectionId> {
        let mut store = self.write()?;
        if let Some(id) = store.collection_ids.get(name) {
            return Ok(*id);
        }
        let id = CollectionId::from_internal(store.collections.len() as u32);
        store.collections.push(BTreeMap::new());
        store.collection_ids.insert(name.to_string(), id);
        info!(name, id = id.as_internal(), "Collection created");
        Ok(id)
    }

    fn execute_batch(&self, collection: CollectionId, buffer: &[u8]) -> Result<()> {
        // Decode everything before touching the store so a bad buffer
        // leaves the collection unchanged
        let operations = decode_batch(buffer)?;
        let mut store = self.write()?;
        store.apply(collection, operations)?;
        self.batch_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn begin_transaction(
        &self,
        collection: CollectionId,
        read_only: bool,
    ) -> Result<Box<dyn KvTransactionHandle>> {
        self.read()?.collection(collection)?;
        Ok(Box::new(MemoryKvTransaction {
            store: self.store.clone(),
            collection,
            read_only,
            pending: Vec::new(),
            finished: None,
        }))
    }

    fn insert_object(&self, data: &ObjectData) -> Result<ObjectId> {
        let mut store = self.write()?;
        let id = store.allocate_object();
        store.apply_graph(GraphWrite::Insert(id, data.clone()))?;
        Ok(id)
    }

    fn update_object(&self, id: ObjectId, data: &ObjectData) -> Result<()> {
        self.write()?.apply_graph(GraphWrite::Update(id, data.clone()))
    }

    fn delete_object(&self, id: ObjectId) -> Result<()> {
        self.write()?.apply_graph(GraphWrite::Delete(id))
    }

    fn insert_relationship(&self, source: ObjectId, rel_type: &str, target: ObjectId) -> Result<()> {
        self.write()?
            .apply_graph(GraphWrite::Relate(source, rel_type.to_string(), target))
    }

    fn commit(&self) -> Result<()> {
        self.ensure_open()?;
        self.commit_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn begin_graph_transaction(&self) -> Result<Box<dyn GraphTransactionHandle>> {
        self.ensure_open()?;
        Ok(Box::new(MemoryGraphTransaction {
            store: self.store.clone(),
            pending: Vec::new(),
            finished: None,
        }))
    }

    fn close(&self) -> Result<()> {
        if !self.closed.swap(true, Ordering::SeqCst) {
            info!(open_result_sets = self.open_result_sets(), "Memory engine closed");
        }
        Ok(())
    }
}

// ========== Plan evaluation ==========

/// Run a plan against the store using only its shape and parameters
fn evaluate(store: &Store, plan: &QueryPlan, params: &PlanParameters) -> Result<BTreeSet<ObjectId>> {
    let mut current = BTreeSet::new();
    let mut next_param = 0usize;
    let mut take = |count: usize| {
        let start = next_param;
        next_param += count;
        if next_param > params.len() {
            return Err(Error::Execution("plan parameters are truncated".to_string()));
        }
        Ok(start)
    };

    for step in plan.steps() {
        if step.op_type == OpType::Traverse {
            let direction = step
                .direction
                .ok_or_else(|| Error::Execution(format!("traverse '{}' has no direction", step.field)))?;
            let arity = step.filter.as_ref().map_or(0, |f| f.len());
            let start = take(arity * 2)?;
            let filter = (0..arity)
                .map(|i| -> Result<(String, String)> {
                    Ok((param_text(params, start + 2 * i)?, param_text(params, start + 2 * i + 1)?))
                })
                .collect::<Result<Vec<_>>>()?;
            current = traverse(store, &current, direction, &step.field, &filter);
            continue;
        }

        let matcher = match &step.value {
            Some(value) if value.is_range() => {
                let start = take(2)?;
                let gte = params.key_at(start).ok_or_else(|| bad_param(start))?;
                let lte = params.key_at(start + 1).ok_or_else(|| bad_param(start + 1))?;
                Matcher::Range(gte, lte)
            }
            Some(_) => Matcher::Equals(param_text(params, take(1)?)?),
            None => return Err(Error::Execution(format!("step '{}' has no value", step.field))),
        };

        let matched: BTreeSet<ObjectId> = store
            .objects
            .iter()
            .filter(|(_, data)| data.get(&step.field).is_some_and(|v| matcher.matches(v)))
            .map(|(id, _)| *id)
            .collect();

        current = match step.op_type {
            OpType::Intersect => current.intersection(&matched).copied().collect(),
            OpType::Union => current.union(&matched).copied().collect(),
            _ => matched,
        };
    }
    Ok(current)
}

fn traverse(
    store: &Store,
    from: &BTreeSet<ObjectId>,
    direction: Direction,
    rel_type: &str,
    filter: &[(String, String)],
) -> BTreeSet<ObjectId> {
    store
        .relationships
        .iter()
        .filter(|(_, r, _)| r == rel_type)
        .filter_map(|(source, _, target)| match direction {
            Direction::Out if from.contains(source) => Some(*target),
            Direction::In if from.contains(target) => Some(*source),
            _ => None,
        })
        .filter(|id| {
            store.objects.get(id).is_some_and(|data| {
                filter
                    .iter()
                    .all(|(k, v)| data.get(k).is_some_and(|p| property_text(p) == *v))
            })
        })
        .collect()
}

enum Matcher {
    Equals(String),
    Range(u64, u64),
}

impl Matcher {
    fn matches(&self, value: &Value) -> bool {
        match self {
            Matcher::Equals(text) => property_text(value) == *text,
            Matcher::Range(gte, lte) => property_key(value).is_some_and(|k| k >= *gte && k <= *lte),
        }
    }
}

/// Range key of a stored property: numbers as ordered keys, locations as
/// geohashes. Integers too large for an exact `f64` are stored keys.
fn property_key(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => match n.as_u64() {
            Some(k) if k > MAX_EXACT_FLOAT_INT => Some(k),
            _ => n.as_f64().map(number_key),
        },
        Value::Object(obj) => {
            let lat = obj.get("lat")?.as_f64()?;
            let lon = obj.get("lon")?.as_f64()?;
            Some(geohash::encode(lat, lon))
        }
        _ => None,
    }
}

fn property_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn param_text(params: &PlanParameters, index: usize) -> Result<String> {
    let bytes = params.get(index).ok_or_else(|| bad_param(index))?;
    String::from_utf8(bytes.to_vec()).map_err(|_| bad_param(index))
}

fn bad_param(index: usize) -> Error {
    Error::Execution(format!("plan parameter {} is malformed", index))
}

// ========== Handles ==========

struct MemoryResults {
    records: Vec<Record>,
    open_results: Arc<AtomicUsize>,
}

impl ResultHandle for MemoryResults {
    fn get_page(&mut self, request: PageRequest) -> Result<ResultPage> {
        Ok(ResultPage::paginate(&self.records, request))
    }

    fn total_count(&self) -> u64 {
        self.records.len() as u64
    }

    fn close(&mut self) {
        self.records.clear();
        self.open_results.fetch_sub(1, Ordering::SeqCst);
    }
}

struct MemoryKvTransaction {
    store: Arc<RwLock<Store>>,
    collection: CollectionId,
    read_only: bool,
    pending: Vec<BatchOperation>,
    finished: Option<&'static str>,
}

impl MemoryKvTransaction {
    fn ensure_active(&self) -> Result<()> {
        match self.finished {
            Some(state) => Err(Error::TransactionClosed(state.to_string())),
            None => Ok(()),
        }
    }

    fn stage(&mut self, op: BatchOperation) -> Result<()> {
        self.ensure_active()?;
        if self.read_only {
            return Err(Error::InvalidArgument("transaction is read-only".to_string()));
        }
        self.pending.push(op);
        Ok(())
    }
}

impl KvTransactionHandle for MemoryKvTransaction {
    fn get(&mut self, key: &str) -> Result<Option<Vec<u8>>> {
        self.ensure_active()?;
        if let Some(op) = self.pending.iter().rev().find(|op| op.key() == key) {
            return Ok(match op {
                BatchOperation::Insert { value, .. } => Some(value.as_bytes().to_vec()),
                BatchOperation::Remove { .. } => None,
            });
        }
        let store = self
            .store
            .read()
            .map_err(|_| Error::Internal("Failed to acquire store lock".to_string()))?;
        Ok(store.collection(self.collection)?.get(key.as_bytes()).cloned())
    }

    fn insert(&mut self, key: &str, value: &str) -> Result<()> {
        self.stage(BatchOperation::insert(key, value))
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.stage(BatchOperation::remove(key))
    }

    fn commit(&mut self) -> Result<()> {
        self.ensure_active()?;
        let pending = std::mem::take(&mut self.pending);
        if !pending.is_empty() {
            write_store(&self.store)?.apply(self.collection, pending)?;
        }
        self.finished = Some("committed");
        Ok(())
    }

    fn abort(&mut self) -> Result<()> {
        self.ensure_active()?;
        self.pending.clear();
        self.finished = Some("aborted");
        Ok(())
    }
}

struct MemoryGraphTransaction {
    store: Arc<RwLock<Store>>,
    pending: Vec<GraphWrite>,
    finished: Option<&'static str>,
}

impl MemoryGraphTransaction {
    fn stage(&mut self, write: GraphWrite) -> Result<()> {
        if let Some(state) = self.finished {
            return Err(Error::TransactionClosed(state.to_string()));
        }
        self.pending.push(write);
        Ok(())
    }
}

impl GraphTransactionHandle for MemoryGraphTransaction {
    fn insert_object(&mut self, data: &ObjectData) -> Result<ObjectId> {
        if let Some(state) = self.finished {
            return Err(Error::TransactionClosed(state.to_string()));
        }
        let id = write_store(&self.store)?.allocate_object();
        self.stage(GraphWrite::Insert(id, data.clone()))?;
        Ok(id)
    }

    fn update_object(&mut self, id: ObjectId, data: &ObjectData) -> Result<()> {
        self.stage(GraphWrite::Update(id, data.clone()))
    }

    fn delete_object(&mut self, id: ObjectId) -> Result<()> {
        self.stage(GraphWrite::Delete(id))
    }

    fn insert_relationship(&mut self, source: ObjectId, rel_type: &str, target: ObjectId) -> Result<()> {
        self.stage(GraphWrite::Relate(source, rel_type.to_string(), target))
    }

    fn commit(&mut self) -> Result<()> {
        if let Some(state) = self.finished {
            return Err(Error::TransactionClosed(state.to_string()));
        }
        let pending = std::mem::take(&mut self.pending);
        let mut store = write_store(&self.store)?;

        // Stage on a copy of the graph; a failing write leaves the store untouched
        let mut staged = Store {
            objects: store.objects.clone(),
            relationships: store.relationships.clone(),
            ..Store::default()
        };
        let applied = pending.into_iter().try_for_each(|write| staged.apply_graph(write));
        if let Err(e) = applied {
            self.finished = Some("rolled back");
            return Err(e);
        }

        store.objects = staged.objects;
        store.relationships = staged.relationships;
        self.finished = Some("committed");
        Ok(())
    }

    fn abort(&mut self) -> Result<()> {
        if let Some(state) = self.finished {
            return Err(Error::TransactionClosed(state.to_string()));
        }
        self.pending.clear();
        self.finished = Some("aborted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use stax_protocol::encode_batch;
    use stax_query::QueryBuilder;

    fn object(value: Value) -> ObjectData {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    fn run(engine: &MemoryEngine, plan: &QueryPlan) -> Vec<Record> {
        let id = PlanId::from_raw(engine.compile_query(plan).unwrap()).unwrap();
        let mut handle = engine.execute_query(id, plan).unwrap().unwrap();
        let page = handle.get_page(PageRequest { page_number: 1, page_size: 100 }).unwrap();
        handle.close();
        page.results
    }

    #[test]
    fn test_batch_applies_atomically() {
        let engine = MemoryEngine::new();
        let users = engine.open_collection("users").unwrap();
        assert_eq!(engine.open_collection("users").unwrap(), users);

        let buffer = encode_batch(&[BatchOperation::insert("a", "1"), BatchOperation::insert("b", "2")]).unwrap();
        engine.execute_batch(users, &buffer).unwrap();

        // Truncated buffer: nothing applied
        let bad = encode_batch(&[BatchOperation::remove("a"), BatchOperation::insert("c", "3")]).unwrap();
        assert!(engine.execute_batch(users, &bad[..bad.len() - 1]).is_err());

        let mut handle = engine.execute_range_query(users, &KeyRange::all()).unwrap().unwrap();
        assert_eq!(handle.total_count(), 2);
        handle.close();
        assert_eq!(engine.open_result_sets(), 0);
        assert_eq!(engine.batch_count(), 1);
    }

    #[test]
    fn test_plan_evaluation() {
        let engine = MemoryEngine::new();
        let alice = engine
            .insert_object(&object(json!({ "name": "Alice", "city": "London", "age": 34 })))
            .unwrap();
        let bob = engine
            .insert_object(&object(json!({ "name": "Bob", "city": "Paris", "age": 28 })))
            .unwrap();
        let project = engine
            .insert_object(&object(json!({ "name": "Apollo", "status": "active" })))
            .unwrap();
        engine.insert_relationship(alice, "WORKS_ON", project).unwrap();
        engine.insert_relationship(bob, "WORKS_ON", project).unwrap();

        let plan = QueryBuilder::new()
            .find(json!({ "city": "London", "age": { "gte": 30 } }))
            .unwrap()
            .into_plan();
        let found = run(&engine, &plan);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].object_id(), Some(alice));

        let plan = QueryBuilder::new()
            .find(json!([{ "city": "London" }, { "city": "Paris" }]))
            .unwrap()
            .into_plan();
        assert_eq!(run(&engine, &plan).len(), 2);

        let plan = QueryBuilder::new()
            .find(json!({ "name": "Bob" }))
            .unwrap()
            .traverse("out", "WORKS_ON", Some(json!({ "status": "active" })))
            .unwrap()
            .into_plan();
        let found = run(&engine, &plan);
        assert_eq!(found[0].property("name"), Some("Apollo"));

        let plan = QueryBuilder::new()
            .find(json!({ "name": "Apollo" }))
            .unwrap()
            .traverse("in", "WORKS_ON", None)
            .unwrap()
            .into_plan();
        assert_eq!(run(&engine, &plan).len(), 2);
    }

    #[test]
    fn test_location_queries() {
        let engine = MemoryEngine::new();
        engine
            .insert_object(&object(json!({ "name": "googleplex", "location": { "lat": 37.422, "lon": -122.084 } })))
            .unwrap();
        engine
            .insert_object(&object(json!({ "name": "big ben", "location": { "lat": 51.5007, "lon": -0.1246 } })))
            .unwrap();

        let plan = QueryBuilder::new()
            .find(json!({ "location": { "near": { "lat": 37.42, "lon": -122.08 }, "radius": 2000 } }))
            .unwrap()
            .into_plan();
        let found = run(&engine, &plan);
        assert!(found.iter().any(|r| r.property("name") == Some("googleplex")));
        assert!(found.iter().all(|r| r.property("name") != Some("big ben")));

        let plan = QueryBuilder::new()
            .find(json!({ "location": { "lat": 51.5007, "lon": -0.1246 } }))
            .unwrap()
            .into_plan();
        let found = run(&engine, &plan);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].property("name"), Some("big ben"));
    }

    #[test]
    fn test_execute_checks_plan_shape() {
        let engine = MemoryEngine::new();
        let a = QueryBuilder::new().find(json!({ "a": 1 })).unwrap().into_plan();
        let b = QueryBuilder::new().find(json!({ "b": 1 })).unwrap().into_plan();

        let id = PlanId::from_raw(engine.compile_query(&a).unwrap()).unwrap();
        assert!(engine.execute_query(id, &b).is_err());
        assert!(engine.execute_query(PlanId::from_internal(99), &a).is_err());
    }

    #[test]
    fn test_kv_transaction() {
        let engine = MemoryEngine::new();
        let c = engine.open_collection("kv").unwrap();

        let mut txn = engine.begin_transaction(c, false).unwrap();
        txn.insert("k", "v").unwrap();
        assert_eq!(txn.get("k").unwrap(), Some(b"v".to_vec()));
        txn.commit().unwrap();
        assert!(matches!(txn.insert("x", "y"), Err(Error::TransactionClosed(_))));

        let mut read = engine.begin_transaction(c, true).unwrap();
        assert_eq!(read.get("k").unwrap(), Some(b"v".to_vec()));
        assert!(read.remove("k").unwrap_err().is_usage_error());
        read.abort().unwrap();
    }

    #[test]
    fn test_graph_transaction_buffers_until_commit() {
        let engine = MemoryEngine::new();
        let mut txn = engine.begin_graph_transaction().unwrap();
        txn.insert_object(&object(json!({ "name": "pending" }))).unwrap();
        assert_eq!(engine.object_count(), 0);
        txn.commit().unwrap();
        assert_eq!(engine.object_count(), 1);

        let mut txn = engine.begin_graph_transaction().unwrap();
        txn.insert_object(&object(json!({ "name": "dropped" }))).unwrap();
        txn.abort().unwrap();
        assert_eq!(engine.object_count(), 1);
    }

    #[test]
    fn test_failed_graph_commit_changes_nothing() {
        let engine = MemoryEngine::new();
        let mut txn = engine.begin_graph_transaction().unwrap();
        let a = txn.insert_object(&object(json!({ "name": "a" }))).unwrap();
        txn.insert_relationship(a, "KNOWS", ObjectId::from_internal(999)).unwrap();

        assert!(txn.commit().is_err());
        assert_eq!(engine.object_count(), 0);
        assert!(matches!(txn.commit(), Err(Error::TransactionClosed(_))));
    }

    #[test]
    fn test_signed_and_fractional_ranges() {
        let engine = MemoryEngine::new();
        for temp in [json!(5), json!(-5), json!(-20), json!(2), json!(2.75)] {
            engine.insert_object(&object(json!({ "temp": temp }))).unwrap();
        }

        let count = |criteria: Value| {
            let plan = QueryBuilder::new().find(criteria).unwrap().into_plan();
            run(&engine, &plan).len()
        };
        assert_eq!(count(json!({ "temp": { "gte": -10, "lte": 10 } })), 4);
        assert_eq!(count(json!({ "temp": { "gte": -30, "lte": -1 } })), 2);
        assert_eq!(count(json!({ "temp": { "lte": -10 } })), 1);
        assert_eq!(count(json!({ "temp": { "gte": 2.5 } })), 2);
        assert_eq!(count(json!({ "temp": { "gte": 2.5, "lte": 3 } })), 1);
    }

    #[test]
    fn test_later_find_replaces_running_set() {
        let engine = MemoryEngine::new();
        engine.insert_object(&object(json!({ "name": "Alice" }))).unwrap();
        let bob = engine.insert_object(&object(json!({ "name": "Bob" }))).unwrap();

        let plan = QueryBuilder::new()
            .find(json!({ "name": "Alice" }))
            .unwrap()
            .find(json!({ "name": "Bob" }))
            .unwrap()
            .into_plan();
        let found = run(&engine, &plan);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].object_id(), Some(bob));
    }

    #[test]
    fn test_closed_engine_rejects_calls() {
        let engine = MemoryEngine::new();
        engine.close().unwrap();
        engine.close().unwrap();
        assert!(engine.open_collection("x").is_err());
        assert!(engine.commit().is_err());
    }
}
