//! Storage engine boundary
//!
//! The client never stores data itself. Everything that touches records
//! goes through these traits, so any engine (a native binding, a remote
//! connection, or [`MemoryEngine`](crate::memory::MemoryEngine) in tests)
//! can sit behind a [`Database`](crate::Database).

use serde_json::{Map, Value};
use stax_core::{CollectionId, ObjectId, PlanId, Result};
use stax_protocol::{KeyRange, PageRequest, ResultPage};
use stax_query::QueryPlan;

/// Property mapping stored on a graph object
pub type ObjectData = Map<String, Value>;

/// Operations the client requires from a storage engine
pub trait Engine: Send + Sync {
    // ========== Queries ==========

    /// Compile a plan by shape. Returns the raw plan id; `-1` and
    /// `u32::MAX` signal a compilation failure.
    fn compile_query(&self, plan: &QueryPlan) -> Result<i64>;

    /// Run a compiled plan with the literals carried by `plan`.
    /// `None` means the engine produced no result handle.
    fn execute_query(&self, plan_id: PlanId, plan: &QueryPlan) -> Result<Option<Box<dyn ResultHandle>>>;

    /// Scan a collection between two keys
    fn execute_range_query(
        &self,
        collection: CollectionId,
        range: &KeyRange,
    ) -> Result<Option<Box<dyn ResultHandle>>>;

    // ========== Key/value collections ==========

    /// Open (creating if needed) a named collection
    fn open_collection(&self, name: &str) -> Result<CollectionId>;

    /// Apply an encoded batch (see `stax_protocol::batch`) atomically
    fn execute_batch(&self, collection: CollectionId, buffer: &[u8]) -> Result<()>;

    fn begin_transaction(
        &self,
        collection: CollectionId,
        read_only: bool,
    ) -> Result<Box<dyn KvTransactionHandle>>;

    // ========== Graph ==========

    fn insert_object(&self, data: &ObjectData) -> Result<ObjectId>;

    fn update_object(&self, id: ObjectId, data: &ObjectData) -> Result<()>;

    fn delete_object(&self, id: ObjectId) -> Result<()>;

    fn insert_relationship(&self, source: ObjectId, rel_type: &str, target: ObjectId) -> Result<()>;

    /// Flush pending graph writes
    fn commit(&self) -> Result<()>;

    fn begin_graph_transaction(&self) -> Result<Box<dyn GraphTransactionHandle>>;

    // ========== Lifecycle ==========

    /// Release engine resources; the engine is unusable afterwards
    fn close(&self) -> Result<()>;
}

/// Engine-side result set
pub trait ResultHandle: Send {
    /// Fetch one page; pages past the end are empty
    fn get_page(&mut self, request: PageRequest) -> Result<ResultPage>;

    fn total_count(&self) -> u64;

    /// Release the result set. Called at most once by the client.
    fn close(&mut self);
}

/// Engine-side key/value transaction
pub trait KvTransactionHandle: Send {
    fn get(&mut self, key: &str) -> Result<Option<Vec<u8>>>;

    fn insert(&mut self, key: &str, value: &str) -> Result<()>;

    fn remove(&mut self, key: &str) -> Result<()>;

    fn commit(&mut self) -> Result<()>;

    fn abort(&mut self) -> Result<()>;
}

/// Engine-side graph transaction
pub trait GraphTransactionHandle: Send {
    fn insert_object(&mut self, data: &ObjectData) -> Result<ObjectId>;

    fn update_object(&mut self, id: ObjectId, data: &ObjectData) -> Result<()>;

    fn delete_object(&mut self, id: ObjectId) -> Result<()>;

    fn insert_relationship(&mut self, source: ObjectId, rel_type: &str, target: ObjectId) -> Result<()>;

    fn commit(&mut self) -> Result<()>;

    fn abort(&mut self) -> Result<()>;
}
