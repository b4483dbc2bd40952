//! Graph handle

use crate::cache::PlanCache;
use crate::cursor::ResultCursor;
use crate::database::Connection;
use crate::engine::{GraphTransactionHandle, ObjectData};
use serde_json::Value;
use stax_core::{Error, ObjectId, Result};
use stax_query::criterion::type_name;
use stax_query::{PlanExecutor, QueryBuilder, QueryPlan};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Graph operations over one database connection.
///
/// Clones share the connection and the compiled plan cache.
#[derive(Clone)]
pub struct Graph {
    connection: Arc<Connection>,
    plans: Arc<PlanCache>,
}

impl Graph {
    pub(crate) fn new(connection: Arc<Connection>) -> Self {
        Self {
            connection,
            plans: Arc::new(PlanCache::new()),
        }
    }

    /// Insert an object and return its id. `data` must be a mapping.
    pub fn insert_object(&self, data: impl Into<Value>) -> Result<ObjectId> {
        let data = object_data("insert_object", data.into())?;
        let id = self.connection.engine()?.insert_object(&data)?;
        debug!(id = %id, properties = data.len(), "Inserted object");
        Ok(id)
    }

    /// Set properties on an existing object
    pub fn update_object(&self, id: ObjectId, data: impl Into<Value>) -> Result<()> {
        let data = object_data("update_object", data.into())?;
        self.connection.engine()?.update_object(id, &data)
    }

    pub fn delete_object(&self, id: ObjectId) -> Result<()> {
        self.connection.engine()?.delete_object(id)
    }

    /// Connect `source` to `target` with a relationship of `rel_type`
    pub fn insert_relationship(&self, source: ObjectId, rel_type: &str, target: ObjectId) -> Result<()> {
        self.connection
            .engine()?
            .insert_relationship(source, rel_type, target)
    }

    pub fn commit(&self) -> Result<()> {
        self.connection.engine()?.commit()
    }

    /// Start a query against this graph
    pub fn query(&self) -> QueryBuilder<Graph> {
        QueryBuilder::with_executor(self.clone())
    }

    /// Compile (once per plan shape) and run a plan
    pub fn execute_query(&self, plan: &QueryPlan) -> Result<ResultCursor> {
        plan.validate()?;
        let engine = self.connection.engine()?;
        let plan_id = self.plans.get_or_compile(engine, plan)?;
        let handle = engine.execute_query(plan_id, plan)?;
        ResultCursor::new(handle, self.connection.config())
    }

    pub fn begin_transaction(&self) -> Result<GraphTransaction> {
        let handle = self.connection.engine()?.begin_graph_transaction()?;
        Ok(GraphTransaction { handle: Some(handle) })
    }

    /// Compiled plan cache shared by this handle's clones
    pub fn plan_cache(&self) -> &PlanCache {
        &self.plans
    }
}

impl PlanExecutor for Graph {
    type Output = ResultCursor;

    fn execute_plan(&self, plan: &QueryPlan) -> Result<ResultCursor> {
        self.execute_query(plan)
    }
}

impl fmt::Debug for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Graph")
            .field("compiled_plans", &self.plans.len())
            .finish()
    }
}

/// Buffered graph writes applied together on commit.
///
/// Dropping an unfinished transaction aborts it.
pub struct GraphTransaction {
    handle: Option<Box<dyn GraphTransactionHandle>>,
}

impl GraphTransaction {
    fn handle(&mut self) -> Result<&mut Box<dyn GraphTransactionHandle>> {
        self.handle
            .as_mut()
            .ok_or_else(|| Error::TransactionClosed("finished".to_string()))
    }

    pub fn insert_object(&mut self, data: impl Into<Value>) -> Result<ObjectId> {
        let data = object_data("insert_object", data.into())?;
        self.handle()?.insert_object(&data)
    }

    pub fn update_object(&mut self, id: ObjectId, data: impl Into<Value>) -> Result<()> {
        let data = object_data("update_object", data.into())?;
        self.handle()?.update_object(id, &data)
    }

    pub fn delete_object(&mut self, id: ObjectId) -> Result<()> {
        self.handle()?.delete_object(id)
    }

    pub fn insert_relationship(&mut self, source: ObjectId, rel_type: &str, target: ObjectId) -> Result<()> {
        self.handle()?.insert_relationship(source, rel_type, target)
    }

    pub fn commit(mut self) -> Result<()> {
        let mut handle = self.take()?;
        handle.commit()
    }

    pub fn abort(mut self) -> Result<()> {
        let mut handle = self.take()?;
        handle.abort()
    }

    fn take(&mut self) -> Result<Box<dyn GraphTransactionHandle>> {
        self.handle
            .take()
            .ok_or_else(|| Error::TransactionClosed("finished".to_string()))
    }
}

impl Drop for GraphTransaction {
    fn drop(&mut self) {
        if let Some(mut handle) = self.handle.take() {
            if let Err(e) = handle.abort() {
                warn!(error = %e, "Failed to abort dropped graph transaction");
            }
        }
    }
}

fn object_data(method: &str, data: Value) -> Result<ObjectData> {
    match data {
        Value::Object(map) => Ok(map),
        other => Err(Error::type_mismatch(
            format!("{}() data as an object", method),
            type_name(&other),
        )),
    }
}
