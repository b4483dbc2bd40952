//! Fluent query plan builder
//!
//! ```ignore
//! let cursor = graph
//!     .query()
//!     .find(json!([{ "city": "London", "role": "dev" }, { "city": "Paris" }]))?
//!     .traverse("out", "WORKS_ON", None)?
//!     .execute()?;
//! ```
//!
//! A builder keeps accumulating after `execute`, so running it again runs
//! the cumulative plan. Start a new builder for each independent query.

use crate::criterion::{self, type_name};
use crate::plan::{OpType, QueryPlan, QueryStep};
use serde_json::{Map, Value};
use stax_core::{Direction, Error, Result};

/// Something that can compile and run a finished plan
pub trait PlanExecutor {
    type Output;

    fn execute_plan(&self, plan: &QueryPlan) -> Result<Self::Output>;
}

impl<T: PlanExecutor + ?Sized> PlanExecutor for &T {
    type Output = T::Output;

    fn execute_plan(&self, plan: &QueryPlan) -> Result<Self::Output> {
        (**self).execute_plan(plan)
    }
}

/// Builder with no executor attached; only produces plans
#[derive(Debug, Clone, Copy, Default)]
pub struct Detached;

/// Accumulates `find`/`filter`/`union`/`traverse` calls into a plan
#[derive(Debug, Clone)]
pub struct QueryBuilder<E = Detached> {
    executor: E,
    plan: QueryPlan,
}

impl QueryBuilder<Detached> {
    /// Builder that only assembles a plan
    pub fn new() -> Self {
        Self::with_executor(Detached)
    }
}

impl Default for QueryBuilder<Detached> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> QueryBuilder<E> {
    /// Builder whose `execute` hands the plan to `executor`
    pub fn with_executor(executor: E) -> Self {
        Self {
            executor,
            plan: QueryPlan::new(),
        }
    }

    /// Select records matching `criteria`.
    ///
    /// A mapping is one conjunctive group: its first field opens the group
    /// with `Find`, the rest narrow it with `Intersect`. A sequence of
    /// mappings is a disjunction: every group after the first opens with
    /// `Union` instead of `Find`. Empty mappings and sequences add nothing.
    pub fn find(mut self, criteria: impl Into<Value>) -> Result<Self> {
        match criteria.into() {
            Value::Array(groups) => {
                for (index, group) in groups.iter().enumerate() {
                    let Value::Object(group) = group else {
                        return Err(find_type_error(group));
                    };
                    let opening = if index == 0 { OpType::Find } else { OpType::Union };
                    self.push_group(opening, group)?;
                }
            }
            Value::Object(group) => self.push_group(OpType::Find, &group)?,
            other => return Err(find_type_error(&other)),
        }
        Ok(self)
    }

    /// Follow relationships of `relationship_type` from the current set.
    ///
    /// `direction` is `"in"` or `"out"`. `filter` must be a mapping; the
    /// traversal targets must carry all of its properties.
    pub fn traverse(
        self,
        direction: &str,
        relationship_type: &str,
        filter: Option<Value>,
    ) -> Result<Self> {
        let direction: Direction = direction.parse()?;
        self.traverse_with(direction, relationship_type, filter)
    }

    /// Typed variant of [`traverse`](Self::traverse)
    pub fn traverse_with(
        mut self,
        direction: Direction,
        relationship_type: &str,
        filter: Option<Value>,
    ) -> Result<Self> {
        let filter = match filter {
            None | Some(Value::Null) => None,
            Some(Value::Object(map)) => Some(map),
            Some(other) => {
                return Err(Error::type_mismatch(
                    "traverse() filterProperties as an object",
                    type_name(&other),
                ));
            }
        };
        self.plan
            .push(QueryStep::traverse(direction, relationship_type, filter));
        Ok(self)
    }

    /// Narrow the current set: one `Intersect` step per property
    pub fn filter(self, properties: impl Into<Value>) -> Result<Self> {
        self.push_each(OpType::Intersect, "filter", properties.into())
    }

    /// Merge another set into the current one: one `Union` step per property
    pub fn union(self, properties: impl Into<Value>) -> Result<Self> {
        self.push_each(OpType::Union, "union", properties.into())
    }

    /// Steps accumulated so far
    pub fn plan(&self) -> &QueryPlan {
        &self.plan
    }

    pub fn into_plan(self) -> QueryPlan {
        self.plan
    }

    fn push_group(&mut self, opening: OpType, group: &Map<String, Value>) -> Result<()> {
        for (i, (field, value)) in group.iter().enumerate() {
            let op = if i == 0 { opening } else { OpType::Intersect };
            self.plan.push(criterion::process(op, field, value)?);
        }
        Ok(())
    }

    fn push_each(mut self, op: OpType, method: &str, properties: Value) -> Result<Self> {
        let Value::Object(properties) = properties else {
            return Err(Error::type_mismatch(
                format!("{}() properties as an object", method),
                type_name(&properties),
            ));
        };
        for (field, value) in &properties {
            self.plan.push(criterion::process(op, field, value)?);
        }
        Ok(self)
    }
}

impl<E: PlanExecutor> QueryBuilder<E> {
    /// Compile and run the accumulated plan
    pub fn execute(&self) -> Result<E::Output> {
        self.executor.execute_plan(&self.plan)
    }
}

fn find_type_error(found: &Value) -> Error {
    Error::type_mismatch("find() criteria as an object or an array of objects", type_name(found))
}
