//! Query plan data model
//!
//! A plan is an ordered list of steps. `Find` opens a disjunctive group,
//! `Intersect` narrows the running set, `Union` merges another set in and
//! `Traverse` follows relationships out of the running set.

use crate::signature::PlanSignature;
use serde::Serialize;
use stax_core::{Direction, Error, Result};
use stax_protocol::PlanParameters;
use std::cmp::Ordering;
use std::fmt;

/// Operator of a plan step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OpType {
    Find,
    Intersect,
    Union,
    Traverse,
}

impl OpType {
    pub fn as_str(self) -> &'static str {
        match self {
            OpType::Find => "find",
            OpType::Intersect => "intersect",
            OpType::Union => "union",
            OpType::Traverse => "traverse",
        }
    }
}

impl fmt::Display for OpType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One end of a range
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Bound {
    /// Numeric bound supplied by the caller
    Number(f64),
    /// Geohash or other pre-encoded 64-bit key
    Key(u64),
}

/// Order-preserving engine key for a number.
///
/// Negative values sort below positive ones and fractions keep their place
/// between integers, so `a <= b` exactly when `number_key(a) <= number_key(b)`.
pub fn number_key(n: f64) -> u64 {
    // Fold -0.0 into 0.0
    let bits = if n == 0.0 { 0 } else { n.to_bits() };
    if bits >> 63 == 1 { !bits } else { bits | (1 << 63) }
}

impl Bound {
    /// Engine key for this bound
    pub fn as_key(&self) -> u64 {
        match self {
            Bound::Number(n) => number_key(*n),
            Bound::Key(k) => *k,
        }
    }

    fn as_f64(&self) -> f64 {
        match self {
            Bound::Number(n) => *n,
            Bound::Key(k) => *k as f64,
        }
    }
}

impl PartialOrd for Bound {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.as_key().cmp(&other.as_key()))
    }
}

/// Inclusive range; a missing end is open
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Range {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gte: Option<Bound>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lte: Option<Bound>,
}

impl Range {
    /// Build a range, swapping the ends if they arrive reversed in key order
    pub fn new(gte: Option<Bound>, lte: Option<Bound>) -> Self {
        match (gte, lte) {
            (Some(a), Some(b)) if a > b => Self { gte: Some(b), lte: Some(a) },
            _ => Self { gte, lte },
        }
    }

    /// Range matching exactly one key
    pub fn point(key: u64) -> Self {
        Self {
            gte: Some(Bound::Key(key)),
            lte: Some(Bound::Key(key)),
        }
    }

    /// Range between two keys
    pub fn keys(gte: u64, lte: u64) -> Self {
        Self::new(Some(Bound::Key(gte)), Some(Bound::Key(lte)))
    }

    /// Check whether a numeric value falls inside the range
    pub fn contains_number(&self, value: f64) -> bool {
        self.gte.is_none_or(|b| value >= b.as_f64()) && self.lte.is_none_or(|b| value <= b.as_f64())
    }

    /// Check whether an engine key falls inside the range
    pub fn contains_key(&self, key: u64) -> bool {
        self.gte.is_none_or(|b| key >= b.as_key()) && self.lte.is_none_or(|b| key <= b.as_key())
    }
}

/// Literal payload of a step
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum StepValue {
    Text(String),
    Number(serde_json::Number),
    Boolean(bool),
    Range(Range),
}

impl StepValue {
    pub fn is_range(&self) -> bool {
        matches!(self, StepValue::Range(_))
    }

    /// Text form sent to the engine for equality literals
    pub fn to_text(&self) -> Option<String> {
        match self {
            StepValue::Text(s) => Some(s.clone()),
            StepValue::Number(n) => Some(n.to_string()),
            StepValue::Boolean(b) => Some(b.to_string()),
            StepValue::Range(_) => None,
        }
    }
}

/// A single plan step
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryStep {
    pub op_type: OpType,

    /// Property name, or relationship type for traversals
    pub field: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<StepValue>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub direction: Option<Direction>,

    /// Properties the traversal target must carry
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<serde_json::Map<String, serde_json::Value>>,
}

impl QueryStep {
    /// Step comparing a property against a literal or range
    pub fn criterion(op_type: OpType, field: impl Into<String>, value: StepValue) -> Self {
        Self {
            op_type,
            field: field.into(),
            value: Some(value),
            direction: None,
            filter: None,
        }
    }

    /// Relationship traversal step
    pub fn traverse(
        direction: Direction,
        relationship_type: impl Into<String>,
        filter: Option<serde_json::Map<String, serde_json::Value>>,
    ) -> Self {
        Self {
            op_type: OpType::Traverse,
            field: relationship_type.into(),
            value: None,
            direction: Some(direction),
            filter,
        }
    }
}

/// Ordered list of steps handed to the engine
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct QueryPlan {
    steps: Vec<QueryStep>,
}

impl QueryPlan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_steps(steps: Vec<QueryStep>) -> Self {
        Self { steps }
    }

    pub fn push(&mut self, step: QueryStep) {
        self.steps.push(step);
    }

    pub fn steps(&self) -> &[QueryStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Check the plan shape before it reaches the engine: at least one
    /// step, and the first step must not combine with an absent set.
    pub fn validate(&self) -> Result<()> {
        let first = self
            .steps
            .first()
            .ok_or_else(|| Error::InvalidCriteria("query plan has no steps".to_string()))?;

        if matches!(first.op_type, OpType::Intersect | OpType::Union) {
            return Err(Error::InvalidCriteria(format!(
                "query plan cannot start with '{}'",
                first.op_type
            )));
        }
        Ok(())
    }

    /// Structural fingerprint used as the compile cache key
    pub fn signature(&self) -> PlanSignature {
        PlanSignature::of(self)
    }

    /// Literal payloads, in the order the compiled plan consumes them
    pub fn parameters(&self) -> PlanParameters {
        let mut params = PlanParameters::new();
        for step in &self.steps {
            match &step.value {
                Some(StepValue::Range(range)) => {
                    params.push_range(range.gte.map(|b| b.as_key()), range.lte.map(|b| b.as_key()));
                }
                Some(value) => {
                    if let Some(text) = value.to_text() {
                        params.push_text(&text);
                    }
                }
                None => {}
            }

            if let Some(filter) = &step.filter {
                for (key, value) in filter {
                    params.push_pair(key, &value_text(value));
                }
            }
        }
        params
    }

    /// JSON rendering of the plan, for engines that consume text plans
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| Error::Serialization(e.to_string()))
    }
}

/// Text form of a loosely typed filter value
pub(crate) fn value_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
