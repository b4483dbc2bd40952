//! Structural plan signatures
//!
//! Engines compile plans by shape, so two plans that differ only in their
//! literals share one compiled plan. The signature keeps each step's
//! operator, field and direction plus the kind of payload it carries
//! (equality literal, range, filter arity), and drops the literals.
//!
//! Canonical form, one segment per step:
//!
//! ```text
//! <op>/<direction>/<payload>/<filter>/<field byte length>:<field>;
//! ```
//!
//! Fields are length-prefixed so no field content can forge a boundary.

use crate::plan::{QueryPlan, QueryStep, StepValue};
use std::fmt::{self, Write};

/// Canonical structural encoding of a plan
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlanSignature(String);

impl PlanSignature {
    /// Compute the signature of a plan
    pub fn of(plan: &QueryPlan) -> Self {
        let mut out = String::with_capacity(plan.len() * 24);
        for step in plan.steps() {
            write_step(&mut out, step);
        }
        Self(out)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// 64-bit digest for compact logging
    pub fn digest(&self) -> u64 {
        xxhash_rust::xxh3::xxh3_64(self.0.as_bytes())
    }
}

impl fmt::Display for PlanSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn write_step(out: &mut String, step: &QueryStep) {
    let direction = step.direction.map_or("-", |d| d.as_str());
    let payload = match &step.value {
        None => "-",
        Some(StepValue::Range(_)) => "range",
        Some(_) => "eq",
    };

    // Writing into a String cannot fail
    let _ = write!(out, "{}/{}/{}/", step.op_type, direction, payload);
    match &step.filter {
        Some(filter) => {
            let _ = write!(out, "f{}/", filter.len());
        }
        None => out.push_str("-/"),
    }
    let _ = write!(out, "{}:{};", step.field.len(), step.field);
}
