//! StaxDB Query Compiler
//!
//! Builds engine query plans from composable criteria.
//!
//! # Overview
//!
//! The query layer implements:
//! - Interleaved 64-bit geohash encoding for location criteria
//! - Criterion normalization (equality, ranges, points, radius searches)
//! - A fluent plan builder with find/filter/union/traverse semantics
//! - Structural plan signatures for compile caching

pub mod builder;
pub mod criterion;
pub mod geohash;
pub mod plan;
pub mod signature;

pub use builder::{Detached, PlanExecutor, QueryBuilder};
pub use plan::{number_key, Bound, OpType, QueryPlan, QueryStep, Range, StepValue};
pub use signature::PlanSignature;
