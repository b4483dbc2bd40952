//! StaxDB Core Library
//!
//! This crate provides the identifiers, shared enums and error handling
//! used by every other StaxDB client crate.
//!
//! # Modules
//!
//! - `error` - Error types and result aliases
//! - `types` - Plan, object and collection identifiers, traversal direction

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::{CollectionId, Direction, ObjectId, PlanId};
