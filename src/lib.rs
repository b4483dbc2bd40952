//! StaxDB - query-plan compiler and engine client
//!
//! This is the main library crate that re-exports all StaxDB client components.

pub use stax_core as core;
pub use stax_graph as client;
pub use stax_protocol as protocol;
pub use stax_query as query;

// Re-export commonly used types
pub use stax_core::{CollectionId, Direction, Error, ObjectId, PlanId, Result};

pub use stax_graph::{
    AsyncDatabase, ClientConfig, Collection, Database, Engine, Graph, GraphTransaction, MemoryEngine,
    ReadTransaction, RecordStream, ResultCursor, WriteTransaction,
};
pub use stax_protocol::{BatchOperation, KeyRange, Record, ResultPage};
pub use stax_query::{QueryBuilder, QueryPlan};
