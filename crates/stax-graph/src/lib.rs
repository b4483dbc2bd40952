//! StaxDB Client
//!
//! Database, collection and graph handles over a pluggable storage engine.
//!
//! # Overview
//!
//! The client layer provides:
//! - The [`Engine`] boundary every storage backend implements
//! - Key/value collections with batches, transactions and range scans
//! - Graph writes and fluent queries, compiled once per plan shape
//! - Paged result cursors with lazy record streams
//! - An async facade for tokio callers
//! - [`MemoryEngine`], a complete in-process engine

pub mod async_db;
pub mod cache;
pub mod collection;
pub mod config;
pub mod cursor;
pub mod database;
pub mod engine;
pub mod graph;
pub mod memory;

pub use async_db::AsyncDatabase;
pub use cache::PlanCache;
pub use collection::{Collection, ReadTransaction, WriteTransaction};
pub use config::ClientConfig;
pub use cursor::{RecordStream, ResultCursor};
pub use database::Database;
pub use engine::{Engine, GraphTransactionHandle, KvTransactionHandle, ObjectData, ResultHandle};
pub use graph::{Graph, GraphTransaction};
pub use memory::MemoryEngine;
