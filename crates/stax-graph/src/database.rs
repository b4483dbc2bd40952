//! Database management for StaxDB

use crate::collection::Collection;
use crate::config::ClientConfig;
use crate::engine::Engine;
use crate::graph::Graph;
use stax_core::{Error, Result};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use tracing::{info, warn};

/// Engine plus the client state every handle shares
pub(crate) struct Connection {
    engine: Arc<dyn Engine>,
    config: ClientConfig,
    open: AtomicBool,
}

impl Connection {
    /// The engine, or `DatabaseClosed` once the database is closed
    pub(crate) fn engine(&self) -> Result<&dyn Engine> {
        if !self.open.load(Ordering::SeqCst) {
            return Err(Error::DatabaseClosed);
        }
        Ok(self.engine.as_ref())
    }

    pub(crate) fn config(&self) -> &ClientConfig {
        &self.config
    }
}

/// An open StaxDB database
///
/// Hands out cached [`Collection`] and [`Graph`] handles. Closing the
/// database drops those caches, so a graph's compiled plans do not outlive
/// it, and every handle fails with `DatabaseClosed` from then on.
pub struct Database {
    connection: Arc<Connection>,

    /// Collection handles by name
    collections: RwLock<HashMap<String, Collection>>,

    graph: RwLock<Option<Graph>>,
}

impl Database {
    /// Open a database over `engine` with the default configuration
    pub fn open<E: Engine + 'static>(engine: Arc<E>) -> Result<Self> {
        Self::open_with_config(engine, ClientConfig::default())
    }

    /// Open a database over `engine`
    pub fn open_with_config<E: Engine + 'static>(engine: Arc<E>, config: ClientConfig) -> Result<Self> {
        config.validate()?;
        info!(stream_page_size = config.stream_page_size, "Opening database");

        Ok(Self {
            connection: Arc::new(Connection {
                engine,
                config,
                open: AtomicBool::new(true),
            }),
            collections: RwLock::new(HashMap::new()),
            graph: RwLock::new(None),
        })
    }

    /// Open a database with the test configuration
    pub fn open_for_testing<E: Engine + 'static>(engine: Arc<E>) -> Result<Self> {
        Self::open_with_config(engine, ClientConfig::for_testing())
    }

    pub fn is_open(&self) -> bool {
        self.connection.open.load(Ordering::SeqCst)
    }

    pub fn config(&self) -> &ClientConfig {
        self.connection.config()
    }

    /// Get (or open) a named key/value collection
    pub fn collection(&self, name: &str) -> Result<Collection> {
        let engine = self.connection.engine()?;
        {
            let collections = self
                .collections
                .read()
                .map_err(|_| Error::Internal("Failed to acquire collections lock".to_string()))?;
            if let Some(collection) = collections.get(name) {
                return Ok(collection.clone());
            }
        }

        let id = engine.open_collection(name)?;
        let collection = Collection::new(self.connection.clone(), name, id);

        let mut collections = self
            .collections
            .write()
            .map_err(|_| Error::Internal("Failed to acquire collections lock".to_string()))?;
        let collection = collections.entry(name.to_string()).or_insert(collection).clone();
        info!(name, "Opened collection");
        Ok(collection)
    }

    /// Get the graph handle
    pub fn graph(&self) -> Result<Graph> {
        self.connection.engine()?;
        let mut graph = self
            .graph
            .write()
            .map_err(|_| Error::Internal("Failed to acquire graph lock".to_string()))?;
        Ok(graph
            .get_or_insert_with(|| Graph::new(self.connection.clone()))
            .clone())
    }

    /// Close the database and the engine. Closing twice is a no-op.
    pub fn close(&self) -> Result<()> {
        if !self.connection.open.swap(false, Ordering::SeqCst) {
            return Ok(());
        }

        match self.collections.write() {
            Ok(mut collections) => collections.clear(),
            Err(_) => warn!("Collections lock poisoned while closing"),
        }
        match self.graph.write() {
            Ok(mut graph) => *graph = None,
            Err(_) => warn!("Graph lock poisoned while closing"),
        }

        self.connection.engine.close()?;
        info!("Database closed");
        Ok(())
    }
}

impl fmt::Debug for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Database")
            .field("open", &self.is_open())
            .field("config", self.config())
            .finish()
    }
}
