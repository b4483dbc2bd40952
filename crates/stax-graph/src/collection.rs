//! Key/value collections and their transactions

use crate::cursor::ResultCursor;
use crate::database::Connection;
use crate::engine::KvTransactionHandle;
use stax_core::{CollectionId, Error, Result};
use stax_protocol::{BatchOperation, KeyRange, batch_from_json, encode_batch};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Handle to one named collection
#[derive(Clone)]
pub struct Collection {
    connection: Arc<Connection>,
    name: String,
    id: CollectionId,
}

impl Collection {
    pub(crate) fn new(connection: Arc<Connection>, name: &str, id: CollectionId) -> Self {
        Self {
            connection,
            name: name.to_string(),
            id,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn id(&self) -> CollectionId {
        self.id
    }

    /// Apply `operations` as one batch. An empty list never reaches the engine.
    pub fn execute_batch(&self, operations: &[BatchOperation]) -> Result<()> {
        if operations.is_empty() {
            return Ok(());
        }
        let engine = self.connection.engine()?;
        let buffer = encode_batch(operations)?;
        engine.execute_batch(self.id, &buffer)?;
        debug!(collection = %self.name, operations = operations.len(), bytes = buffer.len(), "Batch applied");
        Ok(())
    }

    /// Apply a batch given as a JSON array of `{type, key, value}` objects
    pub fn execute_batch_json(&self, operations: serde_json::Value) -> Result<()> {
        let operations = batch_from_json(operations)?;
        self.execute_batch(&operations)
    }

    pub fn insert(&self, key: &str, value: &str) -> Result<()> {
        self.execute_batch(&[BatchOperation::insert(key, value)])
    }

    pub fn remove(&self, key: &str) -> Result<()> {
        self.execute_batch(&[BatchOperation::remove(key)])
    }

    /// Read one value through a short read transaction
    pub fn get(&self, key: &str) -> Result<Option<String>> {
        let mut txn = self.begin_read_transaction()?;
        let value = txn.get(key);
        txn.commit()?;

        value?
            .map(|bytes| {
                String::from_utf8(bytes)
                    .map_err(|_| Error::Serialization(format!("value for key '{}' is not UTF-8", key)))
            })
            .transpose()
    }

    pub fn begin_read_transaction(&self) -> Result<ReadTransaction> {
        let handle = self.connection.engine()?.begin_transaction(self.id, true)?;
        Ok(ReadTransaction { handle, state: None })
    }

    pub fn begin_write_transaction(&self) -> Result<WriteTransaction> {
        let handle = self.connection.engine()?.begin_transaction(self.id, false)?;
        Ok(WriteTransaction { handle, state: None })
    }

    /// Scan keys between `range.start` and `range.end`, both inclusive
    pub fn range(&self, range: &KeyRange) -> Result<ResultCursor> {
        let handle = self.connection.engine()?.execute_range_query(self.id, range)?;
        ResultCursor::new(handle, self.connection.config())
    }
}

impl fmt::Debug for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collection")
            .field("name", &self.name)
            .field("id", &self.id)
            .finish()
    }
}

/// Read-only transaction.
///
/// Reads fail once the transaction is finished; finishing it again is a
/// no-op.
pub struct ReadTransaction {
    handle: Box<dyn KvTransactionHandle>,
    state: Option<&'static str>,
}

impl ReadTransaction {
    pub fn get(&mut self, key: &str) -> Result<Option<Vec<u8>>> {
        if let Some(state) = self.state {
            return Err(Error::TransactionClosed(state.to_string()));
        }
        self.handle.get(key)
    }

    pub fn commit(&mut self) -> Result<()> {
        if self.state.is_some() {
            return Ok(());
        }
        self.handle.commit()?;
        self.state = Some("committed");
        Ok(())
    }

    pub fn abort(&mut self) -> Result<()> {
        if self.state.is_some() {
            return Ok(());
        }
        self.handle.abort()?;
        self.state = Some("aborted");
        Ok(())
    }

    pub fn is_active(&self) -> bool {
        self.state.is_none()
    }
}

impl Drop for ReadTransaction {
    fn drop(&mut self) {
        if self.state.is_none() {
            if let Err(e) = self.handle.abort() {
                warn!(error = %e, "Failed to abort dropped read transaction");
            }
        }
    }
}

/// Read-write transaction. Every call fails once it is committed or aborted.
pub struct WriteTransaction {
    handle: Box<dyn KvTransactionHandle>,
    state: Option<&'static str>,
}

impl WriteTransaction {
    fn ensure_active(&self) -> Result<()> {
        match self.state {
            Some(state) => Err(Error::TransactionClosed(state.to_string())),
            None => Ok(()),
        }
    }

    pub fn get(&mut self, key: &str) -> Result<Option<Vec<u8>>> {
        self.ensure_active()?;
        self.handle.get(key)
    }

    pub fn insert(&mut self, key: &str, value: &str) -> Result<()> {
        self.ensure_active()?;
        self.handle.insert(key, value)
    }

    pub fn remove(&mut self, key: &str) -> Result<()> {
        self.ensure_active()?;
        self.handle.remove(key)
    }

    /// Apply the staged writes. On failure the transaction stays active,
    /// so it can be retried or aborted.
    pub fn commit(&mut self) -> Result<()> {
        self.ensure_active()?;
        self.handle.commit()?;
        self.state = Some("committed");
        Ok(())
    }

    pub fn abort(&mut self) -> Result<()> {
        self.ensure_active()?;
        self.handle.abort()?;
        self.state = Some("aborted");
        Ok(())
    }

    pub fn is_active(&self) -> bool {
        self.state.is_none()
    }
}

impl Drop for WriteTransaction {
    fn drop(&mut self) {
        if self.state.is_none() {
            if let Err(e) = self.handle.abort() {
                warn!(error = %e, "Failed to abort dropped write transaction");
            }
        }
    }
}
