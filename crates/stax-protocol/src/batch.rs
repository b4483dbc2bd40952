//! Binary batch-operation encoding
//!
//! A batch is an ordered list of inserts and removes shipped to the engine
//! in one buffer. Little-endian throughout:
//!
//! ```text
//! u32                          operation_count
//! repeated operation_count times:
//!   u8                         tag (1 = insert, 2 = remove)
//!   u32                        key_length
//!   [u8; key_length]           key (UTF-8)
//!   if tag == 1:
//!     u32                      value_length
//!     [u8; value_length]       value (UTF-8)
//! ```
//!
//! The layout carries no version field; it is a private contract with the
//! engine build it ships alongside.

use serde::{Deserialize, Serialize};
use stax_core::{Error, Result};

/// Tag bytes for each operation kind
pub mod tag {
    pub const INSERT: u8 = 1;
    pub const REMOVE: u8 = 2;
}

/// Size of the leading operation count
pub const HEADER_LEN: usize = 4;

/// Tag byte plus key length prefix
pub const OP_HEADER_LEN: usize = 1 + 4;

/// Value length prefix carried by inserts
pub const VALUE_PREFIX_LEN: usize = 4;

/// A single write in a batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BatchOperation {
    Insert { key: String, value: String },
    Remove { key: String },
}

impl BatchOperation {
    /// Create an insert operation
    pub fn insert(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Insert {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Create a remove operation
    pub fn remove(key: impl Into<String>) -> Self {
        Self::Remove { key: key.into() }
    }

    /// The key this operation targets
    pub fn key(&self) -> &str {
        match self {
            Self::Insert { key, .. } | Self::Remove { key } => key,
        }
    }

    /// Wire tag for this operation
    pub fn tag(&self) -> u8 {
        match self {
            Self::Insert { .. } => tag::INSERT,
            Self::Remove { .. } => tag::REMOVE,
        }
    }

    /// Exact number of bytes this operation occupies on the wire
    pub fn encoded_len(&self) -> usize {
        match self {
            Self::Insert { key, value } => OP_HEADER_LEN + key.len() + VALUE_PREFIX_LEN + value.len(),
            Self::Remove { key } => OP_HEADER_LEN + key.len(),
        }
    }
}

/// Exact size of the encoded batch; zero for an empty batch
pub fn encoded_len(operations: &[BatchOperation]) -> usize {
    if operations.is_empty() {
        return 0;
    }
    HEADER_LEN
        + operations
            .iter()
            .map(BatchOperation::encoded_len)
            .sum::<usize>()
}

/// Encode a batch into one buffer.
///
/// An empty batch produces no bytes. The buffer is sized up front and never
/// grows while writing.
pub fn encode_batch(operations: &[BatchOperation]) -> Result<Vec<u8>> {
    if operations.is_empty() {
        return Ok(Vec::new());
    }

    let count = checked_len(operations.len(), "operation count")?;
    let mut encoder = BatchEncoder::new(encoded_len(operations));
    encoder.push_u32(count);

    for op in operations {
        encoder.push_u8(op.tag());
        encoder.push_prefixed(op.key(), "key")?;
        if let BatchOperation::Insert { value, .. } = op {
            encoder.push_prefixed(value, "value")?;
        }
    }

    let buffer = encoder.finish();
    debug_assert_eq!(buffer.len(), encoded_len(operations));
    tracing::debug!("Encoded batch of {} operations into {} bytes", count, buffer.len());
    Ok(buffer)
}

/// Parse a batch from its loosely typed form, e.g.
/// `[{"type": "insert", "key": "k", "value": "v"}, {"type": "remove", "key": "k"}]`
pub fn batch_from_json(value: serde_json::Value) -> Result<Vec<BatchOperation>> {
    let serde_json::Value::Array(items) = value else {
        return Err(Error::InvalidBatch(
            "a batch must be an array of operations".to_string(),
        ));
    };

    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| {
            serde_json::from_value(item)
                .map_err(|e| Error::InvalidBatch(format!("operation {}: {}", i, e)))
        })
        .collect()
}

/// Decode a buffer produced by [`encode_batch`].
///
/// Strict: truncated fields, unknown tags, invalid UTF-8 and trailing
/// bytes are all protocol errors.
pub fn decode_batch(data: &[u8]) -> Result<Vec<BatchOperation>> {
    let mut decoder = BatchDecoder::new(data);
    let count = decoder
        .read_u32()
        .ok_or_else(|| Error::Protocol("batch buffer is too small".to_string()))?;

    // Each operation needs at least OP_HEADER_LEN bytes, so cap the
    // preallocation by what the buffer could possibly hold.
    let mut operations = Vec::with_capacity((count as usize).min(decoder.remaining() / OP_HEADER_LEN));

    for i in 0..count {
        let op_tag = decoder
            .read_u8()
            .ok_or_else(|| truncated(i, "tag"))?;
        let key = decoder.read_prefixed_str().ok_or_else(|| truncated(i, "key"))??;

        let op = match op_tag {
            tag::INSERT => {
                let value = decoder
                    .read_prefixed_str()
                    .ok_or_else(|| truncated(i, "value"))??;
                BatchOperation::Insert { key, value }
            }
            tag::REMOVE => BatchOperation::Remove { key },
            other => {
                return Err(Error::Protocol(format!(
                    "operation {}: unknown tag {}",
                    i, other
                )));
            }
        };
        operations.push(op);
    }

    if decoder.remaining() != 0 {
        return Err(Error::Protocol(format!(
            "{} trailing bytes after {} operations",
            decoder.remaining(),
            count
        )));
    }

    Ok(operations)
}

fn truncated(index: u32, field: &str) -> Error {
    Error::Protocol(format!("operation {}: truncated {}", index, field))
}

fn checked_len(len: usize, what: &str) -> Result<u32> {
    u32::try_from(len)
        .map_err(|_| Error::InvalidBatch(format!("{} {} exceeds the u32 wire limit", what, len)))
}

/// Fixed-capacity little-endian writer
#[derive(Debug)]
struct BatchEncoder {
    buffer: Vec<u8>,
}

impl BatchEncoder {
    fn new(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
        }
    }

    fn push_u8(&mut self, value: u8) {
        self.buffer.push(value);
    }

    fn push_u32(&mut self, value: u32) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    fn push_prefixed(&mut self, s: &str, what: &str) -> Result<()> {
        self.push_u32(checked_len(s.len(), what)?);
        self.buffer.extend_from_slice(s.as_bytes());
        Ok(())
    }

    fn finish(self) -> Vec<u8> {
        self.buffer
    }
}

/// Cursor over an encoded batch
struct BatchDecoder<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> BatchDecoder<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn read_u8(&mut self) -> Option<u8> {
        let byte = *self.data.get(self.pos)?;
        self.pos += 1;
        Some(byte)
    }

    fn read_u32(&mut self) -> Option<u32> {
        let bytes: [u8; 4] = self.data.get(self.pos..self.pos + 4)?.try_into().ok()?;
        self.pos += 4;
        Some(u32::from_le_bytes(bytes))
    }

    /// `None` on truncation, `Some(Err)` on invalid UTF-8
    fn read_prefixed_str(&mut self) -> Option<Result<String>> {
        let len = self.read_u32()? as usize;
        let end = self.pos.checked_add(len)?;
        let bytes = self.data.get(self.pos..end)?;
        self.pos = end;
        Some(
            std::str::from_utf8(bytes)
                .map(str::to_owned)
                .map_err(|e| Error::Protocol(format!("invalid UTF-8 in batch: {}", e))),
        )
    }

    fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }
}
