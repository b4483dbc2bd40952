//! Result pages returned by the engine

use crate::message::PageRequest;
use serde::{Deserialize, Serialize};
use stax_core::ObjectId;
use std::collections::BTreeMap;

/// A single result record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Record {
    /// Entry from a key/value collection scan
    KeyValue { key: Vec<u8>, value: Vec<u8> },

    /// Graph object matched by a query plan
    Object {
        id: ObjectId,
        properties: BTreeMap<String, String>,
    },
}

impl Record {
    /// Key of a key/value record, decoded as UTF-8
    pub fn key_str(&self) -> Option<&str> {
        match self {
            Record::KeyValue { key, .. } => std::str::from_utf8(key).ok(),
            Record::Object { .. } => None,
        }
    }

    /// Value of a key/value record, decoded as UTF-8
    pub fn value_str(&self) -> Option<&str> {
        match self {
            Record::KeyValue { value, .. } => std::str::from_utf8(value).ok(),
            Record::Object { .. } => None,
        }
    }

    /// Id of a graph object record
    pub fn object_id(&self) -> Option<ObjectId> {
        match self {
            Record::Object { id, .. } => Some(*id),
            Record::KeyValue { .. } => None,
        }
    }

    /// Property of a graph object record
    pub fn property(&self, name: &str) -> Option<&str> {
        match self {
            Record::Object { properties, .. } => properties.get(name).map(String::as_str),
            Record::KeyValue { .. } => None,
        }
    }
}

/// One page of results
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultPage {
    /// Page that was requested (1-based)
    pub page_number: u32,

    /// Number of pages at the requested page size
    pub total_pages: u32,

    /// Size of the whole result set
    pub total_results: u64,

    /// Records on this page, in result order
    pub results: Vec<Record>,
}

impl ResultPage {
    /// Slice one page out of a fully materialized result set.
    ///
    /// Pages past the end come back empty rather than failing.
    pub fn paginate(records: &[Record], request: PageRequest) -> Self {
        let total = records.len() as u64;
        let size = request.page_size.max(1) as u64;
        let total_pages = u32::try_from(total.div_ceil(size)).unwrap_or(u32::MAX);

        let start = request.offset().min(total) as usize;
        let end = (start as u64 + size).min(total) as usize;

        Self {
            page_number: request.page_number,
            total_pages,
            total_results: total,
            results: records[start..end].to_vec(),
        }
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}
