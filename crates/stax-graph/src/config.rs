//! Client configuration

use serde::{Deserialize, Serialize};
use stax_core::{Error, Result};
use stax_protocol::PageRequest;

/// Client-side behavior knobs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Page number used when a caller passes a non-positive one
    pub default_page_number: u32,

    /// Page size used when a caller passes a non-positive one
    pub default_page_size: u32,

    /// Page size used by record streams
    pub stream_page_size: u32,

    /// Log a warning when page arguments are replaced with defaults
    pub warn_on_page_coercion: bool,

    /// Collection used by `AsyncDatabase::insert_batch`
    pub async_batch_collection: String,

    /// Collection used by `AsyncDatabase::multi_get`
    pub async_multiget_collection: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            default_page_number: PageRequest::DEFAULT_PAGE_NUMBER,
            default_page_size: PageRequest::DEFAULT_PAGE_SIZE,
            stream_page_size: 50,
            warn_on_page_coercion: true,
            async_batch_collection: "async_batch_collection".to_string(),
            async_multiget_collection: "async_multiget_collection".to_string(),
        }
    }
}

impl ClientConfig {
    /// Create the default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Configuration for tests: small stream pages, quiet coercion
    pub fn for_testing() -> Self {
        Self {
            stream_page_size: 4,
            warn_on_page_coercion: false,
            ..Default::default()
        }
    }

    /// Load a configuration from JSON; missing fields take defaults
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| Error::Serialization(format!("invalid client config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject sizes the engine cannot page with
    pub fn validate(&self) -> Result<()> {
        if self.default_page_number == 0 || self.default_page_size == 0 || self.stream_page_size == 0 {
            return Err(Error::InvalidArgument(
                "page numbers and sizes must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Defaults applied by `ResultCursor::get_page`
    pub fn page_defaults(&self) -> PageRequest {
        PageRequest {
            page_number: self.default_page_number,
            page_size: self.default_page_size,
        }
    }

    /// Builder: set the stream page size
    pub fn stream_page_size(mut self, size: u32) -> Self {
        self.stream_page_size = size;
        self
    }

    /// Builder: set the default page size
    pub fn default_page_size(mut self, size: u32) -> Self {
        self.default_page_size = size;
        self
    }

    /// Builder: toggle coercion warnings
    pub fn warn_on_page_coercion(mut self, warn: bool) -> Self {
        self.warn_on_page_coercion = warn;
        self
    }
}
