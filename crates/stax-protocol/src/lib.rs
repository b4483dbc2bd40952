//! StaxDB Protocol
//!
//! Byte-level contracts shared with the storage engine.
//!
//! # Formats
//!
//! - **Batch**: fixed-layout little-endian encoding of insert/remove lists
//! - **Parameters**: literal payloads that accompany a compiled plan id
//! - **Pages**: paged result records returned by result-set handles

pub mod batch;
pub mod message;
pub mod page;
pub mod params;

pub use batch::{BatchOperation, batch_from_json, decode_batch, encode_batch, encoded_len};
pub use message::{KeyRange, PageRequest};
pub use page::{Record, ResultPage};
pub use params::PlanParameters;
