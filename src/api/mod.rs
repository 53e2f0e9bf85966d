//! Public API module.
//!
//! This module ties the pieces together for hosts: a decoder holding a
//! parsed schema and limits, and a bounded cache of parsed schemas.
//!
//! # Module Structure
//! - `decoder`: One-call payload decoding (`AvroJsonDecoder`)
//! - `cache`: Parsed schema cache (`SchemaCache`)

pub mod cache;
pub mod decoder;

// Re-export main types
pub use cache::{SchemaCache, DEFAULT_CAPACITY};
pub use decoder::AvroJsonDecoder;
