//! Avro schema types and parsing.
//!
//! This module defines the Avro schema model as an arena of type nodes,
//! the JSON schema parser with named type resolution, and rendering of a
//! parsed schema back to schema JSON.

mod parser;
mod types;

pub use parser::{parse_schema, parse_schema_with_options, SchemaParser};
pub use types::*;
