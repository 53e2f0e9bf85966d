//! Avro value tree to JSON conversion
//!
//! This module renders decoded values as Avro-convention JSON: union values
//! tagged with their branch type, binary data as byte-preserving strings,
//! record fields in schema order.

mod json;

pub use json::{decode_byte_string, encode_byte_string, encode_json, to_json_value};
