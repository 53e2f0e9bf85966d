//! Avro binary reader components
//!
//! This module provides the bounds-checked cursor, varint codec, decoder
//! configuration and the schema-driven binary decoder.

pub mod config;
pub mod cursor;
pub mod decode;
pub mod value;
pub mod varint;

pub use config::{
    DecoderConfig, Framing, DEFAULT_MAX_DEPTH, DEFAULT_MAX_ZERO_WIDTH_ITEMS, MAX_DEPTH_CEILING,
};
pub use cursor::Cursor;
pub use decode::{
    decode,
    // Primitive type decoders
    decode_boolean,
    decode_bytes,
    decode_bytes_ref,
    decode_double,
    decode_enum_index,
    decode_fixed_ref,
    decode_float,
    decode_int,
    decode_long,
    decode_node,
    decode_null,
    decode_string,
    decode_string_ref,
    decode_union_index,
    decode_with_config,
};
pub use value::AvroValue;
pub use varint::{decode_varint, decode_zigzag, encode_varint, encode_zigzag};
