//! Avro binary to JSON decoding for per-invocation host functions
//!
//! This library parses Avro schemas, decodes Avro binary payloads against
//! them and renders the result as Avro-convention JSON: union values tagged
//! with their branch type and binary data as byte-preserving strings.
//!
//! # Example
//! ```
//! use avro_json_udf::{AvroJsonDecoder, DecoderConfig};
//!
//! let decoder = AvroJsonDecoder::new(r#"["null", "long"]"#, DecoderConfig::default()).unwrap();
//! assert_eq!(decoder.decode_hex("00").unwrap(), "null");
//! assert_eq!(decoder.decode_hex("0202").unwrap(), r#"{"long":1}"#);
//! ```

pub mod api;
pub mod convert;
pub mod error;
pub mod path;
pub mod reader;
pub mod schema;
pub mod transport;
pub mod writer;

// Re-export main types
pub use api::{AvroJsonDecoder, SchemaCache};
pub use convert::{decode_byte_string, encode_byte_string, encode_json, to_json_value};
pub use error::{
    ConfigError, DecodeError, DecodeErrorKind, EncodeError, Error, InputError, SchemaError,
    SchemaErrorKind,
};
pub use reader::{
    decode, decode_node, decode_with_config, AvroValue, DecoderConfig, Framing,
};
pub use schema::{
    parse_schema, parse_schema_with_options, EnumSchema, FieldSchema, FixedSchema, NamedRef,
    NodeId, RecordSchema, Schema, SchemaNode, SchemaParser,
};
pub use transport::{decode_hex, encode_hex};
pub use writer::{encode_node, encode_value, BlockStyle};
