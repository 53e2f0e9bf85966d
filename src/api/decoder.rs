//! One-call decoding of payloads to JSON.
//!
//! [`AvroJsonDecoder`] is what a host function holds: a parsed schema plus
//! limits. Each call runs hex → bytes → value tree → JSON and returns a
//! typed error at the first failure, with no partial output.

use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::convert::{encode_json, to_json_value};
use crate::error::Error;
use crate::reader::{decode_with_config, AvroValue, DecoderConfig, Framing};
use crate::schema::{parse_schema_with_options, Schema};
use crate::transport;

/// Decodes payloads of one schema into Avro-convention JSON.
///
/// Cheap to clone; clones share the parsed schema.
///
/// # Example
/// ```
/// use avro_json_udf::{AvroJsonDecoder, DecoderConfig};
///
/// let schema = r#"{"type": "record", "name": "User", "fields": [
///     {"name": "id", "type": "long"},
///     {"name": "name", "type": "string"}
/// ]}"#;
/// let decoder = AvroJsonDecoder::new(schema, DecoderConfig::default()).unwrap();
/// assert_eq!(decoder.decode_hex("02046162").unwrap(), r#"{"id":1,"name":"ab"}"#);
/// ```
#[derive(Debug, Clone)]
pub struct AvroJsonDecoder {
    schema: Arc<Schema>,
    config: DecoderConfig,
}

impl AvroJsonDecoder {
    /// Parse `schema_text` and build a decoder.
    ///
    /// Names are validated strictly when `config.strict_schema` is set.
    pub fn new(schema_text: &str, config: DecoderConfig) -> Result<Self, Error> {
        let schema = parse_schema_with_options(schema_text, config.strict_schema)?;
        Ok(Self::from_schema(Arc::new(schema), config))
    }

    /// Build a decoder over an already parsed schema.
    pub fn from_schema(schema: Arc<Schema>, config: DecoderConfig) -> Self {
        Self { schema, config }
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    /// Decode a hex payload to JSON text.
    pub fn decode_hex(&self, hex: &str) -> Result<String, Error> {
        let bytes = transport::decode_hex(hex)?;
        self.decode_bytes(&bytes)
    }

    /// Decode a binary payload to JSON text.
    pub fn decode_bytes(&self, bytes: &[u8]) -> Result<String, Error> {
        let value = self.decode_value(bytes)?;
        Ok(encode_json(&value, &self.schema)?)
    }

    /// Decode a binary payload to a `serde_json::Value`.
    pub fn decode_json_value(&self, bytes: &[u8]) -> Result<Value, Error> {
        let value = self.decode_value(bytes)?;
        Ok(to_json_value(&value, &self.schema, self.schema.root())?)
    }

    /// Decode a binary payload to a value tree, applying the framing check.
    pub fn decode_value(&self, bytes: &[u8]) -> Result<AvroValue, Error> {
        let (value, consumed) = decode_with_config(bytes, &self.schema, &self.config)?;
        if self.config.framing == Framing::Single && consumed < bytes.len() {
            return Err(Error::TrailingBytes {
                consumed,
                trailing: bytes.len() - consumed,
            });
        }
        Ok(value)
    }

    /// Decode a batch of hex payloads, each independently.
    ///
    /// A failing row yields its own `Err` and never affects other rows.
    pub fn decode_rows<I, S>(&self, rows: I) -> Vec<Result<String, Error>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        rows.into_iter()
            .enumerate()
            .map(|(row, hex)| {
                let result = self.decode_hex(hex.as_ref());
                if let Err(err) = &result {
                    debug!(row, error = %err, "row failed to decode");
                }
                result
            })
            .collect()
    }
}
