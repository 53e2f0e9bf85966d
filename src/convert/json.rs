//! Avro value tree to JSON conversion.
//!
//! Output follows the Avro JSON encoding:
//! - records become objects with fields in schema order
//! - bytes and fixed become strings with one code point (U+0000..U+00FF)
//!   per byte
//! - a union value becomes `{"<branch type>": value}`, except the null
//!   branch, which is a bare `null`

use serde_json::{Map, Number, Value};

use crate::error::EncodeError;
use crate::path::{render_path, PathSegment};
use crate::reader::AvroValue;
use crate::schema::{NodeId, RecordSchema, Schema, SchemaNode};

/// Encode a value of `schema`'s root type as JSON text.
///
/// # Example
/// ```
/// use avro_json_udf::convert::encode_json;
/// use avro_json_udf::reader::AvroValue;
/// use avro_json_udf::schema::parse_schema;
///
/// let schema = parse_schema(r#"["null", "long"]"#).unwrap();
/// let value = AvroValue::Union(1, Box::new(AvroValue::Long(1)));
/// assert_eq!(encode_json(&value, &schema).unwrap(), r#"{"long":1}"#);
/// ```
pub fn encode_json(value: &AvroValue, schema: &Schema) -> Result<String, EncodeError> {
    let json = to_json_value(value, schema, schema.root())?;
    Ok(serde_json::to_string(&json)?)
}

/// Convert a value of `node` into a `serde_json::Value`.
pub fn to_json_value(
    value: &AvroValue,
    schema: &Schema,
    node: NodeId,
) -> Result<Value, EncodeError> {
    JsonEncoder::new(schema).encode(value, node)
}

/// Map each byte to the code point of the same value.
pub fn encode_byte_string(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

/// Reverse [`encode_byte_string`].
///
/// Fails on any character above U+00FF.
pub fn decode_byte_string(text: &str) -> Result<Vec<u8>, EncodeError> {
    text.chars()
        .enumerate()
        .map(|(index, character)| {
            u8::try_from(u32::from(character))
                .map_err(|_| EncodeError::InvalidByteString { character, index })
        })
        .collect()
}

struct JsonEncoder<'p> {
    schema: &'p Schema,
    path: Vec<PathSegment<'p>>,
}

impl<'p> JsonEncoder<'p> {
    fn new(schema: &'p Schema) -> Self {
        Self {
            schema,
            path: Vec::new(),
        }
    }

    // Containers get their own small frames so deep values do not exhaust
    // the stack before the decoder's depth limit would.
    fn encode(&mut self, value: &'p AvroValue, id: NodeId) -> Result<Value, EncodeError> {
        let schema = self.schema;
        match (schema.resolved_node(id), value) {
            (SchemaNode::Array(items), AvroValue::Array(values)) => {
                self.encode_array(*items, values)
            }
            (SchemaNode::Map(values), AvroValue::Map(entries)) => {
                self.encode_map(*values, entries)
            }
            (SchemaNode::Record(record), AvroValue::Record(fields)) => {
                self.encode_record(record, fields)
            }
            (SchemaNode::Union(branches), AvroValue::Union(index, inner)) => {
                self.encode_union(branches, *index, inner)
            }
            (node, value) => self.encode_primitive(node, value),
        }
    }

    #[inline(never)]
    fn encode_primitive(&self, node: &SchemaNode, value: &AvroValue) -> Result<Value, EncodeError> {
        let json = match (node, value) {
            (SchemaNode::Null, AvroValue::Null) => Value::Null,
            (SchemaNode::Boolean, AvroValue::Boolean(b)) => Value::Bool(*b),
            (SchemaNode::Int, AvroValue::Long(n)) => {
                if i32::try_from(*n).is_err() {
                    return Err(self.mismatch("int", format!("long {}", n)));
                }
                Value::Number((*n).into())
            }
            (SchemaNode::Long, AvroValue::Long(n)) => Value::Number((*n).into()),
            (SchemaNode::Float, AvroValue::Double(f)) => {
                // Print the shortest form that reads back as the same f32
                let narrowed = *f as f32;
                let widened = narrowed.to_string().parse::<f64>().unwrap_or(*f);
                self.number(widened)?
            }
            (SchemaNode::Double, AvroValue::Double(f)) => self.number(*f)?,
            (SchemaNode::Bytes, AvroValue::Bytes(bytes)) => {
                Value::String(encode_byte_string(bytes))
            }
            (SchemaNode::Fixed(fixed), AvroValue::Bytes(bytes)) => {
                if bytes.len() != fixed.size {
                    return Err(self.mismatch(
                        &format!("{} bytes", fixed.size),
                        format!("{} bytes", bytes.len()),
                    ));
                }
                Value::String(encode_byte_string(bytes))
            }
            (SchemaNode::String, AvroValue::String(s)) => Value::String(s.clone()),
            (SchemaNode::Enum(e), AvroValue::Enum(index, symbol)) => {
                if e.symbols.get(*index) != Some(symbol) {
                    return Err(self.mismatch(
                        &format!("symbol of {}", e.fullname()),
                        format!("{} at index {}", symbol, index),
                    ));
                }
                Value::String(symbol.clone())
            }
            (node, value) => return Err(self.mismatch(node.kind_name(), value.kind_name())),
        };
        Ok(json)
    }

    #[inline(never)]
    fn encode_array(
        &mut self,
        items: NodeId,
        values: &'p [AvroValue],
    ) -> Result<Value, EncodeError> {
        let mut out = Vec::with_capacity(values.len());
        for (i, item) in values.iter().enumerate() {
            self.path.push(PathSegment::Index(i));
            out.push(self.encode(item, items)?);
            self.path.pop();
        }
        Ok(Value::Array(out))
    }

    #[inline(never)]
    fn encode_map(
        &mut self,
        values: NodeId,
        entries: &'p [(String, AvroValue)],
    ) -> Result<Value, EncodeError> {
        let mut out = Map::with_capacity(entries.len());
        for (key, entry) in entries {
            self.path.push(PathSegment::Key(key));
            let encoded = self.encode(entry, values)?;
            self.path.pop();
            // A repeated key keeps its first position and last value
            out.insert(key.clone(), encoded);
        }
        Ok(Value::Object(out))
    }

    #[inline(never)]
    fn encode_record(
        &mut self,
        record: &'p RecordSchema,
        fields: &'p [AvroValue],
    ) -> Result<Value, EncodeError> {
        if fields.len() != record.fields.len() {
            return Err(self.mismatch(
                &format!("{} fields of {}", record.fields.len(), record.fullname()),
                format!("{} fields", fields.len()),
            ));
        }
        let mut out = Map::with_capacity(fields.len());
        for (field, field_value) in record.fields.iter().zip(fields) {
            self.path.push(PathSegment::Field(&field.name));
            let encoded = self.encode(field_value, field.schema)?;
            self.path.pop();
            out.insert(field.name.clone(), encoded);
        }
        Ok(Value::Object(out))
    }

    #[inline(never)]
    fn encode_union(
        &mut self,
        branches: &'p [NodeId],
        index: usize,
        inner: &'p AvroValue,
    ) -> Result<Value, EncodeError> {
        let branch = *branches.get(index).ok_or_else(|| {
            self.mismatch(
                &format!("branch index below {}", branches.len()),
                format!("branch {}", index),
            )
        })?;
        let encoded = self.encode(inner, branch)?;
        let schema = self.schema;
        match schema.resolved_node(branch) {
            SchemaNode::Null => Ok(Value::Null),
            _ => {
                let mut wrapper = Map::with_capacity(1);
                wrapper.insert(schema.type_name(branch).into_owned(), encoded);
                Ok(Value::Object(wrapper))
            }
        }
    }

    fn number(&self, value: f64) -> Result<Value, EncodeError> {
        Number::from_f64(value)
            .map(Value::Number)
            .ok_or_else(|| EncodeError::NonFiniteFloat {
                value,
                path: render_path(&self.path),
            })
    }

    fn mismatch(&self, expected: &str, found: impl Into<String>) -> EncodeError {
        EncodeError::Mismatch {
            path: render_path(&self.path),
            expected: expected.to_string(),
            found: found.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::parse_schema;

    fn encode(schema_json: &str, value: &AvroValue) -> Result<String, EncodeError> {
        let schema = parse_schema(schema_json).unwrap();
        encode_json(value, &schema)
    }

    #[test]
    fn test_record_fields_in_schema_order() {
        let json = encode(
            r#"{"type": "record", "name": "R", "fields": [
                {"name": "zeta", "type": "long"},
                {"name": "alpha", "type": "string"}
            ]}"#,
            &AvroValue::Record(vec![AvroValue::Long(1), "x".into()]),
        )
        .unwrap();
        assert_eq!(json, r#"{"zeta":1,"alpha":"x"}"#);
    }

    #[test]
    fn test_union_null_branch_is_bare() {
        let schema = r#"["null", "string"]"#;
        assert_eq!(encode(schema, &AvroValue::union(0, AvroValue::Null)).unwrap(), "null");
        assert_eq!(
            encode(schema, &AvroValue::union(1, "hi".into())).unwrap(),
            r#"{"string":"hi"}"#
        );
    }

    #[test]
    fn test_union_named_branch_uses_fullname() {
        let json = encode(
            r#"["null", {"type": "enum", "name": "Suit", "namespace": "cards", "symbols": ["HEARTS"]}]"#,
            &AvroValue::union(1, AvroValue::Enum(0, "HEARTS".into())),
        )
        .unwrap();
        assert_eq!(json, r#"{"cards.Suit":"HEARTS"}"#);
    }

    #[test]
    fn test_bytes_preserved_as_code_points() {
        let json = encode(r#""bytes""#, &AvroValue::Bytes(vec![0x00, 0x41, 0xFF])).unwrap();
        assert_eq!(json, "\"\\u0000A\u{ff}\"");
        let text: String = serde_json::from_str(&json).unwrap();
        assert_eq!(decode_byte_string(&text).unwrap(), vec![0x00, 0x41, 0xFF]);
    }

    #[test]
    fn test_decode_byte_string_rejects_wide_chars() {
        let err = decode_byte_string("a\u{100}").unwrap_err();
        assert_eq!(
            err,
            EncodeError::InvalidByteString {
                character: '\u{100}',
                index: 1
            }
        );
    }

    #[test]
    fn test_non_finite_float() {
        let err = encode(r#""double""#, &AvroValue::Double(f64::NAN)).unwrap_err();
        assert!(matches!(err, EncodeError::NonFiniteFloat { .. }));
    }

    #[test]
    fn test_float_prints_shortest_form() {
        let widened = f64::from(0.1f32);
        assert_eq!(encode(r#""float""#, &AvroValue::Double(widened)).unwrap(), "0.1");
    }

    #[test]
    fn test_mismatch_reports_path() {
        let err = encode(
            r#"{"type": "record", "name": "R", "fields": [
                {"name": "items", "type": {"type": "array", "items": "long"}}
            ]}"#,
            &AvroValue::Record(vec![AvroValue::Array(vec![
                AvroValue::Long(1),
                "oops".into(),
            ])]),
        )
        .unwrap_err();
        assert_eq!(
            err,
            EncodeError::Mismatch {
                path: "$.items[1]".to_string(),
                expected: "long".to_string(),
                found: "string".to_string(),
            }
        );
    }

    #[test]
    fn test_map_keeps_entry_order() {
        let json = encode(
            r#"{"type": "map", "values": "long"}"#,
            &AvroValue::Map(vec![
                ("b".to_string(), AvroValue::Long(1)),
                ("a".to_string(), AvroValue::Long(2)),
            ]),
        )
        .unwrap();
        assert_eq!(json, r#"{"b":1,"a":2}"#);
    }
}
