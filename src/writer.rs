//! Avro binary encoder.
//!
//! Writes a value tree back to the binary layout the decoder reads. Used to
//! build fixtures for tests and benchmarks; it is not on the decode path.

use crate::error::EncodeError;
use crate::path::{render_path, PathSegment};
use crate::reader::varint::write_zigzag;
use crate::reader::AvroValue;
use crate::schema::{NodeId, RecordSchema, Schema, SchemaNode};

/// How array and map blocks are framed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlockStyle {
    /// One block with a positive item count, then the zero terminator.
    #[default]
    Counted,
    /// One block with a negative item count and its byte size, then the
    /// zero terminator.
    Sized,
}

/// Encode a value of `schema`'s root type.
pub fn encode_value(value: &AvroValue, schema: &Schema) -> Result<Vec<u8>, EncodeError> {
    encode_node(value, schema, schema.root(), BlockStyle::Counted)
}

/// Encode a value of an arbitrary node with the given block framing.
pub fn encode_node(
    value: &AvroValue,
    schema: &Schema,
    node: NodeId,
    style: BlockStyle,
) -> Result<Vec<u8>, EncodeError> {
    let mut writer = Writer {
        schema,
        style,
        path: Vec::new(),
    };
    let mut out = Vec::new();
    writer.write(&mut out, value, node)?;
    Ok(out)
}

struct Writer<'p> {
    schema: &'p Schema,
    style: BlockStyle,
    path: Vec<PathSegment<'p>>,
}

impl<'p> Writer<'p> {
    fn write(
        &mut self,
        out: &mut Vec<u8>,
        value: &'p AvroValue,
        id: NodeId,
    ) -> Result<(), EncodeError> {
        let schema = self.schema;
        match (schema.resolved_node(id), value) {
            (SchemaNode::Array(items), AvroValue::Array(values)) => {
                self.write_array(out, *items, values)
            }
            (SchemaNode::Map(values), AvroValue::Map(entries)) => {
                self.write_map(out, *values, entries)
            }
            (SchemaNode::Record(record), AvroValue::Record(fields)) => {
                self.write_record(out, record, fields)
            }
            (SchemaNode::Union(branches), AvroValue::Union(index, inner)) => {
                let branch = *branches.get(*index).ok_or_else(|| {
                    self.mismatch(
                        &format!("branch index below {}", branches.len()),
                        format!("branch {}", index),
                    )
                })?;
                write_index(out, *index);
                self.write(out, inner, branch)
            }
            (node, value) => self.write_primitive(out, node, value),
        }
    }

    #[inline(never)]
    fn write_primitive(
        &self,
        out: &mut Vec<u8>,
        node: &SchemaNode,
        value: &AvroValue,
    ) -> Result<(), EncodeError> {
        match (node, value) {
            (SchemaNode::Null, AvroValue::Null) => {}
            (SchemaNode::Boolean, AvroValue::Boolean(b)) => out.push(u8::from(*b)),
            (SchemaNode::Int, AvroValue::Long(n)) => {
                if i32::try_from(*n).is_err() {
                    return Err(self.mismatch("int", format!("long {}", n)));
                }
                write_zigzag(out, *n);
            }
            (SchemaNode::Long, AvroValue::Long(n)) => write_zigzag(out, *n),
            (SchemaNode::Float, AvroValue::Double(f)) => {
                out.extend_from_slice(&(*f as f32).to_le_bytes())
            }
            (SchemaNode::Double, AvroValue::Double(f)) => out.extend_from_slice(&f.to_le_bytes()),
            (SchemaNode::Bytes, AvroValue::Bytes(bytes)) => write_bytes(out, bytes),
            (SchemaNode::String, AvroValue::String(s)) => write_bytes(out, s.as_bytes()),
            (SchemaNode::Fixed(fixed), AvroValue::Bytes(bytes)) => {
                if bytes.len() != fixed.size {
                    return Err(self.mismatch(
                        &format!("{} bytes", fixed.size),
                        format!("{} bytes", bytes.len()),
                    ));
                }
                out.extend_from_slice(bytes);
            }
            (SchemaNode::Enum(e), AvroValue::Enum(index, _)) => {
                if *index >= e.symbols.len() {
                    return Err(self.mismatch(
                        &format!("symbol index below {}", e.symbols.len()),
                        format!("index {}", index),
                    ));
                }
                write_index(out, *index);
            }
            (node, value) => return Err(self.mismatch(node.kind_name(), value.kind_name())),
        }
        Ok(())
    }

    #[inline(never)]
    fn write_array(
        &mut self,
        out: &mut Vec<u8>,
        items: NodeId,
        values: &'p [AvroValue],
    ) -> Result<(), EncodeError> {
        let mut block = Vec::new();
        for (i, item) in values.iter().enumerate() {
            self.path.push(PathSegment::Index(i));
            self.write(&mut block, item, items)?;
            self.path.pop();
        }
        self.write_block(out, values.len(), &block);
        Ok(())
    }

    #[inline(never)]
    fn write_map(
        &mut self,
        out: &mut Vec<u8>,
        values: NodeId,
        entries: &'p [(String, AvroValue)],
    ) -> Result<(), EncodeError> {
        let mut block = Vec::new();
        for (key, entry) in entries {
            write_bytes(&mut block, key.as_bytes());
            self.path.push(PathSegment::Key(key));
            self.write(&mut block, entry, values)?;
            self.path.pop();
        }
        self.write_block(out, entries.len(), &block);
        Ok(())
    }

    #[inline(never)]
    fn write_record(
        &mut self,
        out: &mut Vec<u8>,
        record: &'p RecordSchema,
        fields: &'p [AvroValue],
    ) -> Result<(), EncodeError> {
        if fields.len() != record.fields.len() {
            return Err(self.mismatch(
                &format!("{} fields of {}", record.fields.len(), record.fullname()),
                format!("{} fields", fields.len()),
            ));
        }
        for (field, field_value) in record.fields.iter().zip(fields) {
            self.path.push(PathSegment::Field(&field.name));
            self.write(out, field_value, field.schema)?;
            self.path.pop();
        }
        Ok(())
    }

    fn write_block(&self, out: &mut Vec<u8>, count: usize, items: &[u8]) {
        if count > 0 {
            let count = count as i64;
            match self.style {
                BlockStyle::Counted => write_zigzag(out, count),
                BlockStyle::Sized => {
                    write_zigzag(out, -count);
                    write_zigzag(out, items.len() as i64);
                }
            }
            out.extend_from_slice(items);
        }
        out.push(0);
    }

    fn mismatch(&self, expected: &str, found: impl Into<String>) -> EncodeError {
        EncodeError::Mismatch {
            path: render_path(&self.path),
            expected: expected.to_string(),
            found: found.into(),
        }
    }
}

fn write_bytes(out: &mut Vec<u8>, bytes: &[u8]) {
    write_zigzag(out, bytes.len() as i64);
    out.extend_from_slice(bytes);
}

fn write_index(out: &mut Vec<u8>, index: usize) {
    write_zigzag(out, index as i64);
}
