//! Avro binary decoder for primitive and complex types.
//!
//! This module provides functions to decode Avro binary data into Rust values.
//! The decoder follows the Avro specification for binary encoding:
//! - Varints use zigzag encoding for signed integers
//! - Floats and doubles are little-endian IEEE 754
//! - Bytes and strings are length-prefixed
//! - Arrays and maps are sequences of counted blocks ending in a zero count
//!
//! Decoding never trusts a length or count from the input: lengths are
//! checked against the remaining bytes, and a block's item count is checked
//! against the fewest bytes its items could occupy before anything is
//! allocated.

use crate::error::{DecodeError, DecodeErrorKind};
use crate::path::{render_path, PathSegment};
use crate::reader::config::DecoderConfig;
use crate::reader::cursor::Cursor;
use crate::reader::value::AvroValue;
use crate::reader::varint::decode_zigzag;
use crate::schema::{NodeId, RecordSchema, Schema, SchemaNode};

// ============================================================================
// Primitive Type Decoders
// ============================================================================

/// Decode a null value (no-op, consumes no bytes).
#[inline]
pub fn decode_null(_cursor: &mut Cursor<'_>) -> Result<(), DecodeError> {
    Ok(())
}

/// Decode a boolean value.
///
/// Avro booleans are a single byte; any nonzero byte reads as true.
#[inline]
pub fn decode_boolean(cursor: &mut Cursor<'_>) -> Result<bool, DecodeError> {
    Ok(cursor.read_u8()? != 0)
}

/// Decode a 32-bit signed integer (zigzag varint encoded).
#[inline]
pub fn decode_int(cursor: &mut Cursor<'_>) -> Result<i32, DecodeError> {
    let start = cursor.position();
    let long = decode_long(cursor)?;
    i32::try_from(long).map_err(|_| {
        DecodeError::invalid(
            start,
            format!("Integer overflow: {} does not fit in i32", long),
        )
    })
}

/// Decode a 64-bit signed integer (zigzag varint encoded).
#[inline]
pub fn decode_long(cursor: &mut Cursor<'_>) -> Result<i64, DecodeError> {
    decode_zigzag(cursor)
}

/// Decode a 32-bit IEEE 754 floating-point number (little-endian).
#[inline]
pub fn decode_float(cursor: &mut Cursor<'_>) -> Result<f32, DecodeError> {
    Ok(f32::from_le_bytes(cursor.read_array()?))
}

/// Decode a 64-bit IEEE 754 floating-point number (little-endian).
#[inline]
pub fn decode_double(cursor: &mut Cursor<'_>) -> Result<f64, DecodeError> {
    Ok(f64::from_le_bytes(cursor.read_array()?))
}

/// Decode length-prefixed bytes without copying.
#[inline]
pub fn decode_bytes_ref<'a>(cursor: &mut Cursor<'a>) -> Result<&'a [u8], DecodeError> {
    let start = cursor.position();
    let len = decode_long(cursor)?;
    if len < 0 {
        return Err(DecodeError::invalid(
            start,
            format!("Negative bytes length: {}", len),
        ));
    }
    let len = usize::try_from(len)
        .map_err(|_| DecodeError::truncated(cursor.position(), usize::MAX, cursor.remaining()))?;
    cursor.read_slice(len)
}

/// Decode length-prefixed bytes.
#[inline]
pub fn decode_bytes(cursor: &mut Cursor<'_>) -> Result<Vec<u8>, DecodeError> {
    decode_bytes_ref(cursor).map(<[u8]>::to_vec)
}

/// Decode a UTF-8 string without copying.
#[inline]
pub fn decode_string_ref<'a>(cursor: &mut Cursor<'a>) -> Result<&'a str, DecodeError> {
    let start = cursor.position();
    let bytes = decode_bytes_ref(cursor)?;
    std::str::from_utf8(bytes)
        .map_err(|e| DecodeError::new(DecodeErrorKind::InvalidUtf8(e), start))
}

/// Decode a UTF-8 string (length-prefixed).
#[inline]
pub fn decode_string(cursor: &mut Cursor<'_>) -> Result<String, DecodeError> {
    decode_string_ref(cursor).map(str::to_string)
}

/// Decode `size` bytes of a fixed value without copying.
#[inline]
pub fn decode_fixed_ref<'a>(cursor: &mut Cursor<'a>, size: usize) -> Result<&'a [u8], DecodeError> {
    cursor.read_slice(size)
}

/// Decode an enum index, checking it against the symbol count.
#[inline]
pub fn decode_enum_index(cursor: &mut Cursor<'_>, num_symbols: usize) -> Result<usize, DecodeError> {
    decode_index(cursor, num_symbols, "Enum")
}

/// Decode a union branch index, checking it against the branch count.
#[inline]
pub fn decode_union_index(
    cursor: &mut Cursor<'_>,
    num_variants: usize,
) -> Result<usize, DecodeError> {
    decode_index(cursor, num_variants, "Union")
}

fn decode_index(cursor: &mut Cursor<'_>, len: usize, what: &str) -> Result<usize, DecodeError> {
    let start = cursor.position();
    let index = decode_long(cursor)?;
    match usize::try_from(index) {
        Ok(i) if i < len => Ok(i),
        _ => Err(DecodeError::invalid(
            start,
            format!("{} index {} out of range (0..{})", what, index, len),
        )),
    }
}

// ============================================================================
// Schema-driven decoding
// ============================================================================

/// Decode one value of `schema`'s root type from the start of `buffer`.
///
/// Returns the value and the number of bytes it occupied. Bytes after the
/// value are not inspected.
///
/// # Example
/// ```
/// use avro_json_udf::reader::{decode, AvroValue};
/// use avro_json_udf::schema::parse_schema;
///
/// let schema = parse_schema(r#"["null", "long"]"#).unwrap();
/// let (value, consumed) = decode(&[0x02, 0x02], &schema).unwrap();
/// assert_eq!(value, AvroValue::Union(1, Box::new(AvroValue::Long(1))));
/// assert_eq!(consumed, 2);
/// ```
pub fn decode(buffer: &[u8], schema: &Schema) -> Result<(AvroValue, usize), DecodeError> {
    decode_with_config(buffer, schema, &DecoderConfig::default())
}

/// Decode the root type with explicit limits.
pub fn decode_with_config(
    buffer: &[u8],
    schema: &Schema,
    config: &DecoderConfig,
) -> Result<(AvroValue, usize), DecodeError> {
    decode_node(buffer, schema, schema.root(), config)
}

/// Decode a value of an arbitrary node of `schema`.
pub fn decode_node(
    buffer: &[u8],
    schema: &Schema,
    node: NodeId,
    config: &DecoderConfig,
) -> Result<(AvroValue, usize), DecodeError> {
    let mut decoder = Decoder::new(buffer, schema, config);
    match decoder.decode_value(node) {
        Ok(value) => Ok((value, decoder.cursor.position())),
        Err(err) => Err(err.with_path(render_path(&decoder.path))),
    }
}

/// An array or map block header.
struct Block {
    count: usize,
    /// Offset of the first item and declared byte size, for negative counts
    sized: Option<(usize, usize)>,
}

/// Walks one buffer against one schema.
///
/// `path` holds the route to the value being decoded. Segments are pushed
/// before a child is decoded and popped once it succeeds, so after a
/// failure the stack names the failing value.
struct Decoder<'p> {
    schema: &'p Schema,
    config: &'p DecoderConfig,
    cursor: Cursor<'p>,
    path: Vec<PathSegment<'p>>,
    depth: usize,
    max_depth: usize,
    zero_width_items: usize,
}

impl<'p> Decoder<'p> {
    fn new(buffer: &'p [u8], schema: &'p Schema, config: &'p DecoderConfig) -> Self {
        Self {
            schema,
            config,
            cursor: Cursor::new(buffer),
            path: Vec::new(),
            depth: 0,
            max_depth: config.effective_max_depth(),
            zero_width_items: 0,
        }
    }

    // Every recursion step passes through this function and one of the
    // container methods below; their frames stay small so that `max_depth`
    // bounds stack use.
    fn decode_value(&mut self, id: NodeId) -> Result<AvroValue, DecodeError> {
        let schema = self.schema;
        match schema.resolved_node(id) {
            SchemaNode::Record(record) => self.decode_record(record),
            SchemaNode::Array(items) => self.decode_array(*items),
            SchemaNode::Map(values) => self.decode_map(*values),
            SchemaNode::Union(branches) => self.decode_union(branches),
            node => decode_primitive(&mut self.cursor, node),
        }
    }

    #[inline(never)]
    fn decode_record(&mut self, record: &'p RecordSchema) -> Result<AvroValue, DecodeError> {
        self.enter()?;
        let mut fields = Vec::with_capacity(record.fields.len());
        for field in &record.fields {
            self.path.push(PathSegment::Field(&field.name));
            fields.push(self.decode_value(field.schema)?);
            self.path.pop();
        }
        self.leave();
        Ok(AvroValue::Record(fields))
    }

    #[inline(never)]
    fn decode_union(&mut self, branches: &'p [NodeId]) -> Result<AvroValue, DecodeError> {
        self.enter()?;
        let index = decode_union_index(&mut self.cursor, branches.len())?;
        let value = self.decode_value(branches[index])?;
        self.leave();
        Ok(AvroValue::Union(index, Box::new(value)))
    }

    #[inline(never)]
    fn decode_array(&mut self, item: NodeId) -> Result<AvroValue, DecodeError> {
        self.enter()?;
        let item_min = self.schema.min_encoded_size(item);
        let mut items = Vec::new();

        while let Some(block) = self.next_block(item_min)? {
            items.reserve(block.count);
            for _ in 0..block.count {
                self.path.push(PathSegment::Index(items.len()));
                items.push(self.decode_value(item)?);
                self.path.pop();
            }
            self.finish_block(&block)?;
        }

        self.leave();
        Ok(AvroValue::Array(items))
    }

    #[inline(never)]
    fn decode_map(&mut self, values: NodeId) -> Result<AvroValue, DecodeError> {
        self.enter()?;
        // Every entry carries at least a one-byte key length
        let entry_min = 1 + self.schema.min_encoded_size(values);
        let mut entries = Vec::new();

        while let Some(block) = self.next_block(entry_min)? {
            entries.reserve(block.count);
            for _ in 0..block.count {
                let key = decode_string_ref(&mut self.cursor)?;
                self.path.push(PathSegment::Key(key));
                let value = self.decode_value(values)?;
                self.path.pop();
                entries.push((key.to_string(), value));
            }
            self.finish_block(&block)?;
        }

        self.leave();
        Ok(AvroValue::Map(entries))
    }

    /// Read a block header; `None` at the terminating zero count.
    fn next_block(&mut self, item_min: usize) -> Result<Option<Block>, DecodeError> {
        let start = self.cursor.position();
        let count = decode_long(&mut self.cursor)?;
        if count == 0 {
            return Ok(None);
        }

        let sized = if count < 0 {
            // Negative count means the block has a byte size prefix
            let size_offset = self.cursor.position();
            let size = decode_long(&mut self.cursor)?;
            if size < 0 {
                return Err(DecodeError::invalid(
                    size_offset,
                    format!("Negative block byte size: {}", size),
                ));
            }
            let available = self.cursor.remaining();
            let size = usize::try_from(size).unwrap_or(usize::MAX);
            if self.config.validate_block_sizes && size > available {
                return Err(DecodeError::truncated(
                    self.cursor.position(),
                    size,
                    available,
                ));
            }
            Some((self.cursor.position(), size))
        } else {
            None
        };

        let available = self.cursor.remaining();
        let count = usize::try_from(count.unsigned_abs()).unwrap_or(usize::MAX);

        if item_min > 0 {
            match count.checked_mul(item_min) {
                Some(needed) if needed <= available => {}
                needed => {
                    return Err(DecodeError::truncated(
                        start,
                        needed.unwrap_or(usize::MAX),
                        available,
                    ))
                }
            }
        } else {
            self.zero_width_items = self.zero_width_items.saturating_add(count);
            if self.zero_width_items > self.config.max_zero_width_items {
                return Err(DecodeError::new(
                    DecodeErrorKind::LimitExceeded {
                        limit: self.config.max_zero_width_items,
                    },
                    start,
                ));
            }
        }

        Ok(Some(Block { count, sized }))
    }

    fn finish_block(&self, block: &Block) -> Result<(), DecodeError> {
        if let (true, Some((start, size))) = (self.config.validate_block_sizes, block.sized) {
            let used = self.cursor.position() - start;
            if used != size {
                return Err(DecodeError::invalid(
                    start,
                    format!("Block declared {} bytes but its items used {}", size, used),
                ));
            }
        }
        Ok(())
    }

    fn enter(&mut self) -> Result<(), DecodeError> {
        if self.depth >= self.max_depth {
            return Err(DecodeError::new(
                DecodeErrorKind::DepthLimitExceeded {
                    limit: self.max_depth,
                },
                self.cursor.position(),
            ));
        }
        self.depth += 1;
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }
}

/// Decode a value of a node with no children.
#[inline(never)]
fn decode_primitive(cursor: &mut Cursor<'_>, node: &SchemaNode) -> Result<AvroValue, DecodeError> {
    let value = match node {
        SchemaNode::Null => AvroValue::Null,
        SchemaNode::Boolean => AvroValue::Boolean(decode_boolean(cursor)?),
        SchemaNode::Int => AvroValue::Long(decode_int(cursor)?.into()),
        SchemaNode::Long => AvroValue::Long(decode_long(cursor)?),
        SchemaNode::Float => AvroValue::Double(decode_float(cursor)?.into()),
        SchemaNode::Double => AvroValue::Double(decode_double(cursor)?),
        SchemaNode::Bytes => AvroValue::Bytes(decode_bytes(cursor)?),
        SchemaNode::String => AvroValue::String(decode_string(cursor)?),
        SchemaNode::Fixed(fixed) => {
            AvroValue::Bytes(decode_fixed_ref(cursor, fixed.size)?.to_vec())
        }
        SchemaNode::Enum(e) => {
            let index = decode_enum_index(cursor, e.symbols.len())?;
            AvroValue::Enum(index, e.symbols[index].clone())
        }
        SchemaNode::Named(_)
        | SchemaNode::Record(_)
        | SchemaNode::Array(_)
        | SchemaNode::Map(_)
        | SchemaNode::Union(_) => {
            return Err(DecodeError::invalid(
                cursor.position(),
                format!("{} is not a primitive type", node.kind_name()),
            ))
        }
    };
    Ok(value)
}
