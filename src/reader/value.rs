//! Decoded value tree.

/// Represents a decoded Avro value.
///
/// Values carry no schema pointer; the JSON encoder and the binary writer
/// always receive the schema node a value was decoded against. Ints and
/// longs share [`AvroValue::Long`], floats and doubles share
/// [`AvroValue::Double`], and fixed values are [`AvroValue::Bytes`] of the
/// declared size.
#[derive(Debug, Clone, PartialEq)]
pub enum AvroValue {
    /// Null value
    Null,
    /// Boolean value
    Boolean(bool),
    /// Int or long
    Long(i64),
    /// Float (widened) or double
    Double(f64),
    /// Bytes or fixed
    Bytes(Vec<u8>),
    /// UTF-8 string
    String(String),
    /// Enum variant (index and symbol name)
    Enum(usize, String),
    /// Array of values
    Array(Vec<AvroValue>),
    /// Map entries in encoded order
    Map(Vec<(String, AvroValue)>),
    /// Record field values, aligned with the schema's field order
    Record(Vec<AvroValue>),
    /// Union variant (branch index and value)
    Union(usize, Box<AvroValue>),
}

impl AvroValue {
    /// Short name of the variant, for mismatch messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            AvroValue::Null => "null",
            AvroValue::Boolean(_) => "boolean",
            AvroValue::Long(_) => "long",
            AvroValue::Double(_) => "double",
            AvroValue::Bytes(_) => "bytes",
            AvroValue::String(_) => "string",
            AvroValue::Enum(..) => "enum",
            AvroValue::Array(_) => "array",
            AvroValue::Map(_) => "map",
            AvroValue::Record(_) => "record",
            AvroValue::Union(..) => "union",
        }
    }

    /// Wrap `value` as union branch `index`.
    pub fn union(index: usize, value: AvroValue) -> Self {
        AvroValue::Union(index, Box::new(value))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, AvroValue::Null)
    }
}

impl From<bool> for AvroValue {
    fn from(value: bool) -> Self {
        AvroValue::Boolean(value)
    }
}

impl From<i32> for AvroValue {
    fn from(value: i32) -> Self {
        AvroValue::Long(value.into())
    }
}

impl From<i64> for AvroValue {
    fn from(value: i64) -> Self {
        AvroValue::Long(value)
    }
}

impl From<f64> for AvroValue {
    fn from(value: f64) -> Self {
        AvroValue::Double(value)
    }
}

impl From<&str> for AvroValue {
    fn from(value: &str) -> Self {
        AvroValue::String(value.to_string())
    }
}

impl From<String> for AvroValue {
    fn from(value: String) -> Self {
        AvroValue::String(value)
    }
}

impl From<Vec<u8>> for AvroValue {
    fn from(value: Vec<u8>) -> Self {
        AvroValue::Bytes(value)
    }
}
