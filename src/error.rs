//! Error types for schema parsing, decoding and JSON encoding

use std::str::Utf8Error;

use thiserror::Error;

/// Errors in the hex transport encoding of a payload
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    /// Hex text has an odd number of digits
    #[error("Hex payload has odd length {length}")]
    OddLength { length: usize },
    /// A character that is not a hex digit
    #[error("Invalid hex digit {character:?} at index {index}")]
    InvalidDigit { character: char, index: usize },
}

/// Errors that can occur while parsing a schema definition
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// A required attribute is absent (`name`, `fields`, `symbols`, `size`, ...)
    #[error("Missing field '{field}' at {path}")]
    MissingField { field: String, path: String },
    /// A name declared twice in the same scope
    #[error("Duplicate name '{name}' at {path}")]
    DuplicateName { name: String, path: String },
    /// A named type reference that no declaration satisfies
    #[error("Unresolved reference to '{name}' at {path}")]
    UnresolvedReference { name: String, path: String },
    /// Union rule violation (nested union, repeated branch type, empty union)
    #[error("Invalid union at {path}: {message}")]
    InvalidUnion { path: String, message: String },
    /// Non-positive or non-integral fixed size
    #[error("Invalid size at {path}: {message}")]
    InvalidSize { path: String, message: String },
    /// Schema text is not valid JSON, or an attribute has the wrong JSON shape
    #[error("Malformed schema at {path}: {message}")]
    MalformedText { path: String, message: String },
    /// Name that breaks Avro naming rules (strict mode) or shadows a primitive
    #[error("Invalid name '{name}' at {path}: {message}")]
    InvalidName {
        name: String,
        path: String,
        message: String,
    },
    /// A record that contains itself through required record fields only
    #[error("Record '{name}' contains itself without array, map or union indirection at {path}")]
    UnboundedRecursion { name: String, path: String },
}

/// Flat classification of [`SchemaError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaErrorKind {
    MissingField,
    DuplicateName,
    UnresolvedReference,
    InvalidUnion,
    InvalidSize,
    MalformedText,
    InvalidName,
    UnboundedRecursion,
}

impl SchemaError {
    /// The error's kind, without its context.
    pub fn kind(&self) -> SchemaErrorKind {
        match self {
            SchemaError::MissingField { .. } => SchemaErrorKind::MissingField,
            SchemaError::DuplicateName { .. } => SchemaErrorKind::DuplicateName,
            SchemaError::UnresolvedReference { .. } => SchemaErrorKind::UnresolvedReference,
            SchemaError::InvalidUnion { .. } => SchemaErrorKind::InvalidUnion,
            SchemaError::InvalidSize { .. } => SchemaErrorKind::InvalidSize,
            SchemaError::MalformedText { .. } => SchemaErrorKind::MalformedText,
            SchemaError::InvalidName { .. } => SchemaErrorKind::InvalidName,
            SchemaError::UnboundedRecursion { .. } => SchemaErrorKind::UnboundedRecursion,
        }
    }

    /// Schema path of the offending definition.
    pub fn path(&self) -> &str {
        match self {
            SchemaError::MissingField { path, .. }
            | SchemaError::DuplicateName { path, .. }
            | SchemaError::UnresolvedReference { path, .. }
            | SchemaError::InvalidUnion { path, .. }
            | SchemaError::InvalidSize { path, .. }
            | SchemaError::MalformedText { path, .. }
            | SchemaError::InvalidName { path, .. }
            | SchemaError::UnboundedRecursion { path, .. } => path,
        }
    }
}

/// What went wrong while decoding binary data
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeErrorKind {
    /// A read ran past the end of the buffer
    #[error("unexpected end of data: needed {needed} bytes, {available} available")]
    Truncated { needed: usize, available: usize },
    /// Bytes that cannot be a valid encoding for the schema
    #[error("invalid encoding: {0}")]
    InvalidEncoding(String),
    /// String bytes that are not UTF-8
    #[error("invalid UTF-8: {0}")]
    InvalidUtf8(#[source] Utf8Error),
    /// Nesting deeper than the configured limit
    #[error("nesting depth exceeds limit of {limit}")]
    DepthLimitExceeded { limit: usize },
    /// A collection larger than the configured limit
    #[error("collection exceeds limit of {limit} items")]
    LimitExceeded { limit: usize },
}

/// Error decoding a buffer against a schema.
///
/// `offset` is the byte position the failing read started at; `path` is the
/// value path at the failure point, rooted at `$`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} at offset {offset} ({path})")]
pub struct DecodeError {
    #[source]
    pub kind: DecodeErrorKind,
    pub offset: usize,
    pub path: String,
}

impl DecodeError {
    pub fn new(kind: DecodeErrorKind, offset: usize) -> Self {
        Self {
            kind,
            offset,
            path: "$".to_string(),
        }
    }

    pub fn truncated(offset: usize, needed: usize, available: usize) -> Self {
        Self::new(DecodeErrorKind::Truncated { needed, available }, offset)
    }

    pub fn invalid(offset: usize, detail: impl Into<String>) -> Self {
        Self::new(DecodeErrorKind::InvalidEncoding(detail.into()), offset)
    }

    /// Replace the value path.
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    pub fn is_truncated(&self) -> bool {
        matches!(self.kind, DecodeErrorKind::Truncated { .. })
    }
}

/// Errors turning a value tree into JSON (or back into binary)
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EncodeError {
    /// NaN or infinity, which JSON cannot represent
    #[error("Non-finite float {value} at {path}")]
    NonFiniteFloat { value: f64, path: String },
    /// The value does not have the shape its schema node prescribes
    #[error("Value mismatch at {path}: expected {expected}, found {found}")]
    Mismatch {
        path: String,
        expected: String,
        found: String,
    },
    /// A string that breaks the byte-preserving convention
    #[error("Invalid byte string: character {character:?} at index {index} is above U+00FF")]
    InvalidByteString { character: char, index: usize },
    /// JSON serialization failure
    #[error("JSON serialization failed: {0}")]
    Json(String),
}

impl From<serde_json::Error> for EncodeError {
    fn from(err: serde_json::Error) -> Self {
        EncodeError::Json(err.to_string())
    }
}

/// Invalid configuration value
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Invalid value {value:?} for {key}: {message}")]
    InvalidValue {
        key: String,
        value: String,
        message: String,
    },
}

/// Top-level error for one invocation
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed transport encoding
    #[error("Input error: {0}")]
    Input(#[from] InputError),

    /// Malformed or inconsistent schema
    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    /// Buffer does not match the schema's layout
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Value tree cannot be represented as JSON
    #[error("Encode error: {0}")]
    Encode(#[from] EncodeError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Bytes left over after a single-record payload
    #[error("Framing error: {trailing} trailing bytes after offset {consumed}")]
    TrailingBytes { consumed: usize, trailing: usize },
}
