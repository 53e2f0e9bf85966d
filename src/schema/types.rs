//! Avro schema types and representations.
//!
//! A parsed schema is an arena of [`SchemaNode`]s addressed by [`NodeId`].
//! Named type references point at their target by index, so recursive
//! types (a record holding an array of itself) form a cyclic graph without
//! cyclic ownership.

use std::borrow::Cow;
use std::collections::{HashMap, HashSet};

use serde_json::{json, Map, Value};

use crate::error::SchemaError;

/// Index of a node inside a [`Schema`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    /// Position of the node in the schema arena.
    pub fn index(self) -> usize {
        self.0
    }
}

/// One Avro type.
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaNode {
    // Primitive types
    /// Null type - no value.
    Null,
    /// Boolean type.
    Boolean,
    /// 32-bit signed integer.
    Int,
    /// 64-bit signed integer.
    Long,
    /// 32-bit IEEE 754 floating-point.
    Float,
    /// 64-bit IEEE 754 floating-point.
    Double,
    /// Sequence of bytes.
    Bytes,
    /// Unicode string.
    String,

    // Complex types
    /// Record type with named fields.
    Record(RecordSchema),
    /// Enumeration type.
    Enum(EnumSchema),
    /// Array of items with a single schema.
    Array(NodeId),
    /// Map with string keys and values of a single schema.
    Map(NodeId),
    /// Union of multiple schemas.
    Union(Vec<NodeId>),
    /// Fixed-size byte array.
    Fixed(FixedSchema),

    /// Reference to a record, enum or fixed declared elsewhere in the schema.
    Named(NamedRef),
}

/// A resolved reference to a named type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedRef {
    /// Full name of the referenced type.
    pub fullname: String,
    /// The record, enum or fixed node the name resolves to.
    pub target: NodeId,
}

/// Schema for a record type.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordSchema {
    /// The name of the record.
    pub name: String,
    /// Optional namespace for the record.
    pub namespace: Option<String>,
    /// The fields of the record.
    pub fields: Vec<FieldSchema>,
    /// Optional documentation.
    pub doc: Option<String>,
}

impl RecordSchema {
    /// Get the fully qualified name.
    pub fn fullname(&self) -> String {
        fullname(&self.namespace, &self.name)
    }

    /// Position of a field by name.
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }
}

/// Schema for a field within a record.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSchema {
    /// The name of the field.
    pub name: String,
    /// The schema of the field's value.
    pub schema: NodeId,
    /// Optional default value. Binary data always carries every field, so
    /// the decoder never substitutes it.
    pub default: Option<Value>,
    /// Optional documentation.
    pub doc: Option<String>,
}

/// Schema for an enumeration type.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumSchema {
    /// The name of the enum.
    pub name: String,
    /// Optional namespace for the enum.
    pub namespace: Option<String>,
    /// The symbols (variants) of the enum.
    pub symbols: Vec<String>,
    /// Optional documentation.
    pub doc: Option<String>,
}

impl EnumSchema {
    /// Get the fully qualified name.
    pub fn fullname(&self) -> String {
        fullname(&self.namespace, &self.name)
    }

    /// Get the index of a symbol.
    pub fn symbol_index(&self, symbol: &str) -> Option<usize> {
        self.symbols.iter().position(|s| s == symbol)
    }
}

/// Schema for a fixed-size byte array.
#[derive(Debug, Clone, PartialEq)]
pub struct FixedSchema {
    /// The name of the fixed type.
    pub name: String,
    /// Optional namespace for the fixed type.
    pub namespace: Option<String>,
    /// The size in bytes.
    pub size: usize,
}

impl FixedSchema {
    /// Get the fully qualified name.
    pub fn fullname(&self) -> String {
        fullname(&self.namespace, &self.name)
    }
}

fn fullname(namespace: &Option<String>, name: &str) -> String {
    match namespace {
        Some(ns) => format!("{}.{}", ns, name),
        None => name.to_string(),
    }
}

impl SchemaNode {
    /// Check if this node is a primitive type.
    pub fn is_primitive(&self) -> bool {
        matches!(
            self,
            SchemaNode::Null
                | SchemaNode::Boolean
                | SchemaNode::Int
                | SchemaNode::Long
                | SchemaNode::Float
                | SchemaNode::Double
                | SchemaNode::Bytes
                | SchemaNode::String
        )
    }

    /// Check if this node declares a named type (record, enum, or fixed).
    pub fn is_named(&self) -> bool {
        matches!(
            self,
            SchemaNode::Record(_) | SchemaNode::Enum(_) | SchemaNode::Fixed(_)
        )
    }

    /// The Avro name of a primitive, or of a complex kind.
    pub fn kind_name(&self) -> &'static str {
        match self {
            SchemaNode::Null => "null",
            SchemaNode::Boolean => "boolean",
            SchemaNode::Int => "int",
            SchemaNode::Long => "long",
            SchemaNode::Float => "float",
            SchemaNode::Double => "double",
            SchemaNode::Bytes => "bytes",
            SchemaNode::String => "string",
            SchemaNode::Record(_) => "record",
            SchemaNode::Enum(_) => "enum",
            SchemaNode::Array(_) => "array",
            SchemaNode::Map(_) => "map",
            SchemaNode::Union(_) => "union",
            SchemaNode::Fixed(_) => "fixed",
            SchemaNode::Named(_) => "named",
        }
    }

    /// Parse a primitive type name.
    pub fn primitive(name: &str) -> Option<SchemaNode> {
        match name {
            "null" => Some(SchemaNode::Null),
            "boolean" => Some(SchemaNode::Boolean),
            "int" => Some(SchemaNode::Int),
            "long" => Some(SchemaNode::Long),
            "float" => Some(SchemaNode::Float),
            "double" => Some(SchemaNode::Double),
            "bytes" => Some(SchemaNode::Bytes),
            "string" => Some(SchemaNode::String),
            _ => None,
        }
    }
}

/// A parsed Avro schema.
///
/// Immutable once built; share it between threads behind an `Arc`.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    nodes: Vec<SchemaNode>,
    root: NodeId,
    names: HashMap<String, NodeId>,
    min_sizes: Vec<usize>,
}

impl Schema {
    /// Assemble a schema from a fully resolved arena.
    ///
    /// Computes per-node minimum encoded sizes, rejecting records that reach
    /// themselves through record fields alone.
    pub(crate) fn from_parts(
        nodes: Vec<SchemaNode>,
        root: NodeId,
        names: HashMap<String, NodeId>,
    ) -> Result<Self, SchemaError> {
        let min_sizes = MinSizes::compute(&nodes)?;
        Ok(Self {
            nodes,
            root,
            names,
            min_sizes,
        })
    }

    /// The top-level node.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// The node at `id`.
    ///
    /// # Panics
    /// If `id` was not produced by this schema.
    pub fn node(&self, id: NodeId) -> &SchemaNode {
        &self.nodes[id.0]
    }

    /// The node at `id`, if it belongs to this schema.
    pub fn get(&self, id: NodeId) -> Option<&SchemaNode> {
        self.nodes.get(id.0)
    }

    /// The top-level node.
    pub fn root_node(&self) -> &SchemaNode {
        self.node(self.root)
    }

    /// Follow a named reference to the node it stands for.
    pub fn resolve(&self, id: NodeId) -> NodeId {
        match &self.nodes[id.0] {
            SchemaNode::Named(r) => r.target,
            _ => id,
        }
    }

    /// The node at `id`, with named references followed.
    pub fn resolved_node(&self, id: NodeId) -> &SchemaNode {
        self.node(self.resolve(id))
    }

    /// Look up a named type by full name.
    pub fn lookup(&self, fullname: &str) -> Option<NodeId> {
        self.names.get(fullname).copied()
    }

    /// Full names of all declared named types.
    pub fn named_types(&self) -> impl Iterator<Item = (&str, NodeId)> {
        self.names.iter().map(|(name, id)| (name.as_str(), *id))
    }

    /// Number of nodes in the arena.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The name a union branch of this type is tagged with in JSON:
    /// the primitive name, `array`/`map`, or a named type's full name.
    pub fn type_name(&self, id: NodeId) -> Cow<'_, str> {
        match self.resolved_node(id) {
            SchemaNode::Record(r) => Cow::Owned(r.fullname()),
            SchemaNode::Enum(e) => Cow::Owned(e.fullname()),
            SchemaNode::Fixed(f) => Cow::Owned(f.fullname()),
            other => Cow::Borrowed(other.kind_name()),
        }
    }

    /// Fewest bytes any value of this node can encode to.
    pub fn min_encoded_size(&self, id: NodeId) -> usize {
        self.min_sizes[id.0]
    }

    /// Serialize the schema to a JSON string.
    ///
    /// Named types are written in full where they are first reached and by
    /// full name afterwards; the output parses back to an equivalent schema.
    pub fn to_json(&self) -> String {
        self.to_json_value().to_string()
    }

    /// Serialize the schema to a JSON Value.
    pub fn to_json_value(&self) -> Value {
        let mut emitted = HashSet::new();
        self.node_to_json(self.root, None, &mut emitted)
    }

    fn node_to_json(
        &self,
        id: NodeId,
        enclosing_ns: Option<&str>,
        emitted: &mut HashSet<NodeId>,
    ) -> Value {
        match self.node(id) {
            SchemaNode::Record(r) => {
                if !emitted.insert(id) {
                    return json!(r.fullname());
                }
                let mut obj = named_header("record", &r.name, &r.namespace, enclosing_ns);
                if let Some(doc) = &r.doc {
                    obj.insert("doc".to_string(), json!(doc));
                }
                let ns = r.namespace.as_deref();
                let fields: Vec<Value> = r
                    .fields
                    .iter()
                    .map(|f| {
                        let mut field = Map::new();
                        field.insert("name".to_string(), json!(&f.name));
                        field.insert("type".to_string(), self.node_to_json(f.schema, ns, emitted));
                        if let Some(default) = &f.default {
                            field.insert("default".to_string(), default.clone());
                        }
                        if let Some(doc) = &f.doc {
                            field.insert("doc".to_string(), json!(doc));
                        }
                        Value::Object(field)
                    })
                    .collect();
                obj.insert("fields".to_string(), Value::Array(fields));
                Value::Object(obj)
            }
            SchemaNode::Enum(e) => {
                if !emitted.insert(id) {
                    return json!(e.fullname());
                }
                let mut obj = named_header("enum", &e.name, &e.namespace, enclosing_ns);
                if let Some(doc) = &e.doc {
                    obj.insert("doc".to_string(), json!(doc));
                }
                obj.insert("symbols".to_string(), json!(&e.symbols));
                Value::Object(obj)
            }
            SchemaNode::Fixed(f) => {
                if !emitted.insert(id) {
                    return json!(f.fullname());
                }
                let mut obj = named_header("fixed", &f.name, &f.namespace, enclosing_ns);
                obj.insert("size".to_string(), json!(f.size));
                Value::Object(obj)
            }
            SchemaNode::Array(items) => json!({
                "type": "array",
                "items": self.node_to_json(*items, enclosing_ns, emitted),
            }),
            SchemaNode::Map(values) => json!({
                "type": "map",
                "values": self.node_to_json(*values, enclosing_ns, emitted),
            }),
            SchemaNode::Union(branches) => Value::Array(
                branches
                    .iter()
                    .map(|b| self.node_to_json(*b, enclosing_ns, emitted))
                    .collect(),
            ),
            SchemaNode::Named(r) => {
                // Forward references are written by name; the declaration
                // follows later in traversal order.
                json!(r.fullname)
            }
            primitive => json!(primitive.kind_name()),
        }
    }
}

fn named_header(
    kind: &str,
    name: &str,
    namespace: &Option<String>,
    enclosing_ns: Option<&str>,
) -> Map<String, Value> {
    let mut obj = Map::new();
    obj.insert("type".to_string(), json!(kind));
    obj.insert("name".to_string(), json!(name));
    if namespace.as_deref() != enclosing_ns {
        obj.insert(
            "namespace".to_string(),
            json!(namespace.as_deref().unwrap_or("")),
        );
    }
    obj
}

/// Minimum encoded size per node.
struct MinSizes<'a> {
    nodes: &'a [SchemaNode],
    sizes: Vec<Option<usize>>,
    visiting: Vec<bool>,
}

impl<'a> MinSizes<'a> {
    fn compute(nodes: &'a [SchemaNode]) -> Result<Vec<usize>, SchemaError> {
        let mut state = MinSizes {
            nodes,
            sizes: vec![None; nodes.len()],
            visiting: vec![false; nodes.len()],
        };
        for index in 0..nodes.len() {
            state.size_of(NodeId(index))?;
        }
        Ok(state.sizes.into_iter().map(|s| s.unwrap_or(0)).collect())
    }

    fn size_of(&mut self, id: NodeId) -> Result<usize, SchemaError> {
        if let Some(size) = self.sizes[id.0] {
            return Ok(size);
        }
        let size = match &self.nodes[id.0] {
            SchemaNode::Null => 0,
            SchemaNode::Float => 4,
            SchemaNode::Double => 8,
            SchemaNode::Fixed(f) => f.size,
            // Varint-prefixed kinds take at least one byte, and their
            // children are behind that prefix, so recursion stops here.
            SchemaNode::Boolean
            | SchemaNode::Int
            | SchemaNode::Long
            | SchemaNode::Bytes
            | SchemaNode::String
            | SchemaNode::Enum(_)
            | SchemaNode::Array(_)
            | SchemaNode::Map(_)
            | SchemaNode::Union(_) => 1,
            SchemaNode::Named(r) => self.size_of(r.target)?,
            SchemaNode::Record(record) => {
                if self.visiting[id.0] {
                    return Err(SchemaError::UnboundedRecursion {
                        name: record.fullname(),
                        path: record.fullname(),
                    });
                }
                self.visiting[id.0] = true;
                let mut total = 0usize;
                for field in &record.fields {
                    total = total.saturating_add(self.size_of(field.schema)?);
                }
                self.visiting[id.0] = false;
                total
            }
        };
        self.sizes[id.0] = Some(size);
        Ok(size)
    }
}
