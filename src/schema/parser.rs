//! JSON schema parser for Avro schemas.
//!
//! Parses Avro schema JSON into a [`Schema`] arena, resolving named type
//! references (including self-references and references to types declared
//! later in the text) and enforcing the structural rules of the format.

use std::collections::{HashMap, HashSet};

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::SchemaError;
use crate::schema::{
    EnumSchema, FieldSchema, FixedSchema, NamedRef, NodeId, RecordSchema, Schema, SchemaNode,
};

/// Parse an Avro schema from a JSON string.
///
/// # Example
/// ```
/// use avro_json_udf::schema::{parse_schema, SchemaNode};
///
/// let schema = parse_schema(r#""string""#).unwrap();
/// assert_eq!(schema.root_node(), &SchemaNode::String);
/// ```
pub fn parse_schema(json: &str) -> Result<Schema, SchemaError> {
    parse_schema_with_options(json, false)
}

/// Parse an Avro schema from a JSON string with validation options.
///
/// With `strict` set, names that break the Avro naming rules
/// (`[A-Za-z_][A-Za-z0-9_]*` per dotted segment) fail the parse. Otherwise
/// they are logged and accepted, which keeps schemas from lenient producers
/// usable. Structural rules (unique field names, union shape, fixed size,
/// reference resolution) are enforced in both modes.
pub fn parse_schema_with_options(json: &str, strict: bool) -> Result<Schema, SchemaError> {
    let value: Value = serde_json::from_str(json).map_err(|e| SchemaError::MalformedText {
        path: ROOT_PATH.to_string(),
        message: format!("Invalid JSON: {}", e),
    })?;

    SchemaParser::new().with_strict(strict).parse(&value)
}

const ROOT_PATH: &str = "$";

/// A reference whose target is looked up once every declaration is known.
#[derive(Debug)]
struct PendingRef {
    node: NodeId,
    /// Name qualified with the enclosing namespace.
    qualified: String,
    /// The bare name, tried when the qualified one is not declared.
    fallback: Option<String>,
    path: String,
}

/// Schema parser with named type resolution context.
///
/// A parser builds exactly one schema; [`SchemaParser::parse`] consumes it.
#[derive(Debug, Default)]
pub struct SchemaParser {
    nodes: Vec<SchemaNode>,
    /// Registry of named types by their fully qualified name
    names: HashMap<String, NodeId>,
    /// Current namespace for resolving unqualified names
    current_namespace: Option<String>,
    pending_refs: Vec<PendingRef>,
    unions: Vec<(NodeId, String)>,
    path: Vec<String>,
    strict_schema: bool,
}

/// Name, namespace and full name of a record, enum or fixed declaration.
struct Declaration {
    name: String,
    namespace: Option<String>,
    fullname: String,
}

impl SchemaParser {
    /// Create a new SchemaParser with default settings (permissive mode).
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new SchemaParser with strict name validation enabled.
    pub fn new_strict() -> Self {
        Self::new().with_strict(true)
    }

    /// Set whether to use strict schema validation.
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict_schema = strict;
        self
    }

    /// Parse a JSON value into a Schema.
    pub fn parse(mut self, value: &Value) -> Result<Schema, SchemaError> {
        let root = self.parse_node(value)?;
        self.finish(root)
    }

    fn parse_node(&mut self, value: &Value) -> Result<NodeId, SchemaError> {
        match value {
            Value::String(s) => self.parse_type_name(s),
            Value::Object(obj) => self.parse_object_schema(obj),
            Value::Array(arr) => self.parse_union_schema(arr),
            other => Err(self.malformed(format!(
                "Expected type name, object, or union array, found: {}",
                other
            ))),
        }
    }

    /// Parse a primitive type or named type reference from a string.
    fn parse_type_name(&mut self, name: &str) -> Result<NodeId, SchemaError> {
        match SchemaNode::primitive(name) {
            Some(node) => Ok(self.push(node)),
            None => Ok(self.reference(name)),
        }
    }

    /// Parse a complex type from a JSON object.
    fn parse_object_schema(&mut self, obj: &Map<String, Value>) -> Result<NodeId, SchemaError> {
        let type_value = obj.get("type").ok_or_else(|| self.missing("type"))?;

        let type_str = match type_value {
            Value::String(s) => s.as_str(),
            // {"type": {...}} and {"type": [...]} wrap a complete schema
            Value::Object(_) | Value::Array(_) => return self.parse_node(type_value),
            other => {
                return Err(self.malformed(format!("'type' must be a string, found: {}", other)))
            }
        };

        match type_str {
            "record" | "error" => self.parse_record_schema(obj),
            "enum" => self.parse_enum_schema(obj),
            "array" => self.parse_array_schema(obj),
            "map" => self.parse_map_schema(obj),
            "fixed" => self.parse_fixed_schema(obj),
            other => match SchemaNode::primitive(other) {
                Some(node) => {
                    // Logical types encode as their base type in JSON
                    if let Some(logical) = obj.get("logicalType") {
                        debug!(
                            logical_type = %logical,
                            base = other,
                            path = %self.path_string(),
                            "decoding logical type as its base type"
                        );
                    }
                    Ok(self.push(node))
                }
                None => Ok(self.reference(other)),
            },
        }
    }

    /// Parse a union schema from a JSON array.
    fn parse_union_schema(&mut self, arr: &[Value]) -> Result<NodeId, SchemaError> {
        if arr.is_empty() {
            return Err(SchemaError::InvalidUnion {
                path: self.path_string(),
                message: "Union schema cannot be empty".to_string(),
            });
        }

        let mut branches = Vec::with_capacity(arr.len());
        for (i, branch) in arr.iter().enumerate() {
            self.path.push(format!("[{}]", i));
            if branch.is_array() {
                let err = SchemaError::InvalidUnion {
                    path: self.path_string(),
                    message: format!(
                        "Union contains nested union at position {} (unions cannot be nested)",
                        i
                    ),
                };
                return Err(err);
            }
            let id = self.parse_node(branch)?;
            self.path.pop();
            branches.push(id);
        }

        let id = self.push(SchemaNode::Union(branches));
        // Branch types behind forward references are only known after
        // resolution, so duplicate checks run in finish().
        self.unions.push((id, self.path_string()));
        Ok(id)
    }

    /// Parse a record schema.
    fn parse_record_schema(&mut self, obj: &Map<String, Value>) -> Result<NodeId, SchemaError> {
        let decl = self.declare(obj, "Record")?;
        let doc = self.optional_str(obj, "doc")?;

        // Register the type before parsing fields (for recursive types).
        // The slot is overwritten once the fields are known.
        let id = self.push(SchemaNode::Null);
        self.names.insert(decl.fullname.clone(), id);

        let prev_namespace =
            std::mem::replace(&mut self.current_namespace, decl.namespace.clone());
        self.path.push(decl.fullname.clone());

        let fields = self.parse_fields(obj);

        self.path.pop();
        self.current_namespace = prev_namespace;

        self.nodes[id.0] = SchemaNode::Record(RecordSchema {
            name: decl.name,
            namespace: decl.namespace,
            fields: fields?,
            doc,
        });
        Ok(id)
    }

    fn parse_fields(&mut self, obj: &Map<String, Value>) -> Result<Vec<FieldSchema>, SchemaError> {
        let fields_value = obj
            .get("fields")
            .ok_or_else(|| self.missing("fields"))?
            .as_array()
            .ok_or_else(|| self.malformed("Record 'fields' must be an array"))?;

        let mut seen = HashSet::with_capacity(fields_value.len());
        let mut fields = Vec::with_capacity(fields_value.len());
        for value in fields_value {
            let field = self.parse_field_schema(value)?;
            if !seen.insert(field.name.clone()) {
                return Err(SchemaError::DuplicateName {
                    name: field.name,
                    path: self.path_string(),
                });
            }
            fields.push(field);
        }
        Ok(fields)
    }

    /// Parse a field schema within a record.
    fn parse_field_schema(&mut self, value: &Value) -> Result<FieldSchema, SchemaError> {
        let obj = value
            .as_object()
            .ok_or_else(|| self.malformed("Field must be an object"))?;

        let name = self.required_str(obj, "name")?;
        self.validate_name(&name, "Field")?;

        self.path.push(name.clone());
        let result = self.parse_field_body(obj, name);
        if result.is_ok() {
            self.path.pop();
        }
        result
    }

    fn parse_field_body(
        &mut self,
        obj: &Map<String, Value>,
        name: String,
    ) -> Result<FieldSchema, SchemaError> {
        let type_value = obj.get("type").ok_or_else(|| self.missing("type"))?;
        let schema = self.parse_node(type_value)?;
        let doc = self.optional_str(obj, "doc")?;

        Ok(FieldSchema {
            name,
            schema,
            default: obj.get("default").cloned(),
            doc,
        })
    }

    /// Parse an enum schema.
    fn parse_enum_schema(&mut self, obj: &Map<String, Value>) -> Result<NodeId, SchemaError> {
        let decl = self.declare(obj, "Enum")?;
        self.path.push(decl.fullname.clone());

        let symbol_values = obj
            .get("symbols")
            .ok_or_else(|| self.missing("symbols"))?
            .as_array()
            .ok_or_else(|| self.malformed("Enum 'symbols' must be an array"))?;

        if symbol_values.is_empty() {
            return Err(self.malformed("Enum must have at least one symbol"));
        }

        let mut symbols = Vec::with_capacity(symbol_values.len());
        for value in symbol_values {
            let symbol = value
                .as_str()
                .ok_or_else(|| self.malformed(format!("Enum symbol must be a string: {}", value)))?;
            if symbol.is_empty() {
                return Err(SchemaError::InvalidName {
                    name: String::new(),
                    path: self.path_string(),
                    message: "Enum symbol cannot be empty".to_string(),
                });
            }
            self.validate_name(symbol, "Enum symbol")?;
            if symbols.iter().any(|s| s == symbol) {
                return Err(SchemaError::DuplicateName {
                    name: symbol.to_string(),
                    path: self.path_string(),
                });
            }
            symbols.push(symbol.to_string());
        }

        let doc = self.optional_str(obj, "doc")?;
        self.path.pop();

        let id = self.push(SchemaNode::Enum(EnumSchema {
            name: decl.name,
            namespace: decl.namespace,
            symbols,
            doc,
        }));
        self.names.insert(decl.fullname, id);
        Ok(id)
    }

    /// Parse an array schema.
    fn parse_array_schema(&mut self, obj: &Map<String, Value>) -> Result<NodeId, SchemaError> {
        let items = obj.get("items").ok_or_else(|| self.missing("items"))?;

        self.path.push("items".to_string());
        let item_schema = self.parse_node(items)?;
        self.path.pop();

        Ok(self.push(SchemaNode::Array(item_schema)))
    }

    /// Parse a map schema.
    fn parse_map_schema(&mut self, obj: &Map<String, Value>) -> Result<NodeId, SchemaError> {
        let values = obj.get("values").ok_or_else(|| self.missing("values"))?;

        self.path.push("values".to_string());
        let value_schema = self.parse_node(values)?;
        self.path.pop();

        Ok(self.push(SchemaNode::Map(value_schema)))
    }

    /// Parse a fixed schema.
    fn parse_fixed_schema(&mut self, obj: &Map<String, Value>) -> Result<NodeId, SchemaError> {
        let decl = self.declare(obj, "Fixed")?;
        self.path.push(decl.fullname.clone());

        let size_value = obj.get("size").ok_or_else(|| self.missing("size"))?;
        let size = match size_value.as_u64() {
            Some(size) if size > 0 => usize::try_from(size).map_err(|_| SchemaError::InvalidSize {
                path: self.path_string(),
                message: format!("Fixed size {} is too large", size),
            })?,
            _ => {
                return Err(SchemaError::InvalidSize {
                    path: self.path_string(),
                    message: format!("Fixed size must be a positive integer, found: {}", size_value),
                })
            }
        };
        self.path.pop();

        let id = self.push(SchemaNode::Fixed(FixedSchema {
            name: decl.name,
            namespace: decl.namespace,
            size,
        }));
        self.names.insert(decl.fullname, id);
        Ok(id)
    }

    /// Work out the name, namespace and full name of a named declaration and
    /// check it is not already declared.
    fn declare(&self, obj: &Map<String, Value>, context: &str) -> Result<Declaration, SchemaError> {
        let raw_name = self.required_str(obj, "name")?;

        let (name, namespace) = match raw_name.rsplit_once('.') {
            // A leading dot names a type in the null namespace
            Some(("", local)) => (local.to_string(), None),
            // A dotted name is already a full name; any namespace attribute is ignored
            Some((ns, local)) => (local.to_string(), Some(ns.to_string())),
            None => {
                let namespace = match obj.get("namespace") {
                    Some(Value::String(ns)) if ns.is_empty() => None,
                    Some(Value::String(ns)) => Some(ns.clone()),
                    Some(Value::Null) | None => self.current_namespace.clone(),
                    Some(other) => {
                        return Err(
                            self.malformed(format!("'namespace' must be a string, found: {}", other))
                        )
                    }
                };
                (raw_name.clone(), namespace)
            }
        };

        if namespace.is_none() && SchemaNode::primitive(&name).is_some() {
            return Err(SchemaError::InvalidName {
                name,
                path: self.path_string(),
                message: format!("{} name cannot redefine a primitive type", context),
            });
        }

        self.validate_name(&name, context)?;
        if let Some(ns) = &namespace {
            for segment in ns.split('.') {
                self.validate_name(segment, "Namespace")?;
            }
        }

        let fullname = match &namespace {
            Some(ns) => format!("{}.{}", ns, name),
            None => name.clone(),
        };

        if self.names.contains_key(&fullname) {
            return Err(SchemaError::DuplicateName {
                name: fullname,
                path: self.path_string(),
            });
        }

        Ok(Declaration {
            name,
            namespace,
            fullname,
        })
    }

    /// Add a reference node for `name`; its target is resolved in finish().
    fn reference(&mut self, name: &str) -> NodeId {
        let (qualified, fallback) = match (&self.current_namespace, name.strip_prefix('.')) {
            (_, Some(bare)) => (bare.to_string(), None),
            (Some(ns), None) if !name.contains('.') => {
                (format!("{}.{}", ns, name), Some(name.to_string()))
            }
            _ => (name.to_string(), None),
        };

        let target = self.names.get(&qualified).copied().unwrap_or(NodeId(0));
        let node = self.push(SchemaNode::Named(NamedRef {
            fullname: qualified.clone(),
            target,
        }));
        self.pending_refs.push(PendingRef {
            node,
            qualified,
            fallback,
            path: self.path_string(),
        });
        node
    }

    /// Resolve references, check unions and assemble the schema.
    fn finish(mut self, root: NodeId) -> Result<Schema, SchemaError> {
        for pending in std::mem::take(&mut self.pending_refs) {
            let resolved = self
                .names
                .get(&pending.qualified)
                .map(|id| (pending.qualified.clone(), *id))
                .or_else(|| {
                    pending
                        .fallback
                        .as_ref()
                        .and_then(|bare| self.names.get(bare).map(|id| (bare.clone(), *id)))
                });

            let (fullname, target) = resolved.ok_or_else(|| SchemaError::UnresolvedReference {
                name: pending.fallback.clone().unwrap_or(pending.qualified.clone()),
                path: pending.path.clone(),
            })?;

            self.nodes[pending.node.0] = SchemaNode::Named(NamedRef { fullname, target });
        }

        for (union, path) in &self.unions {
            self.validate_union(*union, path)?;
        }

        let node_count = self.nodes.len();
        let named_count = self.names.len();
        let schema = Schema::from_parts(self.nodes, root, self.names)?;
        debug!(
            nodes = node_count,
            named_types = named_count,
            "parsed schema"
        );
        Ok(schema)
    }

    /// Validate union schema rules.
    ///
    /// Avro unions must:
    /// - Not contain duplicate types (so at most one null)
    /// - Not contain nested unions
    fn validate_union(&self, union: NodeId, path: &str) -> Result<(), SchemaError> {
        let SchemaNode::Union(branches) = &self.nodes[union.0] else {
            return Ok(());
        };

        let mut seen_types = HashSet::with_capacity(branches.len());
        for (i, branch) in branches.iter().enumerate() {
            let resolved = match &self.nodes[branch.0] {
                SchemaNode::Named(r) => &self.nodes[r.target.0],
                other => other,
            };
            let type_key = match resolved {
                SchemaNode::Union(_) => {
                    return Err(SchemaError::InvalidUnion {
                        path: path.to_string(),
                        message: format!(
                            "Union contains nested union at position {} (unions cannot be nested)",
                            i
                        ),
                    })
                }
                SchemaNode::Record(r) => r.fullname(),
                SchemaNode::Enum(e) => e.fullname(),
                SchemaNode::Fixed(f) => f.fullname(),
                other => other.kind_name().to_string(),
            };
            if !seen_types.insert(type_key.clone()) {
                return Err(SchemaError::InvalidUnion {
                    path: path.to_string(),
                    message: format!(
                        "Union contains duplicate type '{}' at position {}",
                        type_key, i
                    ),
                });
            }
        }
        Ok(())
    }

    /// Validate that a name follows Avro naming rules.
    ///
    /// Avro names must:
    /// - Start with [A-Za-z_]
    /// - Contain only [A-Za-z0-9_]
    fn validate_name(&self, name: &str, context: &str) -> Result<(), SchemaError> {
        let mut chars = name.chars();
        let problem = match chars.next() {
            None => Some(format!("{} name cannot be empty", context)),
            Some(first) if !first.is_ascii_alphabetic() && first != '_' => Some(format!(
                "{} name '{}' must start with a letter or underscore",
                context, name
            )),
            Some(_) => chars
                .find(|ch| !ch.is_ascii_alphanumeric() && *ch != '_')
                .map(|ch| {
                    format!(
                        "{} name '{}' contains invalid character '{}'",
                        context, name, ch
                    )
                }),
        };

        match problem {
            Some(message) if self.strict_schema => Err(SchemaError::InvalidName {
                name: name.to_string(),
                path: self.path_string(),
                message,
            }),
            Some(message) => {
                warn!(path = %self.path_string(), "{}", message);
                Ok(())
            }
            None => Ok(()),
        }
    }

    fn push(&mut self, node: SchemaNode) -> NodeId {
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }

    fn required_str(&self, obj: &Map<String, Value>, field: &str) -> Result<String, SchemaError> {
        match obj.get(field) {
            Some(Value::String(s)) => Ok(s.clone()),
            Some(other) => Err(self.malformed(format!("'{}' must be a string, found: {}", field, other))),
            None => Err(self.missing(field)),
        }
    }

    fn optional_str(
        &self,
        obj: &Map<String, Value>,
        field: &str,
    ) -> Result<Option<String>, SchemaError> {
        match obj.get(field) {
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(Value::Null) | None => Ok(None),
            Some(other) => Err(self.malformed(format!("'{}' must be a string, found: {}", field, other))),
        }
    }

    fn missing(&self, field: &str) -> SchemaError {
        SchemaError::MissingField {
            field: field.to_string(),
            path: self.path_string(),
        }
    }

    fn malformed(&self, message: impl Into<String>) -> SchemaError {
        SchemaError::MalformedText {
            path: self.path_string(),
            message: message.into(),
        }
    }

    fn path_string(&self) -> String {
        if self.path.is_empty() {
            ROOT_PATH.to_string()
        } else {
            format!("{}/{}", ROOT_PATH, self.path.join("/"))
        }
    }
}
