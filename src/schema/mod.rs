//! Structural schemas
//!
//! A closed model of the Avro type system: named records, enums and fixed
//! types, maps, arrays, unions and the scalar kinds. Schemas serialize to
//! (and parse from) the standard Avro JSON form so inferred schemas can be
//! stored as `.avsc` files.

pub mod inference;
pub mod merge;

use std::collections::{HashMap, HashSet};
use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Serialize, Serializer};
use serde_json::{json, Map, Value};

use crate::error::{Error, Result};

pub use inference::{
    infer_schema, infer_schema_from_iter, infer_schema_from_reader, infer_schema_with_config,
    infer_schema_with_maps, SchemaInferenceVisitor,
};
pub use merge::{merge, merge_or_union};

static NAME_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap());

/// A structural type
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Schema {
    #[default]
    Null,
    Boolean,
    Int,
    Long,
    Float,
    Double,
    String,
    Bytes,
    Record(RecordSchema),
    Enum(EnumSchema),
    Fixed(FixedSchema),
    Map(Box<Schema>),
    Array(Box<Schema>),
    Union(Vec<Schema>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordSchema {
    /// Full, dot-separated name
    pub name: String,
    pub fields: Vec<Field>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub schema: Schema,
    /// Avro JSON default; `Some(Value::Null)` is an explicit null default
    pub default: Option<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumSchema {
    pub name: String,
    pub symbols: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FixedSchema {
    pub name: String,
    pub size: usize,
}

/// Discriminant of a [`Schema`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchemaKind {
    Null,
    Boolean,
    Int,
    Long,
    Float,
    Double,
    String,
    Bytes,
    Record,
    Enum,
    Fixed,
    Map,
    Array,
    Union,
}

impl SchemaKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SchemaKind::Null => "null",
            SchemaKind::Boolean => "boolean",
            SchemaKind::Int => "int",
            SchemaKind::Long => "long",
            SchemaKind::Float => "float",
            SchemaKind::Double => "double",
            SchemaKind::String => "string",
            SchemaKind::Bytes => "bytes",
            SchemaKind::Record => "record",
            SchemaKind::Enum => "enum",
            SchemaKind::Fixed => "fixed",
            SchemaKind::Map => "map",
            SchemaKind::Array => "array",
            SchemaKind::Union => "union",
        }
    }

    fn primitive(name: &str) -> Option<Schema> {
        let schema = match name {
            "null" => Schema::Null,
            "boolean" => Schema::Boolean,
            "int" => Schema::Int,
            "long" => Schema::Long,
            "float" => Schema::Float,
            "double" => Schema::Double,
            "string" => Schema::String,
            "bytes" => Schema::Bytes,
            _ => return None,
        };
        Some(schema)
    }
}

impl fmt::Display for SchemaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Field {
    pub fn new(name: impl Into<String>, schema: Schema) -> Self {
        Field {
            name: name.into(),
            schema,
            default: None,
        }
    }

    pub fn with_default(name: impl Into<String>, schema: Schema, default: Value) -> Self {
        Field {
            name: name.into(),
            schema,
            default: Some(default),
        }
    }
}

impl Schema {
    pub fn record(name: impl Into<String>, fields: Vec<Field>) -> Self {
        Schema::Record(RecordSchema {
            name: name.into(),
            fields,
        })
    }

    pub fn map(values: Schema) -> Self {
        Schema::Map(Box::new(values))
    }

    pub fn array(items: Schema) -> Self {
        Schema::Array(Box::new(items))
    }

    pub fn union(members: Vec<Schema>) -> Self {
        Schema::Union(members)
    }

    pub fn enumeration<S: Into<String>>(name: impl Into<String>, symbols: Vec<S>) -> Self {
        Schema::Enum(EnumSchema {
            name: name.into(),
            symbols: symbols.into_iter().map(Into::into).collect(),
        })
    }

    pub fn fixed(name: impl Into<String>, size: usize) -> Self {
        Schema::Fixed(FixedSchema {
            name: name.into(),
            size,
        })
    }

    /// `UNION[NULL, schema]`, with NULL moved first if already present
    pub fn nullable(schema: Schema) -> Self {
        match schema {
            Schema::Null => Schema::Null,
            Schema::Union(members) => {
                let mut out = vec![Schema::Null];
                out.extend(members.into_iter().filter(|m| *m != Schema::Null));
                Schema::Union(out)
            }
            other => Schema::Union(vec![Schema::Null, other]),
        }
    }

    pub fn kind(&self) -> SchemaKind {
        match self {
            Schema::Null => SchemaKind::Null,
            Schema::Boolean => SchemaKind::Boolean,
            Schema::Int => SchemaKind::Int,
            Schema::Long => SchemaKind::Long,
            Schema::Float => SchemaKind::Float,
            Schema::Double => SchemaKind::Double,
            Schema::String => SchemaKind::String,
            Schema::Bytes => SchemaKind::Bytes,
            Schema::Record(_) => SchemaKind::Record,
            Schema::Enum(_) => SchemaKind::Enum,
            Schema::Fixed(_) => SchemaKind::Fixed,
            Schema::Map(_) => SchemaKind::Map,
            Schema::Array(_) => SchemaKind::Array,
            Schema::Union(_) => SchemaKind::Union,
        }
    }

    /// Full name of a record, enum or fixed type
    pub fn name(&self) -> Option<&str> {
        match self {
            Schema::Record(r) => Some(&r.name),
            Schema::Enum(e) => Some(&e.name),
            Schema::Fixed(f) => Some(&f.name),
            _ => None,
        }
    }

    /// Record fields in declared order; empty for other kinds
    pub fn fields(&self) -> &[Field] {
        match self {
            Schema::Record(r) => &r.fields,
            _ => &[],
        }
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields().iter().find(|f| f.name == name)
    }

    /// Union members in declared order; empty for other kinds
    pub fn members(&self) -> &[Schema] {
        match self {
            Schema::Union(members) => members,
            _ => &[],
        }
    }

    pub fn has_symbol(&self, symbol: &str) -> bool {
        matches!(self, Schema::Enum(e) if e.symbols.iter().any(|s| s == symbol))
    }

    /// True for NULL or a union with a NULL member
    pub fn null_ok(&self) -> bool {
        null_ok(self)
    }

    /// Parse Avro JSON schema text
    pub fn parse(text: &str) -> Result<Schema> {
        let value: Value = serde_json::from_str(text)?;
        Schema::from_json(&value)
    }

    /// Read an Avro JSON schema document
    pub fn from_json(value: &Value) -> Result<Schema> {
        SchemaParser::default().parse(value, "")
    }

    /// Avro JSON form; a named type is written in full once, then by name
    ///
    /// A name reused for a different shape is written in full again, which
    /// [`Schema::parse`] rejects. [`Schema::to_avro`] reports it instead.
    pub fn to_json(&self) -> Value {
        AvroWriter::default().write(self)
    }

    /// Avro JSON form, failing when one name stands for two different types
    pub fn to_avro(&self) -> Result<Value> {
        let mut writer = AvroWriter::default();
        let value = writer.write(self);
        match writer.conflicts.first() {
            Some(name) => Err(Error::InvalidSchema(format!(
                "Name {name} is used for two different types"
            ))),
            None => Ok(value),
        }
    }
}

#[derive(Default)]
struct AvroWriter {
    defined: HashMap<String, Schema>,
    conflicts: Vec<String>,
}

impl AvroWriter {
    /// True when `schema` must be written in full rather than by name
    fn first_use(&mut self, name: &str, schema: &Schema) -> bool {
        match self.defined.get(name) {
            None => {
                self.defined.insert(name.to_string(), schema.clone());
                true
            }
            Some(existing) if existing == schema => false,
            Some(_) => {
                self.conflicts.push(name.to_string());
                true
            }
        }
    }

    fn write(&mut self, schema: &Schema) -> Value {
        match schema {
            Schema::Record(record) => {
                if !self.first_use(&record.name, schema) {
                    return Value::String(record.name.clone());
                }
                let fields: Vec<Value> = record
                    .fields
                    .iter()
                    .map(|field| {
                        let mut obj = Map::new();
                        obj.insert("name".to_string(), Value::String(field.name.clone()));
                        obj.insert("type".to_string(), self.write(&field.schema));
                        if let Some(default) = &field.default {
                            obj.insert("default".to_string(), default.clone());
                        }
                        Value::Object(obj)
                    })
                    .collect();
                json!({ "type": "record", "name": record.name, "fields": fields })
            }
            Schema::Enum(e) => {
                if !self.first_use(&e.name, schema) {
                    return Value::String(e.name.clone());
                }
                json!({ "type": "enum", "name": e.name, "symbols": e.symbols })
            }
            Schema::Fixed(f) => {
                if !self.first_use(&f.name, schema) {
                    return Value::String(f.name.clone());
                }
                json!({ "type": "fixed", "name": f.name, "size": f.size })
            }
            Schema::Map(values) => json!({ "type": "map", "values": self.write(values) }),
            Schema::Array(items) => json!({ "type": "array", "items": self.write(items) }),
            Schema::Union(members) => Value::Array(members.iter().map(|m| self.write(m)).collect()),
            scalar => Value::String(scalar.kind().as_str().to_string()),
        }
    }
}

/// True for NULL or a union with a NULL member
pub fn null_ok(schema: &Schema) -> bool {
    match schema {
        Schema::Null => true,
        Schema::Union(members) => members.iter().any(|m| matches!(m, Schema::Null)),
        _ => false,
    }
}

/// Avro name rule applied to every dot-separated component
pub fn is_valid_name(name: &str) -> bool {
    !name.is_empty() && name.split('.').all(is_valid_field_name)
}

/// Avro name rule for a single, undotted name such as a record field
pub fn is_valid_field_name(name: &str) -> bool {
    NAME_REGEX.is_match(name)
}

/// Serializes through [`Schema::to_avro`], so conflicting names are an error
impl Serialize for Schema {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_avro()
            .map_err(serde::ser::Error::custom)?
            .serialize(serializer)
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_json())
    }
}

/// Resolves Avro JSON, remembering named types for later references
#[derive(Default)]
struct SchemaParser {
    named: HashMap<String, Schema>,
}

impl SchemaParser {
    fn parse(&mut self, value: &Value, namespace: &str) -> Result<Schema> {
        match value {
            Value::String(name) => self.resolve_name(name, namespace),
            Value::Array(members) => {
                let members = members
                    .iter()
                    .map(|m| self.parse(m, namespace))
                    .collect::<Result<Vec<_>>>()?;
                check_union(&members)?;
                Ok(Schema::Union(members))
            }
            Value::Object(obj) => self.parse_object(obj, namespace),
            other => Err(Error::InvalidSchema(format!("Not a schema: {other}"))),
        }
    }

    fn resolve_name(&self, name: &str, namespace: &str) -> Result<Schema> {
        if let Some(primitive) = SchemaKind::primitive(name) {
            return Ok(primitive);
        }
        let qualified = qualify(name, None, namespace);
        self.named
            .get(&qualified)
            .or_else(|| self.named.get(name))
            .cloned()
            .ok_or_else(|| Error::InvalidSchema(format!("Unknown type: {name}")))
    }

    fn parse_object(&mut self, obj: &Map<String, Value>, namespace: &str) -> Result<Schema> {
        let type_name = obj
            .get("type")
            .ok_or_else(|| Error::InvalidSchema(format!("Missing type in {}", Value::Object(obj.clone()))))?;

        let type_name = match type_name {
            Value::String(t) => t.as_str(),
            // {"type": {...}} or {"type": [...]} wraps another schema
            nested => return self.parse(nested, namespace),
        };

        match type_name {
            "record" | "error" => {
                let name = self.full_name(obj, namespace)?;
                let inner_ns = namespace_of(&name);
                let raw_fields = obj
                    .get("fields")
                    .and_then(Value::as_array)
                    .ok_or_else(|| Error::InvalidSchema(format!("Record {name} has no fields array")))?;

                let mut seen = HashSet::new();
                let mut fields = Vec::with_capacity(raw_fields.len());
                for raw in raw_fields {
                    let field_name = raw
                        .get("name")
                        .and_then(Value::as_str)
                        .ok_or_else(|| Error::InvalidSchema(format!("Field without name in {name}")))?;
                    if !is_valid_field_name(field_name) {
                        return Err(Error::InvalidSchema(format!("Invalid field name: {field_name}")));
                    }
                    if !seen.insert(field_name.to_string()) {
                        return Err(Error::InvalidSchema(format!("Duplicate field {field_name} in {name}")));
                    }
                    let field_type = raw
                        .get("type")
                        .ok_or_else(|| Error::InvalidSchema(format!("Field {field_name} has no type")))?;
                    fields.push(Field {
                        name: field_name.to_string(),
                        schema: self.parse(field_type, inner_ns)?,
                        default: raw.get("default").cloned(),
                    });
                }

                let schema = Schema::record(name.clone(), fields);
                self.define(name, &schema)?;
                Ok(schema)
            }
            "enum" => {
                let name = self.full_name(obj, namespace)?;
                let symbols: Vec<String> = obj
                    .get("symbols")
                    .and_then(Value::as_array)
                    .ok_or_else(|| Error::InvalidSchema(format!("Enum {name} has no symbols")))?
                    .iter()
                    .map(|s| {
                        s.as_str()
                            .filter(|s| NAME_REGEX.is_match(s))
                            .map(str::to_string)
                            .ok_or_else(|| Error::InvalidSchema(format!("Invalid symbol {s} in {name}")))
                    })
                    .collect::<Result<_>>()?;
                let unique: HashSet<&String> = symbols.iter().collect();
                if unique.len() != symbols.len() {
                    return Err(Error::InvalidSchema(format!("Duplicate symbol in enum {name}")));
                }
                let schema = Schema::enumeration(name.clone(), symbols);
                self.define(name, &schema)?;
                Ok(schema)
            }
            "fixed" => {
                let name = self.full_name(obj, namespace)?;
                let size = obj
                    .get("size")
                    .and_then(Value::as_u64)
                    .ok_or_else(|| Error::InvalidSchema(format!("Fixed {name} has no size")))?;
                let schema = Schema::fixed(name.clone(), size as usize);
                self.define(name, &schema)?;
                Ok(schema)
            }
            "array" => {
                let items = obj
                    .get("items")
                    .ok_or_else(|| Error::InvalidSchema("Array has no items".to_string()))?;
                Ok(Schema::array(self.parse(items, namespace)?))
            }
            "map" => {
                let values = obj
                    .get("values")
                    .ok_or_else(|| Error::InvalidSchema("Map has no values".to_string()))?;
                Ok(Schema::map(self.parse(values, namespace)?))
            }
            other => self.resolve_name(other, namespace),
        }
    }

    fn full_name(&self, obj: &Map<String, Value>, namespace: &str) -> Result<String> {
        let name = obj
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::InvalidSchema("Named type without name".to_string()))?;
        let explicit_ns = obj.get("namespace").and_then(Value::as_str);
        let full = qualify(name, explicit_ns, namespace);
        if !is_valid_name(&full) {
            return Err(Error::InvalidSchema(format!("Invalid name: {full}")));
        }
        Ok(full)
    }

    fn define(&mut self, name: String, schema: &Schema) -> Result<()> {
        if self.named.contains_key(&name) {
            return Err(Error::InvalidSchema(format!("Type {name} is defined twice")));
        }
        self.named.insert(name, schema.clone());
        Ok(())
    }
}

fn qualify(name: &str, explicit_ns: Option<&str>, enclosing_ns: &str) -> String {
    if name.contains('.') {
        return name.to_string();
    }
    match explicit_ns.unwrap_or(enclosing_ns) {
        "" => name.to_string(),
        ns => format!("{ns}.{name}"),
    }
}

fn namespace_of(full_name: &str) -> &str {
    full_name.rsplit_once('.').map(|(ns, _)| ns).unwrap_or("")
}

/// Unions may not nest or repeat an unnamed kind or a name
fn check_union(members: &[Schema]) -> Result<()> {
    let mut seen = HashSet::new();
    for member in members {
        if let Schema::Union(_) = member {
            return Err(Error::InvalidSchema(
                "Unions may not immediately contain unions".to_string(),
            ));
        }
        let key = member.name().unwrap_or(member.kind().as_str()).to_string();
        if !seen.insert(key.clone()) {
            return Err(Error::InvalidSchema(format!("Duplicate in union: {key}")));
        }
    }
    Ok(())
}
