//! Schema inference from example documents
//!
//! [`SchemaInferenceVisitor`] turns one document into a schema. Batch
//! inference infers each example on its own and folds the results together
//! with [`merge`](super::merge::merge), reading the input lazily.

use std::collections::HashMap;
use std::io::Read;

use indexmap::IndexMap;
use tracing::debug;

use super::merge::{merge, merge_or_union};
use super::{is_valid_field_name, is_valid_name, Field, Schema};
use crate::error::{Error, Result};
use crate::node::{parse_stream, Node, Number};
use crate::types::InferenceConfig;
use crate::walk::{visit, PathContext, TreeVisitor};

/// Builds a schema for each node of a document
#[derive(Debug, Clone)]
pub struct SchemaInferenceVisitor {
    root_name: String,
    objects_as_records: bool,
}

impl SchemaInferenceVisitor {
    pub fn new(root_name: impl Into<String>) -> Self {
        SchemaInferenceVisitor {
            root_name: root_name.into(),
            objects_as_records: true,
        }
    }

    /// Nested objects become maps; the root object stays a record
    pub fn use_maps(mut self) -> Self {
        self.objects_as_records = false;
        self
    }

    pub fn from_config(config: &InferenceConfig) -> Self {
        SchemaInferenceVisitor {
            root_name: config.root_name.clone(),
            objects_as_records: config.objects_as_records,
        }
    }
}

impl TreeVisitor for SchemaInferenceVisitor {
    type Output = Schema;
    type Error = Error;

    fn object(
        &mut self,
        path: &PathContext,
        _object: &IndexMap<String, Node>,
        fields: IndexMap<String, Schema>,
    ) -> Result<Schema> {
        if self.objects_as_records || path.is_root() {
            let name = path.qualified_name(&self.root_name);
            if let Some(key) = fields.keys().find(|key| !is_valid_field_name(key)) {
                return Err(Error::UnsupportedConstruct(format!(
                    "key {key:?} in {name} is not a valid field name"
                )));
            }
            if !is_valid_name(&name) {
                return Err(Error::UnsupportedConstruct(format!(
                    "{name:?} is not a valid record name"
                )));
            }
            let fields = fields
                .into_iter()
                .map(|(name, schema)| Field::new(name, schema))
                .collect();
            return Ok(Schema::record(name, fields));
        }

        let values = merge_or_union(fields.into_values()).unwrap_or(Schema::Null);
        Ok(Schema::map(values))
    }

    fn array(&mut self, _path: &PathContext, _array: &[Node], elements: Vec<Schema>) -> Result<Schema> {
        let items = merge_or_union(elements).unwrap_or(Schema::Null);
        Ok(Schema::array(items))
    }

    fn text(&mut self, _path: &PathContext, _text: &str) -> Result<Schema> {
        Ok(Schema::String)
    }

    fn number(&mut self, path: &PathContext, number: &Number) -> Result<Schema> {
        match number {
            Number::Int(_) => Ok(Schema::Int),
            Number::Long(_) => Ok(Schema::Long),
            Number::Float(_) => Ok(Schema::Float),
            Number::Double(_) => Ok(Schema::Double),
            Number::BigInteger(digits) => Err(Error::UnsupportedConstruct(format!(
                "integer {digits} at {} does not fit in 64 bits",
                path.qualified_name(&self.root_name)
            ))),
        }
    }

    fn bool(&mut self, _path: &PathContext, _value: bool) -> Result<Schema> {
        Ok(Schema::Boolean)
    }

    fn binary(&mut self, _path: &PathContext, _bytes: &[u8]) -> Result<Schema> {
        Ok(Schema::Bytes)
    }

    fn null_node(&mut self, _path: &PathContext) -> Result<Schema> {
        Ok(Schema::Null)
    }

    fn missing(&mut self, path: &PathContext) -> Result<Schema> {
        Err(Error::MalformedInput(format!(
            "missing node at {} cannot be inferred",
            path.qualified_name(&self.root_name)
        )))
    }
}

/// Infer a schema where every object is a record
pub fn infer_schema(node: &Node, name: &str) -> Result<Schema> {
    visit(node, &mut SchemaInferenceVisitor::new(name)).map(unique_names)
}

/// Infer a schema where objects below the root are maps
pub fn infer_schema_with_maps(node: &Node, name: &str) -> Result<Schema> {
    visit(node, &mut SchemaInferenceVisitor::new(name).use_maps()).map(unique_names)
}

pub fn infer_schema_with_config(node: &Node, config: &InferenceConfig) -> Result<Schema> {
    visit(node, &mut SchemaInferenceVisitor::from_config(config)).map(unique_names)
}

/// Rename types that share a name but differ in shape
///
/// Records found at one path as an object and as array elements get the
/// same name. The first shape keeps it, later shapes become `name_2`,
/// `name_3` and so on, so the schema survives a trip through Avro JSON.
fn unique_names(schema: Schema) -> Schema {
    let mut defined = HashMap::new();
    rename(schema, &mut defined)
}

fn rename(schema: Schema, defined: &mut HashMap<String, Schema>) -> Schema {
    match schema {
        Schema::Record(mut record) => {
            record.fields = record
                .fields
                .into_iter()
                .map(|mut field| {
                    field.schema = rename(field.schema, defined);
                    field
                })
                .collect();
            let base = std::mem::take(&mut record.name);
            let mut suffix = 1;
            loop {
                record.name = match suffix {
                    1 => base.clone(),
                    n => format!("{base}_{n}"),
                };
                let candidate = Schema::Record(record.clone());
                match defined.get(&record.name) {
                    Some(existing) if *existing == candidate => return candidate,
                    Some(_) => suffix += 1,
                    None => {
                        defined.insert(record.name.clone(), candidate.clone());
                        return candidate;
                    }
                }
            }
        }
        Schema::Map(values) => Schema::map(rename(*values, defined)),
        Schema::Array(items) => Schema::array(rename(*items, defined)),
        Schema::Union(members) => Schema::Union(members.into_iter().map(|m| rename(m, defined)).collect()),
        other => other,
    }
}

/// Infer one schema from a sequence of example documents
///
/// At most `config.num_records` documents are pulled from `documents`.
/// Returns `Ok(None)` when the sequence is empty.
pub fn infer_schema_from_iter<I>(documents: I, config: &InferenceConfig) -> Result<Option<Schema>>
where
    I: IntoIterator<Item = Result<Node>>,
{
    let limit = config.num_records.max(1);
    let mut result: Option<Schema> = None;
    let mut count = 0usize;

    for document in documents.into_iter().take(limit) {
        // names are made unique once, after every example is merged
        let schema = visit(&document?, &mut SchemaInferenceVisitor::from_config(config))?;
        result = Some(match result {
            None => schema,
            Some(acc) => merge(&acc, &schema),
        });
        count += 1;
    }

    if count == limit {
        debug!(limit, "stopped reading examples at the record limit");
    }
    debug!(documents = count, root = %config.root_name, "inferred schema from examples");

    Ok(result.map(unique_names))
}

/// Infer one schema from a stream of JSON documents
pub fn infer_schema_from_reader<R: Read>(reader: R, config: &InferenceConfig) -> Result<Option<Schema>> {
    infer_schema_from_iter(parse_stream(reader), config)
}
