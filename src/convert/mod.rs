//! Schema-directed conversion of documents
//!
//! [`coerce`] walks a document guided by a target schema and produces a
//! [`Datum`] shaped exactly like that schema. Kinds are never reinterpreted:
//! a numeric-looking string is still a string. The only value substituted
//! for data is a record field's declared default when the field is absent.

mod defaults;
pub mod union;
pub mod writer;

use indexmap::IndexMap;
use tracing::warn;

use crate::error::{Error, Result, ValidationError};
use crate::node::{Node, Number};
use crate::schema::{Field, Schema};
use crate::types::Datum;

pub use defaults::default_datum;
pub use writer::{DatasetWriter, JsonLinesWriter};

/// Convert `node` into a value conforming to `schema`
pub fn coerce(node: &Node, schema: &Schema) -> Result<Datum> {
    match schema {
        Schema::Record(record) => {
            if !matches!(node, Node::Object(_)) {
                return Err(mismatch("record", node));
            }
            let mut fields = IndexMap::with_capacity(record.fields.len());
            for field in &record.fields {
                let value = coerce_field(node.get(&field.name), field, &record.name)?;
                fields.insert(field.name.clone(), value);
            }
            Ok(Datum::Record {
                name: record.name.clone(),
                fields,
            })
        }
        Schema::Map(values) => {
            let Node::Object(entries) = node else {
                return Err(mismatch("map", node));
            };
            let mut out = IndexMap::with_capacity(entries.len());
            for (key, value) in entries {
                out.insert(key.clone(), coerce(value, values)?);
            }
            Ok(Datum::Map(out))
        }
        Schema::Array(items) => {
            let Node::Array(elements) = node else {
                return Err(mismatch("array", node));
            };
            elements
                .iter()
                .map(|element| coerce(element, items))
                .collect::<Result<Vec<_>>>()
                .map(Datum::Array)
        }
        Schema::Union(members) => coerce(node, union::resolve(node, members)?),
        Schema::Enum(e) => match node {
            Node::Text(symbol) if e.symbols.contains(symbol) => Ok(Datum::Enum {
                name: e.name.clone(),
                symbol: symbol.clone(),
            }),
            Node::Text(symbol) => Err(ValidationError::UnknownSymbol {
                name: e.name.clone(),
                symbol: symbol.clone(),
            }
            .into()),
            other => Err(mismatch("enum", other)),
        },
        Schema::Bytes => match node {
            Node::Binary(bytes) => Ok(Datum::Bytes(bytes.clone())),
            other => Err(mismatch("bytes", other)),
        },
        Schema::Fixed(fixed) => match node {
            Node::Binary(bytes) if bytes.len() > fixed.size => Err(ValidationError::FixedOverflow {
                name: fixed.name.clone(),
                size: fixed.size,
                actual: bytes.len(),
            }
            .into()),
            Node::Binary(bytes) => Ok(Datum::Fixed {
                name: fixed.name.clone(),
                bytes: bytes.clone(),
            }),
            other => Err(mismatch("fixed", other)),
        },
        scalar => coerce_scalar(node, scalar),
    }
}

/// An absent field takes its default, then null if the schema allows it
fn coerce_field(value: &Node, field: &Field, record: &str) -> Result<Datum> {
    if let Node::Missing = value {
        if let Some(default) = &field.default {
            return default_datum(default, &field.schema);
        }
        if field.schema.null_ok() {
            return Ok(Datum::Null);
        }
        return Err(ValidationError::MissingField {
            record: record.to_string(),
            field: field.name.clone(),
        }
        .into());
    }
    coerce(value, &field.schema)
}

fn coerce_scalar(node: &Node, schema: &Schema) -> Result<Datum> {
    if !union::scalar_compatible(node, schema) {
        return Err(mismatch(schema.kind().as_str(), node));
    }

    let datum = match (schema, node) {
        (Schema::Null, _) => Datum::Null,
        (Schema::Boolean, Node::Bool(b)) => Datum::Boolean(*b),
        (Schema::String, Node::Text(s)) => Datum::String(s.clone()),
        (Schema::Int, Node::Number(Number::Int(i))) => Datum::Int(*i),
        (Schema::Long, Node::Number(n)) => match n {
            Number::Int(i) => Datum::Long(i64::from(*i)),
            Number::Long(l) => Datum::Long(*l),
            _ => return Err(mismatch("long", node)),
        },
        (Schema::Float, Node::Number(n)) => match n {
            Number::Int(i) => Datum::Float(*i as f32),
            Number::Float(f) => Datum::Float(*f),
            _ => return Err(mismatch("float", node)),
        },
        (Schema::Double, Node::Number(n)) => match n {
            Number::Int(i) => Datum::Double(f64::from(*i)),
            Number::Long(l) => Datum::Double(*l as f64),
            Number::Float(f) => Datum::Double(f64::from(*f)),
            Number::Double(d) => Datum::Double(*d),
            Number::BigInteger(_) => return Err(mismatch("double", node)),
        },
        _ => {
            return Err(Error::UnsupportedConstruct(format!(
                "cannot convert {} to {schema}",
                node.kind()
            )))
        }
    };
    Ok(datum)
}

fn mismatch(expected: &str, node: &Node) -> Error {
    ValidationError::KindMismatch {
        expected: expected.to_string(),
        found: format!("{} {}", node.kind(), node),
    }
    .into()
}

/// A target schema bound for repeated conversion
#[derive(Debug, Clone)]
pub struct Coercer {
    schema: Schema,
}

impl Coercer {
    pub fn new(schema: Schema) -> Self {
        Coercer { schema }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn coerce(&self, node: &Node) -> Result<Datum> {
        coerce(node, &self.schema)
    }
}

/// Outcome of converting a stream of documents
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConvertStats {
    pub written: usize,
    pub skipped: usize,
}

/// Convert every document and hand the results to `writer`
///
/// With `skip_invalid`, documents that fail validation are logged and
/// counted instead of aborting the batch. Other errors always abort.
pub fn convert_stream<I, W>(
    documents: I,
    schema: &Schema,
    writer: &mut W,
    skip_invalid: bool,
) -> anyhow::Result<ConvertStats>
where
    I: IntoIterator<Item = Result<Node>>,
    W: DatasetWriter + ?Sized,
{
    use anyhow::Context;

    let coercer = Coercer::new(schema.clone());
    let mut stats = ConvertStats::default();

    for (index, document) in documents.into_iter().enumerate() {
        let node = document.with_context(|| format!("Failed to read record {index}"))?;
        match coercer.coerce(&node) {
            Ok(datum) => {
                writer.write(&datum)?;
                stats.written += 1;
            }
            Err(err) if skip_invalid && err.is_validation() => {
                warn!(record = index, error = %err, "skipping invalid record");
                stats.skipped += 1;
            }
            Err(err) => {
                return Err(anyhow::Error::new(err).context(format!("Failed to convert record {index}")))
            }
        }
    }

    writer.flush()?;
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::infer_schema;
    use serde_json::{json, Value};

    fn node(value: Value) -> Node {
        Node::from(value)
    }

    fn validation(result: Result<Datum>) -> ValidationError {
        match result {
            Err(Error::Validation(err)) => err,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_default_substitution() {
        let schema = Schema::record(
            "Counter",
            vec![Field::with_default("count", Schema::Long, json!(0))],
        );

        let absent = coerce(&node(json!({})), &schema).unwrap();
        assert_eq!(absent.get("count"), Some(&Datum::Long(0)));

        let present = coerce(&node(json!({"count": 5})), &schema).unwrap();
        assert_eq!(present.get("count"), Some(&Datum::Long(5)));
    }

    #[test]
    fn test_missing_required_field() {
        let schema = Schema::record("User", vec![Field::new("id", Schema::Long)]);
        assert_eq!(
            validation(coerce(&node(json!({"name": "x"})), &schema)),
            ValidationError::MissingField {
                record: "User".to_string(),
                field: "id".to_string(),
            }
        );
    }

    #[test]
    fn test_absent_nullable_field_is_null() {
        let schema = Schema::record(
            "User",
            vec![Field::new("email", Schema::nullable(Schema::String))],
        );
        let datum = coerce(&node(json!({})), &schema).unwrap();
        assert_eq!(datum.get("email"), Some(&Datum::Null));

        let datum = coerce(&node(json!({"email": "a@b.c"})), &schema).unwrap();
        assert_eq!(datum.get("email"), Some(&Datum::String("a@b.c".to_string())));
    }

    #[test]
    fn test_explicit_null_wins_over_default() {
        let schema = Schema::record(
            "R",
            vec![Field::with_default(
                "v",
                Schema::union(vec![Schema::Long, Schema::Null]),
                json!(3),
            )],
        );
        assert_eq!(coerce(&node(json!({"v": null})), &schema).unwrap().get("v"), Some(&Datum::Null));
        assert_eq!(coerce(&node(json!({})), &schema).unwrap().get("v"), Some(&Datum::Long(3)));
    }

    #[test]
    fn test_null_for_required_field_rejected() {
        let schema = Schema::record("R", vec![Field::new("v", Schema::Long)]);
        assert!(matches!(
            validation(coerce(&node(json!({"v": null})), &schema)),
            ValidationError::KindMismatch { .. }
        ));
    }

    #[test]
    fn test_record_output_follows_schema_order() {
        let schema = Schema::record(
            "R",
            vec![Field::new("b", Schema::Int), Field::new("a", Schema::String)],
        );
        let datum = coerce(&node(json!({"a": "x", "b": 1, "extra": true})), &schema).unwrap();
        let Datum::Record { fields, .. } = datum else {
            panic!("expected record");
        };
        let keys: Vec<&str> = fields.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["b", "a"]);
    }

    #[test]
    fn test_record_requires_object() {
        let schema = Schema::record("R", vec![]);
        assert_eq!(
            validation(coerce(&node(json!([1])), &schema)),
            ValidationError::KindMismatch {
                expected: "record".to_string(),
                found: "array [1]".to_string(),
            }
        );
    }

    #[test]
    fn test_map_preserves_order() {
        let datum = coerce(&node(json!({"z": 1, "a": 2})), &Schema::map(Schema::Long)).unwrap();
        let Datum::Map(entries) = datum else {
            panic!("expected map");
        };
        let entries: Vec<(&str, &Datum)> = entries.iter().map(|(k, v)| (k.as_str(), v)).collect();
        assert_eq!(entries, vec![("z", &Datum::Long(1)), ("a", &Datum::Long(2))]);
    }

    #[test]
    fn test_array_elements() {
        let datum = coerce(&node(json!([1, 2])), &Schema::array(Schema::Double)).unwrap();
        assert_eq!(datum, Datum::Array(vec![Datum::Double(1.0), Datum::Double(2.0)]));
        assert!(coerce(&node(json!({})), &Schema::array(Schema::Int)).is_err());
    }

    #[test]
    fn test_union_prefers_declared_order() {
        let record = Schema::record("R", vec![Field::new("a", Schema::Int)]);
        let schema = Schema::union(vec![record, Schema::String]);
        let datum = coerce(&node(json!({"a": 1})), &schema).unwrap();
        assert!(matches!(datum, Datum::Record { ref name, .. } if name == "R"));
        assert_eq!(coerce(&node(json!("s")), &schema).unwrap(), Datum::String("s".into()));
    }

    #[test]
    fn test_unresolved_union() {
        let schema = Schema::union(vec![Schema::Null, Schema::Int]);
        assert!(matches!(
            validation(coerce(&node(json!(true)), &schema)),
            ValidationError::UnresolvedUnion { .. }
        ));
    }

    #[test]
    fn test_numeric_coercions() {
        let int = node(json!(7));
        let long = node(json!(5_000_000_000i64));
        let double = node(json!(1.25));
        let float = Node::Number(Number::Float(0.5));

        assert_eq!(coerce(&int, &Schema::Int).unwrap(), Datum::Int(7));
        assert!(coerce(&long, &Schema::Int).is_err());
        assert_eq!(coerce(&int, &Schema::Long).unwrap(), Datum::Long(7));
        assert_eq!(coerce(&long, &Schema::Long).unwrap(), Datum::Long(5_000_000_000));
        assert!(coerce(&double, &Schema::Long).is_err());

        assert_eq!(coerce(&int, &Schema::Float).unwrap(), Datum::Float(7.0));
        assert_eq!(coerce(&float, &Schema::Float).unwrap(), Datum::Float(0.5));
        assert!(coerce(&long, &Schema::Float).is_err());
        assert!(coerce(&double, &Schema::Float).is_err());

        assert_eq!(coerce(&long, &Schema::Double).unwrap(), Datum::Double(5e9));
        assert_eq!(coerce(&float, &Schema::Double).unwrap(), Datum::Double(0.5));
        assert_eq!(coerce(&double, &Schema::Double).unwrap(), Datum::Double(1.25));

        let big = node(json!(u64::MAX));
        assert!(coerce(&big, &Schema::Double).is_err());
    }

    #[test]
    fn test_text_is_not_parsed_as_number() {
        assert_eq!(
            validation(coerce(&node(json!("42")), &Schema::Int)),
            ValidationError::KindMismatch {
                expected: "int".to_string(),
                found: "text \"42\"".to_string(),
            }
        );
    }

    #[test]
    fn test_boolean_string_null() {
        assert_eq!(coerce(&node(json!(true)), &Schema::Boolean).unwrap(), Datum::Boolean(true));
        assert!(coerce(&node(json!(1)), &Schema::Boolean).is_err());
        assert_eq!(coerce(&node(json!("s")), &Schema::String).unwrap(), Datum::String("s".into()));
        assert_eq!(coerce(&Node::Null, &Schema::Null).unwrap(), Datum::Null);
        assert!(coerce(&node(json!(0)), &Schema::Null).is_err());
    }

    #[test]
    fn test_enum() {
        let schema = Schema::enumeration("Color", vec!["RED", "GREEN"]);
        assert_eq!(
            coerce(&node(json!("GREEN")), &schema).unwrap(),
            Datum::Enum {
                name: "Color".to_string(),
                symbol: "GREEN".to_string(),
            }
        );
        assert_eq!(
            validation(coerce(&node(json!("BLUE")), &schema)),
            ValidationError::UnknownSymbol {
                name: "Color".to_string(),
                symbol: "BLUE".to_string(),
            }
        );
    }

    #[test]
    fn test_bytes_and_fixed() {
        assert_eq!(
            coerce(&Node::Binary(vec![1, 2]), &Schema::Bytes).unwrap(),
            Datum::Bytes(vec![1, 2])
        );
        assert!(coerce(&node(json!("AQI=")), &Schema::Bytes).is_err());

        let fixed = Schema::fixed("Digest", 4);
        assert_eq!(
            coerce(&Node::Binary(vec![1, 2, 3, 4]), &fixed).unwrap(),
            Datum::Fixed {
                name: "Digest".to_string(),
                bytes: vec![1, 2, 3, 4],
            }
        );
        assert_eq!(
            validation(coerce(&Node::Binary(vec![1, 2, 3, 4, 5]), &fixed)),
            ValidationError::FixedOverflow {
                name: "Digest".to_string(),
                size: 4,
                actual: 5,
            }
        );
    }

    #[test]
    fn test_round_trip_through_inferred_schema() {
        let value = json!({
            "id": 12,
            "name": "Alice",
            "score": 9.5,
            "active": true,
            "tags": ["a", "b"],
            "address": {"city": "Oslo", "zip": null},
            "history": [{"at": 1}, {"at": 5_000_000_000i64}]
        });
        let document = node(value.clone());
        let schema = infer_schema(&document, "Event").unwrap();
        let datum = coerce(&document, &schema).unwrap();

        assert_eq!(serde_json::to_value(&datum).unwrap(), value);
    }

    #[test]
    fn test_coercer_reuses_schema() {
        let coercer = Coercer::new(Schema::array(Schema::Long));
        assert_eq!(coercer.schema(), &Schema::array(Schema::Long));
        for n in 0..3 {
            assert_eq!(
                coercer.coerce(&node(json!([n]))).unwrap(),
                Datum::Array(vec![Datum::Long(n)])
            );
        }
    }

    #[derive(Default)]
    struct Collect {
        rows: Vec<Datum>,
        flushed: bool,
    }

    impl DatasetWriter for Collect {
        fn write(&mut self, datum: &Datum) -> anyhow::Result<()> {
            self.rows.push(datum.clone());
            Ok(())
        }

        fn flush(&mut self) -> anyhow::Result<()> {
            self.flushed = true;
            Ok(())
        }

        fn close(&mut self) -> anyhow::Result<()> {
            Ok(())
        }

        fn is_open(&self) -> bool {
            true
        }
    }

    #[test]
    fn test_convert_stream_skips_invalid() {
        let schema = Schema::record("R", vec![Field::new("id", Schema::Long)]);
        let documents = vec![json!({"id": 1}), json!({"id": "x"}), json!({"id": 3})]
            .into_iter()
            .map(|v| Ok::<_, Error>(Node::from(v)));

        let mut sink = Collect::default();
        let stats = convert_stream(documents, &schema, &mut sink, true).unwrap();

        assert_eq!(stats, ConvertStats { written: 2, skipped: 1 });
        assert_eq!(sink.rows.len(), 2);
        assert!(sink.flushed);
    }

    #[test]
    fn test_convert_stream_aborts_by_default() {
        let schema = Schema::record("R", vec![Field::new("id", Schema::Long)]);
        let documents = vec![json!({"id": "x"}), json!({"id": 3})]
            .into_iter()
            .map(|v| Ok::<_, Error>(Node::from(v)));

        let mut sink = Collect::default();
        let err = convert_stream(documents, &schema, &mut sink, false).unwrap_err();

        assert!(err.to_string().contains("record 0"));
        assert!(sink.rows.is_empty());
    }
}
