//! Schema merging
//!
//! `merge(a, b)` returns a schema that accepts everything `a` and `b`
//! accept:
//! - equal schemas are returned unchanged
//! - numbers widen along int < long < float < double
//! - records and enums with the same name merge structurally; a record field
//!   seen on one side only becomes nullable with a null default
//! - arrays and maps merge their element and value schemas
//! - NULL with anything gives `UNION[NULL, other]`
//! - any other pair becomes a union, first-seen member first

use serde_json::Value;

use super::{null_ok, EnumSchema, Field, RecordSchema, Schema};

/// Merge two schemas, falling back to a union
pub fn merge(left: &Schema, right: &Schema) -> Schema {
    merge_only(left, right).unwrap_or_else(|| union(left, right))
}

/// Fold `merge` over all schemas, left to right; `None` if there are none
pub fn merge_or_union<I>(schemas: I) -> Option<Schema>
where
    I: IntoIterator<Item = Schema>,
{
    let mut iter = schemas.into_iter();
    let first = iter.next()?;
    Some(iter.fold(first, |acc, next| merge(&acc, &next)))
}

fn numeric_rank(schema: &Schema) -> Option<u8> {
    match schema {
        Schema::Int => Some(0),
        Schema::Long => Some(1),
        Schema::Float => Some(2),
        Schema::Double => Some(3),
        _ => None,
    }
}

/// Structural merge without introducing a union at this level
fn merge_only(left: &Schema, right: &Schema) -> Option<Schema> {
    if left == right {
        return Some(left.clone());
    }

    if let (Some(l), Some(r)) = (numeric_rank(left), numeric_rank(right)) {
        return Some(if l >= r { left.clone() } else { right.clone() });
    }

    match (left, right) {
        (Schema::Union(_), Schema::Union(_)) => Some(union(left, right)),
        (Schema::Record(l), Schema::Record(r)) if l.name == r.name => {
            Some(Schema::Record(merge_records(l, r)))
        }
        (Schema::Enum(l), Schema::Enum(r)) if l.name == r.name => {
            let mut symbols = l.symbols.clone();
            for symbol in &r.symbols {
                if !symbols.contains(symbol) {
                    symbols.push(symbol.clone());
                }
            }
            Some(Schema::Enum(EnumSchema {
                name: l.name.clone(),
                symbols,
            }))
        }
        (Schema::Map(l), Schema::Map(r)) => Some(Schema::map(merge(l, r))),
        (Schema::Array(l), Schema::Array(r)) => Some(Schema::array(merge(l, r))),
        // differently named types, fixed types of different sizes, mixed kinds
        _ => None,
    }
}

fn union(left: &Schema, right: &Schema) -> Schema {
    match (left, right) {
        (Schema::Union(_), Schema::Union(members)) => members
            .iter()
            .fold(left.clone(), |acc, member| union(&acc, member)),
        (Schema::Union(members), other) => Schema::Union(add_member(members, other)),
        (other, Schema::Union(members)) => members
            .iter()
            .fold(Schema::Union(vec![other.clone()]), |acc, member| union(&acc, member)),
        (Schema::Null, other) | (other, Schema::Null) => Schema::nullable(other.clone()),
        _ => Schema::Union(vec![left.clone(), right.clone()]),
    }
}

/// Fold `schema` into the first member it merges with, else add it
fn add_member(members: &[Schema], schema: &Schema) -> Vec<Schema> {
    let mut out = members.to_vec();

    if *schema == Schema::Null {
        if !out.contains(&Schema::Null) {
            out.insert(0, Schema::Null);
        }
        return out;
    }

    for member in out.iter_mut() {
        if let Some(merged) = merge_only(member, schema) {
            *member = merged;
            return out;
        }
    }

    out.push(schema.clone());
    out
}

fn merge_records(left: &RecordSchema, right: &RecordSchema) -> RecordSchema {
    let mut fields = Vec::with_capacity(left.fields.len().max(right.fields.len()));

    for lf in &left.fields {
        match right.fields.iter().find(|rf| rf.name == lf.name) {
            Some(rf) => {
                let schema = merge(&lf.schema, &rf.schema);
                let default = lf.default.clone().or_else(|| rf.default.clone());
                fields.push(Field {
                    name: lf.name.clone(),
                    default: fit_default(&schema, default),
                    schema,
                });
            }
            None => fields.push(optional(lf)),
        }
    }

    for rf in &right.fields {
        if !left.fields.iter().any(|lf| lf.name == rf.name) {
            fields.push(optional(rf));
        }
    }

    RecordSchema {
        name: left.name.clone(),
        fields,
    }
}

/// A default belongs to the first union member; once NULL leads, only null fits
fn fit_default(schema: &Schema, default: Option<Value>) -> Option<Value> {
    match (schema.members().first(), default) {
        (Some(Schema::Null), Some(value)) if !value.is_null() => Some(Value::Null),
        (_, default) => default,
    }
}

/// A field that may be absent: nullable, defaulting to null
fn optional(field: &Field) -> Field {
    if null_ok(&field.schema) && field.default.is_some() {
        return field.clone();
    }
    Field::with_default(
        field.name.clone(),
        Schema::nullable(field.schema.clone()),
        Value::Null,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SCALARS: [Schema; 8] = [
        Schema::Null,
        Schema::Boolean,
        Schema::Int,
        Schema::Long,
        Schema::Float,
        Schema::Double,
        Schema::String,
        Schema::Bytes,
    ];

    #[test]
    fn test_numeric_widening() {
        assert_eq!(merge(&Schema::Int, &Schema::Long), Schema::Long);
        assert_eq!(merge(&Schema::Long, &Schema::Double), Schema::Double);
        assert_eq!(merge(&Schema::Int, &Schema::Float), Schema::Float);
        assert_eq!(merge(&Schema::Double, &Schema::Int), Schema::Double);
        assert_eq!(merge(&Schema::Long, &Schema::Float), Schema::Float);
    }

    #[test]
    fn test_scalar_merge_idempotent() {
        for schema in &SCALARS {
            assert_eq!(merge(schema, schema), *schema);
        }
    }

    #[test]
    fn test_scalar_merge_commutative() {
        for a in &SCALARS {
            for b in &SCALARS {
                let ab = merge(a, b);
                let ba = merge(b, a);
                match (&ab, &ba) {
                    // same members; order follows which side was seen first
                    (Schema::Union(x), Schema::Union(y)) => {
                        assert_eq!(x.len(), y.len());
                        assert!(x.iter().all(|m| y.contains(m)), "{ab} vs {ba}");
                    }
                    _ => assert_eq!(ab, ba),
                }
            }
        }
    }

    #[test]
    fn test_mismatched_kinds_union_in_order() {
        assert_eq!(
            merge(&Schema::String, &Schema::Boolean),
            Schema::union(vec![Schema::String, Schema::Boolean])
        );
        assert_eq!(
            merge(&Schema::Double, &Schema::String),
            Schema::union(vec![Schema::Double, Schema::String])
        );
    }

    #[test]
    fn test_null_makes_nullable() {
        let expected = Schema::union(vec![Schema::Null, Schema::String]);
        assert_eq!(merge(&Schema::String, &Schema::Null), expected);
        assert_eq!(merge(&Schema::Null, &Schema::String), expected);
        assert_eq!(merge(&expected, &Schema::Null), expected);
    }

    #[test]
    fn test_union_absorbs_mergeable_member() {
        let union = Schema::union(vec![Schema::Int, Schema::String]);
        assert_eq!(
            merge(&union, &Schema::Double),
            Schema::union(vec![Schema::Double, Schema::String])
        );
        assert_eq!(
            merge(&union, &Schema::Boolean),
            Schema::union(vec![Schema::Int, Schema::String, Schema::Boolean])
        );
        assert_eq!(
            merge(&Schema::Long, &union),
            Schema::union(vec![Schema::Long, Schema::String])
        );
    }

    #[test]
    fn test_union_with_union() {
        let a = Schema::union(vec![Schema::Null, Schema::Int]);
        let b = Schema::union(vec![Schema::String, Schema::Long]);
        assert_eq!(
            merge(&a, &b),
            Schema::union(vec![Schema::Null, Schema::Long, Schema::String])
        );
    }

    #[test]
    fn test_record_merge() {
        let a = Schema::record(
            "Event",
            vec![Field::new("id", Schema::Int), Field::new("name", Schema::String)],
        );
        let b = Schema::record(
            "Event",
            vec![Field::new("id", Schema::Long), Field::new("score", Schema::Double)],
        );

        let merged = merge(&a, &b);
        let names: Vec<&str> = merged.fields().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["id", "name", "score"]);
        assert_eq!(merged.field("id").unwrap().schema, Schema::Long);
        assert_eq!(merged.field("id").unwrap().default, None);

        let name = merged.field("name").unwrap();
        assert_eq!(name.schema, Schema::union(vec![Schema::Null, Schema::String]));
        assert_eq!(name.default, Some(Value::Null));

        let score = merged.field("score").unwrap();
        assert_eq!(score.schema, Schema::union(vec![Schema::Null, Schema::Double]));
    }

    #[test]
    fn test_default_reset_when_field_becomes_nullable() {
        let a = Schema::record(
            "Counter",
            vec![Field::with_default("count", Schema::Long, json!(0))],
        );
        let b = Schema::record("Counter", vec![Field::new("count", Schema::Null)]);

        for merged in [merge(&a, &b), merge(&b, &a)] {
            let count = merged.field("count").unwrap();
            assert_eq!(count.schema, Schema::union(vec![Schema::Null, Schema::Long]));
            assert_eq!(count.default, Some(Value::Null));
        }

        // a default that still fits the first member is kept
        let c = Schema::record("Counter", vec![Field::new("count", Schema::Int)]);
        assert_eq!(merge(&a, &c).field("count").unwrap().default, Some(json!(0)));
    }

    #[test]
    fn test_differently_named_records_union() {
        let a = Schema::record("A", vec![]);
        let b = Schema::record("B", vec![]);
        assert_eq!(merge(&a, &b), Schema::union(vec![a.clone(), b.clone()]));
    }

    #[test]
    fn test_enum_symbols_union() {
        let a = Schema::enumeration("Color", vec!["RED", "GREEN"]);
        let b = Schema::enumeration("Color", vec!["GREEN", "BLUE"]);
        assert_eq!(
            merge(&a, &b),
            Schema::enumeration("Color", vec!["RED", "GREEN", "BLUE"])
        );
    }

    #[test]
    fn test_containers_merge_elements() {
        assert_eq!(
            merge(&Schema::array(Schema::Int), &Schema::array(Schema::Null)),
            Schema::array(Schema::union(vec![Schema::Null, Schema::Int]))
        );
        assert_eq!(
            merge(&Schema::map(Schema::Float), &Schema::map(Schema::Long)),
            Schema::map(Schema::Float)
        );
        assert_eq!(
            merge(&Schema::fixed("F", 4), &Schema::fixed("F", 8)),
            Schema::union(vec![Schema::fixed("F", 4), Schema::fixed("F", 8)])
        );
    }

    #[test]
    fn test_merge_or_union() {
        assert_eq!(merge_or_union(Vec::new()), None);
        assert_eq!(
            merge_or_union(vec![Schema::Int, Schema::Double, Schema::String]),
            Some(Schema::union(vec![Schema::Double, Schema::String]))
        );
        assert_eq!(
            merge_or_union(vec![Schema::Int, Schema::Null, Schema::Long]),
            Some(Schema::union(vec![Schema::Null, Schema::Long]))
        );
    }
}
