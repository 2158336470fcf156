use indexmap::IndexMap;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::node::latin1_bytes;
use crate::schema::Schema;
use crate::types::Datum;

/// Interpret a record field's JSON default against its schema
///
/// Defaults use the Avro JSON encoding: a union default belongs to the
/// first member, and bytes and fixed defaults are ISO-8859-1 strings.
pub fn default_datum(value: &Value, schema: &Schema) -> Result<Datum> {
    let datum = match (schema, value) {
        (Schema::Union(members), value) => match members.first() {
            Some(first) => return default_datum(value, first),
            None => return Err(invalid(value, schema)),
        },
        (Schema::Null, Value::Null) => Datum::Null,
        (Schema::Boolean, Value::Bool(b)) => Datum::Boolean(*b),
        (Schema::Int, Value::Number(n)) => {
            let int = n.as_i64().and_then(|i| i32::try_from(i).ok());
            Datum::Int(int.ok_or_else(|| invalid(value, schema))?)
        }
        (Schema::Long, Value::Number(n)) => Datum::Long(n.as_i64().ok_or_else(|| invalid(value, schema))?),
        (Schema::Float, Value::Number(n)) => {
            Datum::Float(n.as_f64().ok_or_else(|| invalid(value, schema))? as f32)
        }
        (Schema::Double, Value::Number(n)) => Datum::Double(n.as_f64().ok_or_else(|| invalid(value, schema))?),
        (Schema::String, Value::String(s)) => Datum::String(s.clone()),
        (Schema::Bytes, Value::String(s)) => {
            Datum::Bytes(latin1_bytes(s).ok_or_else(|| invalid(value, schema))?)
        }
        (Schema::Fixed(fixed), Value::String(s)) => {
            let bytes = latin1_bytes(s)
                .filter(|bytes| bytes.len() <= fixed.size)
                .ok_or_else(|| invalid(value, schema))?;
            Datum::Fixed {
                name: fixed.name.clone(),
                bytes,
            }
        }
        (Schema::Enum(e), Value::String(s)) if e.symbols.contains(s) => Datum::Enum {
            name: e.name.clone(),
            symbol: s.clone(),
        },
        (Schema::Array(items), Value::Array(values)) => Datum::Array(
            values
                .iter()
                .map(|v| default_datum(v, items))
                .collect::<Result<Vec<_>>>()?,
        ),
        (Schema::Map(values), Value::Object(entries)) => {
            let mut out = IndexMap::with_capacity(entries.len());
            for (key, v) in entries {
                out.insert(key.clone(), default_datum(v, values)?);
            }
            Datum::Map(out)
        }
        (Schema::Record(record), Value::Object(entries)) => {
            let mut fields = IndexMap::with_capacity(record.fields.len());
            for field in &record.fields {
                let v = entries
                    .get(&field.name)
                    .or(field.default.as_ref())
                    .ok_or_else(|| invalid(value, schema))?;
                fields.insert(field.name.clone(), default_datum(v, &field.schema)?);
            }
            Datum::Record {
                name: record.name.clone(),
                fields,
            }
        }
        _ => return Err(invalid(value, schema)),
    };
    Ok(datum)
}

fn invalid(value: &Value, schema: &Schema) -> Error {
    Error::InvalidSchema(format!("default {value} is not valid for {schema}"))
}
