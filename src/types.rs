use indexmap::IndexMap;
use serde::{Deserialize, Serialize, Serializer};

use crate::node::latin1_string;

/// A value shaped exactly like the schema it was converted against
#[derive(Debug, Clone, PartialEq)]
pub enum Datum {
    Null,
    Boolean(bool),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    String(String),
    Bytes(Vec<u8>),
    Fixed { name: String, bytes: Vec<u8> },
    Enum { name: String, symbol: String },
    Array(Vec<Datum>),
    Map(IndexMap<String, Datum>),
    Record {
        name: String,
        fields: IndexMap<String, Datum>,
    },
}

impl Datum {
    /// Field of a record or entry of a map
    pub fn get(&self, key: &str) -> Option<&Datum> {
        match self {
            Datum::Record { fields, .. } => fields.get(key),
            Datum::Map(entries) => entries.get(key),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Datum::Null)
    }
}

/// Plain JSON: records and maps as objects, enums as their symbol,
/// bytes as ISO-8859-1 strings
impl Serialize for Datum {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Datum::Null => serializer.serialize_unit(),
            Datum::Boolean(b) => serializer.serialize_bool(*b),
            Datum::Int(i) => serializer.serialize_i32(*i),
            Datum::Long(l) => serializer.serialize_i64(*l),
            Datum::Float(f) => serializer.serialize_f32(*f),
            Datum::Double(d) => serializer.serialize_f64(*d),
            Datum::String(s) => serializer.serialize_str(s),
            Datum::Bytes(bytes) | Datum::Fixed { bytes, .. } => {
                serializer.serialize_str(&latin1_string(bytes))
            }
            Datum::Enum { symbol, .. } => serializer.serialize_str(symbol),
            Datum::Array(items) => serializer.collect_seq(items),
            Datum::Map(entries) => serializer.collect_map(entries),
            Datum::Record { fields, .. } => serializer.collect_map(fields),
        }
    }
}

/// Configuration for schema inference
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InferenceConfig {
    /// Name of the record inferred for the document root
    pub root_name: String,

    /// Nested objects become records; when false they become maps
    pub objects_as_records: bool,

    /// Maximum number of documents read by batch inference
    pub num_records: usize,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        InferenceConfig {
            root_name: String::from("Root"),
            objects_as_records: true,
            num_records: usize::MAX,
        }
    }
}

impl InferenceConfig {
    pub fn new(root_name: impl Into<String>) -> Self {
        InferenceConfig {
            root_name: root_name.into(),
            ..Self::default()
        }
    }

    pub fn builder() -> InferenceConfigBuilder {
        InferenceConfigBuilder::default()
    }
}

/// Builder for [`InferenceConfig`]
#[derive(Debug, Default)]
pub struct InferenceConfigBuilder {
    config: InferenceConfig,
}

impl InferenceConfigBuilder {
    pub fn root_name(mut self, name: impl Into<String>) -> Self {
        self.config.root_name = name.into();
        self
    }

    /// Infer nested objects as homogeneous maps
    pub fn use_maps(mut self) -> Self {
        self.config.objects_as_records = false;
        self
    }

    /// Read at most `n` documents; 0 still reads the first one
    pub fn num_records(mut self, n: usize) -> Self {
        self.config.num_records = n;
        self
    }

    pub fn build(self) -> InferenceConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_config() {
        let config = InferenceConfig::default();
        assert_eq!(config.root_name, "Root");
        assert!(config.objects_as_records);
        assert_eq!(config.num_records, usize::MAX);
    }

    #[test]
    fn test_builder() {
        let config = InferenceConfig::builder()
            .root_name("Event")
            .use_maps()
            .num_records(10)
            .build();

        assert_eq!(config.root_name, "Event");
        assert!(!config.objects_as_records);
        assert_eq!(config.num_records, 10);
    }

    #[test]
    fn test_config_serde_names() {
        let config: InferenceConfig = serde_json::from_value(json!({
            "rootName": "Event",
            "objectsAsRecords": false,
            "numRecords": 5
        }))
        .unwrap();
        let expected = InferenceConfig::builder()
            .root_name("Event")
            .use_maps()
            .num_records(5)
            .build();
        assert_eq!(config, expected);
    }

    #[test]
    fn test_datum_serializes_as_plain_json() {
        let mut fields = IndexMap::new();
        fields.insert("id".to_string(), Datum::Long(7));
        fields.insert(
            "kind".to_string(),
            Datum::Enum {
                name: "Kind".to_string(),
                symbol: "CLICK".to_string(),
            },
        );
        fields.insert("raw".to_string(), Datum::Bytes(vec![0x61, 0xe9]));
        fields.insert("note".to_string(), Datum::Null);
        let record = Datum::Record {
            name: "Event".to_string(),
            fields,
        };

        assert_eq!(
            serde_json::to_value(&record).unwrap(),
            json!({"id": 7, "kind": "CLICK", "raw": "a\u{e9}", "note": null})
        );
        assert_eq!(record.get("id"), Some(&Datum::Long(7)));
        assert!(record.get("note").unwrap().is_null());
    }
}
