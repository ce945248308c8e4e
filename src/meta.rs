use serde::{Serialize, Serializer};
use serde_json::Value;
use std::collections::BTreeMap;

/// Version marker prepended to every encoded metadata payload. It doubles as
/// the Postgres JSONB binary-format version byte, so encoded payloads can be
/// bound to a `jsonb` parameter as-is.
pub const META_FORMAT_VERSION: u8 = 1;

/// Polymorphic metadata value attached to a log entry.
///
/// Scalars (ints, floats, bools) are folded into their string form at
/// construction time via the `From` impls below, so the JSON document only
/// ever contains strings, objects and arrays.
#[derive(Debug, Clone, PartialEq)]
pub enum MetaValue {
    String(String),
    Map(BTreeMap<String, MetaValue>),
    List(Vec<MetaValue>),
}

impl MetaValue {
    /// Recursively map this value to its JSON representation.
    pub fn to_json(&self) -> Value {
        match self {
            MetaValue::String(s) => Value::String(s.clone()),
            MetaValue::Map(map) => {
                Value::Object(map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect())
            }
            MetaValue::List(items) => Value::Array(items.iter().map(MetaValue::to_json).collect()),
        }
    }

    /// Reconstruct a value from JSON by structural sniffing, in priority
    /// order: string, then object, then array; first match wins. Scalars
    /// written by foreign producers (numbers, bools) reduce to their string
    /// form, mirroring the encode direction. `null` becomes the empty string.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::String(s) => MetaValue::String(s.clone()),
            Value::Object(map) => MetaValue::Map(
                map.iter()
                    .map(|(k, v)| (k.clone(), MetaValue::from_json(v)))
                    .collect(),
            ),
            Value::Array(items) => MetaValue::List(items.iter().map(MetaValue::from_json).collect()),
            Value::Number(n) => MetaValue::String(n.to_string()),
            Value::Bool(b) => MetaValue::String(b.to_string()),
            Value::Null => MetaValue::String(String::new()),
        }
    }
}

impl Serialize for MetaValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl From<&str> for MetaValue {
    fn from(value: &str) -> Self {
        MetaValue::String(value.to_string())
    }
}

impl From<String> for MetaValue {
    fn from(value: String) -> Self {
        MetaValue::String(value)
    }
}

impl From<i64> for MetaValue {
    fn from(value: i64) -> Self {
        MetaValue::String(value.to_string())
    }
}

impl From<u64> for MetaValue {
    fn from(value: u64) -> Self {
        MetaValue::String(value.to_string())
    }
}

impl From<f64> for MetaValue {
    fn from(value: f64) -> Self {
        MetaValue::String(value.to_string())
    }
}

impl From<bool> for MetaValue {
    fn from(value: bool) -> Self {
        MetaValue::String(value.to_string())
    }
}

impl From<Vec<MetaValue>> for MetaValue {
    fn from(value: Vec<MetaValue>) -> Self {
        MetaValue::List(value)
    }
}

impl From<BTreeMap<String, MetaValue>> for MetaValue {
    fn from(value: BTreeMap<String, MetaValue>) -> Self {
        MetaValue::Map(value)
    }
}

/// Error type covering both directions of the metadata codec.
#[derive(thiserror::Error, Debug)]
pub enum MetaError {
    #[error("metadata serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("metadata payload is missing the format-version marker")]
    MissingMarker,

    #[error("unsupported metadata format version {0}")]
    UnsupportedVersion(u8),

    #[error("metadata document is not a JSON object")]
    NotAnObject,
}

/// Encode a metadata map into its storage representation: the format-version
/// marker byte followed by the UTF-8 JSON document.
pub fn encode_metadata(metadata: &BTreeMap<String, MetaValue>) -> Result<Vec<u8>, MetaError> {
    let doc = Value::Object(
        metadata
            .iter()
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect(),
    );
    let mut buf = vec![META_FORMAT_VERSION];
    serde_json::to_writer(&mut buf, &doc)?;
    Ok(buf)
}

/// Inverse of [`encode_metadata`]: verify the marker, parse the JSON document
/// and rebuild the map via [`MetaValue::from_json`].
pub fn decode_metadata(payload: &[u8]) -> Result<BTreeMap<String, MetaValue>, MetaError> {
    let (&version, doc) = payload.split_first().ok_or(MetaError::MissingMarker)?;
    if version != META_FORMAT_VERSION {
        return Err(MetaError::UnsupportedVersion(version));
    }
    let value: Value = serde_json::from_slice(doc)?;
    match value {
        Value::Object(map) => Ok(map
            .iter()
            .map(|(k, v)| (k.clone(), MetaValue::from_json(v)))
            .collect()),
        _ => Err(MetaError::NotAnObject),
    }
}
