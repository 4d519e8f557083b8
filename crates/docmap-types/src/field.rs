use std::collections::BTreeMap;

use crate::document::Document;
use crate::value::Value;

/// Key holding the wrapper tag.
pub const TYPE_KEY: &str = "type";
/// Key holding a wrapper's payload.
pub const DATA_KEY: &str = "data";
/// Key naming the referenced entity's identity field.
pub const ID_FIELD_KEY: &str = "id_field";
/// Key holding the referenced entity's identity value.
pub const ID_VALUE_KEY: &str = "id_value";

/// Tag of an opaque blob wrapper.
pub const BINARY_TAG: &str = "binary";
/// Tag of an owned sub-document wrapper.
pub const DOCUMENT_TAG: &str = "document";

/// How one field of an encoded document is represented.
///
/// This is the closed union every encoded field falls into. Decoding matches
/// on it exhaustively instead of probing maps for marker keys.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldValue {
    /// Plain value stored verbatim.
    Scalar(Value),
    /// Opaque blob produced by a registered codec.
    Binary(Vec<u8>),
    /// Owned sub-entity with its full body embedded.
    ///
    /// `type_name` is `None` for the generic `document` tag and names the
    /// entity type when the wrapper was tagged with it.
    Embedded {
        type_name: Option<String>,
        data: Document,
    },
    /// Pointer to another stored entity, resolved by identity lookup.
    Reference {
        type_name: String,
        id_field: String,
        id_value: Value,
    },
}

impl FieldValue {
    /// Short name of the variant, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Scalar(_) => "scalar",
            Self::Binary(_) => BINARY_TAG,
            Self::Embedded { .. } => DOCUMENT_TAG,
            Self::Reference { .. } => "reference",
        }
    }

    /// Render this field in its stored form.
    pub fn into_wire(self) -> Value {
        match self {
            Self::Scalar(value) => value,
            Self::Binary(bytes) => wrapper([
                (TYPE_KEY, Value::from(BINARY_TAG)),
                (DATA_KEY, Value::Bytes(bytes)),
            ]),
            Self::Embedded { type_name, data } => wrapper([
                (
                    TYPE_KEY,
                    Value::String(type_name.unwrap_or_else(|| DOCUMENT_TAG.to_owned())),
                ),
                (DATA_KEY, Value::from(data)),
            ]),
            Self::Reference {
                type_name,
                id_field,
                id_value,
            } => wrapper([
                (TYPE_KEY, Value::String(type_name)),
                (ID_FIELD_KEY, Value::String(id_field)),
                (ID_VALUE_KEY, id_value),
            ]),
        }
    }

    /// Classify a stored value.
    ///
    /// A map is read as a wrapper only when its key set is exactly
    /// `{type, data}` or `{type, id_field, id_value}`, `type` is a string, and
    /// the payload has the shape the tag calls for. Every other value,
    /// including maps that merely contain a `type` key, is a scalar.
    pub fn from_wire(value: Value) -> Self {
        let mut map = match value {
            Value::Map(map) if is_wrapper_shape(&map) => map,
            other => return Self::Scalar(other),
        };

        let tag = match map.remove(TYPE_KEY) {
            Some(Value::String(tag)) => tag,
            Some(other) => {
                map.insert(TYPE_KEY.to_owned(), other);
                return Self::Scalar(Value::Map(map));
            }
            None => return Self::Scalar(Value::Map(map)),
        };

        if let Some(data) = map.remove(DATA_KEY) {
            return match (tag.as_str(), data) {
                (BINARY_TAG, Value::Bytes(bytes)) => Self::Binary(bytes),
                (DOCUMENT_TAG, Value::Map(data)) => Self::Embedded {
                    type_name: None,
                    data: Document::from(data),
                },
                (BINARY_TAG | DOCUMENT_TAG, data) => restore(map, tag.clone(), DATA_KEY, data),
                (_, Value::Map(data)) => Self::Embedded {
                    type_name: Some(tag.clone()),
                    data: Document::from(data),
                },
                (_, data) => restore(map, tag.clone(), DATA_KEY, data),
            };
        }

        match map.remove(ID_FIELD_KEY) {
            Some(Value::String(id_field)) => Self::Reference {
                type_name: tag,
                id_field,
                id_value: map.remove(ID_VALUE_KEY).unwrap_or(Value::Null),
            },
            Some(other) => restore(map, tag, ID_FIELD_KEY, other),
            None => restore_tag(map, tag),
        }
    }
}

/// Put a partially consumed wrapper back together as a scalar map.
fn restore(
    mut map: BTreeMap<String, Value>,
    tag: String,
    key: &str,
    value: Value,
) -> FieldValue {
    map.insert(key.to_owned(), value);
    restore_tag(map, tag)
}

fn restore_tag(mut map: BTreeMap<String, Value>, tag: String) -> FieldValue {
    map.insert(TYPE_KEY.to_owned(), Value::String(tag));
    FieldValue::Scalar(Value::Map(map))
}

fn is_wrapper_shape(map: &BTreeMap<String, Value>) -> bool {
    let has = |k: &str| map.contains_key(k);
    match map.len() {
        2 => has(TYPE_KEY) && has(DATA_KEY),
        3 => has(TYPE_KEY) && has(ID_FIELD_KEY) && has(ID_VALUE_KEY),
        _ => false,
    }
}

fn wrapper<const N: usize>(entries: [(&str, Value); N]) -> Value {
    Value::Map(
        entries
            .into_iter()
            .map(|(k, v)| (k.to_owned(), v))
            .collect(),
    )
}

impl From<Value> for FieldValue {
    fn from(value: Value) -> Self {
        Self::from_wire(value)
    }
}
