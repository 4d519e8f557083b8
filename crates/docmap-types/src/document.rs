use std::collections::btree_map;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::value::Value;

/// A stored record: field name → [`Value`].
///
/// Keys iterate in sorted order, so two documents with the same fields and
/// values always compare and serialize identically regardless of the order in
/// which fields were inserted.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document(BTreeMap<String, Value>);

impl Document {
    /// Create an empty document.
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Insert a field, returning the previous value if there was one.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the document has no fields.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, Value> {
        self.0.iter()
    }

    pub fn keys(&self) -> btree_map::Keys<'_, String, Value> {
        self.0.keys()
    }

    /// Keep only the fields for which `keep` returns `true`.
    pub fn retain(&mut self, mut keep: impl FnMut(&str, &Value) -> bool) {
        self.0.retain(|k, v| keep(k, v));
    }

    /// Copy every field of `other` into this document, overwriting on collision.
    pub fn merge(&mut self, other: &Document) {
        for (k, v) in other.iter() {
            self.0.insert(k.clone(), v.clone());
        }
    }

    pub fn into_inner(self) -> BTreeMap<String, Value> {
        self.0
    }

    /// Build a document from a JSON object.
    pub fn from_json(json: serde_json::Value) -> Result<Self, TypeError> {
        match Value::from(json) {
            Value::Map(map) => Ok(Self(map)),
            other => Err(TypeError::NotAnObject(other.kind())),
        }
    }

    /// Lossy JSON rendering; see [`Value::to_json`].
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.0
                .iter()
                .map(|(k, v)| (k.clone(), v.to_json()))
                .collect(),
        )
    }
}

impl From<BTreeMap<String, Value>> for Document {
    fn from(map: BTreeMap<String, Value>) -> Self {
        Self(map)
    }
}

impl From<Document> for Value {
    fn from(doc: Document) -> Self {
        Value::Map(doc.0)
    }
}

impl FromIterator<(String, Value)> for Document {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for Document {
    type Item = (String, Value);
    type IntoIter = btree_map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Document {
    type Item = (&'a String, &'a Value);
    type IntoIter = btree_map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Build a [`Document`] from `key => value` pairs.
///
/// ```
/// use docmap_types::{doc, Value};
///
/// let d = doc! { "user_id" => "alice", "balance" => 10 };
/// assert_eq!(d.get("balance"), Some(&Value::Int(10)));
/// ```
#[macro_export]
macro_rules! doc {
    () => {
        $crate::Document::new()
    };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut doc = $crate::Document::new();
        $( doc.insert($key, $value); )+
        doc
    }};
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doc;

    #[test]
    fn keys_iterate_sorted() {
        let d = doc! { "zebra" => 1, "alpha" => 2, "middle" => 3 };
        let keys: Vec<&String> = d.keys().collect();
        assert_eq!(keys, ["alpha", "middle", "zebra"]);
    }

    #[test]
    fn insertion_order_does_not_affect_equality() {
        let a = doc! { "a" => 1, "b" => 2 };
        let b = doc! { "b" => 2, "a" => 1 };
        assert_eq!(a, b);
    }

    #[test]
    fn insert_returns_previous() {
        let mut d = Document::new();
        assert!(d.insert("k", 1).is_none());
        assert_eq!(d.insert("k", 2), Some(Value::Int(1)));
        assert_eq!(d.len(), 1);
    }

    #[test]
    fn retain_and_remove() {
        let mut d = doc! { "a" => 1, "b" => 2, "c" => 3 };
        d.retain(|k, _| k != "b");
        assert!(!d.contains_key("b"));
        assert_eq!(d.remove("a"), Some(Value::Int(1)));
        assert_eq!(d.len(), 1);
    }

    #[test]
    fn merge_overwrites() {
        let mut d = doc! { "a" => 1, "b" => 2 };
        d.merge(&doc! { "b" => 20, "c" => 30 });
        assert_eq!(d, doc! { "a" => 1, "b" => 20, "c" => 30 });
    }

    #[test]
    fn from_json_object() {
        let d = Document::from_json(serde_json::json!({"user_id": "alice", "balance": 10})).unwrap();
        assert_eq!(d.get("user_id"), Some(&Value::from("alice")));
        assert_eq!(d.get("balance"), Some(&Value::Int(10)));
    }

    #[test]
    fn from_json_rejects_non_object() {
        let err = Document::from_json(serde_json::json!([1, 2])).unwrap_err();
        assert_eq!(err, TypeError::NotAnObject("list"));
    }

    #[test]
    fn empty_macro() {
        let d = doc! {};
        assert!(d.is_empty());
    }

    #[test]
    fn serde_is_transparent() {
        let d = doc! { "n" => 1 };
        let json = serde_json::to_value(&d).unwrap();
        assert_eq!(json, serde_json::json!({"n": {"Int": 1}}));
    }
}
