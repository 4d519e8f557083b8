use std::fmt;

use docmap_types::{Document, Value};

/// Field-equality filter.
///
/// A document matches when every filter field is present with an equal value
/// (numbers compare across `Int` and `Float`). A `Null` filter value also
/// matches a document that lacks the field. The empty filter matches
/// everything.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Filter(Document);

impl Filter {
    /// The filter that matches every document.
    pub fn all() -> Self {
        Self(Document::new())
    }

    /// Single-field equality.
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self(Document::new().with(field, value))
    }

    /// Add another equality condition.
    pub fn and(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(field, value);
        self
    }

    /// Returns `true` if `document` satisfies every condition.
    pub fn matches(&self, document: &Document) -> bool {
        self.0.iter().all(|(field, expected)| match document.get(field) {
            Some(actual) => actual.loose_eq(expected),
            None => expected.is_null(),
        })
    }

    /// Returns `true` if the filter has no conditions.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn conditions(&self) -> &Document {
        &self.0
    }
}

impl From<Document> for Filter {
    fn from(doc: Document) -> Self {
        Self(doc)
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", Value::from(self.0.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docmap_types::doc;

    #[test]
    fn empty_filter_matches_everything() {
        assert!(Filter::all().matches(&doc! { "a" => 1 }));
        assert!(Filter::all().matches(&Document::new()));
    }

    #[test]
    fn equality_on_all_fields() {
        let f = Filter::eq("user_id", "alice").and("active", true);
        assert!(f.matches(&doc! { "user_id" => "alice", "active" => true, "x" => 1 }));
        assert!(!f.matches(&doc! { "user_id" => "alice", "active" => false }));
        assert!(!f.matches(&doc! { "user_id" => "alice" }));
    }

    #[test]
    fn numbers_compare_across_kinds() {
        let f = Filter::eq("balance", 10.0);
        assert!(f.matches(&doc! { "balance" => 10 }));
    }

    #[test]
    fn null_matches_missing_field() {
        let f = Filter::eq("deleted_at", Value::Null);
        assert!(f.matches(&doc! { "a" => 1 }));
        assert!(f.matches(&doc! { "deleted_at" => Value::Null }));
        assert!(!f.matches(&doc! { "deleted_at" => 5 }));
    }

    #[test]
    fn display_lists_conditions() {
        let f = Filter::eq("user_id", "alice");
        assert_eq!(f.to_string(), "{user_id: \"alice\"}");
    }
}
