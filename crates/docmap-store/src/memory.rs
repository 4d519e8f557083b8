use std::collections::{BTreeSet, HashMap};
use std::sync::RwLock;

use docmap_types::{Document, Value};
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::filter::Filter;
use crate::pipeline::{Pipeline, Stage};
use crate::traits::DocumentStore;

/// One named collection: documents in insertion order plus unique indexes.
#[derive(Clone, Debug, Default)]
struct Collection {
    documents: Vec<Document>,
    unique_fields: BTreeSet<String>,
}

impl Collection {
    /// Check `candidate` against every unique index, ignoring the document at `skip`.
    fn check_unique(
        &self,
        name: &str,
        candidate: &Document,
        skip: Option<usize>,
    ) -> StoreResult<()> {
        for field in &self.unique_fields {
            let value = candidate.get(field).unwrap_or(&Value::Null);
            let clash = self
                .documents
                .iter()
                .enumerate()
                .filter(|(i, _)| Some(*i) != skip)
                .any(|(_, d)| d.get(field).unwrap_or(&Value::Null).loose_eq(value));
            if clash {
                return Err(StoreError::DuplicateKey {
                    collection: name.to_owned(),
                    field: field.clone(),
                    value: value.to_string(),
                });
            }
        }
        Ok(())
    }

    fn position(&self, filter: &Filter) -> Option<usize> {
        self.documents.iter().position(|d| filter.matches(d))
    }
}

/// In-memory, HashMap-based document store.
///
/// Intended for tests and embedding. Collections are held in memory behind a
/// `RwLock` for safe concurrent access. Documents are cloned on read/write and
/// kept in insertion order. Writing to a collection that does not exist
/// creates it.
pub struct InMemoryDocumentStore {
    collections: RwLock<HashMap<String, Collection>>,
}

impl InMemoryDocumentStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
        }
    }

    /// Number of documents in a collection (0 if it does not exist).
    pub fn len(&self, collection: &str) -> usize {
        self.collections
            .read()
            .expect("lock poisoned")
            .get(collection)
            .map_or(0, |c| c.documents.len())
    }

    /// Returns `true` if no collection holds any document.
    pub fn is_empty(&self) -> bool {
        self.collections
            .read()
            .expect("lock poisoned")
            .values()
            .all(|c| c.documents.is_empty())
    }

    /// Sorted list of collection names.
    pub fn collection_names(&self) -> Vec<String> {
        let map = self.collections.read().expect("lock poisoned");
        let mut names: Vec<String> = map.keys().cloned().collect();
        names.sort();
        names
    }

    /// Fields carrying a unique index in `collection`, in name order.
    pub fn unique_fields(&self, collection: &str) -> Vec<String> {
        self.collections
            .read()
            .expect("lock poisoned")
            .get(collection)
            .map(|c| c.unique_fields.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Remove all collections from the store.
    pub fn clear(&self) {
        self.collections.write().expect("lock poisoned").clear();
    }
}

impl Default for InMemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentStore for InMemoryDocumentStore {
    fn collection_exists(&self, name: &str) -> StoreResult<bool> {
        let map = self.collections.read().expect("lock poisoned");
        Ok(map.contains_key(name))
    }

    fn create_collection(&self, name: &str) -> StoreResult<()> {
        let mut map = self.collections.write().expect("lock poisoned");
        if map.contains_key(name) {
            return Err(StoreError::CollectionExists(name.to_owned()));
        }
        map.insert(name.to_owned(), Collection::default());
        debug!(collection = name, "created collection");
        Ok(())
    }

    fn create_unique_index(&self, collection: &str, field: &str) -> StoreResult<()> {
        let mut map = self.collections.write().expect("lock poisoned");
        let coll = map.entry(collection.to_owned()).or_default();
        if coll.unique_fields.contains(field) {
            return Ok(());
        }

        // Existing documents must already satisfy the new index.
        let mut seen: Vec<&Value> = Vec::new();
        for doc in &coll.documents {
            let value = doc.get(field).unwrap_or(&Value::Null);
            if seen.iter().any(|v| v.loose_eq(value)) {
                return Err(StoreError::DuplicateKey {
                    collection: collection.to_owned(),
                    field: field.to_owned(),
                    value: value.to_string(),
                });
            }
            seen.push(value);
        }

        coll.unique_fields.insert(field.to_owned());
        debug!(collection, field, "created unique index");
        Ok(())
    }

    fn insert_one(&self, collection: &str, document: &Document) -> StoreResult<()> {
        let mut map = self.collections.write().expect("lock poisoned");
        let coll = map.entry(collection.to_owned()).or_default();
        coll.check_unique(collection, document, None)?;
        coll.documents.push(document.clone());
        Ok(())
    }

    fn update_one(
        &self,
        collection: &str,
        filter: &Filter,
        updates: &Document,
    ) -> StoreResult<bool> {
        let mut map = self.collections.write().expect("lock poisoned");
        let Some(coll) = map.get_mut(collection) else {
            return Ok(false);
        };
        let Some(idx) = coll.position(filter) else {
            return Ok(false);
        };

        let mut updated = coll.documents[idx].clone();
        updated.merge(updates);
        coll.check_unique(collection, &updated, Some(idx))?;
        coll.documents[idx] = updated;
        Ok(true)
    }

    fn delete_one(&self, collection: &str, filter: &Filter) -> StoreResult<bool> {
        let mut map = self.collections.write().expect("lock poisoned");
        let Some(coll) = map.get_mut(collection) else {
            return Ok(false);
        };
        match coll.position(filter) {
            Some(idx) => {
                coll.documents.remove(idx);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn find_one(&self, collection: &str, filter: &Filter) -> StoreResult<Option<Document>> {
        let map = self.collections.read().expect("lock poisoned");
        Ok(map
            .get(collection)
            .and_then(|c| c.documents.iter().find(|d| filter.matches(d)))
            .cloned())
    }

    fn find(&self, collection: &str, filter: &Filter, limit: usize) -> StoreResult<Vec<Document>> {
        let map = self.collections.read().expect("lock poisoned");
        Ok(map
            .get(collection)
            .map(|c| {
                c.documents
                    .iter()
                    .filter(|d| filter.matches(d))
                    .take(limit)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn aggregate(&self, collection: &str, pipeline: &Pipeline) -> StoreResult<Vec<Document>> {
        // Parse everything before touching data so a bad stage fails cleanly.
        let stages = pipeline
            .stages()
            .iter()
            .map(Stage::parse)
            .collect::<StoreResult<Vec<_>>>()?;

        let docs = {
            let map = self.collections.read().expect("lock poisoned");
            map.get(collection)
                .map(|c| c.documents.clone())
                .unwrap_or_default()
        };
        Ok(stages.iter().fold(docs, |acc, stage| stage.apply(acc)))
    }

    fn count(&self, collection: &str, filter: &Filter) -> StoreResult<u64> {
        let map = self.collections.read().expect("lock poisoned");
        Ok(map
            .get(collection)
            .map_or(0, |c| c.documents.iter().filter(|d| filter.matches(d)).count()) as u64)
    }
}

impl std::fmt::Debug for InMemoryDocumentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names = self.collection_names();
        f.debug_struct("InMemoryDocumentStore")
            .field("collections", &names)
            .finish()
    }
}
