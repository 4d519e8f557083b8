use docmap_types::Document;

use crate::error::StoreResult;
use crate::filter::Filter;
use crate::pipeline::Pipeline;

/// Storage collaborator used by the mapping layer.
///
/// All implementations must satisfy these invariants:
/// - Every method is a blocking call; timeouts and retries, if any, are the
///   backend's business.
/// - `find_one` and `find` return documents in the backend's natural order,
///   which for a single collection must be stable between calls.
/// - A unique index rejects any write that would leave two documents with an
///   equal value in the indexed field.
/// - All I/O errors are propagated, never silently ignored.
pub trait DocumentStore: Send + Sync {
    /// Whether a collection with this name exists.
    fn collection_exists(&self, name: &str) -> StoreResult<bool>;

    /// Create an empty collection.
    ///
    /// Returns `StoreError::CollectionExists` if the name is taken.
    fn create_collection(&self, name: &str) -> StoreResult<()>;

    /// Create a unique index over one field of a collection.
    fn create_unique_index(&self, collection: &str, field: &str) -> StoreResult<()>;

    /// Insert a new document.
    fn insert_one(&self, collection: &str, document: &Document) -> StoreResult<()>;

    /// Set the given fields on the first document matching `filter`.
    ///
    /// Returns `true` if a document matched.
    fn update_one(&self, collection: &str, filter: &Filter, updates: &Document)
        -> StoreResult<bool>;

    /// Delete the first document matching `filter`. Returns `true` if one existed.
    fn delete_one(&self, collection: &str, filter: &Filter) -> StoreResult<bool>;

    /// Fetch the first document matching `filter`.
    ///
    /// Returns `Ok(None)` if nothing matches.
    fn find_one(&self, collection: &str, filter: &Filter) -> StoreResult<Option<Document>>;

    /// Fetch up to `limit` documents matching `filter`.
    fn find(&self, collection: &str, filter: &Filter, limit: usize) -> StoreResult<Vec<Document>>;

    /// Run an aggregation pipeline and return the resulting documents.
    fn aggregate(&self, collection: &str, pipeline: &Pipeline) -> StoreResult<Vec<Document>>;

    /// Count documents matching `filter`.
    fn count(&self, collection: &str, filter: &Filter) -> StoreResult<u64>;
}
