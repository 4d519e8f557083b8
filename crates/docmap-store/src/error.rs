/// Errors from document store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A collection with this name already exists.
    #[error("collection already exists: {0}")]
    CollectionExists(String),

    /// A write would violate a unique index.
    #[error("duplicate key in {collection}: {field} = {value}")]
    DuplicateKey {
        collection: String,
        field: String,
        value: String,
    },

    /// An aggregation stage the backend does not understand.
    #[error("unsupported pipeline stage: {0}")]
    UnsupportedStage(String),

    /// A pipeline stage with a malformed argument.
    #[error("invalid pipeline stage {stage}: {reason}")]
    InvalidStage { stage: String, reason: String },

    /// Failure reported by an external storage engine.
    #[error("backend error: {0}")]
    Backend(String),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
