//! Document storage collaborator for docmap.
//!
//! The mapping layer never talks to a database directly. Everything it needs
//! from storage goes through the [`DocumentStore`] trait: collection
//! provisioning, unique indexes, single-document writes, equality queries,
//! counting and aggregation pipelines.
//!
//! # Storage Backends
//!
//! All backends implement the [`DocumentStore`] trait:
//!
//! - [`InMemoryDocumentStore`] -- `HashMap`-based store for tests and embedding
//!
//! # Design Rules
//!
//! 1. Every call is a blocking round trip; there is no internal queueing.
//! 2. Filters are field equality only ([`Filter`]).
//! 3. Pipelines are opaque to callers and interpreted by the backend ([`Pipeline`]).
//! 4. A missing record is `Ok(None)`, never an error.
//! 5. All backend errors are propagated, never silently ignored.

pub mod error;
pub mod filter;
pub mod memory;
pub mod pipeline;
pub mod traits;

// Re-export primary types at crate root for ergonomic imports.
pub use error::{StoreError, StoreResult};
pub use filter::Filter;
pub use memory::InMemoryDocumentStore;
pub use pipeline::{Pipeline, SortOrder, Stage};
pub use traits::DocumentStore;
