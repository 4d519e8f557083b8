//! Object-document mapping over a pluggable document store.
//!
//! A [`Session`] ties a [`DocumentStore`] to a blob [`CodecRegistry`] and an
//! [`OdmConfig`], and runs every persistence operation for [`Entity`] types:
//! construction from stored documents, save, partial and full updates,
//! delete, queries, aggregation and dumps.
//!
//! # Key Types
//!
//! - [`Session`] / [`SessionBuilder`] -- the explicit storage context
//! - [`Instance`] -- an entity held by a session
//! - [`OdmConfig`] -- limits, provisioning and identity generation settings
//! - [`OdmError`] / [`ErrorKind`] -- failures and their classification
//!
//! The codec, store and value crates are re-exported so applications only
//! need this one.

pub mod config;
pub mod error;
pub mod instance;
pub mod session;

#[cfg(test)]
mod testing;

pub use config::OdmConfig;
pub use error::{ErrorKind, OdmError, OdmResult};
pub use instance::Instance;
pub use session::{Session, SessionBuilder};

pub use docmap_codec::{
    BincodeCodec, BlobCodec, CodecError, CodecRegistry, CodecResult, Embedded, Entity,
    EntitySchema, FieldReader, FieldWriter, JsonCodec, Opaque, Persist, Ref, Scalar,
};
pub use docmap_store::{
    DocumentStore, Filter, InMemoryDocumentStore, Pipeline, SortOrder, StoreError,
};
pub use docmap_types::{doc, Document, FieldValue, Value};
