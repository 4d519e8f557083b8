//! Foundation types for docmap.
//!
//! This crate provides the value model shared by every other docmap crate:
//! the scalar [`Value`] enum, the ordered [`Document`] map that storage
//! backends hold, and the closed [`FieldValue`] union describing how a single
//! field is tagged on the wire.
//!
//! # Key Types
//!
//! - [`Value`] -- Self-describing scalar (numbers, text, timestamps, bytes, sequences, maps)
//! - [`Document`] -- Field name → [`Value`] map with deterministic ordering
//! - [`FieldValue`] -- `Scalar | Binary | Embedded | Reference` wire union
//!
//! # Wire Shape
//!
//! ```text
//! <scalar>
//! { type: "binary",   data: <bytes> }
//! { type: "document", data: <nested document> }
//! { type: <EntityTypeName>, data: <nested document> }
//! { type: <EntityTypeName>, id_field: <name>, id_value: <value> }
//! ```

pub mod document;
pub mod error;
pub mod field;
pub mod value;

pub use document::Document;
pub use error::TypeError;
pub use field::FieldValue;
pub use value::Value;
