//! Entity schemas and the encode/decode engine.
//!
//! An entity type describes itself with a static [`EntitySchema`] and walks
//! its fields through [`Entity::write_fields`] / [`Entity::read_field`]. The
//! engine turns that walk into a [`Document`](docmap_types::Document) whose
//! fields are each one of four [`FieldValue`](docmap_types::FieldValue)
//! shapes, and back.
//!
//! # Key Types
//!
//! - [`EntitySchema`] -- identity field, collection and field sets of a type
//! - [`Entity`] -- the persisted-object trait
//! - [`Persist`] / [`Scalar`] -- per-field conversion
//! - [`Embedded`], [`Ref`], [`Opaque`] -- owned, referenced and blob fields
//! - [`CodecRegistry`] -- blob codecs for opaque field types
//!
//! # Example
//!
//! ```
//! use docmap_codec::{
//!     construct, encode, CodecRegistry, CodecResult, DecodeContext, EncodeOptions, Entity,
//!     EntitySchema, FieldReader, FieldWriter,
//! };
//!
//! #[derive(Default, Debug, PartialEq)]
//! struct Note {
//!     id: Option<String>,
//!     body: Option<String>,
//! }
//!
//! static NOTE: EntitySchema = EntitySchema::new("Note", "notes").requiring(&["_id"]);
//!
//! impl Entity for Note {
//!     fn schema() -> &'static EntitySchema {
//!         &NOTE
//!     }
//!
//!     fn write_fields(&self, out: &mut FieldWriter<'_>) -> CodecResult<()> {
//!         out.field("_id", &self.id)?;
//!         out.field("body", &self.body)
//!     }
//!
//!     fn read_field(&mut self, name: &str, input: FieldReader<'_>) -> CodecResult<()> {
//!         match name {
//!             "_id" => self.id = input.read()?,
//!             "body" => self.body = input.read()?,
//!             _ => {}
//!         }
//!         Ok(())
//!     }
//! }
//!
//! let registry = CodecRegistry::new();
//! let note = Note { id: Some("n1".into()), body: Some("hello".into()) };
//! let doc = encode(&note, &registry, &EncodeOptions::new()).unwrap();
//! let back: Note = construct(&doc, &DecodeContext::new(&registry)).unwrap();
//! assert_eq!(back, note);
//! ```

pub mod blob;
pub mod decode;
pub mod encode;
pub mod entity;
pub mod equality;
pub mod error;
pub mod persist;
pub mod schema;
pub mod validate;

#[cfg(test)]
mod fixtures;

pub use blob::{BincodeCodec, BlobCodec, CodecRegistry, JsonCodec};
pub use decode::{apply_field, apply_known_field, construct, decode, DecodeContext, LookupMemo};
pub use encode::{dump, encode, identity_value, EncodeContext, EncodeOptions};
pub use entity::{Entity, FieldReader, FieldWriter};
pub use equality::encoded_eq;
pub use error::{CodecError, CodecResult};
pub use persist::{Embedded, Opaque, Persist, Ref, Scalar};
pub use schema::{EntitySchema, DEFAULT_ID_FIELD, RESERVED_PREFIX};
pub use validate::{present_fields, validate};
