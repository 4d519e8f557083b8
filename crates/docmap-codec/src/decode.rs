use std::cell::Cell;
use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;

use docmap_store::{DocumentStore, Filter};
use docmap_types::{Document, FieldValue, Value};
use tracing::{debug, trace};

use crate::blob::CodecRegistry;
use crate::entity::{Entity, FieldReader};
use crate::error::{CodecError, CodecResult};
use crate::schema::EntitySchema;
use crate::validate::validate;

/// Reference targets already fetched, keyed by collection and filter.
///
/// Lets several decodes of the same stored values share one lookup per
/// target.
#[derive(Debug, Default)]
pub struct LookupMemo {
    fetched: Mutex<HashMap<(String, String), Option<Document>>>,
}

impl LookupMemo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.fetched.lock().expect("lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Collaborators available while decoding.
///
/// The store is only consulted for reference fields; decoding documents
/// without references works without one.
#[derive(Clone, Copy)]
pub struct DecodeContext<'a> {
    registry: &'a CodecRegistry,
    store: Option<&'a dyn DocumentStore>,
    memo: Option<&'a LookupMemo>,
}

impl<'a> DecodeContext<'a> {
    pub fn new(registry: &'a CodecRegistry) -> Self {
        Self {
            registry,
            store: None,
            memo: None,
        }
    }

    pub fn with_store(self, store: &'a dyn DocumentStore) -> Self {
        Self {
            store: Some(store),
            ..self
        }
    }

    /// Serve repeated reference lookups from `memo`.
    pub fn with_memo(self, memo: &'a LookupMemo) -> Self {
        Self {
            memo: Some(memo),
            ..self
        }
    }

    pub fn registry(&self) -> &'a CodecRegistry {
        self.registry
    }

    pub fn store(&self) -> CodecResult<&'a dyn DocumentStore> {
        self.store.ok_or(CodecError::NoStore)
    }

    /// Load the `E` whose `id_field` equals `id_value`.
    ///
    /// Issues exactly one lookup, or none when the memo already holds the
    /// target. A missing target yields `Ok(None)`.
    pub fn resolve<E: Entity>(&self, id_field: &str, id_value: Value) -> CodecResult<Option<E>> {
        let schema = E::schema();
        let filter = Filter::eq(id_field, id_value);
        match self.fetch(schema.collection, &filter)? {
            Some(doc) => construct::<E>(&doc, self).map(Some),
            None => {
                debug!(entity = schema.type_name, %filter, "reference target not found");
                Ok(None)
            }
        }
    }

    fn fetch(&self, collection: &str, filter: &Filter) -> CodecResult<Option<Document>> {
        let store = self.store()?;
        let key = (collection.to_owned(), filter.to_string());
        if let Some(memo) = self.memo {
            if let Some(hit) = memo.fetched.lock().expect("lock poisoned").get(&key) {
                trace!(collection, %filter, "reference served from memo");
                return Ok(hit.clone());
            }
        }

        debug!(collection, %filter, "resolving reference");
        let found = store.find_one(collection, filter)?;
        if let Some(memo) = self.memo {
            memo.fetched
                .lock()
                .expect("lock poisoned")
                .insert(key, found.clone());
        }
        Ok(found)
    }
}

impl fmt::Debug for DecodeContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecodeContext")
            .field("registry", self.registry)
            .field("has_store", &self.store.is_some())
            .field("memo", &self.memo)
            .finish()
    }
}

/// Rebuild an entity from a stored document without validating it.
///
/// Keys the entity does not declare are ignored, as are reserved keys. A
/// stored `null` leaves the field unset.
pub fn decode<E: Entity>(document: &Document, ctx: &DecodeContext<'_>) -> CodecResult<E> {
    let mut entity = E::default();
    for (name, raw) in document {
        apply_field(&mut entity, name, raw, ctx)?;
    }
    Ok(entity)
}

/// Assign one stored field onto an existing entity.
///
/// Applies the same rules as [`decode`]: reserved keys are skipped and a
/// `null` unsets the field.
pub fn apply_field<E: Entity>(
    entity: &mut E,
    name: &str,
    raw: &Value,
    ctx: &DecodeContext<'_>,
) -> CodecResult<()> {
    apply_known_field(entity, name, raw, ctx).map(|_| ())
}

/// Like [`apply_field`], and reports whether the entity declares `name`.
///
/// A field counts as declared once `read_field` reads it, whatever the
/// decoded result: a `null` or a dangling reference still counts.
pub fn apply_known_field<E: Entity>(
    entity: &mut E,
    name: &str,
    raw: &Value,
    ctx: &DecodeContext<'_>,
) -> CodecResult<bool> {
    let schema = E::schema();
    if schema.is_reserved(name) {
        trace!(entity = schema.type_name, field = name, "skipping reserved key");
        return Ok(false);
    }
    let claimed = Cell::new(false);
    entity.read_field(name, FieldReader::new(name, raw, ctx, &claimed))?;
    Ok(claimed.get())
}

/// Decode and validate: the path every stored record takes into memory.
pub fn construct<E: Entity>(document: &Document, ctx: &DecodeContext<'_>) -> CodecResult<E> {
    let entity = decode::<E>(document, ctx)?;
    validate(&entity)?;
    Ok(entity)
}

fn check_tag(schema: &EntitySchema, tag: Option<&str>) -> CodecResult<()> {
    match tag {
        Some(found) if found != schema.type_name => Err(CodecError::EntityMismatch {
            expected: schema.type_name,
            found: found.to_owned(),
        }),
        _ => Ok(()),
    }
}

/// Decode an entity-typed field from any of the shapes that may hold one.
pub(crate) fn decode_entity_field<E: Entity>(
    field: FieldValue,
    ctx: &DecodeContext<'_>,
) -> CodecResult<Option<E>> {
    let schema = E::schema();
    match field {
        FieldValue::Scalar(Value::Null) => Ok(None),
        FieldValue::Scalar(Value::Map(body)) => construct::<E>(&Document::from(body), ctx).map(Some),
        FieldValue::Embedded { type_name, data } => {
            check_tag(schema, type_name.as_deref())?;
            construct::<E>(&data, ctx).map(Some)
        }
        FieldValue::Reference {
            type_name,
            id_field,
            id_value,
        } => {
            check_tag(schema, Some(&type_name))?;
            ctx.resolve::<E>(&id_field, id_value)
        }
        FieldValue::Scalar(other) => Err(CodecError::mismatch(schema.type_name, other.kind())),
        other @ FieldValue::Binary(_) => Err(CodecError::mismatch(schema.type_name, other.kind())),
    }
}
