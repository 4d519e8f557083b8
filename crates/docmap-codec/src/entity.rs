use std::cell::Cell;
use std::collections::BTreeSet;

use docmap_types::{Document, FieldValue, Value};
use tracing::trace;

use crate::decode::DecodeContext;
use crate::encode::EncodeContext;
use crate::error::CodecResult;
use crate::persist::Persist;
use crate::schema::EntitySchema;

/// A persisted object type.
///
/// Implementations declare their persisted fields explicitly: `write_fields`
/// hands every field to the writer in declaration order, and `read_field`
/// assigns one decoded field by name. Fields are usually `Option<T>`, where
/// `None` means the field is unset; a field name the entity does not know is
/// ignored by leaving it out of the `match`.
pub trait Entity: Default + 'static {
    /// Static schema of this type.
    fn schema() -> &'static EntitySchema;

    /// Offer every persisted field to `out`.
    fn write_fields(&self, out: &mut FieldWriter<'_>) -> CodecResult<()>;

    /// Assign one field from stored data.
    fn read_field(&mut self, name: &str, input: FieldReader<'_>) -> CodecResult<()>;
}

enum Mode<'a> {
    Encode {
        ctx: &'a EncodeContext<'a>,
        suppress: &'a BTreeSet<String>,
        unset_as_null: bool,
        out: Document,
    },
    Probe {
        present: Vec<String>,
    },
    Capture {
        ctx: &'a EncodeContext<'a>,
        target: &'a str,
        found: Option<FieldValue>,
    },
}

/// Sink an entity writes its fields into.
///
/// The same `write_fields` implementation drives full encoding, presence
/// checks for validation, and identity lookup.
pub struct FieldWriter<'a> {
    schema: &'static EntitySchema,
    mode: Mode<'a>,
}

impl<'a> FieldWriter<'a> {
    pub(crate) fn encoding(
        schema: &'static EntitySchema,
        ctx: &'a EncodeContext<'a>,
        suppress: &'a BTreeSet<String>,
        unset_as_null: bool,
    ) -> Self {
        Self {
            schema,
            mode: Mode::Encode {
                ctx,
                suppress,
                unset_as_null,
                out: Document::new(),
            },
        }
    }

    pub(crate) fn probing(schema: &'static EntitySchema) -> Self {
        Self {
            schema,
            mode: Mode::Probe {
                present: Vec::new(),
            },
        }
    }

    pub(crate) fn capturing(
        schema: &'static EntitySchema,
        ctx: &'a EncodeContext<'a>,
        target: &'a str,
    ) -> Self {
        Self {
            schema,
            mode: Mode::Capture {
                ctx,
                target,
                found: None,
            },
        }
    }

    /// Write an optional field; `None` leaves it out of the document unless
    /// the encoding asked for unset fields as `null`.
    pub fn field<T: Persist>(&mut self, name: &str, value: &Option<T>) -> CodecResult<()> {
        match value {
            Some(value) => self.value(name, value),
            None => self.unset(name),
        }
    }

    /// Write a field that is always set.
    ///
    /// A value that is itself null (such as `Value::Null`) is treated as
    /// unset, since it reads back as `None`.
    pub fn value<T: Persist>(&mut self, name: &str, value: &T) -> CodecResult<()> {
        if self.schema.is_reserved(name) {
            trace!(entity = self.schema.type_name, field = name, "skipping reserved field");
            return Ok(());
        }
        if value.is_null() {
            return self.unset(name);
        }

        match &mut self.mode {
            Mode::Encode {
                ctx, suppress, out, ..
            } => {
                if !writable(self.schema, suppress, out, name) {
                    return Ok(());
                }
                let encoded = value.to_field(*ctx).map_err(|e| e.at_field(name))?;
                out.insert(name, encoded.into_wire());
            }
            Mode::Probe { present } => {
                if !present.iter().any(|p| p == name) {
                    present.push(name.to_owned());
                }
            }
            Mode::Capture { ctx, target, found } => {
                if found.is_none() && *target == name {
                    *found = Some(value.to_field(*ctx).map_err(|e| e.at_field(name))?);
                }
            }
        }
        Ok(())
    }

    fn unset(&mut self, name: &str) -> CodecResult<()> {
        if let Mode::Encode {
            suppress,
            unset_as_null: true,
            out,
            ..
        } = &mut self.mode
        {
            if !self.schema.is_reserved(name) && writable(self.schema, suppress, out, name) {
                out.insert(name, Value::Null);
            }
        }
        Ok(())
    }

    pub(crate) fn into_document(self) -> Document {
        match self.mode {
            Mode::Encode { out, .. } => out,
            Mode::Probe { .. } | Mode::Capture { .. } => Document::new(),
        }
    }

    pub(crate) fn into_present(self) -> Vec<String> {
        match self.mode {
            Mode::Probe { present } => present,
            Mode::Encode { .. } | Mode::Capture { .. } => Vec::new(),
        }
    }

    pub(crate) fn into_captured(self) -> Option<FieldValue> {
        match self.mode {
            Mode::Capture { found, .. } => found,
            Mode::Encode { .. } | Mode::Probe { .. } => None,
        }
    }
}

fn writable(
    schema: &EntitySchema,
    suppress: &BTreeSet<String>,
    out: &Document,
    name: &str,
) -> bool {
    if suppress.contains(name) {
        return false;
    }
    if out.contains_key(name) {
        trace!(
            entity = schema.type_name,
            field = name,
            "field already written, keeping first value"
        );
        return false;
    }
    true
}

/// One stored field on its way into an entity.
///
/// Reading the value through [`read`](Self::read) or [`raw`](Self::raw)
/// marks the field as declared by the entity.
pub struct FieldReader<'a> {
    name: &'a str,
    raw: &'a Value,
    ctx: &'a DecodeContext<'a>,
    claimed: &'a Cell<bool>,
}

impl<'a> FieldReader<'a> {
    pub(crate) fn new(
        name: &'a str,
        raw: &'a Value,
        ctx: &'a DecodeContext<'a>,
        claimed: &'a Cell<bool>,
    ) -> Self {
        Self {
            name,
            raw,
            ctx,
            claimed,
        }
    }

    pub fn name(&self) -> &str {
        self.name
    }

    /// The stored value before classification.
    pub fn raw(&self) -> &Value {
        self.claimed.set(true);
        self.raw
    }

    /// Decode the field as `T`.
    ///
    /// Returns `Ok(None)` for a stored `null` and for a reference whose
    /// target no longer exists.
    pub fn read<T: Persist>(self) -> CodecResult<Option<T>> {
        self.claimed.set(true);
        let field = FieldValue::from_wire(self.raw.clone());
        T::from_field(field, self.ctx).map_err(|e| e.at_field(self.name))
    }
}
