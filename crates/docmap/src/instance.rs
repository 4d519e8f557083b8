use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use docmap_codec::{apply_field, encoded_eq, identity_value, CodecRegistry, DecodeContext, Entity};
use docmap_types::Value;
use tracing::debug;

use crate::error::{OdmError, OdmResult};

/// An entity held by a session.
///
/// Read access goes through `Deref`. In-memory changes go through
/// [`edit`](Self::edit), which keeps the identity fixed; stored changes go
/// through the session's update operations.
pub struct Instance<E: Entity> {
    entity: E,
    registry: Arc<CodecRegistry>,
}

impl<E: Entity> Instance<E> {
    pub(crate) fn new(entity: E, registry: Arc<CodecRegistry>) -> Self {
        Self { entity, registry }
    }

    pub fn entity(&self) -> &E {
        &self.entity
    }

    pub fn into_inner(self) -> E {
        self.entity
    }

    /// Current identity value, if set.
    pub fn identity(&self) -> OdmResult<Option<Value>> {
        Ok(identity_value(&self.entity, &self.registry)?)
    }

    /// Mutate the in-memory entity. Nothing is written to storage.
    ///
    /// An unset identity may be assigned here. Once set, if `f` changes the
    /// identity field the original identity is put back and
    /// [`OdmError::IdentityImmutable`] is returned; other changes made by `f`
    /// are kept.
    pub fn edit<F>(&mut self, f: F) -> OdmResult<()>
    where
        F: FnOnce(&mut E),
    {
        let before = self.identity()?;
        f(&mut self.entity);
        let Some(before) = before else {
            return Ok(());
        };
        if self.identity()?.as_ref() == Some(&before) {
            return Ok(());
        }

        let schema = E::schema();
        debug!(entity = schema.type_name, field = schema.id_field, "restoring identity after edit");
        self.set_field(schema.id_field, &before)?;
        Err(OdmError::IdentityImmutable {
            entity: schema.type_name,
            field: schema.id_field,
        })
    }

    pub(crate) fn set_field(&mut self, name: &str, value: &Value) -> OdmResult<()> {
        let ctx = DecodeContext::new(&self.registry);
        Ok(apply_field(&mut self.entity, name, value, &ctx)?)
    }

    pub(crate) fn entity_mut(&mut self) -> &mut E {
        &mut self.entity
    }
}

impl<E: Entity> Deref for Instance<E> {
    type Target = E;

    fn deref(&self) -> &E {
        &self.entity
    }
}

/// Same type and same full encoding. An encoding failure compares unequal.
impl<E: Entity> PartialEq for Instance<E> {
    fn eq(&self, other: &Self) -> bool {
        encoded_eq(&self.entity, &other.entity, &self.registry).unwrap_or(false)
    }
}

impl<E: Entity + fmt::Debug> fmt::Debug for Instance<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Instance").field(&self.entity).finish()
    }
}
