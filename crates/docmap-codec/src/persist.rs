use std::collections::{BTreeMap, BTreeSet};
use std::ops::{Deref, DerefMut};

use chrono::{DateTime, Utc};
use docmap_types::{field::BINARY_TAG, FieldValue, TypeError, Value};

use crate::decode::{decode_entity_field, DecodeContext};
use crate::encode::{encode_with, identity_with, EncodeContext};
use crate::entity::Entity;
use crate::error::{CodecError, CodecResult};

/// A type that can be stored as one entity field.
///
/// Plain values implement [`Scalar`] and get this trait through a blanket
/// impl. The wrappers [`Embedded`], [`Ref`] and [`Opaque`] select the other
/// three field representations.
pub trait Persist: Sized {
    fn to_field(&self, ctx: &EncodeContext<'_>) -> CodecResult<FieldValue>;

    /// Rebuild the value. `Ok(None)` leaves the field unset.
    fn from_field(field: FieldValue, ctx: &DecodeContext<'_>) -> CodecResult<Option<Self>>;

    /// Whether this value would be stored as `null`. Such values are written
    /// as unset fields.
    fn is_null(&self) -> bool {
        false
    }
}

/// A value stored verbatim as a [`Value`].
pub trait Scalar: Sized {
    /// Name used in type-mismatch errors.
    const KIND: &'static str;

    fn to_value(&self) -> Value;
    fn from_value(value: Value) -> Result<Self, TypeError>;

    fn holds_null(&self) -> bool {
        false
    }
}

fn mismatch<T: Scalar>(found: &Value) -> TypeError {
    TypeError::Mismatch {
        expected: T::KIND,
        found: found.kind(),
    }
}

impl Scalar for bool {
    const KIND: &'static str = "bool";

    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }

    fn from_value(value: Value) -> Result<Self, TypeError> {
        match value {
            Value::Bool(b) => Ok(b),
            other => Err(mismatch::<Self>(&other)),
        }
    }
}

impl Scalar for i64 {
    const KIND: &'static str = "int";

    fn to_value(&self) -> Value {
        Value::Int(*self)
    }

    fn from_value(value: Value) -> Result<Self, TypeError> {
        match value {
            Value::Int(i) => Ok(i),
            other => Err(mismatch::<Self>(&other)),
        }
    }
}

impl Scalar for i32 {
    const KIND: &'static str = "int";

    fn to_value(&self) -> Value {
        Value::Int(i64::from(*self))
    }

    fn from_value(value: Value) -> Result<Self, TypeError> {
        match value {
            Value::Int(i) => i32::try_from(i).map_err(|_| TypeError::OutOfRange(i)),
            other => Err(mismatch::<Self>(&other)),
        }
    }
}

impl Scalar for u32 {
    const KIND: &'static str = "int";

    fn to_value(&self) -> Value {
        Value::Int(i64::from(*self))
    }

    fn from_value(value: Value) -> Result<Self, TypeError> {
        match value {
            Value::Int(i) => u32::try_from(i).map_err(|_| TypeError::OutOfRange(i)),
            other => Err(mismatch::<Self>(&other)),
        }
    }
}

impl Scalar for f64 {
    const KIND: &'static str = "float";

    fn to_value(&self) -> Value {
        Value::Float(*self)
    }

    // Integral floats may come back from storage as ints.
    fn from_value(value: Value) -> Result<Self, TypeError> {
        match value {
            Value::Float(f) => Ok(f),
            Value::Int(i) => Ok(i as f64),
            other => Err(mismatch::<Self>(&other)),
        }
    }
}

impl Scalar for String {
    const KIND: &'static str = "string";

    fn to_value(&self) -> Value {
        Value::String(self.clone())
    }

    fn from_value(value: Value) -> Result<Self, TypeError> {
        match value {
            Value::String(s) => Ok(s),
            other => Err(mismatch::<Self>(&other)),
        }
    }
}

impl Scalar for DateTime<Utc> {
    const KIND: &'static str = "timestamp";

    fn to_value(&self) -> Value {
        Value::Timestamp(*self)
    }

    /// Accepts numeric epoch seconds as written by compact encodings.
    fn from_value(value: Value) -> Result<Self, TypeError> {
        value.as_timestamp().ok_or_else(|| mismatch::<Self>(&value))
    }
}

impl Scalar for Value {
    const KIND: &'static str = "value";

    fn to_value(&self) -> Value {
        self.clone()
    }

    fn from_value(value: Value) -> Result<Self, TypeError> {
        Ok(value)
    }

    fn holds_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl<T: Scalar> Scalar for Vec<T> {
    const KIND: &'static str = "list";

    fn to_value(&self) -> Value {
        Value::List(self.iter().map(Scalar::to_value).collect())
    }

    fn from_value(value: Value) -> Result<Self, TypeError> {
        match value {
            Value::List(items) | Value::Tuple(items) => {
                items.into_iter().map(T::from_value).collect()
            }
            other => Err(mismatch::<Self>(&other)),
        }
    }
}

impl<T: Scalar> Scalar for BTreeMap<String, T> {
    const KIND: &'static str = "map";

    fn to_value(&self) -> Value {
        Value::Map(
            self.iter()
                .map(|(k, v)| (k.clone(), v.to_value()))
                .collect(),
        )
    }

    fn from_value(value: Value) -> Result<Self, TypeError> {
        match value {
            Value::Map(entries) => entries
                .into_iter()
                .map(|(k, v)| T::from_value(v).map(|v| (k, v)))
                .collect(),
            other => Err(mismatch::<Self>(&other)),
        }
    }
}

impl<A: Scalar, B: Scalar> Scalar for (A, B) {
    const KIND: &'static str = "pair";

    fn to_value(&self) -> Value {
        Value::Tuple(vec![self.0.to_value(), self.1.to_value()])
    }

    fn from_value(value: Value) -> Result<Self, TypeError> {
        match value {
            Value::Tuple(items) | Value::List(items) if items.len() == 2 => {
                let mut items = items.into_iter();
                match (items.next(), items.next()) {
                    (Some(a), Some(b)) => Ok((A::from_value(a)?, B::from_value(b)?)),
                    _ => Err(TypeError::Mismatch {
                        expected: Self::KIND,
                        found: "tuple",
                    }),
                }
            }
            other => Err(mismatch::<Self>(&other)),
        }
    }
}

impl<A: Scalar, B: Scalar, C: Scalar> Scalar for (A, B, C) {
    const KIND: &'static str = "triple";

    fn to_value(&self) -> Value {
        Value::Tuple(vec![
            self.0.to_value(),
            self.1.to_value(),
            self.2.to_value(),
        ])
    }

    fn from_value(value: Value) -> Result<Self, TypeError> {
        match value {
            Value::Tuple(items) | Value::List(items) if items.len() == 3 => {
                let mut items = items.into_iter();
                match (items.next(), items.next(), items.next()) {
                    (Some(a), Some(b), Some(c)) => {
                        Ok((A::from_value(a)?, B::from_value(b)?, C::from_value(c)?))
                    }
                    _ => Err(TypeError::Mismatch {
                        expected: Self::KIND,
                        found: "tuple",
                    }),
                }
            }
            other => Err(mismatch::<Self>(&other)),
        }
    }
}

impl<T: Scalar> Persist for T {
    fn to_field(&self, ctx: &EncodeContext<'_>) -> CodecResult<FieldValue> {
        let value = self.to_value();
        Ok(FieldValue::Scalar(if ctx.compact_timestamps() {
            value.compact()
        } else {
            value
        }))
    }

    fn from_field(field: FieldValue, _ctx: &DecodeContext<'_>) -> CodecResult<Option<Self>> {
        match field {
            FieldValue::Scalar(Value::Null) => Ok(None),
            FieldValue::Scalar(value) => Ok(Some(T::from_value(value)?)),
            // A scalar slot that can hold maps (e.g. `Value`) takes the wrapper verbatim.
            other => {
                let kind = other.kind();
                T::from_value(other.into_wire())
                    .map(Some)
                    .map_err(|_| CodecError::mismatch(T::KIND, kind))
            }
        }
    }

    fn is_null(&self) -> bool {
        self.holds_null()
    }
}

macro_rules! newtype_wrapper {
    ($name:ident) => {
        impl<T> $name<T> {
            pub fn into_inner(self) -> T {
                self.0
            }
        }

        impl<T> Deref for $name<T> {
            type Target = T;

            fn deref(&self) -> &T {
                &self.0
            }
        }

        impl<T> DerefMut for $name<T> {
            fn deref_mut(&mut self) -> &mut T {
                &mut self.0
            }
        }

        impl<T> From<T> for $name<T> {
            fn from(inner: T) -> Self {
                Self(inner)
            }
        }
    };
}

/// A sub-entity owned by its parent and stored inline.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Embedded<E>(pub E);

/// A sub-entity stored separately and written as a pointer to its identity.
///
/// Decoding looks the target up in the store; a dangling pointer leaves the
/// field unset.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Ref<E>(pub E);

/// A value with no structural encoding, stored through a registered
/// [`BlobCodec`](crate::BlobCodec).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Opaque<T>(pub T);

newtype_wrapper!(Embedded);
newtype_wrapper!(Ref);
newtype_wrapper!(Opaque);

impl<E: Entity> Persist for Embedded<E> {
    fn to_field(&self, ctx: &EncodeContext<'_>) -> CodecResult<FieldValue> {
        let data = encode_with(&self.0, ctx, &BTreeSet::new(), false)?;
        Ok(FieldValue::Embedded {
            type_name: None,
            data,
        })
    }

    fn from_field(field: FieldValue, ctx: &DecodeContext<'_>) -> CodecResult<Option<Self>> {
        Ok(decode_entity_field::<E>(field, ctx)?.map(Embedded))
    }
}

impl<E: Entity> Persist for Ref<E> {
    fn to_field(&self, ctx: &EncodeContext<'_>) -> CodecResult<FieldValue> {
        let schema = E::schema();
        let id_value =
            identity_with(&self.0, ctx)?.ok_or(CodecError::MissingIdentity(schema.type_name))?;
        Ok(FieldValue::Reference {
            type_name: schema.type_name.to_owned(),
            id_field: schema.id_field.to_owned(),
            id_value,
        })
    }

    fn from_field(field: FieldValue, ctx: &DecodeContext<'_>) -> CodecResult<Option<Self>> {
        Ok(decode_entity_field::<E>(field, ctx)?.map(Ref))
    }
}

impl<T: 'static> Persist for Opaque<T> {
    fn to_field(&self, ctx: &EncodeContext<'_>) -> CodecResult<FieldValue> {
        Ok(FieldValue::Binary(ctx.registry().encode(&self.0)?))
    }

    fn from_field(field: FieldValue, ctx: &DecodeContext<'_>) -> CodecResult<Option<Self>> {
        match field {
            FieldValue::Binary(bytes) => Ok(Some(Opaque(ctx.registry().decode::<T>(&bytes)?))),
            FieldValue::Scalar(Value::Null) => Ok(None),
            FieldValue::Scalar(other) => Err(CodecError::mismatch(BINARY_TAG, other.kind())),
            other => Err(CodecError::mismatch(BINARY_TAG, other.kind())),
        }
    }
}
