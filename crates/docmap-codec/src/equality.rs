use std::any::TypeId;

use crate::blob::CodecRegistry;
use crate::encode::{encode, EncodeOptions};
use crate::entity::Entity;
use crate::error::CodecResult;

/// Two entities are equal when they have the same type and encode to the
/// same document.
///
/// Opaque fields compare by their encoded bytes, so both sides need a
/// registered codec.
pub fn encoded_eq<A: Entity, B: Entity>(a: &A, b: &B, registry: &CodecRegistry) -> CodecResult<bool> {
    if TypeId::of::<A>() != TypeId::of::<B>() {
        return Ok(false);
    }
    let options = EncodeOptions::new();
    Ok(encode(a, registry, &options)? == encode(b, registry, &options)?)
}
