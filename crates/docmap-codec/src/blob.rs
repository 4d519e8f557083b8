use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{CodecError, CodecResult};

/// Serialization strategy for one opaque field type.
///
/// Opaque values have no structural encoding; a registered `BlobCodec`
/// turns them into bytes and back. The byte layout only needs to be stable
/// for the codec that produced it.
pub trait BlobCodec<T>: Send + Sync {
    fn encode(&self, value: &T) -> CodecResult<Vec<u8>>;
    fn decode(&self, bytes: &[u8]) -> CodecResult<T>;
}

fn blob_error<T>(err: impl fmt::Display) -> CodecError {
    CodecError::Blob {
        type_name: type_name::<T>(),
        reason: err.to_string(),
    }
}

/// Compact binary encoding via `bincode`.
pub struct BincodeCodec<T>(PhantomData<fn() -> T>);

impl<T> BincodeCodec<T> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> Default for BincodeCodec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Serialize + DeserializeOwned> BlobCodec<T> for BincodeCodec<T> {
    fn encode(&self, value: &T) -> CodecResult<Vec<u8>> {
        bincode::serialize(value).map_err(blob_error::<T>)
    }

    fn decode(&self, bytes: &[u8]) -> CodecResult<T> {
        bincode::deserialize(bytes).map_err(blob_error::<T>)
    }
}

/// Self-describing encoding via `serde_json`; larger, but readable in storage dumps.
pub struct JsonCodec<T>(PhantomData<fn() -> T>);

impl<T> JsonCodec<T> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> Default for JsonCodec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Serialize + DeserializeOwned> BlobCodec<T> for JsonCodec<T> {
    fn encode(&self, value: &T) -> CodecResult<Vec<u8>> {
        serde_json::to_vec(value).map_err(blob_error::<T>)
    }

    fn decode(&self, bytes: &[u8]) -> CodecResult<T> {
        serde_json::from_slice(bytes).map_err(blob_error::<T>)
    }
}

/// Blob codecs keyed by the Rust type they serialize.
///
/// Encoding or decoding an opaque value whose type was never registered is a
/// configuration error ([`CodecError::UnregisteredCodec`]).
#[derive(Default)]
pub struct CodecRegistry {
    // Values are `Box<dyn BlobCodec<T>>` for the `T` named by the key.
    codecs: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
    names: Vec<&'static str>,
}

impl CodecRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `codec` for `T`, replacing any previous codec for that type.
    pub fn register<T, C>(&mut self, codec: C) -> &mut Self
    where
        T: 'static,
        C: BlobCodec<T> + 'static,
    {
        let boxed: Box<dyn BlobCodec<T>> = Box::new(codec);
        if self
            .codecs
            .insert(TypeId::of::<T>(), Box::new(boxed))
            .is_none()
        {
            self.names.push(type_name::<T>());
        }
        self
    }

    /// Builder-style [`register`](Self::register).
    pub fn with<T, C>(mut self, codec: C) -> Self
    where
        T: 'static,
        C: BlobCodec<T> + 'static,
    {
        self.register::<T, C>(codec);
        self
    }

    /// Register the bincode strategy for `T`.
    pub fn register_bincode<T>(&mut self) -> &mut Self
    where
        T: Serialize + DeserializeOwned + 'static,
    {
        self.register::<T, _>(BincodeCodec::<T>::new())
    }

    pub fn contains<T: 'static>(&self) -> bool {
        self.codecs.contains_key(&TypeId::of::<T>())
    }

    pub fn len(&self) -> usize {
        self.codecs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codecs.is_empty()
    }

    fn codec<T: 'static>(&self) -> CodecResult<&dyn BlobCodec<T>> {
        self.codecs
            .get(&TypeId::of::<T>())
            .and_then(|c| c.downcast_ref::<Box<dyn BlobCodec<T>>>())
            .map(|c| &**c)
            .ok_or(CodecError::UnregisteredCodec(type_name::<T>()))
    }

    pub fn encode<T: 'static>(&self, value: &T) -> CodecResult<Vec<u8>> {
        self.codec::<T>()?.encode(value)
    }

    pub fn decode<T: 'static>(&self, bytes: &[u8]) -> CodecResult<T> {
        self.codec::<T>()?.decode(bytes)
    }
}

impl fmt::Debug for CodecRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CodecRegistry")
            .field("types", &self.names)
            .finish()
    }
}
