use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Mutex};

use docmap_codec::{
    apply_field, apply_known_field, construct, dump, encode, validate, CodecError, CodecRegistry,
    DecodeContext, EncodeOptions, Entity, LookupMemo,
};
use docmap_store::{DocumentStore, Filter, Pipeline};
use docmap_types::{Document, Value};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::OdmConfig;
use crate::error::{OdmError, OdmResult};
use crate::instance::Instance;

/// Assembles a [`Session`].
#[derive(Default)]
pub struct SessionBuilder {
    store: Option<Arc<dyn DocumentStore>>,
    registry: CodecRegistry,
    config: OdmConfig,
}

impl SessionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store<S: DocumentStore + 'static>(self, store: S) -> Self {
        self.shared_store(Arc::new(store))
    }

    /// Use a store that other code also holds.
    pub fn shared_store(mut self, store: Arc<dyn DocumentStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn registry(mut self, registry: CodecRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Store opaque `T` fields with bincode.
    pub fn register_bincode<T>(mut self) -> Self
    where
        T: Serialize + DeserializeOwned + 'static,
    {
        self.registry.register_bincode::<T>();
        self
    }

    pub fn config(mut self, config: OdmConfig) -> Self {
        self.config = config;
        self
    }

    /// Fails with [`OdmError::NoStore`] when no store was given.
    pub fn build(self) -> OdmResult<Session> {
        let store = self.store.ok_or(OdmError::NoStore)?;
        debug!(
            blob_codecs = self.registry.len(),
            default_limit = self.config.default_limit,
            "session ready"
        );
        Ok(Session {
            store,
            registry: Arc::new(self.registry),
            config: self.config,
            provisioned: Mutex::new(HashSet::new()),
        })
    }
}

/// Storage context for entity instances.
///
/// A session owns the store handle, the blob codec registry and the
/// configuration, and is passed explicitly to every operation. It is
/// `Send + Sync`; share it behind an `Arc`.
pub struct Session {
    store: Arc<dyn DocumentStore>,
    registry: Arc<CodecRegistry>,
    config: OdmConfig,
    /// Collections known to exist, so provisioning checks run once.
    provisioned: Mutex<HashSet<&'static str>>,
}

impl Session {
    pub fn builder() -> SessionBuilder {
        SessionBuilder::new()
    }

    /// A session over `store` with default configuration and no blob codecs.
    pub fn new<S: DocumentStore + 'static>(store: S) -> Self {
        Self {
            store: Arc::new(store),
            registry: Arc::new(CodecRegistry::new()),
            config: OdmConfig::default(),
            provisioned: Mutex::new(HashSet::new()),
        }
    }

    pub fn store(&self) -> &dyn DocumentStore {
        &*self.store
    }

    pub fn registry(&self) -> &CodecRegistry {
        &self.registry
    }

    pub fn config(&self) -> &OdmConfig {
        &self.config
    }

    fn decode_ctx(&self) -> DecodeContext<'_> {
        DecodeContext::new(&self.registry).with_store(&*self.store)
    }

    fn wrap<E: Entity>(&self, entity: E) -> Instance<E> {
        Instance::new(entity, Arc::clone(&self.registry))
    }

    /// Ensure `E`'s collection exists with a unique index on its identity
    /// field. Runs the existence check at most once per collection.
    pub fn provision<E: Entity>(&self) -> OdmResult<()> {
        let schema = E::schema();
        schema.check()?;
        if !self.config.provision_collections {
            return Ok(());
        }

        let mut provisioned = self.provisioned.lock().expect("lock poisoned");
        if provisioned.contains(schema.collection) {
            return Ok(());
        }
        if !self.store.collection_exists(schema.collection)? {
            self.store.create_collection(schema.collection)?;
            self.store
                .create_unique_index(schema.collection, schema.id_field)?;
            info!(
                entity = schema.type_name,
                collection = schema.collection,
                id_field = schema.id_field,
                "provisioned collection"
            );
        }
        provisioned.insert(schema.collection);
        Ok(())
    }

    /// Build an instance from a stored document: decode, then validate.
    pub fn construct<E: Entity>(&self, document: &Document) -> OdmResult<Instance<E>> {
        self.provision::<E>()?;
        let entity = construct::<E>(document, &self.decode_ctx())?;
        Ok(self.wrap(entity))
    }

    /// Adopt an entity built in code, applying the same validation as
    /// [`construct`](Self::construct).
    pub fn instance<E: Entity>(&self, entity: E) -> OdmResult<Instance<E>> {
        self.provision::<E>()?;
        validate(&entity)?;
        Ok(self.wrap(entity))
    }

    /// Insert the instance as a new record, leaving out ignored fields.
    ///
    /// An unset identity is filled with a UUIDv7 string first when
    /// `generate_identity` is on. Any storage failure is reported as
    /// [`OdmError::InsertFailed`].
    pub fn save<E: Entity>(&self, instance: &mut Instance<E>) -> OdmResult<()> {
        let schema = E::schema();
        self.provision::<E>()?;

        if self.config.generate_identity && instance.identity()?.is_none() {
            let id = Uuid::now_v7().to_string();
            debug!(entity = schema.type_name, %id, "assigning generated identity");
            instance.set_field(schema.id_field, &Value::from(id))?;
        }

        let options = EncodeOptions::new().suppress(schema.ignored.iter().copied());
        let doc = encode(instance.entity(), &self.registry, &options)?;
        debug!(
            entity = schema.type_name,
            collection = schema.collection,
            fields = doc.len(),
            "saving"
        );
        self.store.insert_one(schema.collection, &doc).map_err(|e| {
            debug!(entity = schema.type_name, error = %e, "insert failed");
            OdmError::InsertFailed
        })
    }

    /// Push selected fields to storage and mirror them into the instance.
    ///
    /// `updates` holds stored-form values. The identity field, reserved keys
    /// and keys the entity does not declare are skipped with a warning. Each
    /// value is decoded before anything is written, so a bad value leaves
    /// both storage and the instance untouched. A reference is looked up once
    /// and the result reused for the instance; a reference whose target is
    /// missing is still written and leaves the instance field unset.
    pub fn update_fields<E: Entity>(
        &self,
        instance: &mut Instance<E>,
        updates: Document,
    ) -> OdmResult<()> {
        let schema = E::schema();
        let id = require_identity(instance)?;
        let memo = LookupMemo::new();
        let ctx = self.decode_ctx().with_memo(&memo);

        let mut staged = E::default();
        let mut pushed = Document::new();
        for (name, value) in updates {
            if schema.is_identity(&name) || schema.is_reserved(&name) {
                warn!(entity = schema.type_name, field = %name, "refusing to update protected field");
                continue;
            }
            if !apply_known_field(&mut staged, &name, &value, &ctx)? {
                warn!(entity = schema.type_name, field = %name, "skipping undeclared field");
                continue;
            }
            pushed.insert(name, value);
        }

        if pushed.is_empty() {
            debug!(entity = schema.type_name, "no fields to update");
            return Ok(());
        }

        let filter = Filter::eq(schema.id_field, id);
        let matched = self.store.update_one(schema.collection, &filter, &pushed)?;
        debug!(
            entity = schema.type_name,
            %filter,
            fields = pushed.len(),
            matched,
            "updated fields"
        );

        for (name, value) in &pushed {
            apply_field(instance.entity_mut(), name, value, &ctx)?;
        }
        Ok(())
    }

    /// Push every current field except the identity and ignored fields.
    /// Unset fields are pushed as `null` so storage matches the instance.
    pub fn update_all<E: Entity>(&self, instance: &Instance<E>) -> OdmResult<()> {
        let schema = E::schema();
        let id = require_identity(instance)?;
        let options = EncodeOptions::new().unset_as_null(true).suppress(
            schema
                .ignored
                .iter()
                .copied()
                .chain(std::iter::once(schema.id_field)),
        );
        let doc = encode(instance.entity(), &self.registry, &options)?;
        let filter = Filter::eq(schema.id_field, id);
        let matched = self.store.update_one(schema.collection, &filter, &doc)?;
        debug!(
            entity = schema.type_name,
            %filter,
            fields = doc.len(),
            matched,
            "updated all fields"
        );
        Ok(())
    }

    /// Remove the stored record with this instance's identity. The instance
    /// itself is left as it was. Returns whether a record was removed.
    pub fn delete<E: Entity>(&self, instance: &Instance<E>) -> OdmResult<bool> {
        let schema = E::schema();
        let id = require_identity(instance)?;
        let filter = Filter::eq(schema.id_field, id);
        let removed = self.store.delete_one(schema.collection, &filter)?;
        debug!(entity = schema.type_name, %filter, removed, "delete");
        Ok(removed)
    }

    /// First record matching `filter`, if any.
    pub fn get<E: Entity>(&self, filter: &Filter) -> OdmResult<Option<Instance<E>>> {
        let schema = E::schema();
        debug!(entity = schema.type_name, %filter, "get");
        match self.store.find_one(schema.collection, filter)? {
            Some(doc) => self.construct(&doc).map(Some),
            None => Ok(None),
        }
    }

    /// Records matching `filter`, capped at the configured default limit.
    pub fn get_all<E: Entity>(&self, filter: &Filter) -> OdmResult<Vec<Instance<E>>> {
        self.get_all_limited(filter, self.config.default_limit)
    }

    pub fn get_all_limited<E: Entity>(
        &self,
        filter: &Filter,
        limit: usize,
    ) -> OdmResult<Vec<Instance<E>>> {
        let schema = E::schema();
        debug!(entity = schema.type_name, %filter, limit, "get_all");
        self.store
            .find(schema.collection, filter, limit)?
            .iter()
            .map(|doc| self.construct(doc))
            .collect()
    }

    pub fn count<E: Entity>(&self, filter: &Filter) -> OdmResult<u64> {
        Ok(self.store.count(E::schema().collection, filter)?)
    }

    /// Run `pipeline` against `E`'s collection and decode every result.
    pub fn aggregate<E: Entity>(&self, pipeline: &Pipeline) -> OdmResult<Vec<Instance<E>>> {
        let schema = E::schema();
        debug!(entity = schema.type_name, stages = pipeline.len(), "aggregate");
        self.store
            .aggregate(schema.collection, pipeline)?
            .iter()
            .map(|doc| self.construct(doc))
            .collect()
    }

    /// Export an instance, leaving out ignored fields. With `marshaled`, only
    /// the schema's marshaled fields are kept.
    pub fn dump<E: Entity>(&self, instance: &Instance<E>, marshaled: bool) -> OdmResult<Document> {
        Ok(dump(
            instance.entity(),
            &self.registry,
            marshaled,
            self.config.compact_dump_timestamps,
        )?)
    }
}

fn require_identity<E: Entity>(instance: &Instance<E>) -> OdmResult<Value> {
    instance
        .identity()?
        .ok_or_else(|| CodecError::MissingIdentity(E::schema().type_name).into())
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("registry", &self.registry)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
