//! Entities and a call-counting store for the session tests.

use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::{DateTime, Utc};
use docmap_codec::{
    CodecResult, Entity, EntitySchema, FieldReader, FieldWriter, Opaque, Ref,
};
use docmap_store::{DocumentStore, Filter, InMemoryDocumentStore, Pipeline, StoreResult};
use docmap_types::Document;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct Account {
    pub user_id: Option<String>,
    pub balance: Option<f64>,
    pub nickname: Option<String>,
    pub created: Option<DateTime<Utc>>,
    pub session_token: Option<String>,
}

static ACCOUNT: EntitySchema = EntitySchema::new("Account", "accounts")
    .with_id_field("user_id")
    .ignoring(&["session_token"])
    .marshaling(&["user_id", "balance"])
    .requiring(&["user_id"]);

impl Entity for Account {
    fn schema() -> &'static EntitySchema {
        &ACCOUNT
    }

    fn write_fields(&self, out: &mut FieldWriter<'_>) -> CodecResult<()> {
        out.field("user_id", &self.user_id)?;
        out.field("balance", &self.balance)?;
        out.field("nickname", &self.nickname)?;
        out.field("created", &self.created)?;
        out.field("session_token", &self.session_token)
    }

    fn read_field(&mut self, name: &str, input: FieldReader<'_>) -> CodecResult<()> {
        match name {
            "user_id" => self.user_id = input.read()?,
            "balance" => self.balance = input.read()?,
            "nickname" => self.nickname = input.read()?,
            "created" => self.created = input.read()?,
            "session_token" => self.session_token = input.read()?,
            _ => {}
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub(crate) struct Snapshot {
    pub version: u32,
    pub entries: Vec<String>,
}

/// Uses the default `_id` identity.
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct Order {
    pub id: Option<String>,
    pub buyer: Option<Ref<Account>>,
    pub snapshot: Option<Opaque<Snapshot>>,
}

static ORDER: EntitySchema = EntitySchema::new("Order", "orders");

impl Entity for Order {
    fn schema() -> &'static EntitySchema {
        &ORDER
    }

    fn write_fields(&self, out: &mut FieldWriter<'_>) -> CodecResult<()> {
        out.field("_id", &self.id)?;
        out.field("buyer", &self.buyer)?;
        out.field("snapshot", &self.snapshot)
    }

    fn read_field(&mut self, name: &str, input: FieldReader<'_>) -> CodecResult<()> {
        match name {
            "_id" => self.id = input.read()?,
            "buyer" => self.buyer = input.read()?,
            "snapshot" => self.snapshot = input.read()?,
            _ => {}
        }
        Ok(())
    }
}

/// Delegates to an in-memory store and counts selected calls.
#[derive(Default)]
pub(crate) struct RecordingStore {
    inner: InMemoryDocumentStore,
    exists_checks: AtomicUsize,
    lookups: AtomicUsize,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inner(&self) -> &InMemoryDocumentStore {
        &self.inner
    }

    pub fn exists_checks(&self) -> usize {
        self.exists_checks.load(Ordering::SeqCst)
    }

    /// Number of `find_one` calls.
    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

impl DocumentStore for RecordingStore {
    fn collection_exists(&self, name: &str) -> StoreResult<bool> {
        self.exists_checks.fetch_add(1, Ordering::SeqCst);
        self.inner.collection_exists(name)
    }

    fn create_collection(&self, name: &str) -> StoreResult<()> {
        self.inner.create_collection(name)
    }

    fn create_unique_index(&self, collection: &str, field: &str) -> StoreResult<()> {
        self.inner.create_unique_index(collection, field)
    }

    fn insert_one(&self, collection: &str, document: &Document) -> StoreResult<()> {
        self.inner.insert_one(collection, document)
    }

    fn update_one(
        &self,
        collection: &str,
        filter: &Filter,
        updates: &Document,
    ) -> StoreResult<bool> {
        self.inner.update_one(collection, filter, updates)
    }

    fn delete_one(&self, collection: &str, filter: &Filter) -> StoreResult<bool> {
        self.inner.delete_one(collection, filter)
    }

    fn find_one(&self, collection: &str, filter: &Filter) -> StoreResult<Option<Document>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.inner.find_one(collection, filter)
    }

    fn find(&self, collection: &str, filter: &Filter, limit: usize) -> StoreResult<Vec<Document>> {
        self.inner.find(collection, filter, limit)
    }

    fn aggregate(&self, collection: &str, pipeline: &Pipeline) -> StoreResult<Vec<Document>> {
        self.inner.aggregate(collection, pipeline)
    }

    fn count(&self, collection: &str, filter: &Filter) -> StoreResult<u64> {
        self.inner.count(collection, filter)
    }
}
