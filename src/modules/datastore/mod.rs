//! Document store access
//!
//! `Datastore` is the seam every feature talks to. `Db` wraps it in the
//! collection-oriented style used by the rest of the code:
//!
//! ```ignore
//! let faq = db.class("FAQ").object("5f1c...");
//! db.class("Category").update(&id, &Patch::new().unset("parent")).await?;
//! ```

mod error;
mod leancloud_client;
mod memory_store;
mod postgres_store;
mod types;

use std::sync::Arc;

use async_trait::async_trait;

pub use error::DatastoreError;
pub use leancloud_client::LeanCloudClient;
pub use memory_store::MemoryStore;
pub use postgres_store::PgDocumentStore;
pub use types::{
    date_value, parse_date, Constraint, Document, FieldOp, Fields, Patch, Pointer, Query,
};

pub type DatastoreResult<T> = std::result::Result<T, DatastoreError>;

#[async_trait]
pub trait Datastore: Send + Sync {
    /// Short backend name for logs
    fn backend_name(&self) -> &'static str;

    async fn find(&self, class_name: &str, query: &Query) -> DatastoreResult<Vec<Document>>;

    /// Fails with `DatastoreError::NotFound` when the id is unknown
    async fn get(&self, class_name: &str, id: &str) -> DatastoreResult<Document>;

    async fn add(&self, class_name: &str, fields: Fields) -> DatastoreResult<Document>;

    /// Partial write; fields absent from the patch are left untouched
    async fn update(&self, class_name: &str, id: &str, patch: &Patch) -> DatastoreResult<()>;
}

/// Cloneable handle over a datastore backend
#[derive(Clone)]
pub struct Db {
    store: Arc<dyn Datastore>,
}

impl Db {
    pub fn new(store: Arc<dyn Datastore>) -> Self {
        Self { store }
    }

    pub fn class<'a>(&'a self, name: &'a str) -> Class<'a> {
        Class { db: self, name }
    }

    pub fn backend_name(&self) -> &'static str {
        self.store.backend_name()
    }
}

/// A named collection
pub struct Class<'a> {
    db: &'a Db,
    name: &'a str,
}

impl Class<'_> {
    /// Reference handle to an object in this collection; does not hit the store
    pub fn object(&self, id: impl Into<String>) -> Pointer {
        Pointer::new(self.name, id)
    }

    pub async fn find(&self, query: &Query) -> DatastoreResult<Vec<Document>> {
        self.db.store.find(self.name, query).await
    }

    pub async fn get(&self, id: &str) -> DatastoreResult<Document> {
        self.db.store.get(self.name, id).await
    }

    pub async fn add(&self, fields: Fields) -> DatastoreResult<Document> {
        self.db.store.add(self.name, fields).await
    }

    pub async fn update(&self, id: &str, patch: &Patch) -> DatastoreResult<()> {
        self.db.store.update(self.name, id, patch).await
    }
}
