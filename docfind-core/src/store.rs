//! The document store: entry point for collection handles.
//!
//! A [`DocumentStore`] owns one backend and hands out borrowed
//! [`Collection`]/[`TypedCollection`] handles. The store is constructed
//! explicitly and passed down to whoever needs it; open it at process
//! start, call [`shutdown`](DocumentStore::shutdown) at the end.

use crate::{
    backend::StoreBackend,
    collection::{Collection, TypedCollection},
    document::Document,
    error::StoreResult,
    schema::Schema,
};

/// A document store bound to a specific backend implementation.
///
/// ```ignore
/// let store = DocumentStore::new(InMemoryStore::new());
/// let courses = store.typed_collection::<Course>();
/// ```
#[derive(Debug)]
pub struct DocumentStore<B: StoreBackend> {
    backend: B,
}

impl<B: StoreBackend> DocumentStore<B> {
    /// Creates a new document store with the given backend.
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// Gets a typed collection for the document type.
    ///
    /// The collection name and schema come from the type's [`Document`]
    /// implementation.
    pub fn typed_collection<D: Document>(&self) -> TypedCollection<'_, B, D> {
        TypedCollection::new(D::collection_name().to_string(), &self.backend)
    }

    /// Gets an untyped collection handle with no schema attached.
    pub fn collection(&self, name: &str) -> Collection<'_, B> {
        Collection::new(name.to_string(), &self.backend, None)
    }

    /// Gets an untyped collection handle that validates inserts against
    /// the given schema.
    pub fn collection_with_schema(&self, name: &str, schema: Schema) -> Collection<'_, B> {
        Collection::new(name.to_string(), &self.backend, Some(schema))
    }

    /// Creates an empty collection with the given name.
    pub async fn create_collection(&self, name: &str) -> StoreResult<()> {
        self.backend.create_collection(name).await
    }

    /// Drops a collection and all its documents.
    pub async fn drop_collection(&self, name: &str) -> StoreResult<()> {
        self.backend.drop_collection(name).await
    }

    /// Lists all collections in the store.
    pub async fn list_collections(&self) -> StoreResult<Vec<String>> {
        self.backend.list_collections().await
    }

    /// Shuts down the store, releasing backend resources.
    pub async fn shutdown(self) -> StoreResult<()> {
        self.backend.shutdown().await
    }
}
