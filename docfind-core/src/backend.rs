//! Storage backend abstraction.
//!
//! [`StoreBackend`] is the seam between the query layer and whatever
//! actually holds the documents. Implementations must be thread-safe
//! (`Send + Sync`); every method is async and runs as an independent
//! request with no cross-operation ordering guarantee beyond what the
//! store itself provides.

use async_trait::async_trait;
use bson::{Bson, Uuid};
use std::fmt::Debug;

use crate::{
    error::StoreResult,
    query::{Expr, Patch, Query},
};

/// Abstract interface for document storage backends.
///
/// Batch operations (`insert_documents`, `update_documents`,
/// `delete_documents`) treat a missing document as an error. The
/// single-document operations (`update_one`, `delete_one` and the
/// id-targeted variants) instead report a miss as `Ok(None)`: a filter that
/// matches nothing is not a failure.
#[async_trait]
pub trait StoreBackend: Send + Sync + Debug {
    /// Inserts new documents into a collection.
    ///
    /// The collection is created if it does not exist. Inserting an id that
    /// is already present fails with
    /// [`StoreError::DocumentAlreadyExists`](crate::error::StoreError::DocumentAlreadyExists).
    async fn insert_documents(
        &self,
        documents: Vec<(Uuid, Bson)>,
        collection: &str,
    ) -> StoreResult<()>;

    /// Replaces existing documents wholesale.
    ///
    /// Every id must already exist in the collection.
    async fn update_documents(
        &self,
        documents: Vec<(Uuid, Bson)>,
        collection: &str,
    ) -> StoreResult<()>;

    /// Deletes documents by id. Every id must exist.
    async fn delete_documents(&self, ids: Vec<Uuid>, collection: &str) -> StoreResult<()>;

    /// Fetches documents by id; missing ids are omitted from the result.
    async fn get_documents(&self, ids: Vec<Uuid>, collection: &str) -> StoreResult<Vec<Bson>>;

    /// Runs a structured query: filter, then sort, then projection, then
    /// limit. An unknown collection or an empty match yields an empty vec.
    async fn query_documents(&self, query: Query, collection: &str) -> StoreResult<Vec<Bson>>;

    /// Counts the documents matching a filter. Sort, projection and limit
    /// never apply to counting.
    async fn count_documents(&self, filter: Option<Expr>, collection: &str) -> StoreResult<u64>;

    /// Applies a patch to the first document matching the filter.
    ///
    /// Returns the post-update document when `return_updated` is true, the
    /// pre-update image otherwise, and `Ok(None)` when nothing matches.
    async fn update_one(
        &self,
        filter: Option<Expr>,
        patch: Patch,
        return_updated: bool,
        collection: &str,
    ) -> StoreResult<Option<Bson>>;

    /// Removes the first document matching the filter and returns it, or
    /// `Ok(None)` when nothing matches.
    async fn delete_one(&self, filter: Option<Expr>, collection: &str)
    -> StoreResult<Option<Bson>>;

    /// Patches the document with the given id. Same image selection as
    /// [`update_one`](StoreBackend::update_one); a missing id is `Ok(None)`.
    async fn update_by_id(
        &self,
        id: Uuid,
        patch: Patch,
        return_updated: bool,
        collection: &str,
    ) -> StoreResult<Option<Bson>>;

    /// Removes the document with the given id and returns it, or `Ok(None)`
    /// when the id is unknown.
    async fn delete_by_id(&self, id: Uuid, collection: &str) -> StoreResult<Option<Bson>>;

    /// Creates an empty collection with the given name.
    async fn create_collection(&self, name: &str) -> StoreResult<()>;

    /// Drops a collection and all its documents.
    async fn drop_collection(&self, name: &str) -> StoreResult<()>;

    /// Lists the names of all collections in the store.
    async fn list_collections(&self) -> StoreResult<Vec<String>>;

    /// Cleanly shuts down the backend, releasing its resources.
    ///
    /// The default implementation is a no-op; backends holding connections
    /// should override it.
    async fn shutdown(self) -> StoreResult<()>
    where
        Self: Sized,
    {
        Ok(())
    }
}

/// Factory trait for constructing backend instances.
///
/// Connection-phase failures (store unreachable, bad connection string)
/// surface as [`StoreError::Connection`](crate::error::StoreError::Connection)
/// and are not retried here.
#[async_trait]
pub trait StoreBackendBuilder {
    type Backend: StoreBackend;

    async fn build(self) -> StoreResult<Self::Backend>;
}
