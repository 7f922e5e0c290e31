//! Collection handles and the collection-bound query builders.
//!
//! A [`TypedCollection`] works with one [`Document`] type and enforces its
//! schema on insert; a plain [`Collection`] handles raw BSON documents and
//! may optionally carry a schema of its own. Both borrow the backend from
//! the owning [`DocumentStore`](crate::store::DocumentStore), so handles
//! are cheap to create and dispose of.
//!
//! Queries are built with the fluent [`Find`] returned by
//! [`TypedCollection::find`]:
//!
//! ```ignore
//! let courses = store.typed_collection::<Course>();
//! let published = courses
//!     .find()
//!     .filter(Filter::eq("is_published", true))
//!     .or([Filter::eq("tags", "frontend"), Filter::eq("tags", "backend")])
//!     .sort("price", SortDirection::Desc)
//!     .execute()
//!     .await?;
//! ```
//!
//! A finder is single-use: every terminal operation consumes it, so a query
//! cannot be re-executed once it has run.

use bson::{Bson, Document as BsonDocument, Uuid};
use std::marker::PhantomData;

use crate::{
    backend::StoreBackend,
    document::{Document, DocumentExt},
    error::{StoreError, StoreResult},
    query::{Expr, Patch, Query, QueryBuilder, SortDirection},
    schema::Schema,
};

fn prepare_for_write(schema: &Schema, document: Bson) -> StoreResult<Bson> {
    let mut doc = document
        .as_document()
        .cloned()
        .ok_or_else(|| StoreError::Validation("expected a document value".to_string()))?;

    schema.apply_defaults(&mut doc);
    schema.validate(&doc)?;

    Ok(Bson::Document(doc))
}

/// An untyped collection handle dealing in raw BSON documents.
///
/// When constructed with a schema
/// ([`DocumentStore::collection_with_schema`](crate::store::DocumentStore::collection_with_schema)),
/// inserts apply the schema's defaults and validate against it.
#[derive(Debug)]
pub struct Collection<'a, B: StoreBackend> {
    name: String,
    backend: &'a B,
    schema: Option<Schema>,
}

impl<'a, B: StoreBackend> Collection<'a, B> {
    pub(crate) fn new(name: String, backend: &'a B, schema: Option<Schema>) -> Self {
        Self { name, backend, schema }
    }

    /// Returns the name of this collection.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Inserts new documents as (id, BSON document) pairs.
    ///
    /// With a schema attached, defaults are applied and each document is
    /// validated before the write; a failure rejects the whole batch.
    pub async fn insert(&self, documents: Vec<(Uuid, Bson)>) -> StoreResult<()> {
        let documents = match &self.schema {
            Some(schema) => documents
                .into_iter()
                .map(|(id, doc)| prepare_for_write(schema, doc).map(|doc| (id, doc)))
                .collect::<StoreResult<Vec<_>>>()?,
            None => documents,
        };

        self.backend
            .insert_documents(documents, &self.name)
            .await
    }

    /// Replaces existing documents wholesale.
    ///
    /// A replacement is a save like any other: with a schema attached,
    /// defaults are applied and the new document is validated before the
    /// write.
    pub async fn update(&self, documents: Vec<(Uuid, Bson)>) -> StoreResult<()> {
        let documents = match &self.schema {
            Some(schema) => documents
                .into_iter()
                .map(|(id, doc)| prepare_for_write(schema, doc).map(|doc| (id, doc)))
                .collect::<StoreResult<Vec<_>>>()?,
            None => documents,
        };

        self.backend
            .update_documents(documents, &self.name)
            .await
    }

    /// Deletes documents by id.
    pub async fn delete(&self, ids: Vec<Uuid>) -> StoreResult<()> {
        self.backend
            .delete_documents(ids, &self.name)
            .await
    }

    /// Fetches documents by id; unknown ids are omitted from the result.
    pub async fn get(&self, ids: Vec<Uuid>) -> StoreResult<Vec<Bson>> {
        self.backend.get_documents(ids, &self.name).await
    }

    /// Runs a structured query and returns the matching documents.
    pub async fn query(&self, query: Query) -> StoreResult<Vec<Bson>> {
        self.backend.query_documents(query, &self.name).await
    }

    /// Counts the documents matching a filter.
    pub async fn count(&self, filter: Option<Expr>) -> StoreResult<u64> {
        self.backend.count_documents(filter, &self.name).await
    }

    /// Patches the first document matching the filter; `Ok(None)` on no
    /// match.
    pub async fn update_one(
        &self,
        filter: Option<Expr>,
        patch: Patch,
        return_updated: bool,
    ) -> StoreResult<Option<Bson>> {
        self.backend
            .update_one(filter, patch, return_updated, &self.name)
            .await
    }

    /// Removes and returns the first document matching the filter;
    /// `Ok(None)` on no match.
    pub async fn delete_one(&self, filter: Option<Expr>) -> StoreResult<Option<Bson>> {
        self.backend.delete_one(filter, &self.name).await
    }
}

/// A type-safe collection handle for one document type.
///
/// Inserts serialize the document, apply the schema's defaults and validate
/// the result before writing. Reads deserialize back into `D`.
#[derive(Debug)]
pub struct TypedCollection<'a, B: StoreBackend, D: Document> {
    name: String,
    backend: &'a B,
    _marker: PhantomData<D>,
}

impl<'a, B: StoreBackend, D: Document> TypedCollection<'a, B, D> {
    pub(crate) fn new(name: String, backend: &'a B) -> Self {
        Self { name, backend, _marker: PhantomData }
    }

    /// Returns the name of this collection.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Saves new documents to the collection.
    ///
    /// # Errors
    ///
    /// Fails with [`StoreError::Validation`] when a document violates the
    /// schema, or [`StoreError::DocumentAlreadyExists`] on an id collision.
    pub async fn insert(&self, documents: Vec<D>) -> StoreResult<()> {
        let schema = D::schema();
        let documents = documents
            .into_iter()
            .map(|d| {
                let id = *d.id();
                prepare_for_write(&schema, d.to_bson()?).map(|doc| (id, doc))
            })
            .collect::<StoreResult<Vec<(Uuid, Bson)>>>()?;

        self.backend
            .insert_documents(documents, &self.name)
            .await
    }

    /// Replaces existing documents wholesale (fetch, mutate, save).
    ///
    /// Every document's id must already exist in the collection. The schema
    /// is enforced on the replacement, just as on insert.
    pub async fn update(&self, documents: Vec<D>) -> StoreResult<()> {
        let schema = D::schema();
        let documents = documents
            .into_iter()
            .map(|d| {
                let id = *d.id();
                prepare_for_write(&schema, d.to_bson()?).map(|doc| (id, doc))
            })
            .collect::<StoreResult<Vec<(Uuid, Bson)>>>()?;

        self.backend
            .update_documents(documents, &self.name)
            .await
    }

    /// Deletes documents by id. Every id must exist.
    pub async fn delete(&self, ids: Vec<Uuid>) -> StoreResult<()> {
        self.backend
            .delete_documents(ids, &self.name)
            .await
    }

    /// Fetches documents by id; unknown ids are omitted from the result.
    pub async fn get(&self, ids: Vec<Uuid>) -> StoreResult<Vec<D>> {
        self.backend
            .get_documents(ids, &self.name)
            .await?
            .into_iter()
            .map(D::from_bson)
            .collect()
    }

    /// Fetches one document by id.
    pub async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<D>> {
        let mut found = self.get(vec![id]).await?;
        Ok(found.pop())
    }

    /// Patches the document with the given id.
    ///
    /// With `return_updated` the post-update document comes back; without
    /// it, the image from before the patch. A missing id is `Ok(None)`,
    /// never an error.
    pub async fn update_by_id(
        &self,
        id: Uuid,
        patch: Patch,
        return_updated: bool,
    ) -> StoreResult<Option<D>> {
        self.backend
            .update_by_id(id, patch, return_updated, &self.name)
            .await?
            .map(D::from_bson)
            .transpose()
    }

    /// Removes the document with the given id and returns it. A missing id
    /// is `Ok(None)`, never an error.
    pub async fn delete_by_id(&self, id: Uuid) -> StoreResult<Option<D>> {
        self.backend
            .delete_by_id(id, &self.name)
            .await?
            .map(D::from_bson)
            .transpose()
    }

    /// Starts a fluent query against this collection.
    pub fn find(&self) -> Find<'a, B, D> {
        Find {
            name: self.name.clone(),
            backend: self.backend,
            builder: QueryBuilder::new(),
            _marker: PhantomData,
        }
    }

    /// Runs a pre-assembled query and returns typed results.
    pub async fn query(&self, query: Query) -> StoreResult<Vec<D>> {
        self.backend
            .query_documents(query, &self.name)
            .await?
            .into_iter()
            .map(D::from_bson)
            .collect()
    }
}

/// A single-use fluent query bound to a typed collection.
///
/// Chain predicates and options, then finish with one terminal operation:
/// [`execute`](Find::execute), [`count`](Find::count),
/// [`update_one`](Find::update_one) or [`delete_one`](Find::delete_one).
#[derive(Debug)]
pub struct Find<'a, B: StoreBackend, D: Document> {
    name: String,
    backend: &'a B,
    builder: QueryBuilder,
    _marker: PhantomData<D>,
}

impl<'a, B: StoreBackend, D: Document> Find<'a, B, D> {
    /// Adds a predicate; chained filters must all hold.
    pub fn filter(mut self, expr: Expr) -> Self {
        self.builder = self.builder.filter(expr);
        self
    }

    /// Adds an OR group of alternatives as one predicate.
    pub fn or(mut self, exprs: impl IntoIterator<Item = Expr>) -> Self {
        self.builder = self.builder.or(exprs);
        self
    }

    /// Adds an AND group as one predicate.
    pub fn and(mut self, exprs: impl IntoIterator<Item = Expr>) -> Self {
        self.builder = self.builder.and(exprs);
        self
    }

    /// Sets the sort key, replacing any earlier one.
    pub fn sort(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.builder = self.builder.sort(field, direction);
        self
    }

    /// Caps the number of returned documents; zero is rejected when the
    /// terminal operation runs.
    pub fn limit(mut self, limit: usize) -> Self {
        self.builder = self.builder.limit(limit);
        self
    }

    /// Restricts the returned fields.
    ///
    /// Projected results can no longer be deserialized into `D`, so the
    /// finder switches to raw documents containing only the named fields
    /// plus the identifier.
    pub fn select(
        self,
        fields: impl IntoIterator<Item = impl Into<String>>,
    ) -> ProjectedFind<'a, B> {
        ProjectedFind {
            name: self.name,
            backend: self.backend,
            builder: self.builder.select(fields),
        }
    }

    /// Runs the query and returns all matching documents.
    ///
    /// Filter, sort and limit apply in that order; no match yields an empty
    /// vec, not an error.
    pub async fn execute(self) -> StoreResult<Vec<D>> {
        self.backend
            .query_documents(self.builder.build()?, &self.name)
            .await?
            .into_iter()
            .map(D::from_bson)
            .collect()
    }

    /// Counts the matching documents. Sort and limit are ignored.
    pub async fn count(self) -> StoreResult<u64> {
        let query = self.builder.build()?;
        self.backend
            .count_documents(query.filter_expr(), &self.name)
            .await
    }

    /// Patches the first matching document.
    ///
    /// Returns the post-update document when `return_updated` is set, the
    /// pre-update image otherwise, and `Ok(None)` when nothing matches.
    pub async fn update_one(self, patch: Patch, return_updated: bool) -> StoreResult<Option<D>> {
        let query = self.builder.build()?;
        self.backend
            .update_one(query.filter_expr(), patch, return_updated, &self.name)
            .await?
            .map(D::from_bson)
            .transpose()
    }

    /// Removes the first matching document and returns it, or `Ok(None)`
    /// when nothing matches.
    pub async fn delete_one(self) -> StoreResult<Option<D>> {
        let query = self.builder.build()?;
        self.backend
            .delete_one(query.filter_expr(), &self.name)
            .await?
            .map(D::from_bson)
            .transpose()
    }
}

/// A fluent query whose results are projected to a subset of fields.
///
/// Created by [`Find::select`]. Results are raw BSON documents holding the
/// selected fields plus the identifier.
#[derive(Debug)]
pub struct ProjectedFind<'a, B: StoreBackend> {
    name: String,
    backend: &'a B,
    builder: QueryBuilder,
}

impl<'a, B: StoreBackend> ProjectedFind<'a, B> {
    /// Adds a predicate; chained filters must all hold.
    pub fn filter(mut self, expr: Expr) -> Self {
        self.builder = self.builder.filter(expr);
        self
    }

    /// Adds an OR group of alternatives as one predicate.
    pub fn or(mut self, exprs: impl IntoIterator<Item = Expr>) -> Self {
        self.builder = self.builder.or(exprs);
        self
    }

    /// Adds an AND group as one predicate.
    pub fn and(mut self, exprs: impl IntoIterator<Item = Expr>) -> Self {
        self.builder = self.builder.and(exprs);
        self
    }

    /// Sets the sort key, replacing any earlier one.
    pub fn sort(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.builder = self.builder.sort(field, direction);
        self
    }

    /// Caps the number of returned documents.
    pub fn limit(mut self, limit: usize) -> Self {
        self.builder = self.builder.limit(limit);
        self
    }

    /// Replaces the selected field set.
    pub fn select(mut self, fields: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.builder = self.builder.select(fields);
        self
    }

    /// Runs the query and returns the projected documents.
    pub async fn execute(self) -> StoreResult<Vec<BsonDocument>> {
        self.backend
            .query_documents(self.builder.build()?, &self.name)
            .await?
            .into_iter()
            .map(|doc| {
                doc.as_document()
                    .cloned()
                    .ok_or_else(|| StoreError::Backend("expected a document value".to_string()))
            })
            .collect()
    }

    /// Counts the matching documents. Projection, sort and limit are
    /// ignored.
    pub async fn count(self) -> StoreResult<u64> {
        let query = self.builder.build()?;
        self.backend
            .count_documents(query.filter_expr(), &self.name)
            .await
    }
}
