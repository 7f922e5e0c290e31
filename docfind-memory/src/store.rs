//! In-memory storage backend.
//!
//! Documents live as BSON values in nested HashMaps behind an async-aware
//! read-write lock. Queries scan the whole collection; there is no
//! indexing, which is fine for the test and development workloads this
//! backend targets.

use std::{cmp::Ordering, collections::HashMap, sync::Arc};

use async_trait::async_trait;
use bson::{Bson, Document as BsonDocument, Uuid};
use log::debug;
use mea::rwlock::RwLock;

use docfind_core::{
    backend::{StoreBackend, StoreBackendBuilder},
    error::{StoreError, StoreResult},
    query::{Expr, Patch, Query, SortDirection},
};

use crate::evaluator::{Comparable, DocumentEvaluator, FilterMatcher};

type CollectionMap = HashMap<String, Bson>;
type StoreMap = HashMap<String, CollectionMap>;

/// Thread-safe in-memory document store.
///
/// Cloning is cheap and clones share the same underlying data, so one
/// store can serve many concurrent tasks. Iteration order within a
/// collection is unspecified; "first match" for single-document updates
/// and deletes is whichever matching document the scan reaches first.
#[derive(Default, Clone, Debug)]
pub struct InMemoryStore {
    store: Arc<RwLock<StoreMap>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self { store: Arc::new(RwLock::new(StoreMap::new())) }
    }

    /// Creates a builder; handy where a [`StoreBackendBuilder`] is expected.
    pub fn builder() -> InMemoryStoreBuilder {
        InMemoryStoreBuilder
    }
}

fn sort_documents(documents: &mut [Bson], field: &str, direction: &SortDirection) {
    documents.sort_by(|a, b| {
        let left = a
            .as_document()
            .and_then(|doc| doc.get(field))
            .map(Comparable::from)
            .unwrap_or(Comparable::Null);
        let right = b
            .as_document()
            .and_then(|doc| doc.get(field))
            .map(Comparable::from)
            .unwrap_or(Comparable::Null);

        match direction {
            SortDirection::Asc => left.partial_cmp(&right).unwrap_or(Ordering::Equal),
            SortDirection::Desc => right.partial_cmp(&left).unwrap_or(Ordering::Equal),
        }
    });
}

// The identifier always survives projection.
fn project_document(document: &Bson, fields: &[String]) -> Bson {
    let Some(doc) = document.as_document() else {
        return document.clone();
    };

    let mut projected = BsonDocument::new();
    if let Some(id) = doc.get("id") {
        projected.insert("id", id.clone());
    }
    for field in fields {
        if field == "id" {
            continue;
        }
        if let Some(value) = doc.get(field) {
            projected.insert(field.clone(), value.clone());
        }
    }

    Bson::Document(projected)
}

fn apply_patch(document: &mut Bson, patch: &Patch) -> StoreResult<()> {
    if patch.set.iter().any(|(field, _)| field == "id")
        || patch.unset.iter().any(|field| field == "id")
    {
        return Err(StoreError::InvalidArgument(
            "the id field is immutable and cannot be patched".to_string(),
        ));
    }

    let doc = document
        .as_document_mut()
        .ok_or_else(|| StoreError::Backend("stored value is not a document".to_string()))?;

    for (field, value) in &patch.set {
        doc.insert(field.clone(), value.clone());
    }
    for field in &patch.unset {
        doc.remove(field);
    }

    Ok(())
}

#[async_trait]
impl StoreBackend for InMemoryStore {
    async fn insert_documents(
        &self,
        documents: Vec<(Uuid, Bson)>,
        collection: &str,
    ) -> StoreResult<()> {
        let mut store = self.store.write().await;
        let collection_map = store.entry(collection.to_string()).or_default();

        for (id, doc) in documents {
            let key = id.to_string();

            if collection_map.contains_key(&key) {
                return Err(StoreError::DocumentAlreadyExists(key, collection.to_string()));
            }

            collection_map.insert(key, doc);
        }

        Ok(())
    }

    async fn update_documents(
        &self,
        documents: Vec<(Uuid, Bson)>,
        collection: &str,
    ) -> StoreResult<()> {
        let mut store = self.store.write().await;
        let collection_map = store
            .get_mut(collection)
            .ok_or_else(|| StoreError::CollectionNotFound(collection.to_string()))?;

        for (id, doc) in documents {
            let key = id.to_string();

            if !collection_map.contains_key(&key) {
                return Err(StoreError::DocumentNotFound(key, collection.to_string()));
            }

            collection_map.insert(key, doc);
        }

        Ok(())
    }

    async fn delete_documents(&self, ids: Vec<Uuid>, collection: &str) -> StoreResult<()> {
        let mut store = self.store.write().await;
        let collection_map = store
            .get_mut(collection)
            .ok_or_else(|| StoreError::CollectionNotFound(collection.to_string()))?;

        for id in ids {
            let key = id.to_string();

            if collection_map.remove(&key).is_none() {
                return Err(StoreError::DocumentNotFound(key, collection.to_string()));
            }
        }

        Ok(())
    }

    async fn get_documents(&self, ids: Vec<Uuid>, collection: &str) -> StoreResult<Vec<Bson>> {
        let store = self.store.read().await;
        let Some(collection_map) = store.get(collection) else {
            return Ok(vec![]);
        };

        let mut documents = Vec::with_capacity(ids.len());

        for id in ids {
            if let Some(doc) = collection_map.get(&id.to_string()) {
                documents.push(doc.clone());
            }
        }

        Ok(documents)
    }

    async fn query_documents(&self, query: Query, collection: &str) -> StoreResult<Vec<Bson>> {
        let store = self.store.read().await;
        let Some(collection_map) = store.get(collection) else {
            return Ok(vec![]);
        };

        // Filter, then sort, then project, then limit.
        let mut documents = match query.filter_expr() {
            Some(expr) => {
                DocumentEvaluator::filter_documents(collection_map.values(), &expr)?
            }
            None => collection_map.values().cloned().collect(),
        };

        if let Some(sort) = &query.sort {
            sort_documents(&mut documents, &sort.field, &sort.direction);
        }

        if let Some(fields) = &query.projection {
            documents = documents
                .iter()
                .map(|doc| project_document(doc, fields))
                .collect();
        }

        if let Some(limit) = query.limit {
            documents.truncate(limit);
        }

        debug!(
            "query on `{collection}` matched {} document(s)",
            documents.len()
        );

        Ok(documents)
    }

    async fn count_documents(&self, filter: Option<Expr>, collection: &str) -> StoreResult<u64> {
        let store = self.store.read().await;
        let Some(collection_map) = store.get(collection) else {
            return Ok(0);
        };

        let matcher = FilterMatcher::new(filter)?;
        let mut count = 0u64;
        for doc in collection_map.values() {
            if matcher.matches(doc)? {
                count += 1;
            }
        }

        Ok(count)
    }

    async fn update_one(
        &self,
        filter: Option<Expr>,
        patch: Patch,
        return_updated: bool,
        collection: &str,
    ) -> StoreResult<Option<Bson>> {
        let mut store = self.store.write().await;
        let Some(collection_map) = store.get_mut(collection) else {
            return Ok(None);
        };

        let matcher = FilterMatcher::new(filter)?;
        for doc in collection_map.values_mut() {
            if matcher.matches(doc)? {
                let before = doc.clone();
                apply_patch(doc, &patch)?;

                debug!("update_one patched a document in `{collection}`");

                return Ok(Some(if return_updated { doc.clone() } else { before }));
            }
        }

        Ok(None)
    }

    async fn delete_one(
        &self,
        filter: Option<Expr>,
        collection: &str,
    ) -> StoreResult<Option<Bson>> {
        let mut store = self.store.write().await;
        let Some(collection_map) = store.get_mut(collection) else {
            return Ok(None);
        };

        let matcher = FilterMatcher::new(filter)?;
        let mut matched_key = None;
        for (key, doc) in collection_map.iter() {
            if matcher.matches(doc)? {
                matched_key = Some(key.clone());
                break;
            }
        }

        match matched_key {
            Some(key) => {
                debug!("delete_one removed a document from `{collection}`");
                Ok(collection_map.remove(&key))
            }
            None => Ok(None),
        }
    }

    async fn update_by_id(
        &self,
        id: Uuid,
        patch: Patch,
        return_updated: bool,
        collection: &str,
    ) -> StoreResult<Option<Bson>> {
        let mut store = self.store.write().await;
        let Some(doc) = store
            .get_mut(collection)
            .and_then(|map| map.get_mut(&id.to_string()))
        else {
            return Ok(None);
        };

        let before = doc.clone();
        apply_patch(doc, &patch)?;

        Ok(Some(if return_updated { doc.clone() } else { before }))
    }

    async fn delete_by_id(&self, id: Uuid, collection: &str) -> StoreResult<Option<Bson>> {
        let mut store = self.store.write().await;
        let Some(collection_map) = store.get_mut(collection) else {
            return Ok(None);
        };

        Ok(collection_map.remove(&id.to_string()))
    }

    async fn create_collection(&self, name: &str) -> StoreResult<()> {
        self.store
            .write()
            .await
            .entry(name.to_string())
            .or_default();

        Ok(())
    }

    async fn drop_collection(&self, name: &str) -> StoreResult<()> {
        let mut store = self.store.write().await;

        if store.remove(name).is_none() {
            return Err(StoreError::CollectionNotFound(name.to_string()));
        }

        Ok(())
    }

    async fn list_collections(&self) -> StoreResult<Vec<String>> {
        Ok(self.store.read().await.keys().cloned().collect())
    }
}

/// Builder for [`InMemoryStore`] instances.
///
/// There is nothing to configure today; the builder exists so the memory
/// backend plugs into code written against [`StoreBackendBuilder`].
#[derive(Default)]
pub struct InMemoryStoreBuilder;

#[async_trait]
impl StoreBackendBuilder for InMemoryStoreBuilder {
    type Backend = InMemoryStore;

    async fn build(self) -> StoreResult<Self::Backend> {
        Ok(InMemoryStore::new())
    }
}
