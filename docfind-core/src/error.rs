//! Error and result types shared by every docfind operation.
//!
//! Fallible operations throughout the workspace return [`StoreResult<T>`].
//! Failures always surface to the immediate caller; nothing is retried or
//! silently swallowed. The one deliberate exception is id-targeted
//! update/delete, which reports a missing document as `Ok(None)` rather
//! than an error.

use bson::error::Error as BsonError;
use serde_json::Error as SerdeJsonError;
use thiserror::Error;

/// All failure modes of a document store operation.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The store could not be reached while building the backend.
    #[error("Connection error: {0}")]
    Connection(String),
    /// Serialization/deserialization failure (BSON or JSON).
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// A document failed its schema rules on save.
    #[error("Validation error: {0}")]
    Validation(String),
    /// A predicate was applied to a field of an incompatible type.
    #[error("Type mismatch: {0}")]
    TypeMismatch(String),
    /// A query or patch argument is out of range or malformed.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    /// A document with the given id already exists in the collection.
    #[error("Document {0} already exists in collection {1}")]
    DocumentAlreadyExists(String, String),
    /// A batch operation referenced a document that does not exist.
    #[error("Document not found {0} in collection {1}")]
    DocumentNotFound(String, String),
    /// The named collection does not exist in the store.
    #[error("Collection not found: {0}")]
    CollectionNotFound(String),
    /// An error raised by the underlying storage backend.
    #[error("Backend error: {0}")]
    Backend(String),
}

/// Specialized `Result` used across the docfind crates.
pub type StoreResult<T> = Result<T, StoreError>;

impl From<BsonError> for StoreError {
    fn from(err: BsonError) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

impl From<SerdeJsonError> for StoreError {
    fn from(err: SerdeJsonError) -> Self {
        StoreError::Serialization(err.to_string())
    }
}
