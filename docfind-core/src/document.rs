//! Core traits for document representation and serialization.
//!
//! A stored record is any serde-serializable type implementing [`Document`]:
//! it carries its own unique identifier, names the collection it lives in,
//! and may describe its shape with a [`Schema`] that is enforced on save.

use bson::{Bson, Uuid, de::deserialize_from_bson, ser::serialize_to_bson};
use serde::{Deserialize, Serialize};
use serde_json::{Value, from_value, to_value};

use crate::{error::StoreResult, schema::Schema};

/// Trait implemented by every type stored in a collection.
///
/// The identifier is assigned when the document is constructed and is
/// immutable for the rest of the document's life; patches naming the `id`
/// field are rejected by the store.
///
/// # Example
///
/// ```ignore
/// use docfind_core::{document::Document, schema::{Schema, FieldSpec, FieldType}};
/// use bson::Uuid;
/// use serde::{Serialize, Deserialize};
///
/// #[derive(Debug, Clone, Serialize, Deserialize)]
/// pub struct Course {
///     pub id: Uuid,
///     pub name: String,
///     pub is_published: bool,
/// }
///
/// impl Document for Course {
///     fn id(&self) -> &Uuid {
///         &self.id
///     }
///
///     fn collection_name() -> &'static str {
///         "courses"
///     }
///
///     fn schema() -> Schema {
///         Schema::builder()
///             .field("name", FieldSpec::new(FieldType::Text).required())
///             .field("is_published", FieldSpec::new(FieldType::Boolean).required())
///             .build()
///     }
/// }
/// ```
pub trait Document: Serialize + for<'de> Deserialize<'de> + Send + Sync + Clone + 'static {
    /// Returns a reference to this document's unique identifier.
    fn id(&self) -> &Uuid;

    /// Returns the name of the collection this document belongs to.
    ///
    /// This should be a static, lowercase identifier (e.g. "courses").
    fn collection_name() -> &'static str;

    /// Returns the schema enforced when instances are saved.
    ///
    /// The default is an empty schema: no defaults are applied and every
    /// shape passes validation.
    fn schema() -> Schema {
        Schema::default()
    }
}

/// Serialization helpers available on every [`Document`].
pub trait DocumentExt: Document {
    /// Converts this document to a BSON value for storage.
    fn to_bson(&self) -> StoreResult<Bson>;

    /// Rebuilds a document from a stored BSON value.
    fn from_bson(bson: Bson) -> StoreResult<Self>;

    /// Converts this document to a JSON value.
    fn to_json(&self) -> StoreResult<Value>;

    /// Rebuilds a document from a JSON value.
    fn from_json(value: Value) -> StoreResult<Self>;
}

impl<D: Document> DocumentExt for D {
    fn to_bson(&self) -> StoreResult<Bson> {
        Ok(serialize_to_bson(self)?)
    }

    fn from_bson(bson: Bson) -> StoreResult<Self> {
        Ok(deserialize_from_bson(bson)?)
    }

    fn to_json(&self) -> StoreResult<Value> {
        Ok(to_value(self)?)
    }

    fn from_json(value: Value) -> StoreResult<Self> {
        Ok(from_value(value)?)
    }
}
