//! Schema description and validation for document shapes.
//!
//! A [`Schema`] maps field names to a semantic type, an optional
//! default-value rule, and a required flag. Defaults are applied before a
//! document is written; validation runs afterwards and rejects documents
//! whose required fields are missing or whose values do not match their
//! declared type.

use bson::{Bson, DateTime, Document as BsonDocument};
use std::collections::BTreeMap;

use crate::error::{StoreError, StoreResult};

/// The semantic type a field is declared to hold.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldType {
    /// UTF-8 text.
    Text,
    /// Any numeric value (Int32, Int64 and Double all qualify).
    Number,
    /// Boolean flag.
    Boolean,
    /// Point in time.
    DateTime,
    /// Ordered sequence whose elements share one type.
    Array(Box<FieldType>),
}

impl FieldType {
    fn accepts(&self, value: &Bson) -> bool {
        match (self, value) {
            (FieldType::Text, Bson::String(_)) => true,
            (FieldType::Number, Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_)) => true,
            (FieldType::Boolean, Bson::Boolean(_)) => true,
            (FieldType::DateTime, Bson::DateTime(_)) => true,
            (FieldType::Array(inner), Bson::Array(items)) => {
                items.iter().all(|item| inner.accepts(item))
            }
            _ => false,
        }
    }
}

/// Rule used to fill a field that was left unset.
#[derive(Debug, Clone)]
pub enum FieldDefault {
    /// A fixed value.
    Value(Bson),
    /// The timestamp of the write that created the document.
    Now,
}

impl FieldDefault {
    fn materialize(&self) -> Bson {
        match self {
            FieldDefault::Value(value) => value.clone(),
            FieldDefault::Now => Bson::DateTime(DateTime::from_chrono(chrono::Utc::now())),
        }
    }
}

/// Declaration of one schema field.
#[derive(Debug, Clone)]
pub struct FieldSpec {
    field_type: FieldType,
    required: bool,
    default: Option<FieldDefault>,
}

impl FieldSpec {
    /// Creates an optional field of the given type with no default.
    pub fn new(field_type: FieldType) -> Self {
        Self { field_type, required: false, default: None }
    }

    /// Marks the field as required: missing or null values fail validation.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Sets a fixed default applied when the field is unset on save.
    pub fn with_default(mut self, value: impl Into<Bson>) -> Self {
        self.default = Some(FieldDefault::Value(value.into()));
        self
    }

    /// Defaults the field to the write timestamp when unset on save.
    pub fn default_now(mut self) -> Self {
        self.default = Some(FieldDefault::Now);
        self
    }
}

/// Shape declaration for the documents of one collection.
///
/// Fields not named by the schema are passed through untouched, so a schema
/// only constrains what it declares. The empty (default) schema accepts
/// every document.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    fields: BTreeMap<String, FieldSpec>,
}

impl Schema {
    /// Creates a builder for fluent schema construction.
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::default()
    }

    /// Returns true when the schema declares no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Fills missing or null fields that declare a default value.
    pub fn apply_defaults(&self, document: &mut BsonDocument) {
        for (name, spec) in &self.fields {
            let Some(default) = &spec.default else {
                continue;
            };

            let unset = matches!(document.get(name), None | Some(Bson::Null));
            if unset {
                document.insert(name.clone(), default.materialize());
            }
        }
    }

    /// Checks a document against the declared fields.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Validation`] when a required field is missing
    /// or null, or when a present value does not match its declared type.
    pub fn validate(&self, document: &BsonDocument) -> StoreResult<()> {
        for (name, spec) in &self.fields {
            match document.get(name) {
                None | Some(Bson::Null) => {
                    if spec.required {
                        return Err(StoreError::Validation(format!(
                            "required field `{name}` is missing"
                        )));
                    }
                }
                Some(value) => {
                    if !spec.field_type.accepts(value) {
                        return Err(StoreError::Validation(format!(
                            "field `{name}` does not match its declared type {:?}",
                            spec.field_type
                        )));
                    }
                }
            }
        }

        Ok(())
    }
}

/// Fluent builder for [`Schema`] values.
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    fields: BTreeMap<String, FieldSpec>,
}

impl SchemaBuilder {
    /// Declares one field. Redeclaring a name replaces the earlier spec.
    pub fn field(mut self, name: impl Into<String>, spec: FieldSpec) -> Self {
        self.fields.insert(name.into(), spec);
        self
    }

    /// Builds the final schema.
    pub fn build(self) -> Schema {
        Schema { fields: self.fields }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    fn course_schema() -> Schema {
        Schema::builder()
            .field("name", FieldSpec::new(FieldType::Text).required())
            .field("author", FieldSpec::new(FieldType::Text))
            .field(
                "tags",
                FieldSpec::new(FieldType::Array(Box::new(FieldType::Text))),
            )
            .field("date", FieldSpec::new(FieldType::DateTime).default_now())
            .field("price", FieldSpec::new(FieldType::Number))
            .field(
                "is_published",
                FieldSpec::new(FieldType::Boolean).with_default(false),
            )
            .build()
    }

    #[test]
    fn defaults_fill_unset_fields() {
        let schema = course_schema();
        let mut doc = doc! { "name": "Computer Networks", "price": Bson::Null };

        schema.apply_defaults(&mut doc);

        assert!(matches!(doc.get("date"), Some(Bson::DateTime(_))));
        assert_eq!(doc.get("is_published"), Some(&Bson::Boolean(false)));
        // No default declared for price, the null stays.
        assert_eq!(doc.get("price"), Some(&Bson::Null));
    }

    #[test]
    fn defaults_leave_set_fields_alone() {
        let schema = course_schema();
        let mut doc = doc! { "name": "Networks", "is_published": true };

        schema.apply_defaults(&mut doc);

        assert_eq!(doc.get("is_published"), Some(&Bson::Boolean(true)));
    }

    #[test]
    fn missing_required_field_fails() {
        let schema = course_schema();
        let doc = doc! { "author": "Alton Hardin", "is_published": true };

        let err = schema.validate(&doc).unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
    }

    #[test]
    fn null_required_field_fails() {
        let schema = course_schema();
        let doc = doc! { "name": Bson::Null, "is_published": true };

        assert!(schema.validate(&doc).is_err());
    }

    #[test]
    fn wrong_type_fails() {
        let schema = course_schema();
        let doc = doc! { "name": "Networks", "is_published": true, "price": "ten" };

        let err = schema.validate(&doc).unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
    }

    #[test]
    fn array_elements_are_checked() {
        let schema = course_schema();
        let doc = doc! { "name": "Networks", "is_published": true, "tags": ["network", 5] };

        assert!(schema.validate(&doc).is_err());
    }

    #[test]
    fn numbers_accept_every_numeric_width() {
        let schema = course_schema();

        for price in [Bson::Int32(10), Bson::Int64(10), Bson::Double(10.0)] {
            let doc = doc! { "name": "Networks", "is_published": true, "price": price };
            schema.validate(&doc).unwrap();
        }
    }

    #[test]
    fn undeclared_fields_pass_through() {
        let schema = course_schema();
        let doc = doc! { "name": "Networks", "is_published": true, "level": "beginner" };

        schema.validate(&doc).unwrap();
    }

    #[test]
    fn empty_schema_accepts_everything() {
        let schema = Schema::default();
        assert!(schema.is_empty());
        schema.validate(&doc! { "anything": ["goes", 1, true] }).unwrap();
    }
}
