//! Convenient re-exports of commonly used types from docfind.
//!
//! Import this prelude module to quickly access the most frequently used types
//! and traits without needing to import from multiple sub-modules:
//!
//! ```ignore
//! use docfind::prelude::*;
//! ```
//!
//! This provides access to:
//! - Document traits
//! - Store backends and builders
//! - Query construction and filtering
//! - Collection handles and fluent finders
//! - Schema declarations and error types

pub use docfind_core::{
    backend::{StoreBackend, StoreBackendBuilder},
    collection::{Collection, Find, ProjectedFind, TypedCollection},
    document::{Document, DocumentExt},
    error::{StoreError, StoreResult},
    query::{Expr, FieldOp, Filter, Patch, Query, QueryBuilder, QueryVisitor, Sort, SortDirection},
    schema::{FieldDefault, FieldSpec, FieldType, Schema, SchemaBuilder},
    store::DocumentStore,
};
