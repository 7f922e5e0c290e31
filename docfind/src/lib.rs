//! Main docfind crate providing a typed query layer over document collections.
//!
//! This crate is the primary entry point for users of docfind. It re-exports
//! the core types from the sub-crates and provides convenient access to the
//! bundled storage backend.
//!
//! # Features
//!
//! - **Typed documents** - Define your records with Serde and store them safely
//! - **Fluent queries** - Chain filters, sorting, projection and limits, then
//!   run a terminal operation
//! - **Schemas** - Declare field types, required fields and defaults, enforced
//!   on insert
//! - **Pluggable backends** - Storage lives behind a trait; an in-memory
//!   backend ships in the box
//!
//! # Quick Start
//!
//! ```ignore
//! use docfind::{prelude::*, memory::InMemoryStore};
//! use bson::Uuid;
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Debug, Clone, Serialize, Deserialize)]
//! pub struct Course {
//!     pub id: Uuid,
//!     pub name: String,
//!     pub author: String,
//!     pub tags: Vec<String>,
//!     pub is_published: bool,
//! }
//!
//! impl Document for Course {
//!     fn id(&self) -> &Uuid { &self.id }
//!     fn collection_name() -> &'static str { "courses" }
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let store = DocumentStore::new(InMemoryStore::builder().build().await.unwrap());
//!     let courses = store.typed_collection::<Course>();
//!
//!     let course = Course {
//!         id: Uuid::new(),
//!         name: "Node Course".to_string(),
//!         author: "Mosh".to_string(),
//!         tags: vec!["node".to_string(), "backend".to_string()],
//!         is_published: true,
//!     };
//!
//!     courses.insert(vec![course.clone()]).await.unwrap();
//!
//!     // Fluent finder: filter, sort, limit, then execute.
//!     let results = courses
//!         .find()
//!         .filter(Filter::eq("author", "Mosh"))
//!         .sort("name", SortDirection::Asc)
//!         .limit(10)
//!         .execute()
//!         .await
//!         .unwrap();
//!
//!     println!("Found courses: {results:?}");
//!
//!     store.shutdown().await.unwrap();
//! }
//! ```
//!
//! # Backends
//!
//! - [`memory`] - Fast in-memory storage for development and testing

pub mod prelude;

pub use docfind_core::{backend, collection, document, error, query, schema, store};

// Re-export BSON types for convenience
pub use bson;

/// In-memory storage backend implementations.
pub mod memory {
    pub use docfind_memory::{InMemoryStore, InMemoryStoreBuilder};
}
