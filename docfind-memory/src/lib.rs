//! In-memory storage backend for docfind.
//!
//! A thread-safe implementation of the `StoreBackend` trait holding all
//! documents as BSON values behind an async-aware read-write lock. Ideal
//! for tests, development and small datasets.
//!
//! ```ignore
//! use docfind_core::store::DocumentStore;
//! use docfind_memory::InMemoryStore;
//!
//! let store = DocumentStore::new(InMemoryStore::new());
//! let courses = store.typed_collection::<Course>();
//! ```

#[allow(unused_extern_crates)]
extern crate self as docfind_memory;

pub mod evaluator;
pub mod store;

pub use store::{InMemoryStore, InMemoryStoreBuilder};
