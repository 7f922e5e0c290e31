//! Core abstractions for the docfind query layer.
//!
//! This crate defines everything backend-independent:
//!
//! - **Documents** ([`document`]) - traits for stored record types
//! - **Schemas** ([`schema`]) - field declarations, defaults and validation
//! - **Queries** ([`query`]) - the predicate AST, builder and patch types
//! - **Collections** ([`collection`]) - handles and fluent finders
//! - **Backend seam** ([`backend`]) - the storage trait backends implement
//! - **Store** ([`store`]) - the owning entry point
//! - **Errors** ([`error`]) - error and result types

#[allow(unused_extern_crates)]
extern crate self as docfind_core;

pub mod backend;
pub mod collection;
pub mod document;
pub mod error;
pub mod query;
pub mod schema;
pub mod store;
