//! # ClientDb - In-Memory Reactive Document Store
//!
//! ClientDb is a lightweight, in-process document store for client-side state.
//! It keeps named collections of schema-less documents entirely in memory and
//! notifies subscribers synchronously whenever the fields they watch change.
//!
//! ## Key Features
//!
//! - **In-process**: No server, no persistence; state lives and dies with the process
//! - **Schema-less Documents**: Key-value documents with a caller-supplied `"id"`
//! - **Write Operations**: add, update, upsert and their bulk variants, plus delete
//! - **Snapshot Queries**: Chainable [`collection::Cluster`] with sorting, offset
//!   and pagination over point-in-time snapshots
//! - **Reactive**: Key-scoped subscriptions with synchronous change notification
//! - **Clean API**: PIMPL pattern provides stable, encapsulated interface
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use clientdb::{doc, ClientDb, ChangeListener, SubscriptionOptions};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let db = ClientDb::new();
//! let notes = db.create_collection("notes")?;
//!
//! // Watch the 'title' field
//! let listener = ChangeListener::new(|event| {
//!     println!("{}: {} doc(s)", event.action(), event.changes().docs().len());
//!     Ok(())
//! });
//! notes.subscribe(vec!["title"], listener, SubscriptionOptions::default())?;
//!
//! // Mutate; the subscriber fires before add returns
//! notes.add(doc! { id: "1", title: "First" })?;
//!
//! // Query a snapshot
//! let page = notes
//!     .get_all()
//!     .sort_by("title", clientdb::SortOrder::Ascending)
//!     .limit(10)
//!     .exec();
//! # Ok(())
//! # }
//! ```
//!
//! ## Design Pattern
//!
//! ClientDb uses the **PIMPL (Pointer To IMPLementation)** design pattern:
//! handles like [`ClientDb`] and [`collection::Collection`] are cheap clones over
//! `Arc`-shared state, so the same database can be threaded through an
//! application freely while implementation details stay hidden.
//!
//! ## Module Organization
//!
//! - [`clientdb`] - The database: a registry of named collections
//! - [`collection`] - Collections, documents, clusters, and change events
//! - [`common`] - Common types, traits, and utilities
//! - [`errors`] - Error types and result definitions
//! - [`filter`] - Query filters for collection reads

pub mod clientdb;
pub mod collection;
pub mod common;
pub mod errors;
pub mod filter;

pub use crate::clientdb::ClientDb;
pub use crate::collection::{
    ChangeAction, ChangeEvent, ChangeListener, Cluster, Collection, Document, SubscriptionHandle,
    SubscriptionOptions, WriteStatus,
};
pub use crate::common::{SortOrder, Value};
pub use crate::errors::{ClientDbError, ClientDbResult, ErrorKind};
pub use crate::filter::Filter;
