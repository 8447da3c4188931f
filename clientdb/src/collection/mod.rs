//! Named collections of schema-less documents.
//!
//! A [`Collection`] stores [`Document`]s in insertion order, mutates them through
//! identifier-based write operations, serves reads through snapshot-backed
//! [`Cluster`]s, and notifies key-scoped subscribers (see
//! [`Collection::subscribe`]) synchronously after every effective mutation.

#[allow(clippy::module_inception)]
mod collection;
mod cluster;
mod document;
mod event;
mod write_result;

pub use collection::{Collection, SubscriptionHandle};
pub use cluster::Cluster;
pub use document::{normalize, Document, FieldVec};
pub use event::{
    ChangeAction, ChangeCallback, ChangeEvent, ChangeListener, DocsView, SubscriptionOptions,
};
pub use write_result::{
    AddResult, BulkAddResult, BulkUpdateResult, BulkUpsertResult, DeleteResult, UpdateResult,
    UpsertResult, WriteStatus,
};

pub(crate) use event::Subscription;
