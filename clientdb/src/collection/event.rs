use crate::collection::{Cluster, Document};
use crate::errors::ClientDbResult;
use std::fmt::{Debug, Display, Formatter};
use std::sync::Arc;

/// The kind of mutation that produced a notification.
///
/// Every dispatched [`ChangeEvent`] carries exactly one action from this fixed
/// vocabulary. The [`Display`] form matches the wire-level label
/// (`"added"`, `"bulk added"`, `"updated"`, `"bulk updated"`,
/// `"added or updated"`, `"deleted"`, `"initialized"`).
///
/// `Initialized` is special: it is emitted once, synchronously, to a subscriber at
/// subscription time with the current full document list as both payloads, letting
/// the subscriber bootstrap its view without a separate read call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeAction {
    Added,
    BulkAdded,
    Updated,
    BulkUpdated,
    AddedOrUpdated,
    Deleted,
    Initialized,
}

impl Display for ChangeAction {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ChangeAction::Added => write!(f, "added"),
            ChangeAction::BulkAdded => write!(f, "bulk added"),
            ChangeAction::Updated => write!(f, "updated"),
            ChangeAction::BulkUpdated => write!(f, "bulk updated"),
            ChangeAction::AddedOrUpdated => write!(f, "added or updated"),
            ChangeAction::Deleted => write!(f, "deleted"),
            ChangeAction::Initialized => write!(f, "initialized"),
        }
    }
}

/// A document sequence as delivered to a subscriber: either a plain list or,
/// when the subscription requested it, wrapped in a fresh [`Cluster`].
#[derive(Debug, Clone, PartialEq)]
pub enum DocsView {
    Plain(Vec<Document>),
    Clustered(Cluster),
}

impl DocsView {
    /// Materializes the view as a plain document list, regardless of wrapping.
    pub fn docs(&self) -> Vec<Document> {
        match self {
            DocsView::Plain(docs) => docs.clone(),
            DocsView::Clustered(cluster) => cluster.exec(),
        }
    }

    /// Returns the cluster, if this view was clustered.
    pub fn as_cluster(&self) -> Option<&Cluster> {
        match self {
            DocsView::Clustered(cluster) => Some(cluster),
            DocsView::Plain(_) => None,
        }
    }

    /// Returns true if this view is wrapped in a cluster.
    pub fn is_clustered(&self) -> bool {
        matches!(self, DocsView::Clustered(_))
    }
}

/// Information about a change that occurred on a collection.
///
/// A `ChangeEvent` is handed to every matching subscriber after a mutation. It
/// captures the full document list and the changed-document set at dispatch time,
/// together with the [`ChangeAction`] describing the mutation.
///
/// # Characteristics
/// - **Cloneable**: Arc-backed, cheap to share
/// - **Immutable payloads**: Both views are captured when the event is built
#[derive(Clone)]
pub struct ChangeEvent {
    inner: Arc<ChangeEventInner>,
}

impl ChangeEvent {
    /// Creates a new change event with the specified payloads and action.
    ///
    /// # Arguments
    ///
    /// * `all_docs` - The full document list after the mutation
    /// * `changes` - The documents affected by the mutation
    /// * `action` - The mutation kind that produced this event
    pub fn new(all_docs: DocsView, changes: DocsView, action: ChangeAction) -> Self {
        ChangeEvent {
            inner: Arc::new(ChangeEventInner {
                all_docs,
                changes,
                action,
            }),
        }
    }

    /// Returns the full document list after the mutation.
    pub fn all_docs(&self) -> &DocsView {
        &self.inner.all_docs
    }

    /// Returns the documents affected by the mutation.
    pub fn changes(&self) -> &DocsView {
        &self.inner.changes
    }

    /// Returns the mutation kind that produced this event.
    pub fn action(&self) -> ChangeAction {
        self.inner.action
    }
}

impl Debug for ChangeEvent {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeEvent")
            .field("all_docs", &self.inner.all_docs)
            .field("changes", &self.inner.changes)
            .field("action", &self.inner.action)
            .finish()
    }
}

struct ChangeEventInner {
    all_docs: DocsView,
    changes: DocsView,
    action: ChangeAction,
}

/// Trait for closure-based change handlers.
///
/// Any closure matching the signature `Fn(ChangeEvent) -> ClientDbResult<()>`
/// automatically implements this trait.
///
/// # Requirements
///
/// - Must be Send + Sync so collection handles stay shareable
/// - Must return ClientDbResult<()> to allow error propagation; a failing handler
///   is logged and isolated, it never aborts dispatch to later subscribers
pub trait ChangeCallback: Send + Sync + Fn(ChangeEvent) -> ClientDbResult<()> {}

impl<F> ChangeCallback for F where F: Send + Sync + Fn(ChangeEvent) -> ClientDbResult<()> {}

/// Listener for collection change events.
///
/// `ChangeListener` wraps a change handler callback and is registered with a
/// collection via [`crate::collection::Collection::subscribe`] to receive
/// notifications when documents matching its keys change.
///
/// # Usage
///
/// ```rust,ignore
/// let listener = ChangeListener::new(|event| {
///     println!("{}: {} changed", event.action(), event.changes().docs().len());
///     Ok(())
/// });
/// let handle = collection.subscribe(vec!["title"], listener, SubscriptionOptions::default())?;
/// ```
#[derive(Clone)]
pub struct ChangeListener {
    on_change: Arc<dyn ChangeCallback>,
}

impl ChangeListener {
    /// Creates a new listener wrapping the provided callback.
    pub fn new(on_change: impl ChangeCallback + 'static) -> Self {
        ChangeListener {
            on_change: Arc::new(on_change),
        }
    }

    pub(crate) fn call(&self, event: ChangeEvent) -> ClientDbResult<()> {
        (self.on_change)(event)
    }
}

impl Debug for ChangeListener {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeListener").finish()
    }
}

/// Options controlling how payloads are delivered to one subscriber.
///
/// When a flag is set, the corresponding [`ChangeEvent`] payload is wrapped in a
/// fresh [`Cluster`] at dispatch time instead of being passed as a plain sequence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubscriptionOptions {
    /// Wrap the full document list in a cluster.
    pub clustered_all: bool,
    /// Wrap the changed-document set in a cluster.
    pub clustered_changes: bool,
}

impl SubscriptionOptions {
    /// Options that cluster both payloads.
    pub fn clustered() -> Self {
        SubscriptionOptions {
            clustered_all: true,
            clustered_changes: true,
        }
    }
}

/// One registered subscription: the listener plus its delivery options.
///
/// The same `Arc<Subscription>` is shared across every key the subscription was
/// registered under, so removal and dispatch deduplication both work by reference
/// identity rather than value equality.
pub(crate) struct Subscription {
    pub(crate) listener: ChangeListener,
    pub(crate) options: SubscriptionOptions,
}

impl Subscription {
    pub(crate) fn same(a: &Arc<Subscription>, b: &Arc<Subscription>) -> bool {
        Arc::ptr_eq(a, b)
    }
}
