use crate::collection::{
    AddResult, BulkAddResult, BulkUpdateResult, BulkUpsertResult, ChangeAction, ChangeEvent,
    ChangeListener, Cluster, DeleteResult, DocsView, Document, Subscription, SubscriptionOptions,
    UpdateResult, UpsertResult, WriteStatus,
};
use crate::common::{atomic, Atomic, ReadExecutor, Value, WriteExecutor, DOC_ID};
use crate::errors::{ClientDbError, ClientDbResult, ErrorKind};
use crate::filter::Filter;
use indexmap::IndexMap;
use itertools::Itertools;
use std::sync::Arc;

/// Derives the union of field names across the given documents, first occurrence first.
fn key_union<'a>(docs: impl IntoIterator<Item = &'a Document>) -> Vec<String> {
    docs.into_iter()
        .flat_map(|doc| doc.fields())
        .unique()
        .collect()
}

/// Checks that every document carries an identifier, enumerating all offenders.
fn validate_ids(docs: &[Document]) -> ClientDbResult<()> {
    let offenders: Vec<&Document> = docs.iter().filter(|doc| !doc.has_id()).collect();

    if !offenders.is_empty() {
        let listed = offenders.iter().map(|doc| doc.to_string()).join(", ");
        let message = format!(
            "All docs should have \"id\". Please, check next docs: {}",
            listed
        );
        log::error!("{}", message);
        return Err(ClientDbError::new(&message, ErrorKind::NotIdentifiable));
    }

    Ok(())
}

/// A named collection of schema-less documents.
///
/// `Collection` owns an insertion-ordered document list and is its sole mutator:
/// documents go in and out exclusively through the methods below, and every read
/// hands out defensive copies, so callers can never alias internal state.
///
/// Mutations run to completion synchronously. After a mutation actually changes
/// state, matching subscribers (see [`Collection::subscribe`]) are notified before
/// the mutating call returns, with the changed-field key set derived from the
/// mutation's input documents.
///
/// Collections are created and discarded by [`crate::clientdb::ClientDb`]; handles
/// are cheap clones sharing the same underlying state.
///
/// # Examples
///
/// ```rust,ignore
/// use clientdb::{doc, ClientDb};
///
/// let db = ClientDb::new();
/// let notes = db.create_collection("notes")?;
///
/// notes.add(doc! { id: "1", title: "First" })?;
/// let all = notes.get_all().exec();
/// ```
#[derive(Clone)]
pub struct Collection {
    inner: Arc<CollectionInner>,
}

struct CollectionInner {
    name: String,
    /// Opaque to the engine; carried for external validators.
    schema: Option<Value>,
    docs: Atomic<Vec<Document>>,
    /// Field key -> subscriptions registered under that key, in registration order.
    listeners: Atomic<IndexMap<String, Vec<Arc<Subscription>>>>,
}

impl Collection {
    pub(crate) fn new(name: &str, schema: Option<Value>) -> Self {
        Collection {
            inner: Arc::new(CollectionInner {
                name: name.to_string(),
                schema,
                docs: atomic(Vec::new()),
                listeners: atomic(IndexMap::new()),
            }),
        }
    }

    /// Returns the name of this collection.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Returns the schema attached at creation time, if any. Not interpreted here.
    pub fn schema(&self) -> Option<&Value> {
        self.inner.schema.as_ref()
    }

    /// Returns the number of documents in the collection.
    pub fn len(&self) -> usize {
        self.inner.docs.read_with(|docs| docs.len())
    }

    /// Checks if the collection holds no documents.
    pub fn is_empty(&self) -> bool {
        self.inner.docs.read_with(|docs| docs.is_empty())
    }

    /// Returns a copy of the full document list, in insertion order.
    pub fn docs(&self) -> Vec<Document> {
        self.inner.docs.read_with(|docs| docs.clone())
    }

    // ---- mutation operations ----

    /// Appends a document to the collection.
    ///
    /// Duplicate detection uses full structural equality, not just identifier match:
    /// adding a document deep-equal to a stored one fails, while adding a document
    /// that merely shares an identifier succeeds.
    ///
    /// Notifies subscribers keyed on any of the document's own field names with
    /// action [`ChangeAction::Added`].
    ///
    /// # Errors
    ///
    /// - [`ErrorKind::NotIdentifiable`] if the document lacks an identifier
    /// - [`ErrorKind::DuplicateDocument`] if a deep-equal document already exists
    pub fn add(&self, doc: Document) -> ClientDbResult<AddResult> {
        doc.id()?;

        let all_docs = self.inner.docs.write_with(|docs| {
            if docs.iter().any(|existing| existing == &doc) {
                log::error!(
                    "Current object already present in collection '{}'",
                    self.inner.name
                );
                return Err(ClientDbError::new(
                    "Current object already present in this collection",
                    ErrorKind::DuplicateDocument,
                ));
            }

            docs.push(doc.clone());
            Ok(docs.clone())
        })?;

        log::debug!("Added 1 document to collection '{}'", self.inner.name);
        self.notify(
            std::slice::from_ref(&doc),
            ChangeAction::Added,
            &key_union([&doc]),
        );

        Ok(AddResult {
            all_docs,
            added: doc,
            status: WriteStatus::Success,
        })
    }

    /// Appends several documents at once, skipping structural duplicates.
    ///
    /// Entries deep-equal to a stored document are silently skipped; the operation
    /// never fails outright for duplication. When anything was skipped the status
    /// is [`WriteStatus::AddedWithWarnings`] and `added` holds the applied subset.
    ///
    /// Notification keys are the union of field names across the actually-added
    /// documents, so subscribers keyed only on absent fields are not woken.
    ///
    /// # Errors
    ///
    /// [`ErrorKind::NotIdentifiable`] if any entry lacks an identifier; the message
    /// enumerates every offending document and nothing is applied.
    pub fn bulk_add(&self, docs: Vec<Document>) -> ClientDbResult<BulkAddResult> {
        validate_ids(&docs)?;

        let (added, all_docs) = self.inner.docs.write_with(|stored| {
            let added: Vec<Document> = docs
                .iter()
                .filter(|doc| !stored.iter().any(|existing| existing == *doc))
                .cloned()
                .collect();

            stored.extend(added.iter().cloned());
            (added, stored.clone())
        });

        log::debug!(
            "Bulk added {} of {} documents to collection '{}'",
            added.len(),
            docs.len(),
            self.inner.name
        );
        self.notify(&added, ChangeAction::BulkAdded, &key_union(added.iter()));

        let status = if added.len() != docs.len() {
            WriteStatus::AddedWithWarnings
        } else {
            WriteStatus::Success
        };

        Ok(BulkAddResult {
            all_docs,
            added,
            status,
        })
    }

    /// Merges `fields` onto the stored document carrying the same identifier.
    ///
    /// Fields present in the patch overwrite, absent fields are preserved. The
    /// merged document is relocated to the end of the list. Notification keys are
    /// exactly the patch's own field names.
    ///
    /// # Errors
    ///
    /// - [`ErrorKind::NotIdentifiable`] if the patch lacks an identifier
    /// - [`ErrorKind::NotFound`] if no stored document matches the identifier
    pub fn update(&self, fields: Document) -> ClientDbResult<UpdateResult> {
        let id = fields.id()?;

        let (old, updated, all_docs) = self.inner.docs.write_with(|docs| {
            let position = docs.iter().position(|doc| doc.get(DOC_ID) == id);
            let position = match position {
                Some(position) => position,
                None => {
                    log::error!(
                        "Current object is not in collection '{}'",
                        self.inner.name
                    );
                    return Err(ClientDbError::new(
                        "Current object is not in this collection",
                        ErrorKind::NotFound,
                    ));
                }
            };

            let old = docs.remove(position);
            let updated = old.merge(&fields);
            docs.push(updated.clone());
            Ok((old, updated, docs.clone()))
        })?;

        log::debug!("Updated 1 document in collection '{}'", self.inner.name);
        self.notify(
            std::slice::from_ref(&updated),
            ChangeAction::Updated,
            &key_union([&fields]),
        );

        Ok(UpdateResult {
            all_docs,
            updated,
            old,
            status: WriteStatus::Success,
        })
    }

    /// Merges several patches at once, matching stored documents by identifier.
    ///
    /// Matched documents merge like [`Collection::update`] and move to the end of
    /// the list in their prior relative order; patches matching nothing are not
    /// applied and come back in `unmatched` with status
    /// [`WriteStatus::MissingDocsSkipped`] rather than an error. Notification keys
    /// are the union of the matched patches' field names.
    ///
    /// # Errors
    ///
    /// [`ErrorKind::NotIdentifiable`] if any patch lacks an identifier; the message
    /// enumerates every offending document and nothing is applied.
    pub fn bulk_update(&self, entries: Vec<Document>) -> ClientDbResult<BulkUpdateResult> {
        validate_ids(&entries)?;

        let (old_docs, updated, matched_entries, unmatched, all_docs) =
            self.inner.docs.write_with(|docs| {
                let entry_ids: Vec<Value> =
                    entries.iter().map(|entry| entry.get(DOC_ID)).collect();

                let mut remaining = Vec::with_capacity(docs.len());
                let mut old_docs = Vec::new();
                for doc in docs.drain(..) {
                    if entry_ids.contains(&doc.get(DOC_ID)) {
                        old_docs.push(doc);
                    } else {
                        remaining.push(doc);
                    }
                }

                let mut pending = entries.clone();
                let mut matched_entries = Vec::with_capacity(old_docs.len());
                let mut updated = Vec::with_capacity(old_docs.len());
                for old in &old_docs {
                    let position = pending
                        .iter()
                        .position(|entry| entry.get(DOC_ID) == old.get(DOC_ID));
                    if let Some(position) = position {
                        let entry = pending.remove(position);
                        updated.push(old.merge(&entry));
                        matched_entries.push(entry);
                    }
                }

                *docs = remaining;
                docs.extend(updated.iter().cloned());
                (old_docs, updated, matched_entries, pending, docs.clone())
            });

        log::debug!(
            "Bulk updated {} of {} documents in collection '{}'",
            updated.len(),
            entries.len(),
            self.inner.name
        );
        self.notify(
            &updated,
            ChangeAction::BulkUpdated,
            &key_union(matched_entries.iter()),
        );

        let status = if unmatched.is_empty() {
            WriteStatus::Success
        } else {
            WriteStatus::MissingDocsSkipped
        };

        Ok(BulkUpdateResult {
            all_docs,
            updated,
            old_docs,
            unmatched,
            status,
        })
    }

    /// Inserts the document, or merges it onto the stored document with the same
    /// identifier.
    ///
    /// Unlike [`Collection::add`] there is no structural duplicate check: an
    /// unknown identifier is inserted unconditionally. The merged or inserted
    /// document ends up at the end of the list. Notification uses action
    /// [`ChangeAction::AddedOrUpdated`] and the input document's own field names.
    ///
    /// # Errors
    ///
    /// [`ErrorKind::NotIdentifiable`] if the document lacks an identifier.
    pub fn upsert(&self, doc: Document) -> ClientDbResult<UpsertResult> {
        let id = doc.id()?;

        let (upserted, all_docs) = self.inner.docs.write_with(|docs| {
            let position = docs.iter().position(|stored| stored.get(DOC_ID) == id);
            let upserted = match position {
                Some(position) => {
                    let old = docs.remove(position);
                    old.merge(&doc)
                }
                None => doc.clone(),
            };

            docs.push(upserted.clone());
            (upserted, docs.clone())
        });

        log::debug!("Upserted 1 document in collection '{}'", self.inner.name);
        self.notify(
            std::slice::from_ref(&upserted),
            ChangeAction::AddedOrUpdated,
            &key_union([&doc]),
        );

        Ok(UpsertResult {
            all_docs,
            upserted,
            status: WriteStatus::Success,
        })
    }

    /// Applies [`Collection::upsert`] semantics to every entry in one pass.
    ///
    /// Existing-identifier entries merge-replace their stored document; new
    /// identifiers append. Every resulting document counts as changed regardless of
    /// whether it was an insert or a merge, and notification keys are the union of
    /// all input entries' field names.
    ///
    /// # Errors
    ///
    /// [`ErrorKind::NotIdentifiable`] if any entry lacks an identifier; the message
    /// enumerates every offending document and nothing is applied.
    pub fn bulk_upsert(&self, entries: Vec<Document>) -> ClientDbResult<BulkUpsertResult> {
        validate_ids(&entries)?;

        let (upserted, all_docs) = self.inner.docs.write_with(|docs| {
            let mut upserted = Vec::with_capacity(entries.len());
            for entry in &entries {
                let id = entry.get(DOC_ID);
                let position = docs.iter().position(|stored| stored.get(DOC_ID) == id);
                let merged = match position {
                    Some(position) => docs.remove(position).merge(entry),
                    None => entry.clone(),
                };
                upserted.push(merged);
            }

            docs.extend(upserted.iter().cloned());
            (upserted, docs.clone())
        });

        log::debug!(
            "Bulk upserted {} documents in collection '{}'",
            upserted.len(),
            self.inner.name
        );
        self.notify(
            &upserted,
            ChangeAction::AddedOrUpdated,
            &key_union(entries.iter()),
        );

        Ok(BulkUpsertResult {
            all_docs,
            upserted,
            status: WriteStatus::Success,
        })
    }

    /// Removes every document whose identifier is in the argument set.
    ///
    /// Requested identifiers that match nothing are reported through
    /// [`WriteStatus::NotFoundIds`]; their absence is not a hard failure.
    /// Subscribers are notified only when at least one document was actually
    /// removed, keyed on the union of the removed documents' field names.
    ///
    /// # Errors
    ///
    /// [`ErrorKind::InvalidOperation`] when called with no identifiers.
    pub fn delete<I: Into<Value>>(&self, ids: Vec<I>) -> ClientDbResult<DeleteResult> {
        let ids: Vec<Value> = ids.into_iter().map(Into::into).collect();

        if ids.is_empty() {
            log::error!(
                "delete on collection '{}' called without ids",
                self.inner.name
            );
            return Err(ClientDbError::new(
                "This method required at least 1 id as argument.",
                ErrorKind::InvalidOperation,
            ));
        }

        let (removed, all_docs) = self.inner.docs.write_with(|docs| {
            let mut removed = Vec::new();
            docs.retain(|doc| {
                if ids.contains(&doc.get(DOC_ID)) {
                    removed.push(doc.clone());
                    false
                } else {
                    true
                }
            });
            (removed, docs.clone())
        });

        let not_found: Vec<Value> = ids
            .iter()
            .filter(|id| !removed.iter().any(|doc| &doc.get(DOC_ID) == *id))
            .cloned()
            .collect();

        log::debug!(
            "Deleted {} of {} requested documents from collection '{}'",
            removed.len(),
            ids.len(),
            self.inner.name
        );
        if !removed.is_empty() {
            self.notify(&removed, ChangeAction::Deleted, &key_union(removed.iter()));
        }

        let status = if not_found.is_empty() {
            WriteStatus::Success
        } else {
            WriteStatus::NotFoundIds(not_found)
        };

        Ok(DeleteResult {
            all_docs,
            removed,
            status,
        })
    }

    // ---- read operations ----

    /// Returns a [`Cluster`] over a snapshot of the entire document list.
    pub fn get_all(&self) -> Cluster {
        Cluster::new(self.docs())
    }

    /// Returns a [`Cluster`] over the documents satisfying the filter.
    ///
    /// Accepts a field-equality shape ([`Document`] converts into a shape filter)
    /// or a predicate built with [`Filter::predicate`].
    pub fn find(&self, filter: impl Into<Filter>) -> Cluster {
        let filter = filter.into();
        let matched = self
            .inner
            .docs
            .read_with(|docs| docs.iter().filter(|doc| filter.matches(doc)).cloned().collect());
        Cluster::new(matched)
    }

    /// Returns the first document (in list order) satisfying the filter, if any.
    pub fn get_one(&self, filter: impl Into<Filter>) -> Option<Document> {
        let filter = filter.into();
        self.inner
            .docs
            .read_with(|docs| docs.iter().find(|doc| filter.matches(doc)).cloned())
    }

    /// Returns the first document of the collection, if any.
    pub fn get_first(&self) -> Option<Document> {
        self.inner.docs.read_with(|docs| docs.first().cloned())
    }

    /// Returns the first document whose identifier equals `id`, if any.
    pub fn get_by_id(&self, id: impl Into<Value>) -> Option<Document> {
        let id = id.into();
        self.inner
            .docs
            .read_with(|docs| docs.iter().find(|doc| doc.get(DOC_ID) == id).cloned())
    }

    // ---- subscription protocol ----

    /// Registers a change listener under every key in `keys`.
    ///
    /// The listener is immediately invoked once, synchronously, with the current
    /// full document list as both payloads and action
    /// [`ChangeAction::Initialized`], so a new subscriber can bootstrap its view
    /// without a separate read call.
    ///
    /// The same subscription is shared across all its keys: the returned handle's
    /// [`SubscriptionHandle::unsubscribe`] removes it from every key at once, and a
    /// mutation matching several of its keys still notifies it only once.
    ///
    /// # Errors
    ///
    /// [`ErrorKind::InvalidSubscription`] if any key is an empty string.
    pub fn subscribe<K: Into<String>>(
        &self,
        keys: Vec<K>,
        listener: ChangeListener,
        options: SubscriptionOptions,
    ) -> ClientDbResult<SubscriptionHandle> {
        let keys: Vec<String> = keys.into_iter().map(Into::into).unique().collect();

        if keys.iter().any(|key| key.is_empty()) {
            log::error!(
                "subscribe on collection '{}' called with an empty key",
                self.inner.name
            );
            return Err(ClientDbError::new(
                "Keys should be non-empty field names",
                ErrorKind::InvalidSubscription,
            ));
        }

        let config = Arc::new(Subscription { listener, options });

        self.inner.listeners.write_with(|listeners| {
            for key in &keys {
                listeners
                    .entry(key.clone())
                    .or_default()
                    .push(config.clone());
            }
        });

        log::debug!(
            "Subscribed listener under {} key(s) on collection '{}'",
            keys.len(),
            self.inner.name
        );
        let docs = self.docs();
        self.emit(&docs, &config, ChangeAction::Initialized);

        Ok(SubscriptionHandle {
            collection: self.clone(),
            keys,
            config,
        })
    }

    fn remove_subscription(&self, keys: &[String], config: &Arc<Subscription>) {
        self.inner.listeners.write_with(|listeners| {
            for key in keys {
                if let Some(configs) = listeners.get_mut(key) {
                    configs.retain(|registered| !Subscription::same(registered, config));
                }
            }
        });
    }

    /// Dispatches a change to every subscriber registered under any of `keys`.
    ///
    /// Subscribers registered under several matching keys are deduplicated by
    /// subscription identity, so each one is invoked exactly once per mutation.
    /// No lock is held while listeners run; a listener may call back into the
    /// collection.
    fn notify(&self, changes: &[Document], action: ChangeAction, keys: &[String]) {
        let matching: Vec<Arc<Subscription>> = self.inner.listeners.read_with(|listeners| {
            let mut selected: Vec<Arc<Subscription>> = Vec::new();
            for key in keys {
                if let Some(configs) = listeners.get(key) {
                    for config in configs {
                        if !selected
                            .iter()
                            .any(|known| Subscription::same(known, config))
                        {
                            selected.push(config.clone());
                        }
                    }
                }
            }
            selected
        });

        for config in &matching {
            self.emit(changes, config, action);
        }
    }

    /// Builds the payload for one subscriber and invokes its listener.
    ///
    /// A failing listener is isolated: the error is logged and dispatch continues
    /// with the remaining subscribers.
    fn emit(&self, changes: &[Document], config: &Subscription, action: ChangeAction) {
        let all_docs = self.docs();
        let all_view = if config.options.clustered_all {
            DocsView::Clustered(Cluster::new(all_docs))
        } else {
            DocsView::Plain(all_docs)
        };
        let changes_view = if config.options.clustered_changes {
            DocsView::Clustered(Cluster::new(changes.to_vec()))
        } else {
            DocsView::Plain(changes.to_vec())
        };

        let event = ChangeEvent::new(all_view, changes_view, action);
        if let Err(err) = config.listener.call(event) {
            log::error!(
                "Change listener failed during '{}' dispatch on collection '{}': {}",
                action,
                self.inner.name,
                err
            );
        }
    }
}

impl std::fmt::Debug for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collection")
            .field("name", &self.inner.name)
            .field("len", &self.len())
            .finish()
    }
}

/// Handle returned by [`Collection::subscribe`].
///
/// Keeps the subscription identity so [`SubscriptionHandle::unsubscribe`] can
/// remove it from every key it was registered under. Dropping the handle without
/// unsubscribing leaves the subscription active for the collection's lifetime.
pub struct SubscriptionHandle {
    collection: Collection,
    keys: Vec<String>,
    config: Arc<Subscription>,
}

impl SubscriptionHandle {
    /// Removes this subscription from every key it was registered under.
    ///
    /// Safe to call more than once; removing an absent entry is a no-op.
    pub fn unsubscribe(&self) {
        self.collection.remove_subscription(&self.keys, &self.config);
    }

    /// Returns the keys this subscription was registered under.
    pub fn keys(&self) -> &[String] {
        &self.keys
    }
}

impl std::fmt::Debug for SubscriptionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionHandle")
            .field("collection", &self.collection.name())
            .field("keys", &self.keys)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doc;
    use crate::filter::field;
    use std::sync::Mutex;

    fn set_up() -> Collection {
        Collection::new("instance", None)
    }

    fn seeded() -> Collection {
        let collection = set_up();
        collection
            .bulk_add(vec![
                doc! { id: "1", title: "Test" },
                doc! { id: "2", title: "Test 2" },
                doc! { id: "3", title: "Test 3" },
                doc! { id: "4", title: "Fourth Test 4" },
            ])
            .expect("seed failed");
        collection
    }

    /// Records every (action, changes) pair a listener receives.
    fn recording_listener() -> (Arc<Mutex<Vec<(ChangeAction, Vec<Document>)>>>, ChangeListener) {
        let calls: Arc<Mutex<Vec<(ChangeAction, Vec<Document>)>>> = Arc::new(Mutex::new(vec![]));
        let calls_clone = calls.clone();
        let listener = ChangeListener::new(move |event: ChangeEvent| {
            calls_clone
                .lock()
                .unwrap()
                .push((event.action(), event.changes().docs()));
            Ok(())
        });
        (calls, listener)
    }

    #[test]
    fn test_new_collection_is_empty() {
        let collection = set_up();
        assert_eq!(collection.name(), "instance");
        assert!(collection.is_empty());
        assert!(collection.schema().is_none());
    }

    #[test]
    fn test_add() {
        let collection = set_up();
        let result = collection.add(doc! { id: "1", title: "Test" }).unwrap();

        assert_eq!(result.status, WriteStatus::Success);
        assert_eq!(result.added, doc! { id: "1", title: "Test" });
        assert_eq!(result.all_docs, collection.docs());
        assert_eq!(collection.len(), 1);
    }

    #[test]
    fn test_add_without_id_fails() {
        let collection = set_up();
        let result = collection.add(doc! { title: "no id" });
        assert_eq!(result.unwrap_err().kind(), &ErrorKind::NotIdentifiable);
        assert!(collection.is_empty());
    }

    #[test]
    fn test_add_prevents_duplicates() {
        let collection = set_up();
        collection.add(doc! { id: "1", title: "Test" }).unwrap();

        let result = collection.add(doc! { id: "1", title: "Test" });
        assert_eq!(result.unwrap_err().kind(), &ErrorKind::DuplicateDocument);
        assert_eq!(collection.len(), 1);
    }

    #[test]
    fn test_add_same_id_different_content_is_allowed() {
        let collection = set_up();
        collection.add(doc! { id: "1", title: "Test" }).unwrap();
        collection.add(doc! { id: "1", title: "Other" }).unwrap();
        assert_eq!(collection.len(), 2);
    }

    #[test]
    fn test_bulk_add() {
        let collection = set_up();
        let result = collection
            .bulk_add(vec![
                doc! { id: "1", title: "Test" },
                doc! { id: "2", title: "Test 2" },
            ])
            .unwrap();

        assert_eq!(result.status, WriteStatus::Success);
        assert_eq!(result.added.len(), 2);
        assert_eq!(collection.len(), 2);
    }

    #[test]
    fn test_bulk_add_skips_duplicates_with_warning() {
        let collection = set_up();
        collection.add(doc! { id: "1", title: "Test" }).unwrap();

        let result = collection
            .bulk_add(vec![
                doc! { id: "1", title: "Test" },
                doc! { id: "2", title: "Test 2" },
            ])
            .unwrap();

        assert_eq!(result.status, WriteStatus::AddedWithWarnings);
        assert_eq!(result.added, vec![doc! { id: "2", title: "Test 2" }]);
        assert_eq!(collection.len(), 2);
    }

    #[test]
    fn test_bulk_add_enumerates_offenders() {
        let collection = set_up();
        let result = collection.bulk_add(vec![
            doc! { id: "1", title: "ok" },
            doc! { title: "first offender" },
            doc! { title: "second offender" },
        ]);

        let error = result.unwrap_err();
        assert_eq!(error.kind(), &ErrorKind::NotIdentifiable);
        assert!(error.message().contains("first offender"));
        assert!(error.message().contains("second offender"));
        // fail fast: nothing was applied
        assert!(collection.is_empty());
    }

    #[test]
    fn test_get_all_snapshots() {
        let collection = seeded();
        let cluster = collection.get_all();
        assert_eq!(cluster.exec(), collection.docs());

        // later mutation does not change the captured snapshot
        collection.delete(vec!["1"]).unwrap();
        assert_eq!(cluster.exec().len(), 4);
    }

    #[test]
    fn test_find_by_shape_and_predicate() {
        let collection = seeded();

        let by_shape = collection.find(doc! { id: "4" }).exec();
        assert_eq!(by_shape, vec![doc! { id: "4", title: "Fourth Test 4" }]);

        let by_predicate = collection
            .find(Filter::predicate(|doc| {
                doc.get("title")
                    .as_str()
                    .map(|t| t.contains("Four"))
                    .unwrap_or(false)
            }))
            .exec();
        assert_eq!(by_predicate.len(), 1);

        assert!(collection.find(doc! { id: "5" }).exec().is_empty());
    }

    #[test]
    fn test_get_one() {
        let collection = seeded();
        assert_eq!(
            collection.get_one(doc! { id: "4" }),
            Some(doc! { id: "4", title: "Fourth Test 4" })
        );
        assert_eq!(
            collection.get_one(field("title").eq("Test 2")),
            Some(doc! { id: "2", title: "Test 2" })
        );
        assert!(collection.get_one(doc! { id: "5" }).is_none());
    }

    #[test]
    fn test_get_first() {
        let collection = seeded();
        assert_eq!(collection.get_first(), Some(doc! { id: "1", title: "Test" }));
        assert!(set_up().get_first().is_none());
    }

    #[test]
    fn test_get_by_id() {
        let collection = seeded();
        assert_eq!(
            collection.get_by_id("4"),
            Some(doc! { id: "4", title: "Fourth Test 4" })
        );
        assert!(collection.get_by_id("5").is_none());
    }

    #[test]
    fn test_update_merges_and_relocates() {
        let collection = seeded();
        let result = collection
            .update(doc! { id: "1", rank: 10 })
            .unwrap();

        // patched field applied, untouched field preserved
        assert_eq!(result.updated.get("rank"), Value::from(10));
        assert_eq!(result.updated.get("title"), Value::from("Test"));
        assert_eq!(result.old, doc! { id: "1", title: "Test" });

        // updated doc relocated to the end of the list
        let docs = collection.docs();
        assert_eq!(docs.len(), 4);
        assert_eq!(docs.last().unwrap().get(DOC_ID), Value::from("1"));
    }

    #[test]
    fn test_update_unknown_id_fails() {
        let collection = seeded();
        let result = collection.update(doc! { id: "9", rank: 1 });
        assert_eq!(result.unwrap_err().kind(), &ErrorKind::NotFound);
        assert_eq!(collection.len(), 4);
    }

    #[test]
    fn test_bulk_update_partial_match() {
        let collection = seeded();
        let result = collection
            .bulk_update(vec![
                doc! { id: "1", rank: 1 },
                doc! { id: "9", rank: 9 },
            ])
            .unwrap();

        assert_eq!(result.status, WriteStatus::MissingDocsSkipped);
        assert_eq!(result.updated.len(), 1);
        assert_eq!(result.updated[0].get("rank"), Value::from(1));
        assert_eq!(result.updated[0].get("title"), Value::from("Test"));
        assert_eq!(result.old_docs, vec![doc! { id: "1", title: "Test" }]);
        assert_eq!(result.unmatched, vec![doc! { id: "9", rank: 9 }]);
        assert_eq!(collection.len(), 4);
    }

    #[test]
    fn test_bulk_update_full_match() {
        let collection = seeded();
        let result = collection
            .bulk_update(vec![
                doc! { id: "1", rank: 1 },
                doc! { id: "2", rank: 2 },
            ])
            .unwrap();

        assert_eq!(result.status, WriteStatus::Success);
        assert_eq!(result.updated.len(), 2);
        assert!(result.unmatched.is_empty());

        // both updated docs moved to the end, prior order preserved
        let docs = collection.docs();
        assert_eq!(docs[2].get(DOC_ID), Value::from("1"));
        assert_eq!(docs[3].get(DOC_ID), Value::from("2"));
    }

    #[test]
    fn test_upsert_inserts_unknown_id() {
        let collection = seeded();
        let result = collection.upsert(doc! { id: "9", title: "Ninth" }).unwrap();

        assert_eq!(result.upserted, doc! { id: "9", title: "Ninth" });
        assert_eq!(collection.len(), 5);
    }

    #[test]
    fn test_upsert_merges_existing_id() {
        let collection = seeded();
        let result = collection.upsert(doc! { id: "1", rank: 5 }).unwrap();

        assert_eq!(result.upserted.get("title"), Value::from("Test"));
        assert_eq!(result.upserted.get("rank"), Value::from(5));
        assert_eq!(collection.len(), 4);
    }

    #[test]
    fn test_bulk_upsert_mixed() {
        let collection = seeded();
        let result = collection
            .bulk_upsert(vec![
                doc! { id: "1", rank: 1 },
                doc! { id: "9", title: "Ninth" },
            ])
            .unwrap();

        assert_eq!(result.status, WriteStatus::Success);
        assert_eq!(result.upserted.len(), 2);
        assert_eq!(result.upserted[0].get("title"), Value::from("Test"));
        assert_eq!(result.upserted[1], doc! { id: "9", title: "Ninth" });
        assert_eq!(collection.len(), 5);
    }

    #[test]
    fn test_delete() {
        let collection = seeded();
        let result = collection.delete(vec!["2"]).unwrap();

        assert_eq!(result.status, WriteStatus::Success);
        assert_eq!(result.removed, vec![doc! { id: "2", title: "Test 2" }]);
        assert_eq!(collection.len(), 3);
        assert!(collection.get_by_id("2").is_none());
    }

    #[test]
    fn test_delete_reports_missing_ids() {
        let collection = seeded();
        let result = collection.delete(vec!["1", "9"]).unwrap();

        assert_eq!(
            result.status,
            WriteStatus::NotFoundIds(vec![Value::from("9")])
        );
        assert_eq!(format!("{}", result.status), "Not found doc with id 9");
        assert_eq!(result.removed, vec![doc! { id: "1", title: "Test" }]);
        assert_eq!(collection.len(), 3);
    }

    #[test]
    fn test_delete_without_ids_fails() {
        let collection = seeded();
        let result = collection.delete(Vec::<Value>::new());
        assert_eq!(result.unwrap_err().kind(), &ErrorKind::InvalidOperation);
        assert_eq!(collection.len(), 4);
    }

    #[test]
    fn test_subscribe_bootstraps_with_initialized() {
        let collection = seeded();
        let (calls, listener) = recording_listener();

        collection
            .subscribe(vec!["title"], listener, SubscriptionOptions::default())
            .unwrap();

        let calls = calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, ChangeAction::Initialized);
        assert_eq!(calls[0].1, collection.docs());
    }

    #[test]
    fn test_subscribe_empty_key_fails() {
        let collection = set_up();
        let (_, listener) = recording_listener();
        let result = collection.subscribe(vec![""], listener, SubscriptionOptions::default());
        assert_eq!(
            result.unwrap_err().kind(),
            &ErrorKind::InvalidSubscription
        );
    }

    #[test]
    fn test_key_scoped_notification() {
        let collection = set_up();
        let (calls, listener) = recording_listener();
        collection
            .subscribe(vec!["title"], listener, SubscriptionOptions::default())
            .unwrap();

        // changed-field set contains 'title': subscriber is woken
        collection.add(doc! { id: "1", title: "x" }).unwrap();
        // changed-field set is {id, other}: subscriber stays silent
        collection.add(doc! { id: "2", other: "y" }).unwrap();

        let calls = calls.lock().unwrap();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[1].0, ChangeAction::Added);
        assert_eq!(calls[1].1, vec![doc! { id: "1", title: "x" }]);
    }

    #[test]
    fn test_multi_key_subscriber_notified_once() {
        let collection = set_up();
        let (calls, listener) = recording_listener();
        collection
            .subscribe(vec!["id", "title"], listener, SubscriptionOptions::default())
            .unwrap();

        collection.add(doc! { id: "1", title: "x" }).unwrap();

        // both keys match, but the subscription is deduplicated by identity
        let calls = calls.lock().unwrap();
        assert_eq!(calls.len(), 2);
    }

    #[test]
    fn test_no_keys_subscriber_only_sees_initialized() {
        let collection = set_up();
        let (calls, listener) = recording_listener();
        collection
            .subscribe(Vec::<String>::new(), listener, SubscriptionOptions::default())
            .unwrap();

        collection.add(doc! { id: "1", title: "x" }).unwrap();
        collection.delete(vec!["1"]).unwrap();

        let calls = calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, ChangeAction::Initialized);
    }

    #[test]
    fn test_actions_per_operation() {
        let collection = set_up();
        let (calls, listener) = recording_listener();
        collection
            .subscribe(vec!["title", "rank"], listener, SubscriptionOptions::default())
            .unwrap();

        collection.add(doc! { id: "1", title: "a" }).unwrap();
        collection.bulk_add(vec![doc! { id: "2", title: "b" }]).unwrap();
        collection.update(doc! { id: "1", rank: 1 }).unwrap();
        collection.bulk_update(vec![doc! { id: "2", rank: 2 }]).unwrap();
        collection.upsert(doc! { id: "3", title: "c" }).unwrap();
        collection.bulk_upsert(vec![doc! { id: "4", title: "d" }]).unwrap();
        collection.delete(vec!["4"]).unwrap();

        let actions: Vec<ChangeAction> =
            calls.lock().unwrap().iter().map(|(action, _)| *action).collect();
        assert_eq!(
            actions,
            vec![
                ChangeAction::Initialized,
                ChangeAction::Added,
                ChangeAction::BulkAdded,
                ChangeAction::Updated,
                ChangeAction::BulkUpdated,
                ChangeAction::AddedOrUpdated,
                ChangeAction::AddedOrUpdated,
                ChangeAction::Deleted,
            ]
        );
    }

    #[test]
    fn test_delete_without_removal_stays_silent() {
        let collection = seeded();
        let (calls, listener) = recording_listener();
        collection
            .subscribe(vec!["title"], listener, SubscriptionOptions::default())
            .unwrap();

        collection.delete(vec!["9"]).unwrap();

        let calls = calls.lock().unwrap();
        assert_eq!(calls.len(), 1); // initialized only
    }

    #[test]
    fn test_unsubscribe_stops_notifications() {
        let collection = set_up();
        let (calls, listener) = recording_listener();
        let handle = collection
            .subscribe(vec!["title"], listener, SubscriptionOptions::default())
            .unwrap();

        collection.add(doc! { id: "1", title: "x" }).unwrap();
        handle.unsubscribe();
        collection.add(doc! { id: "2", title: "y" }).unwrap();

        let calls = calls.lock().unwrap();
        assert_eq!(calls.len(), 2); // initialized + first add
    }

    #[test]
    fn test_unsubscribe_is_idempotent() {
        let collection = set_up();
        let (_, listener) = recording_listener();
        let handle = collection
            .subscribe(vec!["title"], listener, SubscriptionOptions::default())
            .unwrap();

        handle.unsubscribe();
        handle.unsubscribe();
    }

    #[test]
    fn test_unsubscribe_removes_from_every_key() {
        let collection = set_up();
        let (calls, listener) = recording_listener();
        let handle = collection
            .subscribe(vec!["id", "title"], listener, SubscriptionOptions::default())
            .unwrap();

        handle.unsubscribe();
        collection.add(doc! { id: "1", title: "x" }).unwrap();

        let calls = calls.lock().unwrap();
        assert_eq!(calls.len(), 1); // initialized only
    }

    #[test]
    fn test_clustered_payload_options() {
        let collection = seeded();
        let views: Arc<Mutex<Vec<(bool, bool)>>> = Arc::new(Mutex::new(vec![]));
        let views_clone = views.clone();
        let listener = ChangeListener::new(move |event: ChangeEvent| {
            views_clone.lock().unwrap().push((
                event.all_docs().is_clustered(),
                event.changes().is_clustered(),
            ));
            Ok(())
        });

        collection
            .subscribe(
                vec!["title"],
                listener,
                SubscriptionOptions {
                    clustered_all: true,
                    clustered_changes: false,
                },
            )
            .unwrap();
        collection.add(doc! { id: "9", title: "Ninth" }).unwrap();

        let views = views.lock().unwrap();
        assert_eq!(*views, vec![(true, false), (true, false)]);
    }

    #[test]
    fn test_failing_listener_is_isolated() {
        let collection = set_up();
        let failing = ChangeListener::new(|_event| {
            Err(ClientDbError::new("listener broke", ErrorKind::InternalError))
        });
        let (calls, recording) = recording_listener();

        collection
            .subscribe(vec!["title"], failing, SubscriptionOptions::default())
            .unwrap();
        collection
            .subscribe(vec!["title"], recording, SubscriptionOptions::default())
            .unwrap();

        // mutation succeeds and the healthy subscriber still hears about it
        collection.add(doc! { id: "1", title: "x" }).unwrap();

        let calls = calls.lock().unwrap();
        assert_eq!(calls.len(), 2);
    }

    #[test]
    fn test_notification_runs_within_mutating_call() {
        let collection = set_up();
        let observed: Arc<Mutex<Vec<usize>>> = Arc::new(Mutex::new(vec![]));
        let observed_clone = observed.clone();
        let listener = ChangeListener::new(move |event: ChangeEvent| {
            observed_clone
                .lock()
                .unwrap()
                .push(event.all_docs().docs().len());
            Ok(())
        });
        collection
            .subscribe(vec!["title"], listener, SubscriptionOptions::default())
            .unwrap();

        collection.add(doc! { id: "1", title: "x" }).unwrap();

        // the listener already observed the updated list before add returned
        assert_eq!(*observed.lock().unwrap(), vec![0, 1]);
    }
}
