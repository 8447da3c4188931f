use crate::collection::Collection;
use crate::common::{Value, CLIENTDB_VERSION};
use crate::errors::{ClientDbError, ClientDbResult, ErrorKind};
use dashmap::DashMap;
use std::sync::Arc;

/// An in-process, in-memory database: a registry of named [`Collection`]s.
///
/// `ClientDb` owns the collection lifecycle. Collections are created through
/// [`ClientDb::create_collection`], looked up by name, and dropped with
/// [`ClientDb::delete_collection`]; there is no persistence, the whole database
/// lives and dies with the process.
///
/// The handle is a cheap clone sharing one underlying registry, so a database can
/// be passed freely across threads and modules.
///
/// # Examples
///
/// ```rust,ignore
/// use clientdb::{doc, ClientDb};
///
/// let db = ClientDb::new();
/// let users = db.create_collection("users")?;
/// users.add(doc! { id: "1", name: "Alice" })?;
///
/// let same = db.collection("users")?;
/// assert_eq!(same.len(), 1);
/// ```
#[derive(Clone)]
pub struct ClientDb {
    inner: Arc<ClientDbInner>,
}

struct ClientDbInner {
    collections: DashMap<String, Collection>,
}

impl ClientDb {
    /// Returns the library version.
    pub fn version() -> &'static str {
        CLIENTDB_VERSION
    }

    /// Creates a new empty database.
    pub fn new() -> Self {
        ClientDb {
            inner: Arc::new(ClientDbInner {
                collections: DashMap::new(),
            }),
        }
    }

    /// Returns the collection registered under `name`, creating an empty one if
    /// absent.
    ///
    /// When a collection with this name already exists, the existing one is
    /// returned untouched; creation never silently replaces live data.
    ///
    /// # Errors
    ///
    /// [`ErrorKind::ValidationError`] if the name is empty.
    pub fn create_collection(&self, name: &str) -> ClientDbResult<Collection> {
        self.create_collection_with_schema(name, None)
    }

    /// Like [`ClientDb::create_collection`], additionally attaching a schema value.
    ///
    /// The schema is carried verbatim for external validators and never
    /// interpreted by the engine. An already-existing collection keeps its
    /// original schema.
    pub fn create_collection_with_schema(
        &self,
        name: &str,
        schema: Option<Value>,
    ) -> ClientDbResult<Collection> {
        if name.is_empty() {
            log::error!("Collection name cannot be empty");
            return Err(ClientDbError::new(
                "Collection name cannot be empty",
                ErrorKind::ValidationError,
            ));
        }

        let collection = self
            .inner
            .collections
            .entry(name.to_string())
            .or_insert_with(|| {
                log::debug!("Created collection '{}'", name);
                Collection::new(name, schema)
            })
            .clone();

        Ok(collection)
    }

    /// Returns the collection registered under `name`.
    ///
    /// # Errors
    ///
    /// [`ErrorKind::CollectionNotFound`] if no such collection exists.
    pub fn collection(&self, name: &str) -> ClientDbResult<Collection> {
        match self.inner.collections.get(name) {
            Some(collection) => Ok(collection.clone()),
            None => {
                log::error!("Collection '{}' does not exist", name);
                Err(ClientDbError::new(
                    &format!("Collection '{}' does not exist", name),
                    ErrorKind::CollectionNotFound,
                ))
            }
        }
    }

    /// Checks whether a collection is registered under `name`.
    pub fn has_collection(&self, name: &str) -> bool {
        self.inner.collections.contains_key(name)
    }

    /// Returns the names of all registered collections.
    ///
    /// The order is unspecified.
    pub fn list_collection_names(&self) -> Vec<String> {
        self.inner
            .collections
            .iter()
            .map(|entry| entry.key().clone())
            .collect()
    }

    /// Removes the collection registered under `name`, dropping its documents and
    /// subscriptions. Removing an absent name is a no-op.
    ///
    /// Handles obtained earlier keep working on the detached collection; it is
    /// simply no longer reachable through the registry.
    pub fn delete_collection(&self, name: &str) {
        if self.inner.collections.remove(name).is_some() {
            log::debug!("Deleted collection '{}'", name);
        }
    }
}

impl Default for ClientDb {
    fn default() -> Self {
        ClientDb::new()
    }
}

impl std::fmt::Debug for ClientDb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientDb")
            .field("collections", &self.list_collection_names())
            .finish()
    }
}
