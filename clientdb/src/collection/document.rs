use im::OrdMap;
use smallvec::SmallVec;

use crate::common::{Value, DOC_ID};
use crate::errors::{ClientDbError, ClientDbResult, ErrorKind};
use std::borrow::Cow;
use std::fmt::{Debug, Display};

/// A short inline list of field names, as produced by [`Document::fields`].
pub type FieldVec = SmallVec<[String; 8]>;

/// Represents a schema-less document using a lock-free persistent data structure.
///
/// Documents are composed of key-value pairs. The key is always a [String] and the
/// value is a [Value]. Every document that participates in collection mutations must
/// carry a caller-supplied, non-empty identifier under the reserved `"id"` key.
///
/// Two documents are *identical* when they are deep-equal across all fields; two
/// documents are *the same entity* when their identifiers match. Mutation operations
/// on [`crate::collection::Collection`] use both notions in different places.
///
/// ## Lock-Free Design
///
/// This struct uses `im::OrdMap` (a persistent ordered map):
/// - O(1) cloning via internal Arc sharing
/// - Mutations create new maps via structural sharing
/// - Each mutated document is completely independent
///
/// Snapshots handed out by a collection therefore cannot be retroactively changed by
/// later mutations.
#[derive(Clone, Eq, PartialEq, Default, Ord, PartialOrd)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Document {
    /// Persistent ordered map: O(1) clone via internal Arc, O(log n) mutations
    data: OrdMap<String, Value>,
}

impl Document {
    /// Creates a new empty document.
    ///
    /// # Examples
    ///
    /// ```ignore
    /// let doc = Document::new();
    /// assert!(doc.is_empty());
    /// ```
    pub fn new() -> Self {
        Document {
            data: OrdMap::new(),
        }
    }

    /// Checks if the document is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns the number of fields in the document.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Associates the specified [Value] with the specified key in this document.
    ///
    /// If the key already exists, its value is updated.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is empty.
    ///
    /// # Examples
    ///
    /// ```ignore
    /// let mut doc = Document::new();
    /// doc.put("id", "1")?;
    /// doc.put("name", "Alice")?;
    /// assert_eq!(doc.size(), 2);
    /// ```
    pub fn put<'a, T: Into<Value>>(
        &mut self,
        key: impl Into<Cow<'a, str>>,
        value: T,
    ) -> ClientDbResult<()> {
        let key = key.into();
        // key cannot be empty
        if key.is_empty() {
            log::error!("Document does not support empty key");
            return Err(ClientDbError::new(
                "Document does not support empty key",
                ErrorKind::ValidationError,
            ));
        }

        self.data = self.data.update(key.to_string(), value.into());
        Ok(())
    }

    /// Returns the [Value] to which the specified key is associated, or [Value::Null]
    /// if this document contains no mapping for the key.
    pub fn get(&self, key: &str) -> Value {
        match self.data.get(key) {
            Some(value) => value.clone(),
            None => Value::Null,
        }
    }

    /// Removes the mapping for the specified key, returning the previous value if any.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let previous = self.data.get(key).cloned();
        self.data = self.data.without(key);
        previous
    }

    /// Checks whether the document contains the specified field.
    pub fn has_field(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    /// Returns the identifier stored under the reserved `"id"` key.
    ///
    /// Unlike auto-generating stores, the identifier is always caller-supplied here.
    ///
    /// # Errors
    ///
    /// Returns an error of kind [`ErrorKind::NotIdentifiable`] if the field is
    /// missing, null, or an empty string.
    pub fn id(&self) -> ClientDbResult<Value> {
        let id = self.get(DOC_ID);
        let empty = match &id {
            Value::Null => true,
            Value::String(s) => s.is_empty(),
            _ => false,
        };

        if empty {
            log::error!("Doc should have \"id\"");
            return Err(ClientDbError::new(
                "Doc should have \"id\"",
                ErrorKind::NotIdentifiable,
            ));
        }

        Ok(id)
    }

    /// Checks whether the document carries a usable identifier.
    pub fn has_id(&self) -> bool {
        self.id().is_ok()
    }

    /// Returns the field names of this document, in map order.
    pub fn fields(&self) -> FieldVec {
        self.data.keys().cloned().collect()
    }

    /// Returns a new document with `other`'s fields shallow-merged on top of this one.
    ///
    /// Fields present in `other` overwrite; fields absent from `other` are preserved.
    ///
    /// # Examples
    ///
    /// ```ignore
    /// let stored = doc! { id: "1", title: "old", count: 3 };
    /// let patch = doc! { id: "1", title: "new" };
    /// let merged = stored.merge(&patch);
    /// assert_eq!(merged.get("title"), Value::from("new"));
    /// assert_eq!(merged.get("count"), Value::from(3));
    /// ```
    pub fn merge(&self, other: &Document) -> Document {
        let mut data = self.data.clone();
        for (key, value) in other.data.iter() {
            data = data.update(key.clone(), value.clone());
        }
        Document { data }
    }

    /// Returns an iterator over the document's key-value pairs, in map order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.data.iter()
    }
}

impl Display for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{")?;
        for (i, (key, value)) in self.data.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {:?}", key, value)?;
        }
        write!(f, "}}")
    }
}

impl Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self)
    }
}

/// Strips the surrounding quotes that `stringify!` leaves on string-literal keys.
/// Used by the `doc!` macro.
pub fn normalize(key: &str) -> String {
    key.trim_matches('"').to_string()
}

/// Creates a [Document] from key-value pairs.
///
/// Keys can be bare identifiers or string literals; values can be literals,
/// parenthesized expressions, nested `{...}` documents, or `[...]` arrays.
///
/// # Examples
///
/// ```ignore
/// let doc = doc! {
///     id: "1",
///     title: "First",
///     tags: ["a", "b"],
///     meta: { author: "Alice" }
/// };
/// ```
#[macro_export]
macro_rules! doc {
    // match an empty document
    () => {
        $crate::collection::Document::new()
    };

    // match a document with key value pairs
    ($($key:tt : $value:tt),* $(,)?) => {
        {
            #[allow(unused_imports)]
            use $crate::doc_value;

            let mut doc = $crate::collection::Document::new();
            $(
                doc.put(&$crate::collection::normalize(stringify!($key)), $crate::doc_value!($value))
                .expect(&format!("Failed to put value {} in document", stringify!($value)));
            )*
            doc
        }
    };
}

/// Helper macro to convert values for the `doc!` macro.
/// Handles nested documents, arrays, and expressions.
#[macro_export]
macro_rules! doc_value {
    // match a nested document
    ({ $($key:tt : $value:tt),* $(,)? }) => {
        {
            $crate::common::Value::Document($crate::doc!{ $($key : $value),* })
        }
    };

    // match an array of values
    ([ $($value:tt),* $(,)? ]) => {
        $crate::common::Value::Array(vec![$($crate::doc_value!($value)),*])
    };

    // match an expression (variable, function call, arithmetic in parens, literals)
    ($value:expr) => {
        $crate::common::Value::from($value)
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doc;

    fn set_up() -> Document {
        doc! {
            id: "42",
            title: "First",
            score: 1034,
            tags: ["a", "b"],
            meta: {
                author: "Alice",
            },
        }
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("\"abc\""), "abc");
        assert_eq!(normalize("abc"), "abc");
    }

    #[test]
    fn test_new_is_empty() {
        let doc = Document::new();
        assert!(doc.is_empty());
        assert_eq!(doc.size(), 0);
    }

    #[test]
    fn test_put_and_get() {
        let mut doc = Document::new();
        doc.put("id", "1").unwrap();
        doc.put("count", 3).unwrap();
        assert_eq!(doc.get("id"), Value::from("1"));
        assert_eq!(doc.get("count"), Value::from(3));
        assert_eq!(doc.get("missing"), Value::Null);
    }

    #[test]
    fn test_put_empty_key_fails() {
        let mut doc = Document::new();
        let result = doc.put("", "value");
        assert!(result.is_err());
        assert_eq!(result.unwrap_err().kind(), &ErrorKind::ValidationError);
    }

    #[test]
    fn test_put_overwrites() {
        let mut doc = doc! { status: "inactive" };
        doc.put("status", "active").unwrap();
        assert_eq!(doc.get("status"), Value::from("active"));
        assert_eq!(doc.size(), 1);
    }

    #[test]
    fn test_remove() {
        let mut doc = set_up();
        let previous = doc.remove("title");
        assert_eq!(previous, Some(Value::from("First")));
        assert!(!doc.has_field("title"));
        assert!(doc.remove("title").is_none());
    }

    #[test]
    fn test_id_present() {
        let doc = set_up();
        assert!(doc.has_id());
        assert_eq!(doc.id().unwrap(), Value::from("42"));
    }

    #[test]
    fn test_id_missing() {
        let doc = doc! { title: "no id here" };
        let result = doc.id();
        assert!(result.is_err());
        assert_eq!(result.unwrap_err().kind(), &ErrorKind::NotIdentifiable);
    }

    #[test]
    fn test_id_empty_string() {
        let doc = doc! { id: "" };
        assert!(!doc.has_id());
    }

    #[test]
    fn test_numeric_id() {
        let doc = doc! { id: 7 };
        assert!(doc.has_id());
        assert_eq!(doc.id().unwrap(), Value::from(7));
    }

    #[test]
    fn test_fields() {
        let doc = doc! { id: "1", title: "x" };
        let fields = doc.fields();
        assert_eq!(fields.len(), 2);
        assert!(fields.contains(&"id".to_string()));
        assert!(fields.contains(&"title".to_string()));
    }

    #[test]
    fn test_merge_overwrites_and_preserves() {
        let stored = doc! { id: "1", title: "old", count: 3 };
        let patch = doc! { id: "1", title: "new" };
        let merged = stored.merge(&patch);

        assert_eq!(merged.get("title"), Value::from("new"));
        assert_eq!(merged.get("count"), Value::from(3));
        assert_eq!(merged.size(), 3);
        // originals untouched
        assert_eq!(stored.get("title"), Value::from("old"));
    }

    #[test]
    fn test_deep_equality() {
        let a = doc! { id: "1", meta: { author: "Alice" } };
        let b = doc! { id: "1", meta: { author: "Alice" } };
        let c = doc! { id: "1", meta: { author: "Bob" } };
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_nested_macro_values() {
        let doc = set_up();
        assert_eq!(
            doc.get("tags"),
            Value::Array(vec![Value::from("a"), Value::from("b")])
        );
        let meta = doc.get("meta");
        let meta = meta.as_document().unwrap();
        assert_eq!(meta.get("author"), Value::from("Alice"));
    }

    #[test]
    fn test_display() {
        let doc = doc! { id: "1" };
        assert_eq!(format!("{}", doc), "{id: \"1\"}");
    }
}
