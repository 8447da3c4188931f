//! Query filters for collection reads.
//!
//! A [`Filter`] matches documents either by a field-equality shape (every field of
//! the shape must be deep-equal on the candidate) or by an arbitrary predicate
//! closure. Filters are consumed by [`crate::collection::Collection::find`] and
//! [`crate::collection::Collection::get_one`].
//!
//! ```rust,ignore
//! use clientdb::filter::{field, Filter};
//!
//! let by_shape = field("title").eq("First");
//! let by_predicate = Filter::predicate(|doc| doc.get("rank").as_i64().unwrap_or(0) > 2);
//! ```

use crate::collection::Document;
use crate::common::Value;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

/// A document filter: a field-equality shape or a predicate function.
#[derive(Clone)]
pub struct Filter {
    inner: FilterInner,
}

#[derive(Clone)]
enum FilterInner {
    /// Every field of the shape must be deep-equal on the candidate document.
    Shape(Document),
    /// Arbitrary predicate over the candidate document.
    Predicate(Arc<dyn Fn(&Document) -> bool + Send + Sync>),
}

impl Filter {
    /// Creates a filter matching documents that carry every field of `shape`
    /// with a deep-equal value.
    ///
    /// An empty shape matches every document.
    pub fn shape(shape: Document) -> Self {
        Filter {
            inner: FilterInner::Shape(shape),
        }
    }

    /// Creates a filter from an arbitrary predicate.
    pub fn predicate(predicate: impl Fn(&Document) -> bool + Send + Sync + 'static) -> Self {
        Filter {
            inner: FilterInner::Predicate(Arc::new(predicate)),
        }
    }

    /// Checks whether the given document satisfies this filter.
    pub fn matches(&self, document: &Document) -> bool {
        match &self.inner {
            FilterInner::Shape(shape) => shape
                .iter()
                .all(|(key, value)| &document.get(key) == value),
            FilterInner::Predicate(predicate) => predicate(document),
        }
    }
}

impl Debug for Filter {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.inner {
            FilterInner::Shape(shape) => f.debug_tuple("Shape").field(shape).finish(),
            FilterInner::Predicate(_) => f.debug_tuple("Predicate").finish(),
        }
    }
}

impl From<Document> for Filter {
    fn from(shape: Document) -> Self {
        Filter::shape(shape)
    }
}

/// Entry point for the fluent single-field filter syntax: `field("title").eq("x")`.
pub fn field(name: &str) -> FieldFilter {
    FieldFilter {
        name: name.to_string(),
    }
}

/// Builder for a single-field equality filter. Created by [`field`].
pub struct FieldFilter {
    name: String,
}

impl FieldFilter {
    /// Creates a filter matching documents whose field equals the given value.
    ///
    /// An empty field name matches nothing: documents cannot carry an empty key,
    /// and falling back to an empty shape would match everything instead.
    pub fn eq(self, value: impl Into<Value>) -> Filter {
        let mut shape = Document::new();
        if shape.put(self.name.as_str(), value.into()).is_err() {
            return Filter::predicate(|_| false);
        }
        Filter::shape(shape)
    }
}
