use crate::collection::Document;
use crate::common::SortOrder;

/// A chainable query-result builder over a point-in-time snapshot of documents.
///
/// A `Cluster` is produced by every multi-document read ([`crate::collection::Collection::get_all`],
/// [`crate::collection::Collection::find`]) and, on request, by notification dispatch.
/// It holds a private immutable snapshot of the data it was constructed with plus a
/// mutable working view, and offers sorting, offsetting, and page-based pagination.
///
/// Every builder method except [`Cluster::page`] re-derives the working view from the
/// immutable snapshot, so repeated calls with the same arguments are idempotent and
/// methods can be chained in any order. [`Cluster::exec`] materializes the current
/// view without mutating any state.
///
/// Later mutation of the source collection cannot retroactively change a cluster:
/// the snapshot is captured at construction time.
///
/// # Examples
///
/// ```rust,ignore
/// let mut cluster = collection.get_all();
/// let page = cluster
///     .sort_by("title", SortOrder::Ascending)
///     .limit(10)
///     .page(1)
///     .exec();
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Cluster {
    // immutable snapshot; never touched after construction
    all_data: Vec<Document>,
    data: Vec<Document>,
    pages: Vec<Vec<Document>>,
    current_page: usize,
}

impl Cluster {
    /// Creates a new cluster wrapping a snapshot of the given documents.
    pub fn new(data: Vec<Document>) -> Self {
        Cluster {
            all_data: data.clone(),
            data,
            pages: Vec::new(),
            current_page: 0,
        }
    }

    /// Sorts the working view by one or more fields, each with its own direction.
    ///
    /// The sort is stable and always re-derives from the snapshot, not from the
    /// current view, so calling it repeatedly with the same arguments is idempotent.
    /// Documents missing a sort field order as [`crate::common::Value::Null`]
    /// (before all other values when ascending).
    ///
    /// # Arguments
    ///
    /// * `fields` - (field name, direction) pairs, highest priority first
    pub fn sort(&mut self, fields: &[(&str, SortOrder)]) -> &mut Self {
        let mut data = self.all_data.clone();
        data.sort_by(|a, b| {
            for (field, order) in fields {
                let ordering = a.get(field).cmp(&b.get(field));
                let ordering = match order {
                    SortOrder::Ascending => ordering,
                    SortOrder::Descending => ordering.reverse(),
                };
                if !ordering.is_eq() {
                    return ordering;
                }
            }
            std::cmp::Ordering::Equal
        });

        self.data = data;
        self
    }

    /// Sorts the working view by a single field.
    pub fn sort_by(&mut self, field: &str, order: SortOrder) -> &mut Self {
        self.sort(&[(field, order)])
    }

    /// Drops the first `offset` elements of the snapshot from the working view.
    pub fn offset(&mut self, offset: usize) -> &mut Self {
        self.data = self.all_data.iter().skip(offset).cloned().collect();
        self
    }

    /// Partitions the snapshot into consecutive pages of `elements_on_page` and
    /// selects the page at the current page index (default 0).
    ///
    /// A page size of zero produces no pages and an empty view.
    pub fn limit(&mut self, elements_on_page: usize) -> &mut Self {
        self.pages = if elements_on_page == 0 {
            Vec::new()
        } else {
            self.all_data
                .chunks(elements_on_page)
                .map(|chunk| chunk.to_vec())
                .collect()
        };
        self.data = self.pages.get(self.current_page).cloned().unwrap_or_default();
        self
    }

    /// Changes the active page.
    ///
    /// Reselects the working view from the pages computed by a prior
    /// [`Cluster::limit`] call; without one, only the page index changes.
    /// An out-of-range page yields an empty view.
    pub fn page(&mut self, page: usize) -> &mut Self {
        self.current_page = page;
        if !self.pages.is_empty() {
            self.data = self.pages.get(page).cloned().unwrap_or_default();
        }
        self
    }

    /// Returns a copy of the current working view.
    ///
    /// Does not mutate snapshot or view state; safe to call repeatedly.
    pub fn exec(&self) -> Vec<Document> {
        self.data.clone()
    }

    /// Returns the number of documents in the current working view.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Checks if the current working view is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns the number of pages computed by [`Cluster::limit`].
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Returns the active page index.
    pub fn current_page(&self) -> usize {
        self.current_page
    }
}
