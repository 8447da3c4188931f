use crate::collection::Document;
use crate::common::Value;
use itertools::Itertools;
use std::fmt::{Display, Formatter};

/// The outcome status of a write operation.
///
/// Partial bulk outcomes are deliberately reported here instead of as errors:
/// bulk operations favor best-effort application with transparent partial-result
/// reporting over all-or-nothing atomicity. Callers inspect the status (and the
/// accompanying result fields) to learn exactly what succeeded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteStatus {
    /// Every entry was applied.
    Success,
    /// Some bulk-add entries were skipped because structurally identical
    /// documents already existed.
    AddedWithWarnings,
    /// Some bulk-update entries matched no stored document and were skipped.
    MissingDocsSkipped,
    /// Some requested delete identifiers matched no stored document.
    NotFoundIds(Vec<Value>),
}

impl WriteStatus {
    /// Returns true when every entry was applied.
    pub fn is_success(&self) -> bool {
        matches!(self, WriteStatus::Success)
    }
}

impl Display for WriteStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            WriteStatus::Success => write!(f, "success"),
            WriteStatus::AddedWithWarnings => write!(f, "added with warnings"),
            WriteStatus::MissingDocsSkipped => write!(f, "Not existed docs were not updated"),
            WriteStatus::NotFoundIds(ids) => {
                let plural = if ids.len() > 1 { "s" } else { "" };
                write!(
                    f,
                    "Not found doc with id{} {}",
                    plural,
                    ids.iter().map(|id| id.to_string()).join(", ")
                )
            }
        }
    }
}

/// The result of [`crate::collection::Collection::add`].
#[derive(Debug, Clone, PartialEq)]
pub struct AddResult {
    /// The full document list after the mutation.
    pub all_docs: Vec<Document>,
    /// The document that was appended.
    pub added: Document,
    /// Always [`WriteStatus::Success`]; duplicates fail with an error instead.
    pub status: WriteStatus,
}

/// The result of [`crate::collection::Collection::bulk_add`].
#[derive(Debug, Clone, PartialEq)]
pub struct BulkAddResult {
    /// The full document list after the mutation.
    pub all_docs: Vec<Document>,
    /// The subset of incoming documents that was actually appended.
    pub added: Vec<Document>,
    /// [`WriteStatus::AddedWithWarnings`] when any incoming entry was skipped
    /// as a structural duplicate.
    pub status: WriteStatus,
}

/// The result of [`crate::collection::Collection::update`].
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateResult {
    /// The full document list after the mutation.
    pub all_docs: Vec<Document>,
    /// The stored document after the merge.
    pub updated: Document,
    /// The stored document as it was before the merge.
    pub old: Document,
    pub status: WriteStatus,
}

/// The result of [`crate::collection::Collection::bulk_update`].
#[derive(Debug, Clone, PartialEq)]
pub struct BulkUpdateResult {
    /// The full document list after the mutation.
    pub all_docs: Vec<Document>,
    /// The stored documents after the merge, in their prior collection order.
    pub updated: Vec<Document>,
    /// The matched stored documents as they were before the merge.
    pub old_docs: Vec<Document>,
    /// Incoming entries whose identifier matched no stored document.
    pub unmatched: Vec<Document>,
    /// [`WriteStatus::MissingDocsSkipped`] when `unmatched` is non-empty.
    pub status: WriteStatus,
}

/// The result of [`crate::collection::Collection::upsert`].
#[derive(Debug, Clone, PartialEq)]
pub struct UpsertResult {
    /// The full document list after the mutation.
    pub all_docs: Vec<Document>,
    /// The merged (existing identifier) or inserted (new identifier) document.
    pub upserted: Document,
    pub status: WriteStatus,
}

/// The result of [`crate::collection::Collection::bulk_upsert`].
#[derive(Debug, Clone, PartialEq)]
pub struct BulkUpsertResult {
    /// The full document list after the mutation.
    pub all_docs: Vec<Document>,
    /// Every resulting document, merged or inserted, in input order.
    pub upserted: Vec<Document>,
    pub status: WriteStatus,
}

/// The result of [`crate::collection::Collection::delete`].
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteResult {
    /// The full document list after the mutation.
    pub all_docs: Vec<Document>,
    /// The documents that were removed, in their prior collection order.
    pub removed: Vec<Document>,
    /// [`WriteStatus::NotFoundIds`] enumerates requested identifiers that
    /// matched nothing; their deletion is not a hard failure.
    pub status: WriteStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_labels() {
        assert_eq!(format!("{}", WriteStatus::Success), "success");
        assert_eq!(
            format!("{}", WriteStatus::AddedWithWarnings),
            "added with warnings"
        );
        assert_eq!(
            format!("{}", WriteStatus::MissingDocsSkipped),
            "Not existed docs were not updated"
        );
    }

    #[test]
    fn test_not_found_single_id() {
        let status = WriteStatus::NotFoundIds(vec![Value::from("2")]);
        assert_eq!(format!("{}", status), "Not found doc with id 2");
    }

    #[test]
    fn test_not_found_multiple_ids() {
        let status = WriteStatus::NotFoundIds(vec![Value::from("2"), Value::from("5")]);
        assert_eq!(format!("{}", status), "Not found doc with ids 2, 5");
    }

    #[test]
    fn test_is_success() {
        assert!(WriteStatus::Success.is_success());
        assert!(!WriteStatus::AddedWithWarnings.is_success());
        assert!(!WriteStatus::NotFoundIds(vec![]).is_success());
    }
}
