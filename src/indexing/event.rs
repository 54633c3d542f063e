//! Events flowing through the bounded indexing queue.

use crate::types::DocumentId;

/// One unit of index mutation, produced by worker tasks and consumed
/// exactly once by the single index-mutation consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexingEvent {
    /// A line of a newly read document; the consumer tokenizes it.
    AddLine { document_id: DocumentId, line: String },
    /// A token that appeared in a re-indexed document.
    AddToken { document_id: DocumentId, token: String },
    /// A token present both before and after a re-index; signals diffing
    /// downstream without mutating storage.
    UpdateToken { document_id: DocumentId, token: String },
    /// A token that disappeared from a document.
    RemoveToken { document_id: DocumentId, token: String },
}
