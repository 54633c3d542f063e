//! Change-notification seam between the inverted index and its consumers.

use crate::types::DocumentId;

/// Receives token-level change notifications from the inverted index.
///
/// Callbacks run on the thread performing the mutation, after the change is
/// visible to readers and with no index lock held, so implementations may
/// call back into the index.
pub trait IndexChangeListener: Send + Sync {
    fn on_token_added(&self, token: &str, document_id: DocumentId);

    fn on_token_updated(&self, token: &str, document_id: DocumentId);

    fn on_token_removed(&self, token: &str, document_id: DocumentId);
}
