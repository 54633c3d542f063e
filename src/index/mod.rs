//! Inverted token index.
//!
//! Maps token content to the set of documents containing it. The single
//! writer is the indexing consumer thread; readers are search calls from
//! arbitrary threads. A read-write lock keeps every `get*` call a
//! consistent snapshot of fully-applied writes.

mod listener;
mod store;

pub use listener::IndexChangeListener;
pub use store::DocumentStore;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::types::DocumentId;

/// Token -> document-id-set store with change listeners.
#[derive(Default)]
pub struct InvertedIndex {
    tokens: RwLock<HashMap<String, HashSet<DocumentId>>>,
    listeners: RwLock<Vec<Arc<dyn IndexChangeListener>>>,
}

impl InvertedIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Associate `document_id` with `token`. Idempotent (set semantics).
    ///
    /// Listeners are notified after the write lock is released.
    pub fn add(&self, token: &str, document_id: DocumentId) {
        {
            let mut tokens = self.tokens.write();
            tokens
                .entry(token.to_string())
                .or_default()
                .insert(document_id);
        }
        for listener in self.listeners_snapshot() {
            listener.on_token_added(token, document_id);
        }
    }

    /// Remove the `token`/`document_id` association.
    ///
    /// Removing a pair that is not present is a silent no-op: no
    /// notification fires.
    pub fn remove(&self, token: &str, document_id: DocumentId) {
        let removed = {
            let mut tokens = self.tokens.write();
            match tokens.get_mut(token) {
                Some(ids) => {
                    let removed = ids.remove(&document_id);
                    if ids.is_empty() {
                        tokens.remove(token);
                    }
                    removed
                }
                None => false,
            }
        };
        if removed {
            for listener in self.listeners_snapshot() {
                listener.on_token_removed(token, document_id);
            }
        }
    }

    /// Fire an update notification without mutating storage.
    ///
    /// Exists purely as a diffing signal: "this token is still present for
    /// this document, but the document's content changed".
    pub fn update(&self, token: &str, document_id: DocumentId) {
        for listener in self.listeners_snapshot() {
            listener.on_token_updated(token, document_id);
        }
    }

    /// Listeners are dispatched on a snapshot, so a callback may add or
    /// remove listeners without deadlocking on the listener lock.
    fn listeners_snapshot(&self) -> Vec<Arc<dyn IndexChangeListener>> {
        self.listeners.read().clone()
    }

    /// Documents associated with exactly `token`.
    pub fn get_document_ids(&self, token: &str) -> HashSet<DocumentId> {
        self.tokens.read().get(token).cloned().unwrap_or_default()
    }

    /// Documents associated with any token containing `query` as an infix.
    ///
    /// Linear scan over all tokens; used for queries shorter than the
    /// n-gram size.
    pub fn get_document_ids_containing(&self, query: &str) -> HashSet<DocumentId> {
        let tokens = self.tokens.read();
        let mut result = HashSet::new();
        for (token, ids) in tokens.iter() {
            if token.contains(query) {
                result.extend(ids.iter().copied());
            }
        }
        result
    }

    /// All tokens currently associated with `document_id`.
    pub fn find_tokens_by_document_id(&self, document_id: DocumentId) -> HashSet<String> {
        let tokens = self.tokens.read();
        tokens
            .iter()
            .filter(|(_, ids)| ids.contains(&document_id))
            .map(|(token, _)| token.clone())
            .collect()
    }

    pub fn token_count(&self) -> usize {
        self.tokens.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.read().is_empty()
    }

    pub fn clear(&self) {
        self.tokens.write().clear();
    }

    pub fn add_listener(&self, listener: Arc<dyn IndexChangeListener>) {
        self.listeners.write().push(listener);
    }

    pub fn remove_listener(&self, listener: &Arc<dyn IndexChangeListener>) {
        self.listeners
            .write()
            .retain(|l| !Arc::ptr_eq(l, listener));
    }
}
