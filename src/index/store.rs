//! Document metadata store keyed by path.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use dashmap::DashMap;

use crate::types::{Document, DocumentId};

/// All documents that are currently indexed, keyed by absolute path.
///
/// The usage pattern is a single writer (the worker tasks mutate one entry
/// at a time) with concurrent readers from the search engine; `DashMap`
/// gives safe concurrent access without torn values.
#[derive(Debug, Default)]
pub struct DocumentStore {
    documents: DashMap<PathBuf, Document>,
}

impl DocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains_document(&self, path: &Path) -> bool {
        self.documents.contains_key(path)
    }

    pub fn get_document_by_path(&self, path: &Path) -> Option<Document> {
        self.documents.get(path).map(|entry| entry.clone())
    }

    /// Documents whose path starts with `prefix` (component-wise).
    ///
    /// Used to cascade-delete everything under a deleted folder.
    pub fn find_documents_starts_with(&self, prefix: &Path) -> Vec<Document> {
        self.documents
            .iter()
            .filter(|entry| entry.key().starts_with(prefix))
            .map(|entry| entry.value().clone())
            .collect()
    }

    pub fn find_documents_by_ids(&self, ids: &HashSet<DocumentId>) -> Vec<Document> {
        self.documents
            .iter()
            .filter(|entry| ids.contains(&entry.value().id))
            .map(|entry| entry.value().clone())
            .collect()
    }

    pub fn find_document_by_id(&self, id: DocumentId) -> Option<Document> {
        self.documents
            .iter()
            .find(|entry| entry.value().id == id)
            .map(|entry| entry.value().clone())
    }

    /// Insert `document`, replacing any previous entry for the same path
    /// (new id wins).
    pub fn add_document(&self, document: Document) {
        self.documents.insert(document.path.clone(), document);
    }

    pub fn remove_document(&self, path: &Path) {
        self.documents.remove(path);
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn clear(&self) {
        self.documents.clear();
    }
}
