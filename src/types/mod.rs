//! Core identity types shared by the index, the pipeline and the searcher.

use std::num::NonZeroU32;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};

/// Unique identifier for an indexed document.
///
/// Ids are generated monotonically starting at 1 and reset when an
/// indexing run is cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentId(NonZeroU32);

impl DocumentId {
    pub fn new(value: u32) -> Option<Self> {
        NonZeroU32::new(value).map(Self)
    }

    pub fn value(&self) -> u32 {
        self.0.get()
    }
}

/// Generator for document ids, owned by the indexing pipeline instance.
///
/// Resetting restarts the sequence from 1, so a fresh indexing run after
/// cancellation hands out the same ids as a fresh process would.
#[derive(Debug, Default)]
pub struct DocumentIdGenerator {
    counter: AtomicU32,
}

impl DocumentIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&self) -> DocumentId {
        let raw = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        DocumentId::new(raw).expect("document id space exhausted")
    }

    pub fn reset(&self) {
        self.counter.store(0, Ordering::SeqCst);
    }
}

/// Metadata for one indexed file, keyed by absolute path in the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub id: DocumentId,
    pub path: PathBuf,
    pub parent_path: PathBuf,
}

impl Document {
    pub fn new(id: DocumentId, path: PathBuf) -> Self {
        let parent_path = path.parent().map(PathBuf::from).unwrap_or_default();
        Self {
            id,
            path,
            parent_path,
        }
    }
}

/// One n-gram produced by the tokenizer. Tokens are plain values,
/// equal by content.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Token {
    pub content: String,
}

impl Token {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.content.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}
