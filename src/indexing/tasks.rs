//! Worker-pool tasks: read, update and remove one document.
//!
//! Tasks run concurrently on the worker pool and communicate with the
//! single index-mutation consumer exclusively through the bounded event
//! queue. A full queue blocks the producing task (backpressure) instead
//! of dropping events.

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use crossbeam_channel::Sender;

use crate::index::{DocumentStore, InvertedIndex};
use crate::tokenizer::Tokenizer;
use crate::types::Document;
use crate::watcher::FileSystemTracker;

use super::IndexerListeners;
use super::event::IndexingEvent;

/// Read a document line by line and queue one `AddLine` event per line,
/// in file order.
pub(crate) fn read_document(
    document: Document,
    store: &DocumentStore,
    tracker: &FileSystemTracker,
    events: &Sender<IndexingEvent>,
    cancelled: &AtomicBool,
) {
    let start = Instant::now();
    let document_id = document.id;
    let path = document.path.clone();
    tracing::debug!("Read file {} for indexing", path.display());

    if cancelled.load(Ordering::SeqCst) {
        return;
    }

    tracker.register_file(&path);
    store.add_document(document);

    let file = match File::open(&path) {
        Ok(file) => file,
        Err(e) => {
            tracing::warn!("Reading file {} finished with exception: {e}", path.display());
            return;
        }
    };

    for line in BufReader::new(file).lines() {
        if cancelled.load(Ordering::SeqCst) {
            tracing::debug!("Abandon reading {} due to cancelling", path.display());
            return;
        }
        match line {
            Ok(line) => {
                // Blocks when the queue is full; a closed queue means the
                // pipeline is gone and the task just stops.
                if events
                    .send(IndexingEvent::AddLine { document_id, line })
                    .is_err()
                {
                    return;
                }
            }
            Err(e) => {
                tracing::warn!(
                    "Reading file {} finished with exception: {e}",
                    path.display()
                );
                return;
            }
        }
    }

    tracing::debug!(
        "File {} reading and submitting took {} ms",
        path.display(),
        start.elapsed().as_millis()
    );
}

/// `read_document` plus a progress notification once the file is done.
#[allow(clippy::too_many_arguments)]
pub(crate) fn read_document_with_progress(
    document: Document,
    document_number: u64,
    percentage: f64,
    store: &DocumentStore,
    tracker: &FileSystemTracker,
    events: &Sender<IndexingEvent>,
    cancelled: &AtomicBool,
    listeners: &IndexerListeners,
) {
    read_document(document, store, tracker, events, cancelled);

    let percent = if percentage > 0.0 {
        ((document_number as f64 / percentage) as i32).min(99)
    } else {
        0
    };
    for listener in listeners.read().iter() {
        listener.on_indexing_in_progress(percent);
    }
}

/// Re-index a modified document by diffing its whole-document token set.
///
/// Newly appearing tokens queue `AddToken`, tokens present on both sides
/// queue `UpdateToken`, disappeared tokens queue `RemoveToken`. The diff
/// is deliberately per-document, not per-line.
pub(crate) fn update_document(
    document: Document,
    tokenizer: &dyn Tokenizer,
    index: &InvertedIndex,
    events: &Sender<IndexingEvent>,
    cancelled: &AtomicBool,
) {
    let start = Instant::now();
    let document_id = document.id;

    if cancelled.load(Ordering::SeqCst) {
        return;
    }

    let old_tokens = index.find_tokens_by_document_id(document_id);

    let file = match File::open(&document.path) {
        Ok(file) => file,
        Err(e) => {
            tracing::warn!(
                "Update index for file {} finished with exception: {e}",
                document.path.display()
            );
            return;
        }
    };

    let mut new_tokens = HashSet::new();
    for line in BufReader::new(file).lines() {
        match line {
            Ok(line) => {
                for token in tokenizer.tokenize(&line) {
                    new_tokens.insert(token.content);
                }
            }
            Err(e) => {
                tracing::warn!(
                    "Update index for file {} finished with exception: {e}",
                    document.path.display()
                );
                return;
            }
        }
    }

    for token in new_tokens.difference(&old_tokens) {
        let event = IndexingEvent::AddToken {
            document_id,
            token: token.clone(),
        };
        if events.send(event).is_err() {
            return;
        }
    }
    for token in new_tokens.intersection(&old_tokens) {
        let event = IndexingEvent::UpdateToken {
            document_id,
            token: token.clone(),
        };
        if events.send(event).is_err() {
            return;
        }
    }
    for token in old_tokens.difference(&new_tokens) {
        let event = IndexingEvent::RemoveToken {
            document_id,
            token: token.clone(),
        };
        if events.send(event).is_err() {
            return;
        }
    }

    tracing::debug!(
        "Update index for file {} took {} ms",
        document.path.display(),
        start.elapsed().as_millis()
    );
}

/// Remove a document: queue `RemoveToken` for every token currently
/// associated with it, drop it from the store and untrack the file.
pub(crate) fn remove_document(
    document: Document,
    index: &InvertedIndex,
    store: &DocumentStore,
    tracker: &FileSystemTracker,
    events: &Sender<IndexingEvent>,
) {
    let start = Instant::now();
    let document_id = document.id;

    for token in index.find_tokens_by_document_id(document_id) {
        let event = IndexingEvent::RemoveToken { document_id, token };
        if events.send(event).is_err() {
            return;
        }
    }

    store.remove_document(&document.path);
    tracker.unregister_file(&document.path);

    tracing::debug!(
        "Remove file {} from index took {} ms",
        document.path.display(),
        start.elapsed().as_millis()
    );
}
