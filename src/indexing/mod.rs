//! Incremental indexing pipeline.
//!
//! A bounded event queue sits between a pool of concurrent worker tasks
//! (producers) and a single scheduled consumer that applies mutations to
//! the inverted index. The pipeline is also a filesystem-event listener:
//! once a folder is indexed, changes inside it keep the index current.

pub mod error;
pub mod event;
pub mod walker;

mod consumer;
mod tasks;

pub use error::IndexingError;
pub use walker::FolderWalker;

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender, bounded};
use parking_lot::RwLock;

use crate::config::Settings;
use crate::index::{DocumentStore, InvertedIndex};
use crate::tokenizer::Tokenizer;
use crate::types::{Document, DocumentIdGenerator};
use crate::watcher::{FileSystemTracker, FsEventKind, FsEventListener};

use consumer::IndexingJob;
use event::IndexingEvent;
use walker::{has_read_access, normalize_path};

/// Observer of indexing lifecycle: progress percent while a folder run is
/// underway, and a finished signal when the event queue goes quiescent.
pub trait IndexerListener: Send + Sync {
    fn on_indexing_in_progress(&self, percent: i32);
    fn on_indexing_finished(&self);
}

pub(crate) type IndexerListeners = Arc<RwLock<Vec<Arc<dyn IndexerListener>>>>;

/// Control surface of the indexing pipeline.
///
/// Owns the worker pool, the bounded event queue and the consumer thread,
/// and reacts to filesystem events from the tracker it is registered on.
pub struct DocumentIndexer {
    tokenizer: Arc<dyn Tokenizer>,
    index: Arc<InvertedIndex>,
    store: Arc<DocumentStore>,
    tracker: Arc<FileSystemTracker>,
    walker: FolderWalker,
    id_generator: DocumentIdGenerator,
    events_tx: Sender<IndexingEvent>,
    events_rx: Receiver<IndexingEvent>,
    pool: rayon::ThreadPool,
    listeners: IndexerListeners,
    cancelled: Arc<AtomicBool>,
    running: Arc<AtomicBool>,
}

impl DocumentIndexer {
    /// Build the pipeline and start its consumer thread.
    ///
    /// The returned indexer is already registered as a listener on
    /// `tracker`, so filesystem changes flow into it immediately.
    pub fn new(
        tokenizer: Arc<dyn Tokenizer>,
        index: Arc<InvertedIndex>,
        store: Arc<DocumentStore>,
        tracker: Arc<FileSystemTracker>,
        settings: &Settings,
    ) -> Result<Arc<Self>, IndexingError> {
        let (events_tx, events_rx) = bounded(settings.queue_capacity);
        let listeners: IndexerListeners = Arc::new(RwLock::new(Vec::new()));
        let running = Arc::new(AtomicBool::new(true));

        let workers = worker_thread_count(settings.worker_threads);
        tracing::info!("Number of threads in indexer pool - {workers}");
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("index-worker-{i}"))
            .build()?;

        let job = IndexingJob::new(
            Arc::clone(&tokenizer),
            Arc::clone(&index),
            events_rx.clone(),
            Arc::clone(&listeners),
            settings.drain_batch_size,
            Duration::from_millis(settings.consumer_interval_ms),
            Arc::clone(&running),
        );
        thread::Builder::new()
            .name("index-consumer".into())
            .spawn(move || job.run())
            .map_err(|e| IndexingError::ConsumerSpawn {
                reason: e.to_string(),
            })?;

        let indexer = Arc::new(Self {
            tokenizer,
            index,
            store,
            tracker: Arc::clone(&tracker),
            walker: FolderWalker::new(&settings.supported_extensions),
            id_generator: DocumentIdGenerator::new(),
            events_tx,
            events_rx,
            pool,
            listeners,
            cancelled: Arc::new(AtomicBool::new(false)),
            running,
        });
        tracker.add_listener(Arc::clone(&indexer) as Arc<dyn FsEventListener>);

        Ok(indexer)
    }

    /// Index the folder tree rooted at `path`.
    ///
    /// Counts eligible files first so that progress can be reported, then
    /// walks the tree scheduling one read task per file. Unreadable roots
    /// are not an error: the run just reports finished.
    pub fn index_folder(&self, path: &str) -> Result<(), IndexingError> {
        if path.trim().is_empty() {
            return Err(IndexingError::EmptyPath);
        }
        let root = normalize_path(Path::new(path));
        tracing::info!("Start indexing of folder {}", root.display());

        if !has_read_access(&root) {
            tracing::warn!("Folder {} is not available for reading", root.display());
            for listener in self.listeners.read().iter() {
                listener.on_indexing_finished();
            }
            return Ok(());
        }

        self.cancelled.store(false, Ordering::SeqCst);

        let total = self.walker.count_files(&root);
        tracing::debug!("Number of files for indexing - {total}");
        let percentage = total as f64 / 100.0;
        let document_number = AtomicU64::new(0);

        self.walker.walk(
            &root,
            &self.cancelled,
            &mut |folder| {
                self.tracker.register_folder(folder);
            },
            &mut |file| {
                if self.store.contains_document(file) {
                    return;
                }
                let number = document_number.fetch_add(1, Ordering::SeqCst) + 1;
                let document = Document::new(self.id_generator.next(), file.to_path_buf());

                let store = Arc::clone(&self.store);
                let tracker = Arc::clone(&self.tracker);
                let events = self.events_tx.clone();
                let cancelled = Arc::clone(&self.cancelled);
                let listeners = Arc::clone(&self.listeners);
                self.pool.spawn(move || {
                    tasks::read_document_with_progress(
                        document,
                        number,
                        percentage,
                        &store,
                        &tracker,
                        &events,
                        &cancelled,
                        &listeners,
                    );
                });
            },
        );

        Ok(())
    }

    /// Cancel the current run and reset all index state.
    ///
    /// In-flight tasks observe the flag and stop; queued events are
    /// discarded. Document ids restart from 1, so a re-run of the same
    /// folder produces the same ids as a fresh process.
    pub fn cancel_indexing(&self) {
        tracing::info!("Cancel current indexing");
        self.cancelled.store(true, Ordering::SeqCst);

        while self.events_rx.try_recv().is_ok() {}

        self.tracker.clear();
        self.index.clear();
        self.store.clear();
        self.id_generator.reset();
    }

    pub fn add_indexer_listener(&self, listener: Arc<dyn IndexerListener>) {
        self.listeners.write().push(listener);
    }

    pub fn remove_indexer_listener(&self, listener: &Arc<dyn IndexerListener>) {
        self.listeners
            .write()
            .retain(|l| !Arc::ptr_eq(l, listener));
    }

    /// Stop the consumer and watch-poll threads. The indexer is unusable
    /// afterwards.
    pub fn shutdown(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.running.store(false, Ordering::SeqCst);
        self.tracker.shutdown();
    }

    /// Index a folder that appeared inside an already-indexed tree.
    fn index_created_folder(&self, path: &Path) {
        tracing::debug!("Index created folder {}", path.display());
        self.walker.walk(
            path,
            &self.cancelled,
            &mut |folder| {
                self.tracker.register_folder(folder);
            },
            &mut |file| self.schedule_read(file),
        );
    }

    fn schedule_read(&self, file: &Path) {
        if self.store.contains_document(file) {
            return;
        }
        let document = Document::new(self.id_generator.next(), file.to_path_buf());
        let store = Arc::clone(&self.store);
        let tracker = Arc::clone(&self.tracker);
        let events = self.events_tx.clone();
        let cancelled = Arc::clone(&self.cancelled);
        self.pool.spawn(move || {
            tasks::read_document(document, &store, &tracker, &events, &cancelled);
        });
    }

    fn schedule_update(&self, document: Document) {
        let tokenizer = Arc::clone(&self.tokenizer);
        let index = Arc::clone(&self.index);
        let events = self.events_tx.clone();
        let cancelled = Arc::clone(&self.cancelled);
        self.pool.spawn(move || {
            tasks::update_document(document, tokenizer.as_ref(), &index, &events, &cancelled);
        });
    }

    fn schedule_remove(&self, document: Document) {
        let index = Arc::clone(&self.index);
        let store = Arc::clone(&self.store);
        let tracker = Arc::clone(&self.tracker);
        let events = self.events_tx.clone();
        self.pool.spawn(move || {
            tasks::remove_document(document, &index, &store, &tracker, &events);
        });
    }
}

impl FsEventListener for DocumentIndexer {
    fn on_folder_changed(&self, path: &Path, kind: FsEventKind) {
        match kind {
            FsEventKind::Created => self.index_created_folder(path),
            FsEventKind::Deleted => {
                tracing::debug!("Handle deleted folder {}", path.display());
                self.tracker.unregister_folder(path);
                for document in self.store.find_documents_starts_with(path) {
                    // Parent watches installed for individually registered
                    // files are gone from disk too.
                    self.tracker.unregister_folder(&document.parent_path);
                    self.schedule_remove(document);
                }
            }
            FsEventKind::Modified => {
                tracing::debug!("Skip modification of folder {}", path.display());
            }
        }
    }

    fn on_file_changed(&self, path: &Path, kind: FsEventKind) {
        match kind {
            FsEventKind::Created => {
                if self.walker.is_file_eligible(path) {
                    self.schedule_read(path);
                }
            }
            FsEventKind::Deleted => {
                if let Some(document) = self.store.get_document_by_path(path) {
                    self.schedule_remove(document);
                }
            }
            FsEventKind::Modified => {
                // Editors often emit modify right before delete; make sure
                // the file is still there.
                if !path.is_file() {
                    return;
                }
                // Files the store does not know about enter through the
                // created path, never through a modification.
                if let Some(document) = self.store.get_document_by_path(path) {
                    self.schedule_update(document);
                }
            }
        }
    }
}

/// Pool size: explicit configuration wins, otherwise a third of the
/// available cores with a floor that keeps small machines responsive.
fn worker_thread_count(configured: usize) -> usize {
    if configured > 0 {
        return configured;
    }
    let cores = num_cpus::get();
    (cores / 3).max(if cores > 3 { 2 } else { 1 })
}
