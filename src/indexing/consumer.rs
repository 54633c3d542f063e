//! The single scheduled consumer that mutates the inverted index.
//!
//! Runs on its own thread with a fixed delay between drains. Indexing
//! completion is detected by queue quiescence: a drain that yields zero
//! events notifies listeners that indexing has finished. This can fire
//! while producers are merely slow; callers rely on that behavior, so it
//! is kept as is.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use crossbeam_channel::{Receiver, TryRecvError};

use crate::index::InvertedIndex;
use crate::tokenizer::Tokenizer;

use super::IndexerListeners;
use super::event::IndexingEvent;

pub(crate) struct IndexingJob {
    tokenizer: Arc<dyn Tokenizer>,
    index: Arc<InvertedIndex>,
    events: Receiver<IndexingEvent>,
    listeners: IndexerListeners,
    batch_size: usize,
    interval: Duration,
    running: Arc<AtomicBool>,
}

impl IndexingJob {
    pub(crate) fn new(
        tokenizer: Arc<dyn Tokenizer>,
        index: Arc<InvertedIndex>,
        events: Receiver<IndexingEvent>,
        listeners: IndexerListeners,
        batch_size: usize,
        interval: Duration,
        running: Arc<AtomicBool>,
    ) -> Self {
        Self {
            tokenizer,
            index,
            events,
            listeners,
            batch_size,
            interval,
            running,
        }
    }

    /// Drain loop; exits when the pipeline shuts down or every producer
    /// handle is gone.
    pub(crate) fn run(self) {
        while self.running.load(Ordering::SeqCst) {
            thread::sleep(self.interval);
            if !self.drain_batch() {
                break;
            }
        }
        tracing::debug!("Indexing consumer stopped");
    }

    /// One drain: take up to `batch_size` events and apply them serially.
    /// Returns false once the queue is disconnected.
    fn drain_batch(&self) -> bool {
        let mut batch = Vec::new();
        let mut connected = true;
        while batch.len() < self.batch_size {
            match self.events.try_recv() {
                Ok(event) => batch.push(event),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    connected = false;
                    break;
                }
            }
        }

        tracing::trace!("Number of transferred elements - {}", batch.len());

        if batch.is_empty() {
            tracing::trace!("Indexing finished");
            for listener in self.listeners.read().iter() {
                // -1 is the progress sentinel for completion.
                listener.on_indexing_in_progress(-1);
                listener.on_indexing_finished();
            }
        }

        for event in batch {
            self.apply(event);
        }

        connected
    }

    fn apply(&self, event: IndexingEvent) {
        match event {
            IndexingEvent::AddLine { document_id, line } => {
                for token in self.tokenizer.tokenize(&line) {
                    self.index.add(&token.content, document_id);
                }
            }
            IndexingEvent::AddToken { document_id, token } => {
                self.index.add(&token, document_id);
            }
            IndexingEvent::UpdateToken { document_id, token } => {
                self.index.update(&token, document_id);
            }
            IndexingEvent::RemoveToken { document_id, token } => {
                self.index.remove(&token, document_id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::NGramTokenizer;
    use crate::types::DocumentId;
    use crossbeam_channel::bounded;
    use parking_lot::RwLock;

    fn doc(id: u32) -> DocumentId {
        DocumentId::new(id).unwrap()
    }

    fn job_with_queue(
        index: Arc<InvertedIndex>,
    ) -> (IndexingJob, crossbeam_channel::Sender<IndexingEvent>) {
        let (tx, rx) = bounded(128);
        let job = IndexingJob::new(
            Arc::new(NGramTokenizer::default()),
            index,
            rx,
            Arc::new(RwLock::new(Vec::new())),
            10_000,
            Duration::from_millis(1),
            Arc::new(AtomicBool::new(true)),
        );
        (job, tx)
    }

    #[test]
    fn test_add_line_is_tokenized_into_index() {
        let index = Arc::new(InvertedIndex::new());
        let (job, tx) = job_with_queue(Arc::clone(&index));

        tx.send(IndexingEvent::AddLine {
            document_id: doc(1),
            line: "abcd".into(),
        })
        .unwrap();
        job.drain_batch();

        assert!(index.get_document_ids("abc").contains(&doc(1)));
        assert!(index.get_document_ids("bcd").contains(&doc(1)));
    }

    #[test]
    fn test_token_events_apply_directly() {
        let index = Arc::new(InvertedIndex::new());
        let (job, tx) = job_with_queue(Arc::clone(&index));

        tx.send(IndexingEvent::AddToken {
            document_id: doc(1),
            token: "xyz".into(),
        })
        .unwrap();
        tx.send(IndexingEvent::RemoveToken {
            document_id: doc(1),
            token: "xyz".into(),
        })
        .unwrap();
        job.drain_batch();

        assert!(index.get_document_ids("xyz").is_empty());
    }

    #[test]
    fn test_empty_drain_reports_finished() {
        use crate::indexing::IndexerListener;
        use std::sync::atomic::AtomicUsize;

        #[derive(Default)]
        struct FinishCounter(AtomicUsize);
        impl IndexerListener for FinishCounter {
            fn on_indexing_in_progress(&self, _percent: i32) {}
            fn on_indexing_finished(&self) {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }

        let index = Arc::new(InvertedIndex::new());
        let (job, _tx) = job_with_queue(index);
        let counter = Arc::new(FinishCounter::default());
        job.listeners.write().push(counter.clone());

        job.drain_batch();
        assert_eq!(counter.0.load(Ordering::SeqCst), 1);
    }
}
