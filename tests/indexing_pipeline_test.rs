//! End-to-end tests for the indexing pipeline and search over it.

use std::fs;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use docsearch::{
    DocumentIndexer, DocumentStore, FileSystemEntryRegistry, FileSystemTracker, FsEventKind,
    FsEventListener, IndexerListener, IndexingError, InvertedIndex, NGramTokenizer, SearchEngine,
    SearchResult, Settings, Tokenizer,
};
use parking_lot::Mutex;
use tempfile::TempDir;

fn fast_settings() -> Settings {
    Settings {
        consumer_interval_ms: 20,
        watch_poll_interval_ms: 50,
        worker_threads: 2,
        supported_extensions: vec!["txt".to_string()],
        ..Settings::default()
    }
}

struct Stack {
    indexer: Arc<DocumentIndexer>,
    engine: Arc<SearchEngine>,
    store: Arc<DocumentStore>,
}

fn build_stack(settings: &Settings) -> Stack {
    let tokenizer: Arc<dyn Tokenizer> = Arc::new(NGramTokenizer::new(settings.ngram_size));
    let index = Arc::new(InvertedIndex::new());
    let store = Arc::new(DocumentStore::new());

    let registry = Arc::new(FileSystemEntryRegistry::new().unwrap());
    let tracker = FileSystemTracker::spawn(
        registry,
        Duration::from_millis(settings.watch_poll_interval_ms),
    )
    .unwrap();

    let indexer = DocumentIndexer::new(
        Arc::clone(&tokenizer),
        Arc::clone(&index),
        Arc::clone(&store),
        tracker,
        settings,
    )
    .unwrap();

    let engine = SearchEngine::new(
        tokenizer,
        index,
        Arc::clone(&store),
        settings.max_search_results,
    );

    Stack {
        indexer,
        engine,
        store,
    }
}

/// Re-run `query` until it yields exactly `expected` `Add` results or the
/// deadline passes. Indexing is asynchronous, so results converge.
fn wait_for_matches(engine: &SearchEngine, query: &str, expected: usize) -> Vec<SearchResult> {
    let deadline = Instant::now() + Duration::from_secs(10);
    loop {
        let results: Vec<SearchResult> = engine.search(query).try_iter().collect();
        let adds = results
            .iter()
            .filter(|r| matches!(r, SearchResult::Add { .. }))
            .count();
        if adds == expected {
            return results;
        }
        assert!(
            Instant::now() < deadline,
            "expected {expected} matches for '{query}', last saw {adds}"
        );
        thread::sleep(Duration::from_millis(50));
    }
}

fn write_corpus(dir: &TempDir) {
    fs::write(
        dir.path().join("a.txt"),
        "Lorem ipsum dolor sit amet\nconsectetur adipiscing elit",
    )
    .unwrap();
    fs::write(dir.path().join("b.txt"), "ipsum again ipsum").unwrap();
    fs::write(dir.path().join("c.txt"), "nothing relevant here").unwrap();
}

#[test]
fn test_index_folder_then_query_at_every_length() {
    let dir = TempDir::new().unwrap();
    write_corpus(&dir);

    let stack = build_stack(&fast_settings());
    stack
        .indexer
        .index_folder(dir.path().to_str().unwrap())
        .unwrap();

    // Longer than the n-gram size: candidate sets are intersected.
    let results = wait_for_matches(&stack.engine, "ipsum", 2);
    for result in &results {
        if let SearchResult::Add {
            file_path,
            line_number,
            positions,
        } = result
        {
            assert_eq!(*line_number, 0);
            if file_path.ends_with("a.txt") {
                assert_eq!(positions, &vec![6]);
            } else {
                assert!(file_path.ends_with("b.txt"));
                assert_eq!(positions, &vec![0, 12]);
            }
        }
    }

    // Exactly the n-gram size: direct token lookup.
    let results = wait_for_matches(&stack.engine, "sit", 1);
    assert!(results.iter().any(|r| matches!(
        r,
        SearchResult::Add { line_number: 0, positions, .. } if positions == &vec![18]
    )));

    // Shorter than the n-gram size: infix scan over all tokens.
    let results = wait_for_matches(&stack.engine, "do", 1);
    assert!(results.iter().any(|r| matches!(
        r,
        SearchResult::Add { file_path, line_number: 0, positions }
            if file_path.ends_with("a.txt") && positions == &vec![12]
    )));

    // Single character: matches across files and lines.
    let results = wait_for_matches(&stack.engine, "l", 3);
    for result in &results {
        if let SearchResult::Add {
            file_path,
            line_number,
            positions,
        } = result
        {
            match (file_path.ends_with("a.txt"), line_number) {
                (true, 0) => assert_eq!(positions, &vec![0, 14]),
                (true, 1) => assert_eq!(positions, &vec![24]),
                _ => {
                    assert!(file_path.ends_with("c.txt"));
                    assert_eq!(positions, &vec![10]);
                }
            }
        }
    }

    // Eleven characters: every n-gram of the query must be present.
    let results = wait_for_matches(&stack.engine, "lorem ipsum", 1);
    assert!(results.iter().any(|r| matches!(
        r,
        SearchResult::Add { file_path, line_number: 0, positions }
            if file_path.ends_with("a.txt") && positions == &vec![0]
    )));

    // Matching is case-insensitive.
    wait_for_matches(&stack.engine, "LOREM", 1);

    stack.indexer.shutdown();
}

#[test]
fn test_cancel_resets_state_and_reindex_restarts_ids() {
    let dir = TempDir::new().unwrap();
    write_corpus(&dir);

    let stack = build_stack(&fast_settings());
    stack
        .indexer
        .index_folder(dir.path().to_str().unwrap())
        .unwrap();
    wait_for_matches(&stack.engine, "ipsum", 2);

    stack.indexer.cancel_indexing();
    assert!(stack.store.is_empty());
    // Nothing left to find. A straggling pre-cancel event may leave a
    // token behind, but with the store empty no match can surface.
    let results: Vec<SearchResult> = stack.engine.search("ipsum").try_iter().collect();
    assert!(!results.iter().any(|r| matches!(r, SearchResult::Add { .. })));

    // A fresh run hands out ids starting from 1 again.
    stack
        .indexer
        .index_folder(dir.path().to_str().unwrap())
        .unwrap();
    wait_for_matches(&stack.engine, "ipsum", 2);

    for name in ["a.txt", "b.txt", "c.txt"] {
        let document = stack
            .store
            .get_document_by_path(&dir.path().join(name))
            .unwrap();
        assert!((1..=3).contains(&document.id.value()));
    }

    stack.indexer.shutdown();
}

#[test]
fn test_progress_and_finished_notifications() {
    #[derive(Default)]
    struct Recorder {
        progress: Mutex<Vec<i32>>,
        finished: AtomicBool,
    }
    impl IndexerListener for Recorder {
        fn on_indexing_in_progress(&self, percent: i32) {
            self.progress.lock().push(percent);
        }
        fn on_indexing_finished(&self) {
            self.finished.store(true, Ordering::SeqCst);
        }
    }

    let dir = TempDir::new().unwrap();
    write_corpus(&dir);

    let stack = build_stack(&fast_settings());
    let recorder = Arc::new(Recorder::default());
    stack
        .indexer
        .add_indexer_listener(Arc::clone(&recorder) as Arc<dyn IndexerListener>);

    stack
        .indexer
        .index_folder(dir.path().to_str().unwrap())
        .unwrap();

    // One progress notification per file, plus -1 sentinels whenever the
    // queue drains empty.
    let deadline = Instant::now() + Duration::from_secs(10);
    while recorder.progress.lock().iter().filter(|p| **p >= 0).count() < 3 {
        assert!(Instant::now() < deadline, "missing progress notifications");
        thread::sleep(Duration::from_millis(50));
    }
    assert!(recorder.finished.load(Ordering::SeqCst));

    let progress = recorder.progress.lock();
    assert_eq!(progress.iter().filter(|p| **p >= 0).count(), 3);
    assert!(progress.iter().all(|p| (-1..=99).contains(p)));
    assert!(progress.contains(&-1));

    stack.indexer.shutdown();
}

#[test]
fn test_unreadable_root_reports_finished_without_error() {
    #[derive(Default)]
    struct FinishCounter(AtomicUsize);
    impl IndexerListener for FinishCounter {
        fn on_indexing_in_progress(&self, _percent: i32) {}
        fn on_indexing_finished(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    let stack = build_stack(&fast_settings());
    let counter = Arc::new(FinishCounter::default());
    stack
        .indexer
        .add_indexer_listener(Arc::clone(&counter) as Arc<dyn IndexerListener>);

    stack
        .indexer
        .index_folder("/definitely/not/a/real/folder")
        .unwrap();
    assert!(counter.0.load(Ordering::SeqCst) >= 1);

    stack.indexer.shutdown();
}

#[test]
fn test_modified_event_for_unindexed_file_is_ignored() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("stray.txt");
    fs::write(&path, "ipsum content").unwrap();

    let stack = build_stack(&fast_settings());
    // An eligible but never-indexed file only enters through creation.
    stack.indexer.on_file_changed(&path, FsEventKind::Modified);

    thread::sleep(Duration::from_millis(300));
    assert!(!stack.store.contains_document(&path));

    stack.indexer.shutdown();
}

#[test]
fn test_empty_path_is_rejected() {
    let stack = build_stack(&fast_settings());
    assert!(matches!(
        stack.indexer.index_folder(""),
        Err(IndexingError::EmptyPath)
    ));
    assert!(matches!(
        stack.indexer.index_folder("  "),
        Err(IndexingError::EmptyPath)
    ));
    stack.indexer.shutdown();
}
