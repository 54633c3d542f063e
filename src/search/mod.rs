//! Live-patching substring search.
//!
//! A search resolves candidate documents through the inverted index,
//! verifies matches line by line and streams the results. The stream then
//! stays open: the engine listens for index changes and patches the open
//! result set with add, update and remove deltas until the next search
//! supersedes it.

pub mod edit_set;
pub mod text;

mod result;

pub use result::SearchResult;

use std::collections::{BTreeMap, HashSet};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender, unbounded};
use parking_lot::Mutex;

use crate::index::{DocumentStore, IndexChangeListener, InvertedIndex};
use crate::tokenizer::Tokenizer;
use crate::types::DocumentId;

use edit_set::EditOperation;
use text::all_indices_of;

/// A document currently present in the open result set.
struct MatchedDocument {
    document_id: DocumentId,
    path: String,
    /// Matched line number -> match start positions within the line.
    matched_lines: BTreeMap<usize, Vec<usize>>,
}

/// State of the one active search stream.
#[derive(Default)]
struct SearchSession {
    sender: Option<Sender<SearchResult>>,
    query: String,
    tracked_tokens: HashSet<String>,
    matched: Vec<MatchedDocument>,
}

/// Search facade over the inverted index and the document store.
///
/// At most one search is live at a time; starting a new one terminates
/// the previous stream with `Complete`.
pub struct SearchEngine {
    tokenizer: Arc<dyn Tokenizer>,
    index: Arc<InvertedIndex>,
    store: Arc<DocumentStore>,
    max_results: usize,
    session: Mutex<SearchSession>,
}

impl SearchEngine {
    /// Build the engine and register it as an index change listener so
    /// open result streams get patched while indexing continues.
    pub fn new(
        tokenizer: Arc<dyn Tokenizer>,
        index: Arc<InvertedIndex>,
        store: Arc<DocumentStore>,
        max_results: usize,
    ) -> Arc<Self> {
        let engine = Arc::new(Self {
            tokenizer,
            index: Arc::clone(&index),
            store,
            max_results,
            session: Mutex::new(SearchSession::default()),
        });
        index.add_listener(Arc::clone(&engine) as Arc<dyn IndexChangeListener>);
        engine
    }

    /// Run a search and return its result stream.
    ///
    /// Matching is case-insensitive. An empty query, or one with no
    /// candidate documents, completes immediately with no results and
    /// leaves no session open. The number of matched documents is capped
    /// at the configured maximum; further candidates are dropped.
    pub fn search(&self, query: &str) -> Receiver<SearchResult> {
        let (tx, rx) = unbounded();
        let mut session = self.session.lock();

        if let Some(previous) = session.sender.take() {
            let _ = previous.send(SearchResult::Complete);
        }
        session.query.clear();
        session.tracked_tokens.clear();
        session.matched.clear();

        let query = query.to_lowercase();
        if query.is_empty() {
            let _ = tx.send(SearchResult::Complete);
            return rx;
        }

        tracing::debug!("Search documents for query '{query}'");
        let candidate_ids = self.candidate_document_ids(&query);
        if candidate_ids.is_empty() {
            let _ = tx.send(SearchResult::Complete);
            return rx;
        }

        session.tracked_tokens = self
            .tokenizer
            .tokenize(&query)
            .into_iter()
            .map(|token| token.content)
            .collect();
        session.query = query.clone();
        session.sender = Some(tx.clone());

        let mut documents = self.store.find_documents_by_ids(&candidate_ids);
        documents.sort_by(|a, b| a.path.cmp(&b.path));

        for document in documents {
            if session.matched.len() >= self.max_results {
                tracing::debug!(
                    "Limit of {} matched documents exceeded, further candidates dropped",
                    self.max_results
                );
                break;
            }

            let matched_lines = scan_lines(&document.path, &query);
            if matched_lines.is_empty() {
                continue;
            }

            let path = absolute_path_string(&document.path);
            for (line_number, positions) in &matched_lines {
                let _ = tx.send(SearchResult::Add {
                    file_path: path.clone(),
                    line_number: *line_number,
                    positions: positions.clone(),
                });
            }
            session.matched.push(MatchedDocument {
                document_id: document.id,
                path,
                matched_lines,
            });
        }

        rx
    }

    /// Resolve candidate document ids for `query` (already lower-cased).
    ///
    /// Queries shorter than the n-gram size fall back to an infix scan
    /// over all tokens; longer queries intersect the id sets of their
    /// n-grams, short-circuiting once the intersection is empty.
    fn candidate_document_ids(&self, query: &str) -> HashSet<DocumentId> {
        let ngram_size = self.tokenizer.ngram_size();
        let query_len = query.chars().count();

        if query_len < ngram_size {
            return self.index.get_document_ids_containing(query);
        }
        if query_len == ngram_size {
            return self.index.get_document_ids(query);
        }

        let mut tokens = self.tokenizer.tokenize(query).into_iter();
        let Some(first) = tokens.next() else {
            return HashSet::new();
        };
        let mut ids = self.index.get_document_ids(&first.content);
        for token in tokens {
            if ids.is_empty() {
                break;
            }
            let next = self.index.get_document_ids(&token.content);
            ids.retain(|id| next.contains(id));
        }
        ids
    }

    /// React to an index change for `token` in `document_id`.
    ///
    /// Only tokens in the session's tracked-token set are relevant; for a
    /// query at most the n-gram size long that set is the query itself.
    /// Relevant tokens trigger a re-scan of the document and a keyed diff
    /// against its previous matched lines.
    fn process_index_change(&self, token: &str, document_id: DocumentId) {
        let mut session = self.session.lock();
        let Some(sender) = session.sender.clone() else {
            return;
        };

        if !session.tracked_tokens.contains(token) {
            return;
        }

        self.refresh_document(&mut session, &sender, document_id);
    }

    fn refresh_document(
        &self,
        session: &mut SearchSession,
        sender: &Sender<SearchResult>,
        document_id: DocumentId,
    ) {
        let document = self.store.find_document_by_id(document_id);
        let new_lines = document
            .as_ref()
            .map(|doc| scan_lines(&doc.path, &session.query))
            .unwrap_or_default();

        let existing = session
            .matched
            .iter()
            .position(|matched| matched.document_id == document_id);

        match existing {
            Some(position) if new_lines.is_empty() => {
                let matched = session.matched.remove(position);
                for line_number in matched.matched_lines.keys() {
                    let _ = sender.send(SearchResult::Remove {
                        file_path: matched.path.clone(),
                        line_number: *line_number,
                    });
                }
            }
            Some(position) => {
                let path = session.matched[position].path.clone();
                let old_lines = std::mem::take(&mut session.matched[position].matched_lines);

                for operation in
                    edit_set::calculate(old_lines, new_lines.clone(), |b| b.0, |a| a.0)
                {
                    let delta = match operation {
                        EditOperation::Insert((line_number, positions)) => SearchResult::Add {
                            file_path: path.clone(),
                            line_number,
                            positions,
                        },
                        // Kept lines always re-emit, offsets changed or not.
                        EditOperation::Keep(_, (line_number, positions)) => SearchResult::Update {
                            file_path: path.clone(),
                            line_number,
                            positions,
                        },
                        EditOperation::Delete((line_number, _)) => SearchResult::Remove {
                            file_path: path.clone(),
                            line_number,
                        },
                    };
                    let _ = sender.send(delta);
                }

                session.matched[position].matched_lines = new_lines;
            }
            None => {
                if new_lines.is_empty() || session.matched.len() >= self.max_results {
                    return;
                }
                let Some(document) = document else {
                    return;
                };

                let path = absolute_path_string(&document.path);
                for (line_number, positions) in &new_lines {
                    let _ = sender.send(SearchResult::Add {
                        file_path: path.clone(),
                        line_number: *line_number,
                        positions: positions.clone(),
                    });
                }
                session.matched.push(MatchedDocument {
                    document_id,
                    path,
                    matched_lines: new_lines,
                });
            }
        }
    }
}

impl IndexChangeListener for SearchEngine {
    fn on_token_added(&self, token: &str, document_id: DocumentId) {
        self.process_index_change(token, document_id);
    }

    fn on_token_updated(&self, token: &str, document_id: DocumentId) {
        self.process_index_change(token, document_id);
    }

    fn on_token_removed(&self, token: &str, document_id: DocumentId) {
        self.process_index_change(token, document_id);
    }
}

/// Scan a file and collect, per matching line, the match start positions.
///
/// Line numbers are zero-based. Unreadable files or lines produce the
/// matches found so far; a vanished file simply matches nothing.
fn scan_lines(path: &Path, query: &str) -> BTreeMap<usize, Vec<usize>> {
    let mut matched = BTreeMap::new();
    let Ok(file) = File::open(path) else {
        return matched;
    };

    for (line_number, line) in BufReader::new(file).lines().enumerate() {
        let Ok(line) = line else {
            break;
        };
        let positions = all_indices_of(&line, query);
        if !positions.is_empty() {
            matched.insert(line_number, positions);
        }
    }
    matched
}

fn absolute_path_string(path: &Path) -> String {
    std::path::absolute(path)
        .unwrap_or_else(|_| path.to_path_buf())
        .display()
        .to_string()
}
