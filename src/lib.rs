pub mod config;
pub mod index;
pub mod indexing;
pub mod logging;
pub mod search;
pub mod tokenizer;
pub mod types;
pub mod watcher;

pub use config::Settings;
pub use index::{DocumentStore, IndexChangeListener, InvertedIndex};
pub use indexing::{DocumentIndexer, FolderWalker, IndexerListener, IndexingError};
pub use search::{SearchEngine, SearchResult};
pub use tokenizer::{NGramTokenizer, Tokenizer};
pub use types::*;
pub use watcher::{FileSystemEntryRegistry, FileSystemTracker, FsEventKind, FsEventListener};
