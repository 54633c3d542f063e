//! Layered configuration.
//!
//! Settings resolve in order: built-in defaults, then a `docsearch.toml`
//! file in the working directory, then environment variables prefixed
//! with `DOCSEARCH_`. For example `DOCSEARCH_NGRAM_SIZE=4` overrides
//! `ngram_size`, and `DOCSEARCH_LOGGING__LEVEL=debug` overrides
//! `logging.level` (double underscore separates nesting).

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    /// N-gram size used by both indexing and search.
    #[serde(default = "default_ngram_size")]
    pub ngram_size: usize,

    /// Capacity of the bounded indexing event queue. A full queue blocks
    /// producing tasks.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Maximum events applied per consumer drain.
    #[serde(default = "default_drain_batch_size")]
    pub drain_batch_size: usize,

    /// Delay between consumer drains, in milliseconds.
    #[serde(default = "default_consumer_interval_ms")]
    pub consumer_interval_ms: u64,

    /// Timeout of one filesystem watch poll, in milliseconds.
    #[serde(default = "default_watch_poll_interval_ms")]
    pub watch_poll_interval_ms: u64,

    /// Maximum number of matched documents per search.
    #[serde(default = "default_max_search_results")]
    pub max_search_results: usize,

    /// Indexing worker pool size; 0 derives it from the core count.
    #[serde(default)]
    pub worker_threads: usize,

    /// File extensions eligible for indexing, case-insensitive.
    #[serde(default = "default_supported_extensions")]
    pub supported_extensions: Vec<String>,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Default filter level when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Per-module level overrides, e.g. `docsearch::indexing = "trace"`.
    #[serde(default)]
    pub modules: HashMap<String, String>,
}

fn default_ngram_size() -> usize {
    crate::tokenizer::DEFAULT_NGRAM_SIZE
}
fn default_queue_capacity() -> usize {
    100_000
}
fn default_drain_batch_size() -> usize {
    10_000
}
fn default_consumer_interval_ms() -> u64 {
    1_000
}
fn default_watch_poll_interval_ms() -> u64 {
    2_000
}
fn default_max_search_results() -> usize {
    100
}
fn default_supported_extensions() -> Vec<String> {
    ["txt", "md", "log", "csv", "json", "xml", "yml", "yaml", "toml", "rs", "kt", "java", "py"]
        .iter()
        .map(|ext| ext.to_string())
        .collect()
}
fn default_true() -> bool {
    true
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            ngram_size: default_ngram_size(),
            queue_capacity: default_queue_capacity(),
            drain_batch_size: default_drain_batch_size(),
            consumer_interval_ms: default_consumer_interval_ms(),
            watch_poll_interval_ms: default_watch_poll_interval_ms(),
            max_search_results: default_max_search_results(),
            worker_threads: 0,
            supported_extensions: default_supported_extensions(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: default_log_level(),
            modules: HashMap::new(),
        }
    }
}

impl Settings {
    /// Load configuration from all sources.
    pub fn load() -> Result<Self, Box<figment::Error>> {
        Self::load_from("docsearch.toml")
    }

    /// Load configuration with an explicit file path, for tests and
    /// embedders with their own config location.
    pub fn load_from(path: impl AsRef<std::path::Path>) -> Result<Self, Box<figment::Error>> {
        Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed("DOCSEARCH_").map(|key| {
                key.as_str().to_lowercase().replace("__", ".").into()
            }))
            .extract()
            .map_err(Box::new)
    }
}
