//! Error types for the indexing pipeline.

use thiserror::Error;

/// Errors surfaced synchronously by the indexing control surface.
///
/// Filesystem failures during a run are not represented here: they are
/// logged and the affected entry is skipped, per the pipeline contract.
#[derive(Error, Debug)]
pub enum IndexingError {
    #[error("Path for indexing must not be empty")]
    EmptyPath,

    #[error("Failed to build indexing worker pool: {0}")]
    PoolBuild(#[from] rayon::ThreadPoolBuildError),

    #[error("Failed to start indexing consumer: {reason}")]
    ConsumerSpawn { reason: String },
}
