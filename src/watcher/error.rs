//! Error types for the filesystem watch layer.

use thiserror::Error;

/// Errors from watch setup.
///
/// Failures to watch an individual path are not represented here: the
/// registry logs them and reports the path as not registered.
#[derive(Error, Debug)]
pub enum WatchError {
    #[error("Failed to initialize watcher: {reason}")]
    InitFailed { reason: String },
}

impl From<notify::Error> for WatchError {
    fn from(e: notify::Error) -> Self {
        WatchError::InitFailed {
            reason: e.to_string(),
        }
    }
}
