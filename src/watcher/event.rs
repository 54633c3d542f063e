//! High-level filesystem events republished by the tracker.

use std::path::Path;

/// What happened to a folder or file, after classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsEventKind {
    Created,
    Deleted,
    Modified,
}

/// Receives classified, filtered filesystem events.
///
/// Callbacks run on the watch-poll thread.
pub trait FsEventListener: Send + Sync {
    fn on_folder_changed(&self, path: &Path, kind: FsEventKind);

    fn on_file_changed(&self, path: &Path, kind: FsEventKind);
}
