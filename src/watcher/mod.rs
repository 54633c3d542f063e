//! Filesystem watch and tracking layer.

mod error;
mod event;
mod registry;
mod tracker;

pub use error::WatchError;
pub use event::{FsEventKind, FsEventListener};
pub use registry::FileSystemEntryRegistry;
pub use tracker::{FileSystemEventNotificationTask, FileSystemTracker};
