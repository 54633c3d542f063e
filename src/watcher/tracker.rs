//! Filesystem change tracking.
//!
//! A poll thread blocks on the next raw watch event, classifies it as
//! folder-vs-file created/deleted/modified, and hands it to the tracker.
//! The tracker filters out events that do not belong to the active
//! index's tree before republishing to its own listeners.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use notify::EventKind;
use parking_lot::RwLock;

use super::error::WatchError;
use super::event::{FsEventKind, FsEventListener};
use super::registry::FileSystemEntryRegistry;

/// Drains raw watch events and classifies them.
///
/// Deletions are classified as folder events iff the path was a tracked
/// folder (the entry is gone from disk, so disk state cannot tell);
/// creations and modifications check disk state directly.
pub struct FileSystemEventNotificationTask {
    registry: Arc<FileSystemEntryRegistry>,
    listeners: RwLock<Vec<Arc<dyn FsEventListener>>>,
}

impl FileSystemEventNotificationTask {
    pub fn new(registry: Arc<FileSystemEntryRegistry>) -> Self {
        Self {
            registry,
            listeners: RwLock::new(Vec::new()),
        }
    }

    pub fn add_listener(&self, listener: Arc<dyn FsEventListener>) {
        self.listeners.write().push(listener);
    }

    /// One poll cycle: wait up to `timeout` for an event and dispatch it.
    pub fn poll_once(&self, timeout: Duration) {
        let Some(event) = self.registry.next_event(timeout) else {
            return;
        };

        let kind = match event.kind {
            EventKind::Create(_) => FsEventKind::Created,
            EventKind::Modify(_) => FsEventKind::Modified,
            EventKind::Remove(_) => FsEventKind::Deleted,
            _ => return,
        };

        for path in &event.paths {
            // Watches removed while events were in flight.
            if self.registry.registered_watch_for(path).is_none() {
                crate::debug_event!(
                    "tracker",
                    "event has no registered watch, skipped",
                    "{}",
                    path.display()
                );
                continue;
            }

            crate::debug_event!("tracker", "got event", "{:?} for {}", kind, path.display());

            let is_folder = match kind {
                FsEventKind::Deleted => self.registry.contains_folder(path),
                FsEventKind::Created | FsEventKind::Modified => path.is_dir(),
            };

            for listener in self.listeners.read().iter() {
                if is_folder {
                    listener.on_folder_changed(path, kind);
                } else {
                    listener.on_file_changed(path, kind);
                }
            }
        }
    }
}

/// Tracks which parts of the filesystem matter to the active index and
/// republishes only relevant events.
pub struct FileSystemTracker {
    registry: Arc<FileSystemEntryRegistry>,
    listeners: RwLock<Vec<Arc<dyn FsEventListener>>>,
    running: AtomicBool,
}

impl FileSystemTracker {
    /// Create the tracker and start its watch-poll thread.
    pub fn spawn(
        registry: Arc<FileSystemEntryRegistry>,
        poll_interval: Duration,
    ) -> Result<Arc<Self>, WatchError> {
        crate::log_event!("tracker", "initialize file system notification task");

        let tracker = Arc::new(Self {
            registry: Arc::clone(&registry),
            listeners: RwLock::new(Vec::new()),
            running: AtomicBool::new(true),
        });

        let task = FileSystemEventNotificationTask::new(registry);
        task.add_listener(Arc::clone(&tracker) as Arc<dyn FsEventListener>);

        let poll_tracker = Arc::clone(&tracker);
        thread::Builder::new()
            .name("fs-watch-poll".into())
            .spawn(move || {
                while poll_tracker.running.load(Ordering::SeqCst) {
                    task.poll_once(poll_interval);
                }
            })
            .map_err(|e| WatchError::InitFailed {
                reason: e.to_string(),
            })?;

        Ok(tracker)
    }

    /// Register `folder` as a tracked watch.
    pub fn register_folder(&self, folder: &Path) -> bool {
        self.registry.register_folder(folder, true)
    }

    /// Register `file` as individually tracked.
    ///
    /// Also installs non-subtree watches on the parent and grandparent
    /// folder so that folder deletion at either level is observable.
    pub fn register_file(&self, file: &Path) -> bool {
        let registered = self.registry.register_file(file);
        if registered {
            if let Some(parent) = file.parent() {
                if let Some(grandparent) = parent.parent() {
                    self.registry.register_folder(grandparent, false);
                }
                self.registry.register_folder(parent, false);
            }
        }
        registered
    }

    pub fn unregister_folder(&self, folder: &Path) -> bool {
        self.registry.unregister_folder(folder)
    }

    pub fn unregister_file(&self, file: &Path) -> bool {
        self.registry.unregister_file(file)
    }

    pub fn add_listener(&self, listener: Arc<dyn FsEventListener>) {
        self.listeners.write().push(listener);
    }

    pub fn remove_listener(&self, listener: &Arc<dyn FsEventListener>) {
        self.listeners.write().retain(|l| !Arc::ptr_eq(l, listener));
    }

    pub fn clear(&self) {
        self.registry.clear();
    }

    /// Stop the watch-poll thread after its current cycle.
    pub fn shutdown(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    fn notify_folder(&self, path: &Path, kind: FsEventKind) {
        for listener in self.listeners.read().iter() {
            listener.on_folder_changed(path, kind);
        }
    }

    fn notify_file(&self, path: &Path, kind: FsEventKind) {
        for listener in self.listeners.read().iter() {
            listener.on_file_changed(path, kind);
        }
    }
}

impl FsEventListener for FileSystemTracker {
    fn on_folder_changed(&self, path: &Path, kind: FsEventKind) {
        match kind {
            FsEventKind::Created => {
                // Sub-folder of a tracked parent: meaningful subtree growth.
                if path
                    .parent()
                    .is_some_and(|parent| self.registry.contains_folder(parent))
                {
                    self.notify_folder(path, kind);
                }
            }
            FsEventKind::Deleted => {
                if self.registry.contains_folder(path) {
                    self.unregister_folder(path);
                } else {
                    // Folder itself is not tracked, but it may hold
                    // individually tracked files that are now gone.
                    for file in self.registry.tracked_files() {
                        if file.parent() == Some(path) {
                            self.on_file_changed(&file, kind);
                        }
                    }
                }
                self.notify_folder(path, kind);
            }
            FsEventKind::Modified => {
                if self.registry.contains_folder(path) {
                    self.notify_folder(path, kind);
                }
            }
        }
    }

    fn on_file_changed(&self, path: &Path, kind: FsEventKind) {
        let tracked_file = self.registry.contains_file(path);
        let tracked_parent = path
            .parent()
            .is_some_and(|parent| self.registry.contains_folder(parent));

        if tracked_file || tracked_parent {
            self.notify_file(path, kind);
        }
    }
}
