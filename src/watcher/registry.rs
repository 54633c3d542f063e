//! Registry of watched folders and tracked files.
//!
//! Wraps the OS-level watch primitive (`notify`) and keeps two sets on
//! top of it: folders tracked as part of the active index's subtree, and
//! files registered individually so their parent folder's events can be
//! attributed to them.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crossbeam_channel::{Receiver, unbounded};
use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::{Mutex, RwLock};

use super::error::WatchError;

pub struct FileSystemEntryRegistry {
    watcher: Mutex<RecommendedWatcher>,
    event_rx: Receiver<notify::Result<Event>>,
    /// Folders with an active OS watch.
    registered_folders: RwLock<HashSet<PathBuf>>,
    /// Folders recursively relevant to the active index.
    tracked_folders: RwLock<HashSet<PathBuf>>,
    /// Individually registered files.
    tracked_files: RwLock<HashSet<PathBuf>>,
}

impl FileSystemEntryRegistry {
    pub fn new() -> Result<Self, WatchError> {
        let (tx, rx) = unbounded();
        let watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let _ = tx.send(res);
        })?;

        Ok(Self {
            watcher: Mutex::new(watcher),
            event_rx: rx,
            registered_folders: RwLock::new(HashSet::new()),
            tracked_folders: RwLock::new(HashSet::new()),
            tracked_files: RwLock::new(HashSet::new()),
        })
    }

    /// Register an OS watch on `folder`, returning whether the watch was
    /// newly installed.
    ///
    /// With `track_subtree` the folder is also marked as tracked, i.e.
    /// part of the active index's subtree. Watch failures are logged and
    /// reported as "not registered", never fatal.
    pub fn register_folder(&self, folder: &Path, track_subtree: bool) -> bool {
        crate::debug_event!("registry", "try to register folder", "{}", folder.display());

        let newly_registered = {
            let mut registered = self.registered_folders.write();
            if registered.contains(folder) {
                crate::debug_event!("registry", "folder already registered", "{}", folder.display());
                false
            } else {
                match self
                    .watcher
                    .lock()
                    .watch(folder, RecursiveMode::NonRecursive)
                {
                    Ok(()) => {
                        registered.insert(folder.to_path_buf());
                        true
                    }
                    Err(e) => {
                        tracing::warn!(
                            "[registry] could not watch folder {}: {e}",
                            folder.display()
                        );
                        return false;
                    }
                }
            }
        };

        if track_subtree {
            self.tracked_folders.write().insert(folder.to_path_buf());
        }

        newly_registered
    }

    /// Mark `file` as individually tracked. Returns whether it was new.
    pub fn register_file(&self, file: &Path) -> bool {
        let added = self.tracked_files.write().insert(file.to_path_buf());
        if !added {
            crate::debug_event!("registry", "file already registered", "{}", file.display());
        }
        added
    }

    /// Unregister `folder` and every tracked descendant, cancelling each
    /// watch. Returns whether any watch was removed.
    pub fn unregister_folder(&self, folder: &Path) -> bool {
        crate::debug_event!(
            "registry",
            "unregister folder with sub-directories",
            "{}",
            folder.display()
        );

        // Both tracked descendants and registered-but-untracked watches
        // (parents installed for individually registered files).
        let descendants: Vec<PathBuf> = {
            let tracked = self.tracked_folders.read();
            let registered = self.registered_folders.read();
            tracked
                .iter()
                .chain(registered.iter())
                .filter(|p| p.starts_with(folder))
                .cloned()
                .collect::<HashSet<_>>()
                .into_iter()
                .collect()
        };

        let mut removed_any = false;
        for path in descendants {
            self.tracked_folders.write().remove(&path);
            if self.registered_folders.write().remove(&path) {
                if let Err(e) = self.watcher.lock().unwatch(&path) {
                    tracing::debug!("[registry] unwatch {} failed: {e}", path.display());
                }
                removed_any = true;
            }
        }
        removed_any
    }

    pub fn unregister_file(&self, file: &Path) -> bool {
        self.tracked_files.write().remove(file)
    }

    /// Block up to `timeout` for the next raw watch event.
    ///
    /// Event delivery errors are logged and swallowed; the poll loop stays
    /// alive either way.
    pub fn next_event(&self, timeout: Duration) -> Option<Event> {
        match self.event_rx.recv_timeout(timeout) {
            Ok(Ok(event)) => Some(event),
            Ok(Err(e)) => {
                tracing::warn!("[registry] could not get events from watch service: {e}");
                None
            }
            Err(_) => None,
        }
    }

    /// Resolve the registered watch that produced an event for
    /// `event_path`: the path itself if it is a registered folder,
    /// otherwise its parent.
    pub fn registered_watch_for(&self, event_path: &Path) -> Option<PathBuf> {
        let registered = self.registered_folders.read();
        if registered.contains(event_path) {
            return Some(event_path.to_path_buf());
        }
        event_path
            .parent()
            .filter(|parent| registered.contains(*parent))
            .map(PathBuf::from)
    }

    pub fn contains_folder(&self, folder: &Path) -> bool {
        self.tracked_folders.read().contains(folder)
    }

    pub fn contains_file(&self, file: &Path) -> bool {
        self.tracked_files.read().contains(file)
    }

    pub fn tracked_files(&self) -> Vec<PathBuf> {
        self.tracked_files.read().iter().cloned().collect()
    }

    /// Cancel every watch and forget all tracked state.
    pub fn clear(&self) {
        self.tracked_files.write().clear();
        self.tracked_folders.write().clear();

        let folders: Vec<PathBuf> = self.registered_folders.write().drain().collect();
        let mut watcher = self.watcher.lock();
        for folder in folders {
            if let Err(e) = watcher.unwatch(&folder) {
                tracing::debug!("[registry] unwatch {} failed: {e}", folder.display());
            }
        }
    }
}
