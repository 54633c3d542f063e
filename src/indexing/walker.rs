//! Folder traversal and eligible-file counting.

use std::collections::HashSet;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use ignore::WalkBuilder;

/// Walks a folder tree in pre-order, pruning hidden directories and
/// yielding only files that are eligible for indexing.
pub struct FolderWalker {
    supported_extensions: HashSet<String>,
}

impl FolderWalker {
    pub fn new(supported_extensions: &[String]) -> Self {
        Self {
            supported_extensions: supported_extensions
                .iter()
                .map(|ext| ext.to_lowercase())
                .collect(),
        }
    }

    /// Pre-order traversal of `root`.
    ///
    /// Every visited non-hidden directory is reported through `on_folder`
    /// (the root included), every eligible file through `on_file`. The
    /// walk terminates early once `cancelled` is observed set; a visit
    /// already in progress still completes.
    pub fn walk(
        &self,
        root: &Path,
        cancelled: &AtomicBool,
        on_folder: &mut dyn FnMut(&Path),
        on_file: &mut dyn FnMut(&Path),
    ) {
        let entries = WalkBuilder::new(root)
            .standard_filters(false)
            .follow_links(false)
            // Hidden directories are pruned; dotfiles themselves are
            // regular candidates.
            .filter_entry(|entry| {
                !(entry.file_type().is_some_and(|ft| ft.is_dir()) && is_hidden(entry.path()))
            })
            .build();

        for entry in entries {
            if cancelled.load(Ordering::SeqCst) {
                tracing::debug!("Terminate folder walk due to cancelling");
                break;
            }

            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!("Walk entry skipped: {e}");
                    continue;
                }
            };

            let path = entry.path();
            match entry.file_type() {
                Some(file_type) if file_type.is_dir() => {
                    tracing::debug!("Pre visit directory {}", path.display());
                    on_folder(path);
                }
                Some(file_type) if file_type.is_file() => {
                    if self.is_file_eligible(path) {
                        on_file(path);
                    }
                }
                _ => {}
            }
        }
    }

    /// Count eligible files under `path`, recursing only into readable,
    /// non-hidden directories.
    ///
    /// Runs as a pre-pass before any read task is scheduled; the result
    /// feeds progress reporting and is best-effort under concurrent
    /// filesystem mutation.
    pub fn count_files(&self, path: &Path) -> u64 {
        let Ok(entries) = fs::read_dir(path) else {
            return 0;
        };

        let mut count = 0;
        for entry in entries.flatten() {
            let entry_path = entry.path();
            if is_folder_available(&entry_path) {
                count += self.count_files(&entry_path);
            } else if self.is_file_eligible(&entry_path) {
                count += 1;
            }
        }
        count
    }

    /// Regular, readable file with a supported extension.
    pub fn is_file_eligible(&self, path: &Path) -> bool {
        if !path.is_file() {
            return false;
        }
        let supported = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.supported_extensions.contains(&ext.to_lowercase()));
        supported && fs::File::open(path).is_ok()
    }
}

/// Dotfile check on the final path component.
pub fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.starts_with('.'))
}

fn is_folder_available(path: &Path) -> bool {
    path.is_dir() && !is_hidden(path) && fs::read_dir(path).is_ok()
}

/// The path exists and is readable.
pub fn has_read_access(path: &Path) -> bool {
    if path.is_dir() {
        fs::read_dir(path).is_ok()
    } else {
        path.exists() && fs::File::open(path).is_ok()
    }
}

/// Lexical path normalization: drops `.` components and resolves `..`
/// against preceding normal components, without touching the filesystem.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    normalized.push(Component::ParentDir);
                }
            }
            other => normalized.push(other),
        }
    }
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn walker() -> FolderWalker {
        FolderWalker::new(&["txt".to_string(), "md".to_string()])
    }

    fn collect_walk(walker: &FolderWalker, root: &Path) -> (Vec<PathBuf>, Vec<PathBuf>) {
        let cancelled = AtomicBool::new(false);
        let mut folders = Vec::new();
        let mut files = Vec::new();
        walker.walk(
            root,
            &cancelled,
            &mut |folder| folders.push(folder.to_path_buf()),
            &mut |file| files.push(file.to_path_buf()),
        );
        (folders, files)
    }

    #[test]
    fn test_walk_yields_folders_and_eligible_files() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("a.txt"), "a").unwrap();
        fs::write(dir.path().join("sub/b.md"), "b").unwrap();
        fs::write(dir.path().join("sub/c.bin"), "c").unwrap();

        let (folders, files) = collect_walk(&walker(), dir.path());

        assert_eq!(folders.len(), 2);
        assert_eq!(files.len(), 2);
        assert!(files.iter().any(|f| f.ends_with("a.txt")));
        assert!(files.iter().any(|f| f.ends_with("b.md")));
    }

    #[test]
    fn test_walk_prunes_hidden_directories_but_keeps_dotfiles() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join(".hidden")).unwrap();
        fs::write(dir.path().join(".hidden/inside.txt"), "x").unwrap();
        fs::write(dir.path().join(".dotfile.txt"), "x").unwrap();
        fs::write(dir.path().join("visible.txt"), "x").unwrap();

        let (folders, files) = collect_walk(&walker(), dir.path());

        assert_eq!(folders.len(), 1);
        assert_eq!(files.len(), 2);
        assert!(files.iter().any(|f| f.ends_with(".dotfile.txt")));
        assert!(files.iter().any(|f| f.ends_with("visible.txt")));
    }

    #[test]
    fn test_walk_stops_when_cancelled() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.txt"), "a").unwrap();

        let cancelled = AtomicBool::new(true);
        let visits = std::cell::Cell::new(0);
        walker().walk(
            dir.path(),
            &cancelled,
            &mut |_| visits.set(visits.get() + 1),
            &mut |_| visits.set(visits.get() + 1),
        );
        assert_eq!(visits.get(), 0);
    }

    #[test]
    fn test_count_files_matches_walk() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::create_dir(dir.path().join(".git")).unwrap();
        fs::write(dir.path().join("a.txt"), "a").unwrap();
        fs::write(dir.path().join("sub/b.txt"), "b").unwrap();
        fs::write(dir.path().join("sub/skip.exe"), "x").unwrap();
        fs::write(dir.path().join(".git/config.txt"), "x").unwrap();
        fs::write(dir.path().join(".env.txt"), "x").unwrap();

        assert_eq!(walker().count_files(dir.path()), 3);

        let (_, files) = collect_walk(&walker(), dir.path());
        assert_eq!(files.len(), 3);
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(
            normalize_path(Path::new("/a/b/../c/./d")),
            PathBuf::from("/a/c/d")
        );
        assert_eq!(normalize_path(Path::new("a/./b")), PathBuf::from("a/b"));
    }

    #[test]
    fn test_has_read_access() {
        let dir = TempDir::new().unwrap();
        assert!(has_read_access(dir.path()));
        assert!(!has_read_access(&dir.path().join("missing")));
    }
}
