/*!
 * Directory scanning: counting pass plus ordered emission pass
 */

use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use walkdir::{DirEntry, WalkDir};

use crate::error::{Result, TreeDocError};
use crate::filter::PathFilter;
use crate::progress::{CancellationToken, ProgressReporter, ProgressTracker};
use crate::types::{FileSystemEntry, PipelineError, ScanResult};

/// Traversal options
#[derive(Debug, Clone, Copy)]
pub struct ScanOptions {
    /// Follow symbolic links so they are seen as their target type
    pub follow_links: bool,
    /// Maximum depth below the root (1 = direct children only)
    pub max_depth: Option<usize>,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            follow_links: true,
            max_depth: None,
        }
    }
}

/// Which visible entries a counting pass counts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountScope {
    /// Files and directories
    All,
    /// Files only
    Files,
}

/// Walks a directory tree under a [`PathFilter`]
#[derive(Clone)]
pub struct DirectoryScanner {
    /// Visibility policy
    filter: Arc<dyn PathFilter>,
    /// Traversal options
    options: ScanOptions,
}

impl DirectoryScanner {
    /// Create a scanner with default options
    pub fn new(filter: Arc<dyn PathFilter>) -> Self {
        Self {
            filter,
            options: ScanOptions::default(),
        }
    }

    /// Replace the traversal options
    pub fn with_options(mut self, options: ScanOptions) -> Self {
        self.options = options;
        self
    }

    /// Canonicalize the root and make sure it is a readable directory
    pub fn resolve_root(root: &Path) -> Result<PathBuf> {
        let abs_path = fs::canonicalize(root).map_err(|e| TreeDocError::root(root, e))?;
        let metadata = fs::metadata(&abs_path).map_err(|e| TreeDocError::root(root, e))?;

        if !metadata.is_dir() {
            return Err(TreeDocError::root(
                root,
                std::io::Error::new(std::io::ErrorKind::Other, "not a directory"),
            ));
        }

        // Enumerating the root must work, everything below may fail per entry
        fs::read_dir(&abs_path).map_err(|e| TreeDocError::root(root, e))?;

        Ok(abs_path)
    }

    /// Count visible descendants of `root` for progress denominators
    pub fn count_visible(
        &self,
        root: &Path,
        scope: CountScope,
        cancel: &CancellationToken,
    ) -> Result<u64> {
        let abs_root = Self::resolve_root(root)?;
        self.count_resolved(&abs_root, scope, cancel)
    }

    fn count_resolved(
        &self,
        root: &Path,
        scope: CountScope,
        cancel: &CancellationToken,
    ) -> Result<u64> {
        let mut count = 0;

        for item in self.walk(root) {
            cancel.check()?;
            match item {
                Ok(entry) => {
                    if scope == CountScope::All || is_file_entry(&entry) {
                        count += 1;
                    }
                }
                Err(e) => tracing::debug!("Skipping unreadable entry while counting: {}", e),
            }
        }

        Ok(count)
    }

    /// Scan `root` and return every visible entry, parents before children
    ///
    /// The first pass fixes the progress denominator, the second emits entries
    /// and one progress update per entry. Per-entry failures are reported to
    /// `reporter` and collected in [`ScanResult::errors`]; only an unreadable
    /// root or cancellation aborts the scan.
    pub fn scan(
        &self,
        root: &Path,
        reporter: &dyn ProgressReporter,
        cancel: &CancellationToken,
    ) -> Result<ScanResult> {
        let abs_root = Self::resolve_root(root)?;
        let total = self.count_resolved(&abs_root, CountScope::All, cancel)?;
        tracing::debug!("Counted {} visible entries under {}", total, abs_root.display());

        let mut tracker = ProgressTracker::new(reporter, total);
        let mut entries = Vec::new();
        let mut errors = Vec::new();

        for item in self.walk(&abs_root) {
            cancel.check()?;

            let entry = match item {
                Ok(entry) => entry,
                Err(e) => {
                    let error = PipelineError::from_walk(&e);
                    tracker.error(&error);
                    errors.push(error);
                    continue;
                }
            };

            match build_entry(&abs_root, entry.path(), is_file_entry(&entry)) {
                Some(fs_entry) => entries.push(fs_entry),
                None => {
                    let error =
                        PipelineError::for_path(entry.path(), "path is outside the scan root");
                    tracker.error(&error);
                    errors.push(error);
                }
            }
            tracker.advance();
        }

        tracker.finish();
        tracing::info!(
            "Scanned {}: {} entries, {} errors",
            abs_root.display(),
            entries.len(),
            errors.len()
        );

        Ok(ScanResult {
            root: abs_root,
            entries,
            total,
            errors,
        })
    }

    /// Pre-order walk in segment-wise lexicographic order, pruning invisible entries
    fn walk<'a>(
        &'a self,
        root: &'a Path,
    ) -> impl Iterator<Item = walkdir::Result<DirEntry>> + 'a {
        let mut walker = WalkDir::new(root)
            .follow_links(self.options.follow_links)
            .min_depth(1)
            .sort_by_file_name();

        if let Some(depth) = self.options.max_depth {
            walker = walker.max_depth(depth);
        }

        walker
            .into_iter()
            .filter_entry(move |e| self.filter.is_visible(e.path(), root))
    }
}

/// Anything that is not a directory is rendered as a file
fn is_file_entry(entry: &DirEntry) -> bool {
    !entry.file_type().is_dir()
}

/// Build the immutable entry record for `path` below `root`
fn build_entry(root: &Path, path: &Path, is_file: bool) -> Option<FileSystemEntry> {
    let relative = path.strip_prefix(root).ok()?;
    let path_parts: Vec<String> = relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(name) => Some(name.to_string_lossy().to_string()),
            _ => None,
        })
        .collect();

    let name = path_parts.last()?.clone();

    Some(FileSystemEntry {
        name,
        absolute_path: path.to_path_buf(),
        is_file,
        path_parts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::DefaultPathFilter;
    use crate::progress::NullReporter;
    use std::collections::HashSet;
    use std::sync::Mutex;
    use tempfile::tempdir;

    fn scanner() -> DirectoryScanner {
        DirectoryScanner::new(Arc::new(DefaultPathFilter::new()))
    }

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn relative_paths(result: &ScanResult) -> Vec<String> {
        result.entries.iter().map(|e| e.relative_path()).collect()
    }

    #[test]
    fn test_scan_orders_parents_before_children() {
        let dir = tempdir().unwrap();
        write(dir.path(), "b/z.txt", "z");
        write(dir.path(), "a-c.txt", "x");
        write(dir.path(), "a/b/c.txt", "c");
        write(dir.path(), "a/a.txt", "a");

        let result = scanner()
            .scan(dir.path(), &NullReporter, &CancellationToken::new())
            .unwrap();

        assert_eq!(
            relative_paths(&result),
            vec!["a", "a/a.txt", "a/b", "a/b/c.txt", "a-c.txt", "b", "b/z.txt"]
        );

        let mut seen: HashSet<Vec<String>> = HashSet::new();
        for entry in &result.entries {
            if let Some(parent) = entry.parent_parts() {
                assert!(seen.contains(parent), "parent of {} not seen", entry.relative_path());
            }
            seen.insert(entry.path_parts.clone());
        }
        assert_eq!(result.total, 7);
        assert!(result.errors.is_empty());
    }

    #[test]
    fn test_scan_progress_is_monotonic_and_complete() {
        let dir = tempdir().unwrap();
        for i in 0..7 {
            write(dir.path(), &format!("d{}/f{}.txt", i % 3, i), "x");
        }

        let seen = Mutex::new(Vec::new());
        let reporter = |p: u8| seen.lock().unwrap().push(p);
        let result = scanner()
            .scan(dir.path(), &reporter, &CancellationToken::new())
            .unwrap();

        let values = seen.into_inner().unwrap();
        assert_eq!(values.len(), result.entries.len());
        assert!(values.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(values.last(), Some(&100));
    }

    #[test]
    fn test_scan_prunes_excluded_and_hidden() {
        let dir = tempdir().unwrap();
        write(dir.path(), "src/lib.rs", "");
        write(dir.path(), ".git/objects/ab/cdef", "");
        write(dir.path(), "web/node_modules/pkg/deep/index.js", "");
        write(dir.path(), "web/app.js", "");
        write(dir.path(), ".hidden/inner.txt", "");
        write(dir.path(), ".env", "");

        let result = scanner()
            .scan(dir.path(), &NullReporter, &CancellationToken::new())
            .unwrap();

        assert_eq!(
            relative_paths(&result),
            vec!["src", "src/lib.rs", "web", "web/app.js"]
        );
        assert_eq!(result.total, 4);
    }

    #[test]
    fn test_hidden_root_is_scanned() {
        let parent = tempdir().unwrap();
        let root = parent.path().join(".workspace");
        write(&root, "notes.txt", "n");

        let result = scanner()
            .scan(&root, &NullReporter, &CancellationToken::new())
            .unwrap();
        assert_eq!(relative_paths(&result), vec!["notes.txt"]);
        assert_eq!(result.root_name(), ".workspace");
    }

    #[test]
    fn test_empty_root() {
        let dir = tempdir().unwrap();
        let seen = Mutex::new(Vec::new());
        let reporter = |p: u8| seen.lock().unwrap().push(p);

        let result = scanner()
            .scan(dir.path(), &reporter, &CancellationToken::new())
            .unwrap();

        assert!(result.is_empty());
        assert_eq!(result.total, 0);
        assert_eq!(seen.into_inner().unwrap(), vec![100]);
    }

    #[test]
    fn test_missing_root_is_fatal() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("does-not-exist");
        let err = scanner()
            .scan(&missing, &NullReporter, &CancellationToken::new())
            .unwrap_err();
        assert!(matches!(err, TreeDocError::RootUnreadable { .. }));
    }

    #[test]
    fn test_file_root_is_fatal() {
        let dir = tempdir().unwrap();
        write(dir.path(), "plain.txt", "x");
        let err = scanner()
            .scan(&dir.path().join("plain.txt"), &NullReporter, &CancellationToken::new())
            .unwrap_err();
        assert!(err.to_string().contains("not a directory"));
    }

    #[test]
    fn test_count_visible_scopes() {
        let dir = tempdir().unwrap();
        write(dir.path(), "a/one.txt", "1");
        write(dir.path(), "a/two.txt", "2");
        write(dir.path(), "three.txt", "3");
        write(dir.path(), ".git/config", "");

        let s = scanner();
        let cancel = CancellationToken::new();
        assert_eq!(s.count_visible(dir.path(), CountScope::All, &cancel).unwrap(), 4);
        assert_eq!(s.count_visible(dir.path(), CountScope::Files, &cancel).unwrap(), 3);
    }

    #[test]
    fn test_max_depth() {
        let dir = tempdir().unwrap();
        write(dir.path(), "a/b/c.txt", "c");

        let result = scanner()
            .with_options(ScanOptions {
                max_depth: Some(1),
                ..ScanOptions::default()
            })
            .scan(dir.path(), &NullReporter, &CancellationToken::new())
            .unwrap();
        assert_eq!(relative_paths(&result), vec!["a"]);
    }

    #[test]
    fn test_cancelled_scan() {
        let dir = tempdir().unwrap();
        write(dir.path(), "a.txt", "a");
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = scanner().scan(dir.path(), &NullReporter, &cancel).unwrap_err();
        assert!(err.is_cancelled());
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_cycle_is_reported_not_followed() {
        let dir = tempdir().unwrap();
        write(dir.path(), "a/file.txt", "f");
        std::os::unix::fs::symlink(dir.path().join("a"), dir.path().join("a/loop")).unwrap();

        let result = scanner()
            .scan(dir.path(), &NullReporter, &CancellationToken::new())
            .unwrap();

        assert_eq!(relative_paths(&result), vec!["a", "a/file.txt"]);
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].message.contains("cycle"));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_to_file_is_a_file() {
        let dir = tempdir().unwrap();
        write(dir.path(), "real.txt", "r");
        std::os::unix::fs::symlink(dir.path().join("real.txt"), dir.path().join("link.txt"))
            .unwrap();

        let result = scanner()
            .scan(dir.path(), &NullReporter, &CancellationToken::new())
            .unwrap();
        assert_eq!(result.entries.len(), 2);
        assert!(result.entries.iter().all(|e| e.is_file));
    }

    #[cfg(unix)]
    #[test]
    fn test_dangling_link_is_a_per_entry_error() {
        let dir = tempdir().unwrap();
        write(dir.path(), "open.txt", "o");
        std::os::unix::fs::symlink(dir.path().join("gone"), dir.path().join("broken")).unwrap();

        let errors = Mutex::new(Vec::new());
        struct Collect<'a>(&'a Mutex<Vec<PipelineError>>);
        impl ProgressReporter for Collect<'_> {
            fn progress(&self, _percent: u8) {}
            fn entry_error(&self, error: &PipelineError) {
                self.0.lock().unwrap().push(error.clone());
            }
        }

        let result = scanner()
            .scan(dir.path(), &Collect(&errors), &CancellationToken::new())
            .unwrap();

        let errors = errors.into_inner().unwrap();
        let broken = dir.path().canonicalize().unwrap().join("broken");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].path.as_deref(), Some(broken.as_path()));
        assert_eq!(relative_paths(&result), vec!["open.txt"]);
        assert_eq!(result.errors, errors);
    }
}
