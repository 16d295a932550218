/*!
 * Core types and data structures for the treedoc pipeline
 */

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// One visible filesystem object surfaced by a scan
///
/// The scan root itself is never represented as an entry; consumers that
/// need it synthesize it from [`ScanResult::root`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSystemEntry {
    /// Final path segment
    pub name: String,
    /// Absolute path on disk
    pub absolute_path: PathBuf,
    /// Whether the entry is a file (symlinks report their target's type)
    pub is_file: bool,
    /// Path segments relative to the scan root, ending with `name`
    pub path_parts: Vec<String>,
}

impl FileSystemEntry {
    /// Number of segments between this entry and the scan root
    pub fn depth(&self) -> usize {
        self.path_parts.len().saturating_sub(1)
    }

    /// Path relative to the scan root, joined with `/`
    pub fn relative_path(&self) -> String {
        self.path_parts.join("/")
    }

    /// Segments of the parent directory, `None` for top-level entries
    pub fn parent_parts(&self) -> Option<&[String]> {
        match self.path_parts.len() {
            0 | 1 => None,
            n => Some(&self.path_parts[..n - 1]),
        }
    }
}

/// Outcome of one directory scan
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanResult {
    /// Canonical scan root
    pub root: PathBuf,
    /// Visible entries, parents always before their children
    pub entries: Vec<FileSystemEntry>,
    /// Denominator fixed by the counting pass
    pub total: u64,
    /// Non-fatal errors observed during the emission pass
    pub errors: Vec<PipelineError>,
}

impl ScanResult {
    /// Name of the root directory, falling back to the full path for `/`
    pub fn root_name(&self) -> String {
        root_display_name(&self.root)
    }

    /// Visible file entries in traversal order
    pub fn files(&self) -> impl Iterator<Item = &FileSystemEntry> {
        self.entries.iter().filter(|e| e.is_file)
    }

    /// Whether the scan produced no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A non-fatal problem tied to one entry (or to no entry in particular)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineError {
    /// The entry being processed, if any
    pub path: Option<PathBuf>,
    /// Human-readable description
    pub message: String,
}

impl PipelineError {
    /// Error attached to a specific path
    pub fn for_path(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self {
            path: Some(path.into()),
            message: message.into(),
        }
    }

    /// Error not attached to any entry
    pub fn general(message: impl Into<String>) -> Self {
        Self {
            path: None,
            message: message.into(),
        }
    }

    /// Convert a walkdir error, keeping the offending path when known
    pub fn from_walk(err: &walkdir::Error) -> Self {
        let message = if err.loop_ancestor().is_some() {
            format!("symbolic link cycle detected: {}", err)
        } else {
            err.to_string()
        };
        Self {
            path: err.path().map(Path::to_path_buf),
            message,
        }
    }
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.path {
            Some(path) => write!(f, "{}: {}", path.display(), self.message),
            None => f.write_str(&self.message),
        }
    }
}

/// Display name of a directory: its last component, or the path itself
pub fn root_display_name(root: &Path) -> String {
    root.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| root.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(parts: &[&str], is_file: bool) -> FileSystemEntry {
        FileSystemEntry {
            name: parts.last().unwrap().to_string(),
            absolute_path: PathBuf::from("/root").join(parts.join("/")),
            is_file,
            path_parts: parts.iter().map(|p| p.to_string()).collect(),
        }
    }

    #[test]
    fn test_entry_depth_and_parent() {
        let top = entry(&["src"], false);
        assert_eq!(top.depth(), 0);
        assert!(top.parent_parts().is_none());

        let nested = entry(&["src", "core", "mod.rs"], true);
        assert_eq!(nested.depth(), 2);
        assert_eq!(nested.relative_path(), "src/core/mod.rs");
        assert_eq!(
            nested.parent_parts().unwrap(),
            &["src".to_string(), "core".to_string()]
        );
    }

    #[test]
    fn test_pipeline_error_display() {
        let err = PipelineError::for_path("/tmp/x.txt", "permission denied");
        assert_eq!(err.to_string(), "/tmp/x.txt: permission denied");
        assert_eq!(PipelineError::general("boom").to_string(), "boom");
    }

    #[test]
    fn test_root_display_name() {
        assert_eq!(root_display_name(Path::new("/home/user/project")), "project");
        assert_eq!(root_display_name(Path::new("/")), "/");
    }
}
